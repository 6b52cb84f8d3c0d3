//! Opening links and starting external GUI tools.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crate::config;
use crate::error::WelcomeResult;
use crate::packages::{Pacman, PackageRunner};
use crate::utils::{self, CommandSpec};

/// A GUI tool that may need installing before it can be launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    pub package: String,
    pub binary: PathBuf,
    pub display_name: String,
}

impl ExternalTool {
    pub fn new(package: &str, binary: impl Into<PathBuf>, display_name: &str) -> Self {
        Self {
            package: package.to_string(),
            binary: binary.into(),
            display_name: display_name.to_string(),
        }
    }

    pub fn gparted() -> Self {
        let (package, binary, name) = config::tools::GPARTED;
        Self::new(package, binary, name)
    }

    pub fn arandr() -> Self {
        let (package, binary, name) = config::tools::ARANDR;
        Self::new(package, binary, name)
    }

    pub fn launch_command(&self) -> CommandSpec {
        CommandSpec::new(self.binary.to_string_lossy(), Vec::<String>::new())
    }

    pub fn is_present(&self) -> bool {
        self.binary.is_file()
    }
}

/// What [`Launcher::run_external_tool`] ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Binary found and started
    Launched,
    /// User agreed; install-then-launch is running in the background
    InstallStarted,
    /// User declined the install
    Declined,
    /// Pacman lock file present, nothing done
    Locked,
}

pub struct Launcher {
    runner: Arc<PackageRunner>,
    install_command: fn(&str) -> CommandSpec,
}

impl Launcher {
    pub fn new(runner: Arc<PackageRunner>) -> Self {
        Self {
            runner,
            install_command: Pacman::install_command,
        }
    }

    /// Use a different install command builder (tests, other package managers)
    pub fn with_install_command(mut self, build: fn(&str) -> CommandSpec) -> Self {
        self.install_command = build;
        self
    }

    pub fn runner(&self) -> &Arc<PackageRunner> {
        &self.runner
    }

    /// Start the tool, or after `confirm` agrees, install it and start it
    /// once the install succeeds. `confirm` is only asked when the binary is
    /// missing and pacman is free.
    pub fn run_external_tool(
        &self,
        tool: &ExternalTool,
        confirm: impl FnOnce(&ExternalTool) -> bool,
    ) -> WelcomeResult<LaunchOutcome> {
        if tool.is_present() {
            tracing::info!("launching {}", tool.binary.display());
            utils::spawn_detached(&tool.launch_command())?;
            return Ok(LaunchOutcome::Launched);
        }
        if self.runner.is_locked() {
            tracing::error!(
                "Pacman lockfile found {}, is another pacman process running?",
                self.runner.lock_file().display()
            );
            return Ok(LaunchOutcome::Locked);
        }
        if !confirm(tool) {
            tracing::info!("install of {} declined", tool.package);
            return Ok(LaunchOutcome::Declined);
        }
        self.runner.install_in_background(
            tool.package.clone(),
            (self.install_command)(&tool.package),
            Some(tool.launch_command()),
        )?;
        Ok(LaunchOutcome::InstallStarted)
    }
}

/// Hand `url` to the desktop's default handler on a background thread.
/// Failures are only logged.
pub fn open_url(url: &str) {
    let spec = CommandSpec::new("xdg-open", [url]);
    let spawned = thread::Builder::new()
        .name("open-url".into())
        .spawn(move || {
            if let Err(e) = utils::spawn_detached(&spec) {
                tracing::error!("Exception in opening weblink: {}", e);
            }
        });
    if let Err(e) = spawned {
        tracing::error!("failed to spawn weblink thread: {}", e);
    }
}
