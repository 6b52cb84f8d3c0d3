//! Mirrorlist refresh through `rate-mirrors`.

use std::sync::Arc;
use std::thread;

use crate::config::{mirrors as cfg, pacman};
use crate::error::{IoResultExt, WelcomeError, WelcomeResult};
use crate::events::{EventSink, Notice, UiEvent};
use crate::packages::InFlight;
use crate::utils::{self, CommandSpec};

const IN_FLIGHT_KEY: &str = "mirrors";

/// One mirrorlist to regenerate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTarget {
    pub target: String,
    pub save_path: String,
    pub display_name: String,
}

impl MirrorTarget {
    pub fn defaults() -> Vec<Self> {
        cfg::TARGETS
            .iter()
            .map(|(target, save_path, name)| MirrorTarget {
                target: target.to_string(),
                save_path: save_path.to_string(),
                display_name: name.to_string(),
            })
            .collect()
    }

    pub fn command(&self, rate_mirrors: &str) -> CommandSpec {
        CommandSpec::new(
            rate_mirrors,
            [
                "--concurrency",
                cfg::CONCURRENCY,
                "--disable-comments",
                "--allow-root",
                "--save",
                self.save_path.as_str(),
                self.target.as_str(),
            ],
        )
        .elevated()
    }
}

/// Commands the updater runs; swapped out in tests
#[derive(Debug, Clone)]
pub struct MirrorUpdater {
    rate_mirrors: String,
    install_tool: CommandSpec,
    targets: Vec<MirrorTarget>,
    target_command: fn(&MirrorTarget, &str) -> CommandSpec,
    in_flight: InFlight,
}

impl Default for MirrorUpdater {
    fn default() -> Self {
        Self {
            rate_mirrors: cfg::RATE_MIRRORS.to_string(),
            install_tool: CommandSpec::new(
                pacman::BINARY,
                ["-S", "--noconfirm", cfg::RATE_MIRRORS_PACKAGE],
            )
            .elevated(),
            targets: MirrorTarget::defaults(),
            target_command: MirrorTarget::command,
            in_flight: InFlight::new(),
        }
    }
}

impl MirrorUpdater {
    pub fn new(rate_mirrors: impl Into<String>, install_tool: CommandSpec, targets: Vec<MirrorTarget>) -> Self {
        Self {
            rate_mirrors: rate_mirrors.into(),
            install_tool,
            targets,
            target_command: MirrorTarget::command,
            in_flight: InFlight::new(),
        }
    }

    /// Build the per-target command differently (no elevation, other tools)
    pub fn with_target_command(mut self, build: fn(&MirrorTarget, &str) -> CommandSpec) -> Self {
        self.target_command = build;
        self
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.is_running(IN_FLIGHT_KEY)
    }

    /// Refresh every mirrorlist. Blocks; call from a worker thread.
    /// The UI is told the button is busy for the whole run.
    pub fn run(&self, events: &dyn EventSink) -> WelcomeResult<()> {
        let Some(_guard) = self.in_flight.try_begin(IN_FLIGHT_KEY) else {
            return Err(WelcomeError::AlreadyRunning("Mirrorlist update".into()));
        };
        events.emit(UiEvent::MirrorsBusy(true));
        scopeguard::defer! {
            events.emit(UiEvent::MirrorsBusy(false));
        }

        if !utils::on_path(&self.rate_mirrors) {
            events.notice(Notice::warning(format!("{} not found. Installing...", self.rate_mirrors)));
            if let Err(e) = utils::run_command(&self.install_tool) {
                tracing::error!("Error installing {}: {}", self.rate_mirrors, e);
                events.notice(Notice::failure(format!(
                    "Error installing {}. Please install manually.",
                    self.rate_mirrors
                )));
                return Err(e);
            }
            tracing::info!("{} installed successfully", self.rate_mirrors);
        }

        let mut failed = Vec::new();
        for target in &self.targets {
            events.notice(
                Notice::progress(format!("Updating {} Mirrorlist", target.display_name))
                    .with_detail("This may take some time, please wait..."),
            );
            let cmd = (self.target_command)(target, &self.rate_mirrors);
            let result = utils::stream_command(&cmd, |line| {
                tracing::info!(target: "rate-mirrors", "{}", line.trim())
            });
            match result {
                Ok(status) if status.success() => {
                    tracing::info!("{} mirrorlist update completed", target.display_name)
                }
                Ok(status) => {
                    tracing::error!("{} exited with {}", cmd, status);
                    failed.push(target.display_name.clone());
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    failed.push(target.display_name.clone());
                }
            }
        }

        if failed.is_empty() {
            events.notice(Notice::success("Mirrorlist updated"));
            Ok(())
        } else {
            let which = failed.join(", ");
            events.notice(Notice::failure(format!("Mirrorlist update failed for {}", which)));
            Err(WelcomeError::command_failed(&self.rate_mirrors, &which))
        }
    }

    /// [`run`](Self::run) on a new thread
    pub fn run_in_background(self: &Arc<Self>, events: Arc<dyn EventSink>) -> WelcomeResult<()> {
        let updater = Arc::clone(self);
        thread::Builder::new()
            .name("mirrors".into())
            .spawn(move || {
                if let Err(e) = updater.run(events.as_ref()) {
                    tracing::warn!("mirror update: {}", e);
                }
            })
            .with_context("spawning mirror worker")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NoticeKind, RecordingSink};

    fn target(name: &str) -> MirrorTarget {
        MirrorTarget {
            target: name.into(),
            save_path: format!("/tmp/{}", name),
            display_name: name.into(),
        }
    }

    #[test]
    fn default_targets_match_pacman_layout() {
        let cmd = MirrorTarget::defaults()[0].command("rate-mirrors");
        assert_eq!(
            cmd.to_string(),
            "pkexec rate-mirrors --concurrency 40 --disable-comments --allow-root --save /etc/pacman.d/mirrorlist arch"
        );
    }

    #[test]
    fn failed_tool_install_stops_and_frees_button() {
        let updater = MirrorUpdater::new(
            "rate-mirrors-missing-for-tests",
            CommandSpec::new("sh", ["-c", "exit 1"]),
            vec![target("arch")],
        );
        let sink = RecordingSink::new();
        assert!(updater.run(&sink).is_err());

        let events = sink.events();
        assert_eq!(events.first(), Some(&UiEvent::MirrorsBusy(true)));
        assert_eq!(events.last(), Some(&UiEvent::MirrorsBusy(false)));
        assert!(sink.notices().iter().all(|n| n.kind != NoticeKind::Progress));
        assert!(!updater.is_running());
    }

    /// Runs the target name as a shell script instead of rate-mirrors
    fn scripted(target: &MirrorTarget, _rate_mirrors: &str) -> CommandSpec {
        CommandSpec::new("sh", ["-c", target.target.as_str()])
    }

    fn scripted_updater(targets: Vec<MirrorTarget>) -> MirrorUpdater {
        MirrorUpdater::new("sh", CommandSpec::new("sh", ["-c", "exit 1"]), targets)
            .with_target_command(scripted)
    }

    fn scripted_target(script: &str, display_name: &str) -> MirrorTarget {
        MirrorTarget {
            target: script.into(),
            save_path: "/dev/null".into(),
            display_name: display_name.into(),
        }
    }

    #[test]
    fn every_target_runs_then_reports_success() {
        let updater = scripted_updater(vec![
            scripted_target("echo ranking arch", "Arch"),
            scripted_target("echo ranking chaotic >&2", "Chaotic AUR"),
        ]);
        let sink = RecordingSink::new();
        updater.run(&sink).unwrap();

        let notices = sink.notices();
        let kinds: Vec<_> = notices.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![NoticeKind::Progress, NoticeKind::Progress, NoticeKind::Success]
        );
        assert_eq!(notices[0].title, "Updating Arch Mirrorlist");
        assert_eq!(notices[1].title, "Updating Chaotic AUR Mirrorlist");
        assert_eq!(notices[2].title, "Mirrorlist updated");
        assert_eq!(sink.events().last(), Some(&UiEvent::MirrorsBusy(false)));
        assert!(!updater.is_running());
    }

    #[test]
    fn failed_target_is_named_and_others_still_run() {
        let updater = scripted_updater(vec![
            scripted_target("exit 3", "Arch"),
            scripted_target("exit 0", "Chaotic AUR"),
        ]);
        let sink = RecordingSink::new();
        assert!(updater.run(&sink).is_err());

        let notices = sink.notices();
        let progress = notices.iter().filter(|n| n.kind == NoticeKind::Progress).count();
        assert_eq!(progress, 2);
        let last = notices.last().unwrap();
        assert_eq!(last.kind, NoticeKind::Failure);
        assert_eq!(last.title, "Mirrorlist update failed for Arch");
        assert_eq!(sink.events().last(), Some(&UiEvent::MirrorsBusy(false)));
    }

    #[test]
    fn second_run_is_refused_while_busy() {
        let updater = MirrorUpdater::default();
        let _held = updater.in_flight.try_begin(IN_FLIGHT_KEY).unwrap();
        let sink = RecordingSink::new();
        assert!(matches!(updater.run(&sink), Err(WelcomeError::AlreadyRunning(_))));
        assert!(sink.events().is_empty());
    }
}
