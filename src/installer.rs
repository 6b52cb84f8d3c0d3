//! Calamares install modes.
//!
//! Switching mode copies a settings file and a packages module config into
//! place. The copies need root, so the GUI runs them through
//! `pkexec welcome_helper`, which calls back into [`apply_mode_files`] and
//! [`apply_bootloader`] with `/` as the root.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use crate::config::calamares as cfg;
use crate::error::{IoResultExt, WelcomeError, WelcomeResult};
use crate::events::{EventSink, Notice, UiEvent};
use crate::utils::{self, CommandSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// Installs what is on the media, no system update
    Offline,
    /// Updates the system during install
    Online,
}

impl InstallMode {
    pub fn label(self) -> &'static str {
        match self {
            InstallMode::Offline => "Offline Installation",
            InstallMode::Online => "Online Installation",
        }
    }

    pub fn as_arg(self) -> &'static str {
        match self {
            InstallMode::Offline => "offline",
            InstallMode::Online => "online",
        }
    }

    /// (source, target) pairs, relative to the filesystem root
    pub fn file_copies(self) -> [(&'static str, &'static str); 2] {
        match self {
            InstallMode::Offline => [
                (cfg::OFFLINE_SETTINGS, cfg::SETTINGS_TARGET),
                (cfg::OFFLINE_PACKAGES, cfg::PACKAGES_TARGET),
            ],
            InstallMode::Online => [
                (cfg::ONLINE_SETTINGS, cfg::SETTINGS_TARGET),
                (cfg::ONLINE_PACKAGES, cfg::PACKAGES_TARGET),
            ],
        }
    }
}

impl fmt::Display for InstallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InstallMode {
    type Err = WelcomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offline" => Ok(InstallMode::Offline),
            "online" => Ok(InstallMode::Online),
            other => Err(WelcomeError::invalid_argument(format!("unknown install mode '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootloader {
    Grub,
    SystemdBoot,
}

impl Bootloader {
    pub fn label(self) -> &'static str {
        match self {
            Bootloader::Grub => "GRUB",
            Bootloader::SystemdBoot => "systemd-boot",
        }
    }

    pub fn as_arg(self) -> &'static str {
        match self {
            Bootloader::Grub => "grub",
            Bootloader::SystemdBoot => "systemd-boot",
        }
    }

    fn source(self) -> String {
        format!("etc/calamares/modules/bootloader-{}.conf", self.as_arg())
    }
}

impl FromStr for Bootloader {
    type Err = WelcomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grub" => Ok(Bootloader::Grub),
            "systemd-boot" => Ok(Bootloader::SystemdBoot),
            other => Err(WelcomeError::invalid_argument(format!("unknown bootloader '{}'", other))),
        }
    }
}

fn copy_under(root: &Path, source: &str, target: &str) -> WelcomeResult<()> {
    let from = root.join(source);
    let to = root.join(target);
    fs::copy(&from, &to).with_context(format!("copying {} to {}", from.display(), to.display()))?;
    tracing::info!("{} copied to {}", from.display(), to.display());
    Ok(())
}

/// Put the mode's config files in place, in order. Stops at the first failure.
pub fn apply_mode_files(mode: InstallMode, root: &Path) -> WelcomeResult<()> {
    for (source, target) in mode.file_copies() {
        copy_under(root, source, target)?;
    }
    Ok(())
}

pub fn apply_bootloader(bootloader: Bootloader, root: &Path) -> WelcomeResult<()> {
    copy_under(root, &bootloader.source(), cfg::BOOTLOADER_TARGET)
}

/// Booted in UEFI mode
pub fn is_efi(root: &Path) -> bool {
    utils::file_exists(&root.join(cfg::EFI_MARKER))
}

/// Start Calamares detached
pub fn launch_installer() -> WelcomeResult<()> {
    utils::spawn_detached(&CommandSpec::new(cfg::LAUNCHER, [cfg::LAUNCHER_FLAG]))
}

fn helper_command(args: [&str; 2]) -> CommandSpec {
    CommandSpec::new(utils::helper_path().to_string_lossy(), args).elevated()
}

/// Copy the mode files through the privileged helper on a worker thread,
/// then report [`UiEvent::InstallerPrepared`].
pub fn prepare_in_background(mode: InstallMode, events: Arc<dyn EventSink>) -> WelcomeResult<()> {
    thread::Builder::new()
        .name("calamares-mode".into())
        .spawn(move || {
            let cmd = helper_command(["calamares-mode", mode.as_arg()]);
            let ok = match utils::run_command(&cmd) {
                Ok(_) => true,
                Err(e) => {
                    tracing::error!("switching Calamares to {} failed: {}", mode, e);
                    events.notice(Notice::failure(format!("Could not prepare {}", mode.label())));
                    false
                }
            };
            events.emit(UiEvent::InstallerPrepared { mode, ok });
        })
        .with_context("spawning installer worker")?;
    Ok(())
}

/// Write the bootloader choice through the helper, then start Calamares.
pub fn choose_bootloader_and_launch(
    bootloader: Bootloader,
    events: Arc<dyn EventSink>,
) -> WelcomeResult<()> {
    thread::Builder::new()
        .name("calamares-bootloader".into())
        .spawn(move || {
            let cmd = helper_command(["bootloader", bootloader.as_arg()]);
            if let Err(e) = utils::run_command(&cmd) {
                tracing::error!("setting bootloader to {} failed: {}", bootloader.label(), e);
                events.notice(Notice::failure(format!(
                    "Could not select {}",
                    bootloader.label()
                )));
                return;
            }
            if let Err(e) = launch_installer() {
                tracing::error!("{}", e);
                events.notice(Notice::failure("Could not start the installer"));
            }
        })
        .with_context("spawning bootloader worker")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fake_root() -> tempfile::TempDir {
        let root = tempdir().unwrap();
        let modules = root.path().join("etc/calamares/modules");
        fs::create_dir_all(&modules).unwrap();
        for (name, body) in [
            ("etc/calamares/settings-beginner.conf", "beginner"),
            ("etc/calamares/settings-advanced.conf", "advanced"),
            ("etc/calamares/modules/packages-no-system-update.conf", "no-update"),
            ("etc/calamares/modules/packages-system-update.conf", "update"),
            ("etc/calamares/modules/bootloader-grub.conf", "grub"),
            ("etc/calamares/modules/bootloader-systemd-boot.conf", "sdboot"),
        ] {
            fs::write(root.path().join(name), body).unwrap();
        }
        root
    }

    fn read(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join(rel)).unwrap()
    }

    #[test]
    fn offline_mode_uses_beginner_files() {
        let root = fake_root();
        apply_mode_files(InstallMode::Offline, root.path()).unwrap();
        assert_eq!(read(root.path(), cfg::SETTINGS_TARGET), "beginner");
        assert_eq!(read(root.path(), cfg::PACKAGES_TARGET), "no-update");
    }

    #[test]
    fn online_mode_overwrites_previous_choice() {
        let root = fake_root();
        apply_mode_files(InstallMode::Offline, root.path()).unwrap();
        apply_mode_files(InstallMode::Online, root.path()).unwrap();
        assert_eq!(read(root.path(), cfg::SETTINGS_TARGET), "advanced");
        assert_eq!(read(root.path(), cfg::PACKAGES_TARGET), "update");
    }

    #[test]
    fn missing_source_is_reported() {
        let root = tempdir().unwrap();
        let err = apply_mode_files(InstallMode::Online, root.path()).unwrap_err();
        assert!(err.to_string().contains("settings-advanced.conf"));
    }

    #[test]
    fn bootloader_choice_is_copied() {
        let root = fake_root();
        apply_bootloader(Bootloader::SystemdBoot, root.path()).unwrap();
        assert_eq!(read(root.path(), cfg::BOOTLOADER_TARGET), "sdboot");
    }

    #[test]
    fn efi_is_detected_from_firmware_marker() {
        let root = tempdir().unwrap();
        assert!(!is_efi(root.path()));
        let marker = root.path().join(cfg::EFI_MARKER);
        fs::create_dir_all(marker.parent().unwrap()).unwrap();
        fs::write(&marker, "64").unwrap();
        assert!(is_efi(root.path()));
    }

    #[test]
    fn names_parse_back() {
        assert_eq!("offline".parse::<InstallMode>().unwrap(), InstallMode::Offline);
        assert_eq!("systemd-boot".parse::<Bootloader>().unwrap(), Bootloader::SystemdBoot);
        assert!("full".parse::<InstallMode>().is_err());
    }
}
