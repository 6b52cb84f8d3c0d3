//! Persistent `autostart=<True|False>` setting and the matching autostart entry.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config;
use crate::error::{IoResultExt, WelcomeResult};
use crate::utils;

/// One-line settings file under the user's config directory
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CONFIG_HOME/welcome-center/settings.conf`
    pub fn for_user() -> Self {
        Self::new(
            utils::config_home()
                .join(config::settings::APP_DIR)
                .join(config::settings::FILE_NAME),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the config directory and write the default on first run.
    /// Does nothing when the directory already exists.
    pub fn ensure_initialized(&self) {
        let Some(dir) = self.path.parent() else { return };
        if dir.exists() {
            return;
        }
        let result = fs::create_dir_all(dir)
            .with_context(format!("creating {}", dir.display()))
            .and_then(|_| self.try_save(config::settings::AUTOSTART_DEFAULT));
        if let Err(e) = result {
            tracing::error!("Error initializing configuration: {}", e);
        }
    }

    /// Stored autostart flag; `true` when the file or key is missing.
    pub fn load(&self) -> bool {
        match fs::read_to_string(&self.path) {
            Ok(contents) => parse_autostart(&contents).unwrap_or(config::settings::AUTOSTART_DEFAULT),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::error!("Failed to read {}: {}", self.path.display(), e);
                }
                config::settings::AUTOSTART_DEFAULT
            }
        }
    }

    /// Replace the file with the given value. Errors are logged.
    pub fn save(&self, autostart: bool) {
        match self.try_save(autostart) {
            Ok(()) => tracing::info!("Settings saved: {}", render_autostart(autostart)),
            Err(e) => tracing::error!("Failed to save settings: {}", e),
        }
    }

    /// Write to a sibling temp file and rename over the target, so readers
    /// only ever see the old or the new content.
    fn try_save(&self, autostart: bool) -> WelcomeResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(format!("creating temp file in {}", dir.display()))?;
        tmp.write_all(render_autostart(autostart).as_bytes())
            .with_context("writing settings")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

/// Value of the last `autostart` line, if any
pub fn parse_autostart(contents: &str) -> Option<bool> {
    contents
        .lines()
        .filter(|line| line.contains(config::settings::AUTOSTART_KEY))
        .filter_map(|line| line.split_once('='))
        .map(|(_, value)| value.trim().eq_ignore_ascii_case("true"))
        .last()
}

pub fn render_autostart(autostart: bool) -> String {
    format!(
        "{}={}",
        config::settings::AUTOSTART_KEY,
        if autostart { "True" } else { "False" }
    )
}

/// Desktop entry copied into (or removed from) the autostart directory
#[derive(Debug, Clone)]
pub struct AutostartEntry {
    source: PathBuf,
    target: PathBuf,
}

impl AutostartEntry {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn for_user() -> Self {
        let source = PathBuf::from(config::settings::DESKTOP_ENTRY);
        let file_name = source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "welcome-center.desktop".into());
        let target = utils::config_home()
            .join(config::settings::AUTOSTART_DIR)
            .join(file_name);
        Self::new(source, target)
    }

    /// Install or remove the entry. Errors are logged.
    pub fn apply(&self, enabled: bool) {
        if let Err(e) = self.try_apply(enabled) {
            tracing::error!("Error updating autostart entry: {}", e);
        }
    }

    fn try_apply(&self, enabled: bool) -> WelcomeResult<()> {
        if enabled {
            if !self.source.is_file() {
                tracing::warn!("{} not found, autostart entry not created", self.source.display());
                return Ok(());
            }
            if let Some(dir) = self.target.parent() {
                fs::create_dir_all(dir).with_context(format!("creating {}", dir.display()))?;
            }
            fs::copy(&self.source, &self.target)
                .with_context(format!("copying {}", self.source.display()))?;
            tracing::info!("{} copied to {}", self.source.display(), self.target.display());
        } else if self.target.is_file() {
            fs::remove_file(&self.target)
                .with_context(format!("removing {}", self.target.display()))?;
            tracing::info!("{} removed", self.target.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.conf"));

        store.save(false);
        assert!(!store.load());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "autostart=False");

        store.save(true);
        assert!(store.load());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "autostart=True");
    }

    #[test]
    fn missing_file_defaults_to_true() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nothing-here.conf"));
        assert!(store.load());
    }

    #[test]
    fn missing_key_defaults_to_true() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.conf");
        fs::write(&path, "theme=dark\n").unwrap();
        assert!(SettingsStore::new(path).load());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(parse_autostart("autostart=false"), Some(false));
        assert_eq!(parse_autostart("autostart = TRUE\n"), Some(true));
        assert_eq!(parse_autostart("autostart=maybe"), Some(false));
        assert_eq!(parse_autostart(""), None);
    }

    #[test]
    fn first_run_creates_dir_with_default() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("welcome-center").join("settings.conf"));
        store.ensure_initialized();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "autostart=True");

        // an existing directory is left alone
        store.save(false);
        store.ensure_initialized();
        assert!(!store.load());
    }

    #[test]
    fn autostart_entry_toggles_copy() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("welcome-center.desktop");
        fs::write(&source, "[Desktop Entry]\nName=Welcome\n").unwrap();
        let target = dir.path().join("autostart").join("welcome-center.desktop");
        let entry = AutostartEntry::new(&source, &target);

        entry.apply(true);
        assert!(target.is_file());
        entry.apply(false);
        assert!(!target.exists());
    }
}
