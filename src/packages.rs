//! Package install/remove runner.
//!
//! Operations run on worker threads. Output goes to the log, progress and
//! results go to the UI as [`UiEvent`](crate::events::UiEvent)s, and every
//! finished install produces a [`PackageRecord`] on a single-consumer queue
//! that decides whether the follow-up command (usually launching the tool)
//! runs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::config;
use crate::error::{IoResultExt, WelcomeError, WelcomeResult};
use crate::events::{EventSink, Notice};
use crate::utils::{self, CommandSpec};

/// Installed-package lookup
pub trait PackageDb: Send + Sync {
    fn is_installed(&self, package: &str) -> bool;
}

/// The system package database, queried through `pacman -Qi`
#[derive(Debug, Clone, Copy, Default)]
pub struct Pacman;

impl Pacman {
    pub fn install_command(package: &str) -> CommandSpec {
        CommandSpec::new(
            config::pacman::BINARY,
            ["-Sy", package, "--noconfirm", "--needed"],
        )
        .elevated()
    }

    pub fn remove_command(package: &str) -> CommandSpec {
        CommandSpec::new(config::pacman::BINARY, ["-Rs", package, "--noconfirm"]).elevated()
    }
}

impl PackageDb for Pacman {
    fn is_installed(&self, package: &str) -> bool {
        std::process::Command::new(config::pacman::BINARY)
            .arg("-Qi")
            .arg(package)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    Succeeded,
    Failed,
}

/// Result of one install, consumed by the post-install queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub status: OpStatus,
    pub post_command: Option<CommandSpec>,
    pub package: String,
}

impl PackageRecord {
    /// Command to run now, if the install succeeded and one was requested
    pub fn follow_up(&self) -> Option<&CommandSpec> {
        match self.status {
            OpStatus::Succeeded => self.post_command.as_ref(),
            OpStatus::Failed => None,
        }
    }
}

/// Set of operation keys currently running
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    active: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`; `None` if it is already claimed. Released when the guard drops.
    pub fn try_begin(&self, key: &str) -> Option<InFlightGuard> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(key.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            active: Arc::clone(&self.active),
            key: key.to_string(),
        })
    }

    pub fn is_running(&self, key: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Install,
    Remove,
}

impl Operation {
    fn started(self, package: &str) -> Notice {
        match self {
            Operation::Install => Notice::progress(format!("Installing {}", package)),
            Operation::Remove => Notice::progress(format!("Removing package {}", package)),
        }
    }

    fn succeeded(self, package: &str) -> Notice {
        match self {
            Operation::Install => Notice::success(format!("Package {} installed", package)),
            Operation::Remove => Notice::success(format!("Package {} removed", package)),
        }
    }

    fn failed(self, package: &str) -> Notice {
        match self {
            Operation::Install => Notice::failure(format!("Package {} install failed", package)),
            Operation::Remove => Notice::failure(format!("Failed to remove package {}", package)),
        }
    }

    /// Whether the package database agrees the operation took effect
    fn took_effect(self, installed_now: bool) -> bool {
        match self {
            Operation::Install => installed_now,
            Operation::Remove => !installed_now,
        }
    }
}

/// Runs package operations and reports them to the UI
pub struct PackageRunner {
    db: Arc<dyn PackageDb>,
    lock_file: PathBuf,
    in_flight: InFlight,
    records: Sender<PackageRecord>,
    events: Arc<dyn EventSink>,
}

impl PackageRunner {
    pub fn new(
        db: Arc<dyn PackageDb>,
        lock_file: impl Into<PathBuf>,
        records: Sender<PackageRecord>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            db,
            lock_file: lock_file.into(),
            in_flight: InFlight::new(),
            records,
            events,
        }
    }

    pub fn lock_file(&self) -> &Path {
        &self.lock_file
    }

    /// Pacman is busy (or crashed and left its lock behind)
    pub fn is_locked(&self) -> bool {
        self.lock_file.exists()
    }

    pub fn installed(&self, package: &str) -> bool {
        self.db.is_installed(package)
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// Install `package` with `command`, then queue a record carrying
    /// `post_command`. Blocks; call from a worker thread.
    ///
    /// Returns an error only when the operation was refused before anything
    /// ran (lock file present, same package already in flight).
    pub fn install(
        &self,
        package: &str,
        command: &CommandSpec,
        post_command: Option<CommandSpec>,
    ) -> WelcomeResult<OpStatus> {
        let status = self.run(Operation::Install, package, command)?;
        let record = PackageRecord {
            status,
            post_command,
            package: package.to_string(),
        };
        if self.records.send(record).is_err() {
            tracing::warn!("post-install queue closed, dropping record for {}", package);
        }
        Ok(status)
    }

    /// Remove `package` with `command`. Blocks; call from a worker thread.
    pub fn remove(&self, package: &str, command: &CommandSpec) -> WelcomeResult<OpStatus> {
        self.run(Operation::Remove, package, command)
    }

    /// Run `install` on a new thread. Refusals are reported as notices.
    pub fn install_in_background(
        self: &Arc<Self>,
        package: String,
        command: CommandSpec,
        post_command: Option<CommandSpec>,
    ) -> WelcomeResult<()> {
        let runner = Arc::clone(self);
        thread::Builder::new()
            .name(format!("install-{}", package))
            .spawn(move || {
                if let Err(e) = runner.install(&package, &command, post_command) {
                    tracing::warn!("install of {} refused: {}", package, e);
                }
            })
            .with_context("spawning install worker")?;
        Ok(())
    }

    fn run(&self, op: Operation, package: &str, command: &CommandSpec) -> WelcomeResult<OpStatus> {
        if self.is_locked() {
            let err = WelcomeError::PackageLocked(self.lock_file.clone());
            tracing::error!("{}", err);
            self.events.notice(Notice::warning(err.to_string()));
            return Err(err);
        }
        let Some(_guard) = self.in_flight.try_begin(package) else {
            let err = WelcomeError::AlreadyRunning(format!("An operation on {}", package));
            self.events.notice(Notice::warning(err.to_string()));
            return Err(err);
        };

        self.events.notice(op.started(package));
        tracing::info!("running {}", command);

        let exited_ok = match utils::stream_command(command, |line| {
            tracing::info!(target: "pacman", "{}", line.trim())
        }) {
            Ok(status) => {
                if !status.success() {
                    tracing::error!("{} exited with {}", command, status);
                }
                status.success()
            }
            Err(e) => {
                tracing::error!("{}", e);
                false
            }
        };

        let status = if exited_ok && op.took_effect(self.db.is_installed(package)) {
            tracing::info!("Pacman {} of {} completed", op_name(op), package);
            self.events.notice(op.succeeded(package));
            OpStatus::Succeeded
        } else {
            tracing::error!("Pacman {} of {} failed", op_name(op), package);
            self.events.notice(op.failed(package));
            OpStatus::Failed
        };
        Ok(status)
    }
}

fn op_name(op: Operation) -> &'static str {
    match op {
        Operation::Install => "install",
        Operation::Remove => "removal",
    }
}

/// Consume records until every sender is gone, handing each follow-up
/// command to `launch`.
pub fn drain_records(records: Receiver<PackageRecord>, mut launch: impl FnMut(&CommandSpec)) {
    for record in records {
        match record.follow_up() {
            Some(cmd) => {
                tracing::info!("{} installed, running {}", record.package, cmd);
                launch(cmd);
            }
            None => tracing::debug!("no follow-up for {} ({:?})", record.package, record.status),
        }
    }
}

/// The single consumer of the record queue; launches follow-ups detached.
pub fn spawn_post_install_worker(
    records: Receiver<PackageRecord>,
    events: Arc<dyn EventSink>,
) -> WelcomeResult<()> {
    thread::Builder::new()
        .name("post-install".into())
        .spawn(move || {
            drain_records(records, |cmd| {
                if let Err(e) = utils::spawn_detached(cmd) {
                    tracing::error!("{}", e);
                    events.notice(Notice::failure(format!("Could not start {}", cmd.program)));
                }
            })
        })
        .with_context("spawning post-install worker")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NoticeKind, RecordingSink};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use tempfile::tempdir;

    struct FakeDb(AtomicBool);

    impl FakeDb {
        fn new(installed: bool) -> Arc<Self> {
            Arc::new(Self(AtomicBool::new(installed)))
        }
    }

    impl PackageDb for FakeDb {
        fn is_installed(&self, _package: &str) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh", ["-c", script])
    }

    fn runner(
        db: Arc<FakeDb>,
        lock_file: PathBuf,
    ) -> (PackageRunner, mpsc::Receiver<PackageRecord>, Arc<RecordingSink>) {
        let (tx, rx) = mpsc::channel();
        let sink = Arc::new(RecordingSink::new());
        let runner = PackageRunner::new(db, lock_file, tx, sink.clone());
        (runner, rx, sink)
    }

    #[test]
    fn successful_install_queues_follow_up_once() {
        let dir = tempdir().unwrap();
        let (runner, rx, sink) = runner(FakeDb::new(true), dir.path().join("db.lck"));
        let launch = CommandSpec::new("/usr/bin/gparted", Vec::<String>::new());

        let status = runner.install("gparted", &sh("echo installing; exit 0"), Some(launch.clone()));
        assert_eq!(status.unwrap(), OpStatus::Succeeded);

        let record = rx.try_recv().unwrap();
        assert_eq!(record.follow_up(), Some(&launch));
        assert!(rx.try_recv().is_err());

        let kinds: Vec<_> = sink.notices().iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NoticeKind::Progress, NoticeKind::Success]);
    }

    #[test]
    fn nonzero_exit_is_a_failure_without_follow_up() {
        let dir = tempdir().unwrap();
        let (runner, rx, sink) = runner(FakeDb::new(true), dir.path().join("db.lck"));
        let launch = CommandSpec::new("/usr/bin/gparted", Vec::<String>::new());

        let status = runner.install("gparted", &sh("exit 1"), Some(launch));
        assert_eq!(status.unwrap(), OpStatus::Failed);

        let record = rx.try_recv().unwrap();
        assert_eq!(record.status, OpStatus::Failed);
        assert!(record.follow_up().is_none());
        assert_eq!(sink.notices().last().unwrap().kind, NoticeKind::Failure);
    }

    #[test]
    fn still_missing_after_install_is_a_failure() {
        let dir = tempdir().unwrap();
        let (runner, rx, _sink) = runner(FakeDb::new(false), dir.path().join("db.lck"));

        let status = runner.install("arandr", &sh("exit 0"), Some(sh("true")));
        assert_eq!(status.unwrap(), OpStatus::Failed);
        assert!(rx.try_recv().unwrap().follow_up().is_none());
    }

    #[test]
    fn missing_binary_is_a_failure() {
        let dir = tempdir().unwrap();
        let (runner, _rx, _sink) = runner(FakeDb::new(true), dir.path().join("db.lck"));
        let cmd = CommandSpec::new("/nonexistent/pacman-for-tests", ["-S"]);
        assert_eq!(runner.install("gparted", &cmd, None).unwrap(), OpStatus::Failed);
    }

    #[test]
    fn lock_file_refuses_without_spawning() {
        let dir = tempdir().unwrap();
        let lock = dir.path().join("db.lck");
        std::fs::write(&lock, "").unwrap();
        let marker = dir.path().join("ran");
        let (runner, rx, sink) = runner(FakeDb::new(true), lock);
        let cmd = sh(&format!("touch '{}'", marker.display()));

        let err = runner.install("gparted", &cmd, None).unwrap_err();
        assert!(matches!(err, WelcomeError::PackageLocked(_)));
        let err = runner.remove("gparted", &cmd).unwrap_err();
        assert!(matches!(err, WelcomeError::PackageLocked(_)));

        assert!(!marker.exists());
        assert!(rx.try_recv().is_err());
        assert!(sink.notices().iter().all(|n| n.kind == NoticeKind::Warning));
    }

    #[test]
    fn duplicate_operation_is_refused() {
        let dir = tempdir().unwrap();
        let (runner, rx, _sink) = runner(FakeDb::new(true), dir.path().join("db.lck"));
        let held = runner.in_flight().try_begin("gparted").unwrap();

        let err = runner.install("gparted", &sh("exit 0"), None).unwrap_err();
        assert!(matches!(err, WelcomeError::AlreadyRunning(_)));
        assert!(rx.try_recv().is_err());

        drop(held);
        assert!(!runner.in_flight().is_running("gparted"));
        assert_eq!(runner.install("gparted", &sh("exit 0"), None).unwrap(), OpStatus::Succeeded);
    }

    #[test]
    fn panicked_worker_does_not_block_package() {
        let flight = InFlight::new();
        let shared = Arc::clone(&flight.active);
        let _ = std::thread::spawn(move || {
            let _held = shared.lock().unwrap();
            panic!("worker died holding the lock");
        })
        .join();
        assert!(flight.active.is_poisoned());

        let guard = flight.try_begin("gparted");
        assert!(guard.is_some());
        assert!(flight.is_running("gparted"));
        drop(guard);
        assert!(!flight.is_running("gparted"));
    }

    #[test]
    fn remove_succeeds_when_package_is_gone() {
        let dir = tempdir().unwrap();
        let (runner, rx, sink) = runner(FakeDb::new(false), dir.path().join("db.lck"));
        assert_eq!(runner.remove("gparted", &sh("exit 0")).unwrap(), OpStatus::Succeeded);
        assert!(rx.try_recv().is_err());
        assert_eq!(sink.notices().last().unwrap().title, "Package gparted removed");
    }

    #[test]
    fn drain_launches_only_successes() {
        let (tx, rx) = mpsc::channel();
        let launch = CommandSpec::new("/usr/bin/arandr", Vec::<String>::new());
        tx.send(PackageRecord {
            status: OpStatus::Failed,
            post_command: Some(launch.clone()),
            package: "arandr".into(),
        })
        .unwrap();
        tx.send(PackageRecord {
            status: OpStatus::Succeeded,
            post_command: Some(launch.clone()),
            package: "arandr".into(),
        })
        .unwrap();
        drop(tx);

        let mut launched = Vec::new();
        drain_records(rx, |cmd| launched.push(cmd.clone()));
        assert_eq!(launched, vec![launch]);
    }

    #[test]
    fn pacman_commands_are_elevated() {
        assert_eq!(
            Pacman::install_command("gparted").to_string(),
            "pkexec pacman -Sy gparted --noconfirm --needed"
        );
        assert_eq!(Pacman::remove_command("gparted").to_string(), "pkexec pacman -Rs gparted --noconfirm");
    }
}
