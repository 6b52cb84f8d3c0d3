// Utility functions for subprocesses, user paths and session detection

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use crate::config;
use crate::error::{WelcomeError, WelcomeResult};

/// A program plus its arguments, cheap to clone and send to workers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Same command run through the privilege escalation helper
    pub fn elevated(self) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: config::pacman::ELEVATE.to_string(),
            args,
        }
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Run a command to completion and return its stdout.
/// Non-zero exit is an error carrying stderr.
pub fn run_command(spec: &CommandSpec) -> WelcomeResult<String> {
    let output = spec
        .to_command()
        .stdin(Stdio::null())
        .output()
        .map_err(|e| WelcomeError::SpawnFailed(spec.to_string(), e))?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    tracing::debug!(command = %spec, "{}", stdout.trim_end());
    if output.status.success() {
        Ok(stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(WelcomeError::command_failed(&spec.to_string(), stderr.trim()))
    }
}

/// Run a command, forwarding every stdout and stderr line to `on_line` as it arrives.
pub fn stream_command(
    spec: &CommandSpec,
    mut on_line: impl FnMut(&str),
) -> WelcomeResult<ExitStatus> {
    let mut child = spec
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| WelcomeError::SpawnFailed(spec.to_string(), e))?;

    let (line_tx, line_rx) = std::sync::mpsc::channel::<String>();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(forward_lines(stdout, line_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(forward_lines(stderr, line_tx.clone()));
    }
    drop(line_tx);

    // ends once both pipes are closed
    for line in line_rx {
        on_line(&line);
    }
    for reader in readers {
        let _ = reader.join();
    }
    child
        .wait()
        .map_err(|e| WelcomeError::Io(e, format!("waiting for {}", spec)))
}

fn forward_lines<R: Read + Send + 'static>(
    pipe: R,
    tx: std::sync::mpsc::Sender<String>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(pipe).lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    })
}

/// Start a command without waiting for it. The child is reaped on a
/// background thread so it does not linger as a zombie.
pub fn spawn_detached(spec: &CommandSpec) -> WelcomeResult<()> {
    let mut child = spec
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| WelcomeError::SpawnFailed(spec.to_string(), e))?;
    let label = spec.to_string();
    thread::spawn(move || match child.wait() {
        Ok(status) if !status.success() => tracing::warn!("{} exited with {}", label, status),
        Ok(_) => {}
        Err(e) => tracing::warn!("failed to wait for {}: {}", label, e),
    });
    Ok(())
}

/// Utility: Get the user's home directory
pub fn get_user_home() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return PathBuf::from(home);
        }
    }

    // Fallback to /etc/passwd through getent
    let user = std::env::var("USER").unwrap_or_default();
    if !user.is_empty() {
        if let Ok(output) = Command::new("getent").arg("passwd").arg(&user).output() {
            let passwd_line = String::from_utf8_lossy(&output.stdout);
            for line in passwd_line.lines() {
                let parts: Vec<&str> = line.split(':').collect();
                if parts.len() >= 6 {
                    return PathBuf::from(parts[5]);
                }
            }
        }
    }

    PathBuf::from("/")
}

/// Utility: `$XDG_CONFIG_HOME`, falling back to `~/.config`
pub fn config_home() -> PathBuf {
    match std::env::var("XDG_CONFIG_HOME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => get_user_home().join(".config"),
    }
}

/// Utility: Session type from `XDG_SESSION_TYPE` (x11, wayland, tty)
pub fn session_type() -> Option<String> {
    let session = std::env::var("XDG_SESSION_TYPE").ok().filter(|s| !s.is_empty());
    if session.is_none() {
        tracing::warn!("XDG_SESSION_TYPE is not set in the environment");
    }
    session
}

/// Utility: Locate the privileged helper, preferring the one shipped next to
/// the running executable (development builds) over the installed copy.
pub fn helper_path() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join(config::helper::BINARY_NAME);
            if sibling.is_file() {
                return sibling;
            }
        }
    }
    PathBuf::from(config::helper::INSTALLED_PATH)
}

/// Utility: Check if a binary is reachable through PATH
pub fn on_path(binary: &str) -> bool {
    which::which(binary).is_ok()
}

/// Utility: Existing regular file
pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevated_prefixes_pkexec() {
        let spec = CommandSpec::new("pacman", ["-S", "gparted"]).elevated();
        assert_eq!(spec.program, "pkexec");
        assert_eq!(spec.args, vec!["pacman", "-S", "gparted"]);
        assert_eq!(spec.to_string(), "pkexec pacman -S gparted");
    }

    #[test]
    fn run_command_reports_nonzero_exit() {
        let ok = run_command(&CommandSpec::new("sh", ["-c", "echo hello"])).unwrap();
        assert_eq!(ok.trim(), "hello");
        let err = run_command(&CommandSpec::new("sh", ["-c", "echo nope >&2; exit 3"])).unwrap_err();
        assert!(matches!(err, WelcomeError::CommandFailed(_, ref out) if out == "nope"));
    }

    #[test]
    fn run_command_reports_missing_binary() {
        let err = run_command(&CommandSpec::new("/nonexistent/welcome-test-bin", Vec::<String>::new()))
            .unwrap_err();
        assert!(matches!(err, WelcomeError::SpawnFailed(_, _)));
    }

    #[test]
    fn stream_command_sees_both_pipes() {
        let mut lines = Vec::new();
        let status = stream_command(
            &CommandSpec::new("sh", ["-c", "echo out; echo err >&2; exit 2"]),
            |l| lines.push(l.to_string()),
        )
        .unwrap();
        assert_eq!(status.code(), Some(2));
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
    }
}
