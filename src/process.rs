//! # Process supervision for tunnel executables.
//!
//! Spawns the external vendor binary, exposes its output as an ordered
//! stream of decoded lines, and terminates it cleanly.
//!
//! ## Rules
//! - Spawn failures (executable missing, not runnable) surface immediately
//!   as [`TunnelError::Spawn`]; "the tunnel is ready for traffic" is a
//!   higher-level concern decided by the readiness probes.
//! - Output lines preserve per-stream order; no order is promised **between**
//!   stdout and stderr.
//! - [`ProcessHandle::terminate`] sends an interrupt signal and waits for the
//!   real exit; it never force-kills. [`ProcessHandle::kill`] exists for the
//!   failed-start cleanup path only.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::TunnelError;

/// Which stream of the child process a line came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

/// One decoded line of child process output.
#[derive(Clone, Debug)]
pub struct OutputLine {
    pub source: OutputSource,
    /// The line text, without its trailing newline.
    pub text: String,
}

/// A supervised external process.
///
/// Owned exclusively by the tunnel for the duration of a run. Dropping the
/// handle while the child is still alive force-kills it, so an abandoned
/// tunnel cannot leak vendor processes.
pub struct ProcessHandle {
    command: String,
    child: Child,
}

/// Spawns `program` with `args` in `cwd`, stdin closed and both output
/// streams piped.
///
/// Returns the handle and the receiver carrying the merged output line
/// stream. The receiver ends when both pipes reach EOF, i.e. when the
/// process has exited.
pub fn spawn(
    program: &Path,
    args: &[String],
    cwd: &Path,
) -> Result<(ProcessHandle, mpsc::Receiver<OutputLine>), TunnelError> {
    let command = program.display().to_string();
    debug!(target: "tunnelvisor", command = %command, ?args, "spawning tunnel process");

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| TunnelError::Spawn {
            command: command.clone(),
            source,
        })?;

    let (tx, rx) = mpsc::channel(256);
    if let Some(stdout) = child.stdout.take() {
        pump(stdout, OutputSource::Stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        pump(stderr, OutputSource::Stderr, tx);
    }

    Ok((ProcessHandle { command, child }, rx))
}

/// Reads one stream line-by-line into the merged channel until EOF or until
/// the receiving side goes away. The pump task ends on its own; nothing
/// needs to join it.
fn pump<R>(stream: R, source: OutputSource, tx: mpsc::Sender<OutputLine>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(text)) = lines.next_line().await {
            if tx.send(OutputLine { source, text }).await.is_err() {
                break;
            }
        }
    });
}

impl ProcessHandle {
    /// OS process identifier, while the process is alive.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Sends an interrupt signal and waits for the process to actually exit.
    ///
    /// Returns the exit code, or `None` when the process died to a signal.
    /// If the signal cannot be delivered the process is left as-is and the
    /// error is returned, so the caller can keep treating it as running.
    pub async fn terminate(&mut self) -> Result<Option<i32>, TunnelError> {
        self.interrupt()?;
        let status = self.child.wait().await?;
        debug!(target: "tunnelvisor", command = %self.command, code = status.code(), "tunnel process exited");
        Ok(status.code())
    }

    /// Force-kills the process, ignoring failures. Used only to tear down a
    /// child whose startup failed partway.
    pub async fn kill(&mut self) {
        if let Err(err) = self.child.kill().await {
            warn!(target: "tunnelvisor", command = %self.command, error = %err, "failed to kill tunnel process");
        }
    }

    #[cfg(unix)]
    fn interrupt(&mut self) -> Result<(), TunnelError> {
        // Already exited: nothing to signal, wait() below will reap it.
        if matches!(self.child.try_wait(), Ok(Some(_))) {
            return Ok(());
        }
        if let Some(pid) = self.child.id() {
            let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
            if rc != 0 {
                return Err(std::io::Error::last_os_error().into());
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn interrupt(&mut self) -> Result<(), TunnelError> {
        if matches!(self.child.try_wait(), Ok(Some(_))) {
            return Ok(());
        }
        self.child.start_kill().map_err(TunnelError::from)
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            warn!(
                target: "tunnelvisor",
                command = %self.command,
                "process handle dropped while child still running, killing it"
            );
            let _ = self.child.start_kill();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn sh(script: &str) -> (ProcessHandle, mpsc::Receiver<OutputLine>) {
        spawn(
            &PathBuf::from("/bin/sh"),
            &["-c".to_string(), script.to_string()],
            &std::env::temp_dir(),
        )
        .expect("spawn /bin/sh")
    }

    #[tokio::test]
    async fn spawn_missing_executable_fails_fast() {
        let err = spawn(
            &PathBuf::from("/definitely/not/here"),
            &[],
            &std::env::temp_dir(),
        )
        .err()
        .expect("expected spawn failure");
        assert_eq!(err.as_label(), "spawn_error");
    }

    #[tokio::test]
    async fn output_lines_carry_their_source() {
        let (mut handle, mut rx) = sh("echo out; echo err >&2");

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        while let Some(line) = rx.recv().await {
            match line.source {
                OutputSource::Stdout => stdout.push(line.text),
                OutputSource::Stderr => stderr.push(line.text),
            }
        }
        assert_eq!(stdout, vec!["out"]);
        assert_eq!(stderr, vec!["err"]);

        let code = handle.terminate().await.unwrap();
        assert_eq!(code, Some(0));
    }

    #[tokio::test]
    async fn terminate_delivers_sigint_and_reports_exit_code() {
        let (mut handle, _rx) = sh("trap 'exit 3' INT; while :; do sleep 0.05; done");

        // Give the shell a moment to install its trap.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let code = handle.terminate().await.unwrap();
        assert_eq!(code, Some(3));
    }

    #[tokio::test]
    async fn terminate_after_natural_exit_reaps_the_status() {
        let (mut handle, mut rx) = sh("exit 7");
        while rx.recv().await.is_some() {}

        let code = handle.terminate().await.unwrap();
        assert_eq!(code, Some(7));
    }
}
