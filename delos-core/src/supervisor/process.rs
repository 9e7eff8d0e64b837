//! External process execution and termination
//!
//! Provider commands run through the platform shell. Run-to-completion
//! commands are captured whole; background commands are wrapped in a
//! [`ProcessHandle`] that owns the child and retires it with the
//! terminate / wait / kill escalation.

use std::collections::VecDeque;
use std::process::{ExitStatus, Output, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::SupervisorError;

/// Lines of background output kept for diagnostics
const OUTPUT_TAIL_LINES: usize = 20;

/// Result of a run-to-completion command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status was zero
    pub success: bool,
    /// Exit code, absent when killed by a signal
    pub code: Option<i32>,
    /// stdout followed by stderr, trimmed
    pub output: String,
}

impl From<Output> for CommandOutput {
    fn from(out: Output) -> Self {
        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        Self {
            success: out.status.success(),
            code: out.status.code(),
            output: output.trim().to_string(),
        }
    }
}

/// Build a std command that runs `command` through the platform shell
fn shell_command(command: &str) -> std::process::Command {
    #[cfg(windows)]
    {
        let mut cmd = std::process::Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    }

    #[cfg(not(windows))]
    {
        let mut cmd = std::process::Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

/// Run a command to completion, capturing its combined output
pub async fn run_captured(command: &str) -> std::io::Result<CommandOutput> {
    debug!("Running: {}", command);
    let mut cmd = tokio::process::Command::from(shell_command(command));
    cmd.stdin(Stdio::null());
    let output = cmd.output().await?;
    Ok(output.into())
}

/// Blocking variant of [`run_captured`] for contexts that cannot await
pub fn run_captured_blocking(command: &str) -> std::io::Result<CommandOutput> {
    debug!("Running (blocking): {}", command);
    let output = shell_command(command).stdin(Stdio::null()).output()?;
    Ok(output.into())
}

/// How a background process ended when it was retired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Found dead at the first poll, no signal sent
    AlreadyExited,
    /// Exited within the grace period after SIGTERM
    Terminated,
    /// Needed SIGKILL
    Killed,
}

#[derive(Clone, Copy)]
enum StopSignal {
    Graceful,
    Forced,
}

/// Handle to a detached background process
///
/// On Unix the process leads its own process group and signals go to the
/// whole group, so shell wrappers and the tool they launch die together.
/// Dropping a handle whose process was never retired kills the group.
#[derive(Debug)]
pub struct ProcessHandle {
    label: String,
    pid: u32,
    child: Child,
    tail: Arc<Mutex<VecDeque<String>>>,
    retired: bool,
    #[cfg(test)]
    skip_forced_kill: bool,
}

impl ProcessHandle {
    /// Launch `command` in the background
    ///
    /// stdout and stderr are forwarded to the debug log under `label`.
    pub fn spawn(command: &str, label: &str) -> std::io::Result<Self> {
        let mut std_cmd = shell_command(command);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }
        std_cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut cmd = tokio::process::Command::from(std_cmd);
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let pid = child.id().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                "process exited before its pid could be read",
            )
        })?;

        let tail = Arc::new(Mutex::new(VecDeque::with_capacity(OUTPUT_TAIL_LINES)));
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(label.to_string(), stdout, Arc::clone(&tail)));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(label.to_string(), stderr, Arc::clone(&tail)));
        }

        debug!(pid, "Spawned background process for {}", label);
        Ok(Self {
            label: label.to_string(),
            pid,
            child,
            tail,
            retired: false,
            #[cfg(test)]
            skip_forced_kill: false,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Poll the process without blocking
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Exit status if the process has already exited
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        self.child.try_wait().ok().flatten()
    }

    /// Last lines the process wrote, joined with newlines
    pub fn output_tail(&self) -> String {
        self.tail
            .lock()
            .map(|lines| lines.iter().cloned().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default()
    }

    /// Retire the process: poll, SIGTERM, wait `grace`, SIGKILL, wait `kill_wait`
    ///
    /// A process found dead at the poll gets no signal at all. Fails with
    /// [`SupervisorError::KillFailed`] only when the process outlives SIGKILL.
    pub async fn retire(
        &mut self,
        grace: Duration,
        kill_wait: Duration,
    ) -> Result<Termination, SupervisorError> {
        let pid = self.pid;

        if !self.is_alive() {
            info!(pid, "Process {} of {} is dead.", pid, self.label);
            self.retired = true;
            return Ok(Termination::AlreadyExited);
        }

        info!(pid, "Process {} running. Attempting to terminate.", pid);
        self.signal(StopSignal::Graceful);

        match timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!(pid, "Process {} terminated ({})", pid, status);
                self.retired = true;
                return Ok(Termination::Terminated);
            }
            Ok(Err(e)) => warn!(pid, "Failed to wait for process {}: {}", pid, e),
            Err(_) => warn!(
                pid,
                "Process {} ignored SIGTERM for {:?}. Attempting to kill.", pid, grace
            ),
        }

        if self.forced_kill_held() {
            debug!(pid, "Forced kill held back");
        } else {
            self.signal(StopSignal::Forced);
        }

        match timeout(kill_wait, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!(pid, "Process {} killed ({})", pid, status);
                self.retired = true;
                Ok(Termination::Killed)
            }
            _ => {
                error!(
                    pid,
                    "Process {} of {} survived SIGKILL. Please kill it manually.", pid, self.label
                );
                Err(SupervisorError::KillFailed {
                    name: self.label.clone(),
                    pid,
                })
            }
        }
    }

    /// Make `retire` skip its SIGKILL so a stubborn child outlives it
    ///
    /// Drop still kills the process.
    #[cfg(test)]
    pub(crate) fn hold_forced_kill(&mut self) {
        self.skip_forced_kill = true;
    }

    #[cfg(test)]
    fn forced_kill_held(&self) -> bool {
        self.skip_forced_kill
    }

    #[cfg(not(test))]
    fn forced_kill_held(&self) -> bool {
        false
    }

    #[cfg(unix)]
    fn signal(&mut self, signal: StopSignal) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let signal = match signal {
            StopSignal::Graceful => Signal::SIGTERM,
            StopSignal::Forced => Signal::SIGKILL,
        };

        match killpg(Pid::from_raw(self.pid as i32), signal) {
            Ok(()) => debug!(pid = self.pid, "Sent {:?} to process group", signal),
            // Group already gone; the following wait observes the exit
            Err(nix::errno::Errno::ESRCH) => {
                debug!(pid = self.pid, "Process group already gone")
            }
            Err(e) => warn!(pid = self.pid, "Failed to send {:?}: {}", signal, e),
        }
    }

    #[cfg(not(unix))]
    fn signal(&mut self, _signal: StopSignal) {
        // No graceful signal for a console-less child; both steps force
        if let Err(e) = self.child.start_kill() {
            warn!(pid = self.pid, "Failed to kill process: {}", e);
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.retired && self.is_alive() {
            warn!(
                pid = self.pid,
                "Dropping live process {} of {}, killing it", self.pid, self.label
            );
            self.signal(StopSignal::Forced);
        }
    }
}

/// Forward a child's output stream to the debug log, keeping a short tail
async fn forward_output<R>(label: String, stream: R, tail: Arc<Mutex<VecDeque<String>>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(stream).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        debug!("{}: {}", label, line);
        if let Ok(mut tail) = tail.lock() {
            if tail.len() == OUTPUT_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }
}
