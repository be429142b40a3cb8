// vsci-core/src/process.rs
use std::ffi::OsStr;
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured outcome of a child process that ran to completion.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

#[derive(Debug)]
pub enum RunError {
    /// The program could not be started at all.
    Spawn(std::io::Error),
    /// The program ran past its deadline and was killed.
    TimedOut(Duration),
    /// Waiting on the child failed.
    Wait(std::io::Error),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Spawn(e) => write!(f, "failed to start: {e}"),
            RunError::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
            RunError::Wait(e) => write!(f, "failed while waiting: {e}"),
        }
    }
}

/// Runs `program args` with stdin closed, collecting stdout and stderr, and
/// kills it once `timeout` elapses. The child leads its own process group so
/// the kill also reaches anything it started.
pub fn run_with_timeout<I, S>(
    program: impl AsRef<OsStr>,
    args: I,
    timeout: Duration,
) -> std::result::Result<ProcessOutput, RunError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program.as_ref());
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);
    debug!("Running {:?} with timeout {:?}", command, timeout);

    let mut child = command.spawn().map_err(RunError::Spawn)?;
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    // On timeout the readers are left to finish on their own: a descendant
    // that escaped the group may still hold the pipes open.
    let status = wait_with_deadline(&mut child, timeout)?;
    Ok(ProcessOutput {
        status,
        stdout: join_reader(stdout_reader),
        stderr: join_reader(stderr_reader),
    })
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> std::result::Result<ExitStatus, RunError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                warn!("Process {} exceeded {:?}; killing it", child.id(), timeout);
                kill_group(child);
                // Reap it so it does not linger as a zombie.
                let _ = child.wait();
                return Err(RunError::TimedOut(timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(RunError::Wait(e)),
        }
    }
}

fn kill_group(child: &mut Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    // A negative pid addresses the whole process group.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        debug!("Killing process group {} failed: {}", pgid, err);
        if let Err(e) = child.kill() {
            warn!("Failed to kill process {}: {}", pgid, e);
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
