//! Blocking invocation of external programs with a timeout and launch retries

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{HubError, Result};

/// Interval between child status polls while waiting for a timeout
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One external program invocation
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Option<Duration>,
    retries: u32,
    backoff: Duration,
}

impl ExternalCommand {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            timeout: None,
            retries: 0,
            backoff: Duration::from_millis(250),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Kill the child and fail once this much wall-clock time has passed
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Relaunch up to `retries` times when the program fails to start.
    ///
    /// The delay starts at `backoff` and doubles after each failed launch.
    /// A program that starts and then fails is never relaunched.
    pub fn retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.retries = retries;
        self.backoff = backoff;
        self
    }

    fn name(&self) -> String {
        self.program.display().to_string()
    }

    /// Run to completion, failing on a non-zero exit status
    pub fn run(&self) -> Result<()> {
        let mut child = self.spawn_with_retry()?;
        let stderr = drain_stderr(&mut child);
        // Reader stays detached when the wait fails
        let status = self.wait(&mut child)?;
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(HubError::ExternalFailed {
                program: self.name(),
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    fn spawn_with_retry(&self) -> Result<Child> {
        let mut delay = self.backoff;
        let mut attempt = 0;
        loop {
            let spawned = Command::new(&self.program)
                .args(&self.args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn();

            match spawned {
                Ok(child) => return Ok(child),
                Err(source) if attempt >= self.retries => {
                    return Err(HubError::ExternalLaunch {
                        program: self.name(),
                        source,
                    });
                }
                Err(err) => {
                    attempt += 1;
                    log::warn!(
                        "Failed to launch {} ({}); retry {}/{} in {:?}",
                        self.name(),
                        err,
                        attempt,
                        self.retries,
                        delay
                    );
                    thread::sleep(delay);
                    delay *= 2;
                }
            }
        }
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|source| HubError::ExternalLaunch {
                program: self.name(),
                source,
            });
        };

        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if started.elapsed() >= timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(HubError::ExternalTimeout {
                        program: self.name(),
                        seconds: timeout.as_secs(),
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    return Err(HubError::ExternalLaunch {
                        program: self.name(),
                        source,
                    })
                }
            }
        }
    }
}

/// Read the child's stderr on a helper thread so a chatty child never blocks
/// on a full pipe
fn drain_stderr(child: &mut Child) -> thread::JoinHandle<String> {
    let pipe = child.stderr.take();
    thread::spawn(move || {
        let mut stderr = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut stderr);
        }
        stderr
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn missing_program_fails_to_launch_after_retries() {
        let started = Instant::now();
        let err = ExternalCommand::new("/nonexistent/infomap")
            .retries(2, Duration::from_millis(10))
            .run()
            .expect_err("program does not exist");
        assert!(matches!(err, HubError::ExternalLaunch { .. }));
        // 10ms + 20ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn non_zero_exit_is_reported() {
        let err = ExternalCommand::new("sh")
            .arg("-c")
            .arg("echo broken >&2; exit 3")
            .run()
            .expect_err("command exits non-zero");
        match err {
            HubError::ExternalFailed { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn flood_of_stderr_still_reports_exit_status() {
        let started = Instant::now();
        let err = ExternalCommand::new("sh")
            .arg("-c")
            .arg("head -c 200000 /dev/zero | tr '\\0' x >&2; exit 1")
            .timeout(Duration::from_secs(20))
            .run()
            .expect_err("command exits non-zero");
        assert!(started.elapsed() < Duration::from_secs(20));
        match err {
            HubError::ExternalFailed { stderr, .. } => assert_eq!(stderr.len(), 200_000),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn hung_program_times_out() {
        let err = ExternalCommand::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(200))
            .run()
            .expect_err("sleep outlives the timeout");
        assert!(matches!(err, HubError::ExternalTimeout { .. }));
    }
}
