use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Bounded polling. External drives can report a write or a delete as done
/// before the file system shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    /// `None` polls until the probe succeeds.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Satisfied,
    TimedOut,
}

/// Call `probe` until it returns `true` or the policy's timeout elapses.
/// The probe always runs at least once. Probe errors end the wait.
pub fn wait_until<F>(policy: &WaitPolicy, mut probe: F) -> io::Result<WaitOutcome>
where
    F: FnMut() -> io::Result<bool>,
{
    let start = Instant::now();
    loop {
        if probe()? {
            return Ok(WaitOutcome::Satisfied);
        }
        let elapsed = start.elapsed();
        let pause = match policy.timeout {
            Some(timeout) if elapsed >= timeout => return Ok(WaitOutcome::TimedOut),
            Some(timeout) => policy.poll_interval.min(timeout - elapsed),
            None => policy.poll_interval,
        };
        thread::sleep(pause);
    }
}

/// Wait until `path` is at least `expected` bytes. A missing file counts as
/// not there yet.
pub fn wait_for_size(path: &Path, expected: u64, policy: &WaitPolicy) -> io::Result<WaitOutcome> {
    wait_until(policy, || match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.len() >= expected),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    })
}

/// Wait until nothing exists at `path`.
pub fn wait_for_removal(path: &Path, policy: &WaitPolicy) -> io::Result<WaitOutcome> {
    wait_until(policy, || match fs::symlink_metadata(path) {
        Ok(_) => Ok(false),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(err) => Err(err),
    })
}
