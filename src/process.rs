//! External program invocation
//!
//! Programs (audio players, espeak-ng) are run to completion and judged
//! by exit status. An optional wall-clock limit kills one that hangs.

use log::{debug, warn};
use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a limited child is checked for exit
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run a command, wait for it, and fail on a non-zero exit
///
/// With `limit` set the child is killed once the limit passes and the
/// call fails with `ErrorKind::TimedOut`.
pub fn run(cmd: &mut Command, limit: Option<Duration>) -> io::Result<()> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    debug!("Running {} {:?}", program, cmd.get_args().collect::<Vec<_>>());

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let status = match limit {
        None => child.wait()?,
        Some(limit) => {
            let start = Instant::now();
            loop {
                if let Some(status) = child.try_wait()? {
                    break status;
                }
                if start.elapsed() >= limit {
                    warn!("{} still running after {:?}, killing it", program, limit);
                    if let Err(e) = child.kill() {
                        debug!("Failed to kill {}: {}", program, e);
                    }
                    let _ = child.wait(); // Clean up zombie
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("{} timed out after {:?}", program, limit),
                    ));
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    };

    check_status(&program, status)
}

fn check_status(program: &str, status: ExitStatus) -> io::Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} exited with {}", program, status),
        ))
    }
}
