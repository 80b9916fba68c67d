use std::io;
use std::thread;
use std::time::{Duration, Instant};

/// Retries `op` on a fixed interval until it succeeds or `timeout` elapses.
///
/// The first attempt runs immediately. On exhaustion the error from the
/// final attempt is returned. Intended for transient filesystem faults,
/// e.g. a directory removal racing a delayed handle release.
pub fn retry_until<F>(interval: Duration, timeout: Duration, mut op: F) -> io::Result<()>
where
    F: FnMut() -> io::Result<()>,
{
    let deadline = Instant::now() + timeout;
    loop {
        match op() {
            Ok(()) => return Ok(()),
            Err(err) => {
                if Instant::now() >= deadline {
                    return Err(err);
                }
                thread::sleep(interval);
            }
        }
    }
}
