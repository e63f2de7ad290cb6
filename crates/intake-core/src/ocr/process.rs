//! Child processes bounded by a document deadline.

use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Run `command` to completion, or kill it once `deadline` passes.
///
/// Returns `Ok(None)` when the child was killed. Without a deadline this is
/// [`Command::output`].
pub(crate) fn output_until(
    command: &mut Command,
    deadline: Option<Instant>,
) -> io::Result<Option<Output>> {
    let Some(deadline) = deadline else {
        return command.output().map(Some);
    };

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Pipes are drained on their own threads so a chatty child cannot block on a full pipe.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(Output {
                status,
                stdout: collect(stdout),
                stderr: collect(stderr),
            }));
        }

        let now = Instant::now();
        if now >= deadline {
            debug!("Killing {:?} at the document deadline", command.get_program());
            if let Err(e) = child.kill() {
                debug!("Kill failed: {}", e);
            }
            child.wait()?;
            // Reader threads are left to finish on their own; a grandchild may still hold the pipes.
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut buf) {
            debug!("Reading child output failed: {}", e);
        }
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
