use anyhow::{Context, Result, anyhow};
use std::io::Read;
use std::process::{Child, Output};
use std::time::{Duration, Instant};
use tracing::warn;

/// Waits for `child` while draining its pipes; kills it once `timeout` elapses.
pub fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain pipes while waiting so a chatty child can't deadlock on a full buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let start = Instant::now();
    let (status, timed_out) = loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            break (status, false);
        }
        if start.elapsed() > timeout {
            warn!("child process timed out after {:?}", timeout);
            let _ = child.kill();
            let status = child.wait().with_context(|| "wait after kill")?;
            break (status, true);
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    let stdout = stdout_thread
        .join()
        .map_err(|_| anyhow!("stdout reader thread panicked"))??;
    let stderr = stderr_thread
        .join()
        .map_err(|_| anyhow!("stderr reader thread panicked"))??;

    if timed_out {
        return Err(anyhow!(
            "child process exceeded timeout ({:?}); stderr: {}",
            timeout,
            String::from_utf8_lossy(&stderr)
        ));
    }

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}
