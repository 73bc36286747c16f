use anyhow::{bail, Result};
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub fn init_tracing() {
    proxybatch::init_tracing();
}

/// Polls `condition` until it holds or the deadline passes.
pub async fn wait_until<F>(mut condition: F, timeout: Duration, what: &str) -> Result<()>
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    loop {
        if condition() {
            return Ok(());
        }
        if start.elapsed() > timeout {
            bail!("{what} not reached within {timeout:?}");
        }
        sleep(Duration::from_millis(10)).await;
    }
}
