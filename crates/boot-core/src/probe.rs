use std::time::Duration;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::BootError;

const DIAL_TIMEOUT: Duration = Duration::from_secs(1);
const RETRY: Duration = Duration::from_millis(100);

/// Retry connecting to `addr` until it accepts a TCP connection or `cancel` fires.
pub async fn wait_for_connect(cancel: &CancellationToken, addr: &str) -> Result<(), BootError> {
    while !cancel.is_cancelled() {
        let attempt = tokio::time::timeout(DIAL_TIMEOUT, TcpStream::connect(addr));
        tokio::select! {
            res = attempt => match res {
                Ok(Ok(_conn)) => return Ok(()),
                Ok(Err(e)) => debug!(target: "boot.core.probe", addr, error = %e, "not accepting yet"),
                Err(_) => debug!(target: "boot.core.probe", addr, "dial timed out"),
            },
            _ = cancel.cancelled() => break,
        }
        tokio::select! {
            _ = tokio::time::sleep(RETRY) => {}
            _ = cancel.cancelled() => break,
        }
    }
    Err(BootError::Cancelled)
}

/// Sleep for `dur` unless `cancel` fires first.
pub(crate) async fn sleep_or_cancel(cancel: &CancellationToken, dur: Duration) -> Result<(), BootError> {
    tokio::select! {
        _ = tokio::time::sleep(dur) => Ok(()),
        _ = cancel.cancelled() => Err(BootError::Cancelled),
    }
}
