use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Forward `reader` to the log line by line until EOF or until `close` fires.
pub(super) async fn forward_lines<R>(reader: Option<R>, prefix: &str, close: &CancellationToken)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else { return };
    let mut segments = BufReader::new(reader).split(b'\n');

    loop {
        tokio::select! {
            _ = close.cancelled() => return,
            next = segments.next_segment() => match next {
                Ok(Some(line)) => {
                    let line = String::from_utf8_lossy(&line);
                    info!(target: "boot.child", "[{prefix}] {}", line.trim_end_matches('\r'));
                }
                Ok(None) => return,
                Err(e) => {
                    debug!(target: "boot.exec", prefix, error = %e, "log stream read failed");
                    return;
                }
            }
        }
    }
}

/// Copy `reader` into `writer` verbatim until EOF or until `close` fires.
pub(super) async fn copy_raw<R, W>(
    reader: Option<R>,
    writer: &mut W,
    close: &CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    let Some(mut reader) = reader else {
        return Ok(());
    };
    tokio::select! {
        _ = close.cancelled() => {}
        res = tokio::io::copy(&mut reader, writer) => { res?; }
    }
    writer.flush().await
}
