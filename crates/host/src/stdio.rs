//! Framed stdio binding (native-messaging host)
//!
//! Reads one length-prefixed JSON request at a time from stdin and writes
//! the framed response to stdout. Logging goes to stderr; stdout belongs to
//! the frame protocol.

use cardbridge_openpgp::SessionFactory;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use crate::frame::{self, FRAME_READ_TIMEOUT, FrameError};
use crate::protocol::{Request, Response};
use crate::service::SignerService;

/// How many requests one process instance serves on the pipe
///
/// Both deployments exist: a browser that launches the host per request, and
/// one that keeps the pipe open across many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Answer a single request, then exit
    Once,
    /// Keep serving until the peer closes the pipe
    Loop,
}

/// Serve requests on the process stdio streams
pub async fn serve<F>(service: &SignerService<F>, mode: RunMode) -> Result<(), FrameError>
where
    F: SessionFactory + Send + Sync + 'static,
{
    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    serve_streams(service, mode, &mut stdin, &mut stdout).await
}

/// Serve requests on arbitrary streams
///
/// In [`RunMode::Once`] the first frame must arrive within the frame
/// timeout; in [`RunMode::Loop`] the idle wait between frames is unbounded
/// (only frame completion is).
pub async fn serve_streams<F, R, W>(
    service: &SignerService<F>,
    mode: RunMode,
    reader: &mut R,
    writer: &mut W,
) -> Result<(), FrameError>
where
    F: SessionFactory + Send + Sync + 'static,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let read = frame::read_message::<_, Request>(reader, FRAME_READ_TIMEOUT);
        let read = match mode {
            RunMode::Once => tokio::time::timeout(FRAME_READ_TIMEOUT, read)
                .await
                .map_err(|_| FrameError::Timeout)?,
            RunMode::Loop => read.await,
        };

        let request = match read {
            Ok(Some(request)) => request,
            Ok(None) => {
                info!("peer closed the pipe");
                return Ok(());
            }
            // The frame itself arrived; answer a JSON failure in-band
            Err(FrameError::Json(err)) => {
                let response = Response::error(format!("invalid request: {err}"));
                frame::write_message(writer, &response).await?;
                if mode == RunMode::Once {
                    return Ok(());
                }
                continue;
            }
            Err(err) => return Err(err),
        };

        let response = service.dispatch(request).await;
        frame::write_message(writer, &response).await?;

        if mode == RunMode::Once {
            return Ok(());
        }
    }
}
