//! The IPC server the local UI talks to.
//!
//! Each client connection is served on its own task. Within a connection requests are answered
//! strictly in order, one response per request. Only a framing violation or the client going away
//! ends a connection; failures while handling a request are sent back as `error` responses.

use std::sync::Arc;

use shared_std::ipc::{read_frame, write_frame, FrameError, IpcResponse, MAX_MESSAGE_SIZE};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{ipc_handler::handle_frame, service_api::ServiceApi};

/// An interface for the service IPC server
pub struct IpcServer {}

impl IpcServer {
    /// Listens on the named pipe `pipe_name` until `cancel` fires.
    #[cfg(windows)]
    pub async fn listen(
        api: Arc<ServiceApi>,
        pipe_name: &str,
        cancel: CancellationToken,
    ) -> std::io::Result<()> {
        use tokio::net::windows::named_pipe::{PipeMode, ServerOptions};
        use tracing::info;

        info!("Trying to start IPC server at {}...", pipe_name);

        let mut server = ServerOptions::new()
            .first_pipe_instance(true)
            .pipe_mode(PipeMode::Byte)
            .create(pipe_name)?;

        info!("Named pipe listening on {}", pipe_name);

        loop {
            let connected = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("IPC server stopping");
                    return Ok(());
                }
                connected = server.connect() => connected,
            };

            // replace the broken instance and keep listening
            if let Err(e) = connected {
                warn!("IPC client failed to connect: {e}");
                server = ServerOptions::new().pipe_mode(PipeMode::Byte).create(pipe_name)?;
                continue;
            }

            // create the next server instance before handing this one to a client, without this
            // there is a fraction of time where there will be no server listening
            let next_server = ServerOptions::new().pipe_mode(PipeMode::Byte).create(pipe_name)?;
            let client = std::mem::replace(&mut server, next_server);

            let api = Arc::clone(&api);
            let cancel = cancel.child_token();

            tokio::spawn(async move {
                if let Err(e) = serve_connection(client, api, cancel).await {
                    warn!("IPC connection dropped: {e}");
                }
            });
        }
    }

    /// Named pipes only exist on Windows; elsewhere the server idles until shutdown.
    #[cfg(not(windows))]
    pub async fn listen(
        _api: Arc<ServiceApi>,
        pipe_name: &str,
        cancel: CancellationToken,
    ) -> std::io::Result<()> {
        tracing::warn!("IPC server at {pipe_name} is not available on this platform");
        cancel.cancelled().await;
        Ok(())
    }
}

/// Serves one client until it disconnects, sends a bad frame, or `cancel` fires.
pub async fn serve_connection<S>(
    mut stream: S,
    api: Arc<ServiceApi>,
    cancel: CancellationToken,
) -> Result<(), FrameError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            frame = read_frame(&mut stream) => frame?,
        };

        let Some(frame) = frame else {
            debug!("IPC client disconnected");
            return Ok(());
        };

        let response = handle_frame(&frame, &api, &cancel).await;
        write_frame(&mut stream, &encode_response(response)?).await?;
    }
}

/// Serialises a response, replacing it with an `error` response when it would not fit in a frame.
fn encode_response(response: IpcResponse) -> Result<Vec<u8>, FrameError> {
    let payload = serde_json::to_vec(&response)?;
    if payload.len() <= MAX_MESSAGE_SIZE {
        return Ok(payload);
    }

    warn!(
        "Response to {} is {} bytes, over the {MAX_MESSAGE_SIZE} byte limit",
        response.correlation_id,
        payload.len()
    );
    let replacement = IpcResponse::error(
        response.correlation_id,
        "response exceeds maximum message size",
        None,
    );

    Ok(serde_json::to_vec(&replacement)?)
}
