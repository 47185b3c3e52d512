//! The client side of the PowerBridge IPC protocol, used by the local UI (and the
//! `powerbridge-ctl` command line) to talk to the background service.

use shared_std::{
    commands::CommandType,
    ipc::{
        read_frame, write_message, FrameError, IpcRequest, IpcResponse, RequestKind, ResponseKind,
    },
    models::{AppEntry, ServiceStatus, SystemStats},
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Reading or writing the pipe failed; the service never ran the request.
    #[error(transparent)]
    Transport(#[from] FrameError),
    #[error("the service closed the connection")]
    Disconnected,
    #[error("response correlation id '{received}' does not match request '{sent}'")]
    CorrelationMismatch { sent: String, received: String },
    /// The service ran the request and it failed.
    #[error("the service reported an error: {message}")]
    Remote { message: String, detail: Option<String> },
    #[error("unexpected response to {request}: {response:?}")]
    UnexpectedResponse { request: &'static str, response: ResponseKind },
}

pub struct IpcClient<S> {
    stream: S,
}

#[cfg(windows)]
impl IpcClient<tokio::net::windows::named_pipe::NamedPipeClient> {
    /// Opens the service's named pipe.
    pub fn connect(pipe_name: &str) -> Result<Self, ClientError> {
        let pipe = tokio::net::windows::named_pipe::ClientOptions::new()
            .open(pipe_name)
            .map_err(FrameError::from)?;

        Ok(IpcClient::new(pipe))
    }
}

impl<S> IpcClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        IpcClient { stream }
    }

    /// Main mechanism for sending IPC requests to the service. Sends one request, waits for its
    /// response and checks the correlation id.
    ///
    /// # Returns
    ///
    /// - Ok: the payload of a successful response
    /// - Err: either a transport problem, or [`ClientError::Remote`] when the service handled the
    ///   request and it failed
    pub async fn send(&mut self, kind: RequestKind) -> Result<ResponseKind, ClientError> {
        let request = IpcRequest {
            correlation_id: Uuid::new_v4().to_string(),
            kind,
        };

        write_message(&mut self.stream, &request).await?;

        let frame = read_frame(&mut self.stream).await?.ok_or(ClientError::Disconnected)?;
        let response: IpcResponse = serde_json::from_slice(&frame).map_err(FrameError::from)?;
        debug!("Received: {:?}", response);

        if response.correlation_id != request.correlation_id {
            return Err(ClientError::CorrelationMismatch {
                sent: request.correlation_id,
                received: response.correlation_id,
            });
        }

        match response {
            IpcResponse { success: true, kind, .. } => Ok(kind),
            IpcResponse { error_message, kind, .. } => Err(ClientError::Remote {
                message: error_message.unwrap_or_default(),
                detail: match kind {
                    ResponseKind::Error { detail } => detail,
                    _ => None,
                },
            }),
        }
    }

    pub async fn get_stats(&mut self) -> Result<SystemStats, ClientError> {
        match self.send(RequestKind::GetStats).await? {
            ResponseKind::GetStatsResponse { stats } => Ok(stats),
            response => Err(unexpected("get-stats", response)),
        }
    }

    pub async fn get_apps(&mut self) -> Result<Vec<AppEntry>, ClientError> {
        match self.send(RequestKind::GetApps).await? {
            ResponseKind::GetAppsResponse { apps } => Ok(apps),
            response => Err(unexpected("get-apps", response)),
        }
    }

    pub async fn save_app(&mut self, app: AppEntry) -> Result<AppEntry, ClientError> {
        match self.send(RequestKind::SaveApp { app }).await? {
            ResponseKind::SaveAppResponse { app } => Ok(app),
            response => Err(unexpected("save-app", response)),
        }
    }

    pub async fn delete_app(&mut self, id: &str) -> Result<bool, ClientError> {
        match self.send(RequestKind::DeleteApp { id: id.to_string() }).await? {
            ResponseKind::DeleteAppResponse { deleted } => Ok(deleted),
            response => Err(unexpected("delete-app", response)),
        }
    }

    pub async fn get_status(&mut self) -> Result<ServiceStatus, ClientError> {
        match self.send(RequestKind::GetStatus).await? {
            ResponseKind::GetStatusResponse { status } => Ok(status),
            response => Err(unexpected("get-status", response)),
        }
    }

    pub async fn execute_command(&mut self, command_type: CommandType) -> Result<(), ClientError> {
        match self.send(RequestKind::ExecuteCommand { command_type }).await? {
            ResponseKind::ExecuteCommandResponse => Ok(()),
            response => Err(unexpected("execute-command", response)),
        }
    }
}

fn unexpected(request: &'static str, response: ResponseKind) -> ClientError {
    ClientError::UnexpectedResponse { request, response }
}

#[cfg(test)]
mod tests {
    use shared_std::ipc::{read_message, write_message};

    use super::*;

    /// Answers a single request with `respond`, the way the service would.
    async fn serve_once<F>(mut server: tokio::io::DuplexStream, respond: F)
    where
        F: FnOnce(IpcRequest) -> IpcResponse,
    {
        let request: IpcRequest = read_message(&mut server).await.unwrap().unwrap();
        write_message(&mut server, &respond(request)).await.unwrap();
    }

    #[tokio::test]
    async fn successful_response_is_unwrapped() {
        let (client_end, server_end) = tokio::io::duplex(4096);
        let server = tokio::spawn(serve_once(server_end, |request| {
            assert_eq!(
                request.kind,
                RequestKind::ExecuteCommand { command_type: CommandType::Lock }
            );
            IpcResponse::ok(request.correlation_id, ResponseKind::ExecuteCommandResponse)
        }));

        let mut client = IpcClient::new(client_end);
        client.execute_command(CommandType::Lock).await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn error_response_becomes_remote_error() {
        let (client_end, server_end) = tokio::io::duplex(4096);
        let server = tokio::spawn(serve_once(server_end, |request| {
            IpcResponse::error(request.correlation_id, "lock failed", Some("trace".to_string()))
        }));

        let mut client = IpcClient::new(client_end);
        match client.execute_command(CommandType::Lock).await {
            Err(ClientError::Remote { message, detail }) => {
                assert_eq!(message, "lock failed");
                assert_eq!(detail.as_deref(), Some("trace"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn mismatched_correlation_id_is_rejected() {
        let (client_end, server_end) = tokio::io::duplex(4096);
        let server = tokio::spawn(serve_once(server_end, |_| {
            IpcResponse::ok("someone-else", ResponseKind::ExecuteCommandResponse)
        }));

        let mut client = IpcClient::new(client_end);
        assert!(matches!(
            client.execute_command(CommandType::Lock).await,
            Err(ClientError::CorrelationMismatch { .. })
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn wrong_response_kind_is_rejected() {
        let (client_end, server_end) = tokio::io::duplex(4096);
        let server = tokio::spawn(serve_once(server_end, |request| {
            IpcResponse::ok(
                request.correlation_id,
                ResponseKind::DeleteAppResponse { deleted: true },
            )
        }));

        let mut client = IpcClient::new(client_end);
        assert!(matches!(
            client.get_apps().await,
            Err(ClientError::UnexpectedResponse { request: "get-apps", .. })
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn closed_pipe_is_disconnected() {
        let (client_end, server_end) = tokio::io::duplex(4096);
        drop(server_end);

        let mut client = IpcClient::new(client_end);
        let result = client.get_status().await;
        assert!(matches!(
            result,
            Err(ClientError::Disconnected) | Err(ClientError::Transport(FrameError::Io(_)))
        ));
    }
}
