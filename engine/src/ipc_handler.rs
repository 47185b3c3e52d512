use std::{fmt::Debug, sync::Arc};

use serde_json::Value;
use shared_std::ipc::{IpcRequest, IpcResponse, RequestKind, ResponseKind};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::{apps::AppStoreError, error::CommandError, service_api::ServiceApi};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    AppStore(#[from] AppStoreError),
    #[error("malformed request: {0}")]
    MalformedRequest(#[from] serde_json::Error),
    #[error("the request handler panicked")]
    Panicked,
}

/// Turns one frame body into exactly one response. Never fails: anything that goes wrong while
/// handling the request becomes an `error` response carrying the request's correlation id.
pub async fn handle_frame(
    frame: &[u8],
    api: &Arc<ServiceApi>,
    cancel: &CancellationToken,
) -> IpcResponse {
    let request: IpcRequest = match serde_json::from_slice(frame) {
        Ok(request) => request,
        Err(e) => {
            let correlation_id = recover_correlation_id(frame);
            warn!("Failed to deserialise IPC request ({} bytes): {e}", frame.len());
            return error_response(correlation_id, HandlerError::MalformedRequest(e));
        }
    };

    let correlation_id = request.correlation_id;

    // run on its own task so a panic in a handler is reported instead of taking down the connection
    let handled = tokio::spawn(handle_ipc(request.kind, Arc::clone(api), cancel.clone()))
        .await
        .unwrap_or(Err(HandlerError::Panicked));

    match handled {
        Ok(kind) => IpcResponse::ok(correlation_id, kind),
        Err(e) => {
            error!("IPC request {correlation_id} failed: {e}");
            error_response(correlation_id, e)
        }
    }
}

/// IPC logic handler: matches on the request kind and calls into the service API.
pub async fn handle_ipc(
    request: RequestKind,
    api: Arc<ServiceApi>,
    cancel: CancellationToken,
) -> Result<ResponseKind, HandlerError> {
    let response = match request {
        RequestKind::GetStats => ResponseKind::GetStatsResponse { stats: api.stats() },
        RequestKind::GetApps => ResponseKind::GetAppsResponse {
            apps: api.apps_list().await,
        },
        RequestKind::SaveApp { app } => ResponseKind::SaveAppResponse {
            app: api.apps_save(app).await?,
        },
        RequestKind::DeleteApp { id } => ResponseKind::DeleteAppResponse {
            deleted: api.apps_delete(&id).await?,
        },
        RequestKind::GetStatus => ResponseKind::GetStatusResponse { status: api.status() },
        RequestKind::ExecuteCommand { command_type } => {
            api.command_execute(command_type, &cancel).await?;
            ResponseKind::ExecuteCommandResponse
        }
    };

    Ok(response)
}

fn error_response(correlation_id: String, error: HandlerError) -> IpcResponse {
    IpcResponse::error(correlation_id, error.to_string(), diagnostic_detail(&error))
}

/// Debug builds send the full error chain back to the client.
fn diagnostic_detail<E: Debug>(error: &E) -> Option<String> {
    cfg!(debug_assertions).then(|| format!("{error:?}"))
}

/// Best effort at keeping correlation for requests that do not match the schema.
fn recover_correlation_id(frame: &[u8]) -> String {
    serde_json::from_slice::<Value>(frame)
        .ok()
        .and_then(|v| v.get("correlationId").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default()
}
