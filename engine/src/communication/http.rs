//! The HTTP listener remote callers (such as a home automation hub) hit.
//!
//! `GET /health` answers directly; every other path is handed to the [`RequestDispatcher`]. A
//! request that executed nothing gets `401` whatever the reason, so a caller cannot tell a wrong
//! secret from an unknown command.

use std::{io, sync::Arc};

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use percent_encoding::percent_decode_str;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{dispatcher::RequestDispatcher, error::CommandError};

#[derive(Clone)]
struct HttpState {
    dispatcher: Arc<RequestDispatcher>,
    cancel: CancellationToken,
}

pub fn router(dispatcher: Arc<RequestDispatcher>, cancel: CancellationToken) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .fallback(dispatch_request)
        .with_state(HttpState { dispatcher, cancel })
}

/// Serves HTTP on `listener` until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Arc<RequestDispatcher>,
    cancel: CancellationToken,
) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP listener on http://{}", addr);
    }

    let app = router(dispatcher, cancel.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "powerbridge",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn dispatch_request(State(state): State<HttpState>, uri: Uri) -> Response {
    let Some(path) = decode_path(uri.path()) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match state.dispatcher.dispatch(&path, &state.cancel).await {
        Ok(Some(command)) => (StatusCode::OK, Json(json!({ "command": command }))).into_response(),
        Ok(None) => StatusCode::UNAUTHORIZED.into_response(),
        Err(CommandError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Err(e) => {
            error!("Command dispatch failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Percent-decodes each segment on its own. `None` if a segment decodes to something containing
/// `/`, so an encoded separator can never introduce a segment.
fn decode_path(raw: &str) -> Option<String> {
    let segments = raw
        .split('/')
        .map(|segment| {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            (!decoded.contains('/')).then(|| decoded.into_owned())
        })
        .collect::<Option<Vec<_>>>()?;

    Some(segments.join("/"))
}
