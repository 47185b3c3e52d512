//! The IPC envelope exchanged between a local client and the service, and the frame codec used to
//! move it over a byte stream.
//!
//! # Wire format
//!
//! Every message is a 4 byte big-endian length followed by exactly that many bytes of UTF-8 JSON.
//! A declared length of zero or above [`MAX_MESSAGE_SIZE`] is a protocol violation and the
//! connection is dropped without reading the body.
//!
//! The JSON is an object carrying a `type` discriminator, a `correlationId`, and the fields of the
//! message kind. Responses also carry `success` and, on failure, `errorMessage`:
//!
//! ```json
//! { "correlationId": "5d1c...", "type": "execute-command", "commandType": "Shutdown" }
//! { "correlationId": "5d1c...", "success": true, "type": "execute-command-response" }
//! ```

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    commands::CommandType,
    models::{AppEntry, ServiceStatus, SystemStats},
};

//
// Consts
//

pub const PIPE_NAME: &str = r"\\.\pipe\powerbridge_service_pipe";

/// Upper bound on a single frame body.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

const LENGTH_PREFIX_SIZE: usize = 4;

//
// Envelope
//

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IpcRequest {
    pub correlation_id: String,
    #[serde(flatten)]
    pub kind: RequestKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum RequestKind {
    GetStats,
    GetApps,
    SaveApp { app: AppEntry },
    DeleteApp { id: String },
    GetStatus,
    ExecuteCommand { command_type: CommandType },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IpcResponse {
    pub correlation_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub kind: ResponseKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ResponseKind {
    GetStatsResponse { stats: SystemStats },
    GetAppsResponse { apps: Vec<AppEntry> },
    SaveAppResponse { app: AppEntry },
    DeleteAppResponse { deleted: bool },
    GetStatusResponse { status: ServiceStatus },
    ExecuteCommandResponse,
    /// Answer to any request whose handling failed. `detail` is only filled in by debug builds.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl IpcResponse {
    pub fn ok(correlation_id: impl Into<String>, kind: ResponseKind) -> Self {
        IpcResponse {
            correlation_id: correlation_id.into(),
            success: true,
            error_message: None,
            kind,
        }
    }

    pub fn error(
        correlation_id: impl Into<String>,
        message: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        IpcResponse {
            correlation_id: correlation_id.into(),
            success: false,
            error_message: Some(message.into()),
            kind: ResponseKind::Error { detail },
        }
    }
}

//
// Framing
//

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("declared frame length {0} is outside 1..={MAX_MESSAGE_SIZE}")]
    InvalidLength(usize),
    #[error("stream ended in the middle of a frame")]
    Truncated,
    #[error("frame payload is not a valid message: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Reads one frame body.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly between frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    let mut filled = 0;
    while filled < LENGTH_PREFIX_SIZE {
        let read = reader.read(&mut prefix[filled..]).await?;
        if read == 0 {
            return if filled == 0 { Ok(None) } else { Err(FrameError::Truncated) };
        }
        filled += read;
    }

    let length = u32::from_be_bytes(prefix) as usize;
    if length == 0 || length > MAX_MESSAGE_SIZE {
        return Err(FrameError::InvalidLength(length));
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await.map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FrameError::Truncated,
        _ => FrameError::Io(e),
    })?;

    Ok(Some(body))
}

/// Writes one frame and flushes the writer.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if payload.is_empty() || payload.len() > MAX_MESSAGE_SIZE {
        return Err(FrameError::InvalidLength(payload.len()));
    }

    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;

    Ok(())
}

/// Serialises `message` to JSON and writes it as one frame.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(message)?;
    write_frame(writer, &payload).await
}

/// Reads one frame and deserialises it. `Ok(None)` on a clean close.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    match read_frame(reader).await? {
        Some(frame) => Ok(Some(serde_json::from_slice(&frame)?)),
        None => Ok(None),
    }
}
