//! The two ways into the engine: the HTTP listener for remote callers and the named pipe IPC
//! server for the local UI.

pub mod http;
pub mod ipc;
