//! Types shared between the PowerBridge service engine and any local client talking to it
//! over IPC: the command catalog, the IPC envelope and its frame codec, the settings model,
//! and the payloads carried by IPC responses.

pub mod commands;
pub mod ipc;
pub mod models;
pub mod settings;
