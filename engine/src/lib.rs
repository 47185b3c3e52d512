//! The PowerBridge service engine. Runs in the background on the host and performs power
//! management actions (shutdown, restart, lock, screen off, firmware reboot, Wake-on-LAN) on
//! behalf of remote HTTP callers and of the local UI, which talks to it over a named pipe.
//!
//! # Module layout
//!
//! - `executor` / `platform` => mapping a command to the OS action, and the OS actions themselves
//! - `dispatcher` => authenticating and resolving inbound request paths
//! - `communication` => the HTTP listener and the IPC server
//! - `ipc_handler` / `service_api` => answering IPC requests
//! - `settings`, `apps`, `stats` => configuration and the read models served over IPC

pub mod apps;
pub mod communication;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod executor;
pub mod ipc_handler;
pub mod platform;
pub mod service_api;
pub mod settings;
pub mod stats;

pub use engine::Engine;
