use serde::{Deserialize, Serialize};

use crate::commands::CommandType;

/// An entry in the app launcher list kept by the service on behalf of the UI.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEntry {
    /// Assigned by the service when an entry is saved without one.
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub arguments: String,
}

/// A point in time snapshot of host resource usage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub host_name: String,
    pub os_version: String,
    pub cpu_usage_percent: f32,
    pub total_memory_bytes: u64,
    pub used_memory_bytes: u64,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub version: String,
    pub uptime_seconds: u64,
    pub http_port: u16,
    pub secret_configured: bool,
    pub wake_on_lan_configured: bool,
    pub default_command: CommandType,
}
