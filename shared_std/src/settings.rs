//! The settings model for the service. Loading, saving and reloading live in the engine; this
//! module only describes the document and its defaults.

use serde::{Deserialize, Serialize};

use crate::{commands::CommandType, ipc::PIPE_NAME};

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct PowerBridgeSettings {
    pub http: HttpSettings,
    pub wake_on_lan: WakeOnLanSettings,
    pub ipc: IpcSettings,
    /// App launcher store. Relative paths resolve against the settings file's directory.
    pub apps_file: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpSettings {
    pub bind_address: String,
    pub port: u16,
    /// Empty means no secret is required.
    pub secret: String,
    /// Executed when the requested command cannot be resolved. `None` disables the fallback.
    pub default_command: CommandType,
}

impl HttpSettings {
    pub fn secret_configured(&self) -> bool {
        !self.secret.is_empty()
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            bind_address: "0.0.0.0".to_string(),
            port: 5001,
            secret: String::new(),
            default_command: CommandType::None,
        }
    }
}

/// The host woken by [`CommandType::WakeOnLan`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct WakeOnLanSettings {
    pub mac_address: String,
    pub broadcast_address: String,
    pub port: u16,
}

impl WakeOnLanSettings {
    pub fn is_configured(&self) -> bool {
        !self.mac_address.trim().is_empty()
    }
}

impl Default for WakeOnLanSettings {
    fn default() -> Self {
        WakeOnLanSettings {
            mac_address: String::new(),
            broadcast_address: "255.255.255.255".to_string(),
            port: 9,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct IpcSettings {
    pub pipe_name: String,
}

impl Default for IpcSettings {
    fn default() -> Self {
        IpcSettings {
            pipe_name: PIPE_NAME.to_string(),
        }
    }
}

impl Default for PowerBridgeSettings {
    fn default() -> Self {
        PowerBridgeSettings {
            http: HttpSettings::default(),
            wake_on_lan: WakeOnLanSettings::default(),
            ipc: IpcSettings::default(),
            apps_file: "apps.json".to_string(),
        }
    }
}
