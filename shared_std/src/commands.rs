//! The catalog of commands a caller may ask the service to perform.
//!
//! The catalog is a static table built at compile time; it is never mutated and is shared by
//! reference with every consumer. Names are resolved case-insensitively, first against the display
//! names in the table and then against the raw [`CommandType`] identifiers.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every action the service knows how to perform.
///
/// `None` is the "no command" sentinel: it has no catalog entry and executing it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommandType {
    #[default]
    None,
    Restart,
    TurnScreenOff,
    Shutdown,
    ForceShutdown,
    Lock,
    #[serde(rename = "UEFIReboot")]
    UefiReboot,
    WakeOnLan,
}

impl CommandType {
    pub const ALL: [CommandType; 8] = [
        CommandType::None,
        CommandType::Restart,
        CommandType::TurnScreenOff,
        CommandType::Shutdown,
        CommandType::ForceShutdown,
        CommandType::Lock,
        CommandType::UefiReboot,
        CommandType::WakeOnLan,
    ];

    /// The raw identifier of the variant, as it appears on the wire.
    pub const fn identifier(self) -> &'static str {
        match self {
            CommandType::None => "None",
            CommandType::Restart => "Restart",
            CommandType::TurnScreenOff => "TurnScreenOff",
            CommandType::Shutdown => "Shutdown",
            CommandType::ForceShutdown => "ForceShutdown",
            CommandType::Lock => "Lock",
            CommandType::UefiReboot => "UEFIReboot",
            CommandType::WakeOnLan => "WakeOnLan",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a command identifier")]
pub struct ParseCommandTypeError(String);

/// Parses a raw identifier such as `TurnScreenOff` or `uefireboot`, ignoring ASCII case and
/// surrounding whitespace. `None` parses like any other identifier.
impl FromStr for CommandType {
    type Err = ParseCommandTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        CommandType::ALL
            .into_iter()
            .find(|t| t.identifier().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseCommandTypeError(s.to_string()))
    }
}

/// A catalog entry: a command type and its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub command_type: CommandType,
    pub name: &'static str,
}

static COMMANDS: [Command; 7] = [
    Command { command_type: CommandType::Restart, name: "Restart" },
    Command { command_type: CommandType::TurnScreenOff, name: "Turn Screen Off" },
    Command { command_type: CommandType::Shutdown, name: "Shutdown" },
    Command { command_type: CommandType::ForceShutdown, name: "Force Shutdown" },
    Command { command_type: CommandType::Lock, name: "Lock" },
    Command { command_type: CommandType::UefiReboot, name: "UEFI Reboot" },
    Command { command_type: CommandType::WakeOnLan, name: "Wake On LAN" },
];

/// The full, ordered catalog. One entry per command type other than `None`.
pub fn commands() -> &'static [Command] {
    &COMMANDS
}

/// The display name of a command, or `None` for [`CommandType::None`].
pub fn get_text(command_type: CommandType) -> Option<&'static str> {
    COMMANDS
        .iter()
        .find(|c| c.command_type == command_type)
        .map(|c| c.name)
}

/// Resolves an untrusted name to a command type.
///
/// Display names are tried first, then raw identifiers. Blank input, unknown names and the `None`
/// identifier all resolve to `None`.
pub fn get_command_type(name: &str) -> Option<CommandType> {
    try_get_command_by_name(name).map(|c| c.command_type)
}

/// Like [`get_command_type`] but returns the whole catalog entry.
pub fn try_get_command_by_name(name: &str) -> Option<&'static Command> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    if let Some(command) = COMMANDS.iter().find(|c| c.name.eq_ignore_ascii_case(name)) {
        return Some(command);
    }

    let parsed = name.parse::<CommandType>().ok()?;
    COMMANDS.iter().find(|c| c.command_type == parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_one_entry_per_real_command() {
        for command_type in CommandType::ALL {
            let count = commands().iter().filter(|c| c.command_type == command_type).count();
            let expected = if command_type == CommandType::None { 0 } else { 1 };
            assert_eq!(count, expected, "{command_type}");
        }
    }

    #[test]
    fn names_are_unique_ignoring_case() {
        let mut names: Vec<String> = commands().iter().map(|c| c.name.to_lowercase()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), commands().len());
    }

    #[test]
    fn display_names_round_trip_under_case_changes() {
        for command in commands() {
            let text = get_text(command.command_type).unwrap();
            assert_eq!(get_command_type(text), Some(command.command_type));
            assert_eq!(get_command_type(&text.to_uppercase()), Some(command.command_type));
            assert_eq!(get_command_type(&text.to_lowercase()), Some(command.command_type));
        }
    }

    #[test]
    fn raw_identifiers_resolve() {
        assert_eq!(get_command_type("turnscreenoff"), Some(CommandType::TurnScreenOff));
        assert_eq!(get_command_type("UEFIREBOOT"), Some(CommandType::UefiReboot));
        assert_eq!(get_command_type("wakeonlan"), Some(CommandType::WakeOnLan));
        assert_eq!(get_command_type("  shutdown "), Some(CommandType::Shutdown));
    }

    #[test]
    fn blank_and_unknown_names_are_not_found() {
        assert_eq!(get_command_type(""), None);
        assert_eq!(get_command_type("   "), None);
        assert_eq!(get_command_type("reboot-now"), None);
        assert_eq!(get_command_type("none"), None);
        assert!(try_get_command_by_name("\t").is_none());
    }

    #[test]
    fn none_has_no_text() {
        assert_eq!(get_text(CommandType::None), None);
        assert_eq!(get_text(CommandType::Lock), Some("Lock"));
    }

    #[test]
    fn try_get_returns_full_entry() {
        let command = try_get_command_by_name("force shutdown").unwrap();
        assert_eq!(command.command_type, CommandType::ForceShutdown);
        assert_eq!(command.name, "Force Shutdown");
    }

    #[test]
    fn wire_identifier_matches_serde() {
        for command_type in CommandType::ALL {
            let json = serde_json::to_string(&command_type).unwrap();
            assert_eq!(json, format!("\"{}\"", command_type.identifier()));
        }
    }
}
