//! Turns an inbound request path into a command execution.
//!
//! Accepted shapes are `/{command}` and `/{secret}/{command}`; any further segments belong to
//! other routes and are ignored here. The decision table, evaluated once per request:
//!
//! 1. malformed path => nothing happens
//! 2. a secret is configured and the supplied one differs => nothing happens
//! 3. the command resolves through the catalog => it is executed
//! 4. otherwise the configured default command, unless it is `None`, is executed
//! 5. otherwise nothing happens
//!
//! "Nothing happens" is not an error, and every cause of it looks the same to the caller.

use std::sync::Arc;

use shared_std::{commands, commands::CommandType, settings::PowerBridgeSettings};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{error::CommandError, executor::CommandExecutor};

const SEPARATOR: char = '/';

/// The parts of a request path this layer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTarget<'a> {
    pub secret: Option<&'a str>,
    pub command: &'a str,
}

/// Splits `path` into an optional secret and a command name. `None` for empty paths, paths not
/// starting with `/`, or paths with no non-empty segment.
pub fn parse_request_path(path: &str) -> Option<RequestTarget<'_>> {
    let rest = path.strip_prefix(SEPARATOR)?;
    let mut segments = rest.split(SEPARATOR).filter(|s| !s.is_empty());

    let first = segments.next()?;
    let target = match segments.next() {
        Some(command) => RequestTarget { secret: Some(first), command },
        None => RequestTarget { secret: None, command: first },
    };

    Some(target)
}

pub struct RequestDispatcher {
    executor: Arc<CommandExecutor>,
    settings: watch::Receiver<PowerBridgeSettings>,
}

impl RequestDispatcher {
    pub fn new(
        executor: Arc<CommandExecutor>,
        settings: watch::Receiver<PowerBridgeSettings>,
    ) -> Self {
        RequestDispatcher { executor, settings }
    }

    /// Dispatches one request.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(command))` if `command` was executed
    /// - `Ok(None)` if nothing was executed, for whatever reason
    /// - `Err` if the executor failed, or `cancel` was already cancelled on entry
    pub async fn dispatch(
        &self,
        request_path: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<CommandType>, CommandError> {
        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled);
        }

        let Some(target) = parse_request_path(request_path) else {
            return Ok(None);
        };

        // copy what we need out of the snapshot, the borrow must not live across the await below
        let (secret, default_command) = {
            let settings = self.settings.borrow();
            (settings.http.secret.clone(), settings.http.default_command)
        };

        if !secret.is_empty() && target.secret != Some(secret.as_str()) {
            debug!("Request ignored");
            return Ok(None);
        }

        let command = match commands::get_command_type(target.command) {
            Some(command) => command,
            None if default_command != CommandType::None => default_command,
            None => {
                debug!("Request ignored");
                return Ok(None);
            }
        };

        self.executor.execute(command, cancel).await?;

        Ok(Some(command))
    }
}
