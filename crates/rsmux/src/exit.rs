use std::fmt;
use std::time::Duration;

use rsmux_client::{ClientError, InteractionState};
use rsmux_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match err {
        TransportError::UnsupportedEndpoint(_) => USAGE,
        TransportError::Frame(_) => DATA_INVALID,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Frame(_) | ClientError::Decode(_) | ClientError::Serialize(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ClientError::NotConnected | ClientError::ReconnectExhausted { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        ClientError::Shutdown => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

/// Map a settled interaction that did not complete.
pub fn interaction_error(context: &str, state: &InteractionState) -> CliError {
    match state {
        InteractionState::Failed(message) => {
            CliError::new(FAILURE, format!("{context}: {message}"))
        }
        InteractionState::Cancelled => CliError::new(
            TRANSPORT_ERROR,
            format!("{context}: cancelled (connection lost)"),
        ),
        other => CliError::new(INTERNAL, format!("{context}: unexpected state {other:?}")),
    }
}

pub fn timeout_error(context: &str, after: Duration) -> CliError {
    CliError::new(TIMEOUT, format!("{context}: timed out after {after:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_exit_codes() {
        assert_eq!(
            client_error("x", ClientError::ReconnectExhausted { attempts: 5 }).code,
            TRANSPORT_ERROR
        );
        assert_eq!(client_error("x", ClientError::NotConnected).code, TRANSPORT_ERROR);
        assert_eq!(client_error("x", ClientError::Shutdown).code, INTERNAL);
        assert_eq!(
            client_error(
                "x",
                ClientError::Transport(TransportError::UnsupportedEndpoint("http://h".into()))
            )
            .code,
            USAGE
        );
    }

    #[test]
    fn interaction_failures_keep_the_message() {
        let err = interaction_error(
            "request failed",
            &InteractionState::Failed("boom (APPLICATION_ERROR)".into()),
        );
        assert_eq!(err.code, FAILURE);
        assert_eq!(err.message, "request failed: boom (APPLICATION_ERROR)");
        assert_eq!(
            interaction_error("x", &InteractionState::Cancelled).code,
            TRANSPORT_ERROR
        );
    }
}
