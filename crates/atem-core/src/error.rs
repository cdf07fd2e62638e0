//! Errors returned by engine operations.

use thiserror::Error;

use crate::domain::state::ConnectionState;
use crate::transport::TransportError;

/// Failure of a [`AtemConnection`](crate::AtemConnection) operation.
///
/// None of these are fatal: the engine stays usable and the caller decides
/// whether to retry or reconnect.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A command was issued outside the `Connected` state and was dropped.
    #[error("not connected to switcher (state: {state})")]
    NotConnected { state: ConnectionState },

    /// The transport refused a datagram.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The hello packet could not be sent, so no handshake is in progress.
    #[error("handshake failed: {0}")]
    HandshakeFailed(#[source] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_message_names_state() {
        let err = EngineError::NotConnected {
            state: ConnectionState::Connecting,
        };
        assert_eq!(err.to_string(), "not connected to switcher (state: connecting)");
    }

    #[test]
    fn test_transport_error_converts_into_engine_error() {
        let err: EngineError = TransportError::Closed.into();
        assert!(matches!(err, EngineError::Transport(TransportError::Closed)));
    }
}
