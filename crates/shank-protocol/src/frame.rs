//! The envelope carrying one message on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::messages::{ErrorResponse, Message, MessageType};

/// One message tagged with its [`MessageType`].
///
/// Frames travel as single JSON lines: `{"type":"Ping","payload":{}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Kind of message carried in `payload`.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Message body.
    pub payload: Value,
}

/// Failures converting between frames and typed messages.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The server answered with an error frame.
    #[error("server error: {message}")]
    Server {
        /// Message reported by the server.
        message: String,
    },
    /// The frame carried a different message kind than expected.
    #[error("expected a {expected} frame but received {actual}")]
    UnexpectedType {
        /// Kind the caller was waiting for.
        expected: MessageType,
        /// Kind actually received.
        actual: MessageType,
    },
    /// The message could not be serialised into a frame.
    #[error("failed to encode {kind} payload: {source}")]
    Encode {
        /// Kind being encoded.
        kind: MessageType,
        /// Serialisation failure.
        #[source]
        source: serde_json::Error,
    },
    /// The payload did not match the expected message shape.
    #[error("failed to decode {kind} payload: {source}")]
    Decode {
        /// Kind being decoded.
        kind: MessageType,
        /// Deserialisation failure.
        #[source]
        source: serde_json::Error,
    },
}

impl Frame {
    /// Wraps a typed message.
    pub fn from_message<M: Message>(message: &M) -> Result<Self, FrameError> {
        let payload = serde_json::to_value(message).map_err(|source| FrameError::Encode {
            kind: M::TYPE,
            source,
        })?;
        Ok(Self {
            kind: M::TYPE,
            payload,
        })
    }

    /// Unwraps the frame as message `M`.
    ///
    /// Error frames are surfaced as [`FrameError::Server`] whatever `M` is.
    pub fn into_message<M: Message>(self) -> Result<M, FrameError> {
        if self.kind == MessageType::Error && M::TYPE != MessageType::Error {
            let error: ErrorResponse =
                serde_json::from_value(self.payload).map_err(|source| FrameError::Decode {
                    kind: MessageType::Error,
                    source,
                })?;
            return Err(FrameError::Server {
                message: error.message,
            });
        }
        if self.kind != M::TYPE {
            return Err(FrameError::UnexpectedType {
                expected: M::TYPE,
                actual: self.kind,
            });
        }
        serde_json::from_value(self.payload).map_err(|source| FrameError::Decode {
            kind: M::TYPE,
            source,
        })
    }
}
