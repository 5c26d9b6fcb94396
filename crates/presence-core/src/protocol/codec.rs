//! Text codec for the JSON protocol.
//!
//! Decoding happens in two steps so the relay can tell a frame it could not
//! read at all from a well-formed object it simply does not understand:
//!
//! ```text
//! text ──serde_json──► Value ──must be object──► InboundMessage
//!        │                    │                    │
//!        └─ NotJson           └─ NotAnObject       └─ Decoded::Unrecognized
//! ```
//!
//! Only the first two are errors.  An object with an unknown `type` still
//! counts as client activity.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::protocol::messages::{InboundMessage, OutboundMessage};

/// Reasons a text frame is discarded without being treated as activity.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    #[error("frame is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    /// The frame is valid JSON but not an object (e.g. `null`, `5`, `[]`).
    #[error("frame is JSON but not an object")]
    NotAnObject,
}

/// Result of decoding a JSON object frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// One of the six message types the relay acts on.
    Recognized(InboundMessage),
    /// A JSON object whose `type` is missing or unknown.
    Unrecognized {
        /// The `type` field, if it was a string.
        type_name: Option<String>,
    },
}

/// Decodes one inbound text frame.
///
/// # Errors
///
/// Returns [`DecodeError`] if the frame is not a JSON object.
///
/// # Examples
///
/// ```rust
/// use presence_core::{decode_inbound, Decoded, InboundMessage};
///
/// let decoded = decode_inbound(r#"{"type":"ping"}"#).unwrap();
/// assert_eq!(decoded, Decoded::Recognized(InboundMessage::Ping));
/// assert!(decode_inbound("not json").is_err());
/// ```
pub fn decode_inbound(text: &str) -> Result<Decoded, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }

    let type_name = value
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned);

    match InboundMessage::deserialize(value) {
        Ok(msg) => Ok(Decoded::Recognized(msg)),
        Err(e) => {
            tracing::trace!("unrecognized inbound object: {e}");
            Ok(Decoded::Unrecognized { type_name })
        }
    }
}

/// Encodes an outbound message as a compact JSON string.
///
/// # Errors
///
/// Returns the underlying serde error; with the current message set this
/// cannot happen, but callers treat it as a dropped send.
pub fn encode_outbound(msg: &OutboundMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}
