//! JSON message types for the client-facing WebSocket protocol.
//!
//! Every frame is a UTF-8 JSON object whose `"type"` field names the variant;
//! the remaining fields sit next to it in the same object:
//!
//! ```json
//! {"type":"join","roomId":"r1","name":"Alice"}
//! {"type":"users","users":[{"id":"r1","name":"Alice"}]}
//! ```
//!
//! Serde's `#[serde(tag = "type")]` attribute handles this automatically.
//!
//! Client-to-relay and relay-to-client messages are two distinct enums, so a
//! reply can never be mistaken for a request.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::domain::presence::{PresenceSnapshot, StreamerEntry};

// ── Client → relay ────────────────────────────────────────────────────────────

/// All messages a client can send to the relay.
///
/// Optional text fields are lenient: strings, numbers and `true` are accepted
/// (numbers and booleans are stringified), while `""`, `0`, `false`, `null`,
/// arrays and objects count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Become a streamer, optionally under a room id and display name.
    Join {
        #[serde(rename = "roomId", default, deserialize_with = "lenient_text")]
        room_id: Option<String>,
        #[serde(default, deserialize_with = "lenient_text")]
        name: Option<String>,
    },

    /// Stop streaming and disconnect.
    Leave,

    /// Become a viewer, optionally under a display name.
    ViewerJoin {
        #[serde(default, deserialize_with = "lenient_text")]
        name: Option<String>,
    },

    /// Stop viewing and disconnect.
    ViewerLeave,

    /// Ask for the current streamer list.
    List,

    /// Application-level keepalive; answered with `pong`.
    Ping,
}

impl InboundMessage {
    /// Wire name of the variant, for log lines that must not echo field values.
    pub fn type_name(&self) -> &'static str {
        match self {
            InboundMessage::Join { .. } => "join",
            InboundMessage::Leave => "leave",
            InboundMessage::ViewerJoin { .. } => "viewer_join",
            InboundMessage::ViewerLeave => "viewer_leave",
            InboundMessage::List => "list",
            InboundMessage::Ping => "ping",
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(number_text(&n)),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    })
}

/// Renders a JSON number the way a browser's `String(x)` would: whole-valued
/// floats without a fraction (`1.0` is `"1"`) and exponents carrying a sign
/// (`1e21` is `"1e+21"`).
fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    let Some(f) = n.as_f64() else {
        return n.to_string();
    };

    let magnitude = f.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{f}");
    }
    let text = format!("{f:e}");
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => text,
    }
}

// ── Relay → client ────────────────────────────────────────────────────────────

/// All messages the relay sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Sent once, immediately after the connection opens.
    Welcome { msg: String },

    /// Reply to `join` carrying the identity the relay recorded.
    Joined {
        #[serde(rename = "roomId")]
        room_id: String,
        name: String,
    },

    /// Reply to `viewer_join`.
    ViewerAck { name: String },

    /// The streamer directory, pushed on change or sent on request.
    Users { users: Vec<StreamerEntry> },

    /// Reply to `ping`; `t` is milliseconds since the Unix epoch.
    Pong { t: u64 },
}

impl OutboundMessage {
    /// Text of the greeting sent on connection open.
    pub const WELCOME_TEXT: &'static str = "ws ok";

    pub fn welcome() -> Self {
        OutboundMessage::Welcome {
            msg: Self::WELCOME_TEXT.to_string(),
        }
    }
}

impl From<PresenceSnapshot> for OutboundMessage {
    fn from(snapshot: PresenceSnapshot) -> Self {
        OutboundMessage::Users {
            users: snapshot.users,
        }
    }
}
