//! Protocol module containing the JSON message types and the text codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_inbound, encode_outbound, DecodeError, Decoded};
pub use messages::{InboundMessage, OutboundMessage};
