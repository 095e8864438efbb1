//! WebSocket module: the transport side of the client.
//!
//! - [`messages`]: Typed intents and inbound message decoding.
//! - [`channel`]: Connection lifecycle and the transport task.

pub mod channel;
pub mod messages;

pub use channel::{Channel, ChannelError, ChannelEvent, ConnectionStatus};
pub use messages::{InboundMessage, IntentType, OutboundIntent, decode};
