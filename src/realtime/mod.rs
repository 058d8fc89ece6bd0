//! Real-time presence and messaging over WebSocket
//!
//! The session registry tracks live connections per user, the router owns
//! the protocol state machine, and the server wires both to an axum
//! WebSocket endpoint.

mod events;
mod registry;
mod router;
mod server;

pub use events::{ClientEvent, RequestDecision, ServerEvent};
pub use registry::{ConnectionId, EventSink, SessionRegistry};
pub use router::{RealtimeRouter, DEFAULT_GATEWAY_TIMEOUT};
pub use server::RealtimeServer;
