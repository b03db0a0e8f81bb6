//! Host integration - the event bus that delivers dial input and shows feedback
//!
//! The engine does not know about the wire format; this module translates
//! host JSON into engine commands and engine output back into host JSON.

pub mod connection;
pub mod protocol;

pub use connection::HostConnection;
pub use protocol::{encode_outbound, HostEvent};
