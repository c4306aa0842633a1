//! Network plumbing: the UDP transport and the event bus it publishes on

mod bus;
mod connection;

pub use self::bus::EventBus;
pub use self::connection::UdpTransport;
