use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use super::bus::EventBus;
use crate::core::Result;
use crate::protocol::{build_frame, decode_datagram, ErrorCode, Event, EventError};

/// Largest datagram the command station sends; a Z21 frame never exceeds
/// the length expressible in its 16-bit length field.
const RECV_BUFFER_SIZE: usize = 1500;

/// UDP transport to one command station.
///
/// Owns the socket and a background receive task that decodes every
/// inbound datagram and publishes the resulting events on the bus.
/// Transient receive errors keep the loop alive; a fatal error is
/// published as an [`Event::Error`] with the `transport` code before
/// the loop exits.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    recv_task: JoinHandle<()>,
}

impl UdpTransport {
    /// Binds an ephemeral local socket, connects it to the command
    /// station and starts the receive loop.
    pub async fn connect(host: &str, port: u16, bus: EventBus) -> Result<Self> {
        let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        socket.connect((host, port)).await?;
        debug!(host, port, "transport connected");

        let recv_socket = Arc::clone(&socket);
        let recv_task = tokio::spawn(async move {
            let mut buf = [0u8; RECV_BUFFER_SIZE];
            loop {
                let len = match recv_socket.recv(&mut buf).await {
                    Ok(len) => len,
                    Err(e) if is_transient(e.kind()) => {
                        // A connected UDP socket surfaces ICMP
                        // port-unreachable as a receive error; the
                        // station may simply be restarting
                        warn!("transient UDP receive error: {}", e);
                        continue;
                    }
                    Err(e) => {
                        error!("UDP socket error: {}", e);
                        bus.publish(transport_error_event(&e));
                        break;
                    }
                };
                trace!(len, "datagram received");
                if let Some(event) = decode_datagram(&buf[..len]) {
                    bus.publish(event);
                }
            }
        });

        Ok(UdpTransport { socket, recv_task })
    }

    /// Wraps a command payload in a frame and sends it
    pub async fn send_command(&self, payload: &[u8]) -> Result<()> {
        let frame = build_frame(payload);
        self.socket.send(&frame).await?;
        trace!(len = frame.len(), "frame sent");
        Ok(())
    }

    /// Local address of the bound socket
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Stops the receive loop. Pending events already published remain
    /// visible to subscribers.
    pub fn shutdown(&self) {
        self.recv_task.abort();
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

/// Receive errors that do not invalidate the socket itself
fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}

/// Event published to subscribers when the receive loop dies
fn transport_error_event(e: &io::Error) -> Event {
    Event::Error(EventError {
        code: ErrorCode::Transport,
        message: format!("UDP receive failed: {}", e),
    })
}
