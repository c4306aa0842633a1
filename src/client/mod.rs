//! Client composition: one [`Z21Client`] per command station, with
//! per-domain controllers and a subscription point for decoded events.

mod accessory;
mod correlator;
mod engine;
mod system;

pub use self::accessory::AccessoryController;
pub use self::engine::EngineController;
pub use self::system::SystemController;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use self::correlator::CvCorrelator;
use crate::core::{ClientConfig, Result};
use crate::network::{EventBus, UdpTransport};
use crate::protocol::Event;

/// Client for one Z21 command station.
///
/// Composes the UDP transport, the event bus and the per-domain
/// controllers. Dropping the client stops the receive loop; [`close`]
/// additionally logs the session off first.
///
/// [`close`]: Z21Client::close
pub struct Z21Client {
    bus: EventBus,
    transport: Arc<UdpTransport>,
    /// Engine commands, including CV read/write
    pub engines: EngineController,
    /// Turnout commands
    pub accessories: AccessoryController,
    /// Power, status and session commands
    pub system: SystemController,
}

impl Z21Client {
    /// Connects to the command station described by `config`
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let bus = EventBus::new();
        let transport =
            Arc::new(UdpTransport::connect(&config.host, config.port, bus.clone()).await?);
        debug!(host = %config.host, port = config.port, "client connected");

        let correlator = CvCorrelator::new(&bus);
        let engines =
            EngineController::new(Arc::clone(&transport), correlator, config.cv_timeout);
        let accessories = AccessoryController::new(Arc::clone(&transport));
        let system = SystemController::new(Arc::clone(&transport));

        Ok(Z21Client {
            bus,
            transport,
            engines,
            accessories,
            system,
        })
    }

    /// Subscribes to the decoded event stream. Every subscriber receives
    /// all events from the point of subscription on; there is no replay.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Logs off from the command station and stops the receive loop
    pub async fn close(self) -> Result<()> {
        self.system.logoff().await?;
        self.transport.shutdown();
        Ok(())
    }
}
