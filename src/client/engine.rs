use std::sync::Arc;
use std::time::Duration;

use super::correlator::CvCorrelator;
use crate::core::{CvResult, FunctionState, Result};
use crate::network::UdpTransport;
use crate::protocol::command;

/// Engine (locomotive) commands, including the correlated CV operations
pub struct EngineController {
    transport: Arc<UdpTransport>,
    correlator: CvCorrelator,
    cv_timeout: Duration,
}

impl EngineController {
    pub(crate) fn new(
        transport: Arc<UdpTransport>,
        correlator: CvCorrelator,
        cv_timeout: Duration,
    ) -> Self {
        EngineController {
            transport,
            correlator,
            cv_timeout,
        }
    }

    /// Drives an engine. `speed` is a 7-bit magnitude; `speed_steps`
    /// selects 14, 28 or 128 speed steps, defaulting to 128 for any other
    /// value.
    pub async fn drive(
        &self,
        address: u16,
        speed: u8,
        forward: bool,
        speed_steps: u16,
    ) -> Result<()> {
        self.transport
            .send_command(&command::drive_engine(address, speed, forward, speed_steps))
            .await
    }

    /// Sets one engine function (F0-F28). Validation fails before any
    /// bytes are sent.
    pub async fn set_function(
        &self,
        address: u16,
        function: u8,
        state: FunctionState,
    ) -> Result<()> {
        let payload = command::set_engine_function(address, function, state)?;
        self.transport.send_command(&payload).await
    }

    /// Requests engine info; the reply arrives as
    /// [`Event::EngineInfo`](crate::protocol::Event::EngineInfo)
    pub async fn get_engine_info(&self, address: u16) -> Result<()> {
        self.transport
            .send_command(&command::engine_info_request(address))
            .await
    }

    /// Reads a CV in direct mode and waits for the result.
    ///
    /// Resolves with the reported value, or fails with `Nack` when the
    /// station refuses, `Timeout` when no reply arrives within the
    /// configured deadline, or the send error when the command never left.
    pub async fn cv_read(&self, cv: u16) -> Result<CvResult> {
        let payload = command::cv_read(cv)?;
        self.correlated_send(cv, &payload).await
    }

    /// Writes a CV in direct mode and waits for the confirmation, which
    /// echoes the written value
    pub async fn cv_write(&self, cv: u16, value: u8) -> Result<CvResult> {
        let payload = command::cv_write(cv, value)?;
        self.correlated_send(cv, &payload).await
    }

    async fn correlated_send(&self, cv: u16, payload: &[u8]) -> Result<CvResult> {
        // Arm before sending so a fast reply cannot slip past the map
        let pending = self.correlator.arm(cv);
        if let Err(e) = self.transport.send_command(payload).await {
            self.correlator.disarm(cv);
            return Err(e);
        }
        pending.wait(self.cv_timeout).await
    }
}
