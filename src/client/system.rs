use std::sync::Arc;

use crate::core::Result;
use crate::network::UdpTransport;
use crate::protocol::command;

/// System-level commands: power, status, broadcast flags, session control
pub struct SystemController {
    transport: Arc<UdpTransport>,
}

impl SystemController {
    pub(crate) fn new(transport: Arc<UdpTransport>) -> Self {
        SystemController { transport }
    }

    /// Requests the serial number; the reply arrives as
    /// [`Event::SerialNumber`](crate::protocol::Event::SerialNumber)
    pub async fn get_serial_number(&self) -> Result<()> {
        self.transport
            .send_command(&command::serial_number_request())
            .await
    }

    /// Requests the current broadcast flags
    pub async fn get_broadcast_flags(&self) -> Result<()> {
        self.transport
            .send_command(&command::broadcast_flags_request())
            .await
    }

    /// Subscribes to engine, accessory and/or feedback broadcasts
    pub async fn set_broadcast_flags(
        &self,
        engine: bool,
        accessory: bool,
        feedback: bool,
    ) -> Result<()> {
        self.transport
            .send_command(&command::set_broadcast_flags(engine, accessory, feedback))
            .await
    }

    /// Requests the command-station status
    pub async fn get_status(&self) -> Result<()> {
        self.transport.send_command(&command::status_request()).await
    }

    /// Turns track power on
    pub async fn set_track_power_on(&self) -> Result<()> {
        self.transport.send_command(&command::track_power_on()).await
    }

    /// Turns track power off
    pub async fn set_track_power_off(&self) -> Result<()> {
        self.transport.send_command(&command::track_power_off()).await
    }

    /// Emergency-stops all engines without cutting track power
    pub async fn emergency_stop(&self) -> Result<()> {
        self.transport.send_command(&command::emergency_stop()).await
    }

    /// Detaches this client from the command station
    pub async fn logoff(&self) -> Result<()> {
        self.transport.send_command(&command::logoff()).await
    }
}
