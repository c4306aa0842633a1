use std::sync::Arc;

use crate::core::Result;
use crate::network::UdpTransport;
use crate::protocol::command;

/// Accessory (turnout) commands
pub struct AccessoryController {
    transport: Arc<UdpTransport>,
}

impl AccessoryController {
    pub(crate) fn new(transport: Arc<UdpTransport>) -> Self {
        AccessoryController { transport }
    }

    /// Switches a turnout.
    ///
    /// `address` is one-based (1-2047). `output2` selects output 2 over
    /// output 1, `activate` selects activation over deactivation and
    /// `queue` asks the station to queue the command instead of acting
    /// immediately.
    pub async fn switch_turnout(
        &self,
        address: u16,
        output2: bool,
        activate: bool,
        queue: bool,
    ) -> Result<()> {
        self.transport
            .send_command(&command::switch_turnout(address, output2, activate, queue))
            .await
    }
}
