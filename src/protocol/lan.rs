//! Decoder for the flat LAN sub-protocol (bare leading opcode byte).
//!
//! These are fixed-format messages: serial number, broadcast flags and
//! feedback-bus changes. Anything malformed here is log-worthy but
//! non-fatal; the datagram is dropped without producing an event.

use tracing::{debug, warn};

use super::event::Event;
use super::{is_bit_set, LAN_GET_BROADCAST_FLAGS, LAN_GET_SERIAL_NUMBER, LAN_RMBUS_DATACHANGED};
use crate::core::{BroadcastFlags, FeedbackModule};

/// Inputs per feedback module
const MODULE_INPUTS: u8 = 8;

/// Modules per feedback group
const GROUP_MODULES: u16 = 10;

/// Decodes one simple-protocol message: `opcode` plus the bytes after it.
pub fn decode(opcode: u8, payload: &[u8]) -> Option<Event> {
    match opcode {
        LAN_GET_SERIAL_NUMBER => {
            if payload.len() != 4 {
                warn!(len = payload.len(), "wrong payload length for serial number");
                return None;
            }
            let serial = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
            Some(Event::SerialNumber(serial))
        }

        LAN_GET_BROADCAST_FLAGS => {
            if payload.len() < 4 {
                warn!(len = payload.len(), "payload too short for broadcast flags");
                return None;
            }
            let raw = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
            Some(Event::BroadcastFlags(BroadcastFlags::from_word(raw)))
        }

        LAN_RMBUS_DATACHANGED => {
            // [group index (1 byte)][module status (10 bytes)]
            if payload.len() < 1 + GROUP_MODULES as usize {
                warn!(len = payload.len(), "payload too short for feedback data");
                return None;
            }
            let group = payload[0] as u16;
            let status = &payload[1..=GROUP_MODULES as usize];

            let mut modules = Vec::new();
            for (i, &byte) in status.iter().enumerate() {
                if byte == 0 {
                    continue;
                }
                let address = group * GROUP_MODULES + i as u16 + 1;
                let active_inputs = (0..MODULE_INPUTS)
                    .filter(|&bit| is_bit_set(byte, bit))
                    .map(|bit| bit + 1)
                    .collect();
                modules.push(FeedbackModule {
                    address,
                    active_inputs,
                });
            }
            Some(Event::Feedback(modules))
        }

        other => {
            debug!("unknown LAN opcode: {:#04x}", other);
            None
        }
    }
}
