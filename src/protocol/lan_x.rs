//! Decoder for the LAN_X extended sub-protocol.
//!
//! LAN_X sub-frames carry their own opcode space and a trailing XOR
//! checksum. Decoding is strict on the declared envelope length (checked
//! before the sub-frame reaches this module) but lenient on the checksum:
//! the checksum byte is present in the wire data and simply not consumed.

use tracing::warn;

use super::event::{ErrorCode, Event, EventError};
use super::{is_bit_set, low_bits};
use crate::core::{
    AccessoryInfo, CvResult, Direction, EngineInfo, SpeedSteps, StationStatus, TrackPower,
    TurnoutPosition,
};

// LAN_X opcodes
pub const LAN_X_STATUS_CHANGED: u8 = 0x62;
pub const LAN_X_BROADCAST: u8 = 0x61;
pub const LAN_X_CV_RESULT: u8 = 0x64;
pub const LAN_X_TURNOUT_INFO: u8 = 0x43;
pub const LAN_X_ENGINE_INFO: u8 = 0xEF;

// Fixed second bytes
const STATUS_CHANGED_SUBTYPE: u8 = 0x22;
const CV_RESULT_SUBTYPE: u8 = 0x14;

// Command-station status flags
const CS_EMERGENCY_STOP: u8 = 0x01;
const CS_TRACK_VOLTAGE_OFF: u8 = 0x02;
const CS_SHORT_CIRCUIT: u8 = 0x04;
const CS_PROGRAMMING_MODE_ACTIVE: u8 = 0x20;

// Broadcast sub-codes
const BC_TRACK_POWER_OFF: u8 = 0x00;
const BC_TRACK_POWER_ON: u8 = 0x01;
const BC_PROGRAMMING_MODE: u8 = 0x02;
const BC_TRACK_SHORT_CIRCUIT: u8 = 0x08;
const BC_CV_NACK_SC: u8 = 0x12;
const BC_CV_NACK: u8 = 0x13;

/// Decodes one LAN_X sub-frame (`[opcode][data...][xor]`).
pub fn decode(payload: &[u8]) -> Option<Event> {
    let opcode = *payload.first()?;

    match opcode {
        LAN_X_STATUS_CHANGED if payload.get(1) == Some(&STATUS_CHANGED_SUBTYPE) => {
            let status = match *payload.get(2)? {
                CS_EMERGENCY_STOP => StationStatus::EmergencyStop,
                CS_TRACK_VOLTAGE_OFF => StationStatus::TrackVoltageOff,
                CS_SHORT_CIRCUIT => StationStatus::ShortCircuit,
                CS_PROGRAMMING_MODE_ACTIVE => StationStatus::ProgrammingMode,
                _ => StationStatus::Unknown,
            };
            Some(Event::Status(status))
        }

        LAN_X_BROADCAST => match *payload.get(1)? {
            BC_TRACK_POWER_OFF => Some(Event::TrackPower(TrackPower::Off)),
            BC_TRACK_POWER_ON => Some(Event::TrackPower(TrackPower::On)),
            BC_PROGRAMMING_MODE => Some(Event::ProgrammingMode),
            BC_TRACK_SHORT_CIRCUIT => Some(Event::ShortCircuit),
            BC_CV_NACK => Some(Event::Error(EventError {
                code: ErrorCode::Nack,
                message: "CV Read/Write NACK".to_string(),
            })),
            BC_CV_NACK_SC => Some(Event::Error(EventError {
                code: ErrorCode::NackShortCircuit,
                message: "CV Read/Write NACK due to short-circuit".to_string(),
            })),
            other => {
                warn!("unknown broadcast code: {:#04x}", other);
                Some(Event::UnknownBroadcast(other))
            }
        },

        LAN_X_CV_RESULT if payload.get(1) == Some(&CV_RESULT_SUBTYPE) => decode_cv(payload),

        LAN_X_TURNOUT_INFO => decode_turnout_info(&payload[1..]),

        LAN_X_ENGINE_INFO => decode_engine_info(&payload[1..]),

        other => {
            warn!("unknown LAN_X opcode: {:#04x}", other);
            None
        }
    }
}

/// `[0x64, 0x14, CVAdr_MSB, CVAdr_LSB, value, xor]`; trailing bytes ignored
fn decode_cv(payload: &[u8]) -> Option<Event> {
    if payload.len() < 5 {
        warn!(len = payload.len(), "payload too short for CV result");
        return None;
    }
    let address = u16::from_be_bytes([payload[2], payload[3]]);
    Some(Event::CvResult(CvResult {
        // CVs are zero-based on the wire, one-based for the user
        cv: address + 1,
        value: payload[4],
    }))
}

/// `[Adr_MSB, Adr_LSB, status]` after the opcode byte
fn decode_turnout_info(data: &[u8]) -> Option<Event> {
    if data.len() < 3 {
        warn!(len = data.len(), "payload too short for turnout info");
        return None;
    }
    let address = u16::from_be_bytes([low_bits(data[0], 6), data[1]]);
    Some(Event::AccessoryInfo(AccessoryInfo {
        // Turnout addresses are zero-based on the wire, one-based for the user
        address: address + 1,
        position: TurnoutPosition::from_wire(data[2]),
    }))
}

/// `[Adr_MSB, Adr_LSB, DB2, DB3, DB4, DB5?, DB6?, DB7?, DB8?]` after the
/// opcode byte. DB5-DB8 are optional function banks; absent banks leave
/// their functions out of the result entirely.
fn decode_engine_info(data: &[u8]) -> Option<Event> {
    if data.len() < 5 {
        warn!(len = data.len(), "payload too short for engine info");
        return None;
    }

    // Engine addresses are reported as-is; no one-based adjustment here
    let address = u16::from_be_bytes([low_bits(data[0], 6), data[1]]);

    let db2 = data[2];
    let busy = is_bit_set(db2, 3);
    let speed_steps = SpeedSteps::from_wire(low_bits(db2, 3));

    let db3 = data[3];
    let direction = if is_bit_set(db3, 7) {
        Direction::Forward
    } else {
        Direction::Reverse
    };
    let speed = low_bits(db3, 7);

    let db4 = data[4];
    let double_traction = is_bit_set(db4, 6);

    let mut functions = std::collections::BTreeMap::new();
    functions.insert(0, is_bit_set(db4, 4));
    for bit in 0..4 {
        functions.insert(bit + 1, is_bit_set(db4, bit));
    }
    // Optional banks: F5-F12, F13-F20, F21-F28, F29-F31
    let banks: [(usize, u8, u8); 4] = [(5, 5, 8), (6, 13, 8), (7, 21, 8), (8, 29, 3)];
    for (index, first, count) in banks {
        if let Some(&byte) = data.get(index) {
            for bit in 0..count {
                functions.insert(first + bit, is_bit_set(byte, bit));
            }
        }
    }

    Some(Event::EngineInfo(EngineInfo {
        address,
        busy,
        speed_steps,
        direction,
        speed,
        double_traction,
        functions,
    }))
}
