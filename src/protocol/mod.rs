//! Z21 protocol implementation
//!
//! This module defines the frame codec, the two sub-protocol decoders
//! (LAN and LAN_X), the per-command encoders and the decoded event type.

pub mod codec;
pub mod command;
pub mod event;
pub mod lan;
pub mod lan_x;

pub use self::codec::{build_frame, decode_datagram};
pub use self::event::{ErrorCode, Event, EventError};

// Leading payload bytes dispatched by the frame codec
/// Marker byte of the nested LAN_X sub-protocol
pub const LAN_X_HEADER: u8 = 0x40;
/// Serial number reply opcode
pub const LAN_GET_SERIAL_NUMBER: u8 = 0x10;
/// Broadcast flags reply opcode
pub const LAN_GET_BROADCAST_FLAGS: u8 = 0x51;
/// Feedback bus change opcode
pub const LAN_RMBUS_DATACHANGED: u8 = 0x80;

/// Returns whether bit `bit` (0-based) of `byte` is set
pub(crate) fn is_bit_set(byte: u8, bit: u8) -> bool {
    byte & (1 << bit) != 0
}

/// Masks `byte` down to its lowest `count` bits
pub(crate) fn low_bits(byte: u8, count: u8) -> u8 {
    byte & ((1 << count) - 1)
}

/// XOR checksum over a LAN_X sub-frame body
pub(crate) fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, byte| acc ^ byte)
}
