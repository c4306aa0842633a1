use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use super::event::{Event, EventError};
use super::{lan, lan_x, LAN_GET_BROADCAST_FLAGS, LAN_GET_SERIAL_NUMBER, LAN_RMBUS_DATACHANGED, LAN_X_HEADER};

/// Builds an outbound Z21 frame.
///
/// Frame format: `[length (2 bytes LE)][payload...]` where the length field
/// counts the whole frame, including itself. Payloads longer than 65533
/// bytes cannot be framed; the protocol never produces them.
pub fn build_frame(payload: &[u8]) -> Bytes {
    let length = payload.len() + 2;
    let mut frame = BytesMut::with_capacity(length);
    frame.put_u16_le(length as u16);
    frame.extend_from_slice(payload);
    frame.freeze()
}

/// Decodes one inbound UDP datagram into a semantic event.
///
/// Fails closed with an `invalid-payload` error event when the datagram is
/// shorter than the length field or shorter than its declared length.
/// Unrecognized leading bytes yield `None`: the datagram is well formed but
/// not a message this client understands, and is deliberately ignored.
pub fn decode_datagram(datagram: &[u8]) -> Option<Event> {
    if datagram.len() < 2 {
        return Some(Event::Error(EventError::invalid_payload(
            "Invalid payload length",
        )));
    }

    // Expected length is indicated in the first two bytes
    let expected = u16::from_le_bytes([datagram[0], datagram[1]]) as usize;
    if datagram.len() < expected {
        return Some(Event::Error(EventError::invalid_payload(
            "Payload shorter than expected length",
        )));
    }

    let data = &datagram[2..];
    match data.first().copied() {
        Some(LAN_X_HEADER) => {
            // LAN_X command: skip the two marker bytes [0x40, 0x00]
            lan_x::decode(data.get(2..).unwrap_or(&[]))
        }
        Some(opcode @ (LAN_GET_SERIAL_NUMBER | LAN_GET_BROADCAST_FLAGS | LAN_RMBUS_DATACHANGED)) => {
            lan::decode(opcode, &data[1..])
        }
        Some(other) => {
            trace!("ignoring unrecognized frame: {:#04x}", other);
            None
        }
        None => None,
    }
}
