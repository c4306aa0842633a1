//! Command encoders: one function per outbound instruction.
//!
//! Each encoder returns the complete command payload, ready to be wrapped
//! in a frame by [`codec::build_frame`](super::codec::build_frame). LAN_X
//! commands are built as `[0x40, 0x00]` plus a sub-frame carrying its XOR
//! checksum. Validation happens here, before any bytes reach a socket.

use super::{xor_checksum, LAN_X_HEADER};
use crate::core::{BroadcastFlags, Error, FunctionState, Result};

// LAN command headers
const LAN_GET_SERIAL_NUMBER: &[u8] = &[0x10];
const LAN_GET_BROADCAST_FLAGS: &[u8] = &[0x51];
const LAN_SET_BROADCAST_FLAGS: u8 = 0x50;
const LAN_LOGOFF: &[u8] = &[0x30];

// LAN_X sub-frame opcodes
const LAN_X_GET_STATUS: &[u8] = &[0x21, 0x24];
const LAN_X_TRACK_POWER: u8 = 0x21;
const LAN_X_SET_STOP: &[u8] = &[0x80];
const LAN_X_SET_TURNOUT: u8 = 0x53;
const LAN_X_SET_DRIVE: u8 = 0xE4;
const LAN_X_SET_FUNCTION: [u8; 2] = [0xE4, 0xF8];
const LAN_X_GET_ENGINE_INFO: [u8; 2] = [0xE3, 0xF0];
const LAN_X_CV_READ: [u8; 2] = [0x23, 0x11];
const LAN_X_CV_WRITE: [u8; 2] = [0x24, 0x12];

/// Wraps a LAN_X sub-frame: appends the XOR checksum and prepends the
/// `[0x40, 0x00]` marker pair.
fn lan_x_command(sub_frame: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(sub_frame.len() + 3);
    payload.push(LAN_X_HEADER);
    payload.push(0x00);
    payload.extend_from_slice(sub_frame);
    payload.push(xor_checksum(sub_frame));
    payload
}

/// Splits a 14-bit address into `(msb, lsb)`
fn split_address(address: u16) -> (u8, u8) {
    (((address >> 8) & 0x3F) as u8, (address & 0xFF) as u8)
}

/// LAN_GET_SERIAL_NUMBER request
pub fn serial_number_request() -> Vec<u8> {
    LAN_GET_SERIAL_NUMBER.to_vec()
}

/// LAN_GET_BROADCAST_FLAGS request
pub fn broadcast_flags_request() -> Vec<u8> {
    LAN_GET_BROADCAST_FLAGS.to_vec()
}

/// LAN_SET_BROADCAST_FLAGS with a 4-byte little-endian flag word
pub fn set_broadcast_flags(engine: bool, accessory: bool, feedback: bool) -> Vec<u8> {
    let word = BroadcastFlags::word(engine, accessory, feedback);
    let mut payload = vec![LAN_SET_BROADCAST_FLAGS];
    payload.extend_from_slice(&word.to_le_bytes());
    payload
}

/// LAN_X_GET_STATUS request
pub fn status_request() -> Vec<u8> {
    lan_x_command(LAN_X_GET_STATUS)
}

/// LAN_X_SET_TRACK_POWER_ON
pub fn track_power_on() -> Vec<u8> {
    lan_x_command(&[LAN_X_TRACK_POWER, 0x81])
}

/// LAN_X_SET_TRACK_POWER_OFF
pub fn track_power_off() -> Vec<u8> {
    lan_x_command(&[LAN_X_TRACK_POWER, 0x80])
}

/// LAN_X_SET_STOP: emergency stop for all engines
pub fn emergency_stop() -> Vec<u8> {
    lan_x_command(LAN_X_SET_STOP)
}

/// LAN_LOGOFF: detach this client from the command station
pub fn logoff() -> Vec<u8> {
    LAN_LOGOFF.to_vec()
}

/// LAN_X_SET_TURNOUT.
///
/// `address` is one-based. The control byte is `10Q0A00P`: Q queues the
/// command instead of switching immediately, A selects activate over
/// deactivate, P selects output 2 over output 1.
pub fn switch_turnout(address: u16, output2: bool, activate: bool, queue: bool) -> Vec<u8> {
    let (msb, lsb) = split_address(address.saturating_sub(1));

    let mut db2 = 0x80;
    if queue {
        db2 |= 0x20;
    }
    if activate {
        db2 |= 0x08;
    }
    if output2 {
        db2 |= 0x01;
    }

    lan_x_command(&[LAN_X_SET_TURNOUT, msb, lsb, db2])
}

/// LAN_X_SET_DRIVE.
///
/// `speed` is a 7-bit magnitude combined with the direction bit.
/// `speed_steps` selects the mode byte; anything but 14 or 28 falls back
/// to the 128-step default.
pub fn drive_engine(address: u16, speed: u8, forward: bool, speed_steps: u16) -> Vec<u8> {
    let (msb, lsb) = split_address(address);
    let direction_bit = if forward { 0x80 } else { 0x00 };
    let speed_byte = direction_bit | (speed & 0x7F);

    let steps = match speed_steps {
        14 => 0x10,
        28 => 0x12,
        _ => 0x13,
    };

    lan_x_command(&[LAN_X_SET_DRIVE, steps, msb, lsb, speed_byte])
}

/// LAN_X_SET_FUNCTION.
///
/// The function byte combines the 2-bit state field with the function's
/// own bit. Function 0 has no bit of its own in this byte; the shifted-out
/// bit is part of the wire behavior.
pub fn set_engine_function(address: u16, function: u8, state: FunctionState) -> Result<Vec<u8>> {
    if function > 28 {
        return Err(Error::InvalidFunction(function));
    }

    let (msb, lsb) = split_address(address);
    let mut function_byte = state.to_wire();
    if let Some(bit) = 1u8.checked_shl(u32::from(function).wrapping_sub(1)) {
        function_byte |= bit;
    }

    Ok(lan_x_command(&[
        LAN_X_SET_FUNCTION[0],
        LAN_X_SET_FUNCTION[1],
        msb,
        lsb,
        function_byte,
    ]))
}

/// LAN_X_GET_LOCO_INFO request.
///
/// Addresses from 128 upward use long-address framing: the two top bits
/// of the MSB are forced to 1 regardless of the literal bit width needed.
pub fn engine_info_request(address: u16) -> Vec<u8> {
    let (mut msb, lsb) = split_address(address);
    if address >= 128 {
        msb |= 0xC0;
    }
    lan_x_command(&[
        LAN_X_GET_ENGINE_INFO[0],
        LAN_X_GET_ENGINE_INFO[1],
        msb,
        lsb,
    ])
}

/// LAN_X_CV_READ in direct mode. `cv` is one-based, 1-1024.
pub fn cv_read(cv: u16) -> Result<Vec<u8>> {
    let address = cv_address(cv)?;
    Ok(lan_x_command(&[
        LAN_X_CV_READ[0],
        LAN_X_CV_READ[1],
        (address >> 8) as u8,
        (address & 0xFF) as u8,
    ]))
}

/// LAN_X_CV_WRITE in direct mode. `cv` is one-based, 1-1024.
pub fn cv_write(cv: u16, value: u8) -> Result<Vec<u8>> {
    let address = cv_address(cv)?;
    Ok(lan_x_command(&[
        LAN_X_CV_WRITE[0],
        LAN_X_CV_WRITE[1],
        (address >> 8) as u8,
        (address & 0xFF) as u8,
        value,
    ]))
}

/// Converts a one-based CV number to its zero-based wire address
fn cv_address(cv: u16) -> Result<u16> {
    if cv == 0 || cv > 1024 {
        return Err(Error::InvalidCv(cv));
    }
    Ok(cv - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_checksummed(payload: &[u8]) {
        // LAN_X payloads: marker pair, then sub-frame whose last byte is
        // the XOR of everything before it
        assert_eq!(&payload[..2], &[0x40, 0x00]);
        let sub_frame = &payload[2..];
        let (body, checksum) = sub_frame.split_at(sub_frame.len() - 1);
        assert_eq!(checksum[0], xor_checksum(body));
    }

    #[test]
    fn test_drive_engine_scenario() {
        // Address 1234 = 0x04D2, speed 50 forward, default 128 steps
        let payload = drive_engine(1234, 50, true, 128);
        assert_eq!(
            payload,
            vec![
                0x40,
                0x00,
                0xE4,
                0x13,
                0x04,
                0xD2,
                0xB2,
                0xE4 ^ 0x13 ^ 0x04 ^ 0xD2 ^ 0xB2
            ]
        );
    }

    #[test]
    fn test_drive_engine_speed_step_mapping() {
        assert_eq!(drive_engine(3, 0, true, 128)[3], 0x13);
        assert_eq!(drive_engine(3, 0, true, 28)[3], 0x12);
        assert_eq!(drive_engine(3, 0, true, 14)[3], 0x10);
        // Unrecognized step counts fall back to the 128-step mode byte
        assert_eq!(drive_engine(3, 0, true, 100)[3], 0x13);
    }

    #[test]
    fn test_drive_engine_reverse_masks_speed() {
        let payload = drive_engine(3, 0xFF, false, 128);
        assert_eq!(payload[6], 0x7F);
        assert_checksummed(&payload);
    }

    #[test]
    fn test_switch_turnout_address_offset() {
        // One-based 123 goes out as zero-based 122 = 0x007A
        let payload = switch_turnout(123, false, true, false);
        assert_eq!(&payload[2..6], &[0x53, 0x00, 0x7A, 0x88]);
        assert_checksummed(&payload);
    }

    #[test]
    fn test_switch_turnout_control_bits() {
        // Activate only
        assert_eq!(switch_turnout(1, false, true, false)[5], 0x88);
        // Deactivate
        assert_eq!(switch_turnout(1, false, false, false)[5], 0x80);
        // Output 2
        assert_eq!(switch_turnout(1, true, true, false)[5], 0x89);
        // Queued
        assert_eq!(switch_turnout(1, false, true, true)[5], 0xA8);
    }

    #[test]
    fn test_function_state_field() {
        for (state, expected) in [
            (FunctionState::On, 0x40),
            (FunctionState::Off, 0x00),
            (FunctionState::Toggle, 0x80),
        ] {
            let payload = set_engine_function(3, 5, state).unwrap();
            let function_byte = payload[6];
            assert_eq!(function_byte & 0xC0, expected, "{:?}", state);
            assert_eq!(function_byte & 0x3F, 1 << 4);
            assert_checksummed(&payload);
        }
    }

    #[test]
    fn test_function_zero_sets_no_bit() {
        let payload = set_engine_function(3, 0, FunctionState::On).unwrap();
        assert_eq!(payload[6], 0x40);
    }

    #[test]
    fn test_function_number_validation() {
        assert!(matches!(
            set_engine_function(3, 29, FunctionState::On),
            Err(Error::InvalidFunction(29))
        ));
        assert!(set_engine_function(3, 28, FunctionState::On).is_ok());
    }

    #[test]
    fn test_engine_info_request_long_address() {
        // Short address: MSB stays bare
        assert_eq!(&engine_info_request(3)[2..6], &[0xE3, 0xF0, 0x00, 0x03]);
        // Long address: top two MSB bits forced on
        assert_eq!(
            &engine_info_request(128)[2..6],
            &[0xE3, 0xF0, 0xC0, 0x80]
        );
        assert_eq!(
            &engine_info_request(0x1234)[2..6],
            &[0xE3, 0xF0, 0xC0 | 0x12, 0x34]
        );
    }

    #[test]
    fn test_cv_read_address_offset() {
        for cv in [1u16, 17, 256] {
            let payload = cv_read(cv).unwrap();
            let address = u16::from_be_bytes([payload[4], payload[5]]);
            assert_eq!(address, cv - 1);
            assert_checksummed(&payload);
        }
    }

    #[test]
    fn test_cv_write_appends_value() {
        let payload = cv_write(17, 0xC0).unwrap();
        assert_eq!(&payload[2..7], &[0x24, 0x12, 0x00, 0x10, 0xC0]);
        assert_checksummed(&payload);
    }

    #[test]
    fn test_cv_validation() {
        assert!(matches!(cv_read(0), Err(Error::InvalidCv(0))));
        assert!(matches!(cv_write(1025, 1), Err(Error::InvalidCv(1025))));
        assert!(cv_read(1024).is_ok());
    }

    #[test]
    fn test_fixed_commands() {
        assert_eq!(serial_number_request(), vec![0x10]);
        assert_eq!(broadcast_flags_request(), vec![0x51]);
        assert_eq!(logoff(), vec![0x30]);
        assert_eq!(status_request(), vec![0x40, 0x00, 0x21, 0x24, 0x05]);
        assert_eq!(track_power_on(), vec![0x40, 0x00, 0x21, 0x81, 0xA0]);
        assert_eq!(track_power_off(), vec![0x40, 0x00, 0x21, 0x80, 0xA1]);
        assert_eq!(emergency_stop(), vec![0x40, 0x00, 0x80, 0x80]);
    }

    #[test]
    fn test_set_broadcast_flags_word() {
        assert_eq!(
            set_broadcast_flags(true, true, true),
            vec![0x50, 0x07, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            set_broadcast_flags(false, true, false),
            vec![0x50, 0x02, 0x00, 0x00, 0x00]
        );
    }
}
