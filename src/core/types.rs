use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Error;

/// Broadcast subscription flags of the command station.
///
/// The wire representation is a 32-bit little-endian word; only the low
/// three bits are modelled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastFlags {
    /// Raw 32-bit flag word as reported by the device
    pub raw: u32,
    /// Engine (locomotive) broadcasts enabled (bit 0)
    pub engine: bool,
    /// Accessory (turnout) broadcasts enabled (bit 1)
    pub accessory: bool,
    /// Feedback module broadcasts enabled (bit 2)
    pub feedback: bool,
}

impl BroadcastFlags {
    /// Builds the flag word from the three broadcast groups
    pub fn word(engine: bool, accessory: bool, feedback: bool) -> u32 {
        let mut flags = 0;
        if engine {
            flags |= 0x01;
        }
        if accessory {
            flags |= 0x02;
        }
        if feedback {
            flags |= 0x04;
        }
        flags
    }

    /// Decodes the flag word reported by the device
    pub fn from_word(raw: u32) -> Self {
        BroadcastFlags {
            raw,
            engine: raw & 0x01 != 0,
            accessory: raw & 0x02 != 0,
            feedback: raw & 0x04 != 0,
        }
    }
}

/// Track power state reported by a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackPower {
    On,
    Off,
}

/// Command-station status reported by a status-changed message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationStatus {
    EmergencyStop,
    TrackVoltageOff,
    ShortCircuit,
    ProgrammingMode,
    /// Status byte did not match any documented value
    Unknown,
}

/// Speed-step mode of an engine decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedSteps {
    Steps14,
    Steps28,
    Steps128,
    Unknown,
}

impl SpeedSteps {
    /// Maps the 3-bit KKK field of an engine-info message
    pub fn from_wire(kkk: u8) -> Self {
        match kkk {
            0 => SpeedSteps::Steps14,
            2 => SpeedSteps::Steps28,
            4 => SpeedSteps::Steps128,
            _ => SpeedSteps::Unknown,
        }
    }
}

/// Travel direction of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
}

/// Decoded state of one engine, as carried by an engine-info message.
///
/// `functions` maps function numbers (F0-F31) to their state. Functions
/// whose bytes were absent from the message are absent from the map; the
/// device only sends the banks it knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineInfo {
    pub address: u16,
    pub busy: bool,
    pub speed_steps: SpeedSteps,
    pub direction: Direction,
    pub speed: u8,
    pub double_traction: bool,
    pub functions: BTreeMap<u8, bool>,
}

/// Position of a turnout, from the 2-bit field of an accessory-info message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnoutPosition {
    NotSwitched,
    P0,
    P1,
    /// Both position bits set; the device considers this an error state
    Invalid,
}

impl TurnoutPosition {
    pub fn from_wire(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => TurnoutPosition::NotSwitched,
            0b01 => TurnoutPosition::P0,
            0b10 => TurnoutPosition::P1,
            _ => TurnoutPosition::Invalid,
        }
    }
}

/// Decoded accessory (turnout) state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryInfo {
    /// One-based turnout address
    pub address: u16,
    pub position: TurnoutPosition,
}

/// Result of a CV read or write, as reported by the command station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvResult {
    /// One-based CV number
    pub cv: u16,
    pub value: u8,
}

/// Status of one feedback module with at least one active input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackModule {
    /// One-based module address
    pub address: u16,
    /// One-based input numbers currently active
    pub active_inputs: Vec<u8>,
}

/// Requested state of an engine function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionState {
    On,
    Off,
    Toggle,
}

impl FunctionState {
    /// 2-bit state field in the function command byte
    pub fn to_wire(self) -> u8 {
        match self {
            FunctionState::On => 0x40,
            FunctionState::Off => 0x00,
            FunctionState::Toggle => 0x80,
        }
    }
}

impl FromStr for FunctionState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(FunctionState::On),
            "off" => Ok(FunctionState::Off),
            "toggle" => Ok(FunctionState::Toggle),
            other => Err(Error::InvalidFunctionState(other.to_string())),
        }
    }
}

/// Configuration for a Z21 client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hostname or IP address of the command station
    pub host: String,
    /// UDP port of the command station
    pub port: u16,
    /// How long a CV read/write waits for its reply before failing
    pub cv_timeout: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        ClientConfig {
            host: host.into(),
            ..Default::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "192.168.0.111".to_string(),
            port: super::DEFAULT_PORT,
            cv_timeout: super::CV_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_flag_word() {
        assert_eq!(BroadcastFlags::word(true, true, true), 0x07);
        assert_eq!(BroadcastFlags::word(false, true, false), 0x02);
        assert_eq!(BroadcastFlags::word(false, false, false), 0x00);

        let flags = BroadcastFlags::from_word(0x05);
        assert!(flags.engine);
        assert!(!flags.accessory);
        assert!(flags.feedback);
        assert_eq!(flags.raw, 0x05);
    }

    #[test]
    fn test_speed_steps_from_wire() {
        assert_eq!(SpeedSteps::from_wire(0), SpeedSteps::Steps14);
        assert_eq!(SpeedSteps::from_wire(2), SpeedSteps::Steps28);
        assert_eq!(SpeedSteps::from_wire(4), SpeedSteps::Steps128);
        assert_eq!(SpeedSteps::from_wire(7), SpeedSteps::Unknown);
    }

    #[test]
    fn test_turnout_position_from_wire() {
        assert_eq!(TurnoutPosition::from_wire(0b00), TurnoutPosition::NotSwitched);
        assert_eq!(TurnoutPosition::from_wire(0b01), TurnoutPosition::P0);
        assert_eq!(TurnoutPosition::from_wire(0b10), TurnoutPosition::P1);
        assert_eq!(TurnoutPosition::from_wire(0b11), TurnoutPosition::Invalid);
        // Only the low two bits are significant
        assert_eq!(TurnoutPosition::from_wire(0xFE), TurnoutPosition::P1);
    }

    #[test]
    fn test_function_state_parsing() {
        assert_eq!("on".parse::<FunctionState>().unwrap(), FunctionState::On);
        assert_eq!("off".parse::<FunctionState>().unwrap(), FunctionState::Off);
        assert_eq!(
            "toggle".parse::<FunctionState>().unwrap(),
            FunctionState::Toggle
        );
        assert!(matches!(
            "blink".parse::<FunctionState>(),
            Err(Error::InvalidFunctionState(_))
        ));
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.port, 21105);
        assert_eq!(config.cv_timeout, Duration::from_secs(30));
    }
}
