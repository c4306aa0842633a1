use serde::{Deserialize, Serialize};

use crate::core::{
    AccessoryInfo, BroadcastFlags, CvResult, EngineInfo, FeedbackModule, StationStatus, TrackPower,
};

/// Error codes carried by [`Event::Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Datagram too short or declared length exceeds the bytes present
    #[serde(rename = "invalid-payload")]
    InvalidPayload,
    /// CV read/write negative acknowledgement
    #[serde(rename = "nack")]
    Nack,
    /// CV read/write negative acknowledgement due to short circuit
    #[serde(rename = "nack-sc")]
    NackShortCircuit,
    /// The UDP transport failed while receiving; produced by the
    /// transport itself, never by decoding
    #[serde(rename = "transport")]
    Transport,
}

/// Error surfaced as an event rather than a `Result`, mirroring how the
/// command station reports failures asynchronously
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventError {
    pub code: ErrorCode,
    pub message: String,
}

impl EventError {
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        EventError {
            code: ErrorCode::InvalidPayload,
            message: message.into(),
        }
    }
}

/// A decoded semantic event from the command station.
///
/// This is the sole output type of datagram decoding and the sole type
/// delivered to event subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Serial number of the command station
    SerialNumber(u32),
    /// Currently active broadcast subscription flags
    BroadcastFlags(BroadcastFlags),
    /// Command-station status change
    Status(StationStatus),
    /// Track power switched on or off
    TrackPower(TrackPower),
    /// The station entered programming mode
    ProgrammingMode,
    /// A track short circuit was detected
    ShortCircuit,
    /// State of one engine
    EngineInfo(EngineInfo),
    /// State of one turnout
    AccessoryInfo(AccessoryInfo),
    /// Result of a CV read or write
    CvResult(CvResult),
    /// Feedback modules with active inputs
    Feedback(Vec<FeedbackModule>),
    /// Well-formed broadcast with an undocumented sub-code; kept for
    /// forward compatibility instead of being treated as an error
    UnknownBroadcast(u8),
    /// Protocol-level error (malformed datagram or NACK)
    Error(EventError),
}
