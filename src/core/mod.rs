//! Core types and error handling shared across the crate

mod error;
mod types;

pub use self::error::{Error, Result};
pub use self::types::{
    AccessoryInfo, BroadcastFlags, ClientConfig, CvResult, Direction, EngineInfo, FeedbackModule,
    FunctionState, SpeedSteps, StationStatus, TrackPower, TurnoutPosition,
};

use std::time::Duration;

/// Default UDP port of a Z21 command station
pub const DEFAULT_PORT: u16 = 21105;

/// How long a correlated CV request waits for its reply
pub const CV_TIMEOUT: Duration = Duration::from_secs(30);
