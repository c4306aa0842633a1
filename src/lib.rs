//! z21-client: driver for the Roco/Fleischmann Z21 command station's UDP
//! control protocol.
//!
//! The crate covers three layers: the binary protocol codec (framing,
//! LAN and LAN_X sub-protocol decoding, per-command encoders), the UDP
//! transport with a typed event bus, and the client surface with
//! request/reply correlation for CV reads and writes.
//!
//! ```no_run
//! use z21_client::{ClientConfig, Z21Client};
//!
//! # async fn run() -> z21_client::Result<()> {
//! let client = Z21Client::connect(ClientConfig::new("192.168.0.111")).await?;
//! client.system.set_track_power_on().await?;
//! let cv = client.engines.cv_read(29).await?;
//! println!("CV29 = {}", cv.value);
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod core;

mod client;
mod network;
pub mod protocol;

// Re-export commonly used items
pub use client::{AccessoryController, EngineController, SystemController, Z21Client};
pub use core::{ClientConfig, Error, Result};
pub use network::EventBus;
pub use protocol::Event;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
