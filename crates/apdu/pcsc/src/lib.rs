//! PC/SC transport implementation for APDU operations
//!
//! This crate connects the APDU core types to the platform smart-card
//! service. A session walks an explicit state machine:
//!
//! ```text
//! Idle -> ReaderDetected -> CardPresent -> Connected -> Disconnected
//!                                                    \-> Failed
//! ```
//!
//! Card presence is detected edge-triggered from PC/SC status-change events,
//! delivered over a channel from a background monitor thread rather than
//! through nested callbacks.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod config;
mod manager;
mod monitor;
mod reader;
mod transport;

pub use config::{PcscConfig, ShareMode};
pub use manager::PcscDeviceManager;
pub use monitor::CardStatusEvent;
pub use reader::PcscReader;
pub use transport::{PcscTransport, SessionState};
