//! OpenPGP card applet protocol
//!
//! Drives a YubiKey-style OpenPGP applet through its signing surface:
//! SELECT, VERIFY of the user PIN, public key readout via GENERATE
//! ASYMMETRIC KEY PAIR in read mode, and PSO: COMPUTE DIGITAL SIGNATURE
//! over a host-computed SHA-512 digest. Each operation runs in its own
//! short-lived card session.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod commands;
mod constants;
mod error;
mod signer;

pub use commands::*;
pub use error::{Error, Result};
pub use signer::{OpenPgpSigner, PcscSessionFactory, SessionFactory, SignResult};

pub use constants::*;
