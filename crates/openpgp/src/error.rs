//! Error types for OpenPGP card operations

use cardbridge_apdu_core::transport::TransportError;
use iso7816_tlv::TlvError;

/// Result type for OpenPGP card operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for OpenPGP card operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-related errors
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// APDU-level errors, including non-success status words
    #[error(transparent)]
    Apdu(#[from] cardbridge_apdu_core::Error),

    /// TLV parsing errors from applet responses
    #[error("TLV parsing error: {0}")]
    Tlv(TlvError),

    /// The PIN was rejected by the card
    #[error("PIN rejected by the card")]
    WrongPin,

    /// The PIN retry counter is exhausted
    #[error("PIN blocked: retry counter exhausted")]
    PinBlocked,

    /// Caller-supplied input failed validation before any card traffic
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The applet answered with well-formed bytes that do not match the
    /// expected structure
    #[error("unexpected response structure: {0}")]
    Parse(&'static str),
}

// `iso7816_tlv::TlvError` does not implement `std::error::Error` (the crate's
// `std` feature is not declared in any published release), so thiserror's
// `#[from]` cannot be used; provide the conversion manually instead.
impl From<TlvError> for Error {
    fn from(e: TlvError) -> Self {
        Self::Tlv(e)
    }
}
