//! Error types for APDU operations

use crate::StatusWord;
use crate::transport::TransportError;

/// Error type for APDU command construction and response parsing
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Command bytes are too short or inconsistent with Lc
    #[error("invalid command length: {0}")]
    InvalidCommandLength(usize),

    /// Response shorter than a status word
    #[error("response too short: {0} bytes")]
    ResponseTooShort(usize),

    /// The card returned a non-success status word
    #[error("{message}")]
    Status {
        /// The raw status word
        status: StatusWord,
        /// Resolved cause, or a generic message for codes outside the table
        message: String,
    },

    /// Transport-level failure
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// Build a status error, resolving the cause from the closed lookup table
    ///
    /// Known codes carry their fixed cause plus the raw status word; codes
    /// outside the table render a generic message.
    pub fn status(status: StatusWord) -> Self {
        let message = status.describe().map_or_else(
            || format!("unexpected status word: {status}"),
            |cause| format!("{cause} (status word: {status})"),
        );
        Self::Status { status, message }
    }

    /// The status word carried by this error, if any
    pub const fn status_word(&self) -> Option<StatusWord> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_known_code() {
        let err = Error::status(StatusWord::from(0x6983));
        assert_eq!(
            err.to_string(),
            "authentication method blocked (status word: 6983)"
        );
    }

    #[test]
    fn test_status_error_unknown_code() {
        let err = Error::status(StatusWord::from(0x7777));
        assert_eq!(err.to_string(), "unexpected status word: 7777");
        assert_eq!(err.status_word(), Some(StatusWord::from(0x7777)));
    }
}
