//! Core types for APDU (Application Protocol Data Unit) operations
//!
//! This crate provides the foundational types for working with smart card
//! APDU commands and responses according to ISO/IEC 7816-4:
//!
//! - Creating and serializing APDU commands ([`Command`])
//! - Parsing responses and status words ([`Response`], [`StatusWord`])
//! - Communicating with cards through a transport layer ([`CardTransport`])
//! - Automatic GET RESPONSE continuation for `61xx` chains ([`CardExecutor`])
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod error;
pub mod executor;
pub mod response;
pub mod transport;

pub use command::Command;
pub use error::Error;
pub use executor::CardExecutor;
pub use response::{Response, StatusWord};
pub use transport::CardTransport;

#[cfg(any(test, feature = "mock"))]
pub use transport::MockTransport;

/// Prelude module containing commonly used types
pub mod prelude {
    pub use crate::{Bytes, BytesMut, Error};

    pub use crate::Command;
    pub use crate::response::{Response, StatusWord, status};
    pub use crate::transport::{CardTransport, TransportError};

    pub use crate::executor::CardExecutor;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test the basic types are re-exported correctly
    #[test]
    fn test_reexports() {
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00);
        assert_eq!(cmd.cla, 0x00);
        assert_eq!(cmd.ins, 0xA4);

        let resp = Response::from_bytes(&[0x01, 0x02, 0x03, 0x90, 0x00]).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.payload().as_ref(), &[0x01, 0x02, 0x03]);
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
    }
}
