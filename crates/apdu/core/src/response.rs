//! APDU response parsing and status word interpretation
//!
//! An APDU response is a payload followed by a 2-byte status word. The
//! status word either reports success (`9000`), signals pending continuation
//! data (`61xx`), or names one of a closed set of failure causes.

use std::fmt;

use bytes::Bytes;

use crate::Error;

/// Two-byte APDU status word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte
    pub sw1: u8,
    /// Second status byte
    pub sw2: u8,
}

impl StatusWord {
    /// Create a new status word
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// The status word as a single `u16`
    pub const fn to_u16(self) -> u16 {
        ((self.sw1 as u16) << 8) | self.sw2 as u16
    }

    /// Whether this status word reports success (`9000`)
    pub const fn is_success(self) -> bool {
        self.to_u16() == status::SW_SUCCESS
    }

    /// Whether more response data is pending (`61xx`)
    pub const fn has_more_data(self) -> bool {
        self.sw1 == 0x61
    }

    /// Number of pending bytes when SW1 is `0x61`
    ///
    /// `0x6100` means 256 or more bytes remain.
    pub const fn remaining(self) -> Option<u16> {
        if self.has_more_data() {
            Some(if self.sw2 == 0 { 256 } else { self.sw2 as u16 })
        } else {
            None
        }
    }

    /// Resolve a known failure code to its fixed human-readable cause
    ///
    /// The table is closed: codes outside it return `None` and callers
    /// render a generic "unexpected status word" message instead.
    pub const fn describe(self) -> Option<&'static str> {
        match self.to_u16() {
            status::SW_MEMORY_FAILURE => Some("memory failure"),
            status::SW_WRONG_LENGTH => Some("wrong length"),
            status::SW_SECURITY_STATUS_NOT_SATISFIED => Some("security status not satisfied"),
            status::SW_AUTH_METHOD_BLOCKED => Some("authentication method blocked"),
            status::SW_CONDITIONS_NOT_SATISFIED => Some("conditions of use not satisfied"),
            status::SW_INCORRECT_DATA => Some("incorrect parameters in the data field"),
            status::SW_FILE_NOT_FOUND => Some("file or record not found"),
            status::SW_INCORRECT_P1P2 => Some("incorrect parameters P1-P2"),
            status::SW_REFERENCED_DATA_NOT_FOUND => Some("referenced data not found"),
            status::SW_WRONG_P1P2 => Some("wrong parameters P1-P2"),
            status::SW_INS_NOT_SUPPORTED => Some("instruction code not supported"),
            status::SW_CLA_NOT_SUPPORTED => Some("instruction class not supported"),
            status::SW_NO_PRECISE_DIAGNOSIS => Some("no precise diagnosis"),
            _ => None,
        }
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

impl From<u16> for StatusWord {
    fn from(sw: u16) -> Self {
        Self::new((sw >> 8) as u8, (sw & 0xFF) as u8)
    }
}

/// Named status word values, one per entry in the closed lookup table
pub mod status {
    /// Normal processing, no further qualification
    pub const SW_SUCCESS: u16 = 0x9000;
    /// Memory failure
    pub const SW_MEMORY_FAILURE: u16 = 0x6581;
    /// Wrong length
    pub const SW_WRONG_LENGTH: u16 = 0x6700;
    /// Security status not satisfied
    pub const SW_SECURITY_STATUS_NOT_SATISFIED: u16 = 0x6982;
    /// Authentication method blocked (e.g. PIN retry counter exhausted)
    pub const SW_AUTH_METHOD_BLOCKED: u16 = 0x6983;
    /// Conditions of use not satisfied
    pub const SW_CONDITIONS_NOT_SATISFIED: u16 = 0x6985;
    /// Incorrect parameters in the data field
    pub const SW_INCORRECT_DATA: u16 = 0x6A80;
    /// File or record not found
    pub const SW_FILE_NOT_FOUND: u16 = 0x6A82;
    /// Incorrect parameters P1-P2
    pub const SW_INCORRECT_P1P2: u16 = 0x6A86;
    /// Referenced data not found
    pub const SW_REFERENCED_DATA_NOT_FOUND: u16 = 0x6A88;
    /// Wrong parameters P1-P2
    pub const SW_WRONG_P1P2: u16 = 0x6B00;
    /// Instruction code not supported
    pub const SW_INS_NOT_SUPPORTED: u16 = 0x6D00;
    /// Instruction class not supported
    pub const SW_CLA_NOT_SUPPORTED: u16 = 0x6E00;
    /// No precise diagnosis
    pub const SW_NO_PRECISE_DIAGNOSIS: u16 = 0x6F00;
}

/// Parsed APDU response: payload plus trailing status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Bytes,
    status: StatusWord,
}

impl Response {
    /// Parse a response from raw bytes
    ///
    /// The trailing two bytes are the status word; everything before them is
    /// the payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < 2 {
            return Err(Error::ResponseTooShort(bytes.len()));
        }

        let (payload, sw) = bytes.split_at(bytes.len() - 2);
        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
            status: StatusWord::new(sw[0], sw[1]),
        })
    }

    /// The response payload (everything but the status word)
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the response and return the payload
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// The trailing status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Whether the status word reports success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Return the payload on success, or the status word as an error
    pub fn into_checked_payload(self) -> Result<Bytes, Error> {
        if self.status.is_success() {
            Ok(self.payload)
        } else {
            Err(Error::status(self.status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let resp = Response::from_bytes(&[0xAA, 0xBB, 0x90, 0x00]).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.payload().as_ref(), &[0xAA, 0xBB]);

        let resp = Response::from_bytes(&[0x90, 0x00]).unwrap();
        assert!(resp.is_success());
        assert!(resp.payload().is_empty());

        assert!(Response::from_bytes(&[0x90]).is_err());
    }

    #[test]
    fn test_status_word_continuation() {
        let sw = StatusWord::new(0x61, 0x10);
        assert!(sw.has_more_data());
        assert_eq!(sw.remaining(), Some(16));
        assert!(!sw.is_success());

        let sw = StatusWord::new(0x61, 0x00);
        assert_eq!(sw.remaining(), Some(256));

        let sw = StatusWord::new(0x90, 0x00);
        assert_eq!(sw.remaining(), None);
        assert!(sw.is_success());
    }

    #[test]
    fn test_status_word_lookup_table() {
        assert_eq!(
            StatusWord::from(0x6982).describe(),
            Some("security status not satisfied")
        );
        assert_eq!(
            StatusWord::from(0x6A82).describe(),
            Some("file or record not found")
        );
        // Outside the closed table
        assert_eq!(StatusWord::from(0x1234).describe(), None);
    }

    #[test]
    fn test_status_word_display() {
        assert_eq!(StatusWord::new(0x6A, 0x82).to_string(), "6A82");
    }

    #[test]
    fn test_checked_payload() {
        let resp = Response::from_bytes(&[0x01, 0x90, 0x00]).unwrap();
        assert_eq!(resp.into_checked_payload().unwrap().as_ref(), &[0x01]);

        let resp = Response::from_bytes(&[0x69, 0x82]).unwrap();
        let err = resp.into_checked_payload().unwrap_err();
        assert!(err.to_string().contains("security status not satisfied"));
    }
}
