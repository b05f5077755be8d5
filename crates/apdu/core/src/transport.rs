//! Card transport abstraction
//!
//! A [`CardTransport`] moves raw command bytes to a card and returns the raw
//! response, status word included. Continuation handling, status word
//! interpretation and protocol sequencing live above this layer.

use bytes::Bytes;

/// Transport-level error, distinct from card protocol failures
///
/// Everything in here means the reader layer failed: no reader attached, the
/// reader disappeared mid-session, the card never showed up. A card that
/// answered with a bad status word is not a transport error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No card reader is attached
    #[error("no card reader available")]
    NoReader,

    /// The reader disappeared while a session was open
    #[error("card reader removed")]
    ReaderRemoved,

    /// No card became present within the bounded wait
    #[error("timed out waiting for card")]
    Timeout,

    /// Transport is not connected to a card
    #[error("not connected to a card")]
    NotConnected,

    /// Underlying device error
    #[error("transport failure: {0}")]
    Device(String),
}

/// Trait for card transports
pub trait CardTransport {
    /// Transmit raw command bytes and return the raw response,
    /// including the trailing status word
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError>;
}

impl<T: CardTransport + ?Sized> CardTransport for &mut T {
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        (**self).transmit_raw(command)
    }
}

/// Scripted in-memory transport for protocol tests
///
/// Responses are played back in order; every transmitted command is recorded
/// so tests can assert on exact command sequences.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: std::collections::VecDeque<Bytes>,
    transmitted: Vec<Bytes>,
}

#[cfg(any(test, feature = "mock"))]
impl MockTransport {
    /// Create a transport that plays back the given responses in order
    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            transmitted: Vec::new(),
        }
    }

    /// Create a transport that answers every command with the same response
    pub fn with_response(response: impl Into<Bytes>) -> Self {
        let response = response.into();
        Self {
            responses: std::iter::repeat_n(response, 64).collect(),
            transmitted: Vec::new(),
        }
    }

    /// Commands transmitted so far, in order
    pub fn transmitted(&self) -> &[Bytes] {
        &self.transmitted
    }
}

#[cfg(any(test, feature = "mock"))]
impl CardTransport for MockTransport {
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.transmitted.push(Bytes::copy_from_slice(command));
        self.responses
            .pop_front()
            .ok_or_else(|| TransportError::Device("mock transport script exhausted".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_transport_playback() {
        let mut transport = MockTransport::with_responses([
            Bytes::from_static(&[0x90, 0x00]),
            Bytes::from_static(&[0x6A, 0x82]),
        ]);

        let resp = transport.transmit_raw(&[0x00, 0xA4, 0x04, 0x00]).unwrap();
        assert_eq!(resp.as_ref(), &[0x90, 0x00]);

        let resp = transport.transmit_raw(&[0x00, 0xB0, 0x00, 0x00]).unwrap();
        assert_eq!(resp.as_ref(), &[0x6A, 0x82]);

        assert_eq!(transport.transmitted().len(), 2);
        assert_eq!(transport.transmitted()[0].as_ref(), &[0x00, 0xA4, 0x04, 0x00]);

        // Script exhausted
        assert!(transport.transmit_raw(&[0x00, 0x00, 0x00, 0x00]).is_err());
    }
}
