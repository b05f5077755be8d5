//! Card executor implementation
//!
//! The executor sits between a protocol layer and a [`CardTransport`]. It
//! serializes commands, parses responses, and transparently follows `61xx`
//! continuation chains by issuing GET RESPONSE commands.

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::command::Command;
use crate::error::Error;
use crate::response::Response;
use crate::transport::CardTransport;

/// GET RESPONSE instruction byte (ISO 7816-4)
const INS_GET_RESPONSE: u8 = 0xC0;

/// Card executor over an arbitrary transport
#[derive(Debug)]
pub struct CardExecutor<T: CardTransport> {
    transport: T,
}

impl<T: CardTransport> CardExecutor<T> {
    /// Create a new card executor with the given transport
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Get a reference to the transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the transport
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the executor and return the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Transmit a command and return the fully reassembled response
    ///
    /// While the card answers `61xx`, a GET RESPONSE (`00 C0 00 00 xx`) is
    /// issued and the continuation payload is appended to what was received
    /// so far. A `61xx` answer to GET RESPONSE itself continues the loop, so
    /// chained continuations reassemble into a single payload with the final
    /// terminal status word.
    pub fn transmit(&mut self, command: &Command) -> Result<Response, Error> {
        let command_bytes = command.to_bytes();
        trace!(apdu = %hex::encode(&command_bytes), "transmit");

        let raw = self.transport.transmit_raw(&command_bytes)?;
        let mut response = Response::from_bytes(&raw)?;

        if !response.status().has_more_data() {
            return Ok(response);
        }

        let mut payload = BytesMut::from(response.payload().as_ref());
        while let Some(remaining) = response.status().remaining() {
            debug!(remaining, "response continuation pending, issuing GET RESPONSE");

            let le = if remaining >= 256 { 0 } else { remaining };
            let get_response = Command::new(0x00, INS_GET_RESPONSE, 0x00, 0x00).with_le(le);

            let raw = self.transport.transmit_raw(&get_response.to_bytes())?;
            response = Response::from_bytes(&raw)?;
            payload.extend_from_slice(response.payload());
        }

        let status = response.status();
        let mut assembled = BytesMut::with_capacity(payload.len() + 2);
        assembled.extend_from_slice(&payload);
        assembled.extend_from_slice(&[status.sw1, status.sw2]);
        Response::from_bytes(&assembled.freeze())
    }

    /// Transmit a command and return the payload, failing on any
    /// non-success terminal status word
    pub fn transmit_checked(&mut self, command: &Command) -> Result<Bytes, Error> {
        self.transmit(command)?.into_checked_payload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_executor_basic_transmit() {
        let transport = MockTransport::with_response(Bytes::from_static(&[0x90, 0x00]));
        let mut executor = CardExecutor::new(transport);

        let response = executor
            .transmit(&Command::new(0x00, 0xA4, 0x04, 0x00))
            .unwrap();
        assert!(response.is_success());
    }

    #[test]
    fn test_executor_get_response_continuation() {
        let transport = MockTransport::with_responses([
            Bytes::from_static(&[0xAA, 0xBB, 0x61, 0x02]),
            Bytes::from_static(&[0xCC, 0xDD, 0x90, 0x00]),
        ]);
        let mut executor = CardExecutor::new(transport);

        let response = executor
            .transmit(&Command::new(0x00, 0xB0, 0x00, 0x00))
            .unwrap();
        assert!(response.is_success());
        assert_eq!(response.payload().as_ref(), &[0xAA, 0xBB, 0xCC, 0xDD]);

        // Exactly one GET RESPONSE was issued, asking for the pending bytes
        let transmitted = executor.transport().transmitted();
        assert_eq!(transmitted.len(), 2);
        assert_eq!(transmitted[1].as_ref(), &[0x00, 0xC0, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn test_executor_chained_continuation() {
        // A 61xx may itself be answered with another 61xx
        let transport = MockTransport::with_responses([
            Bytes::from_static(&[0x01, 0x61, 0x01]),
            Bytes::from_static(&[0x02, 0x61, 0x01]),
            Bytes::from_static(&[0x03, 0x90, 0x00]),
        ]);
        let mut executor = CardExecutor::new(transport);

        let response = executor
            .transmit(&Command::new(0x00, 0xB0, 0x00, 0x00))
            .unwrap();
        assert_eq!(response.payload().as_ref(), &[0x01, 0x02, 0x03]);
        assert_eq!(executor.transport().transmitted().len(), 3);
    }

    #[test]
    fn test_executor_continuation_ends_with_error() {
        let transport = MockTransport::with_responses([
            Bytes::from_static(&[0x01, 0x61, 0x01]),
            Bytes::from_static(&[0x69, 0x82]),
        ]);
        let mut executor = CardExecutor::new(transport);

        let err = executor
            .transmit_checked(&Command::new(0x00, 0xB0, 0x00, 0x00))
            .unwrap_err();
        assert!(err.to_string().contains("security status not satisfied"));
    }

    #[test]
    fn test_executor_transmit_checked_failure() {
        let transport = MockTransport::with_response(Bytes::from_static(&[0x6A, 0x82]));
        let mut executor = CardExecutor::new(transport);

        let err = executor
            .transmit_checked(&Command::new(0x00, 0xA4, 0x04, 0x00))
            .unwrap_err();
        assert!(matches!(err, Error::Status { .. }));
    }
}
