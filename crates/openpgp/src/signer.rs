//! Signing orchestration over a card session
//!
//! Each operation opens a fresh session, drives the applet through the fixed
//! command sequence and releases the connection on every exit path (the
//! transport disconnects when dropped, leaving the card in the reader).

use cardbridge_apdu_core::{CardExecutor, CardTransport};
use cardbridge_apdu_transport_pcsc::{PcscConfig, PcscTransport};
use tracing::{debug, info};

use crate::commands::{
    check_verify_status, parse_public_key, parse_signature, read_public_key_command,
    select_command, sign_command, verify_pin_command,
};
use crate::constants::{DIGEST_LENGTH, SIGNATURE_LENGTH};
use crate::{Error, Result};

/// Opens a card session per operation
///
/// Sessions are deliberately short-lived: a factory hands out a connected
/// transport, the operation runs, and the transport is dropped. This keeps
/// the card usable by other PC/SC clients between calls.
pub trait SessionFactory {
    /// Transport produced for each session
    type Transport: CardTransport;

    /// Open a connected session
    fn open_session(&self) -> Result<Self::Transport>;
}

/// Session factory backed by the platform PC/SC service
#[derive(Debug, Clone, Default)]
pub struct PcscSessionFactory {
    config: PcscConfig,
}

impl PcscSessionFactory {
    /// Create a factory with the given transport configuration
    pub const fn new(config: PcscConfig) -> Self {
        Self { config }
    }
}

impl SessionFactory for PcscSessionFactory {
    type Transport = PcscTransport;

    fn open_session(&self) -> Result<Self::Transport> {
        let transport = PcscTransport::open(&self.config)?;
        debug!(state = ?transport.state(), "card session open");
        Ok(transport)
    }
}

/// Result of a signing operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignResult {
    /// Raw `r || s` signature
    pub signature: [u8; SIGNATURE_LENGTH],
    /// Uncompressed EC point of the signature public key
    pub public_key: Vec<u8>,
}

/// Signer driving the OpenPGP applet
#[derive(Debug)]
pub struct OpenPgpSigner<F: SessionFactory> {
    factory: F,
}

impl<F: SessionFactory> OpenPgpSigner<F> {
    /// Create a signer with a session factory
    pub const fn new(factory: F) -> Self {
        Self { factory }
    }

    /// Read the signature public key
    ///
    /// Sequence: SELECT, then GENERATE ASYMMETRIC KEY PAIR in read mode.
    /// No PIN is needed to read the public key.
    pub fn public_key(&self) -> Result<Vec<u8>> {
        let session = self.factory.open_session()?;
        let mut executor = CardExecutor::new(session);

        executor.transmit_checked(&select_command())?;
        debug!("applet selected");

        let payload = executor.transmit_checked(&read_public_key_command())?;
        let public_key = parse_public_key(&payload)?;
        info!(len = public_key.len(), "public key read");

        Ok(public_key)
    }

    /// Sign a 64-byte SHA-512 digest with the card's signature key
    ///
    /// The digest length is validated before any card traffic. Sequence:
    /// SELECT, VERIFY PW1, read the public key, then PSO: COMPUTE DIGITAL
    /// SIGNATURE. The first failing step aborts the operation.
    pub fn sign_digest(&self, digest: &[u8], pin: &str) -> Result<SignResult> {
        let digest: &[u8; DIGEST_LENGTH] = digest
            .try_into()
            .map_err(|_| Error::InvalidInput("digest must be exactly 64 bytes"))?;
        if pin.is_empty() {
            return Err(Error::InvalidInput("PIN must not be empty"));
        }

        let session = self.factory.open_session()?;
        let mut executor = CardExecutor::new(session);

        executor.transmit_checked(&select_command())?;
        debug!("applet selected");

        let verify = executor.transmit(&verify_pin_command(pin))?;
        check_verify_status(verify.status())?;
        debug!("PIN verified");

        let payload = executor.transmit_checked(&read_public_key_command())?;
        let public_key = parse_public_key(&payload)?;

        let payload = executor.transmit_checked(&sign_command(digest))?;
        let signature = parse_signature(&payload)?;
        info!("digest signed");

        Ok(SignResult {
            signature,
            public_key,
        })
    }
}
