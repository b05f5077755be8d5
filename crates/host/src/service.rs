//! Request dispatch over the card signer
//!
//! The card reader is a single-slot resource: concurrent requests serialize
//! on one async mutex, and the blocking card I/O runs on the blocking thread
//! pool so the endpoint tasks stay responsive.

use std::sync::Arc;

use cardbridge_openpgp::{OpenPgpSigner, SessionFactory, SignResult};
use sha2::{Digest, Sha512};
use tokio::sync::Mutex;
use tracing::warn;

use crate::protocol::{Request, Response};

/// Failures raised at the service layer, before or around card access
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Neither the request nor the configuration carries a PIN
    #[error("PIN required and none configured")]
    MissingPin,

    /// The supplied hash is not valid hex
    #[error("hash must be hex-encoded: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Card-level failure
    #[error(transparent)]
    Signer(#[from] cardbridge_openpgp::Error),

    /// The blocking signing task was cancelled or panicked
    #[error("signing task failed to complete")]
    TaskFailed,
}

/// Shared dispatcher used by both endpoint bindings
#[derive(Debug)]
pub struct SignerService<F: SessionFactory> {
    signer: Arc<OpenPgpSigner<F>>,
    default_pin: Option<String>,
    slot: Arc<Mutex<()>>,
}

impl<F: SessionFactory> Clone for SignerService<F> {
    fn clone(&self) -> Self {
        Self {
            signer: Arc::clone(&self.signer),
            default_pin: self.default_pin.clone(),
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<F> SignerService<F>
where
    F: SessionFactory + Send + Sync + 'static,
{
    /// Create a service around a signer, with an optional configured PIN
    /// used when a request does not carry its own
    pub fn new(signer: OpenPgpSigner<F>, default_pin: Option<String>) -> Self {
        Self {
            signer: Arc::new(signer),
            default_pin,
            slot: Arc::new(Mutex::new(())),
        }
    }

    /// Read the signature public key
    pub async fn public_key(&self) -> Result<Vec<u8>, ServiceError> {
        let _slot = self.slot.lock().await;
        let signer = Arc::clone(&self.signer);

        tokio::task::spawn_blocking(move || signer.public_key())
            .await
            .map_err(|_| ServiceError::TaskFailed)?
            .map_err(Into::into)
    }

    /// Sign a hex-encoded 64-byte digest
    pub async fn sign_hash(
        &self,
        hash: &str,
        pin: Option<String>,
    ) -> Result<SignResult, ServiceError> {
        let digest = hex::decode(hash)?;
        let pin = self.resolve_pin(pin)?;
        self.sign(digest, pin).await
    }

    /// Hash UTF-8 text with SHA-512 and sign the digest
    pub async fn sign_message(
        &self,
        text: &str,
        pin: Option<String>,
    ) -> Result<SignResult, ServiceError> {
        let digest = Sha512::digest(text.as_bytes()).to_vec();
        let pin = self.resolve_pin(pin)?;
        self.sign(digest, pin).await
    }

    /// Dispatch one request to its handler, folding failures into the
    /// structured error envelope
    pub async fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::GetPublicKey => match self.public_key().await {
                Ok(public_key) => Response::PublicKey {
                    public_key: hex::encode(public_key),
                },
                Err(err) => self.fail(err),
            },
            Request::SignMessage { hash, pin } => match self.sign_message(&hash, pin).await {
                Ok(result) => Response::Signature {
                    signature: hex::encode(result.signature),
                },
                Err(err) => self.fail(err),
            },
            Request::SignHash { hash, pin } => match self.sign_hash(&hash, pin).await {
                Ok(result) => Response::Signature {
                    signature: hex::encode(result.signature),
                },
                Err(err) => self.fail(err),
            },
            Request::Unknown => Response::error("Unknown command"),
        }
    }

    fn fail(&self, err: ServiceError) -> Response {
        warn!(%err, "request failed");
        Response::error(err.to_string())
    }

    fn resolve_pin(&self, pin: Option<String>) -> Result<String, ServiceError> {
        pin.or_else(|| self.default_pin.clone())
            .ok_or(ServiceError::MissingPin)
    }

    async fn sign(&self, digest: Vec<u8>, pin: String) -> Result<SignResult, ServiceError> {
        let _slot = self.slot.lock().await;
        let signer = Arc::clone(&self.signer);

        tokio::task::spawn_blocking(move || signer.sign_digest(&digest, &pin))
            .await
            .map_err(|_| ServiceError::TaskFailed)?
            .map_err(Into::into)
    }
}
