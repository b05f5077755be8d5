//! Request and response envelopes shared by the pipe and HTTP bindings
//!
//! Field names and `command` values are a wire contract with the browser
//! extension; binary values travel hex-encoded.

use serde::{Deserialize, Serialize};

/// Incoming request, dispatched on its `command` field
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Request {
    /// Read the signature public key; no PIN needed
    GetPublicKey,
    /// Sign UTF-8 text; the host hashes it with SHA-512 first
    SignMessage {
        /// The text to hash and sign
        hash: String,
        /// User PIN, falling back to the configured one when absent
        #[serde(default)]
        pin: Option<String>,
    },
    /// Sign a precomputed digest, supplied as 128 hex characters
    SignHash {
        /// Hex-encoded 64-byte SHA-512 digest
        hash: String,
        /// User PIN, falling back to the configured one when absent
        #[serde(default)]
        pin: Option<String>,
    },
    /// Anything with an unrecognized `command` value
    #[serde(other)]
    Unknown,
}

/// Outgoing response
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Response {
    /// Answer to `getPublicKey`
    PublicKey {
        /// Hex-encoded uncompressed EC point
        #[serde(rename = "publicKey")]
        public_key: String,
    },
    /// Answer to `signMessage`/`signHash` on the pipe binding
    Signature {
        /// Hex-encoded raw `r || s` signature
        signature: String,
    },
    /// Answer to the HTTP sign route, which also reports the key
    SignatureWithKey {
        /// Hex-encoded raw `r || s` signature
        signature: String,
        /// Hex-encoded uncompressed EC point
        #[serde(rename = "publicKey")]
        public_key: String,
    },
    /// Structured failure
    Error {
        /// Human-readable cause
        error: String,
    },
}

impl Response {
    /// Structured error response
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}
