//! PSO: COMPUTE DIGITAL SIGNATURE over a precomputed digest

use cardbridge_apdu_core::Command;

use crate::constants::{DIGEST_LENGTH, SIGNATURE_LENGTH, ins, params};
use crate::{Error, Result};

/// Build a PSO: COMPUTE DIGITAL SIGNATURE command
///
/// The digest goes to the card as-is; hashing happened on the host. The
/// signature slot expects exactly one SHA-512 digest worth of input.
pub fn sign_command(digest: &[u8; DIGEST_LENGTH]) -> Command {
    Command::new_with_data_and_le(
        0x00,
        ins::PERFORM_SECURITY_OPERATION,
        params::PSO_CDS_P1,
        params::PSO_CDS_P2,
        digest.to_vec(),
        0,
    )
}

/// Extract the raw `r || s` signature from a PSO response payload
///
/// The applet returns the 64 signature bytes, possibly followed by trailing
/// data depending on card firmware; only the first 64 bytes are the
/// signature.
pub fn parse_signature(payload: &[u8]) -> Result<[u8; SIGNATURE_LENGTH]> {
    if payload.len() < SIGNATURE_LENGTH {
        return Err(Error::Parse("signature shorter than 64 bytes"));
    }

    let mut signature = [0u8; SIGNATURE_LENGTH];
    signature.copy_from_slice(&payload[..SIGNATURE_LENGTH]);
    Ok(signature)
}
