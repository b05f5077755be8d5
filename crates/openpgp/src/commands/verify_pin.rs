//! VERIFY the user PIN (PW1) for signature operations

use cardbridge_apdu_core::Command;
use cardbridge_apdu_core::response::{StatusWord, status};

use crate::constants::{ins, params};
use crate::{Error, Result};

/// Build a VERIFY command for PW1 in signature mode
///
/// The PIN travels as its raw UTF-8 bytes, not hex-encoded: the applet
/// compares byte-for-byte against what was set at personalization time.
pub fn verify_pin_command(pin: &str) -> Command {
    Command::new_with_data(
        0x00,
        ins::VERIFY,
        0x00,
        params::PW1_SIGN,
        pin.as_bytes().to_vec(),
    )
}

/// Interpret a VERIFY status word
///
/// Rejection and exhaustion are distinct failures: a blocked PIN cannot be
/// fixed by retrying, so callers must be able to tell them apart.
pub fn check_verify_status(status: StatusWord) -> Result<()> {
    match status.to_u16() {
        status::SW_SUCCESS => Ok(()),
        status::SW_SECURITY_STATUS_NOT_SATISFIED => Err(Error::WrongPin),
        sw if (0x63C0..=0x63CF).contains(&sw) => Err(Error::WrongPin),
        status::SW_AUTH_METHOD_BLOCKED => Err(Error::PinBlocked),
        _ => Err(cardbridge_apdu_core::Error::status(status).into()),
    }
}
