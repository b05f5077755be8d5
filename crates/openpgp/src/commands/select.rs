//! SELECT the OpenPGP applet by its AID

use cardbridge_apdu_core::Command;

use crate::constants::{OPENPGP_AID, ins, params};

/// Build a SELECT command for the OpenPGP applet
pub fn select_command() -> Command {
    Command::new_with_data(0x00, ins::SELECT, params::SELECT_BY_NAME, 0x00, OPENPGP_AID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_serialization() {
        let bytes = select_command().to_bytes();
        assert_eq!(
            bytes.as_ref(),
            &[0x00, 0xA4, 0x04, 0x00, 0x06, 0xD2, 0x76, 0x00, 0x01, 0x24, 0x01]
        );
    }
}
