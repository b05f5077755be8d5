//! Protocol constants for the OpenPGP card applet

/// Application identifier of the OpenPGP applet
pub const OPENPGP_AID: &[u8] = b"\xD2\x76\x00\x01\x24\x01";

/// Signature length returned by PSO: COMPUTE DIGITAL SIGNATURE (raw `r || s`)
pub const SIGNATURE_LENGTH: usize = 64;

/// Digest length expected by the signature key slot (SHA-512)
pub const DIGEST_LENGTH: usize = 64;

/// Instruction bytes used by this applet
pub mod ins {
    /// SELECT
    pub const SELECT: u8 = 0xA4;
    /// VERIFY
    pub const VERIFY: u8 = 0x20;
    /// GENERATE ASYMMETRIC KEY PAIR (read mode with P1 = 0x81)
    pub const GENERATE_ASYMMETRIC_KEY_PAIR: u8 = 0x47;
    /// PERFORM SECURITY OPERATION
    pub const PERFORM_SECURITY_OPERATION: u8 = 0x2A;
}

/// Parameter bytes
pub mod params {
    /// P1 for SELECT by DF name
    pub const SELECT_BY_NAME: u8 = 0x04;
    /// P2 reference for PW1 in signature mode
    pub const PW1_SIGN: u8 = 0x81;
    /// P1 for GENERATE ASYMMETRIC KEY PAIR in read mode
    pub const READ_PUBLIC_KEY: u8 = 0x81;
    /// P1 for PSO: COMPUTE DIGITAL SIGNATURE
    pub const PSO_CDS_P1: u8 = 0x9E;
    /// P2 for PSO: COMPUTE DIGITAL SIGNATURE
    pub const PSO_CDS_P2: u8 = 0x9A;
}

/// BER-TLV tags in applet responses
pub mod tags {
    /// Public key template wrapping the key material
    pub const PUBLIC_KEY_TEMPLATE: u16 = 0x7F49;
    /// External public key: the uncompressed EC point
    pub const EXTERNAL_PUBLIC_KEY: u16 = 0x86;
}

/// Control reference template naming the digital signature key slot
pub const CRT_DIGITAL_SIGNATURE: &[u8] = b"\xB6\x00";
