//! APDU command builders and response parsers for the OpenPGP applet

pub mod read_public_key;
pub use read_public_key::*;
pub mod select;
pub use select::*;
pub mod sign;
pub use sign::*;
pub mod verify_pin;
pub use verify_pin::*;
