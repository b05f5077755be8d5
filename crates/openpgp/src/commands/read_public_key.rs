//! Read the signature public key via GENERATE ASYMMETRIC KEY PAIR

use cardbridge_apdu_core::Command;
use iso7816_tlv::ber::{Tag, Tlv, Value};

use crate::constants::{CRT_DIGITAL_SIGNATURE, ins, params, tags};
use crate::{Error, Result};

/// Build a GENERATE ASYMMETRIC KEY PAIR command in read mode
///
/// P1 = 0x81 asks for the existing public key of the slot named by the
/// control reference template (`B6 00`, the signature slot) without
/// generating anything. The applet requires extended Lc/Le here even though
/// the payload is two bytes.
pub fn read_public_key_command() -> Command {
    Command::new(
        0x00,
        ins::GENERATE_ASYMMETRIC_KEY_PAIR,
        params::READ_PUBLIC_KEY,
        0x00,
    )
    .with_data(CRT_DIGITAL_SIGNATURE)
    .with_le(0)
    .with_extended_length()
}

/// Extract the uncompressed EC point from a public key response
///
/// The payload is a `7F49` template whose `86` child carries the point. Any
/// other shape is a parse failure, reported without guessing at offsets.
pub fn parse_public_key(payload: &[u8]) -> Result<Vec<u8>> {
    let template = Tlv::from_bytes(payload)?;

    let template_tag = Tag::try_from(tags::PUBLIC_KEY_TEMPLATE)?;
    if template.tag() != &template_tag {
        return Err(Error::Parse("expected public key template (7F49)"));
    }

    let children = match template.value() {
        Value::Constructed(children) => children,
        Value::Primitive(_) => return Err(Error::Parse("public key template is not constructed")),
    };

    let point_tag = Tag::try_from(tags::EXTERNAL_PUBLIC_KEY)?;
    let point = children
        .iter()
        .find(|child| child.tag() == &point_tag)
        .ok_or(Error::Parse("public key point (tag 86) missing"))?;

    match point.value() {
        Value::Primitive(bytes) if !bytes.is_empty() => Ok(bytes.clone()),
        _ => Err(Error::Parse("public key point is empty")),
    }
}
