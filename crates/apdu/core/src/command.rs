//! APDU command definitions
//!
//! This module provides the [`Command`] type for constructing APDU commands
//! according to ISO/IEC 7816-4, in both short and extended form.

use bytes::{BufMut, Bytes, BytesMut};

use crate::Error;

/// Generic APDU command structure
///
/// A command is immutable once built: the builders below hand out a new
/// value, nothing mutates a command after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected length (optional)
    pub le: Option<u16>,
    /// Force extended Lc/Le encoding even when the lengths fit short form
    pub extended: bool,
}

impl Command {
    /// Maximum data length encodable in short form
    pub const MAX_SHORT_DATA: usize = 255;

    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
            extended: false,
        }
    }

    /// Create a new command with data payload
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self::new(cla, ins, p1, p2).with_data(data)
    }

    /// Create a new command with both data and expected length
    pub fn new_with_data_and_le<T: Into<Bytes>>(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: T,
        le: u16,
    ) -> Self {
        Self::new(cla, ins, p1, p2).with_data(data).with_le(le)
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the expected length field
    ///
    /// In short form `0` encodes as `0x00` (up to 256 bytes expected);
    /// in extended form it encodes as `0x0000`.
    pub const fn with_le(mut self, le: u16) -> Self {
        self.le = Some(le);
        self
    }

    /// Force extended Lc/Le encoding
    ///
    /// Some card operations (e.g. OpenPGP GENERATE ASYMMETRIC KEY PAIR)
    /// require extended length fields even for small payloads.
    pub const fn with_extended_length(mut self) -> Self {
        self.extended = true;
        self
    }

    /// Whether this command serializes with extended length fields
    fn uses_extended(&self) -> bool {
        self.extended
            || self
                .data
                .as_ref()
                .is_some_and(|d| d.len() > Self::MAX_SHORT_DATA)
            || self.le.is_some_and(|le| le > 256)
    }

    /// Convert to raw APDU bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(7 + self.data.as_ref().map_or(0, |d| d.len()) + 3);

        // Header: CLA, INS, P1, P2
        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        let extended = self.uses_extended();

        if let Some(data) = &self.data {
            if extended {
                // Extended Lc: 00 followed by a 2-byte big-endian length
                buffer.put_u8(0x00);
                buffer.put_u16(data.len() as u16);
            } else {
                buffer.put_u8(data.len() as u8);
            }
            buffer.put_slice(data);
        }

        if let Some(le) = self.le {
            if extended {
                // The extended Le marker is only present when there was no Lc
                if self.data.is_none() {
                    buffer.put_u8(0x00);
                }
                buffer.put_u16(le);
            } else {
                buffer.put_u8(if le == 256 { 0x00 } else { le as u8 });
            }
        }

        buffer.freeze()
    }

    /// Parse a command from raw bytes (short form only)
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < 4 {
            return Err(Error::InvalidCommandLength(data.len()));
        }

        let mut command = Self::new(data[0], data[1], data[2], data[3]);

        if data.len() > 4 {
            let lc = data[4] as usize;

            if data.len() == 5 {
                // Only Le present, no data
                command.le = Some(data[4] as u16);
            } else if data.len() >= 5 + lc {
                if lc > 0 {
                    command.data = Some(Bytes::copy_from_slice(&data[5..5 + lc]));
                }

                // Check for Le
                if data.len() > 5 + lc {
                    if data.len() == 5 + lc + 1 {
                        command.le = Some(data[5 + lc] as u16);
                    } else {
                        return Err(Error::InvalidCommandLength(data.len()));
                    }
                }
            } else {
                return Err(Error::InvalidCommandLength(data.len()));
            }
        }

        Ok(command)
    }
}
