//! PC/SC device manager for reader enumeration

use std::ffi::CString;
use std::time::Duration;

use cardbridge_apdu_core::transport::TransportError;
use pcsc::{Context, ReaderState, Scope, State};

use crate::reader::PcscReader;

/// Manager for PC/SC devices
#[allow(missing_debug_implementations)]
pub struct PcscDeviceManager {
    context: Context,
}

impl PcscDeviceManager {
    /// Establish a PC/SC context
    pub fn new() -> Result<Self, TransportError> {
        let context = Context::establish(Scope::User).map_err(map_pcsc_error)?;
        Ok(Self { context })
    }

    /// List available readers with their current card status
    pub fn list_readers(&self) -> Result<Vec<PcscReader>, TransportError> {
        let names = self.reader_names()?;

        let mut states: Vec<ReaderState> = names
            .into_iter()
            .map(|name| ReaderState::new(name, State::UNAWARE))
            .collect();

        if states.is_empty() {
            return Ok(Vec::new());
        }

        // One bounded status query to learn presence and ATR
        self.context
            .get_status_change(Some(Duration::from_millis(100)), &mut states)
            .or_else(|err| match err {
                pcsc::Error::Timeout => Ok(()),
                other => Err(map_pcsc_error(other)),
            })?;

        Ok(states.iter().map(PcscReader::from_reader_state).collect())
    }

    /// Names of all attached readers
    pub(crate) fn reader_names(&self) -> Result<Vec<CString>, TransportError> {
        let len = self
            .context
            .list_readers_len()
            .map_err(map_pcsc_error)?;
        let mut buf = vec![0u8; len];

        let names = self
            .context
            .list_readers(&mut buf)
            .map_err(map_pcsc_error)?
            .map(CString::from)
            .collect();

        Ok(names)
    }
}

/// Map PC/SC service errors into the transport error taxonomy
pub(crate) fn map_pcsc_error(err: pcsc::Error) -> TransportError {
    match err {
        pcsc::Error::NoReadersAvailable | pcsc::Error::UnknownReader => TransportError::NoReader,
        pcsc::Error::ReaderUnavailable | pcsc::Error::NoService => TransportError::ReaderRemoved,
        pcsc::Error::Timeout => TransportError::Timeout,
        other => TransportError::Device(other.to_string()),
    }
}
