//! PC/SC card transport

use std::ffi::CString;
use std::time::Instant;

use cardbridge_apdu_core::transport::{CardTransport, TransportError};
use cardbridge_apdu_core::Bytes;
use crossbeam_channel::RecvTimeoutError;
use pcsc::{Card, Context, Disposition, Scope};
use tracing::{debug, warn};

use crate::config::PcscConfig;
use crate::manager::{PcscDeviceManager, map_pcsc_error};
use crate::monitor::{self, CardStatusEvent};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No reader resolved yet
    Idle,
    /// A reader was found, no card yet
    ReaderDetected,
    /// Card presence observed, not yet connected
    CardPresent,
    /// Connected, commands may be transmitted
    Connected,
    /// Terminal: connection released, card left in the reader
    Disconnected,
    /// Terminal: session failed
    Failed,
}

/// PC/SC transport bound to a single connected card
///
/// Opening the transport drives the session state machine up to
/// `Connected`; [`disconnect`](Self::disconnect) (or drop) releases the
/// connection exactly once, leaving the card in the reader for subsequent
/// sessions.
pub struct PcscTransport {
    context: Context,
    card: Option<Card>,
    state: SessionState,
}

impl std::fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscTransport")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl PcscTransport {
    /// Open a session on the first attached reader
    ///
    /// Blocks until a card is present (edge-triggered, see the monitor
    /// module) or the configured wait expires, then connects in the
    /// configured share mode.
    pub fn open(config: &PcscConfig) -> Result<Self, TransportError> {
        let manager = PcscDeviceManager::new()?;
        let reader = manager
            .reader_names()?
            .into_iter()
            .next()
            .ok_or(TransportError::NoReader)?;

        Self::open_reader(&reader, config)
    }

    /// Open a session on a specific reader
    pub fn open_reader(reader: &CString, config: &PcscConfig) -> Result<Self, TransportError> {
        let context = Context::establish(Scope::User).map_err(map_pcsc_error)?;
        let mut transport = Self {
            context,
            card: None,
            state: SessionState::Idle,
        };

        transport.state = SessionState::ReaderDetected;
        debug!(reader = %reader.to_string_lossy(), state = ?transport.state, "reader detected");

        let events = monitor::watch(reader.clone(), config.poll_interval);
        let deadline = Instant::now() + config.wait_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match events.recv_timeout(remaining) {
                Ok(CardStatusEvent::CardInserted { atr }) => {
                    transport.state = SessionState::CardPresent;
                    debug!(atr = %hex::encode(atr), state = ?transport.state, "card present");
                    break;
                }
                Ok(CardStatusEvent::CardRemoved) => continue,
                Ok(CardStatusEvent::ReaderGone) => {
                    transport.state = SessionState::Failed;
                    warn!("reader disappeared while waiting for card");
                    return Err(TransportError::ReaderRemoved);
                }
                Err(RecvTimeoutError::Timeout) => {
                    transport.state = SessionState::Failed;
                    warn!("no card within the bounded wait");
                    return Err(TransportError::Timeout);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    transport.state = SessionState::Failed;
                    return Err(TransportError::ReaderRemoved);
                }
            }
        }

        let card = match transport
            .context
            .connect(reader, config.share_mode.into(), config.protocols)
        {
            Ok(card) => card,
            Err(err) => {
                transport.state = SessionState::Failed;
                return Err(map_pcsc_error(err));
            }
        };
        transport.card = Some(card);
        transport.state = SessionState::Connected;
        debug!(state = ?transport.state, "connected to card");

        Ok(transport)
    }

    /// Current session state
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Release the connection, leaving the card in the reader
    ///
    /// Idempotent: the connection is released at most once, whether this is
    /// called explicitly or from drop.
    pub fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(card) = self.card.take() {
            self.state = SessionState::Disconnected;
            card.disconnect(Disposition::LeaveCard)
                .map_err(|(_, err)| map_pcsc_error(err))?;
            debug!("disconnected from card");
        }
        Ok(())
    }
}

impl CardTransport for PcscTransport {
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        let mut response_buf = vec![0u8; pcsc::MAX_BUFFER_SIZE_EXTENDED];
        let result = {
            let card = self.card.as_ref().ok_or(TransportError::NotConnected)?;
            card.transmit(command, &mut response_buf)
                .map(Bytes::copy_from_slice)
                .map_err(map_pcsc_error)
        };

        match result {
            Ok(response) => Ok(response),
            Err(err) => {
                self.state = SessionState::Failed;
                Err(err)
            }
        }
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        if let Err(err) = self.disconnect() {
            warn!(%err, "disconnect on drop failed");
        }
        // Keep the context alive until the card handle is gone
        let _ = &self.context;
    }
}
