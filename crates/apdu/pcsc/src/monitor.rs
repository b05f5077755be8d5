//! Card presence monitoring
//!
//! A background thread polls PC/SC for status changes on one reader and
//! forwards presence transitions over a channel. Transitions are
//! edge-triggered: an event fires when the presence bit appears or
//! disappears, never on repeated polls while a card stays put.

use std::ffi::CString;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use pcsc::{Context, ReaderState, Scope, State};
use tracing::{debug, warn};

/// Status transition observed on the monitored reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardStatusEvent {
    /// A card became present (edge: absent -> present)
    CardInserted {
        /// ATR reported with the presence event
        atr: Vec<u8>,
    },
    /// The card was removed (edge: present -> absent)
    CardRemoved,
    /// The reader itself disappeared
    ReaderGone,
}

/// Spawn a monitor thread for the named reader
///
/// The thread exits when the reader disappears or when the receiving side
/// hangs up.
pub(crate) fn watch(reader: CString, poll: Duration) -> Receiver<CardStatusEvent> {
    let (tx, rx) = unbounded();

    let spawned = thread::Builder::new()
        .name("pcsc-monitor".into())
        .spawn(move || run(reader, poll, tx));
    if let Err(err) = spawned {
        // The sender is consumed either way; a failed spawn shows up to the
        // caller as a disconnected channel.
        warn!(%err, "failed to spawn pcsc monitor thread");
    }

    rx
}

fn run(reader: CString, poll: Duration, tx: Sender<CardStatusEvent>) {
    let ctx = match Context::establish(Scope::User) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%err, "monitor could not establish PC/SC context");
            let _ = tx.send(CardStatusEvent::ReaderGone);
            return;
        }
    };

    let mut states = [ReaderState::new(reader, State::UNAWARE)];
    let mut last = State::UNAWARE;

    loop {
        match ctx.get_status_change(Some(poll), &mut states) {
            Ok(()) => {}
            Err(pcsc::Error::Timeout) => continue,
            Err(err) => {
                warn!(%err, "status change wait failed");
                let _ = tx.send(CardStatusEvent::ReaderGone);
                return;
            }
        }

        let state = &mut states[0];
        let event = state.event_state();

        if event.intersects(State::UNKNOWN | State::UNAVAILABLE | State::IGNORE) {
            debug!("reader disappeared");
            let _ = tx.send(CardStatusEvent::ReaderGone);
            return;
        }

        // Edge detection against the previous snapshot: a level-triggered
        // check would re-fire on every poll while the card sits in the
        // reader.
        let was_present = last.contains(State::PRESENT);
        let is_present = event.contains(State::PRESENT) && !event.contains(State::EMPTY);

        if is_present && !was_present {
            debug!("card inserted");
            if tx
                .send(CardStatusEvent::CardInserted {
                    atr: state.atr().to_vec(),
                })
                .is_err()
            {
                return;
            }
        } else if !is_present && was_present {
            debug!("card removed");
            if tx.send(CardStatusEvent::CardRemoved).is_err() {
                return;
            }
        }

        last = event;
        state.sync_current_state();
    }
}
