//! Reader enumeration snapshot

use pcsc::{ReaderState, State};

/// Point-in-time view of one attached reader
///
/// Produced by [`PcscDeviceManager::list_readers`](crate::PcscDeviceManager::list_readers).
/// The snapshot does not track later insertions or removals; open a transport
/// to follow card presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcscReader {
    name: String,
    atr: Option<Vec<u8>>,
}

impl PcscReader {
    pub(crate) fn from_reader_state(state: &ReaderState) -> Self {
        let present = state.event_state().contains(State::PRESENT)
            && !state.event_state().contains(State::EMPTY);

        Self {
            name: state.name().to_string_lossy().into_owned(),
            atr: present.then(|| state.atr().to_vec()),
        }
    }

    /// Reader name as reported by the PC/SC service
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a card was present when the snapshot was taken
    pub const fn has_card(&self) -> bool {
        self.atr.is_some()
    }

    /// Answer To Reset of the present card
    pub fn atr(&self) -> Option<&[u8]> {
        self.atr.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;

    #[test]
    fn test_snapshot_of_empty_reader() {
        let name = CString::new("Virtual Reader 00 00").unwrap();
        let state = ReaderState::new(name, State::UNAWARE);

        let reader = PcscReader::from_reader_state(&state);
        assert_eq!(reader.name(), "Virtual Reader 00 00");
        assert!(!reader.has_card());
        assert!(reader.atr().is_none());
    }
}
