//! Append-only audit journal.
//!
//! Events never carry ciphertexts, the threshold, or a result before it has
//! been disclosed.

use cipherscreen_identity::Identity;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProtocolEvent {
    ParticipantAdmitted { identity: Identity },
    AdministratorAdded { identity: Identity },
    AdministratorRemoved { identity: Identity },
    ThresholdChanged,
    TransactionSubmitted { id: u64, submitter: Identity },
    DisclosureRequested { id: u64 },
    Disclosed { id: u64, value: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// 1-based position in the journal
    pub seq: u64,
    pub event: ProtocolEvent,
}

#[derive(Debug, Default)]
pub struct EventJournal {
    events: Vec<RecordedEvent>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn emit(&mut self, event: ProtocolEvent) -> u64 {
        let seq = self.events.len() as u64 + 1;
        info!("event #{}: {:?}", seq, event);
        self.events.push(RecordedEvent { seq, event });
        seq
    }

    /// Events with `seq > after`, oldest first
    pub fn since(&self, after: u64) -> &[RecordedEvent] {
        let start = (after as usize).min(self.events.len());
        &self.events[start..]
    }

    pub fn all(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn last_seq(&self) -> u64 {
        self.events.len() as u64
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_returns_the_tail() {
        let mut journal = EventJournal::new();
        journal.emit(ProtocolEvent::ThresholdChanged);
        journal.emit(ProtocolEvent::DisclosureRequested { id: 1 });
        journal.emit(ProtocolEvent::Disclosed { id: 1, value: true });

        assert_eq!(journal.since(0).len(), 3);
        assert_eq!(journal.since(2)[0].seq, 3);
        assert!(journal.since(3).is_empty());
        assert!(journal.since(99).is_empty());
    }

    #[test]
    fn threshold_changed_serializes_without_payload() {
        let json = serde_json::to_string(&ProtocolEvent::ThresholdChanged).unwrap();
        assert_eq!(json, r#"{"kind":"threshold_changed"}"#);
    }
}
