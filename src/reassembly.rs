use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};

use crate::fragment::ResponseFragment;

#[derive(Debug, Default)]
struct PendingMessage {
    fragment_count: u8,
    /// Keyed by fragment id so iteration yields wire order no matter the arrival order.
    payloads: BTreeMap<u8, Vec<u8>>,
}

/// Collects the fragments of split responses until one is complete.
///
/// Fragments are grouped by `message_id`. The first fragment of a message fixes
/// its fragment count; later fragments that disagree are dropped. A repeated
/// fragment id replaces the earlier copy rather than counting twice.
#[derive(Debug, Default)]
pub struct FragmentBuffer {
    pending: HashMap<u32, PendingMessage>,
}

impl FragmentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fragment. Returns the concatenated payload once every fragment of
    /// its message has arrived, and forgets that message.
    pub fn insert<F: ResponseFragment>(&mut self, fragment: F) -> Option<Vec<u8>> {
        let message_id = fragment.message_id();
        let fragment_count = fragment.fragment_count();
        let fragment_id = fragment.fragment_id();

        let message = self.pending.entry(message_id).or_insert_with(|| PendingMessage {
            fragment_count,
            payloads: BTreeMap::new(),
        });
        if fragment_count != message.fragment_count || fragment_id >= message.fragment_count {
            warn!(
                "message {:#010x}: dropping fragment {} claiming {} fragments, expected {}",
                message_id, fragment_id, fragment_count, message.fragment_count
            );
            return None;
        }

        message.payloads.insert(fragment_id, fragment.into_payload());
        debug!(
            "message {:#010x}: fragment {}/{} ({} received)",
            message_id,
            fragment_id + 1,
            fragment_count,
            message.payloads.len()
        );

        if !(0..message.fragment_count).all(|id| message.payloads.contains_key(&id)) {
            return None;
        }

        let message = self.pending.remove(&message_id)?;
        Some(message.payloads.into_values().flatten().collect())
    }

    /// Number of messages still waiting for fragments.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
