//! Per-message checklist check-state.
//!
//! Every assistant message that contains a shopping list gets its own
//! checked-index set, keyed solely by message id and persisted under
//! `shopping_{messageId}`. Indices are positional against the item
//! sequence produced by the extractor at render time, which is why the
//! extraction must stay deterministic. Check-state outlives its message:
//! deleting a conversation leaves the entries behind (accepted drift), and
//! no content hash ties a set to the text it was derived from.

use crate::error::Result;
use crate::storage::{checklist_key, Repository};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Persisted checklist check-state, keyed by message id
pub struct ChecklistStore {
    repo: Arc<dyn Repository>,
}

impl ChecklistStore {
    /// Create a checklist store over the given repository
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Load the checked indices for a message
    ///
    /// Returns an empty set when the message has no stored check-state.
    pub fn load(&self, message_id: &str) -> Result<BTreeSet<usize>> {
        let checked: Option<BTreeSet<usize>> = self.repo.get_json(&checklist_key(message_id))?;
        Ok(checked.unwrap_or_default())
    }

    /// Persist the checked indices for a message
    pub fn save(&self, message_id: &str, checked: &BTreeSet<usize>) -> Result<()> {
        self.repo.set_json(&checklist_key(message_id), checked)
    }

    /// Toggle one index in a message's check-state and persist the result
    ///
    /// The index must lie within the item sequence currently extracted from
    /// the message content; the render layer only ever derives indices from
    /// that extraction, so no bounds are enforced here.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use kondate::checklist::ChecklistStore;
    /// use kondate::storage::MemoryRepository;
    ///
    /// # fn main() -> kondate::error::Result<()> {
    /// let store = ChecklistStore::new(Arc::new(MemoryRepository::new()));
    /// let checked = store.toggle("msg_1", 0)?;
    /// assert!(checked.contains(&0));
    /// let checked = store.toggle("msg_1", 0)?;
    /// assert!(checked.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    pub fn toggle(&self, message_id: &str, index: usize) -> Result<BTreeSet<usize>> {
        let mut checked = self.load(message_id)?;
        if !checked.remove(&index) {
            checked.insert(index);
        }
        self.save(message_id, &checked)?;
        Ok(checked)
    }
}

/// Checked count and total for a checklist of `total` items
pub fn progress(checked: &BTreeSet<usize>, total: usize) -> (usize, usize) {
    (checked.len(), total)
}

/// Whether every item of a non-empty checklist is checked
pub fn is_complete(checked: &BTreeSet<usize>, total: usize) -> bool {
    total > 0 && checked.len() == total
}
