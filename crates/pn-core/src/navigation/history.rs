//! Back/forward history stacks and the current-entry slot

use std::collections::VecDeque;

use tracing::debug;

use crate::entry::{EntryId, PageStackEntry};

/// Ordered navigation history.
///
/// The back stack is oldest-first and shares its bound with the page cache
/// capacity; pushing past the bound evicts the oldest entry. The forward
/// stack is most-recently-superseded-first and unbounded. `can_go_back` and
/// `can_go_forward` are recomputed on every structural mutation so callers
/// read them without re-deriving stack occupancy.
pub struct HistoryStacks {
    back: VecDeque<PageStackEntry>,
    forward: VecDeque<PageStackEntry>,
    current: Option<PageStackEntry>,
    capacity: usize,
    can_go_back: bool,
    can_go_forward: bool,
}

impl HistoryStacks {
    pub fn new(capacity: usize) -> Self {
        Self {
            back: VecDeque::new(),
            forward: VecDeque::new(),
            current: None,
            capacity,
            can_go_back: false,
            can_go_forward: false,
        }
    }

    pub fn can_go_back(&self) -> bool {
        self.can_go_back
    }

    pub fn can_go_forward(&self) -> bool {
        self.can_go_forward
    }

    pub fn back_len(&self) -> usize {
        self.back.len()
    }

    pub fn forward_len(&self) -> usize {
        self.forward.len()
    }

    pub fn current(&self) -> Option<&PageStackEntry> {
        self.current.as_ref()
    }

    /// Oldest-first view of the back stack
    pub fn back_entries(&self) -> impl Iterator<Item = &PageStackEntry> {
        self.back.iter()
    }

    /// Most-recently-superseded-first view of the forward stack
    pub fn forward_entries(&self) -> impl Iterator<Item = &PageStackEntry> {
        self.forward.iter()
    }

    /// Re-bound the back stack; shrinking evicts oldest entries first
    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.evict_over_capacity();
        self.refresh_flags();
    }

    /// Install a new current entry, returning the superseded one
    pub(crate) fn replace_current(&mut self, entry: PageStackEntry) -> Option<PageStackEntry> {
        self.current.replace(entry)
    }

    /// The entry `go_back` would navigate to
    pub(crate) fn peek_back(&self) -> Option<&PageStackEntry> {
        self.back.back()
    }

    /// The entry `go_forward` would navigate to
    pub(crate) fn peek_forward(&self) -> Option<&PageStackEntry> {
        self.forward.front()
    }

    /// Push onto the back stack, evicting the oldest entry past capacity
    pub(crate) fn push_back_entry(&mut self, entry: PageStackEntry) {
        self.back.push_back(entry);
        self.evict_over_capacity();
        self.refresh_flags();
    }

    /// Push onto the forward stack (most recent first)
    pub(crate) fn push_forward_entry(&mut self, entry: PageStackEntry) {
        self.forward.push_front(entry);
        self.refresh_flags();
    }

    /// Append to the forward stack preserving serialized order; restore only
    pub(crate) fn append_forward_entry(&mut self, entry: PageStackEntry) {
        self.forward.push_back(entry);
        self.refresh_flags();
    }

    /// Remove a back-stack entry by identity
    pub(crate) fn remove_back(&mut self, id: EntryId) -> Option<PageStackEntry> {
        let position = self.back.iter().position(|entry| entry.id() == id)?;
        let removed = self.back.remove(position);
        self.refresh_flags();
        removed
    }

    /// Remove a forward-stack entry by identity
    pub(crate) fn remove_forward(&mut self, id: EntryId) -> Option<PageStackEntry> {
        let position = self.forward.iter().position(|entry| entry.id() == id)?;
        let removed = self.forward.remove(position);
        self.refresh_flags();
        removed
    }

    pub(crate) fn clear_forward(&mut self) {
        self.forward.clear();
        self.refresh_flags();
    }

    /// Drop both stacks, keeping the current slot
    pub(crate) fn clear_stacks(&mut self) {
        self.back.clear();
        self.forward.clear();
        self.refresh_flags();
    }

    /// Drop both stacks and the current slot
    pub(crate) fn clear_all(&mut self) {
        self.current = None;
        self.clear_stacks();
    }

    fn evict_over_capacity(&mut self) {
        while self.back.len() > self.capacity {
            if let Some(evicted) = self.back.pop_front() {
                debug!(source_type = %evicted.source_type(), "evicting oldest back-stack entry");
            }
        }
    }

    fn refresh_flags(&mut self) {
        self.can_go_back = !self.back.is_empty();
        self.can_go_forward = !self.forward.is_empty();
    }
}
