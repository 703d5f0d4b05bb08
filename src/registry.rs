//! Priority-ordered registration list shared by the locator chain, the
//! resolver chain and the filter registry.
//!
//! Entries are kept sorted by descending priority; within one priority tier
//! they stay in registration order. Writers build a new vector and swap it
//! in under a short write lock, so a reader always iterates a complete
//! snapshot and never sees a half-applied registration.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle returned by registration, used to unregister later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct Entry<T: ?Sized> {
    id: EntryId,
    priority: i32,
    item: Arc<T>,
}

impl<T: ?Sized> Entry<T> {
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn item(&self) -> &Arc<T> {
        &self.item
    }
}

impl<T: ?Sized> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            priority: self.priority,
            item: Arc::clone(&self.item),
        }
    }
}

/// Immutable view of the list at one point in time
pub type Snapshot<T> = Arc<Vec<Entry<T>>>;

pub struct PriorityList<T: ?Sized> {
    entries: RwLock<Snapshot<T>>,
    next_id: AtomicU64,
}

impl<T: ?Sized> PriorityList<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Insert `item` after every existing entry of equal or higher priority
    pub fn insert(&self, priority: i32, item: Arc<T>) -> EntryId {
        let id = EntryId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Entry { id, priority, item };

        let mut guard = self.entries.write();
        let mut next: Vec<Entry<T>> = (**guard).clone();
        let position = next
            .iter()
            .position(|existing| existing.priority < priority)
            .unwrap_or(next.len());
        next.insert(position, entry);
        *guard = Arc::new(next);

        id
    }

    pub fn remove(&self, id: EntryId) -> Option<Arc<T>> {
        let mut guard = self.entries.write();
        let position = guard.iter().position(|entry| entry.id == id)?;
        let mut next: Vec<Entry<T>> = (**guard).clone();
        let removed = next.remove(position);
        *guard = Arc::new(next);
        Some(removed.item)
    }

    /// Remove every entry matching `predicate`, returning how many were dropped
    pub fn remove_where(&self, predicate: impl Fn(&T) -> bool) -> usize {
        let mut guard = self.entries.write();
        let before = guard.len();
        let next: Vec<Entry<T>> = guard
            .iter()
            .filter(|entry| !predicate(&entry.item))
            .cloned()
            .collect();
        let removed = before - next.len();
        if removed > 0 {
            *guard = Arc::new(next);
        }
        removed
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        Arc::clone(&self.entries.read())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized> Default for PriorityList<T> {
    fn default() -> Self {
        Self::new()
    }
}
