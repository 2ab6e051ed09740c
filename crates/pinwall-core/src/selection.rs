//! Selection set.

use crate::object::ObjectId;
use std::collections::HashSet;

/// Selected object ids. Single and multi selection share this representation.
///
/// Mutators return whether the set changed so callers can decide to notify.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: HashSet<ObjectId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether `id` is the only selected object.
    pub fn is_sole(&self, id: ObjectId) -> bool {
        self.ids.len() == 1 && self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.ids.iter().copied()
    }

    /// Selected ids in a stable order.
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<_> = self.ids.iter().copied().collect();
        ids.sort();
        ids
    }

    /// Make `id` the only selected object.
    pub fn select_only(&mut self, id: ObjectId) -> bool {
        if self.is_sole(id) {
            return false;
        }
        self.ids.clear();
        self.ids.insert(id);
        true
    }

    pub fn add(&mut self, id: ObjectId) -> bool {
        self.ids.insert(id)
    }

    pub fn remove(&mut self, id: ObjectId) -> bool {
        self.ids.remove(&id)
    }

    /// Replace the whole selection.
    pub fn replace<I>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = ObjectId>,
    {
        let next: HashSet<ObjectId> = ids.into_iter().collect();
        if next == self.ids {
            return false;
        }
        self.ids = next;
        true
    }

    pub fn extend<I>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = ObjectId>,
    {
        let before = self.ids.len();
        self.ids.extend(ids);
        self.ids.len() != before
    }

    pub fn clear(&mut self) -> bool {
        if self.ids.is_empty() {
            return false;
        }
        self.ids.clear();
        true
    }

    /// Drop ids that no longer pass `keep`.
    pub fn retain<F>(&mut self, mut keep: F) -> bool
    where
        F: FnMut(ObjectId) -> bool,
    {
        let before = self.ids.len();
        self.ids.retain(|id| keep(*id));
        self.ids.len() != before
    }
}
