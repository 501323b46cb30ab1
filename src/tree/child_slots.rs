//! ChildSlots - Ordered side array of owned child handles.
//!
//! Mirrors the native child list of one node, entry for entry. Capacity is
//! tracked separately from the logical count and grows by the rule
//! `2 * count + 1` (first allocation holds exactly one element), so appends are
//! amortized O(1) and a positional insert costs one shift.
//!
//! Operations that release references hand them back to the caller instead of
//! dropping them in place. A released handle may be the last owner of a subtree,
//! and its finalizer must not run while the owning node is still borrowed.

/// Growable, order-preserving array of owned references.
#[derive(Debug)]
pub struct ChildSlots<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> Default for ChildSlots<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChildSlots<T> {
    /// Empty slots with zero capacity.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            capacity: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Allocated capacity, per the growth rule (not the allocator's rounding).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Index of the first entry matching `predicate`.
    pub fn position(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.items.iter().position(predicate)
    }

    fn grow_for_insert(&mut self) {
        let count = self.items.len();
        if self.capacity == 0 {
            self.capacity = 1;
        } else if self.capacity < count + 1 {
            self.capacity = 2 * count + 1;
        } else {
            return;
        }
        self.items.reserve_exact(self.capacity - count);
    }

    /// Insert at `index`, shifting later entries right. Past the end appends.
    pub fn insert(&mut self, index: usize, item: T) {
        self.grow_for_insert();
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    /// Remove the entry at `index`, shifting later entries left.
    ///
    /// Capacity is kept. Returns `None` when out of range.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Replace the entry at `index` in place.
    ///
    /// Returns the released occupant, or gives `item` back when `index` is out
    /// of range.
    pub fn swap(&mut self, index: usize, item: T) -> Result<T, T> {
        match self.items.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, item)),
            None => Err(item),
        }
    }

    /// Install `items` as the full contents, returning the previous entries.
    pub fn replace_all(&mut self, items: Vec<T>) -> Vec<T> {
        if items.len() > self.capacity {
            self.capacity = items.len();
        }
        let mut next = Vec::with_capacity(self.capacity);
        next.extend(items);
        std::mem::replace(&mut self.items, next)
    }

    /// Release every entry and free the storage.
    pub fn take_all(&mut self) -> Vec<T> {
        self.capacity = 0;
        std::mem::take(&mut self.items)
    }
}

impl<'a, T> IntoIterator for &'a ChildSlots<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
