use std::collections::HashMap;

/// Map from opaque `u64` handles to owned GPU objects.
///
/// Handles start at 1 and are never reused, so 0 can stand for "none" on
/// the other side of an API boundary.
pub struct HandleStore<T> {
    items: HashMap<u64, T>,
    next_id: u64,
}

impl<T> HandleStore<T> {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn insert(&mut self, item: T) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.insert(id, item);
        id
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    pub fn remove(&mut self, id: u64) -> Option<T> {
        self.items.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for HandleStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
