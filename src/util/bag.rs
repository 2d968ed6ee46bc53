/// Unordered collection with O(1) removal.
///
/// Removal moves the last element into the vacated slot, so element order is
/// not stable. Backing storage is kept across `clear` so a bag that has been
/// warmed up never allocates again.
#[derive(Debug, Clone, Default)]
pub struct Bag<T> {
    items: Vec<T>,
}

impl<T: Copy + PartialEq> Bag<T> {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            items: Vec::with_capacity(cap),
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Remove the element at `index`. The last element takes its place.
    /// Out-of-range indices are ignored.
    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        Some(self.items.swap_remove(index))
    }

    /// Remove the first element equal to `item`. Returns whether one was found.
    pub fn remove(&mut self, item: T) -> bool {
        match self.items.iter().position(|&x| x == item) {
            Some(i) => {
                self.items.swap_remove(i);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, item: T) -> bool {
        self.items.contains(&item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}
