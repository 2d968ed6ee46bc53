use glam::Vec2;

use crate::store::{transform, ComponentStore};
use crate::util::Bag;

/// Spatial hash grid for O(1) neighbor queries.
///
/// Cell size must be at least the largest query radius, otherwise entities
/// two cells away can be missed. Cells are folded into a fixed table with a
/// multiplicative hash, so the world is unbounded. Positions always come from
/// the Transform store; the grid only caches which bucket an id was in at the
/// last refresh.
pub struct SpatialHash {
    cell_size: f32,
    inv_cell_size: f32,
    table_size: usize,
    /// Dynamic memberships. Pre-allocated, cleared each tick.
    buckets: Vec<Bag<u32>>,
    /// Static memberships. Survive `clear`.
    static_buckets: Vec<Bag<u32>>,
}

#[inline]
fn position(transforms: &ComponentStore, id: u32) -> Vec2 {
    Vec2::new(
        transforms.read(id, transform::X),
        transforms.read(id, transform::Y),
    )
}

impl SpatialHash {
    pub fn new(cell_size: f32, table_size: usize) -> Self {
        let table_size = table_size.max(1);
        let mut buckets = Vec::with_capacity(table_size);
        let mut static_buckets = Vec::with_capacity(table_size);
        for _ in 0..table_size {
            // Pre-allocate each bucket to avoid allocs during rebuild.
            buckets.push(Bag::with_capacity(8));
            static_buckets.push(Bag::with_capacity(4));
        }
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            table_size,
            buckets,
            static_buckets,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Drop all dynamic memberships. Static entities stay put.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear(); // Keeps allocation.
        }
    }

    /// Bucket a dynamic entity at its current position.
    pub fn insert(&mut self, transforms: &ComponentStore, id: u32) {
        let hash = self.hash(position(transforms, id));
        self.buckets[hash].push(id);
    }

    /// Bucket an entity that never moves. Inserted once, never re-bucketed.
    pub fn insert_static(&mut self, transforms: &ComponentStore, id: u32) {
        let hash = self.hash(position(transforms, id));
        self.static_buckets[hash].push(id);
    }

    /// Remove a static entity. Its position must not have changed since
    /// `insert_static`.
    pub fn remove_static(&mut self, transforms: &ComponentStore, id: u32) -> bool {
        let hash = self.hash(position(transforms, id));
        self.static_buckets[hash].remove(id)
    }

    /// Clear dynamic memberships and re-insert `ids` at their current positions.
    pub fn rebuild(&mut self, transforms: &ComponentStore, ids: impl IntoIterator<Item = u32>) {
        self.clear();
        for id in ids {
            self.insert(transforms, id);
        }
    }

    /// Every entity within `max_distance` of `id`, excluding `id` itself.
    ///
    /// Computed lazily from the 3x3 block of cells around the entity.
    pub fn query_nearby<'a>(
        &'a self,
        transforms: &'a ComponentStore,
        id: u32,
        max_distance: f32,
    ) -> impl Iterator<Item = u32> + 'a {
        debug_assert!(max_distance <= self.cell_size);
        let origin = position(transforms, id);
        let max_sq = max_distance * max_distance;
        let (cells, count) = self.neighbor_buckets(origin);
        (0..count)
            .flat_map(move |i| {
                let b = cells[i];
                self.buckets[b].iter().chain(self.static_buckets[b].iter())
            })
            .copied()
            .filter(move |&other| {
                other != id && position(transforms, other).distance_squared(origin) <= max_sq
            })
    }

    /// Allocation-free variant of `query_nearby`. Writes up to `out.len()`
    /// ids and returns how many were written.
    pub fn query_nearby_into(
        &self,
        transforms: &ComponentStore,
        id: u32,
        max_distance: f32,
        out: &mut [u32],
    ) -> usize {
        let mut n = 0;
        for other in self.query_nearby(transforms, id, max_distance) {
            if n == out.len() {
                break;
            }
            out[n] = other;
            n += 1;
        }
        n
    }

    /// Distinct buckets covering the cell of `pos` and its 8 neighbors.
    /// Several cells can fold into one bucket; each bucket is listed once.
    fn neighbor_buckets(&self, pos: Vec2) -> ([usize; 9], usize) {
        let (cx, cy) = self.cell_coords(pos);
        let mut cells = [0usize; 9];
        let mut count = 0;
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                let hash = self.hash_cell(cx.wrapping_add(dx), cy.wrapping_add(dy));
                if !cells[..count].contains(&hash) {
                    cells[count] = hash;
                    count += 1;
                }
            }
        }
        (cells, count)
    }

    fn cell_coords(&self, pos: Vec2) -> (i32, i32) {
        let cx = (pos.x * self.inv_cell_size).floor() as i32;
        let cy = (pos.y * self.inv_cell_size).floor() as i32;
        (cx, cy)
    }

    fn hash(&self, pos: Vec2) -> usize {
        let (cx, cy) = self.cell_coords(pos);
        self.hash_cell(cx, cy)
    }

    fn hash_cell(&self, cx: i32, cy: i32) -> usize {
        // Multiplicative spatial hash.
        let h = (cx as u32).wrapping_mul(73856093) ^ (cy as u32).wrapping_mul(19349663);
        (h as usize) % self.table_size
    }
}
