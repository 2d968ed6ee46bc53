//! Structure-of-arrays component storage.
//!
//! Each store is one flat `f32` buffer. Entity `id` owns the `stride` slots
//! starting at `id * stride`, so systems walk contiguous memory and the
//! network layer can copy whole ranges as bytes.

use std::ops::Range;

/// Field offsets for the Transform store.
pub mod transform {
    pub const STRIDE: usize = 2;
    pub const X: usize = 0;
    pub const Y: usize = 1;
}

/// Field offsets for the Physics store.
pub mod physics {
    pub const STRIDE: usize = 3;
    pub const VX: usize = 0;
    pub const VY: usize = 1;
    pub const RADIUS: usize = 2;
}

/// Field offsets for the Locomotion store (movement stats).
pub mod locomotion {
    pub const STRIDE: usize = 2;
    pub const MAX_SPEED: usize = 0;
    pub const SPEED_MULTIPLIER: usize = 1;
}

/// Field offsets for the Intent store (current movement target).
pub mod intent {
    pub const STRIDE: usize = 2;
    pub const TARGET_X: usize = 0;
    pub const TARGET_Y: usize = 1;
}

/// Field offsets for the SkillTimers store. All values are seconds remaining.
pub mod skill_timers {
    pub const STRIDE: usize = 5;
    pub const DASH_COOLDOWN: usize = 0;
    pub const SHIELD_COOLDOWN: usize = 1;
    pub const BURST_COOLDOWN: usize = 2;
    pub const SHIELD_LEFT: usize = 3;
    pub const CHARGE_LEFT: usize = 4;
}

/// Flat numeric store with fixed stride.
#[derive(Debug, Clone)]
pub struct ComponentStore {
    data: Vec<f32>,
    stride: usize,
}

impl ComponentStore {
    pub fn new(stride: usize, capacity: usize) -> Self {
        assert!(stride > 0, "component store stride must be non-zero");
        Self {
            data: vec![0.0; stride * capacity],
            stride,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of entity slots currently backed by memory.
    pub fn capacity(&self) -> usize {
        self.data.len() / self.stride
    }

    /// Grow so that ids `0..n` are addressable. Never shrinks.
    /// New slots are zeroed; existing data is preserved.
    pub fn ensure_capacity(&mut self, n: usize) {
        if n > self.capacity() {
            // Double to amortize growth while spawning in bursts.
            let target = n.max(self.capacity() * 2);
            self.data.resize(target * self.stride, 0.0);
        }
    }

    #[inline]
    fn offset(&self, id: u32, field: usize) -> usize {
        id as usize * self.stride + field
    }

    /// Read one field. Ids beyond capacity read as zero.
    #[inline]
    pub fn read(&self, id: u32, field: usize) -> f32 {
        debug_assert!(field < self.stride);
        self.data
            .get(self.offset(id, field))
            .copied()
            .unwrap_or(0.0)
    }

    /// Write one field. Writes beyond capacity are dropped.
    #[inline]
    pub fn write(&mut self, id: u32, field: usize, value: f32) {
        debug_assert!(field < self.stride);
        let off = self.offset(id, field);
        if let Some(slot) = self.data.get_mut(off) {
            *slot = value;
        }
    }

    /// All fields of one entity.
    #[inline]
    pub fn slot(&self, id: u32) -> &[f32] {
        let start = self.offset(id, 0);
        self.data.get(start..start + self.stride).unwrap_or(&[])
    }

    #[inline]
    pub fn slot_mut(&mut self, id: u32) -> &mut [f32] {
        let start = self.offset(id, 0);
        let stride = self.stride;
        self.data.get_mut(start..start + stride).unwrap_or(&mut [])
    }

    /// Zero every field of an entity.
    pub fn zero(&mut self, id: u32) {
        self.slot_mut(id).fill(0.0);
    }

    /// Bulk copy from another store with the same stride, growing if needed.
    pub fn copy_from(&mut self, other: &ComponentStore) {
        debug_assert_eq!(self.stride, other.stride);
        self.ensure_capacity(other.capacity());
        let n = other.data.len();
        self.data[..n].copy_from_slice(&other.data);
    }

    /// Raw bytes for a contiguous id range, clamped to capacity.
    pub fn as_bytes(&self, ids: Range<u32>) -> &[u8] {
        let end = (ids.end as usize).min(self.capacity());
        let start = (ids.start as usize).min(end);
        bytemuck::cast_slice(&self.data[start * self.stride..end * self.stride])
    }

    /// Overwrite a contiguous id range from raw bytes produced by `as_bytes`.
    /// Trailing bytes that do not form a whole entity slot are ignored.
    pub fn write_bytes(&mut self, first_id: u32, bytes: &[u8]) -> usize {
        let slot_bytes = self.stride * std::mem::size_of::<f32>();
        let whole = bytes.len() / slot_bytes;
        if whole == 0 {
            return 0;
        }
        self.ensure_capacity(first_id as usize + whole);
        let start = first_id as usize * self.stride;
        let dst = &mut self.data[start..start + whole * self.stride];
        bytemuck::cast_slice_mut::<f32, u8>(dst).copy_from_slice(&bytes[..whole * slot_bytes]);
        whole
    }
}
