//! Per-entity status bitmask.
//!
//! Flags record transient conditions only. Whoever owns the effect that set a
//! flag is responsible for clearing it; this store has no notion of time.

/// A single status condition (or a mask of several).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(pub u32);

impl Status {
    pub const NONE: Self = Self(0);

    /// Protected from being consumed; combat against it is contested.
    pub const SHIELDED: Self = Self(1 << 0);

    /// Mid-dash. Movement input is ignored and the entity cannot be consumed.
    pub const CHARGING: Self = Self(1 << 1);

    /// Reserved for the contested-combat damage model.
    pub const STUNNED: Self = Self(1 << 2);

    /// Spawn protection.
    pub const INVULNERABLE: Self = Self(1 << 3);

    /// Conditions that stop an entity from being consumed or from being
    /// forced to back off.
    pub const GUARDED: Self = Self(Self::SHIELDED.0 | Self::CHARGING.0);

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl std::ops::BitOr for Status {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Bitmask store indexed by entity id, one `u32` per entity.
#[derive(Debug, Clone, Default)]
pub struct StatusFlags {
    bits: Vec<u32>,
}

impl StatusFlags {
    pub fn new(capacity: usize) -> Self {
        Self {
            bits: vec![0; capacity],
        }
    }

    pub fn ensure_capacity(&mut self, n: usize) {
        if n > self.bits.len() {
            let target = n.max(self.bits.len() * 2);
            self.bits.resize(target, 0);
        }
    }

    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn set(&mut self, id: u32, flag: Status) {
        if let Some(b) = self.bits.get_mut(id as usize) {
            *b |= flag.0;
        }
    }

    #[inline]
    pub fn clear(&mut self, id: u32, flag: Status) {
        if let Some(b) = self.bits.get_mut(id as usize) {
            *b &= !flag.0;
        }
    }

    #[inline]
    pub fn toggle(&mut self, id: u32, flag: Status) {
        if let Some(b) = self.bits.get_mut(id as usize) {
            *b ^= flag.0;
        }
    }

    /// True when every bit of `flag` is set.
    #[inline]
    pub fn has(&self, id: u32, flag: Status) -> bool {
        self.get(id).contains(flag)
    }

    #[inline]
    pub fn get(&self, id: u32) -> Status {
        Status(self.bits.get(id as usize).copied().unwrap_or(0))
    }

    /// Overwrite the whole mask. Used when applying replicated state.
    pub fn replace(&mut self, id: u32, status: Status) {
        if let Some(b) = self.bits.get_mut(id as usize) {
            *b = status.0;
        }
    }

    pub fn reset(&mut self, id: u32) {
        self.replace(id, Status::NONE);
    }
}
