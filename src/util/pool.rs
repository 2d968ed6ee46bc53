use super::bag::Bag;

/// Dense entity id allocator.
///
/// Freed ids are reused before the id space grows, so ids stay small and the
/// component stores stay compact. Each id carries a generation that bumps on
/// every free, so a reused id can be told apart from its previous owner.
pub struct IdPool {
    live: Vec<bool>,
    generations: Vec<u32>,
    free: Bag<u32>,
    live_count: usize,
}

impl IdPool {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            live: Vec::with_capacity(cap),
            generations: Vec::with_capacity(cap),
            free: Bag::with_capacity(cap),
            live_count: 0,
        }
    }

    /// Hand out the most recently freed id, or the next unused one.
    pub fn alloc(&mut self) -> u32 {
        let id = match self.free.remove_at(self.free.len().wrapping_sub(1)) {
            Some(id) => id,
            None => {
                self.live.push(false);
                self.generations.push(0);
                (self.live.len() - 1) as u32
            }
        };
        self.live[id as usize] = true;
        self.live_count += 1;
        id
    }

    /// Mark a specific id live. Used by replicas, whose ids are assigned
    /// by the authority. Returns false if it was already live.
    pub fn claim(&mut self, id: u32) -> bool {
        let idx = id as usize;
        if idx >= self.live.len() {
            for gap in self.live.len() as u32..id {
                self.free.push(gap);
            }
            self.live.resize(idx + 1, false);
            self.generations.resize(idx + 1, 0);
        } else if self.live[idx] {
            return false;
        } else {
            self.free.remove(id);
        }
        self.live[idx] = true;
        self.live_count += 1;
        true
    }

    /// Release an id for reuse. Freeing a dead or unknown id is a no-op.
    pub fn free(&mut self, id: u32) -> bool {
        match self.live.get_mut(id as usize) {
            Some(slot) if *slot => {
                *slot = false;
                self.generations[id as usize] = self.generations[id as usize].wrapping_add(1);
                self.free.push(id);
                self.live_count -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn is_live(&self, id: u32) -> bool {
        self.live.get(id as usize).copied().unwrap_or(false)
    }

    /// How many times `id` has been freed.
    pub fn generation(&self, id: u32) -> u32 {
        self.generations.get(id as usize).copied().unwrap_or(0)
    }

    /// One past the highest id ever handed out.
    pub fn high_water(&self) -> u32 {
        self.live.len() as u32
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Live ids in ascending order.
    pub fn iter_live(&self) -> impl Iterator<Item = u32> + '_ {
        self.live
            .iter()
            .enumerate()
            .filter(|(_, &live)| live)
            .map(|(i, _)| i as u32)
    }
}
