//! Planes Pool - fixed set of reusable plane lists for the recursive trace
//!
//! Every portal the trace passes through needs its own list of clip planes
//! for the lifetime of that branch. Rather than allocating per portal, the
//! lists are handed out from a fixed pool:
//! - At most [`POOL_MAX`] lists are in use at once (one per recursion level)
//! - Freed slots are reused LIFO, so the hottest buffers stay hot
//! - Buffers keep their allocation between traces

use crate::math::Plane;

/// Maximum number of plane lists in use at once
pub const POOL_MAX: usize = 32;

/// Plane capacity reserved up front for every slot
const INITIAL_PLANES: usize = 32;

/// Slot in the planes pool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolId(u8);

impl PoolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fixed-capacity freelist of plane buffers
pub struct PlanesPool {
    planes: [Vec<Plane>; POOL_MAX],
    /// Stack of free slot indices, top at `num_free - 1`
    freelist: [u8; POOL_MAX],
    num_free: usize,
    /// Bit n set while slot n is handed out
    in_use: u32,
}

impl Default for PlanesPool {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanesPool {
    pub fn new() -> Self {
        let mut pool = Self {
            planes: std::array::from_fn(|_| Vec::with_capacity(INITIAL_PLANES)),
            freelist: [0; POOL_MAX],
            num_free: 0,
            in_use: 0,
        };
        pool.reset();
        pool
    }

    /// Mark every slot free. Called once before each trace.
    pub fn reset(&mut self) {
        for (n, slot) in self.freelist.iter_mut().enumerate() {
            *slot = (POOL_MAX - n - 1) as u8;
        }
        self.num_free = POOL_MAX;
        self.in_use = 0;
    }

    /// Take a free slot, or None when all [`POOL_MAX`] are in use
    pub fn request(&mut self) -> Option<PoolId> {
        if self.num_free == 0 {
            return None;
        }
        self.num_free -= 1;
        let slot = self.freelist[self.num_free];
        self.in_use |= 1 << slot;
        Some(PoolId(slot))
    }

    /// Return a slot to the pool
    pub fn free(&mut self, id: PoolId) {
        let slot = id.index();
        let valid = slot < POOL_MAX && self.in_use & (1 << slot) != 0;
        debug_assert!(valid, "planes pool slot {} freed while not in use", slot);
        if !valid {
            log::warn!("Ignoring free of planes pool slot {} (not in use)", slot);
            return;
        }
        self.in_use &= !(1 << slot);
        self.freelist[self.num_free] = id.0;
        self.num_free += 1;
    }

    /// Plane list stored in a slot
    pub fn get(&mut self, id: PoolId) -> &mut Vec<Plane> {
        &mut self.planes[id.index()]
    }

    pub fn num_free(&self) -> usize {
        self.num_free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;

    #[test]
    fn test_request_until_exhausted() {
        let mut pool = PlanesPool::new();
        let mut ids = Vec::new();
        for _ in 0..POOL_MAX {
            ids.push(pool.request().expect("pool should have a free slot"));
        }
        assert_eq!(pool.num_free(), 0);
        assert!(pool.request().is_none(), "33rd request must fail");

        // all slots distinct
        let mut indices: Vec<usize> = ids.iter().map(|id| id.index()).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), POOL_MAX);

        pool.free(ids[5]);
        assert_eq!(pool.request(), Some(ids[5]));
    }

    #[test]
    fn test_first_request_is_slot_zero() {
        let mut pool = PlanesPool::new();
        assert_eq!(pool.request().map(PoolId::index), Some(0));
        assert_eq!(pool.request().map(PoolId::index), Some(1));
    }

    #[test]
    fn test_lifo_reuse() {
        let mut pool = PlanesPool::new();
        let a = pool.request().unwrap();
        let b = pool.request().unwrap();
        pool.free(a);
        pool.free(b);
        assert_eq!(pool.request(), Some(b));
        assert_eq!(pool.request(), Some(a));
    }

    #[test]
    fn test_reset_frees_everything() {
        let mut pool = PlanesPool::new();
        for _ in 0..10 {
            pool.request();
        }
        pool.reset();
        assert_eq!(pool.num_free(), POOL_MAX);
    }

    #[test]
    fn test_buffer_keeps_capacity() {
        let mut pool = PlanesPool::new();
        let id = pool.request().unwrap();
        let planes = pool.get(id);
        planes.clear();
        for i in 0..100 {
            planes.push(Plane::new(Vec3::X, i as f32));
        }
        let capacity = planes.capacity();
        pool.free(id);

        let again = pool.request().unwrap();
        assert_eq!(again, id);
        let planes = pool.get(again);
        assert!(planes.capacity() >= capacity);
        assert_eq!(planes.len(), 100, "pool does not clear buffers, callers do");
    }
}
