//! Free-space accounting.
//!
//! The counter is the only observable proof that reclamation happened: a
//! create/write/unlink cycle must bring it back to exactly where it started.

use super::error::{FsError, FsResult};

/// Tracks bytes available for file contents.
#[derive(Debug, Clone)]
pub struct SpaceAccountant {
    capacity: u64,
    free: u64,
}

impl SpaceAccountant {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            free: capacity,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Current free space (the `getFreeDiskSize` value).
    pub fn free(&self) -> u64 {
        self.free
    }

    pub fn used(&self) -> u64 {
        self.capacity - self.free
    }

    /// Reserve `bytes`. Fails without changing the counter if not enough is free.
    pub fn charge(&mut self, bytes: u64) -> FsResult<()> {
        if bytes > self.free {
            return Err(FsError::NoSpace {
                needed: bytes,
                available: self.free,
            });
        }
        self.free -= bytes;
        Ok(())
    }

    /// Return `bytes` to the pool.
    pub fn credit(&mut self, bytes: u64) {
        debug_assert!(
            self.free + bytes <= self.capacity,
            "credited more than was charged"
        );
        self.free = (self.free + bytes).min(self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_and_credit() {
        let mut space = SpaceAccountant::new(100);
        space.charge(40).unwrap();
        assert_eq!(space.free(), 60);
        assert_eq!(space.used(), 40);
        space.credit(40);
        assert_eq!(space.free(), 100);
    }

    #[test]
    fn test_overcharge_leaves_counter() {
        let mut space = SpaceAccountant::new(10);
        space.charge(8).unwrap();
        let err = space.charge(5).unwrap_err();
        assert_eq!(
            err,
            FsError::NoSpace {
                needed: 5,
                available: 2
            }
        );
        assert_eq!(space.free(), 2);
    }

    #[test]
    fn test_zero_charge_always_succeeds() {
        let mut space = SpaceAccountant::new(0);
        space.charge(0).unwrap();
        assert_eq!(space.free(), 0);
    }
}
