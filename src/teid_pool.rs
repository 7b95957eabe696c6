//! TEID Pool
//!
//! Allocation of local Tunnel Endpoint Identifiers for callers that
//! establish tunnels. TEID 0 is reserved for TEID-less signalling and is
//! never handed out.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::{GtpError, GtpResult};

/// TEID Pool for allocating unique TEIDs
#[derive(Debug, Clone)]
pub struct TeidPool {
    counter: Arc<AtomicU32>,
    base: u32,
    max: u32,
}

impl TeidPool {
    /// Create a new TEID pool with the default range (1..0xFFFFFFFF)
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU32::new(1)),
            base: 1,
            max: u32::MAX,
        }
    }

    /// Create a new TEID pool with a custom range
    pub fn with_range(base: u32, max: u32) -> GtpResult<Self> {
        if base == 0 {
            return Err(GtpError::InvalidFormat(
                "TEID base must be greater than 0".to_string(),
            ));
        }
        if base >= max {
            return Err(GtpError::InvalidFormat(
                "TEID base must be less than max".to_string(),
            ));
        }
        Ok(Self {
            counter: Arc::new(AtomicU32::new(base)),
            base,
            max,
        })
    }

    /// Allocate a new TEID, wrapping around at the end of the range
    pub fn allocate(&self) -> GtpResult<u32> {
        let teid = self.counter.fetch_add(1, Ordering::SeqCst);
        if teid < self.max {
            return Ok(teid);
        }
        self.counter.store(self.base, Ordering::SeqCst);
        let teid = self.counter.fetch_add(1, Ordering::SeqCst);
        if teid >= self.max {
            return Err(GtpError::ResourceExhausted("TEID pool exhausted".to_string()));
        }
        Ok(teid)
    }

    /// Reset the pool to its base value
    pub fn reset(&self) {
        self.counter.store(self.base, Ordering::SeqCst);
    }
}

impl Default for TeidPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_is_sequential_and_nonzero() {
        let pool = TeidPool::new();
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        assert_ne!(a, 0);
        assert_eq!(b, a + 1);
    }

    #[test]
    fn test_wrap_around() {
        let pool = TeidPool::with_range(10, 12).unwrap();
        assert_eq!(pool.allocate().unwrap(), 10);
        assert_eq!(pool.allocate().unwrap(), 11);
        // wraps back to base
        assert_eq!(pool.allocate().unwrap(), 10);
    }

    #[test]
    fn test_invalid_range() {
        assert!(TeidPool::with_range(0, 10).is_err());
        assert!(TeidPool::with_range(10, 10).is_err());
    }
}
