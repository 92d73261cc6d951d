// src/stove/throttle.rs - Requested stove output
use serde::{Deserialize, Serialize};

/// Base level in `[0, 1]` plus a count of boost steps beyond full.
///
/// A non-zero `boost` only makes sense with `base == 1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrottleRequest {
    pub base: f32,
    pub boost: u32,
}

impl ThrottleRequest {
    pub const OFF: Self = Self { base: 0.0, boost: 0 };

    pub fn new(base: f32, boost: u32) -> Self {
        Self { base, boost }
    }

    /// Close enough that a change is not worth reporting.
    pub fn is_near(&self, other: &Self) -> bool {
        (self.base - other.base).abs() <= 0.05 && self.boost == other.boost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_near() {
        let a = ThrottleRequest::new(0.5, 0);
        assert!(a.is_near(&ThrottleRequest::new(0.54, 0)));
        assert!(!a.is_near(&ThrottleRequest::new(0.56, 0)));
        assert!(!a.is_near(&ThrottleRequest::new(0.5, 1)));
        assert!(ThrottleRequest::default().is_near(&ThrottleRequest::OFF));
    }
}
