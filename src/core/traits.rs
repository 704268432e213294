//! Core traits for FTM ranging.
//!
//! These traits describe what the crate needs from the surrounding
//! simulation without depending on it.

use std::sync::{Arc, RwLock};

/// Position of a node in the simulated plane, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate (ignored by bias lookup).
    pub z: f64,
}

impl Position {
    /// Create a position.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Source of a node's current position.
///
/// Wireless error models query this at sampling time so that moving
/// stations pick up the bias of wherever they are.
///
/// # Example
///
/// ```
/// use std::sync::{Arc, RwLock};
/// use ftm_ranging::core::{Position, PositionSource};
///
/// let shared = Arc::new(RwLock::new(Position::new(1.0, 2.0, 0.0)));
/// assert_eq!(shared.position().x, 1.0);
/// ```
pub trait PositionSource: Send + Sync {
    /// Current position of the node.
    fn position(&self) -> Position;
}

impl PositionSource for Position {
    fn position(&self) -> Position {
        *self
    }
}

impl PositionSource for RwLock<Position> {
    fn position(&self) -> Position {
        match self.read() {
            Ok(pos) => *pos,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl<T: PositionSource + ?Sized> PositionSource for Arc<T> {
    fn position(&self) -> Position {
        (**self).position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_shared_position_follows_updates() {
        let shared = Arc::new(RwLock::new(Position::default()));
        let source: Arc<dyn PositionSource> = shared.clone();
        *shared.write().unwrap() = Position::new(7.0, -1.0, 0.0);
        assert_eq!(source.position(), Position::new(7.0, -1.0, 0.0));
    }
}
