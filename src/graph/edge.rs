//! Defines the `Hop` type, one traversable step between two units.

use super::Transform;
use serde::{Deserialize, Serialize};

/// Which way a conversion is being traversed.
///
/// The ordering matters: when two hops lead to the same unit, the forward one
/// is preferred during path selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Source to destination, as the conversion was recorded.
    Forward,
    /// Destination back to source through a bidirectional conversion.
    Inverse,
}

/// Edge weight of the conversion graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hop {
    /// The conversion's recorded transform, whichever way it is traversed.
    pub transform: Transform,
    pub direction: Direction,
}

impl Hop {
    /// Appends this hop to an accumulated transform.
    #[inline]
    pub fn fold_onto(&self, acc: Transform) -> Transform {
        match self.direction {
            Direction::Forward => acc.then(&self.transform),
            Direction::Inverse => acc.then_inverse_of(&self.transform),
        }
    }

    /// The transform this hop applies on its own.
    pub fn effective(&self) -> Transform {
        self.fold_onto(Transform::IDENTITY)
    }

    pub fn label(&self) -> String {
        let t = &self.transform;
        match self.direction {
            Direction::Forward => format!("x{} + {}", t.slope, t.intercept),
            Direction::Inverse => format!("(x - {}) / {}", t.intercept, t.slope),
        }
    }
}
