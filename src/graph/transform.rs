//! Affine transforms `y = slope * x + intercept` and their composition.

use serde::{Deserialize, Serialize};

/// An affine map between two unit scales.
///
/// Composition and application go through `f64::mul_add`, so each step rounds
/// once instead of twice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub slope: f64,
    pub intercept: f64,
}

impl Default for Transform {
    fn default() -> Self { Self::IDENTITY }
}

impl Transform {
    pub const IDENTITY: Transform = Transform { slope: 1.0, intercept: 0.0 };

    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    pub fn is_finite(&self) -> bool {
        self.slope.is_finite() && self.intercept.is_finite()
    }

    #[inline(always)]
    pub fn apply(&self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }

    /// `self` first, then `next`: `(s2*s1, s2*b1 + b2)`.
    #[inline]
    pub fn then(&self, next: &Transform) -> Transform {
        Transform {
            slope: next.slope * self.slope,
            intercept: next.slope.mul_add(self.intercept, next.intercept),
        }
    }

    /// `self` first, then the inverse of `edge`.
    ///
    /// Divides by `edge.slope` directly instead of multiplying by a rounded
    /// reciprocal. `edge.slope` must be non-zero.
    #[inline]
    pub fn then_inverse_of(&self, edge: &Transform) -> Transform {
        Transform {
            slope: self.slope / edge.slope,
            intercept: (self.intercept - edge.intercept) / edge.slope,
        }
    }

    /// `x = (y - intercept) / slope`, or `None` when the map is not invertible
    /// or its inverse overflows `f64`.
    pub fn inverse(&self) -> Option<Transform> {
        if self.slope == 0.0 || !self.is_finite() {
            return None;
        }
        Some(Transform::IDENTITY.then_inverse_of(self)).filter(Transform::is_finite)
    }

    /// Component-wise comparison with a relative tolerance.
    pub fn approx_eq(&self, other: &Transform, tolerance: f64) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0);
        close(self.slope, other.slope) && close(self.intercept, other.intercept)
    }
}
