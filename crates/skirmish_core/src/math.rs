//! Fixed-point math utilities for deterministic simulation.
//!
//! All game simulation uses fixed-point arithmetic so that a given
//! sequence of inputs produces bit-identical state on every platform.
//! Floating-point values only appear at the data boundary, see
//! [`decimal_serde`].

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Human-readable serde support for fixed-point numbers.
///
/// Item catalogs and config files are hand-edited, so their numbers are
/// written as plain decimals (`80`, `1.5`). The value is converted to
/// [`Fixed`] exactly once while parsing and never touches a float again.
pub mod decimal_serde {
    use super::Fixed;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a decimal into a fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(raw)
            .ok_or_else(|| D::Error::custom(format!("{raw} is out of fixed-point range")))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Unit vector pointing along +x ("right" on screen).
    pub const RIGHT: Self = Self {
        x: Fixed::ONE,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Saturates instead of overflowing for points very far apart.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        self.distance(Self::ZERO)
    }

    /// Check whether both components are zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == Fixed::ZERO && self.y == Fixed::ZERO
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Left-hand perpendicular `(-y, x)`.
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Normalize vector using fixed-point math.
    ///
    /// Returns the zero vector for zero-length input.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }
}

/// Computes the square root of a fixed-point number using binary search.
///
/// Deterministic and overflow-free; non-positive input yields zero.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    // 64 halvings exhaust every bit of an I32F32.
    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid == low {
            break;
        }
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Amount accrued over `ms` milliseconds at `per_second`.
///
/// Multiplies before dividing so whole-number rates over whole ticks
/// stay exact (`20/s` over 50 ms is exactly `1`).
#[must_use]
pub fn rate_over_millis(per_second: Fixed, ms: u64) -> Fixed {
    per_second.saturating_mul(Fixed::saturating_from_num(ms)) / Fixed::from_num(1000)
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}
