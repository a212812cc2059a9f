//! Fixed-point math utilities for deterministic scoring.
//!
//! Settlement scores and weight presets use fixed-point arithmetic so that
//! two runs of the same game pick the same sites on every platform.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Build a fixed-point value from a ratio of integers (`num / den`).
///
/// Used for constants like `0.2` without touching floats.
#[must_use]
pub fn ratio(num: i32, den: i32) -> Fixed {
    Fixed::from_num(num) / Fixed::from_num(den)
}

/// Serde support for human-written weights.
///
/// Config files carry weights as hundredths (`150` means `1.5`) so RON
/// stays readable while the value in memory stays fixed-point.
pub mod hundredths_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize as an integer number of hundredths (truncating).
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let hundredths: i64 = (*value * Fixed::from_num(100)).to_num();
        hundredths.serialize(serializer)
    }

    /// Deserialize from an integer number of hundredths.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hundredths = i32::deserialize(deserializer)?;
        Ok(super::ratio(hundredths, 100))
    }
}
