#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grid cell addressing types.
//!
//! A [`CellKey`] names one square cell of the uniform price grid at a given
//! [`CellScale`]. Keys at scale 1 are the base cells computed at ingestion;
//! coarser scales are derived by integer division of the base key.

use serde::{Deserialize, Serialize};

/// Smallest accepted cell scale (base cells).
pub const MIN_CELL_SCALE: u32 = 1;

/// Largest accepted cell scale.
pub const MAX_CELL_SCALE: u32 = 20;

/// Integer address of a grid cell at some scale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct CellKey {
    /// Column index, growing eastwards.
    pub cell_x: i32,
    /// Row index, growing northwards.
    pub cell_y: i32,
}

impl CellKey {
    /// Creates a key from its column and row.
    #[must_use]
    pub const fn new(cell_x: i32, cell_y: i32) -> Self {
        Self { cell_x, cell_y }
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.cell_x, self.cell_y)
    }
}

/// Divisor applied to base cell keys to produce coarser square cells.
///
/// Always within [`MIN_CELL_SCALE`]..=[`MAX_CELL_SCALE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CellScale(u32);

impl CellScale {
    /// The base scale.
    pub const BASE: Self = Self(MIN_CELL_SCALE);

    /// Validates a requested scale.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidScaleError`] if `value` is outside
    /// [`MIN_CELL_SCALE`]..=[`MAX_CELL_SCALE`].
    pub fn new(value: i64) -> Result<Self, InvalidScaleError> {
        u32::try_from(value)
            .ok()
            .filter(|v| (MIN_CELL_SCALE..=MAX_CELL_SCALE).contains(v))
            .map(Self)
            .ok_or(InvalidScaleError { value })
    }

    /// Returns the numeric scale.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for CellScale {
    type Error = InvalidScaleError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for CellScale {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for CellScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a cell scale is outside the accepted bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidScaleError {
    /// The rejected scale.
    pub value: i64,
}

impl std::fmt::Display for InvalidScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cellScale must be an integer between {MIN_CELL_SCALE} and {MAX_CELL_SCALE}, got {}",
            self.value
        )
    }
}

impl std::error::Error for InvalidScaleError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_bounds_are_inclusive() {
        assert_eq!(CellScale::new(1).unwrap().value(), 1);
        assert_eq!(CellScale::new(20).unwrap().value(), 20);
    }

    #[test]
    fn scale_outside_bound_is_rejected() {
        for value in [0, 21, -1, i64::MAX, i64::MIN] {
            assert_eq!(
                CellScale::new(value),
                Err(InvalidScaleError { value }),
                "scale {value} should be rejected"
            );
        }
    }

    #[test]
    fn scale_deserialization_validates() {
        let scale: CellScale = serde_json::from_str("5").unwrap();
        assert_eq!(scale.value(), 5);
        assert!(serde_json::from_str::<CellScale>("0").is_err());
        assert!(serde_json::from_str::<CellScale>("21").is_err());
    }

    #[test]
    fn keys_order_by_column_then_row() {
        let mut keys = vec![CellKey::new(1, 0), CellKey::new(0, 5), CellKey::new(0, -2)];
        keys.sort();
        assert_eq!(
            keys,
            vec![CellKey::new(0, -2), CellKey::new(0, 5), CellKey::new(1, 0)]
        );
    }
}
