//! Ship size table and size-normalized framing.
//!
//! Real ship lengths span more than two orders of magnitude. A power curve
//! compresses that range so the smallest hulls still fill a readable part
//! of the frame while the largest fill all of it.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::entry::ModelEntry;
use crate::error::{is_comment_key, StoreError};

/// Hull length that maps to [`MIN_FILL_RATIO`].
pub const REFERENCE_SIZE_METERS: f64 = 75.0;
/// Hull length that maps to [`MAX_FILL_RATIO`].
pub const LARGEST_SIZE_METERS: f64 = 14_000.0;
/// Smallest share of the frame a hull may fill.
pub const MIN_FILL_RATIO: f64 = 0.12;
/// Largest share of the frame a hull may fill.
pub const MAX_FILL_RATIO: f64 = 1.0;
/// Exponent of the compression curve.
pub const SCALE_POWER: f64 = 0.4;

const CLASS_DEFAULTS_KEY: &str = "_class_defaults";

/// Fraction of the frame a hull of `size_meters` should fill.
///
/// Unknown sizes fill the whole frame.
pub fn fill_ratio(size_meters: Option<f64>) -> f64 {
    let Some(size) = size_meters else {
        return MAX_FILL_RATIO;
    };

    let scaled = (size / REFERENCE_SIZE_METERS).powf(SCALE_POWER);
    let max_scaled = (LARGEST_SIZE_METERS / REFERENCE_SIZE_METERS).powf(SCALE_POWER);
    let fill =
        MIN_FILL_RATIO + (MAX_FILL_RATIO - MIN_FILL_RATIO) * (scaled - 1.0) / (max_scaled - 1.0);

    fill.clamp(MIN_FILL_RATIO, MAX_FILL_RATIO)
}

/// Hull lengths in metres, keyed by model key, with per-subgroup defaults.
///
/// ```json
/// {
///   "_class_defaults": { "frigate": 40, "titan": 14000 },
///   "amarr/frigate/punisher": 46
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizeTable {
    sizes: BTreeMap<String, f64>,
    class_defaults: BTreeMap<String, f64>,
}

impl SizeTable {
    /// Creates an empty table; every hull fills the frame.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parses a table from JSON.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let raw: BTreeMap<String, Value> = serde_json::from_str(json).map_err(StoreError::Parse)?;

        let mut table = Self::default();
        for (key, value) in raw {
            if key == CLASS_DEFAULTS_KEY {
                let Value::Object(classes) = value else {
                    return Err(StoreError::invalid_entry(key, "expected an object"));
                };
                for (class, size) in classes {
                    let size = parse_size(&class, &size)?;
                    table.class_defaults.insert(class, size);
                }
            } else if !is_comment_key(&key) {
                let size = parse_size(&key, &value)?;
                table.sizes.insert(key, size);
            }
        }

        Ok(table)
    }

    /// Hull length for an entry: exact key first, then its subgroup default.
    pub fn size_of(&self, entry: &ModelEntry) -> Option<f64> {
        self.sizes
            .get(&entry.key())
            .or_else(|| self.class_defaults.get(&entry.subgroup))
            .copied()
    }

    /// Fill ratio for an entry.
    pub fn fill_ratio_for(&self, entry: &ModelEntry) -> f64 {
        fill_ratio(self.size_of(entry))
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty() && self.class_defaults.is_empty()
    }
}

fn parse_size(key: &str, value: &Value) -> Result<f64, StoreError> {
    match value.as_f64() {
        Some(size) if size.is_finite() && size > 0.0 => Ok(size),
        _ => Err(StoreError::invalid_entry(
            key,
            format!("expected a positive size in metres, got {}", value),
        )),
    }
}
