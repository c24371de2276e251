//! Orientation overrides for models that do not render top-down by default.
//!
//! The store is a JSON object keyed by [`ModelEntry::key`]:
//!
//! ```json
//! {
//!   "_comment": "keys starting with an underscore are ignored",
//!   "amarr/frigate/punisher": { "axis": "y", "flip": true },
//!   "jove/special/nemesis": { "rx": 90, "rz": 180, "scale": 0.8 }
//! }
//! ```
//!
//! [`ModelEntry::key`]: crate::entry::ModelEntry::key

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{is_comment_key, StoreError};

/// Default camera framing margin applied when no `scale` is given.
pub const DEFAULT_FRAMING_SCALE: f64 = 1.1;

/// Model axis that should point up in the render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// How one model must be rotated and framed to produce a canonical
/// top-down render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrientationDirective {
    /// Which model axis points up.
    #[serde(default)]
    pub axis: Axis,

    /// Rotate 180 degrees about the up axis.
    #[serde(default)]
    pub flip: bool,

    /// Explicit rotation about X in degrees. Any explicit angle overrides
    /// `axis` and `flip`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rx: Option<f64>,

    /// Explicit rotation about Y in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ry: Option<f64>,

    /// Explicit rotation about Z in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rz: Option<f64>,

    /// Extra rotation about the up axis applied after `flip`, in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,

    /// Camera framing multiplier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

impl OrientationDirective {
    /// True when any explicit per-axis angle is present.
    pub fn has_explicit_rotation(&self) -> bool {
        self.rx.is_some() || self.ry.is_some() || self.rz.is_some()
    }

    /// Framing multiplier, falling back to [`DEFAULT_FRAMING_SCALE`].
    pub fn framing_scale(&self) -> f64 {
        self.scale.unwrap_or(DEFAULT_FRAMING_SCALE)
    }

    /// Checks that every number is finite and the scale is positive.
    pub fn validate(&self) -> Result<(), String> {
        let angles = [
            ("rx", self.rx),
            ("ry", self.ry),
            ("rz", self.rz),
            ("rotation", self.rotation),
        ];
        for (field, value) in angles {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(format!("{} must be a finite number of degrees", field));
                }
            }
        }

        if let Some(scale) = self.scale {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(format!("scale must be positive, got {}", scale));
            }
        }

        Ok(())
    }

    /// Compact JSON form handed to the rendering engine.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Read-only mapping from model key to orientation directive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrientationStore {
    overrides: BTreeMap<String, OrientationDirective>,
}

impl OrientationStore {
    /// Creates an empty store; every model uses the default orientation.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads a store from a JSON file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parses a store from JSON, skipping comment keys.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(json).map_err(StoreError::Parse)?;

        let mut overrides = BTreeMap::new();
        for (key, value) in raw {
            if is_comment_key(&key) {
                continue;
            }
            let directive: OrientationDirective = serde_json::from_value(value)
                .map_err(|e| StoreError::invalid_entry(&key, e.to_string()))?;
            directive
                .validate()
                .map_err(|message| StoreError::invalid_entry(&key, message))?;
            overrides.insert(key, directive);
        }

        Ok(Self { overrides })
    }

    /// Looks up the override for a model key.
    pub fn get(&self, key: &str) -> Option<&OrientationDirective> {
        self.overrides.get(key)
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}
