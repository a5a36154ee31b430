//! Affine sensor calibration and the per-sensor calibration registry.
//!
//! Every channel converts its raw physical reading with
//! `value = scale * measured + offset`. Models are fitted offline from
//! `(measured, reference)` pairs with ordinary least squares and stored
//! in a YAML file keyed by sensor name:
//!
//! ```yaml
//! ph:   { a: 4.2, b: -0.31 }
//! temp: { a: 1.0, b: 0.4 }
//! ```
//!
//! Loading is deliberately lenient: a missing file is an empty registry
//! and a missing or non-numeric `a`/`b` falls back to the identity value
//! for that field, so partially calibrated setups keep working.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{Error, Result};

fn unit_scale() -> f64 {
    1.0
}

/// `value = scale * measured + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    #[serde(rename = "a", default = "unit_scale")]
    pub scale: f64,
    #[serde(rename = "b", default)]
    pub offset: f64,
}

impl Default for CalibrationModel {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl CalibrationModel {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset: 0.0,
    };

    pub const fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    /// Least-squares fit of `reference = scale * measured + offset`.
    ///
    /// When every measured value is identical the slope is undefined; the
    /// model then collapses to a constant predictor (`scale = 0`,
    /// `offset = mean(reference)`) instead of failing.
    pub fn fit(measured: &[f64], reference: &[f64]) -> Result<Self> {
        if measured.len() != reference.len() {
            return Err(Error::InvalidInput(
                "measured and reference must have the same length",
            ));
        }
        if measured.is_empty() {
            return Err(Error::InvalidInput("need at least one calibration point"));
        }

        let n = measured.len() as f64;
        let m_mean = measured.iter().sum::<f64>() / n;
        let r_mean = reference.iter().sum::<f64>() / n;

        // The mean of identical values need not equal them exactly, so
        // check the inputs rather than the accumulated variance.
        if measured.windows(2).all(|w| w[0] == w[1]) {
            debug!("degenerate calibration: measured variance is zero");
            return Ok(Self::new(0.0, r_mean));
        }

        let (num, den) = measured.iter().zip(reference).fold(
            (0.0, 0.0),
            |(num, den), (&m, &r)| {
                let dm = m - m_mean;
                (num + dm * (r - r_mean), den + dm * dm)
            },
        );

        if den == 0.0 {
            return Ok(Self::new(0.0, r_mean));
        }

        let scale = num / den;
        Ok(Self::new(scale, r_mean - scale * m_mean))
    }

    #[inline]
    pub fn apply(&self, measured: f64) -> f64 {
        self.scale * measured + self.offset
    }

    /// Build a model from an arbitrary YAML node, defaulting each field
    /// independently when it is absent or not a number.
    pub fn from_yaml(node: &Value) -> Self {
        let field = |key: &str, default: f64| {
            node.get(key).and_then(Value::as_f64).unwrap_or(default)
        };
        Self::new(field("a", 1.0), field("b", 0.0))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Calibration models keyed by sensor name (`ph`, `tds`, `turbidity`, `temp`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CalibrationRegistry {
    entries: BTreeMap<String, CalibrationModel>,
}

impl CalibrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry file. A missing or empty file yields an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no calibration file at {}", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let doc: Value = serde_yaml::from_str(text).map_err(|e| {
            warn!("calibration file rejected: {}", e);
            Error::Config("calibration file is not valid YAML")
        })?;

        let mut registry = Self::new();
        match doc {
            Value::Null => {}
            Value::Mapping(map) => {
                for (key, node) in &map {
                    match key.as_str() {
                        Some(name) => {
                            registry.insert(name, CalibrationModel::from_yaml(node));
                        }
                        None => warn!("ignoring calibration entry with non-string key {:?}", key),
                    }
                }
            }
            _ => return Err(Error::Config("calibration file must be a mapping")),
        }
        Ok(registry)
    }

    /// Write the registry as YAML, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let text = serde_yaml::to_string(self).map_err(|e| {
            warn!("calibration serialisation failed: {}", e);
            Error::Config("calibration registry could not be serialised")
        })?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<CalibrationModel> {
        self.entries.get(name).copied()
    }

    pub fn model_or_identity(&self, name: &str) -> CalibrationModel {
        self.get(name).unwrap_or_default()
    }

    pub fn insert(&mut self, name: &str, model: CalibrationModel) {
        self.entries.insert(name.to_owned(), model);
    }

    /// Add entries from `other` that this registry does not already have.
    pub fn fill_missing_from(&mut self, other: &Self) {
        for (name, model) in &other.entries {
            self.entries.entry(name.clone()).or_insert(*model);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse one `"<measured> <reference>"` line entered during calibration.
pub fn parse_pair_line(line: &str) -> Result<(f64, f64)> {
    let mut parts = line.split_whitespace();
    let (Some(m), Some(r)) = (parts.next(), parts.next()) else {
        return Err(Error::InvalidInput("need two numbers"));
    };
    let m = m
        .parse::<f64>()
        .map_err(|_| Error::InvalidInput("measured value is not a number"))?;
    let r = r
        .parse::<f64>()
        .map_err(|_| Error::InvalidInput("reference value is not a number"))?;
    Ok((m, r))
}
