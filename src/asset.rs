//! Asset input records and target-sum validation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A portfolio asset as supplied by the caller: name, current market value,
/// and target allocation percentage.
///
/// On the wire the target field is named `target` (see `store`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub current_value: f64,

    #[serde(rename = "target", default)]
    pub target_pct: f64,
}

impl Asset {
    pub fn new(name: impl Into<String>, current_value: f64, target_pct: f64) -> Self {
        Self {
            name: name.into(),
            current_value,
            target_pct,
        }
    }

    /// An asset participates in rebalancing only with a name and a positive
    /// value. Zero-value placeholder rows survive save/load but are ignored
    /// by every calculation.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.current_value > 0.0
    }
}

/// Check that target percentages over valid assets sum to 100.
///
/// Returns the actual sum on success. Every strategy assumes this has been
/// run before it is invoked; callers get an [`Error::InvalidTargetSum`]
/// otherwise, or [`Error::EmptyPortfolio`] when nothing is valid.
pub fn validate_target_sum(assets: &[Asset], tolerance: f64) -> Result<f64> {
    let valid: Vec<&Asset> = assets.iter().filter(|a| a.is_valid()).collect();
    if valid.is_empty() {
        return Err(Error::EmptyPortfolio);
    }

    // Duplicate names would collapse into one slot during planning
    let mut seen = std::collections::HashSet::new();
    for a in &valid {
        if !seen.insert(a.name.as_str()) {
            return Err(Error::DuplicateAsset(a.name.clone()));
        }
    }

    let total: f64 = valid.iter().map(|a| a.target_pct).sum();
    if (total - 100.0).abs() > tolerance {
        return Err(Error::InvalidTargetSum { total, tolerance });
    }
    Ok(total)
}
