//! Portfolio snapshot builder.
//!
//! Normalizes a raw asset list into working metrics: total value, per-asset
//! current percentage, target value, and gap. Every strategy consumes a
//! snapshot rather than the raw list. Building is a pure function and the
//! snapshot is recomputed on every call, never mutated in place.

use serde::Serialize;

use crate::asset::{self, Asset};
use crate::config::EngineConfig;
use crate::error::Result;

/// Derived per-asset metrics.
#[derive(Debug, Clone, Serialize)]
pub struct AssetMetric {
    pub name: String,
    pub current_value: f64,
    /// Share of total portfolio value, in percent.
    pub current_pct: f64,
    pub target_pct: f64,
    /// Value this asset should hold at the current total.
    pub target_value: f64,
    /// `target_value - current_value`; positive means underweight.
    pub gap: f64,
}

/// A validated, normalized view of the portfolio at one instant.
///
/// Entries preserve input order. Assets with a non-positive value are
/// excluded entirely; if nothing remains the snapshot is empty with a
/// total of zero (callers special-case emptiness, it is not an error).
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSnapshot {
    pub total_value: f64,
    pub entries: Vec<AssetMetric>,
}

impl PortfolioSnapshot {
    /// Build a snapshot from raw assets. Pure: no validation beyond the
    /// positive-value filter, no I/O.
    pub fn build(assets: &[Asset]) -> Self {
        let total_value: f64 = assets
            .iter()
            .filter(|a| a.current_value > 0.0)
            .map(|a| a.current_value)
            .sum();

        if total_value == 0.0 {
            return Self {
                total_value: 0.0,
                entries: Vec::new(),
            };
        }

        let entries = assets
            .iter()
            .filter(|a| a.current_value > 0.0)
            .map(|a| {
                let current_pct = a.current_value / total_value * 100.0;
                let target_value = a.target_pct / 100.0 * total_value;
                AssetMetric {
                    name: a.name.clone(),
                    current_value: a.current_value,
                    current_pct,
                    target_pct: a.target_pct,
                    target_value,
                    gap: target_value - a.current_value,
                }
            })
            .collect();

        Self {
            total_value,
            entries,
        }
    }

    /// Build after checking the target-sum precondition. This is the entry
    /// point strategies expect their input to have gone through.
    pub fn build_checked(assets: &[Asset], config: &EngineConfig) -> Result<Self> {
        asset::validate_target_sum(assets, config.cent_tolerance)?;
        Ok(Self::build(assets))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every entry is within `tolerance_pct` percentage points of
    /// its target.
    pub fn is_balanced(&self, tolerance_pct: f64) -> bool {
        self.entries
            .iter()
            .all(|e| (e.current_pct - e.target_pct).abs() <= tolerance_pct)
    }
}

impl std::fmt::Display for PortfolioSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total value: {:.2}", self.total_value)?;
        writeln!(
            f,
            "{:<20} {:>12} {:>9} {:>9} {:>12} {:>12}",
            "Asset", "Value", "Now %", "Target %", "Target val", "Gap"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "{:<20} {:>12.2} {:>8.1}% {:>8.1}% {:>12.2} {:>+12.2}",
                e.name, e.current_value, e.current_pct, e.target_pct, e.target_value, e.gap
            )?;
        }
        Ok(())
    }
}
