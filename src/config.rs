//! Engine configuration: numeric tolerances and iteration caps.
//!
//! Every calculation entry point takes an explicit `EngineConfig` instead of
//! reading ambient state, so two calls with the same inputs always produce
//! the same plan. The defaults match the documented contract (cent-level
//! tolerances, 10 solver iterations); a TOML file can override them.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Numeric policy for all rebalancing calculations.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Absolute tolerance for "is this amount zero" comparisons (one cent).
    #[serde(default = "default_cent_tolerance")]
    pub cent_tolerance: f64,

    /// A portfolio counts as balanced when every asset's percentage is
    /// within this many percentage points of its target.
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance_pct: f64,

    /// Iteration cap for the lump-sum fixed-point solver.
    #[serde(default = "default_solver_iterations")]
    pub solver_max_iterations: u32,

    /// A periodic plan is flagged insufficient below this coverage ratio.
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: f64,

    /// Maximum number of assets accepted by interactive portfolio entry.
    #[serde(default = "default_max_assets")]
    pub max_assets: usize,
}

fn default_cent_tolerance() -> f64 {
    0.01
}
fn default_balance_tolerance() -> f64 {
    0.5
}
fn default_solver_iterations() -> u32 {
    10
}
fn default_coverage_threshold() -> f64 {
    0.99
}
fn default_max_assets() -> usize {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cent_tolerance: default_cent_tolerance(),
            balance_tolerance_pct: default_balance_tolerance(),
            solver_max_iterations: default_solver_iterations(),
            coverage_threshold: default_coverage_threshold(),
            max_assets: default_max_assets(),
        }
    }
}

impl EngineConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: EngineConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        if self.cent_tolerance <= 0.0 {
            return Err(Error::Config("cent_tolerance must be > 0".into()));
        }
        if self.balance_tolerance_pct <= 0.0 {
            return Err(Error::Config("balance_tolerance_pct must be > 0".into()));
        }
        if self.solver_max_iterations == 0 {
            return Err(Error::Config("solver_max_iterations must be >= 1".into()));
        }
        if self.coverage_threshold <= 0.0 || self.coverage_threshold > 1.0 {
            return Err(Error::Config(
                "coverage_threshold must be in (0.0, 1.0]".into(),
            ));
        }
        if self.max_assets == 0 {
            return Err(Error::Config("max_assets must be >= 1".into()));
        }
        Ok(())
    }
}
