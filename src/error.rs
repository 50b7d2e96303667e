//! Error types for the rebalancing engine.

use std::path::PathBuf;

/// All errors that can occur during engine operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("target percentages sum to {total:.2}% (must be 100% within {tolerance})")]
    InvalidTargetSum { total: f64, tolerance: f64 },

    #[error("portfolio has no valid assets (need a non-empty name and a positive value)")]
    EmptyPortfolio,

    #[error("duplicate asset name: {0}")]
    DuplicateAsset(String),

    #[error("malformed portfolio record: {0}")]
    MalformedInput(#[from] serde_json::Error),

    #[error("failed to read portfolio file {path}: {source}")]
    PortfolioRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write portfolio file {path}: {source}")]
    PortfolioWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;
