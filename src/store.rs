//! Portfolio persistence: the JSON portfolio file.
//!
//! The on-disk shape is the compatibility contract:
//!
//! ```json
//! {
//!   "nome_portafoglio": "...",
//!   "assets": [ { "name": "...", "current_value": 0.0, "target": 0.0 } ],
//!   "versione": "1.0"
//! }
//! ```
//!
//! Loading is lenient at the field level (missing fields default to an
//! empty string / empty list) but a record that does not parse as this
//! structure at all is a `MalformedInput` error, never guessed around.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::error::{Error, Result};

/// Version tag written into every saved portfolio.
pub const FORMAT_VERSION: &str = "1.0";

/// The persisted portfolio record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioFile {
    #[serde(rename = "nome_portafoglio", default)]
    pub name: String,

    #[serde(default)]
    pub assets: Vec<Asset>,

    #[serde(rename = "versione", default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    FORMAT_VERSION.to_string()
}

/// Pack a portfolio into its JSON record. All assets are kept, including
/// zero-value placeholder rows, so a load restores the editing session.
pub fn save(name: &str, assets: &[Asset]) -> Result<String> {
    let record = PortfolioFile {
        name: name.to_string(),
        assets: assets.to_vec(),
        version: FORMAT_VERSION.to_string(),
    };
    Ok(serde_json::to_string_pretty(&record)?)
}

/// Unpack a JSON record into (name, assets).
pub fn load(json: &str) -> Result<(String, Vec<Asset>)> {
    let record: PortfolioFile = serde_json::from_str(json)?;
    Ok((record.name, record.assets))
}

/// Load a portfolio from a file on disk.
pub fn load_file(path: &Path) -> Result<(String, Vec<Asset>)> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::PortfolioRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    load(&contents)
}

/// Save a portfolio to a file on disk.
pub fn save_file(path: &Path, name: &str, assets: &[Asset]) -> Result<()> {
    let json = save(name, assets)?;
    std::fs::write(path, json).map_err(|e| Error::PortfolioWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_assets() -> Vec<Asset> {
        vec![
            Asset::new("ETF S&P 500", 8000.0, 60.0),
            Asset::new("Obbligazioni €", 2000.0, 40.0),
            Asset::new("Placeholder", 0.0, 0.0),
        ]
    }

    #[test]
    fn round_trip() {
        let json = save("Portafoglio 2026", &sample_assets()).unwrap();
        let (name, assets) = load(&json).unwrap();
        assert_eq!(name, "Portafoglio 2026");
        assert_eq!(assets, sample_assets());
    }

    #[test]
    fn wire_field_names() {
        let json = save("Test", &sample_assets()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["nome_portafoglio"], "Test");
        assert_eq!(value["versione"], "1.0");
        assert_eq!(value["assets"][0]["target"], 60.0);
        assert_eq!(value["assets"][0]["current_value"], 8000.0);
    }

    #[test]
    fn round_trip_unicode_name() {
        let assets = vec![Asset::new("日本株式 📈", 1000.0, 100.0)];
        let json = save("ポートフォリオ", &assets).unwrap();
        let (name, loaded) = load(&json).unwrap();
        assert_eq!(name, "ポートフォリオ");
        assert_eq!(loaded, assets);
    }

    #[test]
    fn lenient_load_missing_fields() {
        let (name, assets) = load("{}").unwrap();
        assert_eq!(name, "");
        assert!(assets.is_empty());
    }

    #[test]
    fn lenient_load_missing_asset_fields() {
        let json = r#"{"nome_portafoglio": "P", "assets": [{"name": "X"}]}"#;
        let (_, assets) = load(json).unwrap();
        assert_eq!(assets[0].name, "X");
        assert_eq!(assets[0].current_value, 0.0);
        assert_eq!(assets[0].target_pct, 0.0);
    }

    #[test]
    fn malformed_record_rejected() {
        assert!(matches!(load("not json"), Err(Error::MalformedInput(_))));
        assert!(matches!(load("[1, 2, 3]"), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolio.json");
        save_file(&path, "Su disco", &sample_assets()).unwrap();
        let (name, assets) = load_file(&path).unwrap();
        assert_eq!(name, "Su disco");
        assert_eq!(assets, sample_assets());
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = load_file(Path::new("/nonexistent/portfolio.json"));
        assert!(matches!(result, Err(Error::PortfolioRead { .. })));
    }
}
