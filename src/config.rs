// ⚙️ Configuration - TOML file with defaults for every field
//
//   database_path = "database.db"
//   assets_dir    = "assets"
//   default_logo  = "logo.png"
//   server_addr   = "127.0.0.1:3000"
//
//   [clinic_logos]
//   "CNN" = "logo_cnn.png"

use crate::export::Branding;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file holding every dataset table
    pub database_path: PathBuf,

    /// Directory with the logo images
    pub assets_dir: PathBuf,

    /// Logo used when a clinic has no entry in `clinic_logos`
    pub default_logo: String,

    /// Clinic name → logo file name (merged over the built-in map)
    pub clinic_logos: HashMap<String, String>,

    pub server_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("database.db"),
            assets_dir: PathBuf::from("assets"),
            default_logo: "logo.png".to_string(),
            clinic_logos: HashMap::new(),
            server_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `path`; without a path, or when the file does not exist,
    /// the defaults are returned
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(AppConfig::default());
        };

        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn branding(&self) -> Branding {
        let mut clinic_logos = Branding::standard_clinic_logos();
        clinic_logos.extend(self.clinic_logos.clone());

        Branding {
            assets_dir: self.assets_dir.clone(),
            default_logo: self.default_logo.clone(),
            clinic_logos,
        }
    }
}
