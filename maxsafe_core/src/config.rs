//! Configuration file support for MaxSafe.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/maxsafe/config.toml`.

use crate::{get_default_formulary, Error, Formulary, Result, WeightUnit};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub formulary: FormularyConfig,

    #[serde(default)]
    pub patient: PatientConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

/// Formulary source configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct FormularyConfig {
    /// TOML formulary replacing the built-in table
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Starting patient values for interactive sessions
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PatientConfig {
    /// Unset means sessions start with unknown weight
    #[serde(default)]
    pub default_weight: Option<f64>,

    #[serde(default)]
    pub default_unit: WeightUnit,
}

/// Text output configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_decimals")]
    pub decimals: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            decimals: default_decimals(),
        }
    }
}

fn default_decimals() -> usize {
    1
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let base = match dirs::config_dir() {
            Some(dir) => dir,
            None => std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .ok_or_else(|| Error::Config("Cannot locate a config directory".into()))?,
        };
        Ok(base.join("maxsafe").join("config.toml"))
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(weight) = self.patient.default_weight {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(Error::Config(format!(
                    "patient.default_weight must be > 0, got {}",
                    weight
                )));
            }
        }
        if self.display.decimals > 6 {
            return Err(Error::Config(format!(
                "display.decimals must be <= 6, got {}",
                self.display.decimals
            )));
        }
        Ok(())
    }

    /// Resolve the formulary: `override_path`, then the configured path,
    /// then the built-in table.
    pub fn resolve_formulary(&self, override_path: Option<&Path>) -> Result<Cow<'static, Formulary>> {
        match override_path.or(self.formulary.path.as_deref()) {
            Some(path) => Ok(Cow::Owned(Formulary::load_from(path)?)),
            None => Ok(Cow::Borrowed(get_default_formulary())),
        }
    }
}
