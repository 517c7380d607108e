//! Configuration management with layered hierarchy

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Generic part used when no catalog part satisfies a sizing requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPart {
    pub part_number: String,
    pub name: String,
    /// Nominal cost per unit (per spring / per mount for sets)
    pub cost: Decimal,
}

/// Fallback parts by accessory family
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FallbackParts {
    pub inertia_base: FallbackPart,
    pub seismic_spring: FallbackPart,
    pub rubber_mount: FallbackPart,
}

impl Default for FallbackParts {
    fn default() -> Self {
        Self {
            inertia_base: FallbackPart {
                part_number: "GENERIC-IB".to_string(),
                name: "Generic inertia base".to_string(),
                cost: dec!(1500.00),
            },
            seismic_spring: FallbackPart {
                part_number: "GENERIC-SS".to_string(),
                name: "Generic seismic spring".to_string(),
                cost: dec!(95.00),
            },
            rubber_mount: FallbackPart {
                part_number: "GENERIC-RM".to_string(),
                name: "Generic rubber mount".to_string(),
                cost: dec!(45.00),
            },
        }
    }
}

/// Pump Quote configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default author for new deals
    pub author: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// GST rate applied on top of grand totals (e.g. 0.10)
    pub gst_rate: Option<Decimal>,

    /// Currency code shown on exported quotes
    pub currency: Option<String>,

    /// Springs per set when no inertia base dictates the count
    pub default_spring_count: Option<u32>,

    /// Generic parts for unmatched sizing requests
    pub fallback: Option<FallbackParts>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project_root: Option<&Path>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults are applied by the accessors

        // 2. Global user config (~/.config/pq/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.pq/config.yaml)
        if let Some(root) = project_root {
            if let Some(project_config) = Self::read_file(&root.join(".pq").join("config.yaml")) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(author) = std::env::var("PQ_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(rate) = std::env::var("PQ_GST_RATE") {
            match rate.parse::<Decimal>() {
                Ok(rate) => config.gst_rate = Some(rate),
                Err(e) => tracing::warn!(value = %rate, error = %e, "ignoring invalid PQ_GST_RATE"),
            }
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "pq")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.gst_rate.is_some() {
            self.gst_rate = other.gst_rate;
        }
        if other.currency.is_some() {
            self.currency = other.currency;
        }
        if other.default_spring_count.is_some() {
            self.default_spring_count = other.default_spring_count;
        }
        if other.fallback.is_some() {
            self.fallback = other.fallback;
        }
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    pub fn gst_rate(&self) -> Decimal {
        self.gst_rate.unwrap_or(dec!(0.10))
    }

    pub fn currency(&self) -> String {
        self.currency.clone().unwrap_or_else(|| "AUD".to_string())
    }

    pub fn default_spring_count(&self) -> u32 {
        self.default_spring_count.filter(|n| *n > 0).unwrap_or(4)
    }

    pub fn fallback_parts(&self) -> FallbackParts {
        self.fallback.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gst_rate(), dec!(0.10));
        assert_eq!(config.currency(), "AUD");
        assert_eq!(config.default_spring_count(), 4);
        assert_eq!(config.fallback_parts().inertia_base.part_number, "GENERIC-IB");
    }

    #[test]
    fn test_project_layer_overrides_defaults() {
        let tmp = tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(".pq")).unwrap();
        std::fs::write(
            tmp.path().join(".pq/config.yaml"),
            "gst_rate: '0.15'\ndefault_spring_count: 6\nfallback:\n  inertia_base:\n    part_number: IB-STD\n    name: Standard base\n    cost: '900'\n",
        )
        .unwrap();

        let config = Config::load(Some(tmp.path()));
        assert_eq!(config.gst_rate(), dec!(0.15));
        assert_eq!(config.default_spring_count(), 6);
        let fallback = config.fallback_parts();
        assert_eq!(fallback.inertia_base.part_number, "IB-STD");
        assert_eq!(fallback.inertia_base.cost, dec!(900));
        // Unspecified families keep their defaults
        assert_eq!(fallback.seismic_spring.part_number, "GENERIC-SS");
    }

    #[test]
    fn test_zero_spring_count_ignored() {
        let config = Config {
            default_spring_count: Some(0),
            ..Config::default()
        };
        assert_eq!(config.default_spring_count(), 4);
    }
}
