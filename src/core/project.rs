//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::EntityId;

/// Directory holding one YAML document per deal
pub const DEALS_DIR: &str = "deals";

/// Directory holding the reference catalog
pub const CATALOG_DIR: &str = "catalog";

/// Catalog files created by `pq init`, with their empty contents
const CATALOG_FILES: &[(&str, &str)] = &[
    ("inertia_bases.yaml", "[]\n"),
    ("seismic_springs.yaml", "[]\n"),
    ("rubber_mounts.yaml", "[]\n"),
    ("pumps.yaml", "[]\n"),
    ("products.yaml", "[]\n"),
    ("price_adders.yaml", "ip_adder: '0'\ndrip_tray_adder: '0'\n"),
];

/// Represents a pump quoting project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .pq/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(".pq").is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Use an explicit root, or discover from the current directory
    pub fn open(root: Option<&Path>) -> Result<Self, ProjectError> {
        match root {
            Some(path) => Self::discover_from(path),
            None => Self::discover(),
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(".pq").exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::init_force(&root)
    }

    /// Initialize even if .pq/ exists; existing deals and catalog files are kept
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let io = |e: std::io::Error| ProjectError::IoError(e.to_string());

        let pq_dir = root.join(".pq");
        std::fs::create_dir_all(&pq_dir).map_err(io)?;
        std::fs::write(pq_dir.join("config.yaml"), Self::default_config()).map_err(io)?;

        std::fs::create_dir_all(root.join(DEALS_DIR)).map_err(io)?;
        let catalog = root.join(CATALOG_DIR);
        std::fs::create_dir_all(&catalog).map_err(io)?;
        for (name, empty) in CATALOG_FILES {
            let path = catalog.join(name);
            if !path.exists() {
                std::fs::write(path, empty).map_err(io)?;
            }
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# Pump Quote project configuration

# Default author for new deals (can be overridden by global config)
# author: ""

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto

# GST applied on top of option grand totals
# gst_rate: "0.10"

# Springs per set when no inertia base dictates the count
# default_spring_count: 4

# Generic parts used when no catalog part meets the sizing requirement
# fallback:
#   inertia_base: { part_number: GENERIC-IB, name: Generic inertia base, cost: "1500.00" }
#   seismic_spring: { part_number: GENERIC-SS, name: Generic seismic spring, cost: "95.00" }
#   rubber_mount: { part_number: GENERIC-RM, name: Generic rubber mount, cost: "45.00" }
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .pq configuration directory
    pub fn pq_dir(&self) -> PathBuf {
        self.root.join(".pq")
    }

    pub fn deals_dir(&self) -> PathBuf {
        self.root.join(DEALS_DIR)
    }

    pub fn catalog_dir(&self) -> PathBuf {
        self.root.join(CATALOG_DIR)
    }

    /// Get the path for a deal document
    pub fn deal_path(&self, id: &EntityId) -> PathBuf {
        self.deals_dir().join(format!("{}.pq.yaml", id))
    }

    /// Iterate all deal documents
    pub fn iter_deal_files(&self) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(self.deals_dir())
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(".pq.yaml"))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a pump quote project (searched from {searched_from:?}). Run 'pq init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("pump quote project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
