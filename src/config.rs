//! Environment-driven settings.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file in the working directory.

use std::path::{Path, PathBuf};

use crate::data::Sample;

const DEFAULT_DATA_ROOT: &str = "/srv/run";
const DEFAULT_TREE: &str = "tau_analysis";

/// Subdirectory of each sample that holds the analysis tables.
pub const ANALYSIS_DIR: &str = "data-ANALYSIS";

/// Locations of the input tables and optional plot font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root holding one directory per sample (`PHICP_DATA_ROOT`).
    pub data_root: PathBuf,
    /// Root scanned by the event counter (`PHICP_SAMPLES_ROOT`); `None` means `data_root`.
    pub samples_root: Option<PathBuf>,
    /// Table name without extension (`PHICP_TREE`).
    pub tree: String,
    /// TTF/OTF font for plot text (`PHICP_FONT`).
    pub font: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            samples_root: None,
            tree: DEFAULT_TREE.to_string(),
            font: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_root = get("PHICP_DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_ROOT));
        Self {
            data_root,
            samples_root: get("PHICP_SAMPLES_ROOT").map(PathBuf::from),
            tree: get("PHICP_TREE").unwrap_or_else(|| DEFAULT_TREE.to_string()),
            font: get("PHICP_FONT").map(PathBuf::from),
        }
    }

    pub fn with_data_root(mut self, root: impl AsRef<Path>) -> Self {
        self.data_root = root.as_ref().to_path_buf();
        self
    }

    /// The configured samples root, falling back to `data_root`.
    pub fn samples_root(&self) -> &Path {
        self.samples_root.as_deref().unwrap_or(&self.data_root)
    }

    /// `{data_root}/{sample_dir}/data-ANALYSIS/{tree}.csv`
    pub fn table_path(&self, sample: &Sample) -> PathBuf {
        self.data_root
            .join(&sample.dir)
            .join(ANALYSIS_DIR)
            .join(format!("{}.csv", self.tree))
    }

    /// Directory scanned for `*.csv` tables when counting events.
    pub fn sample_dir(&self, sample: &Sample) -> PathBuf {
        self.samples_root().join(&sample.dir).join(ANALYSIS_DIR)
    }
}
