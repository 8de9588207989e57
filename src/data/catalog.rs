//! Sample catalog: human-readable labels mapped to sample directories.
//!
//! The catalog is plain data passed explicitly to every command. The built-in
//! table covers the CP-even/odd signal samples; `--catalog <json>` replaces it.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Label shown in prompts and summaries.
    pub label: String,
    /// Directory name below the data roots.
    pub dir: String,
}

impl Sample {
    pub fn new(label: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            dir: dir.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCatalog {
    samples: Vec<Sample>,
}

const BUILTIN: [(&str, &str); 10] = [
    ("cp-even hadhad", "cp-even-hadhad"),
    ("cp-odd hadhad", "cp-odd-hadhad"),
    ("cp-even hadlep", "cp-even-hadlep"),
    ("cp-odd hadlep", "cp-odd-hadlep"),
    ("cp-even lephad", "cp-even-lephad"),
    ("cp-odd lephad", "cp-odd-lephad"),
    ("cp-even hadhad H200", "cp-even-hadhad-H200"),
    ("cp-even hadhad H500", "cp-even-hadhad-H500"),
    ("cp-even hadhad H1000", "cp-even-hadhad-H1000"),
    ("cp-even hadhad H3000", "cp-even-hadhad-H3000"),
];

impl Default for SampleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SampleCatalog {
    pub fn new(samples: Vec<Sample>) -> Result<Self, AppError> {
        if samples.is_empty() {
            return Err(AppError::config("Sample catalog is empty."));
        }
        for (i, s) in samples.iter().enumerate() {
            if s.label.trim().is_empty() || s.dir.trim().is_empty() {
                return Err(AppError::config(format!(
                    "Sample catalog entry {} has an empty label or directory.",
                    i + 1
                )));
            }
            if samples[..i].iter().any(|o| o.label == s.label) {
                return Err(AppError::config(format!("Duplicate sample label: '{}'", s.label)));
            }
        }
        Ok(Self { samples })
    }

    pub fn builtin() -> Self {
        Self {
            samples: BUILTIN.iter().map(|(l, d)| Sample::new(*l, *d)).collect(),
        }
    }

    /// Load a catalog from a JSON file: `{"samples": [{"label": .., "dir": ..}, ..]}`.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::config(format!("Failed to open sample catalog '{}': {e}", path.display()))
        })?;
        let raw: SampleCatalog = serde_json::from_reader(file).map_err(|e| {
            AppError::config(format!("Invalid sample catalog '{}': {e}", path.display()))
        })?;
        Self::new(raw.samples)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn labels(&self) -> Vec<&str> {
        self.samples.iter().map(|s| s.label.as_str()).collect()
    }

    /// Look up a sample by label, falling back to its directory name.
    pub fn get(&self, key: &str) -> Result<&Sample, AppError> {
        self.samples
            .iter()
            .find(|s| s.label == key)
            .or_else(|| self.samples.iter().find(|s| s.dir == key))
            .ok_or_else(|| {
                AppError::config(format!(
                    "Unknown sample '{key}'. Known samples: {}",
                    self.labels().join(", ")
                ))
            })
    }

    /// Resolve labels in order; any unknown label is fatal.
    pub fn resolve<S: AsRef<str>>(&self, keys: &[S]) -> Result<Vec<&Sample>, AppError> {
        keys.iter().map(|k| self.get(k.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_resolves_by_label_or_dir() {
        let cat = SampleCatalog::builtin();
        assert_eq!(cat.samples().len(), 10);
        assert_eq!(cat.get("cp-odd hadlep").unwrap().dir, "cp-odd-hadlep");
        assert_eq!(cat.get("cp-even-hadhad-H500").unwrap().label, "cp-even hadhad H500");
        assert!(cat.get("nope").is_err());
    }

    #[test]
    fn resolve_keeps_order_and_fails_on_unknown() {
        let cat = SampleCatalog::builtin();
        let got = cat.resolve(&["cp-odd hadhad", "cp-even hadhad"]).unwrap();
        assert_eq!(got[0].dir, "cp-odd-hadhad");
        assert_eq!(got[1].dir, "cp-even-hadhad");
        assert!(cat.resolve(&["cp-odd hadhad", "missing"]).is_err());
    }

    #[test]
    fn loads_json_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"samples": [{{"label": "demo", "dir": "demo-dir"}}]}}"#).unwrap();
        let cat = SampleCatalog::from_json_file(f.path()).unwrap();
        assert_eq!(cat.labels(), vec!["demo"]);
    }

    #[test]
    fn bad_catalog_file_is_fatal() {
        assert!(SampleCatalog::from_json_file(Path::new("/no/such/catalog.json")).is_err());
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"samples": []}}"#).unwrap();
        assert!(SampleCatalog::from_json_file(f.path()).is_err());
    }
}
