use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::domain::CanonicalField;
use crate::error::{ConverterError, Result};
use crate::pipeline::processing::column_map::Vocabulary;

/// Tunables for a conversion run.
///
/// Everything here is read-only input to the pipeline: the core never mutates
/// its configuration and two runs with the same config and table produce
/// identical output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Minimum fuzzy-match score for a header to be accepted for a field.
    pub match_threshold: f64,
    /// Records scoring below this confidence are flagged by the detector.
    pub confidence_floor: f64,
    /// Cost estimates above this (or below zero) are flagged as extreme.
    pub cost_ceiling: f64,
    /// Fields that raise a document-level anomaly when no header maps to them.
    pub critical_fields: Vec<CanonicalField>,
    /// Per-field synonym overrides, keyed by canonical field name. A field
    /// listed here replaces its built-in synonym list entirely.
    pub synonyms: BTreeMap<String, Vec<String>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.5,
            confidence_floor: 0.4,
            cost_ceiling: 10_000_000.0,
            critical_fields: vec![
                CanonicalField::Component,
                CanonicalField::Priority,
                CanonicalField::CostEstimate,
                CanonicalField::StartDate,
                CanonicalField::EndDate,
            ],
            synonyms: BTreeMap::new(),
        }
    }
}

impl ConversionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConverterError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: ConversionConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        for key in self.synonyms.keys() {
            if CanonicalField::from_str(key).is_none() {
                return Err(ConverterError::Config(format!(
                    "unknown canonical field in [synonyms]: '{}'",
                    key
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(ConverterError::Config(format!(
                "match_threshold must be within 0..=1, got {}",
                self.match_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(ConverterError::Config(format!(
                "confidence_floor must be within 0..=1, got {}",
                self.confidence_floor
            )));
        }
        Ok(())
    }

    /// Build the mapping vocabulary: built-in synonym lists with any
    /// configured per-field overrides applied.
    pub fn vocabulary(&self) -> Vocabulary {
        let mut vocabulary = Vocabulary::default();
        for (name, synonyms) in &self.synonyms {
            if let Some(field) = CanonicalField::from_str(name) {
                vocabulary.replace(field, synonyms.clone());
            }
        }
        vocabulary
    }
}
