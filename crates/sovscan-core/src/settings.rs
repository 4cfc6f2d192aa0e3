//! Scan definitions and the immutable settings snapshot.
//!
//! A [`ScanDefinition`] is the operator-authored YAML describing one scan:
//! brand metadata, per-provider iteration counts, and the ordered question
//! list. At scan creation it is split into the question rows and a
//! [`SettingsSnapshot`] stored on the scan, so later edits to the YAML can
//! never change an in-flight scan.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::scan::Provider;
use crate::ConfigError;

/// Per-provider knobs captured into the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Model identifier passed through to the provider.
    pub model: String,
    /// Iterations per question for this provider.
    pub iterations: u32,
    /// Credits charged per call.
    pub credit_cost: i64,
}

/// Immutable copy of scan settings captured when a scan is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub brand_name: String,
    /// Extra keywords that count as a brand mention (aliases, product names).
    #[serde(default)]
    pub brand_keywords: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<String>,
    pub providers: BTreeMap<Provider, ProviderSettings>,
    /// Hard per-call timeout.
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SettingsSnapshot {
    /// Total configured iterations per question, summed across providers.
    #[must_use]
    pub fn iterations_per_question(&self) -> u32 {
        self.providers.values().map(|p| p.iterations).sum()
    }

    /// Up-front credit estimate for `question_count` questions:
    /// `Σ_provider question_count × iterations × credit_cost`.
    #[must_use]
    pub fn estimated_credits(&self, question_count: u32) -> i64 {
        self.providers
            .values()
            .map(|p| i64::from(question_count) * i64::from(p.iterations) * p.credit_cost)
            .sum()
    }
}

/// Operator-authored YAML describing one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDefinition {
    pub name: String,
    pub brand_name: String,
    #[serde(default)]
    pub brand_keywords: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<String>,
    pub providers: BTreeMap<Provider, ProviderSettings>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub questions: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

impl ScanDefinition {
    /// Capture the immutable settings snapshot for a scan created from this
    /// definition.
    #[must_use]
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            brand_name: self.brand_name.clone(),
            brand_keywords: self.brand_keywords.clone(),
            competitors: self.competitors.clone(),
            providers: self.providers.clone(),
            timeout_secs: self.timeout_secs,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Validate invariants the serde derive cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an empty brand name, empty or
    /// whitespace-only questions, no providers, or a provider with zero
    /// iterations or a non-positive credit cost.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.brand_name.trim().is_empty() {
            return Err(ConfigError::Validation("brand_name is empty".to_string()));
        }
        if self.questions.is_empty() {
            return Err(ConfigError::Validation(
                "question list is empty".to_string(),
            ));
        }
        if let Some(idx) = self.questions.iter().position(|q| q.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "question at index {idx} is empty"
            )));
        }
        if self.providers.is_empty() {
            return Err(ConfigError::Validation(
                "at least one provider must be configured".to_string(),
            ));
        }
        for (provider, settings) in &self.providers {
            if settings.iterations == 0 {
                return Err(ConfigError::Validation(format!(
                    "provider '{provider}' has zero iterations"
                )));
            }
            if settings.credit_cost <= 0 {
                return Err(ConfigError::Validation(format!(
                    "provider '{provider}' has non-positive credit_cost {}",
                    settings.credit_cost
                )));
            }
            if settings.model.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "provider '{provider}' has an empty model id"
                )));
            }
        }
        Ok(())
    }
}

/// Load and validate a [`ScanDefinition`] from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read,
/// [`ConfigError::Yaml`] if it does not parse, or
/// [`ConfigError::Validation`] if it fails [`ScanDefinition::validate`].
pub fn load_scan_definition(path: &Path) -> Result<ScanDefinition, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let definition: ScanDefinition =
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::Yaml {
            path: path.display().to_string(),
            source: e,
        })?;
    definition.validate()?;
    Ok(definition)
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
