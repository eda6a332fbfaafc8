//! `imgbudget.toml` loading and validation.
//!
//! Settings come in three layers, later ones winning:
//!
//! 1. stock defaults ([`Config::default`]),
//! 2. the user's `imgbudget.toml`, which only needs the keys it changes,
//! 3. command-line flags ([`Overrides`]).
//!
//! Layers 1 and 2 are merged as TOML values before deserializing, so a
//! sparse file never resets a section it does not mention. Validation runs
//! once, after all three layers, so a flag can fix a bad value in the file.
//!
//! ```toml
//! [budget]
//! preset = "generic"          # generic | profile-photo | chat-image
//! # max_output_bytes = 1048576
//! # max_dimension = 2048
//! # initial_quality = 80
//!
//! [output]
//! format = "jpeg"             # jpeg | avif
//! accept_degraded = false
//!
//! [processing]
//! # max_processes = 4         # default: one worker per core
//! ```
//!
//! Unknown keys are errors.

use crate::budget::{CompressionBudget, Preset};
use crate::imaging::OutputFormat;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Looked up in the working directory unless `--config` says otherwise.
pub const CONFIG_FILENAME: &str = "imgbudget.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything `imgbudget.toml` can set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub budget: BudgetConfig,
    pub output: OutputConfig,
    pub processing: ProcessingConfig,
}

impl Config {
    /// Load `path` over the stock defaults. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, &Overrides::default())
    }

    /// Load `path` over the stock defaults, then apply `overrides` on top.
    pub fn load_with(path: &Path, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut config = Self::merge(read_overlay(path)?)?;
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Merge `overlay` onto the stock defaults, then deserialize and validate.
    pub fn from_overlay(overlay: Option<toml::Value>) -> Result<Self, ConfigError> {
        let config = Self::merge(overlay)?;
        config.validate()?;
        Ok(config)
    }

    fn merge(overlay: Option<toml::Value>) -> Result<Self, ConfigError> {
        let mut merged = toml::Value::try_from(Self::default())
            .map_err(|e| ConfigError::Invalid(format!("stock defaults: {e}")))?;
        if let Some(overlay) = overlay {
            overlay_toml(&mut merged, overlay);
        }
        Ok(merged.try_into()?)
    }

    /// Layer `overrides` over this config. Does not validate.
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(preset) = overrides.preset {
            // A preset flag starts from that preset, not the file's field overrides.
            self.budget = BudgetConfig {
                preset,
                ..BudgetConfig::default()
            };
        }
        if let Some(bytes) = overrides.max_output_bytes {
            self.budget.max_output_bytes = Some(bytes);
        }
        if let Some(dimension) = overrides.max_dimension {
            self.budget.max_dimension = Some(dimension);
        }
        if let Some(quality) = overrides.initial_quality {
            self.budget.initial_quality = Some(quality);
        }
        if let Some(format) = overrides.format {
            self.output.format = format;
        }
        if overrides.accept_degraded {
            self.output.accept_degraded = true;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.budget.resolve()?;
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Invalid(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Settings given on the command line, each winning over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub preset: Option<Preset>,
    pub max_output_bytes: Option<u64>,
    pub max_dimension: Option<u32>,
    pub initial_quality: Option<u32>,
    pub format: Option<OutputFormat>,
    /// A flag can turn this on but never off.
    pub accept_degraded: bool,
}

/// `[budget]`: a preset, optionally overridden field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BudgetConfig {
    pub preset: Preset,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dimension: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_quality: Option<u32>,
}

impl BudgetConfig {
    /// The preset's budget with any overrides applied, validated.
    pub fn resolve(&self) -> Result<CompressionBudget, ConfigError> {
        let preset = self.preset.budget();
        CompressionBudget::new(
            self.max_output_bytes
                .unwrap_or_else(|| preset.max_output_bytes()),
            self.max_dimension.unwrap_or_else(|| preset.max_dimension()),
            self.initial_quality
                .unwrap_or_else(|| preset.initial_quality().value()),
        )
        .map_err(|e| ConfigError::Invalid(format!("[budget] {e}")))
    }
}

/// `[output]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Write the best-effort encoding when nothing fits the budget.
    pub accept_degraded: bool,
}

/// `[processing]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Upper bound on parallel workers. Never raised above the core count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

impl ProcessingConfig {
    /// Worker count: `max_processes` capped at the available cores.
    pub fn threads(&self) -> usize {
        let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
        match self.max_processes {
            Some(n) => n.min(cores),
            None => cores,
        }
    }
}

/// Merge `overlay` into `base` in place.
///
/// Tables merge key by key, recursively; any other overlay value replaces
/// the base value wholesale.
pub fn overlay_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => overlay_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Parse `path` as raw TOML, or `None` if there is no such file.
pub fn read_overlay(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(toml::from_str(&text)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Documented stock `imgbudget.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# imgbudget.toml
#
# Every key is optional and the values below are the defaults.
# Command-line flags take precedence over this file.
# Misspelled or unknown keys are reported as errors.

[budget]
# Starting point for the budget:
#   generic        1 MiB,   2048px long edge, quality 80
#   profile-photo  256 KiB,  512px long edge, quality 85
#   chat-image     500 KiB, 1280px long edge, quality 75
preset = "generic"

# Uncomment to override a single field of the preset.
# max_output_bytes = 1048576
# max_dimension = 2048
# initial_quality = 80

[output]
# "jpeg" or "avif"
format = "jpeg"

# If no encoding fits, still write the smallest one instead of failing.
accept_degraded = false

[processing]
# Parallel workers. Defaults to one per CPU core and is never raised above it.
# max_processes = 4
"##
}
