//! The compression budget: how large, in bytes and pixels, a result may be.
//!
//! A [`CompressionBudget`] is an immutable `Copy` value validated once at
//! construction. The engine takes it by value and never sees presets;
//! [`Preset`] is only a naming layer for the CLI and config file.
//!
//! | Preset | Max bytes | Max long edge | Initial quality |
//! |---|---|---|---|
//! | `generic` | 1 MiB | 2048 px | 80 |
//! | `profile-photo` | 256 KiB | 512 px | 85 |
//! | `chat-image` | 500 KiB | 1280 px | 75 |

use crate::engine::CompressionError;
use crate::imaging::Quality;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte, dimension, and starting-quality ceiling for one compression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressionBudget {
    max_output_bytes: u64,
    max_dimension: u32,
    initial_quality: Quality,
}

impl CompressionBudget {
    pub const GENERIC: CompressionBudget = CompressionBudget {
        max_output_bytes: 1024 * 1024,
        max_dimension: 2048,
        initial_quality: Quality::new(80),
    };

    pub const PROFILE_PHOTO: CompressionBudget = CompressionBudget {
        max_output_bytes: 256 * 1024,
        max_dimension: 512,
        initial_quality: Quality::new(85),
    };

    pub const CHAT_IMAGE: CompressionBudget = CompressionBudget {
        max_output_bytes: 500 * 1024,
        max_dimension: 1280,
        initial_quality: Quality::new(75),
    };

    /// Validate and build a budget.
    ///
    /// Fails with [`CompressionError::InvalidBudget`] when either ceiling is
    /// zero or the quality falls outside 1–100. Quality is rejected, not
    /// clamped.
    pub fn new(
        max_output_bytes: u64,
        max_dimension: u32,
        initial_quality: u32,
    ) -> Result<Self, CompressionError> {
        if max_output_bytes == 0 {
            return Err(CompressionError::InvalidBudget(
                "max_output_bytes must be greater than zero".into(),
            ));
        }
        if max_dimension == 0 {
            return Err(CompressionError::InvalidBudget(
                "max_dimension must be greater than zero".into(),
            ));
        }
        if !(1..=100).contains(&initial_quality) {
            return Err(CompressionError::InvalidBudget(format!(
                "initial_quality must be 1-100, got {initial_quality}"
            )));
        }
        Ok(Self {
            max_output_bytes,
            max_dimension,
            initial_quality: Quality::new(initial_quality),
        })
    }

    pub fn max_output_bytes(&self) -> u64 {
        self.max_output_bytes
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    pub fn initial_quality(&self) -> Quality {
        self.initial_quality
    }

    /// Whether `len` bytes fit. Exact equality passes.
    pub fn fits(&self, len: usize) -> bool {
        len as u64 <= self.max_output_bytes
    }
}

impl Default for CompressionBudget {
    fn default() -> Self {
        Self::GENERIC
    }
}

impl fmt::Display for CompressionBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "≤{} bytes, ≤{}px, from {}",
            self.max_output_bytes, self.max_dimension, self.initial_quality
        )
    }
}

/// Named budgets for common use cases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    #[default]
    Generic,
    ProfilePhoto,
    ChatImage,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Generic, Preset::ProfilePhoto, Preset::ChatImage];

    pub fn budget(self) -> CompressionBudget {
        match self {
            Preset::Generic => CompressionBudget::GENERIC,
            Preset::ProfilePhoto => CompressionBudget::PROFILE_PHOTO,
            Preset::ChatImage => CompressionBudget::CHAT_IMAGE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Preset::Generic => "generic",
            Preset::ProfilePhoto => "profile-photo",
            Preset::ChatImage => "chat-image",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Preset::Generic => "General purpose uploads",
            Preset::ProfilePhoto => "Avatars and profile pictures",
            Preset::ChatImage => "Images attached to chat messages",
        }
    }
}

impl std::str::FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Preset::ALL.iter().map(|p| p.name()).collect();
                format!("unknown preset '{s}' (expected one of {names:?})")
            })
    }
}
