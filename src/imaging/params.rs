//! Parameter types for codec operations.
//!
//! These describe *what* the codec should produce, not *how*. The engine
//! decides on a [`Quality`] and a set of [`Dimensions`](super::Dimensions);
//! the [`backend`](super::backend) does the pixel work. Keeping the two apart
//! lets tests drive the engine with a mock codec.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`OutputFormat`]: which lossy encoder the Rust codec writes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u32);

impl Quality {
    /// Lowest quality the search will ever request.
    pub const MIN: Quality = Quality(1);
    /// Highest quality an encoder accepts.
    pub const MAX: Quality = Quality(100);

    pub const fn new(value: u32) -> Self {
        if value < 1 {
            Self(1)
        } else if value > 100 {
            Self(100)
        } else {
            Self(value)
        }
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub fn is_floor(self) -> bool {
        self == Self::MIN
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Lossy output format written by [`RustCodec`](super::RustCodec).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Baseline JPEG. Fast, universally readable, alpha is dropped.
    #[default]
    Jpeg,
    /// AVIF through rav1e at speed 6.
    Avif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Avif => "avif",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Avif => "avif",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "avif" => Ok(OutputFormat::Avif),
            other => Err(format!("unknown output format '{other}' (expected jpeg or avif)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_80() {
        assert_eq!(Quality::default().value(), 80);
    }

    #[test]
    fn quality_floor_detection() {
        assert!(Quality::new(1).is_floor());
        assert!(!Quality::new(2).is_floor());
    }

    #[test]
    fn output_format_parses_aliases() {
        assert_eq!("jpg".parse::<OutputFormat>(), Ok(OutputFormat::Jpeg));
        assert_eq!("JPEG".parse::<OutputFormat>(), Ok(OutputFormat::Jpeg));
        assert_eq!("avif".parse::<OutputFormat>(), Ok(OutputFormat::Avif));
        assert!("webp".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_extensions() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Avif.extension(), "avif");
    }
}
