//! # imgbudget
//!
//! Compress images until they fit a byte budget.
//!
//! A [`CompressionBudget`] names three limits: the largest acceptable output
//! in bytes, the longest allowed edge in pixels, and the lossy quality to
//! start from. [`compress`] decodes an image once and searches a bounded grid
//! of qualities and dimensions for the first encoding that fits:
//!
//! ```text
//! input bytes ─▶ decode ─▶ clamp to max_dimension
//!             ─▶ try quality 80, 40, 20, … 1        (first fit wins)
//!             ─▶ halve the long edge (not below 64px), try again
//!             ─▶ nothing fits: BudgetUnsatisfiable + smallest encoding found
//! ```
//!
//! The search never returns a result over budget, never upscales, and always
//! terminates: for an initial quality `q` and a clamped long edge `L ≥ 64` it
//! performs at most `(⌈log2 q⌉ + 1) × (⌈log2(L/64)⌉ + 1)` encodes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`budget`] | `CompressionBudget` validation and the named presets |
//! | [`engine`] | The search itself: `compress`, `compress_with`, `EncodedImage`, errors |
//! | [`imaging`] | Codec trait, the pure-Rust `image` codec, quality/dimension arithmetic |
//! | [`batch`] | Parallel compression of files on disk with per-file outcomes |
//! | [`cache`] | Content-addressed result cache used by `batch` |
//! | [`config`] | `imgbudget.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Injected Codecs
//!
//! The engine only talks to the [`imaging::ImageCodec`] trait. Production code
//! uses [`imaging::RustCodec`] (the `image` crate, Lanczos3 resampling, JPEG or
//! AVIF output); tests use a recording mock so the search policy can be
//! checked call by call without encoding a single pixel.
//!
//! ## Stateless Engine
//!
//! [`compress`] reads nothing but its arguments and keeps nothing between
//! calls. Caching and parallelism belong to the [`batch`] driver, which runs
//! independent files on a rayon pool and skips files whose result is already
//! on disk.
//!
//! ## Best Effort Travels With the Error
//!
//! When no encoding fits, the error carries the smallest encoding the search
//! produced. A caller that can live with an oversize image recovers it with
//! [`CompressionError::into_best_effort`]; one that cannot simply propagates
//! the error.

pub mod batch;
pub mod budget;
pub mod cache;
pub mod config;
pub mod engine;
pub mod imaging;
pub mod output;

pub use budget::{CompressionBudget, Preset};
pub use engine::{Attempt, CompressionError, EncodedImage, compress, compress_with};
pub use imaging::{OutputFormat, Quality};

#[cfg(test)]
pub(crate) mod test_helpers;
