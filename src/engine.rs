//! The budget search.
//!
//! [`compress_with`] decodes the input once, then walks a bounded grid of
//! (dimension, quality) points until an encoding fits the budget:
//!
//! ```text
//! decode ─▶ clamp long edge to max_dimension (once, only if larger)
//!        ─▶ quality pass: q0, 1+(q0-1)/2, … , 1   ── fits? ─▶ done
//!        ─▶ halve long edge (floor 64px) ─▶ quality pass again
//!        ─▶ … at the floor with no fit ─▶ BudgetUnsatisfiable(best effort)
//! ```
//!
//! Fallback resizes always resample from the clamped raster rather than the
//! previous fallback, so each step loses detail only once.
//!
//! The search is a pure function of the input bytes, the budget, and the
//! codec. Nothing is cached between calls and nothing global is read, so
//! calls can run concurrently on separate threads without coordination.

use crate::budget::CompressionBudget;
use crate::imaging::{
    CodecError, Dimensions, ImageCodec, MIN_DIMENSION, Quality, Raster, RustCodec,
    clamp_dimensions, fit_long_edge, next_fallback_edge, next_quality,
};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Invalid budget: {0}")]
    InvalidBudget(String),
    #[error("Failed to decode input: {0}")]
    Decode(#[source] CodecError),
    #[error("Encoder failed: {0}")]
    EncoderFailure(#[source] CodecError),
    #[error("Resizer failed: {0}")]
    ResizerFailure(#[source] CodecError),
    #[error(
        "No encoding fits {max_output_bytes} bytes (best effort: {} bytes at {} {})",
        .best_effort.len(),
        .best_effort.dimensions,
        .best_effort.quality
    )]
    BudgetUnsatisfiable {
        max_output_bytes: u64,
        best_effort: Box<EncodedImage>,
    },
}

impl CompressionError {
    /// The degraded result carried by [`CompressionError::BudgetUnsatisfiable`].
    ///
    /// Lets a caller decide to accept an over-budget encoding instead of
    /// rejecting the input outright.
    pub fn into_best_effort(self) -> Option<EncodedImage> {
        match self {
            CompressionError::BudgetUnsatisfiable { best_effort, .. } => Some(*best_effort),
            _ => None,
        }
    }
}

/// A single encode performed during a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub width: u32,
    pub height: u32,
    pub quality: u32,
    pub bytes: usize,
}

/// The result of a compression run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    /// Quality of the encode that produced `bytes`.
    pub quality: Quality,
    /// Raster size of the encode that produced `bytes`.
    pub dimensions: Dimensions,
    /// Every encode of the run, in order. The last one produced `bytes`
    /// unless this is a best-effort result.
    pub attempts: Vec<Attempt>,
}

impl EncodedImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn long_edge(&self) -> u32 {
        self.dimensions.long_edge()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}

/// One encoding kept while the search is still running.
struct Candidate {
    bytes: Vec<u8>,
    quality: Quality,
    dimensions: Dimensions,
}

impl Candidate {
    fn into_encoded(self, attempts: Vec<Attempt>) -> EncodedImage {
        EncodedImage {
            bytes: self.bytes,
            quality: self.quality,
            dimensions: self.dimensions,
            attempts,
        }
    }

    /// Keep the smaller of two candidates; ties go to `later`.
    fn smaller(earlier: Option<Candidate>, later: Candidate) -> Candidate {
        match earlier {
            Some(prev) if prev.bytes.len() < later.bytes.len() => prev,
            _ => later,
        }
    }
}

enum PassOutcome {
    Fits(Candidate),
    /// Quality floored without a fit; carries the pass's smallest encoding.
    Exhausted(Candidate),
}

/// Compress with the default [`RustCodec`] (JPEG output).
pub fn compress(input: &[u8], budget: CompressionBudget) -> Result<EncodedImage, CompressionError> {
    compress_with(&RustCodec::default(), input, budget)
}

/// Compress `input` until it fits `budget`, using `codec` for pixel work.
///
/// Returns the first encoding that fits, searching quality downward from
/// `budget.initial_quality()` and shrinking the long edge only when quality
/// alone cannot meet the byte ceiling. The output long edge never exceeds
/// `min(native long edge, budget.max_dimension())`.
///
/// Errors:
/// - [`CompressionError::Decode`] for empty or undecodable input, before any
///   resize or encode.
/// - [`CompressionError::EncoderFailure`] / [`CompressionError::ResizerFailure`]
///   verbatim from the codec, never retried.
/// - [`CompressionError::BudgetUnsatisfiable`] with the smallest encoding
///   produced when even the 64px floor at quality 1 is too large.
pub fn compress_with<C: ImageCodec>(
    codec: &C,
    input: &[u8],
    budget: CompressionBudget,
) -> Result<EncodedImage, CompressionError> {
    if input.is_empty() {
        return Err(CompressionError::Decode(CodecError::ProcessingFailed(
            "empty input".into(),
        )));
    }

    let decoded = codec.decode(input).map_err(CompressionError::Decode)?;
    let native = decoded.dimensions();
    debug!(%native, %budget, "decoded input");

    let source = match clamp_dimensions(native, budget.max_dimension()) {
        Some(target) => {
            debug!(from = %native, to = %target, "clamping to max dimension");
            codec
                .resize(&decoded, target)
                .map_err(CompressionError::ResizerFailure)?
        }
        None => decoded,
    };

    let mut attempts = Vec::new();
    let mut best: Option<Candidate> = None;
    let mut fallback: Option<C::Raster> = None;

    loop {
        let raster = fallback.as_ref().unwrap_or(&source);
        let current = raster.dimensions();

        match quality_pass(codec, raster, budget, &mut attempts)? {
            PassOutcome::Fits(found) => {
                debug!(
                    dims = %found.dimensions,
                    quality = found.quality.value(),
                    bytes = found.bytes.len(),
                    attempts = attempts.len(),
                    "budget met"
                );
                return Ok(found.into_encoded(attempts));
            }
            PassOutcome::Exhausted(smallest) => {
                let smallest = Candidate::smaller(best.take(), smallest);
                let Some(edge) = next_fallback_edge(current.long_edge(), MIN_DIMENSION) else {
                    debug!(
                        bytes = smallest.bytes.len(),
                        attempts = attempts.len(),
                        "dimension floor reached without meeting budget"
                    );
                    return Err(CompressionError::BudgetUnsatisfiable {
                        max_output_bytes: budget.max_output_bytes(),
                        best_effort: Box::new(smallest.into_encoded(attempts)),
                    });
                };
                best = Some(smallest);

                let target = fit_long_edge(source.dimensions(), edge);
                debug!(from = %current, to = %target, "quality floored, shrinking");
                fallback = Some(
                    codec
                        .resize(&source, target)
                        .map_err(CompressionError::ResizerFailure)?,
                );
            }
        }
    }
}

/// Encode `raster` at decreasing qualities until one fits or quality floors.
fn quality_pass<C: ImageCodec>(
    codec: &C,
    raster: &C::Raster,
    budget: CompressionBudget,
    attempts: &mut Vec<Attempt>,
) -> Result<PassOutcome, CompressionError> {
    let dimensions = raster.dimensions();
    let mut quality = budget.initial_quality();
    let mut smallest: Option<Candidate> = None;

    loop {
        let bytes = codec
            .encode(raster, quality)
            .map_err(CompressionError::EncoderFailure)?;
        let fits = budget.fits(bytes.len());
        attempts.push(Attempt {
            width: dimensions.width,
            height: dimensions.height,
            quality: quality.value(),
            bytes: bytes.len(),
        });
        debug!(
            dims = %dimensions,
            quality = quality.value(),
            bytes = bytes.len(),
            fits,
            "encode attempt"
        );

        let candidate = Candidate {
            bytes,
            quality,
            dimensions,
        };
        if fits {
            return Ok(PassOutcome::Fits(candidate));
        }
        let candidate = Candidate::smaller(smallest.take(), candidate);

        match next_quality(quality) {
            Some(next) => {
                quality = next;
                smallest = Some(candidate);
            }
            None => return Ok(PassOutcome::Exhausted(candidate)),
        }
    }
}
