//! Batch compression of files on disk.
//!
//! The host side of the engine: reads each input file, consults the result
//! cache, runs [`compress_with`](crate::engine::compress_with) and writes the
//! result into an output directory. Every input is an independent engine call,
//! so files are compressed in parallel with [rayon](https://docs.rs/rayon);
//! a single search is never split across threads.
//!
//! ## Output naming
//!
//! Each input becomes `<stem>.<ext>` in the output directory, where `<ext>`
//! follows the output format. Inputs sharing a stem get `-2`, `-3`, … in
//! input order, so names are stable across runs.
//!
//! ## Per-file outcomes
//!
//! A failing file never aborts the batch. Each file ends in one of the
//! [`FileStatus`] states and is reported individually; only I/O on the
//! output directory itself is fatal.
//!
//! ## Cache reuse
//!
//! A cached result is copied only from a file this batch does not write.
//! If its file is another input's planned output, the result is treated as
//! a miss: that file may be rewritten while the copy runs. Every write,
//! degraded or not, evicts whatever the cache held for that file.

use crate::budget::CompressionBudget;
use crate::cache::{CacheKey, CacheStats, CachedResult, ResultCache, hash_bytes};
use crate::engine::{Attempt, CompressionError, EncodedImage, compress_with};
use crate::imaging::{ImageCodec, OutputFormat, RustCodec};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a batch should compress its inputs.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub budget: CompressionBudget,
    pub format: OutputFormat,
    /// Write best-effort results when the budget cannot be met.
    pub accept_degraded: bool,
    /// Consult and update the result cache.
    pub use_cache: bool,
}

/// Progress events emitted while a batch runs.
///
/// Sent over an optional channel so a printer thread can report files as
/// they finish without the batch owning stdout.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    /// `index` is the 1-based position of the file among the inputs.
    FileFinished {
        index: usize,
        report: FileReport,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Searched and written this run.
    Compressed,
    /// Identical result already on disk at the expected path.
    Cached,
    /// Identical result on disk under another name, copied over.
    Copied,
    /// Budget unsatisfiable; best effort written because degraded results are accepted.
    Degraded,
    /// Nothing written.
    Failed,
}

/// What happened to one input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub source: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<Attempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    fn new(source: &Path, status: FileStatus) -> Self {
        Self {
            source: source.display().to_string(),
            status,
            output: None,
            input_bytes: None,
            output_bytes: None,
            width: None,
            height: None,
            quality: None,
            attempts: Vec::new(),
            error: None,
        }
    }

    fn failed(source: &Path, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(source, FileStatus::Failed)
        }
    }

    fn written(
        source: &Path,
        status: FileStatus,
        output: &str,
        input_bytes: u64,
        encoded: EncodedImage,
    ) -> Self {
        Self {
            output: Some(output.to_string()),
            input_bytes: Some(input_bytes),
            output_bytes: Some(encoded.len() as u64),
            width: Some(encoded.dimensions.width),
            height: Some(encoded.dimensions.height),
            quality: Some(encoded.quality.value()),
            attempts: encoded.attempts,
            ..Self::new(source, status)
        }
    }

    fn from_cache(
        source: &Path,
        status: FileStatus,
        output: &str,
        input_bytes: u64,
        cached: &CachedResult,
    ) -> Self {
        Self {
            output: Some(output.to_string()),
            input_bytes: Some(input_bytes),
            output_bytes: Some(cached.bytes),
            width: Some(cached.width),
            height: Some(cached.height),
            quality: Some(cached.quality),
            ..Self::new(source, status)
        }
    }
}

/// Budget as recorded in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetSummary {
    pub max_output_bytes: u64,
    pub max_dimension: u32,
    pub initial_quality: u32,
}

impl From<CompressionBudget> for BudgetSummary {
    fn from(budget: CompressionBudget) -> Self {
        Self {
            max_output_bytes: budget.max_output_bytes(),
            max_dimension: budget.max_dimension(),
            initial_quality: budget.initial_quality().value(),
        }
    }
}

/// Machine-readable summary of a batch, written by `--report`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub budget: BudgetSummary,
    pub format: OutputFormat,
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(FileStatus::Failed) > 0
    }
}

#[derive(Debug)]
pub struct BatchResult {
    pub report: BatchReport,
    pub cache_stats: CacheStats,
}

/// Compress `inputs` into `output_dir` with the pure-Rust codec.
pub fn compress_files(
    inputs: &[PathBuf],
    output_dir: &Path,
    options: &BatchOptions,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchResult, BatchError> {
    let codec = RustCodec::new(options.format);
    compress_files_with(&codec, inputs, output_dir, options, events)
}

/// Compress `inputs` using a specific codec (allows testing with a mock).
pub fn compress_files_with(
    codec: &impl ImageCodec,
    inputs: &[PathBuf],
    output_dir: &Path,
    options: &BatchOptions,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchResult, BatchError> {
    std::fs::create_dir_all(output_dir)?;

    let cache = if options.use_cache {
        ResultCache::open(output_dir)
    } else {
        ResultCache::default()
    };
    let names = plan_output_names(inputs, options.format);

    if let Some(tx) = &events {
        tx.send(BatchEvent::Started {
            total: inputs.len(),
        })
        .ok();
    }

    let job = Job {
        output_dir,
        options,
        cache: &cache,
        planned: names.iter().map(String::as_str).collect(),
    };

    let outcomes: Vec<Outcome> = inputs
        .par_iter()
        .zip(names.par_iter())
        .enumerate()
        .map_with(events, |tx, (i, (input, name))| {
            let outcome = job.run(codec, input, name);
            if let Some(tx) = tx {
                tx.send(BatchEvent::FileFinished {
                    index: i + 1,
                    report: outcome.report.clone(),
                })
                .ok();
            }
            outcome
        })
        .collect();

    let mut cache = cache;
    let mut cache_stats = CacheStats::default();
    let mut files = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome.report.status {
            FileStatus::Cached => cache_stats.hits += 1,
            FileStatus::Copied => cache_stats.copies += 1,
            FileStatus::Compressed | FileStatus::Degraded => cache_stats.misses += 1,
            FileStatus::Failed => {}
        }
        match outcome.cache {
            CacheUpdate::Keep => {}
            CacheUpdate::Record(key, result) => cache.record(&key, result),
            CacheUpdate::Evict(output) => cache.evict_output(&output),
        }
        files.push(outcome.report);
    }

    if options.use_cache {
        cache.persist(output_dir)?;
    }

    Ok(BatchResult {
        report: BatchReport {
            budget: options.budget.into(),
            format: options.format,
            files,
        },
        cache_stats,
    })
}

/// Write the report as pretty-printed JSON.
pub fn write_report(report: &BatchReport, path: &Path) -> Result<(), BatchError> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Output file names, one per input, unique within the batch.
pub fn plan_output_names(inputs: &[PathBuf], format: OutputFormat) -> Vec<String> {
    let mut seen: HashMap<String, u32> = HashMap::new();
    inputs
        .iter()
        .map(|input| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let count = seen.entry(stem.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                format!("{}.{}", stem, format.extension())
            } else {
                format!("{}-{}.{}", stem, count, format.extension())
            }
        })
        .collect()
}

/// Shared, read-only state for one batch run.
struct Job<'a> {
    output_dir: &'a Path,
    options: &'a BatchOptions,
    cache: &'a ResultCache,
    /// Every output name written by this batch.
    planned: HashSet<&'a str>,
}

struct Outcome {
    report: FileReport,
    /// Applied once the parallel phase ends.
    cache: CacheUpdate,
}

enum CacheUpdate {
    Keep,
    Record(CacheKey, CachedResult),
    /// The file was overwritten with something the cache must not serve.
    Evict(String),
}

impl Outcome {
    fn failed(input: &Path, error: impl ToString) -> Self {
        Self {
            report: FileReport::failed(input, error.to_string()),
            cache: CacheUpdate::Keep,
        }
    }
}

impl Job<'_> {
    fn run(&self, codec: &impl ImageCodec, input: &Path, name: &str) -> Outcome {
        let bytes = match std::fs::read(input) {
            Ok(b) => b,
            Err(e) => {
                warn!(source = %input.display(), error = %e, "cannot read input");
                return Outcome::failed(input, e);
            }
        };
        let input_bytes = bytes.len() as u64;
        let key = CacheKey::new(&bytes, &self.options.budget, self.options.format);

        if self.options.use_cache
            && let Some(cached) = self.cache.lookup(&key, self.output_dir)
        {
            if cached.output == name || !self.planned.contains(cached.output.as_str()) {
                return self.reuse(input, name, input_bytes, key, cached);
            }
            debug!(
                source = %input.display(),
                from = %cached.output,
                "cached result is rewritten by this batch, compressing"
            );
        }

        match compress_with(codec, &bytes, self.options.budget) {
            Ok(encoded) => self.write(
                input,
                name,
                FileStatus::Compressed,
                input_bytes,
                encoded,
                Some(key),
            ),
            Err(err @ CompressionError::BudgetUnsatisfiable { .. })
                if self.options.accept_degraded =>
            {
                warn!(source = %input.display(), error = %err, "writing degraded result");
                match err.into_best_effort() {
                    Some(best) => {
                        self.write(input, name, FileStatus::Degraded, input_bytes, best, None)
                    }
                    None => Outcome::failed(input, "missing best effort"),
                }
            }
            Err(err) => {
                warn!(source = %input.display(), error = %err, "compression failed");
                Outcome::failed(input, err)
            }
        }
    }

    fn write(
        &self,
        input: &Path,
        name: &str,
        status: FileStatus,
        input_bytes: u64,
        encoded: EncodedImage,
        key: Option<CacheKey>,
    ) -> Outcome {
        if let Err(e) = std::fs::write(self.output_dir.join(name), &encoded.bytes) {
            warn!(output = name, error = %e, "cannot write output");
            return Outcome {
                cache: CacheUpdate::Evict(name.to_string()),
                ..Outcome::failed(input, e)
            };
        }
        info!(
            source = %input.display(),
            output = name,
            bytes = encoded.len(),
            quality = encoded.quality.value(),
            dims = %encoded.dimensions,
            attempts = encoded.attempt_count(),
            "compressed"
        );
        // Degraded results are not cached.
        let cache = match key {
            Some(key) => CacheUpdate::Record(
                key,
                CachedResult {
                    output: name.to_string(),
                    bytes: encoded.len() as u64,
                    width: encoded.dimensions.width,
                    height: encoded.dimensions.height,
                    quality: encoded.quality.value(),
                    sha256: hash_bytes(&encoded.bytes),
                },
            ),
            None => CacheUpdate::Evict(name.to_string()),
        };
        Outcome {
            report: FileReport::written(input, status, name, input_bytes, encoded),
            cache,
        }
    }

    fn reuse(
        &self,
        input: &Path,
        name: &str,
        input_bytes: u64,
        key: CacheKey,
        cached: &CachedResult,
    ) -> Outcome {
        let status = if cached.output == name {
            FileStatus::Cached
        } else if let Err(e) =
            std::fs::copy(self.output_dir.join(&cached.output), self.output_dir.join(name))
        {
            return Outcome::failed(input, e);
        } else {
            FileStatus::Copied
        };
        info!(source = %input.display(), output = name, from = %cached.output, "reused cached result");
        Outcome {
            report: FileReport::from_cache(input, status, name, input_bytes, cached),
            cache: CacheUpdate::Record(
                key,
                CachedResult {
                    output: name.to_string(),
                    ..cached.clone()
                },
            ),
        }
    }
}
