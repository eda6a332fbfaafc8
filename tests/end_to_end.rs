//! Real images through the pure-Rust codec and the batch driver.
//!
//! Images are generated in memory and kept small so the suite stays fast in
//! debug builds.

mod common;

use common::{dimensions_of, gradient, noise_png};
use image::ImageFormat;
use imgbudget::batch::{self, BatchOptions, FileStatus};
use imgbudget::imaging::RustCodec;
use imgbudget::{CompressionBudget, CompressionError, OutputFormat, compress, compress_with};
use std::fs;
use tempfile::TempDir;

fn budget(max_bytes: u64, max_dim: u32, quality: u32) -> CompressionBudget {
    CompressionBudget::new(max_bytes, max_dim, quality).unwrap()
}

#[test]
fn gradient_png_is_clamped_to_valid_jpeg() {
    let input = gradient(640, 480, ImageFormat::Png);
    let result = compress(&input, budget(1_000_000, 320, 80)).unwrap();

    assert_eq!(dimensions_of(&result.bytes), (320, 240));
    assert_eq!(&result.bytes[..2], &[0xFF, 0xD8]);
    assert_eq!(result.quality.value(), 80);
    assert_eq!(result.attempt_count(), 1);
}

#[test]
fn every_supported_input_format_decodes() {
    for format in [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Tiff,
        ImageFormat::WebP,
    ] {
        let input = gradient(96, 64, format);
        let result = compress(&input, CompressionBudget::GENERIC)
            .unwrap_or_else(|e| panic!("{format:?}: {e}"));
        assert_eq!(dimensions_of(&result.bytes), (96, 64));
    }
}

#[test]
fn tight_budget_lowers_quality() {
    let input = noise_png(128, 128, 7);
    let generous = compress(&input, budget(1_000_000, 1024, 90)).unwrap();
    let tight_bytes = generous.len() as u64 / 2;
    let tight = compress(&input, budget(tight_bytes, 1024, 90)).unwrap();

    assert!(tight.len() as u64 <= tight_bytes);
    assert!(tight.quality < generous.quality || tight.long_edge() < generous.long_edge());
}

#[test]
fn noise_under_tiny_budget_is_unsatisfiable() {
    let input = noise_png(256, 256, 42);
    let err = compress(&input, budget(200, 256, 80)).unwrap_err();

    assert!(err.to_string().contains("200 bytes"));
    let best = err.into_best_effort().unwrap();
    assert_eq!(best.long_edge(), 64);
    assert_eq!(best.quality.value(), 1);
    assert_eq!(dimensions_of(&best.bytes), (64, 64));
    // 256, 128 and 64px passes of 8 qualities each
    assert_eq!(best.attempt_count(), 24);
}

#[test]
fn garbage_bytes_fail_to_decode() {
    let err = compress(b"\x89PNG\r\n\x1a\n\0\0\0\x0dIHDR", CompressionBudget::GENERIC).unwrap_err();
    assert!(matches!(err, CompressionError::Decode(_)));
}

#[test]
fn compression_is_deterministic() {
    let input = noise_png(200, 150, 3);
    let b = budget(8_000, 160, 80);
    let first = compress(&input, b).unwrap();
    let second = compress(&input, b).unwrap();
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(first.attempts, second.attempts);
}

#[test]
fn recompressing_output_keeps_it() {
    let b = budget(500_000, 400, 80);
    let first = compress(&gradient(800, 600, ImageFormat::Png), b).unwrap();
    let again = compress(&first.bytes, b).unwrap();

    assert_eq!(again.attempt_count(), 1);
    assert_eq!(again.quality, b.initial_quality());
    assert_eq!(again.dimensions, first.dimensions);
    assert!(again.len() as u64 <= 500_000);
}

#[test]
fn avif_output_is_an_isobmff_file() {
    let codec = RustCodec::new(OutputFormat::Avif);
    let result = compress_with(&codec, &gradient(128, 96, ImageFormat::Png), budget(100_000, 128, 60))
        .unwrap();
    assert_eq!(&result.bytes[4..8], b"ftyp");
}

#[test]
fn batch_writes_outputs_report_and_cache() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let a = src.path().join("sunset.png");
    let b = src.path().join("broken.png");
    fs::write(&a, gradient(600, 400, ImageFormat::Png)).unwrap();
    fs::write(&b, b"not an image").unwrap();
    let inputs = vec![a, b];

    let options = BatchOptions {
        budget: budget(200_000, 300, 80),
        format: OutputFormat::Jpeg,
        accept_degraded: false,
        use_cache: true,
    };
    let first = batch::compress_files(&inputs, out.path(), &options, None).unwrap();

    assert_eq!(first.report.files[0].status, FileStatus::Compressed);
    assert_eq!(first.report.files[1].status, FileStatus::Failed);
    assert_eq!(
        dimensions_of(&fs::read(out.path().join("sunset.jpg")).unwrap()),
        (300, 200)
    );

    let report_path = out.path().join("report.json");
    batch::write_report(&first.report, &report_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["files"][0]["width"], 300);
    assert_eq!(json["files"][1]["status"], "failed");

    let second = batch::compress_files(&inputs, out.path(), &options, None).unwrap();
    assert_eq!(second.report.files[0].status, FileStatus::Cached);
    assert_eq!(second.cache_stats.hits, 1);
}
