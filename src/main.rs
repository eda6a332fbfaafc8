use clap::{Parser, Subcommand};
use imgbudget::batch::{self, BatchOptions};
use imgbudget::config::{self, Config, Overrides};
use imgbudget::imaging::supported_input_formats;
use imgbudget::{OutputFormat, Preset, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (`tracing_subscriber` syntax).
const LOG_ENV: &str = "IMGBUDGET_LOG";

fn version_string() -> &'static str {
    let on_tag = env!("IMGBUDGET_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("IMGBUDGET_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "imgbudget")]
#[command(about = "Compress images to fit a byte budget")]
#[command(long_about = "\
Compress images to fit a byte budget

Each image is decoded once, scaled down to the budget's maximum dimension,
then re-encoded at decreasing quality until it fits. If even the lowest
quality is too large, the long edge is halved (never below 64px) and the
quality search starts over.

Budgets come from a preset, optionally overridden field by field:

  generic        1 MiB,   2048px long edge, quality 80
  profile-photo  256 KiB,  512px long edge, quality 85
  chat-image     500 KiB, 1280px long edge, quality 75

Settings are read from imgbudget.toml when present; flags override it.
Run 'imgbudget gen-config' to generate a documented config file.

Logging goes to stderr and is controlled by IMGBUDGET_LOG
(e.g. IMGBUDGET_LOG=debug shows every encode attempt).")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override the budget and output sections of the config.
#[derive(clap::Args, Clone)]
struct BudgetArgs {
    /// Budget preset (generic, profile-photo, chat-image)
    #[arg(long)]
    preset: Option<Preset>,

    /// Maximum output size in bytes
    #[arg(long)]
    max_bytes: Option<u64>,

    /// Maximum long edge in pixels
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Starting quality (1-100)
    #[arg(long)]
    quality: Option<u32>,

    /// Output format (jpeg, avif)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Write the smallest encoding found when nothing fits the budget
    #[arg(long)]
    accept_degraded: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compress images into an output directory
    Compress {
        /// Input images (JPEG, PNG, TIFF, WebP)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        #[command(flatten)]
        budget: BudgetArgs,

        /// Disable the result cache, force re-compression of all files
        #[arg(long)]
        no_cache: bool,

        /// Write a JSON report of every file and attempt
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// List the built-in budget presets
    Presets,
    /// Print a stock imgbudget.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Command::Compress {
            files,
            out,
            budget,
            no_cache,
            report,
        } => {
            let config = Config::load_with(&cli.config, &budget.overrides())?;
            let options = BatchOptions {
                budget: config.budget.resolve()?,
                format: config.output.format,
                accept_degraded: config.output.accept_degraded,
                use_cache: !no_cache,
            };
            tracing::debug!(
                budget = %options.budget,
                format = options.format.name(),
                inputs = ?supported_input_formats(),
                "starting batch"
            );
            init_thread_pool(&config.processing);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = batch::compress_files(&files, &out, &options, Some(tx))?;
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            output::print_summary(&result.report, &result.cache_stats);
            if let Some(path) = report {
                batch::write_report(&result.report, &path)?;
            }
            if result.report.has_failures() {
                return Err(format!(
                    "{} of {} files failed",
                    result.report.count(batch::FileStatus::Failed),
                    result.report.files.len()
                )
                .into());
            }
        }
        Command::Presets => {
            output::print_presets();
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

impl BudgetArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            preset: self.preset,
            max_output_bytes: self.max_bytes,
            max_dimension: self.max_dimension,
            initial_quality: self.quality,
            format: self.format,
            accept_degraded: self.accept_degraded,
        }
    }
}

/// Log to stderr; stdout carries the progress report.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Size the global rayon pool from `[processing]`.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    rayon::ThreadPoolBuilder::new()
        .num_threads(processing.threads())
        .build_global()
        .ok();
}
