//! maccnet: multiscale accumulator network generator.
//!
//! maccnet reads a compact description of a convolutional network and
//! writes the Caffe `train_val` and `deploy` network definitions for it,
//! computing the field of view of every convolution on the way and sizing
//! the accumulator heads attached at the requested downsampling scales.
//!
//! # Modules
//!
//! - [`config`]: Network description parsing and layer directives
//! - [`fov`]: Field-of-view and padding propagation
//! - [`compiler`]: Emission passes and document assembly
//! - [`prototxt`]: Structured prototxt documents and their rendering
//! - [`summary`]: Run summary (text and JSON)
//! - [`error`]: Error types for maccnet operations

pub mod compiler;
pub mod config;
pub mod error;
pub mod fov;
pub mod prototxt;
pub mod summary;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use compiler::{CompileOptions, DataLayerSettings};
pub use config::BbType;
pub use error::MaccError;
pub use summary::GenerationSummary;

/// The maccnet CLI application.
#[derive(Parser)]
#[command(name = "maccnet")]
#[command(version, author, about)]
#[command(
    long_about = "Generate train_val and deploy PROTOTXT files of Caffe networks with multiscale accumulators."
)]
struct Cli {
    /// A configuration TXT file with the network structure.
    path_config: PathBuf,

    /// Path to the output folder.
    path_out: PathBuf,

    /// Type of data and loss layers.
    #[arg(value_enum)]
    bb_type: BbTypeArg,

    /// Batch size of the training data layer.
    #[arg(long, default_value_t = 16)]
    batch_size: u64,

    /// Network input width in pixels.
    #[arg(long, default_value_t = 256)]
    width: u64,

    /// Network input height in pixels.
    #[arg(long, default_value_t = 128)]
    height: u64,

    /// Smallest reference object size of the training data layer.
    #[arg(long, default_value_t = 60)]
    reference_size_min: u64,

    /// Largest reference object size of the training data layer.
    #[arg(long, default_value_t = 120)]
    reference_size_max: u64,

    /// Output format for the run summary.
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    output: SummaryFormat,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, env = "MACCNET_LOG", default_value = "warn")]
    log_level: String,
}

/// Data/loss layer flavor as accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BbTypeArg {
    Bbtxt,
    Bb3txt,
}

impl From<BbTypeArg> for BbType {
    fn from(arg: BbTypeArg) -> Self {
        match arg {
            BbTypeArg::Bbtxt => BbType::Bbtxt,
            BbTypeArg::Bb3txt => BbType::Bb3txt,
        }
    }
}

/// Rendering of the run summary on stdout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
}

/// Run the maccnet CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), MaccError> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let opts = CompileOptions {
        bb_type: cli.bb_type.into(),
        data: DataLayerSettings {
            batch_size: cli.batch_size,
            width: cli.width,
            height: cli.height,
            reference_size_min: cli.reference_size_min,
            reference_size_max: cli.reference_size_max,
        },
    };

    let summary = generate_prototxt_files(&cli.path_config, &cli.path_out, &opts)?;

    match cli.output {
        SummaryFormat::Json => println!("{}", summary.to_json()?),
        SummaryFormat::Text => print!("{}", summary),
    }

    Ok(())
}

/// Compile the network described in `path_config` and write both
/// definitions into `path_out`.
///
/// Both documents are compiled before anything is written, so a failing
/// directive leaves no output behind.
pub fn generate_prototxt_files(
    path_config: &Path,
    path_out: &Path,
    opts: &CompileOptions,
) -> Result<GenerationSummary, MaccError> {
    let config = config::read_config(path_config)?;
    info!(
        network = %config.name,
        radius = config.radius,
        circle_ratio = config.circle_ratio,
        directives = config.lines.len(),
        "read network description"
    );

    let (train_val, deploy) = compiler::compile_pair(&config, opts)?;

    fs::create_dir_all(path_out).map_err(MaccError::Io)?;
    let (train_val_path, deploy_path) = compiler::output_paths(path_out, &config.name);

    fs::write(&train_val_path, train_val.document.to_string()).map_err(MaccError::Io)?;
    info!(path = %train_val_path.display(), "wrote train_val network");

    fs::write(&deploy_path, deploy.document.to_string()).map_err(MaccError::Io)?;
    info!(path = %deploy_path.display(), "wrote deploy network");

    Ok(GenerationSummary::new(
        &config,
        opts,
        &deploy,
        train_val_path,
        deploy_path,
    ))
}

/// Install the stderr log subscriber. `RUST_LOG` takes precedence over
/// `default_level`.
fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
