//! Command-line interface for the topic embedding pipeline.

use crate::config::{Config, Variant};
use crate::encoder::bert::BertClsEncoder;
use crate::encoder::DeviceSpec;
use crate::model_loader::{ensure_model_files, ModelFiles};
use crate::pipeline;
use crate::writer::read_embeddings;
use clap::{ArgAction, Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "topic-embeddings",
    version,
    about = "Encode topic sets into BERT [CLS] embeddings"
)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Embed a topic set and write the JSON mapping
    Encode(EncodeArgs),
    /// Print topic count and dimension of an embeddings file
    Check {
        /// Embeddings JSON file
        path: PathBuf,
    },
    /// Cosine similarity between two topics of an embeddings file
    Similarity {
        /// Embeddings JSON file
        path: PathBuf,
        /// First topic key
        a: i64,
        /// Second topic key
        b: i64,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct EncodeArgs {
    /// TOML configuration file
    #[arg(long, env = "TOPIC_EMBEDDINGS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Historical preset: models (keys from 0) or query (keys from 1)
    #[arg(long)]
    pub variant: Option<Variant>,

    /// Topic set XML, overrides input.topics_path
    #[arg(long)]
    pub topics: Option<PathBuf>,

    /// Destination JSON, overrides output.embeddings_path
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// First key, overrides output.key_base
    #[arg(long)]
    pub key_base: Option<i64>,

    /// auto, cpu, cuda or cuda:N
    #[arg(long)]
    pub device: Option<DeviceSpec>,

    /// Local model directory, overrides model.model_dir
    #[arg(long)]
    pub model_dir: Option<PathBuf>,
}

impl EncodeArgs {
    /// Configuration file (or defaults) with command-line overrides applied.
    pub fn resolve(&self) -> crate::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(variant) = self.variant {
            config.apply_variant(variant);
        }
        if let Some(path) = &self.topics {
            config.input.topics_path = path.clone();
        }
        if let Some(path) = &self.output {
            config.output.embeddings_path = path.clone();
        }
        if let Some(base) = self.key_base {
            config.output.key_base = base;
        }
        if let Some(device) = self.device {
            config.model.device = device;
        }
        if let Some(dir) = &self.model_dir {
            config.model.model_dir = dir.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Install the tracing subscriber; `RUST_LOG` wins when no `-v` is given.
pub fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

/// Main entry point for the CLI.
pub fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Encode(args) => encode(&args),
        Command::Check { path } => {
            let embeddings = read_embeddings(&path)?;
            println!("File:       {}", path.display());
            println!("Topics:     {}", embeddings.len());
            println!("Dimension:  {}", embeddings.dim().unwrap_or(0));
            if let (Some(first), Some(last)) = (embeddings.keys().next(), embeddings.keys().last()) {
                println!("Keys:       {}..={}", first, last);
            }
            Ok(())
        }
        Command::Similarity { path, a, b } => {
            let embeddings = read_embeddings(&path)?;
            let score = embeddings.similarity(a, b)?;
            println!("{:.6}", score);
            Ok(())
        }
    }
}

fn encode(args: &EncodeArgs) -> Result<(), Box<dyn Error>> {
    let config = args.resolve()?;

    let files = ModelFiles::in_dir(&config.model.model_dir, &config.model.weights_file);
    ensure_model_files(&files, &config.model.repo_id, config.model.auto_download)?;

    let encoder = BertClsEncoder::new(&files, &config.model)?;
    let summary = pipeline::run(&config, &encoder)?;

    info!(output = %summary.output.display(), "done");
    println!("\n===================================================================");
    println!("  Topics embedded: {}", summary.topics);
    println!("  Dimension:       {}", summary.dimension);
    println!(
        "  Keys:            {}..{}",
        summary.key_base,
        summary.key_base + summary.topics as i64
    );
    println!("  Output:          {}", summary.output.display());
    println!("===================================================================\n");

    Ok(())
}
