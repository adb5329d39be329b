use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use facematch::{config, embedding, gallery_file, IdentityMatcher, Label, Metric, ModelInfo};
use log::info;

#[derive(Parser)]
#[command(name = "facematch")]
#[command(version, about = "Identify face embeddings against a labeled gallery")]
struct Cli {
    /// Config file (defaults to the system config path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct MatchArgs {
    /// JSON array of {"name", "embedding"} records
    #[arg(short, long)]
    gallery: PathBuf,
    /// JSON array holding the probe embedding
    #[arg(short, long)]
    probe: PathBuf,
    /// Similarity metric (cosine or l2)
    #[arg(short, long)]
    metric: Option<Metric>,
    /// Acceptance threshold in score space
    #[arg(short, long, allow_negative_numbers = true)]
    threshold: Option<f32>,
    /// Embedding size, overrides the model preset
    #[arg(short, long)]
    dim: Option<usize>,
    /// Standardize gallery and probe before matching
    #[arg(long)]
    standardize: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the identity of a probe embedding, or UNKNOWN
    Identify {
        #[command(flatten)]
        args: MatchArgs,
        /// Also print the per-subject mean scores
        #[arg(long)]
        scores: bool,
    },
    /// Print every subject's mean score, best first
    Rank {
        #[command(flatten)]
        args: MatchArgs,
    },
    /// Standardize a JSON vector to zero mean and unit variance
    Standardize {
        /// JSON array of numbers
        #[arg(short, long)]
        input: PathBuf,
    },
    /// List the embedding model presets
    Presets,
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Identify { args, scores } => identify(&cfg, &args, scores),
        Commands::Rank { args } => rank(&cfg, &args),
        Commands::Standardize { input } => standardize(&input),
        Commands::Presets => presets(),
        Commands::Config => open_config(cli.config.as_deref()),
    }
}

/// Merge CLI overrides into the file config.
fn effective_config(cfg: &config::Config, args: &MatchArgs) -> config::Config {
    config::Config {
        metric: args.metric.unwrap_or(cfg.metric),
        threshold: args.threshold.or(cfg.threshold),
        embedding_dim: args.dim.or(cfg.embedding_dim),
        standardize: args.standardize || cfg.standardize,
        ..cfg.clone()
    }
}

fn build(cfg: &config::Config, args: &MatchArgs) -> Result<(IdentityMatcher, Vec<f32>)> {
    let cfg = effective_config(cfg, args);
    let matcher_cfg = cfg.matcher_config();

    let records = gallery_file::load_records(&args.gallery)?;
    info!(
        "Loaded {} gallery sample(s) from {}",
        records.len(),
        args.gallery.display()
    );
    let gallery = gallery_file::build_gallery(records, matcher_cfg.embedding_dim, cfg.standardize)?;
    let matcher = IdentityMatcher::with_gallery(gallery, matcher_cfg.metric, matcher_cfg.threshold)
        .context("Failed to build identity matcher")?;

    let mut probe = gallery_file::load_vector(&args.probe)?;
    if cfg.standardize {
        embedding::standardize(&mut probe).context("Failed to standardize probe")?;
    }
    info!(
        "Matching with {} (threshold: {:.3}) across {} subject(s)",
        matcher.metric(),
        matcher.threshold(),
        matcher.gallery().subject_count()
    );
    Ok((matcher, probe))
}

fn identify(cfg: &config::Config, args: &MatchArgs, scores: bool) -> Result<()> {
    let (matcher, probe) = build(cfg, args)?;

    let ranked = matcher.rank(&probe)?;
    if scores {
        for s in &ranked {
            info!("{}: {:.4} ({} sample(s))", s.name, s.score, s.samples);
        }
    }

    let (label, score) = matcher.decide(&ranked);
    match (&label, score) {
        (Label::Known(name), Some(score)) => info!("✓ Matched {} with score {:.3}", name, score),
        (Label::Unknown, Some(score)) => info!("Best score {:.3} is below threshold", score),
        _ => info!("Gallery is empty"),
    }
    println!("{}", label);
    Ok(())
}

fn rank(cfg: &config::Config, args: &MatchArgs) -> Result<()> {
    let (matcher, probe) = build(cfg, args)?;
    for s in matcher.rank(&probe)? {
        println!("{}\t{:.6}\t{}", s.name, s.score, s.samples);
    }
    Ok(())
}

fn standardize(input: &Path) -> Result<()> {
    let mut values = gallery_file::load_vector(input)?;
    embedding::standardize(&mut values).context("Failed to standardize input")?;
    println!("{}", serde_json::to_string(&values)?);
    Ok(())
}

fn presets() -> Result<()> {
    for ModelInfo {
        name,
        output_dims,
        input_dims,
        cosine_threshold,
        l2_threshold,
    } in facematch_core::model::MODELS
    {
        println!(
            "{}: {} dims, {}px input, cosine >= {}, l2 distance <= {}",
            name, output_dims, input_dims, cosine_threshold, l2_threshold
        );
    }
    Ok(())
}

fn open_config(path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&config::CONFIG_PATH);
    if config::ensure_config(Some(path))? {
        info!("Wrote default config to {}", path.display());
    }
    let config_path = path.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
