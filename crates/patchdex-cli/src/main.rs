#![deny(unsafe_code)]

//! patchdex CLI: rebuild the installed-item index from a mods folder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use patchdex_config::AppConfig;
use patchdex_core::{ItemIndexer, RebuildKind, RebuildOutcome, RebuildScheduler, build_info};

/// patchdex: index the items added by installed content packages.
#[derive(Parser)]
#[command(name = "patchdex", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "patchdex.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one index rebuild pass.
    Rebuild {
        /// Behave like an automatic trigger: a missing package root is not an error.
        #[arg(long)]
        auto: bool,

        /// Override the package root directory.
        #[arg(long)]
        root: Option<PathBuf>,

        /// Override the index output path.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },

    /// Print build information.
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    let fallback = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Rebuild { auto, root, output } => {
            let config = apply_overrides(config, root, output)?;
            cmd_rebuild(config, auto).await?;
        }
        Commands::Config { show } => cmd_config(&cli.config, &config, show)?,
        Commands::Info => println!("patchdex {}", build_info::version_string()),
    }

    Ok(())
}

fn apply_overrides(
    mut config: AppConfig,
    root: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<AppConfig> {
    if let Some(root) = root {
        config.index.root_dir = root;
    }
    if let Some(output) = output {
        config.index.output_path = output;
    }
    config.validate()?;
    Ok(config)
}

async fn cmd_rebuild(config: AppConfig, auto: bool) -> Result<()> {
    let indexer = ItemIndexer::from_config(&config).context("failed to prepare indexer")?;
    let scheduler = RebuildScheduler::new(Arc::new(indexer), &config.scheduler);
    let kind = if auto {
        RebuildKind::Auto
    } else {
        RebuildKind::Manual
    };

    let outcome = scheduler.request(kind).await;
    scheduler.wait_idle().await;

    match outcome {
        RebuildOutcome::Completed(report) => {
            let status = if report.written {
                "written"
            } else {
                "unchanged"
            };
            println!(
                "Indexed {} items from {} packages ({status}): {}",
                report.entries,
                report.packages,
                config.index.output_path.display()
            );
            if !auto {
                for warning in &report.warnings {
                    eprintln!("warning: {warning}");
                }
            }
        }
        RebuildOutcome::Failed(message) if !auto => bail!("rebuild failed: {message}"),
        RebuildOutcome::Failed(_) => info!("Automatic rebuild did not complete"),
        RebuildOutcome::Coalesced | RebuildOutcome::Throttled => {
            info!(?outcome, "Rebuild request not run");
        }
    }
    Ok(())
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to render config")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

async fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        AppConfig::load(path)
            .await
            .with_context(|| format!("invalid config '{}'", path.display()))
    } else {
        Ok(AppConfig::default())
    }
}
