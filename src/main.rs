//! `esg-reportr`: score organizations for environmental risk and publish per-company reports.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and load the config ([`config::load_config`]).
//! 2. `score`: load the organization dataset ([`dataset`]), the biodiversity trends
//!    ([`trends`]) and the four models ([`model::ModelRegistry`]; any failure is fatal).
//! 3. Fetch both index rasters once ([`imagery`]) and normalize them into the run's
//!    [`scorer::ImagerySnapshot`], zero-filling what is unavailable.
//! 4. Score every organization on a bounded pool ([`batch`]); failures are isolated.
//! 5. Rewrite the record store atomically ([`store`]) and print the summary ([`report`]).
//! 6. `render` / `generate` / `fetch` / `bundle` work from the store through
//!    [`service::ArtifactService`]; `land-use` exports rule-based recommendations ([`landuse`]).

mod batch;
mod cli;
mod config;
mod dataset;
mod error;
mod imagery;
mod landuse;
mod model;
mod models;
mod normalize;
mod report;
mod scorer;
mod service;
mod store;
mod trends;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command, OutputFormat};
use config::{load_config, Config};
use error::ErrorBody;
use model::ModelRegistry;
use scorer::{ImagerySnapshot, Scorer};
use service::ArtifactService;
use trends::TrendDataset;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = load_config(&cwd, cli.config.as_deref())?;

    let fallback = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        config.log_level.as_str()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .init();

    let service = ArtifactService::new(&config.paths.reports_dir, &config.paths.record_store);

    match cli.command {
        Command::Score { format, workers, render } => {
            let workers = workers.unwrap_or_else(|| config.batch.effective_workers());
            let outcome = score(&config, workers, cli.quiet).await?;

            outcome
                .store
                .save(&config.paths.record_store)
                .context("Failed to write record store")?;

            match format {
                OutputFormat::Terminal => report::terminal::render(
                    &outcome,
                    &config.paths.record_store,
                    cli.verbose,
                    cli.quiet,
                ),
                OutputFormat::Json => {
                    let failures: Vec<serde_json::Value> = outcome
                        .failures
                        .iter()
                        .map(|f| serde_json::json!({ "company": f.company, "error": f.error.to_string() }))
                        .collect();
                    let summary = serde_json::json!({
                        "record_store": config.paths.record_store,
                        "profiles": outcome.store,
                        "failures": failures,
                    });
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
            }

            if render {
                generate(&service, "tnfd", cli.quiet);
            }
        }

        Command::Render => {
            let summary = match service.render() {
                Ok(summary) => summary,
                Err(e) => fail(&e),
            };
            if !cli.quiet {
                for path in &summary.rendered {
                    eprintln!("  {} {}", "✓".green(), path.display());
                }
                for (company, reason) in &summary.failed {
                    eprintln!("  {} {}: {}", "✗".red(), company, reason);
                }
            }
            println!(
                "Rendered: {}  Failed: {}",
                summary.rendered.len().to_string().green(),
                summary.failed.len().to_string().red(),
            );
            if summary.rendered.is_empty() && !summary.failed.is_empty() {
                std::process::exit(1);
            }
        }

        Command::Generate { report_type } => generate(&service, &report_type, cli.quiet),

        Command::Fetch { company, output } => match service.fetch_document(&company) {
            Ok(doc) => {
                let dest = output.unwrap_or_else(|| PathBuf::from(&doc.filename));
                write_artifact(&dest, &doc.bytes, cli.quiet)?;
            }
            Err(e) => fail(&e),
        },

        Command::Bundle { output } => match service.fetch_bundle() {
            Ok(bundle) => {
                let dest = output.unwrap_or_else(|| PathBuf::from(&bundle.filename));
                write_artifact(&dest, &bundle.bytes, cli.quiet)?;
            }
            Err(e) => fail(&e),
        },

        Command::LandUse { output } => {
            let dataset = dataset::load(&config.paths.dataset)?;
            let dest = output.unwrap_or_else(|| config.paths.land_use_output.clone());
            landuse::export(&dataset.records, &dest)?;
            if !cli.quiet {
                eprintln!(
                    "  {} {} recommendations written to {}",
                    "→".cyan(),
                    dataset.records.len(),
                    dest.display()
                );
            }
        }
    }

    Ok(())
}

/// Load inputs, build the imagery snapshot and run the batch. Model loading failures abort.
async fn score(config: &Config, workers: usize, quiet: bool) -> Result<batch::BatchOutcome> {
    let dataset = dataset::load(&config.paths.dataset)
        .context("Cannot load the organization dataset; nothing was scored")?;

    let trends_path = &config.paths.biodiversity_trends;
    let trends = if trends_path.exists() {
        TrendDataset::load(trends_path).unwrap_or_else(|e| {
            warn!(error = %e, "biodiversity trends unusable; using flat fallback series");
            TrendDataset::default()
        })
    } else {
        info!(path = %trends_path.display(), "no biodiversity trends; using flat fallback series");
        TrendDataset::default()
    };

    let models = ModelRegistry::load(&config.paths.models_dir)?;
    let target = config.normalization.target();
    models
        .check_shapes(target)
        .context("Model inputs do not match [normalization]; nothing was scored")?;

    let provider = config.imagery.provider()?;
    let (vegetation, water) = imagery::fetch_snapshot(
        &provider,
        &config.imagery.region(),
        &config.imagery.date_range(),
    )
    .await;

    if !quiet {
        if dataset.skipped_rows > 0 {
            eprintln!(
                "  {} {} unparsable dataset rows skipped",
                "⚠".yellow(),
                dataset.skipped_rows
            );
        }
        eprintln!(
            "  {} scoring {} organizations on {} workers",
            "→".cyan(),
            dataset.records.len(),
            workers
        );
    }

    let pb = if !quiet {
        let pb = ProgressBar::new(dataset.records.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let (veg_policy, water_policy) = (config.normalization.vegetation, config.normalization.water);
    let recommendations = config.report.recommendations.clone();
    let bar = pb.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let snapshot = ImagerySnapshot::prepare(
            vegetation.as_ref(),
            water.as_ref(),
            target,
            veg_policy,
            water_policy,
        );
        let scorer = Scorer::new(&models, &snapshot, &trends, &recommendations);
        batch::run(&dataset.records, &scorer, workers, bar.as_ref())
    })
    .await
    .context("scoring task panicked")??;

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    Ok(outcome)
}

fn generate(service: &ArtifactService, report_type: &str, quiet: bool) {
    match service.trigger_generation(report_type) {
        Ok(msg) => {
            if !quiet {
                eprintln!("  {} {}", "→".cyan(), service.reports_dir().display());
            }
            match serde_json::to_string(&msg) {
                Ok(json) => println!("{}", json),
                Err(_) => println!("{}", msg.message),
            }
        }
        Err(e) => fail(&e),
    }
}

/// Print the structured error body and exit non-zero.
fn fail(err: &error::Error) -> ! {
    let body = ErrorBody::from(err);
    match serde_json::to_string(&body) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}", body.detail),
    }
    std::process::exit(1);
}

fn write_artifact(dest: &Path, bytes: &[u8], quiet: bool) -> Result<()> {
    std::fs::write(dest, bytes).with_context(|| format!("Failed to write {}", dest.display()))?;
    if !quiet {
        eprintln!("  {} {} ({} bytes)", "✓".green(), dest.display(), bytes.len());
    }
    Ok(())
}
