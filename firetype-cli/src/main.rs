use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use firetype_io::{load_sources, write_csv};
use firetype_pipeline::{ModelArtifact, Pipeline, PipelineConfig, PipelineReport};

#[derive(Parser)]
#[command(name = "firetype")]
#[command(version)]
#[command(about = "Train and apply fire type classifiers on satellite fire detections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on labelled CSV files
    Train {
        /// Pipeline configuration (TOML); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Where to write the fitted model artifact
        #[arg(short, long, default_value = "firetype-model.json")]
        artifact: PathBuf,

        /// Optional JSON summary of the run
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Labelled input files, concatenated in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Predict fire types for CSV files with a saved artifact
    Predict {
        #[arg(short, long, default_value = "firetype-model.json")]
        artifact: PathBuf,

        /// Predictions CSV
        #[arg(short, long, default_value = "predictions.csv")]
        output: PathBuf,

        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Print the default configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Train {
            config,
            artifact,
            report,
            inputs,
        } => train(config, artifact, report, &inputs),
        Commands::Predict {
            artifact,
            output,
            inputs,
        } => predict(&artifact, &output, &inputs),
        Commands::Config => {
            print!("{}", PipelineConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn train(config: Option<PathBuf>, artifact: PathBuf, report: Option<PathBuf>, inputs: &[PathBuf]) -> Result<()> {
    let config = match config {
        Some(path) => PipelineConfig::from_file(&path).with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let run = Pipeline::new(config).run_files(inputs)?;
    print_summary(&run.report);

    run.artifact
        .save(&artifact)
        .with_context(|| format!("saving artifact to {}", artifact.display()))?;
    info!(path = %artifact.display(), "artifact saved");

    if let Some(path) = report {
        let text = serde_json::to_string_pretty(&summary(&run.report))?;
        std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "report saved");
    }
    Ok(())
}

fn predict(artifact: &Path, output: &Path, inputs: &[PathBuf]) -> Result<()> {
    let model = ModelArtifact::load(artifact).with_context(|| format!("loading {}", artifact.display()))?;
    let ingested = load_sources(inputs, false)?;
    let predictions = model.predict_dataset(&ingested.dataset())?;

    let rows: Vec<Vec<String>> = predictions
        .rows
        .iter()
        .zip(&predictions.labels)
        .map(|(&row, label)| {
            let r = &ingested.records[row];
            vec![
                row.to_string(),
                r.latitude.to_string(),
                r.longitude.to_string(),
                r.acq_date.clone(),
                label.code().to_string(),
                label.name().to_string(),
            ]
        })
        .collect();
    write_csv(
        output,
        &["row", "latitude", "longitude", "acq_date", "type", "type_name"],
        &rows,
    )?;

    let rejected = ingested.rejected.total() + predictions.rejected.total();
    if rejected > 0 {
        warn!(rejected, "some records could not be scored");
    }
    info!(scored = rows.len(), path = %output.display(), "predictions written");
    Ok(())
}

fn print_summary(report: &PipelineReport) {
    println!("\nClasses: {:?}", report.classes.iter().map(|c| c.name()).collect::<Vec<_>>());
    println!(
        "Balanced to {} rows per class ({} total), {} train / {} test",
        report.rows_per_class, report.balanced_rows, report.train_rows, report.test_rows
    );
    println!("Selected features: {}", report.selected_features.join(", "));

    println!("\n{:<22} {:>10} {:>10} {:>10}", "model", "test acc", "cv mean", "cv std");
    for r in &report.training.results {
        println!(
            "{:<22} {:>10.4} {:>10.4} {:>10.4}",
            r.name, r.test_accuracy, r.cv.mean, r.cv.std
        );
    }
    println!("Best: {}", report.training.best().name);

    if let Some(tuning) = &report.tuning {
        println!(
            "\nTuned {} ({} of {} candidates scored): {} cv {:.4} +/- {:.4}",
            tuning.family,
            tuning.n_scored(),
            tuning.candidates.len(),
            tuning.best_params,
            tuning.best_cv.mean,
            tuning.best_cv.std
        );
        if let Some(nested) = &tuning.nested {
            println!("Nested estimate: {:.4} +/- {:.4}", nested.mean, nested.std);
        }
    }

    let eval = &report.evaluation;
    println!("\n{}", eval.report);
    println!("Confusion matrix (rows true, columns predicted):");
    for row in &eval.confusion_matrix {
        println!("  {}", row.iter().map(|v| format!("{:>6}", v)).collect::<String>());
    }
    let ranked = eval.ranked_importances();
    if !ranked.is_empty() {
        println!("\nFeature importances:");
        for fi in ranked {
            println!("  {:<22} {:.4}", fi.feature, fi.importance);
        }
    }
    if report.total_rejected() > 0 {
        println!("\nRejected records:");
        for (stage, rejected) in &report.rejected {
            for (kind, n) in rejected.by_kind() {
                println!("  {:<22} {:<24} {}", stage.name(), kind, n);
            }
        }
    }
}

/// Run summary without the fitted models.
fn summary(report: &PipelineReport) -> serde_json::Value {
    let candidates: Vec<_> = report
        .training
        .results
        .iter()
        .map(|r| {
            json!({
                "name": r.name,
                "hyperparams": r.hyperparams,
                "test_accuracy": r.test_accuracy,
                "cv": r.cv,
            })
        })
        .collect();
    let tuning = report.tuning.as_ref().map(|t| {
        json!({
            "family": t.family,
            "best_params": t.best_params,
            "best_cv": t.best_cv,
            "nested": t.nested,
            "candidates": t.candidates,
        })
    });
    json!({
        "classes": report.classes,
        "rejected": report.rejected,
        "balanced_rows": report.balanced_rows,
        "rows_per_class": report.rows_per_class,
        "train_rows": report.train_rows,
        "test_rows": report.test_rows,
        "selected_features": report.selected_features,
        "feature_scores": report.feature_scores,
        "candidates": candidates,
        "best_model": report.training.best().name,
        "tuning": tuning,
        "evaluation": report.evaluation,
    })
}
