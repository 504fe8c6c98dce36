//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use anyhow::Context;
use attentive_ml::config::{PipelineConfig, load_config, workspace_config_path};
use attentive_ml::eval::EvaluationReport;
use attentive_ml::{ArtifactSet, Dataset, InferenceContext, PipelineReport, run_pipeline};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Train {
            data,
            config,
            out,
            report,
        } => handle_train(workspace, &data, config.as_deref(), out, report.as_deref()),
        Commands::Predict {
            artifacts,
            input,
            seed,
            json,
        } => handle_predict(workspace, artifacts, &input, seed, json),
        Commands::Config { action } => handle_config(action, workspace),
    }
}

fn resolve_config(workspace: &Path, explicit: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let config = load_config(Some(workspace), explicit)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    config.validate()?;
    tracing::debug!(
        workspace = %workspace.display(),
        grid = ?config.search.hidden_grid,
        folds = config.search.folds,
        "configuration resolved"
    );
    Ok(config)
}

/// Relative paths are taken from the workspace.
fn in_workspace(workspace: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        workspace.join(path)
    }
}

fn handle_train(
    workspace: &Path,
    data: &Path,
    config: Option<&Path>,
    out: Option<PathBuf>,
    report_path: Option<&Path>,
) -> anyhow::Result<()> {
    let config = resolve_config(workspace, config)?;
    let dataset = Dataset::from_csv(data, &config.data.label_column, config.data.delimiter)
        .with_context(|| format!("Failed to load dataset {}", data.display()))?;
    println!(
        "Loaded {} rows x {} features ({} positive)",
        dataset.len(),
        dataset.width(),
        dataset.positive_count()
    );

    let (report, artifacts) = run_pipeline(&dataset, &config).context("Training failed")?;
    print_report(&report);

    let out_dir = in_workspace(workspace, out.unwrap_or_else(|| config.output.artifact_dir.clone()));
    let path = artifacts
        .save(&out_dir)
        .with_context(|| format!("Failed to save artifacts to {}", out_dir.display()))?;
    println!("\nArtifacts written to {}", path.display());
    println!("Run id: {}", artifacts.manifest.run_id);

    if let Some(report_path) = report_path {
        std::fs::write(report_path, serde_json::to_string_pretty(&report)?)?;
        println!("Report written to {}", report_path.display());
    }
    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!("\nCapacity search ({} train rows)", report.train_rows);
    println!("  {:>8}  {:>10}  {:>8}  folds", "hidden", "mean acc", "std");
    for (i, c) in report.grid.candidates.iter().enumerate() {
        let marker = if i == report.grid.selected { "*" } else { " " };
        let folds: Vec<String> = c
            .fold_accuracies
            .iter()
            .map(|a| a.map_or_else(|| "failed".to_string(), |v| format!("{v:.3}")))
            .collect();
        println!(
            "{marker} {:>8}  {:>10}  {:>8}  {}",
            c.hidden,
            c.mean.map_or_else(|| "-".to_string(), |m| format!("{m:.4}")),
            c.std.map_or_else(|| "-".to_string(), |s| format!("{s:.4}")),
            folds.join(" ")
        );
    }
    println!("Selected hidden size: {}", report.selected_hidden);

    print_evaluation(
        &format!("RBM({}) + classifier", report.selected_hidden),
        &report.rbm_evaluation,
        report.test_rows,
    );
    print_evaluation("Baseline classifier", &report.baseline_evaluation, report.test_rows);
    println!("\n{}", report.comparison);
}

fn print_evaluation(title: &str, eval: &EvaluationReport, rows: usize) {
    let m = &eval.metrics;
    let c = &eval.confusion;
    println!("\n{title} on {rows} test rows");
    println!("  accuracy  {:.4}", m.accuracy);
    println!("  precision {:.4}", m.precision);
    println!("  recall    {:.4}", m.recall);
    println!("  f1        {:.4}", m.f1_score);
    match m.auc_roc {
        Some(auc) => println!("  auc-roc   {auc:.4}"),
        None => println!("  auc-roc   undefined (single class)"),
    }
    println!("  confusion tp={} fp={} fn={} tn={}", c.tp, c.fp, c.fn_, c.tn);
}

fn handle_predict(
    workspace: &Path,
    artifacts: Option<PathBuf>,
    input: &str,
    seed: u64,
    json: bool,
) -> anyhow::Result<()> {
    let dir = match artifacts {
        Some(dir) => in_workspace(workspace, dir),
        None => in_workspace(workspace, resolve_config(workspace, None)?.output.artifact_dir),
    };
    let artifacts = ArtifactSet::load(&dir)
        .with_context(|| format!("Failed to load artifacts from {}", dir.display()))?;
    let record: HashMap<String, f64> =
        serde_json::from_str(input).context("Input must be a JSON object of numeric features")?;

    let ctx = InferenceContext::new(artifacts, seed)?;
    let prediction = ctx.predict_record(&record)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    } else {
        println!(
            "{} (probability {:.4})",
            prediction.label_text(),
            prediction.probability
        );
        if !prediction.defaulted_features.is_empty() {
            println!(
                "Warning: filled missing features with 0.0: {}",
                prediction.defaulted_features.join(", ")
            );
        }
    }
    Ok(())
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let toml_str = toml::to_string_pretty(&PipelineConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = resolve_config(workspace, None)?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
