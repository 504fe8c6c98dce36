//! End-to-end training, persistence and inference on synthetic screening data.

use attentive_ml::config::{ClassifierConfig, PipelineConfig, RbmConfig, SearchConfig};
use attentive_ml::data::Dataset;
use attentive_ml::inference::{ArtifactSet, InferenceContext};
use attentive_ml::run_pipeline;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::collections::HashMap;
use std::fmt::Write as _;

const ROWS: usize = 200;
const WIDTH: usize = 6;

/// Rows alternate between two clusters at +1 and -1 per feature; the label is
/// whether the row sum is positive, so the classes are linearly separable.
fn screening_csv(seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut csv = String::new();
    let header: Vec<String> = (1..=WIDTH).map(|i| format!("q{i}")).collect();
    writeln!(csv, "{},is_adhd", header.join(",")).unwrap();
    for i in 0..ROWS {
        let centre = if i % 2 == 0 { 1.0 } else { -1.0 };
        let row: Vec<f64> = (0..WIDTH)
            .map(|_| centre + rng.sample::<f64, _>(StandardNormal))
            .collect();
        let label = u8::from(row.iter().sum::<f64>() > 0.0);
        let cells: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
        writeln!(csv, "{},{label}", cells.join(",")).unwrap();
    }
    csv
}

fn separable_config() -> PipelineConfig {
    PipelineConfig {
        rbm: RbmConfig {
            epochs: 10,
            batch_size: 10,
            ..RbmConfig::default()
        },
        classifier: ClassifierConfig {
            epochs: 30,
            batch_size: 32,
            learning_rate: 0.01,
        },
        search: SearchConfig {
            hidden_grid: vec![32],
            folds: 2,
            ..SearchConfig::default()
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn test_separable_data_reaches_high_accuracy() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("screening.csv");
    std::fs::write(&csv_path, screening_csv(2024)).unwrap();

    let dataset = Dataset::from_csv(&csv_path, "is_adhd", ',').unwrap();
    assert_eq!(dataset.len(), ROWS);
    assert_eq!(dataset.width(), WIDTH);

    let (report, artifacts) = run_pipeline(&dataset, &separable_config()).unwrap();
    assert_eq!(report.train_rows + report.test_rows, ROWS);
    assert_eq!(report.selected_hidden, 32);
    assert_eq!(report.rbm_evaluation.confusion.total(), report.test_rows);
    assert!(
        report.rbm_evaluation.metrics.accuracy > 0.9,
        "test accuracy {}",
        report.rbm_evaluation.metrics.accuracy
    );
    assert_eq!(report.rbm_training.epochs_completed, 10);
    assert_eq!(report.classifier_training.epochs_completed, 30);
    assert_eq!(
        report.comparison.improved,
        report.rbm_evaluation.metrics.accuracy > report.baseline_evaluation.metrics.accuracy
    );
    assert_eq!(artifacts.manifest.hidden_size, 32);
    assert_eq!(artifacts.manifest.input_width, WIDTH);
}

#[test]
fn test_artifacts_round_trip_into_inference() {
    let dataset = Dataset::parse_csv(&screening_csv(7), "is_adhd", ',').unwrap();
    let (report, artifacts) = run_pipeline(&dataset, &separable_config()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    artifacts.save(dir.path()).unwrap();
    let loaded = ArtifactSet::load(dir.path()).unwrap();
    assert_eq!(loaded, artifacts);
    assert_eq!(
        loaded.manifest.test_accuracy,
        report.rbm_evaluation.metrics.accuracy
    );

    let ctx = InferenceContext::new(loaded, 42).unwrap();
    let high = ctx.predict_vector(&[3.0; WIDTH]).unwrap();
    let low = ctx.predict_vector(&[-3.0; WIDTH]).unwrap();
    assert!(high.label, "probability {}", high.probability);
    assert!(!low.label, "probability {}", low.probability);
    assert_eq!(high.label_text(), "ADHD");

    let record: HashMap<String, f64> = ctx
        .feature_names()
        .iter()
        .take(WIDTH - 1)
        .map(|name| (name.clone(), 3.0))
        .collect();
    let partial = ctx.predict_record(&record).unwrap();
    assert_eq!(partial.defaulted_features, vec![format!("q{WIDTH}")]);
}

#[test]
fn test_capacity_search_over_small_grid() {
    let dataset = Dataset::parse_csv(&screening_csv(99), "is_adhd", ',').unwrap();
    let config = PipelineConfig {
        rbm: RbmConfig {
            epochs: 2,
            ..RbmConfig::default()
        },
        classifier: ClassifierConfig {
            epochs: 5,
            learning_rate: 0.01,
            ..ClassifierConfig::default()
        },
        search: SearchConfig {
            hidden_grid: vec![8, 16, 32],
            folds: 3,
            ..SearchConfig::default()
        },
        ..PipelineConfig::default()
    };
    let (report, _) = run_pipeline(&dataset, &config).unwrap();

    let grid = &report.grid;
    assert_eq!(
        grid.candidates.iter().map(|c| c.hidden).collect::<Vec<_>>(),
        vec![8, 16, 32]
    );
    for c in &grid.candidates {
        assert_eq!(c.fold_accuracies.len(), 3);
        assert_eq!(c.failed_folds(), 0);
    }
    let best = grid.best().mean.unwrap();
    assert!(grid.candidates.iter().all(|c| c.mean.unwrap() <= best));
    assert_eq!(report.selected_hidden, grid.selected_hidden());

    // same seeds, same result
    let (again, _) = run_pipeline(&dataset, &config).unwrap();
    assert_eq!(again.grid, report.grid);
    assert_eq!(
        again.rbm_evaluation.metrics,
        report.rbm_evaluation.metrics
    );
}
