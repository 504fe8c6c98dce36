use attentive_ml::config::{ClassifierConfig, RbmConfig};
use attentive_ml::data::Dataset;
use attentive_ml::eval::auc_roc;
use attentive_ml::models::rbm::{self, RbmParams};
use attentive_ml::training::{FoldEvaluator, RbmPipelineEvaluator};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn features(rows: usize, cols: usize) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(3);
    Array2::from_shape_simple_fn((rows, cols), || rng.gen_range(-2.0..2.0))
}

fn bench_rbm(c: &mut Criterion) {
    let batch = features(10, 20);
    for hidden in [32, 128, 512] {
        let mut rng = StdRng::seed_from_u64(1);
        let params = RbmParams::new(20, hidden, 0.01, &mut rng);
        c.bench_function(&format!("rbm_train_step_h{hidden}"), |b| {
            b.iter(|| {
                let mut p = params.clone();
                rbm::train_step(&mut p, black_box(&batch), &mut rng)
            })
        });
    }

    let data = features(500, 20);
    let mut rng = StdRng::seed_from_u64(2);
    let params = RbmParams::new(20, 128, 0.01, &mut rng);
    c.bench_function("rbm_extract_500x20_h128", |b| {
        b.iter(|| rbm::extract_features(&params, black_box(&data), &mut rng))
    });
}

fn bench_grid_cell(c: &mut Criterion) {
    let x = features(200, 20);
    let labels = Array1::from_shape_fn(200, |i| if x.row(i).sum() > 0.0 { 1.0 } else { 0.0 });
    let names = (0..20).map(|i| format!("q{i}")).collect();
    let data = Dataset::new(names, x, labels).unwrap();
    let train_idx: Vec<usize> = (0..160).collect();
    let val_idx: Vec<usize> = (160..200).collect();
    let (train, validation) = (data.select(&train_idx), data.select(&val_idx));
    let evaluator = RbmPipelineEvaluator::new(RbmConfig::default(), ClassifierConfig::default());

    let mut group = c.benchmark_group("grid_cell");
    group.sample_size(10);
    group.bench_function("cell_h64_160_rows", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(4);
            evaluator.evaluate_fold(64, 0, black_box(&train), &validation, &mut rng)
        })
    });
    group.finish();
}

fn bench_auc(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(5);
    let scores = Array1::from_shape_simple_fn(5000, || rng.gen_range(0.0..1.0));
    let labels = Array1::from_shape_fn(5000, |i| (i % 2) as f64);
    c.bench_function("auc_roc_5000", |b| {
        b.iter(|| auc_roc(black_box(&scores), black_box(&labels)))
    });
}

criterion_group!(benches, bench_rbm, bench_grid_cell, bench_auc);
criterion_main!(benches);
