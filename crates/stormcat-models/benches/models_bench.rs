//! Criterion benchmarks for stormcat-models: fitting and batch prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use stormcat_models::{DecisionTreeConfig, Fit, LdaConfig, Predict, QdaConfig, SgdConfig};

fn make_classification(n_samples: usize, n_features: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<bool>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let label = i % 3 == 0;
        labels.push(label);
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                let base = if f < 3 && label { 1.5 } else { 0.0 };
                base + rng.r#gen::<f64>()
            })
            .collect();
        features.push(row);
    }
    (features, labels)
}

fn bench_tree_fit(c: &mut Criterion) {
    let (features, labels) = make_classification(2000, 13, 42);
    let cfg = DecisionTreeConfig::new().with_max_depth(Some(8));

    c.bench_function("tree_fit_2000x13", |b| {
        b.iter(|| cfg.fit(&features, &labels).unwrap());
    });
}

fn bench_discriminant_fit(c: &mut Criterion) {
    let (features, labels) = make_classification(2000, 13, 42);
    let lda = LdaConfig::new();
    let qda = QdaConfig::new();

    c.bench_function("lda_fit_2000x13", |b| {
        b.iter(|| lda.fit(&features, &labels).unwrap());
    });
    c.bench_function("qda_fit_2000x13", |b| {
        b.iter(|| qda.fit(&features, &labels).unwrap());
    });
}

fn bench_sgd_fit(c: &mut Criterion) {
    let (features, labels) = make_classification(2000, 13, 42);
    let cfg = SgdConfig::new().with_max_iter(20);

    c.bench_function("sgd_fit_2000x13_20epochs", |b| {
        b.iter(|| cfg.fit(&features, &labels).unwrap());
    });
}

fn bench_predict_batch(c: &mut Criterion) {
    let (features, labels) = make_classification(2000, 13, 42);
    let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
    let qda = QdaConfig::new().fit(&features, &labels).unwrap();

    c.bench_function("tree_predict_batch_2000x13", |b| {
        b.iter(|| tree.predict_batch(&features).unwrap());
    });
    c.bench_function("qda_predict_batch_2000x13", |b| {
        b.iter(|| qda.predict_batch(&features).unwrap());
    });
}

criterion_group!(
    benches,
    bench_tree_fit,
    bench_discriminant_fit,
    bench_sgd_fit,
    bench_predict_batch
);
criterion_main!(benches);
