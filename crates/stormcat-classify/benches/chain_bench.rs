//! Criterion benchmarks for stormcat-classify: threshold and chain categorization.

use chrono::NaiveDateTime;
use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use stormcat_classify::{
    ChainClassifier, Classifier, DecisionTreeClassifier, EvaluationDataset, FeatureSchema,
    ThresholdClassifier,
};

fn make_candidates(n_rows: usize, seed: u64) -> EvaluationDataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n_rows);
    let mut labels = Vec::with_capacity(n_rows);
    for i in 0..n_rows {
        let hurricane = i % 4 == 0;
        let shift = if hurricane { 1.0 } else { 0.0 };
        let mut row: Vec<f64> = (0..15).map(|_| rng.r#gen::<f64>()).collect();
        row[0] = shift * 0.5 + rng.r#gen::<f64>();
        row[1] = 1000.0 - shift * 20.0 + rng.r#gen::<f64>() * 10.0;
        rows.push(row);
        labels.push(hurricane);
    }
    EvaluationDataset::new(rows, labels, vec![NaiveDateTime::default(); n_rows], 0)
        .expect("aligned synthetic dataset")
}

fn bench_threshold(c: &mut Criterion) {
    let ds = make_candidates(10_000, 42);
    let schema = FeatureSchema::standard();
    let mut threshold =
        ThresholdClassifier::from_cutoffs(&schema, [("vort_lo", 0.6), ("pmin_hi", 995.0)])
            .expect("valid cutoffs");
    threshold.train(&ds, None).expect("threshold trains");

    c.bench_function("threshold_categorize_10000", |b| {
        b.iter(|| threshold.categorize(&ds).unwrap());
    });
}

fn bench_chain(c: &mut Criterion) {
    let ds = make_candidates(10_000, 42);
    let schema = FeatureSchema::standard();
    let first = ThresholdClassifier::from_cutoffs(&schema, [("vort_lo", 0.3)]).expect("valid cutoffs");
    let mut chain = ChainClassifier::new()
        .with_stage(Box::new(first), None)
        .with_stage(Box::new(DecisionTreeClassifier::default()), Some(vec![0, 1, 2]));
    chain.train(&ds, None).expect("chain trains");

    c.bench_function("chain_categorize_10000", |b| {
        b.iter(|| chain.categorize(&ds).unwrap());
    });
}

criterion_group!(benches, bench_threshold, bench_chain);
criterion_main!(benches);
