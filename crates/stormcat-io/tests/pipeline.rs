//! End-to-end integration tests: CSV -> compare -> JSON report -> result store.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use stormcat_classify::{
    ClassifierReport, Comparison, ComparisonPlan, FeatureSchema, Statistic,
};
use stormcat_io::{DatasetReader, ExperimentName, IoError, ReportWriter, ResultStore};
use tempfile::TempDir;

/// Write a candidate CSV for the standard schema.
///
/// Every third row is a hurricane with high vorticity and low pressure.
fn write_candidates(dir: &Path, name: &str, n_rows: usize) -> PathBuf {
    let schema = FeatureSchema::standard();
    let mut csv = String::from("timestamp,is_hurricane");
    for feature in schema.names() {
        csv.push(',');
        csv.push_str(feature);
    }
    csv.push('\n');
    for i in 0..n_rows {
        let hurricane = i % 3 == 0;
        let jitter = (i % 7) as f64 * 0.01;
        let (vort, pmin) = if hurricane {
            (0.000_2 + jitter * 0.000_01, 960.0 + jitter)
        } else {
            (0.000_05 + jitter * 0.000_01, 1008.0 - jitter)
        };
        write!(
            csv,
            "2005-08-{:02}T{:02}:00:00,{}",
            1 + i / 4,
            (i % 4) * 6,
            hurricane
        )
        .unwrap();
        let rest = [
            vort, pmin, 600.0, 100.0, 298.0 + jitter, 288.0, -10.0, 20.0, 50.0, 1.2, 1500.0,
            55.0, 85.0, -75.0, 25.0,
        ];
        for value in rest {
            write!(csv, ",{value}").unwrap();
        }
        csv.push('\n');
    }
    let path = dir.join(name);
    fs::write(&path, csv).unwrap();
    path
}

fn plan() -> ComparisonPlan {
    serde_json::from_str(
        r#"{"classifiers": [
            {"kind": "threshold", "name": "vort_pmin", "cutoffs": [
                {"key": "vort_lo", "value": 0.0001},
                {"key": "pmin_hi", "value": 990.0}
            ]},
            {"kind": "decision_tree", "config": {"max_depth": 3}},
            {"kind": "chain", "stages": [
                {"plan": {"kind": "threshold", "cutoffs": [{"key": "vort_lo", "value": 0.0001}]}},
                {"plan": {"kind": "decision_tree"}, "features": ["pmin", "t995"]}
            ]}
        ]}"#,
    )
    .unwrap()
}

#[test]
fn compare_round_trip() {
    let dir = TempDir::new().unwrap();
    let schema = FeatureSchema::standard();

    // 1. Read CSVs
    let calibration = DatasetReader::new(&write_candidates(dir.path(), "cal.csv", 60), &schema)
        .with_missed_count(3)
        .read()
        .expect("calibration should parse");
    let validation = DatasetReader::new(&write_candidates(dir.path(), "val.csv", 30), &schema)
        .with_missed_count(2)
        .read()
        .expect("validation should parse");
    assert_eq!(calibration.n_columns(), 15);
    assert_eq!(validation.actual_positive_count(), 10);

    // 2. Train and compare
    let mut comparison = Comparison::new(calibration, validation);
    for classifier in plan().build_all(&schema).unwrap() {
        comparison.add_classifier(classifier);
    }
    comparison.train_all().unwrap();
    let reports = comparison.compare_all().unwrap();
    assert_eq!(reports.len(), 3);
    for report in &reports {
        assert_eq!(report.counts.true_positive, 10, "{}", report.name);
        assert_eq!(report.counts.false_positive, 0, "{}", report.name);
        assert_eq!(report.counts.false_negative, 2, "{}", report.name);
        assert_eq!(report.stats.positive_predictive_value, Statistic::Defined(1.0));
    }

    // 3. Write JSON report and read it back
    let writer = ReportWriter::new(
        &dir.path().join("out"),
        ExperimentName::new("em0_2005").unwrap(),
    )
    .unwrap();
    let path = writer
        .write_comparison(comparison.calibration(), comparison.validation(), &reports)
        .unwrap();
    assert!(path.ends_with("em0_2005_compare.json"));
    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["validation"]["missed"], 2);
    assert_eq!(content["calibration"]["candidates"], 60);
    let names: Vec<&str> = content["classifiers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["vort_pmin", "decision_tree", "chain"]);

    // 4. Persist reports and reload them
    let store_dir = dir.path().join("store");
    let mut store: ResultStore<ClassifierReport> = ResultStore::new(&store_dir);
    for report in &reports {
        store.add_result(2005, 0, report.name.clone(), report.clone()).unwrap();
    }
    store.save().unwrap();

    let mut reloaded: ResultStore<ClassifierReport> = ResultStore::new(&store_dir);
    let bundle = reloaded.load(2005, 0).unwrap();
    assert_eq!(bundle.len(), 3);
    for report in &reports {
        assert_eq!(bundle.get(&report.name), Some(report));
    }
}

#[test]
fn loading_twice_reports_duplicates() {
    let dir = TempDir::new().unwrap();
    let mut store: ResultStore<String> = ResultStore::new(dir.path());
    store.add_result(2005, 1, "note", "first pass".to_string()).unwrap();
    store.save().unwrap();

    let mut reloaded: ResultStore<String> = ResultStore::new(dir.path());
    reloaded.load(2005, 1).unwrap();
    assert!(matches!(
        reloaded.load(2005, 1),
        Err(IoError::DuplicateResultName { .. })
    ));
}

#[test]
fn standard_header_required() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.csv");
    fs::write(&path, "timestamp,is_hurricane,vort\n2005-08-01T00:00:00,1,0.1\n").unwrap();
    let schema = FeatureSchema::standard();
    let err = DatasetReader::new(&path, &schema).read().unwrap_err();
    let IoError::SchemaMismatch { expected, got, .. } = err else {
        panic!("expected a schema mismatch");
    };
    assert_eq!(expected.len(), 17);
    assert_eq!(got.len(), 3);
}
