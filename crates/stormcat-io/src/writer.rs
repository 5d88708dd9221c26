//! JSON report writer for classifier comparisons.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use stormcat_classify::{ClassifierReport, EvaluationDataset};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes comparison reports to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_compare.json`.
pub struct ReportWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Return the path [`ReportWriter::write_comparison`] writes to.
    #[must_use]
    pub fn comparison_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_compare.json", self.experiment.as_str()))
    }

    /// Write every classifier report to `{experiment}_compare.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n_reports = reports.len()))]
    pub fn write_comparison(
        &self,
        calibration: &EvaluationDataset,
        validation: &EvaluationDataset,
        reports: &[ClassifierReport],
    ) -> Result<PathBuf, IoError> {
        let path = self.comparison_path();
        let artifact = ComparisonArtifact {
            experiment: self.experiment.as_str(),
            calibration: DatasetSummary::of(calibration),
            validation: DatasetSummary::of(validation),
            classifiers: reports,
        };

        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "comparison report written");
        Ok(path)
    }
}

#[derive(Serialize)]
struct ComparisonArtifact<'a> {
    experiment: &'a str,
    calibration: DatasetSummary,
    validation: DatasetSummary,
    classifiers: &'a [ClassifierReport],
}

/// Row and ground-truth counts of one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct DatasetSummary {
    /// Candidates that reached classification.
    pub candidates: usize,
    /// Candidates missed upstream.
    pub missed: usize,
    /// Actual hurricanes among the candidates.
    pub hurricanes: usize,
}

impl DatasetSummary {
    /// Summarize `dataset`.
    #[must_use]
    pub fn of(dataset: &EvaluationDataset) -> Self {
        Self {
            candidates: dataset.candidate_count(),
            missed: dataset.missed_count(),
            hurricanes: dataset.actual_positive_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use stormcat_classify::{ConfusionCounts, DerivedStats};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn creates_directory_and_names_file() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("reports").join("2005");
        let writer = ReportWriter::new(&nested, ExperimentName::new("em0").unwrap()).unwrap();
        assert!(nested.is_dir());
        assert_eq!(writer.comparison_path(), nested.join("em0_compare.json"));
    }

    #[test]
    fn writes_reports_with_undefined_stats() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path(), ExperimentName::new("empty").unwrap()).unwrap();
        let counts = ConfusionCounts {
            true_positive: 0,
            false_positive: 0,
            true_negative: 3,
            false_negative: 1,
        };
        let report = ClassifierReport {
            name: "threshold".to_string(),
            settings: None,
            counts,
            stats: DerivedStats::from_counts(&counts),
        };
        let empty = EvaluationDataset::empty();
        let path = writer.write_comparison(&empty, &empty, &[report]).unwrap();

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(content["experiment"], "empty");
        let classifier = &content["classifiers"][0];
        assert_eq!(classifier["counts"]["false_negative"], 1);
        assert_eq!(classifier["stats"]["sensitivity"]["defined"], 0.0);
        assert_eq!(classifier["stats"]["positive_predictive_value"], "undefined");
    }
}
