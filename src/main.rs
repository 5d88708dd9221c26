use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use stormcat_classify::{ClassifierReport, Comparison, ComparisonPlan, FeatureSchema};
use stormcat_io::{
    DatasetReader, DatasetSummary, ExperimentName, IoError, ReportWriter, ResultStore,
};

#[derive(Parser)]
#[command(name = "stormcat")]
#[command(about = "Compare hurricane detection classifiers on tracked cyclone candidates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Location of persisted results.
#[derive(Args, Debug, Clone)]
struct StoreArgs {
    /// Root directory of the result store
    #[arg(long)]
    store_dir: PathBuf,

    /// Season year
    #[arg(long)]
    year: i32,

    /// Reanalysis ensemble member
    #[arg(long, default_value_t = 0)]
    ensemble_member: u32,
}

#[derive(Subcommand)]
enum Command {
    /// Train classifiers on calibration data and compare them on validation data
    Compare {
        /// Calibration candidates CSV (timestamp,is_hurricane,<features>)
        #[arg(long)]
        calibration: PathBuf,

        /// Validation candidates CSV (timestamp,is_hurricane,<features>)
        #[arg(long)]
        validation: PathBuf,

        /// JSON classifier plan
        #[arg(long)]
        plan: PathBuf,

        /// Hurricanes in the calibration period that produced no candidate
        #[arg(long, default_value_t = 0)]
        cal_missed: usize,

        /// Hurricanes in the validation period that produced no candidate
        #[arg(long, default_value_t = 0)]
        val_missed: usize,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long, default_value = "stormcat")]
        experiment: String,

        /// Output directory for the JSON report
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Also save every report to the result store
        #[arg(long, requires = "year")]
        store_dir: Option<PathBuf>,

        /// Season year to file stored reports under
        #[arg(long)]
        year: Option<i32>,

        /// Ensemble member to file stored reports under
        #[arg(long, default_value_t = 0)]
        ensemble_member: u32,
    },

    /// Inspect or remove stored comparison results
    Results {
        #[command(subcommand)]
        action: ResultsCommand,
    },
}

#[derive(Subcommand)]
enum ResultsCommand {
    /// List stored years, or ensemble members of one year
    List {
        /// Root directory of the result store
        #[arg(long)]
        store_dir: PathBuf,

        /// List ensemble members of this year instead of years
        #[arg(long)]
        year: Option<i32>,
    },

    /// Print the stored reports of one year and ensemble member
    Show {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Delete the stored reports of one year and ensemble member
    Delete {
        #[command(flatten)]
        store: StoreArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct CompareOutput {
    experiment: String,
    report_path: PathBuf,
    calibration: DatasetSummary,
    validation: DatasetSummary,
    classifiers: Vec<ClassifierOutput>,
}

#[derive(Serialize)]
struct ClassifierOutput {
    name: String,
    true_positive: usize,
    false_positive: usize,
    true_negative: usize,
    false_negative: usize,
    sensitivity: Option<f64>,
    positive_predictive_value: Option<f64>,
}

impl From<&ClassifierReport> for ClassifierOutput {
    fn from(report: &ClassifierReport) -> Self {
        Self {
            name: report.name.clone(),
            true_positive: report.counts.true_positive,
            false_positive: report.counts.false_positive,
            true_negative: report.counts.true_negative,
            false_negative: report.counts.false_negative,
            sensitivity: report.stats.sensitivity.as_option(),
            positive_predictive_value: report.stats.positive_predictive_value.as_option(),
        }
    }
}

#[derive(Serialize)]
struct ListOutput {
    store_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i32>,
    entries: Vec<i64>,
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    year: i32,
    ensemble_member: u32,
    reports: Vec<&'a ClassifierReport>,
}

fn read_plan(path: &Path) -> Result<ComparisonPlan> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid plan {}", path.display()))
}

#[allow(clippy::too_many_arguments)]
fn run_compare(
    calibration: &Path,
    validation: &Path,
    plan: &Path,
    cal_missed: usize,
    val_missed: usize,
    experiment: String,
    output_dir: &Path,
    store: Option<StoreArgs>,
) -> Result<()> {
    let experiment_name = ExperimentName::new(experiment.clone())?;
    let schema = FeatureSchema::standard();
    let plan = read_plan(plan)?;

    // Read datasets
    let calibration = DatasetReader::new(calibration, &schema)
        .with_missed_count(cal_missed)
        .read()
        .context("failed to read calibration CSV")?;
    let validation = DatasetReader::new(validation, &schema)
        .with_missed_count(val_missed)
        .read()
        .context("failed to read validation CSV")?;

    // Build, train and compare
    let mut comparison = Comparison::new(calibration, validation);
    for classifier in plan.build_all(&schema).context("failed to build classifiers")? {
        comparison.add_classifier(classifier);
    }
    info!(n_classifiers = comparison.classifiers().len(), "classifiers built");
    comparison.train_all().context("training failed")?;
    let reports = comparison.compare_all().context("comparison failed")?;

    // Write JSON artifact
    let writer = ReportWriter::new(output_dir, experiment_name)?;
    let report_path =
        writer.write_comparison(comparison.calibration(), comparison.validation(), &reports)?;

    // Optionally persist to the result store
    if let Some(store) = store {
        let mut results: ResultStore<ClassifierReport> = ResultStore::new(&store.store_dir);
        match results.load(store.year, store.ensemble_member) {
            Ok(_) | Err(IoError::ResultNotFound { .. }) => {}
            Err(e) => return Err(e).context("failed to load existing results"),
        }
        for report in &reports {
            results.add_result(store.year, store.ensemble_member, report.name.clone(), report.clone())?;
        }
        results.save().context("failed to save results")?;
        info!(year = store.year, ensemble_member = store.ensemble_member, "reports stored");
    }

    // Build and print stdout summary
    let output = CompareOutput {
        experiment,
        report_path,
        calibration: DatasetSummary::of(comparison.calibration()),
        validation: DatasetSummary::of(comparison.validation()),
        classifiers: reports.iter().map(ClassifierOutput::from).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_results(action: ResultsCommand) -> Result<()> {
    match action {
        ResultsCommand::List { store_dir, year } => {
            let results: ResultStore<ClassifierReport> = ResultStore::new(&store_dir);
            let entries = match year {
                Some(year) => results
                    .list_ensemble_members(year)?
                    .into_iter()
                    .map(i64::from)
                    .collect(),
                None => results.list_years()?.into_iter().map(i64::from).collect(),
            };
            let output = ListOutput {
                store_dir,
                year,
                entries,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        ResultsCommand::Show { store } => {
            let mut results: ResultStore<ClassifierReport> = ResultStore::new(&store.store_dir);
            let bundle = results.load(store.year, store.ensemble_member)?;
            let output = ShowOutput {
                year: store.year,
                ensemble_member: store.ensemble_member,
                reports: bundle.iter().map(|(_, report)| report).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        ResultsCommand::Delete { store } => {
            let mut results: ResultStore<ClassifierReport> = ResultStore::new(&store.store_dir);
            results.delete(store.year, store.ensemble_member)?;
            info!(year = store.year, ensemble_member = store.ensemble_member, "results deleted");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Compare {
            calibration,
            validation,
            plan,
            cal_missed,
            val_missed,
            experiment,
            output_dir,
            store_dir,
            year,
            ensemble_member,
        } => {
            let store = store_dir.zip(year).map(|(store_dir, year)| StoreArgs {
                store_dir,
                year,
                ensemble_member,
            });
            run_compare(
                &calibration,
                &validation,
                &plan,
                cal_missed,
                val_missed,
                experiment,
                &output_dir,
                store,
            )
        }
        Command::Results { action } => run_results(action),
    }
}
