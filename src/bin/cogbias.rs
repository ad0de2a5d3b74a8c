//! cogbias CLI - score cognitive-bias task exports from the command line
//!
//! Commands:
//! - analyze: Score one or more tasks and write their reports
//! - validate: Check that the export has every column a task needs
//! - tasks: List tasks and their required columns

use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cogbias::pipeline::{AnalysisProcessor, ColumnCheck};
use cogbias::{AnalysisConfig, AnalysisError, Task, COGBIAS_VERSION};

/// cogbias - scoring engine for cognitive-bias tasks and questionnaires
#[derive(Parser)]
#[command(name = "cogbias")]
#[command(version = COGBIAS_VERSION)]
#[command(about = "Score cognitive-bias task exports", long_about = None)]
struct Cli {
    /// Log per-participant progress (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score tasks and write one report directory per task
    Analyze {
        /// Experiment platform CSV export
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Task to score (repeatable), or "all"
        #[arg(short, long, default_value = "all")]
        task: Vec<String>,

        /// Analysis configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the written manifests as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the export's columns against each task
    Validate {
        /// Experiment platform CSV export
        #[arg(short, long)]
        input: PathBuf,

        /// Task to check (repeatable), or "all"
        #[arg(short, long, default_value = "all")]
        task: Vec<String>,

        /// Analysis configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tasks and the columns they read
    Tasks {
        /// Analysis configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn run(cli: Cli) -> Result<(), CogbiasCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            task,
            config,
            json,
        } => cmd_analyze(&input, &output, &task, config.as_deref(), json),
        Commands::Validate {
            input,
            task,
            config,
            json,
        } => cmd_validate(&input, &task, config.as_deref(), json),
        Commands::Tasks { config } => cmd_tasks(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, CogbiasCliError> {
    match path {
        Some(path) => Ok(AnalysisConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Resolve task names; "all" expands to every task, duplicates are dropped
fn select_tasks(names: &[String]) -> Result<Vec<Task>, CogbiasCliError> {
    let mut tasks = Vec::new();
    for name in names {
        let selected = if name.eq_ignore_ascii_case("all") {
            Task::ALL.to_vec()
        } else {
            vec![name.parse::<Task>()?]
        };
        for task in selected {
            if !tasks.contains(&task) {
                tasks.push(task);
            }
        }
    }
    Ok(tasks)
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    task_names: &[String],
    config: Option<&Path>,
    json: bool,
) -> Result<(), CogbiasCliError> {
    let tasks = select_tasks(task_names)?;
    let processor = AnalysisProcessor::with_config(load_config(config)?);
    let manifests = processor.run(input, output, &tasks)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&manifests)?);
    } else {
        for manifest in &manifests {
            println!(
                "{:<14} {:>4} participants, {:>4} valid  -> {}",
                manifest.task,
                manifest.participants,
                manifest.valid_participants,
                output.join(&manifest.task).display()
            );
        }
    }
    Ok(())
}

fn cmd_validate(
    input: &Path,
    task_names: &[String],
    config: Option<&Path>,
    json: bool,
) -> Result<(), CogbiasCliError> {
    let tasks = select_tasks(task_names)?;
    let processor = AnalysisProcessor::with_config(load_config(config)?);
    let table = processor.load(input)?;
    let checks = processor.validate(&table, &tasks);

    let report = ValidationReport {
        participants: table.len(),
        columns: table.schema().headers().len(),
        failed_tasks: checks.iter().filter(|check| !check.is_ok()).count(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Participants: {}", report.participants);
        println!("Columns:      {}", report.columns);
        println!();
        for check in &report.checks {
            if check.is_ok() {
                println!("  ok    {}", check.task);
            } else {
                println!("  FAIL  {}: missing {}", check.task, check.missing.join(", "));
            }
        }
    }

    if report.failed_tasks > 0 {
        Err(CogbiasCliError::ValidationFailed(report.failed_tasks))
    } else {
        Ok(())
    }
}

fn cmd_tasks(config: Option<&Path>) -> Result<(), CogbiasCliError> {
    let config = load_config(config)?;
    for task in Task::ALL {
        let columns = task.required_columns(&config);
        println!("{task}");
        println!("  {}", columns.join(", "));
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum CogbiasCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for CogbiasCliError {
    fn from(e: io::Error) -> Self {
        CogbiasCliError::Io(e)
    }
}

impl From<AnalysisError> for CogbiasCliError {
    fn from(e: AnalysisError) -> Self {
        CogbiasCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for CogbiasCliError {
    fn from(e: serde_json::Error) -> Self {
        CogbiasCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: &str) -> Self {
        Self {
            code: code.to_string(),
            message,
            hint: Some(hint.to_string()),
        }
    }
}

impl From<CogbiasCliError> for CliError {
    fn from(e: CogbiasCliError) -> Self {
        match e {
            CogbiasCliError::Io(e) => {
                CliError::new("IO_ERROR", e.to_string(), "Check file paths and permissions")
            }
            CogbiasCliError::Json(e) => CliError::new("JSON_ERROR", e.to_string(), "Check JSON syntax"),
            CogbiasCliError::ValidationFailed(count) => CliError::new(
                "VALIDATION_FAILED",
                format!("{count} tasks are missing required columns"),
                "Pass --task to score only the tasks present in the export",
            ),
            CogbiasCliError::Analysis(e) => analysis_error(e),
        }
    }
}

fn analysis_error(e: AnalysisError) -> CliError {
    let message = e.to_string();
    match e {
        AnalysisError::Io(_) => {
            CliError::new("IO_ERROR", message, "Check file paths and permissions")
        }
        AnalysisError::Csv(_) => CliError::new(
            "CSV_ERROR",
            message,
            "Ensure the input is a CSV export with a header row",
        ),
        AnalysisError::JsonError(_) => CliError::new("JSON_ERROR", message, "Check JSON syntax"),
        AnalysisError::MissingColumn { .. } => CliError::new(
            "MISSING_COLUMN",
            message,
            "Run 'cogbias validate' to list missing columns",
        ),
        AnalysisError::EmptyTable => {
            CliError::new("EMPTY_TABLE", message, "Ensure input file is not empty")
        }
        AnalysisError::UnknownTask(_) => CliError::new(
            "UNKNOWN_TASK",
            message,
            "Run 'cogbias tasks' for the list of task names",
        ),
        AnalysisError::InvalidConfig(_) => {
            CliError::new("CONFIG_ERROR", message, "Check the --config file")
        }
        AnalysisError::NoTrialData | AnalysisError::ReportError(_) => {
            CliError::new("ANALYSIS_ERROR", message, "Re-run with --verbose for details")
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    participants: usize,
    columns: usize,
    failed_tasks: usize,
    checks: Vec<ColumnCheck>,
}
