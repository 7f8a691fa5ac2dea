//! `gantt` - resolve, edit and convert Gantt project files from the shell.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wbs_gantt::model::date::parse_date;
use wbs_gantt::schedule::parse_holidays;
use wbs_gantt::{io, Action, AppState, EngineSettings, Error, ProjectData, RowMap};

#[derive(Parser, Debug)]
#[command(name = "gantt")]
#[command(
    version,
    about = "Schedule Gantt projects: working days, dependencies and CSV exchange",
    long_about = None
)]
struct Cli {
    /// Settings file to use instead of the one in the config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Re-link dependencies, propagate dates and refresh separator ranges
    Resolve {
        project: PathBuf,
        /// Replace the project's holidays with the dates listed in this file
        #[arg(long)]
        holidays: Option<PathBuf>,
        /// Write here instead of overwriting the project
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Move one row and everything that depends on it
    SetDates {
        project: PathBuf,
        /// Row number (the `No` column)
        #[arg(long)]
        row: usize,
        #[arg(long)]
        start: String,
        /// Keeps the current duration when omitted
        #[arg(long)]
        end: Option<String>,
        /// Replace the project's holidays before moving the row
        #[arg(long)]
        holidays: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Chain rows so each depends on the previous one
    Chain {
        project: PathBuf,
        /// Row numbers in chain order, e.g. 2,3,4
        #[arg(long, value_delimiter = ',', required = true)]
        rows: Vec<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the rows of a project to a CSV file
    ExportCsv { project: PathBuf, csv: PathBuf },
    /// Build a project file from a CSV file
    ImportCsv { csv: PathBuf, project: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> wbs_gantt::Result<()> {
    let settings = match &cli.config {
        Some(path) => EngineSettings::load_from(path),
        None => EngineSettings::load(),
    };

    match cli.command {
        Commands::Resolve {
            project,
            holidays,
            output,
        } => {
            let state = with_holidays(open(&project, settings)?, holidays.as_deref())?;
            let links: usize = state.dependency_map().values().map(Vec::len).sum();
            save(&state, output.as_deref().unwrap_or(&project))?;
            println!("Resolved {} rows ({} dependency links)", state.data().len(), links);
        }
        Commands::SetDates {
            project,
            row,
            start,
            end,
            holidays,
            output,
        } => {
            let state = with_holidays(open(&project, settings)?, holidays.as_deref())?;
            let id = row_id(&state, row)?;
            let start = parse_arg_date(&start)?;
            let action = match end {
                Some(end) => Action::SetPlannedDates {
                    id,
                    start,
                    end: parse_arg_date(&end)?,
                },
                None => Action::SetPlannedStart {
                    id,
                    date: Some(start),
                },
            };
            let state = state.try_apply(action)?;
            save(&state, output.as_deref().unwrap_or(&project))?;
            println!("Updated row {}", row);
        }
        Commands::Chain {
            project,
            rows,
            output,
        } => {
            let state = open(&project, settings)?;
            let ids = rows
                .iter()
                .map(|no| row_id(&state, *no))
                .collect::<wbs_gantt::Result<Vec<_>>>()?;
            let state = state.try_apply(Action::CreateTaskChain { ids })?;
            if let Some(message) = state.message_info() {
                println!("{}", message.message);
            }
            save(&state, output.as_deref().unwrap_or(&project))?;
        }
        Commands::ExportCsv { project, csv } => {
            let state = open(&project, settings)?;
            let count = io::export_csv(state.data(), &csv)?;
            println!("Exported {} rows to {}", count, csv.display());
        }
        Commands::ImportCsv { csv, project } => {
            let empty = AppState::new(settings.clone());
            let (rows, skipped) = io::import_csv(&csv, empty.calendar())?;
            let title = csv
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let data = ProjectData {
                title,
                data: RowMap::from_rows(rows),
                calendar: empty.calendar().clone(),
                ..Default::default()
            };
            let state = AppState::from_project(data, settings);
            save(&state, &project)?;
            println!("Imported {} rows ({} skipped)", state.data().len(), skipped);
        }
    }
    Ok(())
}

fn open(path: &Path, settings: EngineSettings) -> wbs_gantt::Result<AppState> {
    let project = io::load_project(path)?;
    Ok(AppState::from_project(project, settings))
}

/// Swap in the holidays listed in `path`, if given.
fn with_holidays(state: AppState, path: Option<&Path>) -> wbs_gantt::Result<AppState> {
    let Some(path) = path else {
        return Ok(state);
    };
    let holidays = parse_holidays(&std::fs::read_to_string(path)?);
    tracing::info!(count = holidays.len(), "loaded holidays from {}", path.display());
    state.try_apply(Action::SetHolidays(holidays))
}

fn save(state: &AppState, path: &Path) -> wbs_gantt::Result<()> {
    io::save_project(&state.project(), path)
}

fn row_id(state: &AppState, no: usize) -> wbs_gantt::Result<String> {
    state
        .data()
        .by_no(no)
        .map(|row| row.id().to_string())
        .ok_or_else(|| Error::RowNotFound(format!("row {}", no)))
}

fn parse_arg_date(text: &str) -> wbs_gantt::Result<chrono::NaiveDate> {
    parse_date(text).ok_or_else(|| Error::InvalidDate(text.to_string()))
}
