use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskboard::board::{ActionOutcome, BoardState, Reconciler, Renderer};
use taskboard::cli::{Cli, Command, MoveTarget, OutputFormat, SubtaskCommand};
use taskboard::config::Config;
use taskboard::store::HttpTaskStore;

/// `<data_local_dir>/taskboard/logs/taskboard.log`, or under `.` when the
/// platform has no data directory
fn log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskboard")
        .join("logs")
        .join("taskboard.log")
}

/// Route tracing to the log file; stdout is reserved for the board
///
/// `TASKBOARD_LOG` takes an `EnvFilter` directive and overrides `--verbose`.
fn setup_logging(verbose: bool) -> Result<()> {
    let path = log_path();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).wrap_err_with(|| format!("Failed to create {}", dir.display()))?;
    }
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .wrap_err_with(|| format!("Failed to open {}", path.display()))?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("TASKBOARD_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();

    info!(verbose, path = %path.display(), "setup_logging: initialised");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    config.validate()?;

    info!("Taskboard loaded config: base-url={}", config.api.base_url);

    let store = HttpTaskStore::from_config(&config.api).context("Failed to create task store client")?;
    let state = BoardState::spawn(Default::default());
    let reconciler = Reconciler::new(Arc::new(store), state.clone());
    let renderer = Renderer::new(config.output.color);

    let command = cli.command.unwrap_or(Command::Show {
        format: OutputFormat::Text,
    });
    let ok = run(&reconciler, &renderer, command).await?;

    state.shutdown().await?;
    if !ok {
        std::io::stdout().flush()?;
        std::process::exit(1);
    }
    Ok(())
}

/// Load the board, run one command and print the result
///
/// Returns false when the action was refused or failed.
async fn run(reconciler: &Reconciler, renderer: &Renderer, command: Command) -> Result<bool> {
    let loaded = reconciler.load().await?;
    if let Some(notice) = loaded.notice() {
        eprintln!("{}", renderer.render_notice(notice));
        if matches!(loaded, ActionOutcome::Failed(_)) && reconciler.snapshot().await?.is_empty() {
            return Ok(false);
        }
    }

    let outcome = match command {
        Command::Show { format } => {
            let forest = reconciler.snapshot().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&forest)?),
                OutputFormat::Text => print!("{}", renderer.render(&forest)),
            }
            return Ok(loaded.is_ok());
        }
        Command::Add { list, title } => {
            let forest = reconciler.snapshot().await?;
            match forest.list_by_kind(list).and_then(|l| l.id) {
                Some(list_id) => reconciler.create_task(list_id, &title).await?,
                None => {
                    eprintln!("{} List '{}' is not on the board", renderer.error_prefix(), list);
                    return Ok(false);
                }
            }
        }
        Command::Edit { task, title } => reconciler.edit_task(task, &title).await?,
        Command::Toggle { task } => reconciler.toggle_expansion(task).await?,
        Command::Complete { task } => reconciler.complete_task(task).await?,
        Command::Delete { task } => reconciler.delete_task(task).await?,
        Command::Subtask(sub) => match sub {
            SubtaskCommand::Add { parent, title } => reconciler.add_subtask(parent, &title).await?,
            SubtaskCommand::Edit { parent, subtask, title } => {
                reconciler.edit_subtask(parent, subtask, &title).await?
            }
            SubtaskCommand::Complete { parent, subtask } => reconciler.complete_subtask(parent, subtask).await?,
            SubtaskCommand::Delete { parent, subtask } => reconciler.delete_subtask(parent, subtask).await?,
        },
        Command::Move { task, target } => match target {
            MoveTarget::Left => reconciler.move_left(task).await?,
            MoveTarget::Right => reconciler.move_right(task).await?,
            MoveTarget::List(kind) => {
                let forest = reconciler.snapshot().await?;
                match forest.list_by_kind(kind).and_then(|l| l.id) {
                    Some(list_id) => reconciler.move_task(task, list_id).await?,
                    None => {
                        eprintln!("{} List '{}' is not on the board", renderer.error_prefix(), kind);
                        return Ok(false);
                    }
                }
            }
        },
    };

    if let Some(notice) = outcome.notice() {
        eprintln!("{}", renderer.render_notice(notice));
    }
    print!("{}", renderer.render(&reconciler.snapshot().await?));
    Ok(outcome.is_ok())
}
