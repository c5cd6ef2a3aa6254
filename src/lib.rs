#[macro_use]
mod utils;

pub mod analysis;
pub mod cli;
pub mod commands;
pub mod db;
pub mod exercise;
pub mod feedback;
pub mod pipeline;
pub mod pose;
pub mod settings;
pub mod source;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use cli::{Cli, Command};
use commands::AppState;
use db::Database;
use exercise::Catalog;
use settings::SettingsStore;

const DATA_DIR: &str = ".repcoach";

/// Parses the command line, runs one command and prints its result.
pub fn run() -> Result<()> {
    // RUST_LOG overrides the default level
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(execute(cli))
}

async fn execute(cli: Cli) -> Result<()> {
    let data_dir = PathBuf::from(DATA_DIR);
    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| data_dir.join("settings.json"));
    let store = SettingsStore::new(settings_path)?;
    let mut settings = store.get();
    settings.apply_env_overrides()?;

    let db = if cli.command.needs_history(cli.no_save) {
        Some(Database::new(settings.database_path(&data_dir))?)
    } else {
        None
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, abandoning feedback request");
                cancel.cancel();
            }
        });
    }

    let state = AppState {
        catalog: Arc::new(Catalog::builtin()?),
        settings,
        db,
        cancel,
        use_feedback: !cli.no_feedback,
        save: !cli.no_save,
    };

    let output = match &cli.command {
        Command::Analyze { exercise, input } => {
            let report = commands::analyze(&state, exercise, input).await?;
            render(cli.json, &report, commands::render_report)?
        }
        Command::Simulate {
            exercise,
            reps,
            seed,
        } => {
            let report = commands::simulate(&state, exercise, *reps, *seed).await?;
            render(cli.json, &report, commands::render_report)?
        }
        Command::History {
            limit,
            offset,
            exercise,
        } => {
            let summaries =
                commands::history(&state, *limit, *offset, exercise.as_deref()).await?;
            render(cli.json, summaries.as_slice(), commands::render_history)?
        }
        Command::Show { id } => {
            let report = commands::show(&state, *id).await?;
            render(cli.json, &report, commands::render_report)?
        }
        Command::Delete { id } => {
            commands::delete(&state, *id).await?;
            format!("Deleted {id}")
        }
        Command::Config { write } => {
            if *write {
                store.update(store.get())?;
                info!("Wrote settings to {}", store.path().display());
            }
            commands::to_json(&state.settings)?
        }
    };

    println!("{output}");
    Ok(())
}

fn render<T: serde::Serialize + ?Sized>(
    json: bool,
    value: &T,
    text: impl Fn(&T) -> String,
) -> Result<String> {
    if json {
        commands::to_json(value)
    } else {
        Ok(text(value))
    }
}
