pub mod cli;
pub mod error;
pub mod export;
pub mod marks;
pub mod media;
pub mod models;
pub mod segmentation;
pub mod settings;
pub mod timecode;
mod utils;

use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands, MarkArgs, TimelineArgs};
use marks::commands::{run_mark_session, MarkRequest};
use media::FfmpegTools;
use segmentation::commands::{run_timeline, TimelineRequest};
use settings::{SettingsStore, DEFAULT_SETTINGS_FILE};

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let store = SettingsStore::new(
        cli.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE)),
    )?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let result = runtime.block_on(dispatch(&cli, &store));
    // don't hang on a tool call that outlived its session
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}

async fn dispatch(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let mut settings = store.current();

    match &cli.command {
        Commands::Timeline(args) => {
            args.apply(&mut settings)?;
            save_if_requested(cli, store, &settings)?;
            timeline(args, settings.timeline).await
        }
        Commands::Mark(args) => {
            args.apply(&mut settings);
            save_if_requested(cli, store, &settings)?;
            mark(args, settings).await
        }
    }
}

fn save_if_requested(
    cli: &Cli,
    store: &SettingsStore,
    settings: &settings::CutterSettings,
) -> Result<()> {
    if cli.save_config {
        store.save(settings.clone())?;
        log::info!("Settings saved to {}", store.path().display());
    }
    Ok(())
}

async fn timeline(args: &TimelineArgs, settings: settings::TimelineSettings) -> Result<()> {
    let request = TimelineRequest {
        input: args.input.clone(),
        out_dir: args.out_dir.clone(),
        settings,
    };

    tokio::task::spawn_blocking(move || -> Result<()> {
        let tools = FfmpegTools::default();
        tools.require_tools()?;
        run_timeline(&request, &tools)?;
        Ok(())
    })
    .await
    .context("timeline task failed to join")?
}

async fn mark(args: &MarkArgs, settings: settings::CutterSettings) -> Result<()> {
    let tools = Arc::new(FfmpegTools::default());
    {
        let tools = Arc::clone(&tools);
        tokio::task::spawn_blocking(move || tools.require_tools())
            .await
            .context("tool check failed to join")??;
    }

    let request = MarkRequest {
        input: args.input.clone(),
        headless: args.headless,
        ffplay_bin: args.ffplay.clone(),
        marking: settings.marking,
        export: settings.export,
        keymap: settings.keymap,
    };

    let summary = run_mark_session(request, tools, BufReader::new(std::io::stdin())).await?;
    let failed: usize = summary.exports.iter().map(|report| report.failed_count()).sum();
    if failed > 0 || !summary.export_failures.is_empty() {
        log::warn!(
            "{failed} clip(s) failed to export, {} export(s) failed outright",
            summary.export_failures.len()
        );
    }
    Ok(())
}
