use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use clap::Parser;
use client_core::{
    BlobUrlRegistry, HttpAnalysisService, SelectOutcome, SelectionSource, SubmitOutcome,
    VideoWorkflow,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod terminal;

use commands::{dispatch, load_candidate, Command, HELP};

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the analysis service.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long, default_value = "analyzer.toml")]
    config: PathBuf,
    /// Analyze this file and exit instead of reading commands from stdin.
    #[arg(long)]
    video: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings(&args.config);
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }

    let service =
        HttpAnalysisService::with_upload_path(&settings.server_url, &settings.upload_path)?;
    tracing::info!(endpoint = %service.endpoint(), "analysis service configured");

    let workflow = VideoWorkflow::new(
        settings.workflow_config(),
        Arc::new(service),
        Arc::new(BlobUrlRegistry::new()),
        Arc::new(terminal::TerminalView),
    );

    match args.video {
        Some(path) => analyze_once(&workflow, path).await,
        None => run_interactive(&workflow).await,
    }
}

async fn analyze_once(workflow: &Arc<VideoWorkflow>, path: PathBuf) -> Result<()> {
    let candidate = load_candidate(&path).await?;
    if let SelectOutcome::Rejected(notice) = workflow
        .select_file(Some(candidate), SelectionSource::Picker)
        .await?
    {
        return Err(anyhow!(notice));
    }

    match workflow.submit().await? {
        SubmitOutcome::Completed(_) => Ok(()),
        SubmitOutcome::Failed(notice) | SubmitOutcome::Rejected(notice) => Err(anyhow!(notice)),
        SubmitOutcome::Superseded => Err(anyhow!("analysis was superseded")),
    }
}

async fn run_interactive(workflow: &Arc<VideoWorkflow>) -> Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        match dispatch(workflow, command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => eprintln!("{err:#}"),
        }
    }
    workflow.clear_selection().await;
    Ok(())
}
