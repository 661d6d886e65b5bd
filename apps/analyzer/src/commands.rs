//! Terminal commands and their mapping onto workflow transitions.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use client_core::{SelectionSource, SubmitOutcome, VideoCandidate, VideoWorkflow};

pub const HELP: &str = "\
commands:
  select [path]   choose a video (no path = cancelled picker)
  drop [path]     drop a file onto the upload area
  change          change video
  analyze         submit the selected video
  another         analyze another video
  status          show the current workflow state
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select(Option<PathBuf>),
    Drop(Option<PathBuf>),
    Change,
    Analyze,
    Another,
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map(|(verb, rest)| (verb, rest.trim()))
            .unwrap_or((line, ""));
        let path = (!rest.is_empty()).then(|| PathBuf::from(rest));

        match verb.to_ascii_lowercase().as_str() {
            "select" | "open" => Ok(Self::Select(path)),
            "drop" => Ok(Self::Drop(path)),
            "change" => Ok(Self::Change),
            "analyze" | "analyse" => Ok(Self::Analyze),
            "another" | "reset" => Ok(Self::Another),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "" => Err(anyhow!("empty command")),
            other => Err(anyhow!("unknown command '{other}'; type 'help'")),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Select(_) => "select",
            Self::Drop(_) => "drop",
            Self::Change => "change",
            Self::Analyze => "analyze",
            Self::Another => "another",
            Self::Status => "status",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

pub async fn load_candidate(path: &Path) -> Result<VideoCandidate> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(VideoCandidate::new(name, mime_type, bytes))
}

async fn candidate_from(path: Option<&Path>) -> Result<Option<VideoCandidate>> {
    match path {
        Some(path) => load_candidate(path).await.map(Some),
        None => Ok(None),
    }
}

/// Runs one command. Returns `false` when the loop should stop.
pub async fn dispatch(workflow: &std::sync::Arc<VideoWorkflow>, command: Command) -> Result<bool> {
    tracing::debug!(command = command.name(), "dispatching command");
    match command {
        Command::Select(path) => {
            let candidate = candidate_from(path.as_deref()).await?;
            workflow
                .select_file(candidate, SelectionSource::Picker)
                .await?;
        }
        Command::Drop(path) => {
            let candidate = candidate_from(path.as_deref()).await?;
            workflow.drag_over().await;
            workflow.drop_file(candidate).await?;
        }
        Command::Change => workflow.change_video().await,
        Command::Analyze => {
            if let SubmitOutcome::Superseded = workflow.submit().await? {
                tracing::info!("analysis result discarded");
            }
        }
        Command::Another => workflow.reset_to_idle().await,
        Command::Status => {
            let snapshot = workflow.snapshot().await;
            println!("state: {}", snapshot.state);
            println!("progress: {}%", snapshot.progress);
            match snapshot.selected {
                Some(selected) => println!("selected: {} ({})", selected.name, selected.url),
                None => println!("selected: none"),
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}
