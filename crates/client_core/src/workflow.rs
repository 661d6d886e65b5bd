//! The analysis workflow state machine.
//!
//! Every user action maps to one async transition on [`VideoWorkflow`]. The
//! workflow owns the selected file, the progress value and the rendered
//! result; the view only ever receives copies.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use shared::error::ResponseError;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    notice::Notification,
    render::{ResultDisplay, ResultRenderer},
    selection::{
        validate_candidate, DragDisposition, PreviewInfo, PreviewProvider, SelectedFile,
        SelectionSource, VideoCandidate, DEFAULT_MAX_UPLOAD_BYTES,
    },
    submission::{AnalysisService, ProgressPolicy, ProgressTicker, TickControl, VideoUpload},
    view::{Section, WorkflowView},
};

const UNREACHABLE_SERVICE_MESSAGE: &str =
    "Error analyzing video: the analysis service could not be reached";
const UNREADABLE_RESPONSE_MESSAGE: &str =
    "Error analyzing video: the analysis service returned an unreadable response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    Idle,
    Previewing,
    Submitting,
    ShowingResult,
    ShowingError,
}

impl WorkflowState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Previewing => "previewing",
            Self::Submitting => "submitting",
            Self::ShowingResult => "showing_result",
            Self::ShowingError => "showing_error",
        }
    }

    /// States from which a new submission may start.
    pub fn can_submit(self) -> bool {
        matches!(
            self,
            Self::Previewing | Self::ShowingResult | Self::ShowingError
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub progress: ProgressPolicy,
    pub max_upload_bytes: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            progress: ProgressPolicy::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Caller precondition violations. User-facing problems are reported as
/// [`Notification`]s instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: WorkflowState,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Accepted(PreviewInfo),
    Rejected(Notification),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropOutcome {
    pub disposition: DragDisposition,
    pub selection: SelectOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed(ResultDisplay),
    Failed(Notification),
    /// Nothing was sent; the notice explains why.
    Rejected(Notification),
    /// The selection was cleared while the request was outstanding; the
    /// response was discarded.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    pub progress: u8,
    pub selected: Option<PreviewInfo>,
    pub result: Option<ResultDisplay>,
    pub drop_highlight: bool,
}

struct WorkflowInner {
    state: WorkflowState,
    selected: Option<SelectedFile>,
    progress: u8,
    renderer: ResultRenderer,
    /// Bumped on every submission and every clear; ticks and responses from
    /// an older generation are ignored.
    generation: u64,
    drop_highlight: bool,
}

pub struct VideoWorkflow {
    config: WorkflowConfig,
    service: Arc<dyn AnalysisService>,
    previews: Arc<dyn PreviewProvider>,
    view: Arc<dyn WorkflowView>,
    inner: Mutex<WorkflowInner>,
    /// Set while a request is outstanding, even after its generation has
    /// been superseded by a clear.
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

enum SubmissionFailure {
    Transport(anyhow::Error),
    Response(ResponseError),
}

impl SubmissionFailure {
    fn notice(&self) -> Notification {
        match self {
            Self::Response(ResponseError::Service(message)) => Notification::service(message),
            Self::Response(_) => Notification::transport(UNREADABLE_RESPONSE_MESSAGE),
            Self::Transport(_) => Notification::transport(UNREACHABLE_SERVICE_MESSAGE),
        }
    }
}

impl fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "{err:#}"),
            Self::Response(err) => write!(f, "{err}"),
        }
    }
}

impl VideoWorkflow {
    pub fn new(
        config: WorkflowConfig,
        service: Arc<dyn AnalysisService>,
        previews: Arc<dyn PreviewProvider>,
        view: Arc<dyn WorkflowView>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            service,
            previews,
            view,
            inner: Mutex::new(WorkflowInner {
                state: WorkflowState::Idle,
                selected: None,
                progress: 0,
                renderer: ResultRenderer::default(),
                generation: 0,
                drop_highlight: false,
            }),
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub async fn state(&self) -> WorkflowState {
        self.inner.lock().await.state
    }

    pub async fn progress(&self) -> u8 {
        self.inner.lock().await.progress
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let inner = self.inner.lock().await;
        WorkflowSnapshot {
            state: inner.state,
            progress: inner.progress,
            selected: inner.selected.as_ref().map(SelectedFile::preview_info),
            result: inner.renderer.current().cloned(),
            drop_highlight: inner.drop_highlight,
        }
    }

    /// Accepts a file chosen through the picker or a drop.
    pub async fn select_file(
        &self,
        candidate: Option<VideoCandidate>,
        source: SelectionSource,
    ) -> Result<SelectOutcome, WorkflowError> {
        let mut inner = self.inner.lock().await;
        if inner.state == WorkflowState::Submitting {
            return Err(WorkflowError::InvalidTransition {
                action: "select a file",
                state: inner.state,
            });
        }

        let candidate = match validate_candidate(candidate, source, self.config.max_upload_bytes)
        {
            Ok(candidate) => candidate,
            Err(notice) => {
                warn!(state = %inner.state, ?source, reason = notice.message(), "file rejected");
                self.view.notify(&notice);
                return Ok(SelectOutcome::Rejected(notice));
            }
        };

        let preview_url = match self.previews.create(&candidate) {
            Ok(url) => url,
            Err(err) => {
                error!(file = %candidate.name, error = %err, "failed to create preview");
                let notice =
                    Notification::validation(format!("Could not preview '{}'", candidate.name));
                self.view.notify(&notice);
                return Ok(SelectOutcome::Rejected(notice));
            }
        };

        if let Some(previous) = inner.selected.take() {
            debug!(file = previous.name(), "replacing selected file");
            self.previews.revoke(previous.preview_url());
        }
        self.reset_result(&mut inner);

        let file = SelectedFile::new(candidate, preview_url);
        let info = file.preview_info();
        inner.selected = Some(file);
        inner.state = WorkflowState::Previewing;

        self.view.set_preview(Some(&info));
        self.view.show_section(Section::Upload);
        info!(
            file = %info.name,
            mime_type = %info.mime_type,
            size_bytes = info.size_bytes,
            ?source,
            "file selected"
        );
        Ok(SelectOutcome::Accepted(info))
    }

    /// Releases the preview and returns to `Idle` from any state.
    pub async fn clear_selection(&self) {
        let mut inner = self.inner.lock().await;
        self.clear_locked(&mut inner);
    }

    /// The "change video" action.
    pub async fn change_video(&self) {
        self.clear_selection().await;
    }

    /// The "analyze another" action: clears the selection, the rendered
    /// result and the progress bar.
    pub async fn reset_to_idle(&self) {
        let mut inner = self.inner.lock().await;
        self.reset_result(&mut inner);
        self.clear_locked(&mut inner);
        inner.progress = 0;
        self.view.set_progress(0);
    }

    pub async fn drag_over(&self) -> DragDisposition {
        let mut inner = self.inner.lock().await;
        if !inner.drop_highlight {
            inner.drop_highlight = true;
            self.view.set_drop_highlight(true);
        }
        DragDisposition::PreventDefault
    }

    pub async fn drag_leave(&self) {
        let mut inner = self.inner.lock().await;
        self.clear_highlight(&mut inner);
    }

    pub async fn drop_file(
        &self,
        candidate: Option<VideoCandidate>,
    ) -> Result<DropOutcome, WorkflowError> {
        {
            let mut inner = self.inner.lock().await;
            self.clear_highlight(&mut inner);
        }
        let selection = self.select_file(candidate, SelectionSource::DragDrop).await?;
        Ok(DropOutcome {
            disposition: DragDisposition::PreventDefault,
            selection,
        })
    }

    /// The "analyze" action. Resolves once the request has settled.
    ///
    /// Calling this again before the previous request settles is a caller
    /// error, including after the selection was cleared mid-request.
    pub async fn submit(self: &Arc<Self>) -> Result<SubmitOutcome, WorkflowError> {
        let (upload, generation, _in_flight) = {
            let mut inner = self.inner.lock().await;
            if inner.state == WorkflowState::Submitting || self.in_flight.load(Ordering::Acquire)
            {
                warn!(state = %inner.state, "submit while a request is outstanding");
                return Err(WorkflowError::SubmissionInFlight);
            }

            let upload = match inner.selected.as_ref() {
                Some(file) if inner.state.can_submit() => VideoUpload {
                    file_name: file.name().to_string(),
                    mime_type: file.mime_type().to_string(),
                    bytes: file.bytes(),
                },
                _ => {
                    let notice = Notification::validation("Please select a video file first");
                    warn!(state = %inner.state, "submit without a selected file");
                    self.view.notify(&notice);
                    return Ok(SubmitOutcome::Rejected(notice));
                }
            };

            self.in_flight.store(true, Ordering::Release);
            let guard = InFlightGuard(&self.in_flight);
            inner.generation += 1;
            inner.state = WorkflowState::Submitting;
            inner.progress = 0;
            self.reset_result(&mut inner);
            self.view.set_progress(0);
            self.view.show_section(Section::Loading);
            info!(
                file = %upload.file_name,
                generation = inner.generation,
                "submitting video for analysis"
            );
            (upload, inner.generation, guard)
        };

        let ticker = self.start_ticker(generation);
        let response = self.service.analyze(upload).await;
        ticker.cancel().await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation || inner.state != WorkflowState::Submitting {
            info!(
                generation,
                state = %inner.state,
                "discarding response for superseded submission"
            );
            return Ok(SubmitOutcome::Superseded);
        }

        inner.progress = 100;
        self.view.set_progress(100);

        let verdict = response
            .map_err(SubmissionFailure::Transport)
            .and_then(|body| body.into_verdict().map_err(SubmissionFailure::Response));

        match verdict {
            Ok(verdict) => {
                let model = inner.renderer.render(&verdict).clone();
                self.view.set_result_fields(Some(&model));
                inner.state = WorkflowState::ShowingResult;
                self.view.show_section(Section::Result);
                info!(
                    is_deepfake = verdict.is_deepfake,
                    confidence = model.confidence_percent,
                    "analysis completed"
                );
                Ok(SubmitOutcome::Completed(model))
            }
            Err(failure) => {
                let notice = failure.notice();
                warn!(error = %failure, category = ?notice.category(), "analysis failed");
                inner.state = WorkflowState::ShowingError;
                self.view.show_section(Section::Upload);
                self.view.notify(&notice);
                Ok(SubmitOutcome::Failed(notice))
            }
        }
    }

    fn start_ticker(self: &Arc<Self>, generation: u64) -> ProgressTicker {
        let workflow = Arc::clone(self);
        let policy = self.config.progress;
        ProgressTicker::start(policy, move || {
            let workflow = Arc::clone(&workflow);
            async move { workflow.apply_tick(generation, policy).await }
        })
    }

    async fn apply_tick(&self, generation: u64, policy: ProgressPolicy) -> TickControl {
        let mut inner = self.inner.lock().await;
        if inner.state != WorkflowState::Submitting || inner.generation != generation {
            return TickControl::Stop;
        }

        let next = policy.advance(inner.progress);
        if next != inner.progress {
            inner.progress = next;
            self.view.set_progress(next);
            debug!(progress = next, "synthetic progress tick");
        }
        TickControl::Continue
    }

    fn clear_locked(&self, inner: &mut WorkflowInner) {
        if let Some(previous) = inner.selected.take() {
            self.previews.revoke(previous.preview_url());
            info!(file = previous.name(), state = %inner.state, "selection cleared");
        }
        if inner.state == WorkflowState::Submitting {
            warn!("selection cleared while a submission is outstanding");
        }
        self.reset_result(inner);
        inner.generation += 1;
        inner.state = WorkflowState::Idle;
        self.view.set_preview(None);
        self.view.show_section(Section::Upload);
    }

    fn reset_result(&self, inner: &mut WorkflowInner) {
        if inner.renderer.current().is_some() {
            inner.renderer.reset();
            self.view.set_result_fields(None);
        }
    }

    fn clear_highlight(&self, inner: &mut WorkflowInner) {
        if inner.drop_highlight {
            inner.drop_highlight = false;
            self.view.set_drop_highlight(false);
        }
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
