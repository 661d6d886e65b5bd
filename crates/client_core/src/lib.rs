//! Client-side controller for submitting a video to the deepfake analysis
//! service and presenting its verdict.

pub mod notice;
pub mod render;
pub mod selection;
pub mod submission;
pub mod view;
pub mod workflow;

pub use notice::{NoticeCategory, Notification};
pub use render::{render_verdict, MetricLine, ResultDisplay, ResultRenderer, Tone};
pub use selection::{
    BlobUrlRegistry, DragDisposition, PreviewInfo, PreviewProvider, SelectedFile,
    SelectionSource, VideoCandidate, DEFAULT_MAX_UPLOAD_BYTES,
};
pub use submission::{
    AnalysisService, HttpAnalysisService, ProgressPolicy, ProgressTicker, TickControl,
    VideoUpload,
};
pub use view::{Section, WorkflowView};
pub use workflow::{
    DropOutcome, SelectOutcome, SubmitOutcome, VideoWorkflow, WorkflowConfig, WorkflowError,
    WorkflowSnapshot, WorkflowState,
};
