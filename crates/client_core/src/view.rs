//! Binding between the workflow and whatever layer draws it.

use crate::{notice::Notification, render::ResultDisplay, selection::PreviewInfo};

/// Top-level page sections; exactly one is visible at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Drop zone, or the preview of the selected file.
    Upload,
    Loading,
    Result,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Loading => "loading",
            Self::Result => "result",
        }
    }
}

/// Capabilities the workflow drives. Calls arrive in transition order and
/// never concurrently.
pub trait WorkflowView: Send + Sync {
    fn show_section(&self, section: Section);
    fn set_progress(&self, percent: u8);
    /// `None` clears every rendered result field.
    fn set_result_fields(&self, model: Option<&ResultDisplay>);
    /// `None` hides the preview and brings back the drop zone.
    fn set_preview(&self, preview: Option<&PreviewInfo>);
    fn set_drop_highlight(&self, active: bool);
    /// Blocking user notification.
    fn notify(&self, notice: &Notification);
}
