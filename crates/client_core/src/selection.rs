//! File selection: validation, preview handles and the selected file.

use std::{collections::HashSet, sync::Arc, sync::Mutex};

use anyhow::{anyhow, Result};
use uuid::Uuid;

use crate::notice::Notification;

const VIDEO_MIME_PREFIX: &str = "video/";
const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Upload cap enforced by the analysis service.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 500 * BYTES_PER_MIB;

/// How a candidate reached the selection manager. Both paths share the same
/// validation; only the rejection wording differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Picker,
    DragDrop,
}

/// Returned for drag-over and drop events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragDisposition {
    /// The host must suppress its default navigation for this event.
    PreventDefault,
}

/// A file offered by the user, not yet accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCandidate {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl VideoCandidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with(VIDEO_MIME_PREFIX)
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewInfo {
    pub name: String,
    pub mime_type: String,
    pub url: String,
    pub size_bytes: u64,
}

/// An accepted file together with its live preview reference.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    name: String,
    mime_type: String,
    preview_url: String,
    bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub(crate) fn new(candidate: VideoCandidate, preview_url: String) -> Self {
        Self {
            name: candidate.name,
            mime_type: candidate.mime_type,
            preview_url,
            bytes: candidate.bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn preview_url(&self) -> &str {
        &self.preview_url
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn preview_info(&self) -> PreviewInfo {
        PreviewInfo {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            url: self.preview_url.clone(),
            size_bytes: self.bytes.len() as u64,
        }
    }
}

/// Checks a candidate before anything is allocated for it.
pub fn validate_candidate(
    candidate: Option<VideoCandidate>,
    source: SelectionSource,
    max_upload_bytes: u64,
) -> Result<VideoCandidate, Notification> {
    let Some(candidate) = candidate else {
        return Err(match source {
            SelectionSource::Picker => Notification::validation("Please select a video file first"),
            SelectionSource::DragDrop => Notification::validation("Please drop a valid video file"),
        });
    };

    if !candidate.is_video() {
        return Err(match source {
            SelectionSource::Picker => Notification::validation(format!(
                "'{}' is not a video file ({})",
                candidate.name, candidate.mime_type
            )),
            SelectionSource::DragDrop => Notification::validation("Please drop a valid video file"),
        });
    }

    if candidate.size_bytes() > max_upload_bytes {
        return Err(Notification::validation(format!(
            "'{}' exceeds the {} MB upload limit",
            candidate.name,
            max_upload_bytes / BYTES_PER_MIB
        )));
    }

    Ok(candidate)
}

/// Issues and releases local preview references for selected files.
pub trait PreviewProvider: Send + Sync {
    fn create(&self, candidate: &VideoCandidate) -> Result<String>;
    fn revoke(&self, url: &str);
}

/// In-memory registry handing out `blob:` style references.
#[derive(Debug, Default)]
pub struct BlobUrlRegistry {
    live: Mutex<HashSet<String>>,
}

impl BlobUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or_default()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live
            .lock()
            .map(|live| live.contains(url))
            .unwrap_or(false)
    }
}

impl PreviewProvider for BlobUrlRegistry {
    fn create(&self, _candidate: &VideoCandidate) -> Result<String> {
        let url = format!("blob:analyzer/{}", Uuid::new_v4());
        self.live
            .lock()
            .map_err(|_| anyhow!("preview registry lock poisoned"))?
            .insert(url.clone());
        Ok(url)
    }

    fn revoke(&self, url: &str) {
        if let Ok(mut live) = self.live.lock() {
            if !live.remove(url) {
                tracing::debug!(url, "revoke for unknown preview reference");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp4(bytes: usize) -> VideoCandidate {
        VideoCandidate::new("clip.mp4", "video/mp4", vec![0; bytes])
    }

    #[test]
    fn accepts_any_video_subtype() {
        for mime in ["video/mp4", "video/webm", "video/x-matroska", "video/quicktime"] {
            let candidate = VideoCandidate::new("clip", mime, vec![1, 2, 3]);
            assert!(
                validate_candidate(Some(candidate), SelectionSource::Picker, 1024).is_ok(),
                "{mime} should be accepted"
            );
        }
    }

    #[test]
    fn mime_prefix_match_is_exact() {
        for mime in ["Video/QuickTime", " video/mp4", "application/video", ""] {
            let candidate = VideoCandidate::new("clip", mime, vec![1]);
            assert!(!candidate.is_video(), "{mime:?} should be rejected");
        }
    }

    #[test]
    fn rejects_non_video_with_source_specific_wording() {
        let image = VideoCandidate::new("photo.png", "image/png", vec![1]);

        let picked = validate_candidate(Some(image.clone()), SelectionSource::Picker, 1024)
            .expect_err("image rejected");
        assert!(picked.message().contains("photo.png"));

        let dropped = validate_candidate(Some(image), SelectionSource::DragDrop, 1024)
            .expect_err("image rejected");
        assert_eq!(dropped.message(), "Please drop a valid video file");
    }

    #[test]
    fn rejects_missing_candidate() {
        let notice = validate_candidate(None, SelectionSource::Picker, 1024).expect_err("none");
        assert_eq!(notice.message(), "Please select a video file first");
    }

    #[test]
    fn rejects_files_over_the_upload_limit() {
        let limit = 2 * 1024 * 1024;
        let notice = validate_candidate(Some(mp4(limit as usize + 1)), SelectionSource::Picker, limit)
            .expect_err("too large");
        assert!(notice.message().contains("2 MB"), "{}", notice.message());
        assert!(validate_candidate(Some(mp4(16)), SelectionSource::Picker, 16).is_ok());
    }

    #[test]
    fn registry_tracks_live_references_until_revoked() {
        let registry = BlobUrlRegistry::new();
        let first = registry.create(&mp4(1)).expect("create");
        let second = registry.create(&mp4(1)).expect("create");
        assert_ne!(first, second);
        assert!(first.starts_with("blob:"));
        assert_eq!(registry.live_count(), 2);

        registry.revoke(&first);
        assert!(!registry.is_live(&first));
        assert!(registry.is_live(&second));
        assert_eq!(registry.live_count(), 1);
    }
}
