use serde::{Deserialize, Serialize};

use crate::{
    domain::{Metrics, VerdictResult},
    error::ResponseError,
};

/// Multipart field name carrying the uploaded video.
pub const VIDEO_FIELD: &str = "video";

/// Default path of the analysis endpoint, relative to the server URL.
pub const UPLOAD_PATH: &str = "/upload";

/// JSON body returned by the analysis endpoint.
///
/// Error and success bodies share one shape, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deepfake: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames_analyzed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Metrics>,
}

impl AnalysisResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self, ResponseError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Non-empty service error message, if any.
    pub fn service_error(&self) -> Option<&str> {
        self.error
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }

    /// Converts the wire body into a verdict.
    ///
    /// A non-empty `error` wins over every other field.
    pub fn into_verdict(self) -> Result<VerdictResult, ResponseError> {
        if let Some(message) = self.service_error() {
            return Err(ResponseError::Service(message.to_string()));
        }

        Ok(VerdictResult {
            is_deepfake: self
                .is_deepfake
                .ok_or(ResponseError::MissingField("is_deepfake"))?,
            confidence: self
                .confidence
                .ok_or(ResponseError::MissingField("confidence"))?,
            score: self.score.ok_or(ResponseError::MissingField("score"))?,
            frames_analyzed: self.frames_analyzed,
            details: self.details,
        })
    }
}
