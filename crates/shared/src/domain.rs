use serde::{Deserialize, Serialize};

/// Per-frame aggregate measurements reported by the analysis service.
///
/// Every attribute is independently optional; the service may omit any of
/// them and renderers must not invent placeholders for missing ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_variance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_density: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symmetry: Option<f64>,
}

impl Metrics {
    pub fn is_empty(&self) -> bool {
        self.color_variance.is_none()
            && self.edge_density.is_none()
            && self.consistency.is_none()
            && self.symmetry.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerdictResult {
    pub is_deepfake: bool,
    /// Certainty of the verdict in `[0, 1]`.
    pub confidence: f64,
    /// Raw deepfake score in `[0, 1]`.
    pub score: f64,
    pub frames_analyzed: Option<u32>,
    pub details: Option<Metrics>,
}
