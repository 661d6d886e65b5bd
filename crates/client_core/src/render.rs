//! Verdict-to-display mapping.

use shared::domain::{Metrics, VerdictResult};

pub const DEEPFAKE_LABEL: &str = "Deepfake Detected";
pub const AUTHENTIC_LABEL: &str = "Authentic Video";
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Alert,
    Reassure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricLine {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDisplay {
    pub label: &'static str,
    pub message: String,
    pub tone: Tone,
    pub confidence_percent: i64,
    /// Width of the confidence bar, always within `0..=100`.
    pub confidence_fill: u8,
    /// Score as a percentage with one decimal, e.g. `62.3%`.
    pub score_percent: String,
    pub frames_analyzed: String,
    /// Whether the payload carried a `details` block at all.
    pub has_details: bool,
    pub metrics: Vec<MetricLine>,
}

#[derive(Debug, Clone, Copy)]
enum Precision {
    /// Variance-like magnitudes.
    Magnitude,
    /// Densities and ratios.
    Ratio,
}

impl Precision {
    fn format(self, value: f64) -> String {
        match self {
            Self::Magnitude => fixed(value, 2),
            Self::Ratio => fixed(value, 3),
        }
    }
}

/// Fixed-point formatting with ties rounded away from zero. `{:.N}` alone
/// rounds exact binary ties to even.
fn fixed(value: f64, decimals: usize) -> String {
    let scale = 10f64.powi(decimals as i32);
    format!("{:.*}", decimals, (value * scale).round() / scale)
}

fn metric_specs(metrics: &Metrics) -> [(&'static str, &'static str, Option<f64>, Precision); 4] {
    [
        (
            "color_variance",
            "Color Variance",
            metrics.color_variance,
            Precision::Magnitude,
        ),
        (
            "edge_density",
            "Edge Density",
            metrics.edge_density,
            Precision::Ratio,
        ),
        (
            "consistency",
            "Frame Consistency",
            metrics.consistency,
            Precision::Magnitude,
        ),
        (
            "symmetry",
            "Face Symmetry Difference",
            metrics.symmetry,
            Precision::Magnitude,
        ),
    ]
}

pub fn render_verdict(result: &VerdictResult) -> ResultDisplay {
    let confidence_percent = (result.confidence * 100.0).round() as i64;
    let confidence_fill = confidence_percent.clamp(0, 100) as u8;

    let (label, tone, verdict_word) = if result.is_deepfake {
        (DEEPFAKE_LABEL, Tone::Alert, "a deepfake")
    } else {
        (AUTHENTIC_LABEL, Tone::Reassure, "authentic")
    };

    let metrics = result
        .details
        .as_ref()
        .map(|details| {
            metric_specs(details)
                .into_iter()
                .filter_map(|(key, label, value, precision)| {
                    value.map(|value| MetricLine {
                        key,
                        label,
                        value: precision.format(value),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    ResultDisplay {
        label,
        message: format!(
            "This video appears to be {verdict_word} with {confidence_percent}% confidence."
        ),
        tone,
        confidence_percent,
        confidence_fill,
        score_percent: format!("{}%", fixed(result.score * 100.0, 1)),
        frames_analyzed: result
            .frames_analyzed
            .map(|frames| frames.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        has_details: result.details.is_some(),
        metrics,
    }
}

/// Holds the currently rendered result, if any.
#[derive(Debug, Default)]
pub struct ResultRenderer {
    current: Option<ResultDisplay>,
}

impl ResultRenderer {
    pub fn render(&mut self, result: &VerdictResult) -> &ResultDisplay {
        self.current.insert(render_verdict(result))
    }

    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&ResultDisplay> {
        self.current.as_ref()
    }
}
