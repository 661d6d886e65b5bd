//! Plain-text rendering of the workflow.

use std::io::{self, Write};

use client_core::{
    Notification, PreviewInfo, ResultDisplay, Section, Tone, WorkflowView,
};

const BAR_WIDTH: usize = 20;

#[derive(Debug, Default)]
pub struct TerminalView;

pub fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!(
        "[{}{}] {percent:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled)
    )
}

pub fn format_result(model: &ResultDisplay) -> String {
    let marker = match model.tone {
        Tone::Alert => "!!",
        Tone::Reassure => "ok",
    };
    let mut out = format!(
        "{marker} {}\n   {}\n   confidence {}\n   Frames Analyzed: {}\n   Deepfake Score: {}\n",
        model.label,
        model.message,
        progress_bar(model.confidence_fill),
        model.frames_analyzed,
        model.score_percent
    );
    if model.has_details {
        out.push_str("   Analysis Details\n");
        for line in &model.metrics {
            out.push_str(&format!("     {}: {}\n", line.label, line.value));
        }
    }
    out
}

impl WorkflowView for TerminalView {
    fn show_section(&self, section: Section) {
        tracing::debug!(section = section.as_str(), "section shown");
        if section == Section::Loading {
            println!("Analyzing video...");
        }
    }

    fn set_progress(&self, percent: u8) {
        let mut stdout = io::stdout().lock();
        let _ = write!(stdout, "\r{}", progress_bar(percent));
        if percent >= 100 {
            let _ = writeln!(stdout);
        }
        let _ = stdout.flush();
    }

    fn set_result_fields(&self, model: Option<&ResultDisplay>) {
        if let Some(model) = model {
            print!("{}", format_result(model));
        }
    }

    fn set_preview(&self, preview: Option<&PreviewInfo>) {
        match preview {
            Some(preview) => println!(
                "Selected {} ({}, {} bytes) preview at {}",
                preview.name, preview.mime_type, preview.size_bytes, preview.url
            ),
            None => println!("Drop a video here or use 'select <path>'"),
        }
    }

    fn set_drop_highlight(&self, active: bool) {
        tracing::debug!(active, "drop highlight");
    }

    fn notify(&self, notice: &Notification) {
        eprintln!("\n** {notice}");
    }
}
