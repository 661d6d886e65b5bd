use std::{collections::HashMap, fs, path::Path, time::Duration};

use client_core::{ProgressPolicy, WorkflowConfig, DEFAULT_MAX_UPLOAD_BYTES};
use shared::protocol::UPLOAD_PATH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub upload_path: String,
    pub tick_interval_ms: u64,
    pub tick_step: u8,
    pub max_upload_bytes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            upload_path: UPLOAD_PATH.into(),
            tick_interval_ms: 200,
            tick_step: 10,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            progress: ProgressPolicy {
                interval: Duration::from_millis(self.tick_interval_ms.max(1)),
                step: self.tick_step.max(1),
                ..ProgressPolicy::default()
            },
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

pub fn load_settings(config_path: &Path) -> Settings {
    load_settings_with(config_path, |key| std::env::var(key).ok())
}

/// Defaults, then the optional TOML file, then environment variables.
pub fn load_settings_with(config_path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => apply_file_config(&mut settings, &file_cfg),
            Err(err) => tracing::warn!(
                path = %config_path.display(),
                error = %err,
                "ignoring unreadable config file"
            ),
        }
    }

    if let Some(v) = env("ANALYZER_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__UPLOAD_PATH") {
        settings.upload_path = v;
    }
    if let Some(v) = env("APP__TICK_INTERVAL_MS").and_then(|v| v.parse().ok()) {
        settings.tick_interval_ms = v;
    }
    if let Some(v) = env("APP__TICK_STEP").and_then(|v| v.parse().ok()) {
        settings.tick_step = v;
    }
    if let Some(v) = env("APP__MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()) {
        settings.max_upload_bytes = v;
    }

    settings
}

fn apply_file_config(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("server_url") {
        settings.server_url = v.clone();
    }
    if let Some(v) = file_cfg.get("upload_path") {
        settings.upload_path = v.clone();
    }
    if let Some(v) = file_cfg.get("tick_interval_ms").and_then(|v| v.parse().ok()) {
        settings.tick_interval_ms = v;
    }
    if let Some(v) = file_cfg.get("tick_step").and_then(|v| v.parse().ok()) {
        settings.tick_step = v;
    }
    if let Some(v) = file_cfg.get("max_upload_bytes").and_then(|v| v.parse().ok()) {
        settings.max_upload_bytes = v;
    }
}
