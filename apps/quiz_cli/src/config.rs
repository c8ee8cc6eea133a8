use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use quiz_core::FlowOptions;
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "quiz.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub auto_advance_ms: u64,
    pub idle_threshold_ms: u64,
    pub auto_submit: bool,
    pub share_origin: String,
    pub results_view_base: String,
    pub request_timeout_secs: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            auto_advance_ms: 400,
            idle_threshold_ms: 5_000,
            auto_submit: true,
            share_origin: "http://127.0.0.1:8080".into(),
            results_view_base: String::new(),
            request_timeout_secs: 30,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn flow_options(&self) -> FlowOptions {
        FlowOptions {
            auto_advance_delay: Duration::from_millis(self.auto_advance_ms),
            idle_threshold: Duration::from_millis(self.idle_threshold_ms),
            auto_submit: self.auto_submit,
            results_view_base: self.results_view_base.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    auto_advance_ms: Option<u64>,
    idle_threshold_ms: Option<u64>,
    auto_submit: Option<bool>,
    share_origin: Option<String>,
    results_view_base: Option<String>,
    request_timeout_secs: Option<u64>,
    log_filter: Option<String>,
}

/// Defaults, then the TOML file, then environment overrides. An explicitly
/// named file must exist; the default `quiz.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let raw = match path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
    };
    if let Some(raw) = raw {
        let file_cfg: FileSettings = toml::from_str(&raw).context("failed to parse config file")?;
        apply_file(&mut settings, file_cfg);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.auto_advance_ms {
        settings.auto_advance_ms = v;
    }
    if let Some(v) = file_cfg.idle_threshold_ms {
        settings.idle_threshold_ms = v;
    }
    if let Some(v) = file_cfg.auto_submit {
        settings.auto_submit = v;
    }
    if let Some(v) = file_cfg.share_origin {
        settings.share_origin = v;
    }
    if let Some(v) = file_cfg.results_view_base {
        settings.results_view_base = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("QUIZ_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = var("APP__AUTO_ADVANCE_MS").and_then(|v| v.parse().ok()) {
        settings.auto_advance_ms = v;
    }
    if let Some(v) = var("APP__IDLE_THRESHOLD_MS").and_then(|v| v.parse().ok()) {
        settings.idle_threshold_ms = v;
    }
    if let Some(v) = var("APP__AUTO_SUBMIT").and_then(|v| parse_flag(&v)) {
        settings.auto_submit = v;
    }
    if let Some(v) = var("APP__SHARE_ORIGIN") {
        settings.share_origin = v;
    }
    if let Some(v) = var("APP__RESULTS_VIEW_BASE") {
        settings.results_view_base = v;
    }
    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
