//! Configuration types for padlink
//!
//! Every field has a serde default so a partial (or empty) `config.toml`
//! still yields complete [`Settings`].

use std::time::Duration;

use padlink_core::CompilerGeneration;
use serde::{Deserialize, Serialize};

/// Global application settings from `.padlink/config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub service: ServiceSettings,

    #[serde(default)]
    pub compiler: CompilerSettings,

    #[serde(default)]
    pub reload: ReloadSettings,

    #[serde(default)]
    pub analysis: AnalysisSettings,

    #[serde(default)]
    pub watcher: WatcherSettings,
}

/// Which DartPad backend to talk to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceSettings {
    /// Channel name: `local`, `main` or a named channel such as `beta`
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Explicit host URL; overrides `channel` when set
    #[serde(default)]
    pub host: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            host: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ServiceSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_channel() -> String {
    "main".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Compiler output shape
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompilerSettings {
    #[serde(default)]
    pub generation: CompilerGeneration,

    /// Load the Flutter web runtime in the frame
    #[serde(default = "default_true")]
    pub flutter: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            generation: CompilerGeneration::default(),
            flutter: true,
        }
    }
}

/// Frame reset and delivery timing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReloadSettings {
    /// Upper bound on waiting for the frame's ready handshake before delivery
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Upper bound on waiting for a fresh frame's load signal
    #[serde(default = "default_frame_load_timeout_ms")]
    pub frame_load_timeout_ms: u64,
}

impl Default for ReloadSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            frame_load_timeout_ms: default_frame_load_timeout_ms(),
        }
    }
}

impl ReloadSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn frame_load_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_load_timeout_ms)
    }
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_frame_load_timeout_ms() -> u64 {
    1000
}

/// Background analysis of the edited source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnalysisSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Quiet period after the last edit before analysis runs
    #[serde(default = "default_analysis_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: default_analysis_debounce_ms(),
        }
    }
}

impl AnalysisSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_analysis_debounce_ms() -> u64 {
    1000
}

/// File watcher settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WatcherSettings {
    /// Debounce duration in milliseconds
    #[serde(default = "default_watcher_debounce_ms")]
    pub debounce_ms: u64,

    /// Hot reload when the source file changes on disk
    #[serde(default = "default_true")]
    pub auto_reload: bool,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_watcher_debounce_ms(),
            auto_reload: true,
        }
    }
}

fn default_watcher_debounce_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.service.channel, "main");
        assert!(settings.service.host.is_none());
        assert_eq!(settings.service.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.compiler.generation, CompilerGeneration::NewDdc);
        assert!(settings.compiler.flutter);
        assert_eq!(settings.reload.settle_delay(), Duration::from_millis(500));
        assert_eq!(settings.reload.frame_load_timeout(), Duration::from_millis(1000));
        assert!(settings.analysis.enabled);
        assert_eq!(settings.analysis.debounce(), Duration::from_millis(1000));
        assert_eq!(settings.watcher.debounce_ms, 500);
        assert!(settings.watcher.auto_reload);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let settings: Settings = toml::from_str(
            r#"
[service]
channel = "beta"

[compiler]
generation = "legacy"
"#,
        )
        .unwrap();

        assert_eq!(settings.service.channel, "beta");
        assert_eq!(settings.service.request_timeout_ms, 30_000);
        assert_eq!(settings.compiler.generation, CompilerGeneration::Legacy);
        assert!(settings.compiler.flutter);
        assert_eq!(settings.reload, ReloadSettings::default());
    }
}
