//! Settings parser for .padlink/config.toml

use std::path::{Path, PathBuf};

use padlink_core::prelude::*;

use super::types::Settings;

pub const CONFIG_FILENAME: &str = "config.toml";
pub const CONFIG_DIR: &str = ".padlink";

const DEFAULT_CONFIG: &str = r#"# padlink configuration

[service]
# local | main | <channel name>
channel = "main"
# Overrides the channel when set
# host = "http://localhost:8080"
request_timeout_ms = 30000

[compiler]
# new_ddc | legacy
generation = "new_ddc"
flutter = true

[reload]
# Upper bound on waiting for the frame's ready handshake
settle_delay_ms = 500
frame_load_timeout_ms = 1000

[analysis]
enabled = true
debounce_ms = 1000

[watcher]
debounce_ms = 500
auto_reload = true
"#;

/// Path of the config file for a project directory
pub fn config_path(project_path: &Path) -> PathBuf {
    project_path.join(CONFIG_DIR).join(CONFIG_FILENAME)
}

/// Load settings from `.padlink/config.toml`
///
/// A missing or unparsable file yields defaults; the problem is logged.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = config_path(project_path);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create `.padlink/config.toml` with commented defaults if it is missing
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let config_dir = project_path.join(CONFIG_DIR);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .map_err(|e| Error::config(format!("Failed to create .padlink dir: {}", e)))?;
        info!("Created .padlink directory");
    }

    let config_path = config_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config.toml");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use padlink_core::CompilerGeneration;
    use tempfile::tempdir;

    #[test]
    fn test_load_settings_missing_file() {
        let temp = tempdir().unwrap();
        assert_eq!(load_settings(temp.path()), Settings::default());
    }

    #[test]
    fn test_load_settings_from_file() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            config_path(temp.path()),
            r#"
[service]
channel = "local"
host = "http://127.0.0.1:9090"

[reload]
settle_delay_ms = 250
"#,
        )
        .unwrap();

        let settings = load_settings(temp.path());
        assert_eq!(settings.service.channel, "local");
        assert_eq!(
            settings.service.host.as_deref(),
            Some("http://127.0.0.1:9090")
        );
        assert_eq!(settings.reload.settle_delay_ms, 250);
        assert_eq!(settings.reload.frame_load_timeout_ms, 1000);
    }

    #[test]
    fn test_load_settings_invalid_toml_falls_back() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(config_path(temp.path()), "[service\nchannel = ").unwrap();

        assert_eq!(load_settings(temp.path()), Settings::default());
    }

    #[test]
    fn test_init_config_dir_writes_parsable_defaults() {
        let temp = tempdir().unwrap();
        init_config_dir(temp.path()).unwrap();

        assert!(config_path(temp.path()).exists());
        let settings = load_settings(temp.path());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.compiler.generation, CompilerGeneration::NewDdc);
    }

    #[test]
    fn test_init_config_dir_keeps_existing_file() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(config_path(temp.path()), "[watcher]\nauto_reload = false\n").unwrap();

        init_config_dir(temp.path()).unwrap();

        assert!(!load_settings(temp.path()).watcher.auto_reload);
    }
}
