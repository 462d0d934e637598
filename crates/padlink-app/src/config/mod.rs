//! Configuration file parsing for padlink
//!
//! Supports:
//! - `.padlink/config.toml` - Service, compiler, reload, analysis and watcher settings

pub mod settings;
pub mod types;

pub use settings::{config_path, init_config_dir, load_settings, CONFIG_DIR, CONFIG_FILENAME};
pub use types::*;
