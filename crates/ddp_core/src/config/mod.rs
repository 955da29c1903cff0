//! `.config/ddp_atmos.toml`: encode defaults, tool paths and folders.
//!
//! CLI flags are merged over `[encode]` per run; `--save-defaults` writes
//! the merged values back with [`ConfigManager::update_section`].
//!
//! ```no_run
//! use ddp_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/ddp_atmos.toml");
//! config.load_or_default()?;
//! config.settings_mut().encode.bitrate_5_1 = 768;
//! config.update_section(ConfigSection::Encode)?;
//! # Ok::<(), ddp_core::config::ConfigError>(())
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    default_adm_converter_path, ConfigSection, EncodeSettings, LoggingSettings, PathSettings,
    Settings, ToolSettings,
};
