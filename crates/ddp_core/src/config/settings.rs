//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;
use crate::models::{AtmosMode, Container, DownmixMode, DrcProfile, Profile, WarpMode};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Output and log locations.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Default encode options.
    #[serde(default)]
    pub encode: EncodeSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Path configuration for output and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Output folder for encoded files.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Folder for per-run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_output_folder() -> String {
    "ddp_encode".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Where and how to find the external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Directory holding bundled binaries. Relative paths are resolved
    /// against the directory of the running executable.
    #[serde(default = "default_binaries_dir")]
    pub binaries_dir: String,

    /// Fall back to `PATH` when a tool is not in `binaries_dir`.
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// TrueHD decoder.
    #[serde(default = "default_truehdd")]
    pub truehdd: String,

    /// Dolby Encoding Engine.
    #[serde(default = "default_dee")]
    pub dee: String,

    /// 7.1 layout fix tool.
    #[serde(default = "default_layout_fix")]
    pub layout_fix: String,

    /// Resampler for non-48 kHz PCM.
    #[serde(default = "default_resampler")]
    pub resampler: String,

    /// Absolute path of the ADM conversion tool.
    #[serde(default = "default_adm_converter_path")]
    pub adm_converter: String,

    /// Encoding engine version known to work with the generated jobs.
    #[serde(default = "default_dee_version")]
    pub recommended_dee_version: String,
}

fn default_true() -> bool {
    true
}

fn default_binaries_dir() -> String {
    "binaries".to_string()
}

fn default_truehdd() -> String {
    "truehdd".to_string()
}

fn default_dee() -> String {
    "dee".to_string()
}

fn default_layout_fix() -> String {
    "eac3_7.1_atmos_fix".to_string()
}

fn default_resampler() -> String {
    "sox".to_string()
}

fn default_dee_version() -> String {
    "5.2.1".to_string()
}

/// Install location of the ADM conversion tool on this platform.
pub fn default_adm_converter_path() -> String {
    if cfg!(windows) {
        r"C:\Program Files\Dolby\Dolby Atmos Conversion Tool\cmdline_atmos_conversion_tool.exe"
            .to_string()
    } else if cfg!(target_os = "macos") {
        "/Applications/Dolby/Dolby Atmos Conversion Tool/cmdline_atmos_conversion_tool".to_string()
    } else {
        "/opt/Dolby/Dolby_Atmos_Conversion_Tool/cmdline_atmos_conversion_tool".to_string()
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            binaries_dir: default_binaries_dir(),
            search_path: true,
            truehdd: default_truehdd(),
            dee: default_dee(),
            layout_fix: default_layout_fix(),
            resampler: default_resampler(),
            adm_converter: default_adm_converter_path(),
            recommended_dee_version: default_dee_version(),
        }
    }
}

/// Default encode options, overridden per run by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeSettings {
    #[serde(default)]
    pub atmos_mode: AtmosMode,

    /// Atmos 5.1 data rate in kbps.
    #[serde(default = "default_bitrate_5_1")]
    pub bitrate_5_1: u32,

    /// Atmos 7.1 data rate in kbps.
    #[serde(default = "default_bitrate_7_1")]
    pub bitrate_7_1: u32,

    /// Plain DDP 5.1 data rate in kbps (non-Atmos fallback).
    #[serde(default = "default_bitrate_ddp")]
    pub bitrate_ddp: u32,

    #[serde(default)]
    pub drc: DrcProfile,

    #[serde(default = "default_true")]
    pub dialogue_intelligence: bool,

    /// Force dialnorm to 0 instead of using the detected level.
    #[serde(default)]
    pub disable_dialogue_recovery: bool,

    #[serde(default)]
    pub downmix: DownmixMode,

    #[serde(default)]
    pub warp_mode: WarpMode,

    #[serde(default = "default_true")]
    pub bed_conform: bool,

    #[serde(default = "default_spatial_clusters")]
    pub spatial_clusters: u32,

    /// Produce TrueHD Atmos (MLP) instead of DDP.
    #[serde(default)]
    pub truehd_atmos: bool,

    #[serde(default)]
    pub container: Container,

    #[serde(default)]
    pub profile: Profile,
}

fn default_bitrate_5_1() -> u32 {
    1024
}

fn default_bitrate_7_1() -> u32 {
    1536
}

fn default_bitrate_ddp() -> u32 {
    640
}

fn default_spatial_clusters() -> u32 {
    12
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            atmos_mode: AtmosMode::default(),
            bitrate_5_1: default_bitrate_5_1(),
            bitrate_7_1: default_bitrate_7_1(),
            bitrate_ddp: default_bitrate_ddp(),
            drc: DrcProfile::default(),
            dialogue_intelligence: true,
            disable_dialogue_recovery: false,
            downmix: DownmixMode::default(),
            warp_mode: WarpMode::default(),
            bed_conform: true,
            spatial_clusters: default_spatial_clusters(),
            truehd_atmos: false,
            container: Container::default(),
            profile: Profile::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines to show on error.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Prefix log lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,

    /// Log each external command in pretty multi-line form.
    #[serde(default)]
    pub show_commands_pretty: bool,
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_timestamps: true,
            show_commands_pretty: false,
        }
    }
}

impl LoggingSettings {
    /// Job logger configuration for these settings.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            compact: self.compact,
            progress_step: self.progress_step.max(1),
            error_tail: self.error_tail as usize,
            show_timestamps: self.show_timestamps,
            ..LogConfig::default()
        }
    }
}

/// Config sections that can be updated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Tools,
    Encode,
    Logging,
}

impl ConfigSection {
    pub const ALL: &'static [ConfigSection] = &[
        ConfigSection::Paths,
        ConfigSection::Tools,
        ConfigSection::Encode,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Encode => "encode",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section in a fresh config file.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "# Output and log directories",
            ConfigSection::Tools => "# External tool locations",
            ConfigSection::Encode => "# Default encode options (CLI flags override these)",
            ConfigSection::Logging => "# Logging configuration",
        }
    }
}
