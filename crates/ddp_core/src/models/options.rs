//! Encode options requested by the user.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::{AtmosMode, Container, DownmixMode, DrcProfile, OutputVariant, Profile, WarpMode};
use crate::config::EncodeSettings;

/// Options for one encode, after CLI flags were merged over config defaults.
///
/// Nothing here depends on the input stream; the resolver combines these
/// with the detected `StreamInfo` into a `RunConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub atmos_mode: AtmosMode,
    pub bitrate_5_1: u32,
    pub bitrate_7_1: u32,
    pub bitrate_ddp: u32,
    pub drc: DrcProfile,
    pub dialogue_intelligence: bool,
    /// Skip dialogue level recovery and force 0 dB.
    pub disable_dialogue_recovery: bool,
    pub downmix: DownmixMode,
    pub warp_mode: WarpMode,
    pub bed_conform: bool,
    pub spatial_clusters: u32,
    pub truehd_atmos: bool,
    pub container: Container,
    pub profile: Profile,
}

impl EncodeOptions {
    /// Build options for `input` from configured defaults.
    pub fn from_settings(
        settings: &EncodeSettings,
        input: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            atmos_mode: settings.atmos_mode,
            bitrate_5_1: settings.bitrate_5_1,
            bitrate_7_1: settings.bitrate_7_1,
            bitrate_ddp: settings.bitrate_ddp,
            drc: settings.drc,
            dialogue_intelligence: settings.dialogue_intelligence,
            disable_dialogue_recovery: settings.disable_dialogue_recovery,
            downmix: settings.downmix,
            warp_mode: settings.warp_mode,
            bed_conform: settings.bed_conform,
            spatial_clusters: settings.spatial_clusters,
            truehd_atmos: settings.truehd_atmos,
            container: settings.container,
            profile: settings.profile,
        }
    }

    /// Same options pointed at another input (batch mode).
    pub fn with_input(&self, input: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            ..self.clone()
        }
    }

    /// Variants the user asked for, before stream detection.
    pub fn requested_variants(&self) -> Vec<OutputVariant> {
        if self.truehd_atmos {
            vec![OutputVariant::TrueHdAtmos]
        } else {
            self.atmos_mode.variants()
        }
    }

    /// Requested data rate for a variant.
    pub fn bitrate_for(&self, variant: OutputVariant) -> Option<u32> {
        match variant {
            OutputVariant::Atmos51 => Some(self.bitrate_5_1),
            OutputVariant::Atmos71 => Some(self.bitrate_7_1),
            OutputVariant::PlainDdp => Some(self.bitrate_ddp),
            OutputVariant::TrueHdAtmos => None,
        }
    }

    /// Input file name without its extension.
    pub fn base_name(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string())
    }
}
