//! Immutable per-run configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::{
    Container, DownmixMode, DrcProfile, InputKind, OutputVariant, WarpMode,
};
use super::stream::StreamInfo;

/// Data rates (kbps) chosen for each DDP variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantBitrates {
    pub atmos_5_1: u32,
    pub atmos_7_1: u32,
    pub ddp: u32,
}

/// Everything a run needs, resolved once before any workspace exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub input: PathBuf,
    pub input_kind: InputKind,
    /// Input file stem, used for final output names.
    pub base_name: String,
    /// Short hash of the base name, used for intermediate names.
    pub run_id: String,
    pub output_dir: PathBuf,
    /// Outputs to produce, in encode order.
    pub variants: Vec<OutputVariant>,
    pub bitrates: VariantBitrates,
    pub warp_mode: WarpMode,
    pub drc: DrcProfile,
    pub dialogue_intelligence: bool,
    /// Dialnorm written into the job description.
    pub dialogue_level: i32,
    pub bed_conform: bool,
    pub downmix: DownmixMode,
    pub spatial_clusters: u32,
    pub container: Container,
    /// Presentation the decoder should extract.
    pub presentation: Option<u32>,
    /// Source sample rate when a resample to 48 kHz is required.
    pub resample_from: Option<u32>,
    pub stream: StreamInfo,
}

impl RunConfig {
    pub fn bitrate_for(&self, variant: OutputVariant) -> Option<u32> {
        match variant {
            OutputVariant::Atmos51 => Some(self.bitrates.atmos_5_1),
            OutputVariant::Atmos71 => Some(self.bitrates.atmos_7_1),
            OutputVariant::PlainDdp => Some(self.bitrates.ddp),
            OutputVariant::TrueHdAtmos => None,
        }
    }

    /// Whether the decode produces an Atmos mezzanine (vs. plain PCM).
    pub fn decodes_to_mezzanine(&self) -> bool {
        self.variants.iter().any(|v| v.is_atmos())
    }

    /// Extension of the encoded file for a variant.
    pub fn extension_for(&self, variant: OutputVariant) -> &'static str {
        match variant {
            OutputVariant::TrueHdAtmos => "mlp",
            _ => self.container.extension(),
        }
    }

    /// File name the encoding engine writes inside the workspace.
    pub fn encoded_file_name(&self, variant: OutputVariant) -> String {
        format!(
            "{}_{}.{}",
            self.run_id,
            variant.file_suffix(),
            self.extension_for(variant)
        )
    }

    /// File name of the layout-fixed 7.1 intermediate.
    pub fn fixed_file_name(&self, variant: OutputVariant) -> String {
        format!(
            "{}_{}_fix.{}",
            self.run_id,
            variant.file_suffix(),
            self.extension_for(variant)
        )
    }

    /// File name of the job description for a variant.
    pub fn job_file_name(&self, variant: OutputVariant) -> String {
        format!("{}_encode_{}.xml", self.run_id, variant.file_suffix())
    }

    /// Final output path for a variant.
    pub fn output_path(&self, variant: OutputVariant) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}.{}",
            self.base_name,
            variant.file_suffix(),
            self.extension_for(variant)
        ))
    }
}
