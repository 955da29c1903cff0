//! Data models shared across the encoder.
//!
//! - `enums`: closed option sets (modes, profiles, variants, stages)
//! - `options`: user-requested encode options before stream detection
//! - `stream`: properties detected from the input stream
//! - `run_config`: the immutable per-run configuration

mod enums;
mod options;
mod run_config;
mod stream;

pub use enums::{
    AtmosMode, Container, DownmixMode, DrcProfile, InputKind, OutputVariant, ParseEnumError,
    Profile, Stage, WarpMode, ATMOS_5_1_BITRATES, ATMOS_7_1_BITRATES, DDP_BITRATES,
    SPATIAL_CLUSTERS,
};
pub use options::EncodeOptions;
pub use run_config::{RunConfig, VariantBitrates};
pub use stream::{StreamInfo, DEFAULT_DIALOGUE_LEVEL, TARGET_SAMPLE_RATE};
