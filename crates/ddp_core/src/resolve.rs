//! Turns user options plus the detected stream into a `RunConfig`.
//!
//! Validation happens twice: once on the raw options before any tool is
//! located, and again on the final variant set, which may differ after a
//! non-Atmos stream falls back to plain DDP.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{
    EncodeOptions, InputKind, OutputVariant, Profile, RunConfig, StreamInfo, VariantBitrates,
    DEFAULT_DIALOGUE_LEVEL, SPATIAL_CLUSTERS, TARGET_SAMPLE_RATE,
};

/// Length of the run id prefix taken from the base name hash.
const RUN_ID_LEN: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Bitrate {bitrate} kbps is not allowed for {variant}")]
    InvalidBitrate {
        variant: OutputVariant,
        bitrate: u32,
    },

    #[error("Spatial clusters must be one of 12, 14, 16 (got {0})")]
    InvalidSpatialClusters(u32),

    #[error("{} has no Atmos metadata and the atmos_only profile is active", .input.display())]
    AtmosRequired { input: PathBuf },

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Unsupported input type: {} (expected one of: {})", .0.display(), InputKind::EXTENSIONS.join(", "))]
    UnsupportedInput(PathBuf),

    #[error("{kind} input cannot produce {variant}")]
    IncompatibleVariant {
        kind: InputKind,
        variant: OutputVariant,
    },
}

/// Determine the input kind from the file extension.
pub fn classify_input(path: &Path) -> Result<InputKind, ResolveError> {
    if !path.is_file() {
        return Err(ResolveError::InputNotFound(path.to_path_buf()));
    }
    InputKind::from_path(path).ok_or_else(|| ResolveError::UnsupportedInput(path.to_path_buf()))
}

/// Check user options on their own, before anything is spawned.
pub fn validate_options(options: &EncodeOptions) -> Result<(), ResolveError> {
    validate_bitrates(options, &options.requested_variants())?;
    if options.truehd_atmos && !SPATIAL_CLUSTERS.contains(&options.spatial_clusters) {
        return Err(ResolveError::InvalidSpatialClusters(options.spatial_clusters));
    }
    Ok(())
}

fn validate_bitrates(options: &EncodeOptions, variants: &[OutputVariant]) -> Result<(), ResolveError> {
    for &variant in variants {
        if let Some(bitrate) = options.bitrate_for(variant) {
            if !variant.allowed_bitrates().contains(&bitrate) {
                return Err(ResolveError::InvalidBitrate { variant, bitrate });
            }
        }
    }
    Ok(())
}

/// Output variants for a stream, after the non-Atmos fallback.
pub fn resolve_variants(
    options: &EncodeOptions,
    stream: &StreamInfo,
) -> Result<Vec<OutputVariant>, ResolveError> {
    if stream.atmos_present {
        return Ok(options.requested_variants());
    }
    match options.profile {
        Profile::AtmosOnly => Err(ResolveError::AtmosRequired {
            input: options.input.clone(),
        }),
        Profile::Legacy if options.truehd_atmos => Err(ResolveError::AtmosRequired {
            input: options.input.clone(),
        }),
        Profile::Legacy => Ok(vec![OutputVariant::PlainDdp]),
    }
}

/// Presentation truehdd decodes. It is picked by the dialogue level
/// search, so there is none when that search is disabled.
pub fn resolve_presentation(options: &EncodeOptions, stream: &StreamInfo) -> Option<u32> {
    if options.disable_dialogue_recovery {
        None
    } else {
        stream.last_presentation
    }
}

/// Dialnorm for the job description.
pub fn resolve_dialogue_level(options: &EncodeOptions, stream: &StreamInfo) -> i32 {
    if options.disable_dialogue_recovery {
        0
    } else {
        stream.dialogue_level.unwrap_or(DEFAULT_DIALOGUE_LEVEL)
    }
}

/// First hex digits of the md5 of the base name.
pub fn run_id_for(base_name: &str) -> String {
    let digest = format!("{:x}", md5::compute(base_name.as_bytes()));
    digest[..RUN_ID_LEN].to_string()
}

/// Combine options and the detected stream into the run configuration.
pub fn resolve(
    options: &EncodeOptions,
    stream: &StreamInfo,
    kind: InputKind,
) -> Result<RunConfig, ResolveError> {
    let variants = resolve_variants(options, stream)?;
    validate_bitrates(options, &variants)?;

    if kind != InputKind::TrueHd && variants.contains(&OutputVariant::PlainDdp) {
        return Err(ResolveError::IncompatibleVariant {
            kind,
            variant: OutputVariant::PlainDdp,
        });
    }

    let pcm_decode = kind == InputKind::TrueHd && !variants.iter().any(|v| v.is_atmos());
    let resample_from = match stream.sample_rate {
        Some(rate) if pcm_decode && rate != TARGET_SAMPLE_RATE => Some(rate),
        _ => None,
    };

    let base_name = options.base_name();
    let config = RunConfig {
        input: options.input.clone(),
        input_kind: kind,
        run_id: run_id_for(&base_name),
        base_name,
        output_dir: options.output_dir.clone(),
        variants,
        bitrates: VariantBitrates {
            atmos_5_1: options.bitrate_5_1,
            atmos_7_1: options.bitrate_7_1,
            ddp: options.bitrate_ddp,
        },
        warp_mode: options.warp_mode,
        drc: options.drc,
        dialogue_intelligence: options.dialogue_intelligence,
        dialogue_level: resolve_dialogue_level(options, stream),
        bed_conform: options.bed_conform,
        downmix: options.downmix,
        spatial_clusters: options.spatial_clusters,
        container: options.container,
        presentation: resolve_presentation(options, stream),
        resample_from,
        stream: stream.clone(),
    };

    tracing::debug!(
        "Resolved run {}: variants={:?} dialogue_level={} resample_from={:?}",
        config.run_id,
        config.variants,
        config.dialogue_level,
        config.resample_from
    );
    Ok(config)
}
