//! Job templates per output variant.

use std::fs;
use std::path::{Path, PathBuf};

use super::element::Element;
use super::XmlError;
use crate::models::{Container, DownmixMode, DrcProfile, OutputVariant, RunConfig};

const FRAME_RATE: &str = "23.976";
const MIX_LEVEL_DB: i32 = -3;
const SURROUND_TRIM_5_1: i32 = 0;
const HEIGHT_TRIM_5_1: i32 = -3;
const METERING_MODE: &str = "1770-4";
const SPEECH_THRESHOLD: u32 = 15;

/// Everything one job description needs.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub variant: OutputVariant,
    /// Source the engine reads (mezzanine master or PCM file).
    pub input: PathBuf,
    /// File the engine writes.
    pub output: PathBuf,
    /// Engine scratch directory.
    pub temp_dir: PathBuf,
    pub data_rate: Option<u32>,
    pub drc: DrcProfile,
    pub dialogue_intelligence: bool,
    pub dialogue_level: i32,
    pub downmix: DownmixMode,
    pub spatial_clusters: u32,
    pub container: Container,
}

impl JobSpec {
    /// Job for `variant` reading `input`, writing into `work_dir`.
    pub fn for_variant(
        config: &RunConfig,
        variant: OutputVariant,
        input: &Path,
        work_dir: &Path,
    ) -> Self {
        Self {
            variant,
            input: input.to_path_buf(),
            output: work_dir.join(config.encoded_file_name(variant)),
            temp_dir: work_dir.to_path_buf(),
            data_rate: config.bitrate_for(variant),
            drc: config.drc,
            dialogue_intelligence: config.dialogue_intelligence,
            dialogue_level: config.dialogue_level,
            downmix: config.downmix,
            spatial_clusters: config.spatial_clusters,
            container: config.container,
        }
    }
}

/// Build the `job_config` tree for a spec.
pub fn build_job(spec: &JobSpec) -> Result<Element, XmlError> {
    let filter = match spec.variant {
        OutputVariant::Atmos51 | OutputVariant::Atmos71 | OutputVariant::PlainDdp => {
            ddp_filter(spec)?
        }
        OutputVariant::TrueHdAtmos => truehd_filter(spec),
    };

    Ok(Element::new("job_config")
        .child(Element::new("input").child(Element::new("audio").child(input_element(spec))))
        .child(Element::new("filter").child(Element::new("audio").child(filter)))
        .child(Element::new("output").child(output_element(spec)))
        .child(
            Element::new("misc").child(
                Element::new("temp_dir")
                    .child(Element::leaf("clean_temp", "true"))
                    .child(Element::leaf("path", spec.temp_dir.display())),
            ),
        ))
}

/// Render a spec and check the result parses.
pub fn render_job(spec: &JobSpec) -> Result<String, XmlError> {
    let document = build_job(spec)?.to_document();

    let parsed = roxmltree::Document::parse(&document)
        .map_err(|e| XmlError::Malformed(format!("XML parse error: {}", e)))?;
    if parsed.root_element().tag_name().name() != "job_config" {
        return Err(XmlError::Malformed(
            "Root element must be <job_config>".to_string(),
        ));
    }

    Ok(document)
}

/// Render a spec to `path`.
pub fn write_job(spec: &JobSpec, path: &Path) -> Result<(), XmlError> {
    let document = render_job(spec)?;
    fs::write(path, document).map_err(|source| XmlError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("Wrote job description {}", path.display());
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parent_dir(path: &Path) -> String {
    path.parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn storage(path: &Path) -> Element {
    Element::new("storage")
        .child(Element::new("local").child(Element::leaf("path", parent_dir(path))))
}

fn input_element(spec: &JobSpec) -> Element {
    let name = match spec.variant {
        OutputVariant::PlainDdp => "wav",
        _ => "atmos_mezz",
    };
    Element::new(name)
        .attr("version", "1")
        .child(Element::leaf("file_name", file_name(&spec.input)))
        .child(Element::leaf("timecode_frame_rate", FRAME_RATE))
        .child(Element::leaf("offset", "auto"))
        .child(Element::leaf("ffoa", "auto"))
        .child(storage(&spec.input))
}

fn output_element(spec: &JobSpec) -> Element {
    let name = match (spec.variant, spec.container) {
        (OutputVariant::TrueHdAtmos, _) => "mlp",
        (_, Container::Eac3) => "ec3",
        (_, Container::Mp4) => "mp4",
    };
    Element::new(name)
        .attr("version", "1")
        .child(Element::leaf("file_name", file_name(&spec.output)))
        .child(storage(&spec.output))
}

fn loudness(spec: &JobSpec) -> Element {
    Element::new("loudness").child(
        Element::new("measure_only")
            .child(Element::leaf("metering_mode", METERING_MODE))
            .child(Element::leaf("dialogue_intelligence", spec.dialogue_intelligence))
            .child(Element::leaf("speech_threshold", SPEECH_THRESHOLD)),
    )
}

fn timing() -> Vec<Element> {
    vec![
        Element::leaf("timecode_frame_rate", FRAME_RATE),
        Element::leaf("start", "first_frame_of_action"),
        Element::leaf("end", "end_of_file"),
        Element::leaf("time_base", "file_position"),
        Element::leaf("prepend_silence_duration", "0.0"),
        Element::leaf("append_silence_duration", "0.0"),
    ]
}

fn ddp_filter(spec: &JobSpec) -> Result<Element, XmlError> {
    let data_rate = spec.data_rate.ok_or(XmlError::MissingDataRate {
        variant: spec.variant,
    })?;
    let name = match spec.variant {
        OutputVariant::PlainDdp => "encode_to_ddp",
        _ => "encode_to_atmos_ddp",
    };

    let drc = Element::new("drc")
        .child(Element::leaf("line_mode_drc_profile", spec.drc))
        .child(Element::leaf("rf_mode_drc_profile", spec.drc));

    let downmix = Element::new("downmix")
        .child(Element::leaf("loro_center_mix_level", MIX_LEVEL_DB))
        .child(Element::leaf("loro_surround_mix_level", MIX_LEVEL_DB))
        .child(Element::leaf("ltrt_center_mix_level", MIX_LEVEL_DB))
        .child(Element::leaf("ltrt_surround_mix_level", MIX_LEVEL_DB))
        .child(Element::leaf("preferred_downmix_mode", spec.downmix));

    let mut encode = Element::new(name)
        .attr("version", "1")
        .child(loudness(spec))
        .child(Element::leaf("data_rate", data_rate))
        .children(timing())
        .child(drc)
        .child(downmix);

    if spec.variant.is_atmos() {
        encode = encode.child(
            Element::new("custom_trims")
                .child(Element::leaf("surround_trim_5_1", SURROUND_TRIM_5_1))
                .child(Element::leaf("height_trim_5_1", HEIGHT_TRIM_5_1)),
        );
    }

    encode = encode.child(Element::leaf("custom_dialnorm", spec.dialogue_level));

    if spec.variant == OutputVariant::Atmos71 {
        encode = encode
            .child(Element::leaf("encoding_backend", "atmosprocessor"))
            .child(Element::leaf("encoder_mode", "bluray"));
    }

    Ok(encode)
}

fn truehd_filter(spec: &JobSpec) -> Element {
    Element::new("encode_to_dthd")
        .attr("version", "1")
        .child(loudness(spec))
        .children(timing())
        .child(Element::leaf("spatial_clusters", spec.spatial_clusters))
        .child(Element::leaf("custom_dialnorm", spec.dialogue_level))
}
