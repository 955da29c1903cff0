//! In-place rewrite of a decoded `.atmos` master.

use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::{AtmosError, MezzanineSet};
use crate::models::WarpMode;

/// Bed order truehdd emits for a 7.1.x source.
const DECODED_BED_CONFIGURATION: [i64; 8] = [0, 1, 2, 3, 6, 7, 4, 5];

const CREATION_TOOL: &str = "DRX-Lab";
const CREATION_TOOL_VERSION: &str = "0.4.0";
const LFE_CHANNEL_ID: i64 = 3;
const OBJECT_IDS: std::ops::RangeInclusive<i64> = 10..=20;

/// Facts read from a mezzanine master.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MezzanineSummary {
    pub presentation_count: u32,
    pub bed_channels: Option<usize>,
    pub sample_rate: Option<u32>,
    pub warp_mode: Option<String>,
}

pub fn read_metadata(path: &Path) -> Result<Value, AtmosError> {
    let text = fs::read_to_string(path).map_err(|source| AtmosError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| AtmosError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn summarize(doc: &Value) -> MezzanineSummary {
    let presentations = doc
        .get("presentations")
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let first = presentations.first();
    let bed_channels = first
        .and_then(|p| p.get("bedInstances"))
        .and_then(Value::as_sequence)
        .and_then(|beds| beds.first())
        .and_then(|bed| bed.get("channels"))
        .and_then(Value::as_sequence)
        .map(Vec::len);

    let sample_rate = first
        .and_then(|p| p.get("sampleRate"))
        .and_then(Value::as_u64)
        .and_then(|rate| u32::try_from(rate).ok());

    let warp_mode = first
        .and_then(|p| p.get("warpMode"))
        .and_then(Value::as_str)
        .map(str::to_string);

    MezzanineSummary {
        presentation_count: presentations.len() as u32,
        bed_channels,
        sample_rate,
        warp_mode,
    }
}

/// Rewrite the master's first presentation to a single LFE bed plus a
/// fixed object range, when it still carries the decoder's 7.1 bed order.
///
/// Returns whether the file was changed.
pub fn conform_bed_layout(path: &Path, warp_mode: WarpMode) -> Result<bool, AtmosError> {
    let mut doc = read_metadata(path)?;
    if !conform_document(&mut doc, warp_mode) {
        return Ok(false);
    }

    write_metadata(path, &doc)?;
    Ok(true)
}

/// Point every presentation's `audio` and `metadata` entries at the
/// siblings of `path`. Needed after the triplet is copied or renamed.
///
/// Returns whether the file was changed.
pub fn relink_siblings(path: &Path) -> Result<bool, AtmosError> {
    let set = MezzanineSet::from_atmos(path);
    let mut doc = read_metadata(path)?;
    if !relink_document(&mut doc, &file_name(&set.audio), &file_name(&set.metadata)) {
        return Ok(false);
    }
    write_metadata(path, &doc)?;
    Ok(true)
}

fn write_metadata(path: &Path, doc: &Value) -> Result<(), AtmosError> {
    let text = serde_yaml::to_string(doc).map_err(|source| AtmosError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| AtmosError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn relink_document(doc: &mut Value, audio: &str, metadata: &str) -> bool {
    let Some(presentations) = doc
        .get_mut("presentations")
        .and_then(Value::as_sequence_mut)
    else {
        return false;
    };

    let mut changed = false;
    for presentation in presentations.iter_mut().filter_map(Value::as_mapping_mut) {
        for (key, name) in [("audio", audio), ("metadata", metadata)] {
            if presentation.get(key).and_then(Value::as_str) != Some(name) {
                presentation.insert(key.into(), name.into());
                changed = true;
            }
        }
    }
    changed
}

fn conform_document(doc: &mut Value, warp_mode: WarpMode) -> bool {
    let Some(presentation) = doc
        .get_mut("presentations")
        .and_then(Value::as_sequence_mut)
        .and_then(|p| p.first_mut())
        .and_then(Value::as_mapping_mut)
    else {
        return false;
    };

    let bed_order: Option<Vec<i64>> = presentation
        .get("scBedConfiguration")
        .and_then(Value::as_sequence)
        .map(|seq| seq.iter().filter_map(Value::as_i64).collect());
    if bed_order.as_deref() != Some(&DECODED_BED_CONFIGURATION[..]) {
        return false;
    }

    presentation.insert(
        "scBedConfiguration".into(),
        Value::Sequence(vec![Value::from(LFE_CHANNEL_ID)]),
    );
    presentation.insert("creationTool".into(), CREATION_TOOL.into());
    presentation.insert("creationToolVersion".into(), CREATION_TOOL_VERSION.into());
    presentation.insert("warpMode".into(), warp_mode.as_str().into());

    if let Some(bed) = presentation
        .get_mut("bedInstances")
        .and_then(Value::as_sequence_mut)
        .and_then(|beds| beds.first_mut())
        .and_then(Value::as_mapping_mut)
    {
        let mut lfe = Mapping::new();
        lfe.insert("channel".into(), "LFE".into());
        lfe.insert("ID".into(), Value::from(LFE_CHANNEL_ID));
        bed.insert("channels".into(), Value::Sequence(vec![Value::Mapping(lfe)]));
    }

    let objects = OBJECT_IDS
        .map(|id| {
            let mut object = Mapping::new();
            object.insert("ID".into(), Value::from(id));
            Value::Mapping(object)
        })
        .collect();
    presentation.insert("objects".into(), Value::Sequence(objects));

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const DECODED: &str = r#"version: 0.5.1
presentations:
  - type: home
    simplified: false
    metadata: abc123.atmos.metadata
    audio: abc123.atmos.audio
    offset: 0.0
    fps: 23.976
    scBedConfiguration: [0, 1, 2, 3, 6, 7, 4, 5]
    creationTool: truehdd
    creationToolVersion: 0.1.0
    sampleRate: 48000
    warpMode: normal
    bedInstances:
      - channels:
          - channel: L
            ID: 0
          - channel: R
            ID: 1
          - channel: C
            ID: 2
          - channel: LFE
            ID: 3
    objects:
      - ID: 8
      - ID: 9
"#;

    fn first_presentation(doc: &Value) -> &Value {
        &doc["presentations"][0]
    }

    #[test]
    fn rewrites_decoded_bed_layout() {
        let mut doc: Value = serde_yaml::from_str(DECODED).unwrap();
        assert!(conform_document(&mut doc, WarpMode::Loro));

        let p = first_presentation(&doc);
        assert_eq!(p["scBedConfiguration"], Value::Sequence(vec![Value::from(3)]));
        assert_eq!(p["creationTool"], "DRX-Lab");
        assert_eq!(p["creationToolVersion"], "0.4.0");
        assert_eq!(p["warpMode"], "loro");

        let channels = p["bedInstances"][0]["channels"].as_sequence().unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0]["channel"], "LFE");
        assert_eq!(channels[0]["ID"], 3);

        let ids: Vec<i64> = p["objects"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|o| o["ID"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, (10..=20).collect::<Vec<_>>());
    }

    #[test]
    fn leaves_other_layouts_untouched() {
        let text = DECODED.replace("[0, 1, 2, 3, 6, 7, 4, 5]", "[0, 1, 2, 3, 4, 5]");
        let mut doc: Value = serde_yaml::from_str(&text).unwrap();
        let before = doc.clone();

        assert!(!conform_document(&mut doc, WarpMode::Normal));
        assert_eq!(doc, before);
    }

    #[test]
    fn no_presentations_is_noop() {
        let mut doc: Value = serde_yaml::from_str("version: 0.5.1\n").unwrap();
        assert!(!conform_document(&mut doc, WarpMode::Normal));
    }

    #[test]
    fn conform_file_in_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc123.atmos");
        fs::write(&path, DECODED).unwrap();

        assert!(conform_bed_layout(&path, WarpMode::Warping).unwrap());
        let doc = read_metadata(&path).unwrap();
        assert_eq!(first_presentation(&doc)["warpMode"], "warping");

        // Already conformed, second pass changes nothing.
        assert!(!conform_bed_layout(&path, WarpMode::Warping).unwrap());
    }

    #[test]
    fn relink_points_at_new_siblings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f00d42.atmos");
        fs::write(&path, DECODED).unwrap();

        assert!(relink_siblings(&path).unwrap());
        let doc = read_metadata(&path).unwrap();
        let p = first_presentation(&doc);
        assert_eq!(p["audio"], "f00d42.atmos.audio");
        assert_eq!(p["metadata"], "f00d42.atmos.metadata");
        assert_eq!(p["scBedConfiguration"].as_sequence().unwrap().len(), 8);

        assert!(!relink_siblings(&path).unwrap());
    }

    #[test]
    fn relink_adds_missing_references() {
        let mut doc: Value =
            serde_yaml::from_str("presentations:\n  - type: home\n  - type: home\n").unwrap();
        assert!(relink_document(&mut doc, "a.atmos.audio", "a.atmos.metadata"));
        assert_eq!(doc["presentations"][1]["audio"], "a.atmos.audio");
        assert_eq!(doc["presentations"][1]["metadata"], "a.atmos.metadata");
    }

    #[test]
    fn summary_reads_presentation() {
        let doc: Value = serde_yaml::from_str(DECODED).unwrap();
        let summary = summarize(&doc);
        assert_eq!(summary.presentation_count, 1);
        assert_eq!(summary.bed_channels, Some(4));
        assert_eq!(summary.sample_rate, Some(48000));
        assert_eq!(summary.warp_mode.as_deref(), Some("normal"));
    }

    #[test]
    fn invalid_yaml_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.atmos");
        fs::write(&path, "presentations: [unclosed").unwrap();
        assert!(matches!(read_metadata(&path), Err(AtmosError::Yaml { .. })));
    }
}
