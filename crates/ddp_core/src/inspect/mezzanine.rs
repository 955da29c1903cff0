//! `.atmos` mezzanine inspection.

use std::path::Path;

use crate::atmos::{read_metadata, summarize, MezzanineSet};
use crate::models::StreamInfo;

use super::InspectError;

/// Check the triplet is complete and read the master's presentations.
pub fn inspect_mezzanine(path: &Path) -> Result<StreamInfo, InspectError> {
    let set = MezzanineSet::from_atmos(path);
    let missing: Vec<_> = set.missing().into_iter().map(Path::to_path_buf).collect();
    if !missing.is_empty() {
        return Err(InspectError::IncompleteMezzanine { missing });
    }

    let summary = summarize(&read_metadata(&set.atmos)?);
    if summary.presentation_count == 0 {
        return Err(InspectError::NoAudio {
            path: path.to_path_buf(),
        });
    }

    Ok(StreamInfo {
        atmos_present: true,
        presentation_count: summary.presentation_count,
        channel_layout: summary.bed_channels.map(|n| format!("{} bed channels", n)),
        sample_rate: summary.sample_rate,
        ..StreamInfo::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const MASTER: &str = "\
presentations:
  - type: home
    sampleRate: 48000
    bedInstances:
      - channels:
          - channel: LFE
            ID: 3
";

    fn write_set(dir: &Path, master: &str) -> MezzanineSet {
        let set = MezzanineSet::in_dir(dir, "mix");
        fs::write(&set.atmos, master).unwrap();
        fs::write(&set.audio, b"\0\0").unwrap();
        fs::write(&set.metadata, b"\0\0").unwrap();
        set
    }

    #[test]
    fn complete_mezzanine_is_atmos() {
        let dir = tempdir().unwrap();
        let set = write_set(dir.path(), MASTER);

        let info = inspect_mezzanine(&set.atmos).unwrap();
        assert!(info.atmos_present);
        assert_eq!(info.presentation_count, 1);
        assert_eq!(info.sample_rate, Some(48_000));
        assert_eq!(info.dialogue_level, None);
    }

    #[test]
    fn missing_sibling_is_reported() {
        let dir = tempdir().unwrap();
        let set = write_set(dir.path(), MASTER);
        fs::remove_file(&set.audio).unwrap();

        let err = inspect_mezzanine(&set.atmos).unwrap_err();
        assert!(err.to_string().contains("mix.atmos.audio"));
    }

    #[test]
    fn master_without_presentations_has_no_audio() {
        let dir = tempdir().unwrap();
        let set = write_set(dir.path(), "version: 1\n");
        assert!(matches!(
            inspect_mezzanine(&set.atmos),
            Err(InspectError::NoAudio { .. })
        ));
    }
}
