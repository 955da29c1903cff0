//! `truehdd info` probing.

use std::path::Path;

use crate::models::{StreamInfo, DEFAULT_DIALOGUE_LEVEL};
use crate::process::{run_captured, ToolCommand};
use crate::tools::Tool;

use super::InspectError;

/// Run `truehdd info` on `input` and parse its report.
pub fn query_truehd(truehdd: &Path, input: &Path) -> Result<StreamInfo, InspectError> {
    let command = ToolCommand::new(Tool::Truehdd.label(), truehdd)
        .arg("info")
        .arg(input);

    let output = run_captured(&command).map_err(|e| InspectError::Spawn {
        tool: Tool::Truehdd,
        message: e.to_string(),
    })?;

    if !output.success() {
        let diagnostics = if output.stderr.trim().is_empty() {
            output.stdout.trim_end().to_string()
        } else {
            output.stderr.trim_end().to_string()
        };
        return Err(InspectError::ProbeFailed {
            tool: Tool::Truehdd,
            path: input.to_path_buf(),
            exit_code: output.exit_code,
            diagnostics,
        });
    }

    parse_truehdd_info(&output.stdout).ok_or_else(|| InspectError::NoAudio {
        path: input.to_path_buf(),
    })
}

/// Parse the text report of `truehdd info`.
///
/// Returns `None` when the report has none of the expected keys.
pub fn parse_truehdd_info(text: &str) -> Option<StreamInfo> {
    let mut info = StreamInfo::default();
    let mut recognized = false;
    let mut atmos_seen = false;
    let mut current: Option<u32> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if !atmos_seen && line.contains("Dolby Atmos") {
            atmos_seen = true;
            recognized = true;
            let flag = line.split_whitespace().last().unwrap_or_default();
            info.atmos_present = flag.eq_ignore_ascii_case("true") || flag.eq_ignore_ascii_case("yes");
            continue;
        }

        if let Some(rest) = line.strip_prefix("Presentation ") {
            current = rest
                .split_whitespace()
                .next()
                .and_then(|n| n.trim_end_matches(':').parse().ok());
            if let Some(index) = current {
                recognized = true;
                info.presentation_count = info.presentation_count.max(index + 1);
            }
            continue;
        }

        if line.contains("Dialogue Level") {
            recognized = true;
            if let Some(index) = current {
                info.last_presentation = Some(index);
                info.dialogue_level = Some(parse_dialogue_level(line));
            }
            continue;
        }

        if line.contains("Sampling Rate") || line.contains("Sample Rate") {
            if let Some(rate) = first_integer(value_part(line)) {
                recognized = true;
                info.sample_rate = Some(rate);
            }
            continue;
        }

        if line.contains("Channel Layout") || line.starts_with("Channels") {
            let layout = value_part(line).trim();
            if !layout.is_empty() {
                recognized = true;
                info.channel_layout = Some(layout.to_string());
            }
        }
    }

    recognized.then_some(info)
}

/// `Dialogue Level: -27 dB` style line; the value sits before the unit.
fn parse_dialogue_level(line: &str) -> i32 {
    let parts: Vec<&str> = line.split_whitespace().collect();
    parts
        .len()
        .checked_sub(2)
        .and_then(|i| parts[i].parse::<i32>().ok())
        .map(|level| level.max(DEFAULT_DIALOGUE_LEVEL))
        .unwrap_or(DEFAULT_DIALOGUE_LEVEL)
}

fn value_part(line: &str) -> &str {
    line.split_once(':').map_or(line, |(_, v)| v)
}

fn first_integer(text: &str) -> Option<u32> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|t| !t.is_empty())
        .and_then(|t| t.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
Stream Info
  Format: Dolby TrueHD
  Sampling Rate: 48000 Hz
  Dolby Atmos: true
Presentation 0
  Channels: 2.0
  Dialogue Level: -27 dB
Presentation 1
  Channels: 5.1
  Dialogue Level: -24 dB
Presentation 2
  Channel Layout: 7.1
  Dialogue Level: -20 dB
Presentation 3
  Channel Layout: 16 objects
";

    #[test]
    fn parses_full_report() {
        let info = parse_truehdd_info(REPORT).unwrap();
        assert!(info.atmos_present);
        assert_eq!(info.sample_rate, Some(48_000));
        assert_eq!(info.presentation_count, 4);
        assert_eq!(info.last_presentation, Some(2));
        assert_eq!(info.dialogue_level, Some(-20));
        assert_eq!(info.channel_layout.as_deref(), Some("16 objects"));
    }

    #[test]
    fn clamps_dialogue_level() {
        let info = parse_truehdd_info("Presentation 0\n  Dialogue Level: -40 dB\n").unwrap();
        assert_eq!(info.dialogue_level, Some(-31));
    }

    #[test]
    fn unparsable_dialogue_level_defaults() {
        let info = parse_truehdd_info("Presentation 1\n  Dialogue Level: n/a dB\n").unwrap();
        assert_eq!(info.dialogue_level, Some(DEFAULT_DIALOGUE_LEVEL));
        assert_eq!(info.last_presentation, Some(1));
    }

    #[test]
    fn dialogue_level_without_presentation_is_ignored() {
        let info = parse_truehdd_info("Dolby Atmos: no\nDialogue Level: -20 dB\n").unwrap();
        assert!(!info.atmos_present);
        assert_eq!(info.dialogue_level, None);
        assert_eq!(info.last_presentation, None);
    }

    #[test]
    fn first_atmos_flag_wins() {
        let info = parse_truehdd_info("Dolby Atmos: yes\nDolby Atmos: false\n").unwrap();
        assert!(info.atmos_present);
    }

    #[test]
    fn unrecognized_report_is_none() {
        assert!(parse_truehdd_info("").is_none());
        assert!(parse_truehdd_info("garbage\nmore garbage\n").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn info_failure_keeps_diagnostics() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("truehdd");
        std::fs::write(&script, "#!/bin/sh\necho 'invalid sync word' >&2\nexit 2\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = query_truehd(&script, Path::new("/nowhere/movie.thd")).unwrap_err();
        match err {
            InspectError::ProbeFailed {
                exit_code,
                diagnostics,
                ..
            } => {
                assert_eq!(exit_code, Some(2));
                assert_eq!(diagnostics, "invalid sync word");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
