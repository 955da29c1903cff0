//! End-to-end runs against shell stand-ins for the external tools.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use ddp_core::atmos::read_metadata;
use ddp_core::config::Settings;
use ddp_core::models::{AtmosMode, EncodeOptions, OutputVariant, Profile, Stage};
use ddp_core::orchestrator::{BatchRunner, CancelHandle, EncodeJob, PipelineError};
use tempfile::TempDir;

const ATMOS_REPORT: &str = "\
Stream Info
  Sampling Rate: 48000 Hz
  Dolby Atmos: true
Presentation 0
  Channels: 2.0
  Dialogue Level: -27 dB
Presentation 3
  Channel Layout: 16 objects
  Dialogue Level: -20 dB
";

const PLAIN_REPORT: &str = "\
Stream Info
  Sampling Rate: 48000 Hz
  Dolby Atmos: false
Presentation 0
  Channels: 5.1
  Dialogue Level: -27 dB
";

const METADATA: &str = "\
version: 0.5.1
presentations:
  - type: home
    metadata: decoded.atmos.metadata
    audio: decoded.atmos.audio
    scBedConfiguration: [0, 1, 2, 3, 6, 7, 4, 5]
    creationTool: truehdd
    creationToolVersion: 0.1.0
    sampleRate: 48000
    warpMode: normal
    bedInstances:
      - channels:
          - channel: L
            ID: 0
          - channel: LFE
            ID: 3
    objects:
      - ID: 8
";

const TRUEHDD: &str = r#"#!/bin/sh
cmd="$1"; shift
if [ "$cmd" = "info" ]; then
  cat "$1"
  exit 0
fi
out=""; fmt=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output-path) out="$2"; shift ;;
    --format) fmt="$2"; shift ;;
  esac
  shift
done
echo "50.0%"
if [ "$fmt" = "w64" ]; then
  printf pcm > "$out.w64"
else
  dir=$(dirname "$out")
  cp "@METADATA@" "$dir/decoded.atmos"
  printf audio > "$dir/decoded.atmos.audio"
  printf meta > "$dir/decoded.atmos.metadata"
fi
echo "100.0%"
"#;

const TRUEHDD_BROKEN_DECODE: &str = r#"#!/bin/sh
if [ "$1" = "info" ]; then
  cat "$2"
  exit 0
fi
echo "decoder crashed" >&2
exit 3
"#;

const DEE: &str = r#"#!/bin/sh
if [ "$#" -eq 0 ]; then
  echo "Dolby Encoding Engine Version 5.2.1"
  exit 1
fi
case "$2" in
  *@FAIL@*) echo "encode failed" >&2; exit 4 ;;
esac
src=$(grep -o '<file_name>[^<]*' "$2" | head -n 1 | cut -d'>' -f2)
case "$src" in
  *.atmos)
    for ref in $(sed -n -e 's/^ *audio: *//p' -e 's/^ *metadata: *//p' "$src"); do
      [ -f "$ref" ] || { echo "master names missing $ref" >&2; exit 5; }
    done
    cp "$src" "@CAPTURE@" ;;
esac
out=$(grep -o '<file_name>[^<]*' "$2" | tail -n 1 | cut -d'>' -f2)
echo "Overall progress: 50.0"
echo "[Source loudness] measured_loudness=-24.6"
printf encoded > "$out"
echo "Overall progress: 100.0"
"#;

const LAYOUT_FIX: &str = "#!/bin/sh\nprintf fixed > \"$4\"\n";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        fs::create_dir_all(fixture.tools()).unwrap();
        fs::write(fixture.path("metadata.yaml"), METADATA).unwrap();
        fixture.install(
            "truehdd",
            &TRUEHDD.replace("@METADATA@", &fixture.path("metadata.yaml").display().to_string()),
        );
        fixture.install_dee("no-such-variant");
        fixture.install("eac3_7.1_atmos_fix", LAYOUT_FIX);
        fixture
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn tools(&self) -> PathBuf {
        self.path("tools")
    }

    fn out(&self) -> PathBuf {
        self.path("out")
    }

    fn logs(&self) -> PathBuf {
        self.path("logs")
    }

    fn install(&self, name: &str, script: &str) {
        let path = self.tools().join(name);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Fake dee failing on job files whose name contains `fail_on`.
    fn install_dee(&self, fail_on: &str) {
        let script = DEE
            .replace("@FAIL@", fail_on)
            .replace("@CAPTURE@", &self.captured_master().display().to_string());
        self.install("dee", &script);
    }

    /// Last `.atmos` master dee was given.
    fn captured_master(&self) -> PathBuf {
        self.path("captured.atmos")
    }

    fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.tools.binaries_dir = self.tools().display().to_string();
        settings.tools.search_path = false;
        settings.paths.logs_folder = self.logs().display().to_string();
        settings
    }

    fn input(&self, name: &str, report: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, report).unwrap();
        path
    }

    fn options(&self, input: &Path) -> EncodeOptions {
        EncodeOptions::from_settings(&self.settings().encode, input, self.out())
    }

    fn job(&self, options: EncodeOptions) -> EncodeJob {
        EncodeJob::new(options, self.settings())
    }
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn both_mode_produces_two_outputs() {
    let fx = Fixture::new();
    let input = fx.input("input_atmos.thd", ATMOS_REPORT);

    let report = fx.job(fx.options(&input)).run().unwrap();

    assert_eq!(
        entries(&fx.out()),
        vec!["input_atmos_atmos_5_1.mp4", "input_atmos_atmos_7_1.mp4"]
    );
    assert_eq!(
        fs::read_to_string(fx.out().join("input_atmos_atmos_5_1.mp4")).unwrap(),
        "encoded"
    );
    assert_eq!(
        fs::read_to_string(fx.out().join("input_atmos_atmos_7_1.mp4")).unwrap(),
        "fixed"
    );
    assert_eq!(report.dialogue_level, -20);
    assert_eq!(report.outputs.len(), 2);
    assert_eq!(report.outputs[0].variant, OutputVariant::Atmos51);
    assert!(report.log_file.starts_with(fx.logs()));
    assert!(report.log_file.is_file());
}

#[test]
fn decoded_master_is_conformed_and_relinked() {
    let fx = Fixture::new();
    let input = fx.input("movie.thd", ATMOS_REPORT);

    fx.job(fx.options(&input)).run().unwrap();

    let doc = read_metadata(&fx.captured_master()).unwrap();
    let p = &doc["presentations"][0];
    let bed: Vec<i64> = p["scBedConfiguration"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    assert_eq!(bed, vec![3]);

    let channels = p["bedInstances"][0]["channels"].as_sequence().unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0]["channel"], "LFE");

    let objects: Vec<i64> = p["objects"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|o| o["ID"].as_i64().unwrap())
        .collect();
    assert_eq!(objects, (10..=20).collect::<Vec<_>>());

    let audio = p["audio"].as_str().unwrap();
    let metadata = p["metadata"].as_str().unwrap();
    assert!(audio.ends_with(".atmos.audio") && !audio.starts_with("decoded"), "{audio}");
    assert_eq!(metadata, audio.replace(".audio", ".metadata"));
}

#[test]
fn disabled_dialogue_recovery_uses_zero() {
    let fx = Fixture::new();
    let input = fx.input("movie.thd", ATMOS_REPORT);
    let mut options = fx.options(&input);
    options.atmos_mode = AtmosMode::FiveOne;
    options.disable_dialogue_recovery = true;

    let report = fx.job(options).run().unwrap();

    assert_eq!(report.dialogue_level, 0);
    assert_eq!(entries(&fx.out()), vec!["movie_atmos_5_1.mp4"]);
}

#[test]
fn legacy_profile_falls_back_to_plain_ddp() {
    let fx = Fixture::new();
    let input = fx.input("movie.thd", PLAIN_REPORT);

    let report = fx.job(fx.options(&input)).run().unwrap();

    assert_eq!(entries(&fx.out()), vec!["movie_5_1.mp4"]);
    assert_eq!(report.outputs[0].variant, OutputVariant::PlainDdp);
}

#[test]
fn atmos_only_profile_rejects_plain_truehd() {
    let fx = Fixture::new();
    let input = fx.input("movie.thd", PLAIN_REPORT);
    let mut options = fx.options(&input);
    options.profile = Profile::AtmosOnly;

    let err = fx.job(options).run().unwrap_err();

    assert!(matches!(err, PipelineError::UnsupportedStream { .. }), "{err}");
    assert_eq!(err.exit_code(), 1);
    assert!(!fx.out().exists());
    assert!(!fx.logs().exists());
}

#[test]
fn missing_encoder_fails_before_any_output() {
    let fx = Fixture::new();
    fs::remove_file(fx.tools().join("dee")).unwrap();
    let input = fx.input("movie.thd", ATMOS_REPORT);

    let err = fx.job(fx.options(&input)).run().unwrap_err();

    assert!(matches!(err, PipelineError::MissingBinary(_)), "{err}");
    assert_eq!(err.exit_code(), 127);
    assert!(!fx.out().exists());
    assert!(!fx.logs().exists());
}

#[test]
fn decode_failure_removes_workspace() {
    let fx = Fixture::new();
    fx.install("truehdd", TRUEHDD_BROKEN_DECODE);
    let input = fx.input("movie.thd", ATMOS_REPORT);

    let err = fx.job(fx.options(&input)).run().unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Decode));
    assert_eq!(err.tool_exit_code(), Some(3));
    assert_eq!(err.exit_code(), 1);
    assert!(entries(&fx.out()).is_empty());
}

#[test]
fn failed_second_encode_publishes_nothing() {
    let fx = Fixture::new();
    fx.install_dee("atmos_7_1");
    let input = fx.input("movie.thd", ATMOS_REPORT);

    let err = fx.job(fx.options(&input)).run().unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Encode(OutputVariant::Atmos71)));
    assert_eq!(err.tool_exit_code(), Some(4));
    assert!(entries(&fx.out()).is_empty());
}

#[test]
fn cancelled_run_exits_130() {
    let fx = Fixture::new();
    let input = fx.input("movie.thd", ATMOS_REPORT);
    let cancel = CancelHandle::new();
    cancel.cancel();

    let err = fx
        .job(fx.options(&input))
        .with_cancel_handle(cancel)
        .run()
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled { .. }), "{err}");
    assert_eq!(err.exit_code(), 130);
    assert!(!fx.out().exists());
}

#[test]
fn existing_mezzanine_skips_the_decoder() {
    let fx = Fixture::new();
    fs::remove_file(fx.tools().join("truehdd")).unwrap();
    let atmos = fx.path("mix.atmos");
    let master = METADATA.replace("decoded.", "mix.");
    fs::write(&atmos, &master).unwrap();
    fs::write(fx.path("mix.atmos.audio"), "audio").unwrap();
    fs::write(fx.path("mix.atmos.metadata"), "meta").unwrap();
    let mut options = fx.options(&atmos);
    options.atmos_mode = AtmosMode::FiveOne;

    fx.job(options).run().unwrap();

    assert_eq!(entries(&fx.out()), vec!["mix_atmos_5_1.mp4"]);
    // The source triplet is copied, never consumed or edited.
    assert!(fx.path("mix.atmos.metadata").is_file());
    assert_eq!(fs::read_to_string(&atmos).unwrap(), master);

    let doc = read_metadata(&fx.captured_master()).unwrap();
    let audio = doc["presentations"][0]["audio"].as_str().unwrap();
    assert_ne!(audio, "mix.atmos.audio");
    assert!(audio.ends_with(".atmos.audio"));
}

#[test]
fn batch_encodes_every_input() {
    let fx = Fixture::new();
    let inputs = fx.path("inputs");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("a.thd"), ATMOS_REPORT).unwrap();
    fs::write(inputs.join("b.thd"), PLAIN_REPORT).unwrap();
    fs::write(inputs.join("readme.txt"), "ignored").unwrap();

    let mut template = fx.options(&inputs);
    template.atmos_mode = AtmosMode::FiveOne;
    let report = BatchRunner::new(template, fx.settings())
        .run_dir(&inputs)
        .unwrap();

    assert_eq!(report.items.len(), 2);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(entries(&fx.out()), vec!["a_atmos_5_1.mp4", "b_5_1.mp4"]);
}
