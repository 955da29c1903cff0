//! Command line flags.
//!
//! Every encode flag is optional; unset flags fall back to the `[encode]`
//! section of the config file.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use ddp_core::config::{EncodeSettings, Settings};
use ddp_core::models::{AtmosMode, Container, DownmixMode, DrcProfile, EncodeOptions, Profile, WarpMode};

pub const DEFAULT_CONFIG_PATH: &str = ".config/ddp_atmos.toml";

#[derive(Parser, Debug)]
#[command(
    name = "ddp-atmos-encode",
    version,
    about = "Convert TrueHD Atmos, Atmos mezzanines or ADM BWF into DDP Atmos"
)]
pub struct Cli {
    /// Input file (.thd, .mlp, .atmos, .wav) or a folder of inputs.
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Output folder (default: paths.output_folder from the config).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Atmos output mode: 5.1, 7.1 or both.
    #[arg(long, visible_alias = "am")]
    pub atmos_mode: Option<AtmosMode>,

    /// Atmos 5.1 data rate in kbps.
    #[arg(long = "bitrate-atmos-5-1", visible_alias = "ba")]
    pub bitrate_5_1: Option<u32>,

    /// Atmos 7.1 data rate in kbps.
    #[arg(long = "bitrate-atmos-7-1", visible_alias = "b7")]
    pub bitrate_7_1: Option<u32>,

    /// Plain DDP 5.1 data rate in kbps, used when the input has no Atmos.
    #[arg(long)]
    pub bitrate_ddp: Option<u32>,

    /// Dynamic range control profile.
    #[arg(short = 'd', long)]
    pub drc: Option<DrcProfile>,

    /// Dialogue Intelligence (true/false).
    #[arg(long, visible_alias = "di", action = ArgAction::Set)]
    pub dialogue_intelligence: Option<bool>,

    /// Ignore the stream's dialogue level and use 0.
    #[arg(long = "disable-dbfs", visible_alias = "nd")]
    pub disable_dialogue_recovery: bool,

    /// Preferred downmix mode.
    #[arg(long = "preferred-downmix-mode", visible_alias = "pd")]
    pub downmix: Option<DownmixMode>,

    /// Warp mode for the Atmos decode.
    #[arg(short = 'w', long)]
    pub warp_mode: Option<WarpMode>,

    /// Conform the decoded bed to the standard layout (true/false).
    #[arg(long, action = ArgAction::Set)]
    pub bed_conform: Option<bool>,

    /// Spatial clusters for TrueHD Atmos output: 12, 14 or 16.
    #[arg(long, visible_alias = "sc")]
    pub spatial_clusters: Option<u32>,

    /// Produce TrueHD Atmos (MLP) instead of DDP.
    #[arg(long)]
    pub truehd_atmos: bool,

    /// Refuse inputs without Atmos instead of falling back to DDP 5.1.
    #[arg(long)]
    pub atmos_only: bool,

    /// Output container: eac3 or mp4.
    #[arg(long)]
    pub container: Option<Container>,

    /// Config file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Store the given encode flags as the new defaults.
    #[arg(long)]
    pub save_defaults: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Merge flags over configured encode defaults.
    pub fn apply(&self, encode: &mut EncodeSettings) {
        if let Some(mode) = self.atmos_mode {
            encode.atmos_mode = mode;
        }
        if let Some(bitrate) = self.bitrate_5_1 {
            encode.bitrate_5_1 = bitrate;
        }
        if let Some(bitrate) = self.bitrate_7_1 {
            encode.bitrate_7_1 = bitrate;
        }
        if let Some(bitrate) = self.bitrate_ddp {
            encode.bitrate_ddp = bitrate;
        }
        if let Some(drc) = self.drc {
            encode.drc = drc;
        }
        if let Some(enabled) = self.dialogue_intelligence {
            encode.dialogue_intelligence = enabled;
        }
        if self.disable_dialogue_recovery {
            encode.disable_dialogue_recovery = true;
        }
        if let Some(downmix) = self.downmix {
            encode.downmix = downmix;
        }
        if let Some(warp) = self.warp_mode {
            encode.warp_mode = warp;
        }
        if let Some(conform) = self.bed_conform {
            encode.bed_conform = conform;
        }
        if let Some(clusters) = self.spatial_clusters {
            encode.spatial_clusters = clusters;
        }
        if self.truehd_atmos {
            encode.truehd_atmos = true;
        }
        if self.atmos_only {
            encode.profile = Profile::AtmosOnly;
        }
        if let Some(container) = self.container {
            encode.container = container;
        }
    }

    pub fn output_dir(&self, settings: &Settings) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&settings.paths.output_folder))
    }

    pub fn encode_options(&self, settings: &Settings, input: &Path) -> EncodeOptions {
        EncodeOptions::from_settings(&settings.encode, input, self.output_dir(settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["ddp-atmos-encode"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn legacy_aliases_are_accepted() {
        let cli = parse(&[
            "-i", "movie.thd", "--am", "7.1", "--b7", "1664", "--di", "false", "--nd", "--pd",
            "ltrt", "--sc", "16",
        ]);
        assert_eq!(cli.atmos_mode, Some(AtmosMode::SevenOne));
        assert_eq!(cli.bitrate_7_1, Some(1664));
        assert_eq!(cli.dialogue_intelligence, Some(false));
        assert!(cli.disable_dialogue_recovery);
        assert_eq!(cli.downmix, Some(DownmixMode::Ltrt));
        assert_eq!(cli.spatial_clusters, Some(16));
    }

    #[test]
    fn unknown_choice_is_rejected() {
        let err = Cli::try_parse_from(["ddp-atmos-encode", "-i", "a.thd", "--drc", "loud"]);
        assert!(err.is_err());
    }

    #[test]
    fn flags_override_config_and_unset_flags_keep_it() {
        let mut encode = EncodeSettings {
            bitrate_5_1: 768,
            drc: DrcProfile::Speech,
            ..EncodeSettings::default()
        };
        let cli = parse(&["-i", "movie.thd", "--ba", "640", "--atmos-only", "--container", "eac3"]);
        cli.apply(&mut encode);

        assert_eq!(encode.bitrate_5_1, 640);
        assert_eq!(encode.drc, DrcProfile::Speech);
        assert_eq!(encode.profile, Profile::AtmosOnly);
        assert_eq!(encode.container, Container::Eac3);
    }

    #[test]
    fn output_defaults_to_configured_folder() {
        let settings = Settings::default();
        let cli = parse(&["-i", "movie.thd"]);
        assert_eq!(cli.output_dir(&settings), PathBuf::from("ddp_encode"));

        let cli = parse(&["-i", "movie.thd", "-o", "/tmp/out"]);
        let options = cli.encode_options(&settings, Path::new("movie.thd"));
        assert_eq!(options.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(options.input, PathBuf::from("movie.thd"));
    }
}
