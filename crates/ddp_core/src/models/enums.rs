//! Core enums used throughout the encoder.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allowed data rates (kbps) for Atmos 5.1 DDP output.
pub const ATMOS_5_1_BITRATES: &[u32] = &[384, 448, 576, 640, 768, 1024];

/// Allowed data rates (kbps) for Atmos 7.1 DDP output.
pub const ATMOS_7_1_BITRATES: &[u32] = &[1152, 1280, 1536, 1664];

/// Allowed data rates (kbps) for plain (non-Atmos) DDP output.
pub const DDP_BITRATES: &[u32] = &[192, 224, 256, 320, 384, 448, 512, 576, 640, 768, 1024];

/// Allowed spatial cluster counts for TrueHD Atmos output.
pub const SPATIAL_CLUSTERS: &[u32] = &[12, 14, 16];

/// Error returned when a string does not name a known option.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str, expected: &[&str]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected: expected.join(", "),
        }
    }
}

/// Which Atmos DDP variants to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AtmosMode {
    #[serde(rename = "5.1")]
    FiveOne,
    #[serde(rename = "7.1")]
    SevenOne,
    #[default]
    #[serde(rename = "both")]
    Both,
}

impl AtmosMode {
    pub const NAMES: &'static [&'static str] = &["5.1", "7.1", "both"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AtmosMode::FiveOne => "5.1",
            AtmosMode::SevenOne => "7.1",
            AtmosMode::Both => "both",
        }
    }

    /// Atmos variants requested by this mode, 5.1 before 7.1.
    pub fn variants(&self) -> Vec<OutputVariant> {
        match self {
            AtmosMode::FiveOne => vec![OutputVariant::Atmos51],
            AtmosMode::SevenOne => vec![OutputVariant::Atmos71],
            AtmosMode::Both => vec![OutputVariant::Atmos51, OutputVariant::Atmos71],
        }
    }

    pub fn includes_7_1(&self) -> bool {
        matches!(self, AtmosMode::SevenOne | AtmosMode::Both)
    }
}

impl std::fmt::Display for AtmosMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AtmosMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "5.1" => Ok(AtmosMode::FiveOne),
            "7.1" => Ok(AtmosMode::SevenOne),
            "both" => Ok(AtmosMode::Both),
            _ => Err(ParseEnumError::new("atmos mode", s, Self::NAMES)),
        }
    }
}

/// Rendering warp mode passed to the decoder and the mezzanine metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarpMode {
    #[default]
    Normal,
    Warping,
    #[serde(rename = "prologiciix")]
    PrologicIix,
    Loro,
}

impl WarpMode {
    pub const NAMES: &'static [&'static str] = &["normal", "warping", "prologiciix", "loro"];

    pub fn as_str(&self) -> &'static str {
        match self {
            WarpMode::Normal => "normal",
            WarpMode::Warping => "warping",
            WarpMode::PrologicIix => "prologiciix",
            WarpMode::Loro => "loro",
        }
    }
}

impl std::fmt::Display for WarpMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WarpMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(WarpMode::Normal),
            "warping" => Ok(WarpMode::Warping),
            "prologiciix" => Ok(WarpMode::PrologicIix),
            "loro" => Ok(WarpMode::Loro),
            _ => Err(ParseEnumError::new("warp mode", s, Self::NAMES)),
        }
    }
}

/// Dynamic range compression profile for line and RF mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrcProfile {
    FilmStandard,
    FilmLight,
    MusicStandard,
    MusicLight,
    Speech,
    #[default]
    None,
}

impl DrcProfile {
    pub const NAMES: &'static [&'static str] = &[
        "film_standard",
        "film_light",
        "music_standard",
        "music_light",
        "speech",
        "none",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrcProfile::FilmStandard => "film_standard",
            DrcProfile::FilmLight => "film_light",
            DrcProfile::MusicStandard => "music_standard",
            DrcProfile::MusicLight => "music_light",
            DrcProfile::Speech => "speech",
            DrcProfile::None => "none",
        }
    }
}

impl std::fmt::Display for DrcProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrcProfile {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "film_standard" => Ok(DrcProfile::FilmStandard),
            "film_light" => Ok(DrcProfile::FilmLight),
            "music_standard" => Ok(DrcProfile::MusicStandard),
            "music_light" => Ok(DrcProfile::MusicLight),
            "speech" => Ok(DrcProfile::Speech),
            "none" => Ok(DrcProfile::None),
            _ => Err(ParseEnumError::new("DRC profile", s, Self::NAMES)),
        }
    }
}

/// Downmix mode flagged as preferred in the bitstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownmixMode {
    #[serde(rename = "loro")]
    Loro,
    #[serde(rename = "ltrt")]
    Ltrt,
    #[serde(rename = "ltrt-pl2")]
    LtrtPl2,
    #[default]
    #[serde(rename = "not_indicated")]
    NotIndicated,
}

impl DownmixMode {
    pub const NAMES: &'static [&'static str] = &["loro", "ltrt", "ltrt-pl2", "not_indicated"];

    pub fn as_str(&self) -> &'static str {
        match self {
            DownmixMode::Loro => "loro",
            DownmixMode::Ltrt => "ltrt",
            DownmixMode::LtrtPl2 => "ltrt-pl2",
            DownmixMode::NotIndicated => "not_indicated",
        }
    }
}

impl std::fmt::Display for DownmixMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownmixMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loro" => Ok(DownmixMode::Loro),
            "ltrt" => Ok(DownmixMode::Ltrt),
            "ltrt-pl2" => Ok(DownmixMode::LtrtPl2),
            "not_indicated" => Ok(DownmixMode::NotIndicated),
            _ => Err(ParseEnumError::new("downmix mode", s, Self::NAMES)),
        }
    }
}

/// Container the encoding engine wraps DDP output in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Eac3,
    #[default]
    Mp4,
}

impl Container {
    pub const NAMES: &'static [&'static str] = &["eac3", "mp4"];

    /// File extension (and output element name) for this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Eac3 => "eac3",
            Container::Mp4 => "mp4",
        }
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Container {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eac3" | "ec3" => Ok(Container::Eac3),
            "mp4" => Ok(Container::Mp4),
            _ => Err(ParseEnumError::new("container", s, Self::NAMES)),
        }
    }
}

/// How streams without Atmos content are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Fall back to a single plain DDP 5.1 encode.
    #[default]
    Legacy,
    /// Refuse non-Atmos input.
    AtmosOnly,
}

impl Profile {
    pub const NAMES: &'static [&'static str] = &["legacy", "atmos_only"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Legacy => "legacy",
            Profile::AtmosOnly => "atmos_only",
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Profile::Legacy),
            "atmos_only" | "atmos-only" => Ok(Profile::AtmosOnly),
            _ => Err(ParseEnumError::new("profile", s, Self::NAMES)),
        }
    }
}

/// One encoded output produced by a run.
///
/// Resolved once from the requested mode and the detected stream; every
/// later stage (XML template, pipeline branch, output name) keys off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputVariant {
    Atmos51,
    Atmos71,
    PlainDdp,
    TrueHdAtmos,
}

impl OutputVariant {
    /// Legal data rates for this variant. Empty for lossless output.
    pub fn allowed_bitrates(&self) -> &'static [u32] {
        match self {
            OutputVariant::Atmos51 => ATMOS_5_1_BITRATES,
            OutputVariant::Atmos71 => ATMOS_7_1_BITRATES,
            OutputVariant::PlainDdp => DDP_BITRATES,
            OutputVariant::TrueHdAtmos => &[],
        }
    }

    pub fn default_bitrate(&self) -> Option<u32> {
        match self {
            OutputVariant::Atmos51 => Some(1024),
            OutputVariant::Atmos71 => Some(1536),
            OutputVariant::PlainDdp => Some(640),
            OutputVariant::TrueHdAtmos => None,
        }
    }

    /// Suffix used in intermediate and final file names.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            OutputVariant::Atmos51 => "atmos_5_1",
            OutputVariant::Atmos71 => "atmos_7_1",
            OutputVariant::PlainDdp => "5_1",
            OutputVariant::TrueHdAtmos => "truehd_atmos",
        }
    }

    pub fn is_atmos(&self) -> bool {
        !matches!(self, OutputVariant::PlainDdp)
    }

    /// Only 7.1 DDP Atmos needs the channel layout fix.
    pub fn needs_layout_fix(&self) -> bool {
        matches!(self, OutputVariant::Atmos71)
    }
}

impl std::fmt::Display for OutputVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputVariant::Atmos51 => write!(f, "Atmos 5.1"),
            OutputVariant::Atmos71 => write!(f, "Atmos 7.1"),
            OutputVariant::PlainDdp => write!(f, "DDP 5.1"),
            OutputVariant::TrueHdAtmos => write!(f, "TrueHD Atmos"),
        }
    }
}

/// Kind of input file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Dolby TrueHD elementary stream (`.thd`, `.mlp`).
    TrueHd,
    /// Existing `.atmos` mezzanine with its `.audio`/`.metadata` siblings.
    AtmosMezzanine,
    /// ADM broadcast wave (`.wav`, `.adm`).
    Adm,
}

impl InputKind {
    pub const EXTENSIONS: &'static [&'static str] = &["thd", "mlp", "atmos", "wav", "adm"];

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "thd" | "mlp" => Some(InputKind::TrueHd),
            "atmos" => Some(InputKind::AtmosMezzanine),
            "wav" | "adm" => Some(InputKind::Adm),
            _ => None,
        }
    }
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::TrueHd => write!(f, "TrueHD"),
            InputKind::AtmosMezzanine => write!(f, "Atmos mezzanine"),
            InputKind::Adm => write!(f, "ADM BWF"),
        }
    }
}

/// Pipeline stage, used to name the point of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decode,
    Resample,
    Encode(OutputVariant),
    LayoutFix,
    Cleanup,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Decode => write!(f, "decode"),
            Stage::Resample => write!(f, "resample"),
            Stage::Encode(variant) => write!(f, "encode ({})", variant),
            Stage::LayoutFix => write!(f, "layout fix"),
            Stage::Cleanup => write!(f, "cleanup"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atmos_mode_orders_variants() {
        assert_eq!(
            AtmosMode::Both.variants(),
            vec![OutputVariant::Atmos51, OutputVariant::Atmos71]
        );
        assert!(!AtmosMode::FiveOne.includes_7_1());
        assert!(AtmosMode::SevenOne.includes_7_1());
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("5.1".parse::<AtmosMode>().unwrap(), AtmosMode::FiveOne);
        assert_eq!("ltrt-pl2".parse::<DownmixMode>().unwrap(), DownmixMode::LtrtPl2);
        assert_eq!("prologiciix".parse::<WarpMode>().unwrap(), WarpMode::PrologicIix);
        assert_eq!("atmos-only".parse::<Profile>().unwrap(), Profile::AtmosOnly);

        let err = "loud".parse::<DrcProfile>().unwrap_err();
        assert!(err.to_string().contains("film_standard"));
    }

    #[test]
    fn display_matches_parse() {
        for name in DrcProfile::NAMES {
            let drc: DrcProfile = name.parse().unwrap();
            assert_eq!(drc.to_string(), *name);
        }
        for name in WarpMode::NAMES {
            let warp: WarpMode = name.parse().unwrap();
            assert_eq!(warp.to_string(), *name);
        }
    }

    #[test]
    fn serde_uses_cli_names() {
        let json = serde_json::to_string(&DownmixMode::LtrtPl2).unwrap();
        assert_eq!(json, "\"ltrt-pl2\"");
        let mode: AtmosMode = serde_json::from_str("\"7.1\"").unwrap();
        assert_eq!(mode, AtmosMode::SevenOne);
    }

    #[test]
    fn variant_bitrate_defaults_are_allowed() {
        for variant in [
            OutputVariant::Atmos51,
            OutputVariant::Atmos71,
            OutputVariant::PlainDdp,
        ] {
            let default = variant.default_bitrate().unwrap();
            assert!(variant.allowed_bitrates().contains(&default));
        }
        assert!(OutputVariant::TrueHdAtmos.default_bitrate().is_none());
    }

    #[test]
    fn input_kind_from_extension() {
        assert_eq!(
            InputKind::from_path(Path::new("movie.THD")),
            Some(InputKind::TrueHd)
        );
        assert_eq!(
            InputKind::from_path(Path::new("mix.atmos")),
            Some(InputKind::AtmosMezzanine)
        );
        assert_eq!(InputKind::from_path(Path::new("mix.wav")), Some(InputKind::Adm));
        assert_eq!(InputKind::from_path(Path::new("movie.mkv")), None);
        assert_eq!(InputKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn stage_names_variant() {
        assert_eq!(
            Stage::Encode(OutputVariant::Atmos71).to_string(),
            "encode (Atmos 7.1)"
        );
    }
}
