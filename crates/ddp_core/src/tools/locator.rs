//! Binary locator.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ToolSettings;
use crate::models::{InputKind, OutputVariant};

/// External tools the pipeline can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// TrueHD decoder (info and decode).
    Truehdd,
    /// Dolby Encoding Engine.
    Dee,
    /// 7.1 channel layout fix.
    LayoutFix,
    /// PCM resampler.
    Resampler,
    /// ADM BWF to Atmos mezzanine converter.
    AdmConverter,
}

impl Tool {
    /// Short name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Truehdd => "truehdd",
            Tool::Dee => "dee",
            Tool::LayoutFix => "eac3_7.1_atmos_fix",
            Tool::Resampler => "sox",
            Tool::AdmConverter => "atmos_conversion_tool",
        }
    }

    /// Human-readable description for error messages.
    pub fn description(&self) -> &'static str {
        match self {
            Tool::Truehdd => "TrueHD decoder",
            Tool::Dee => "Dolby Encoding Engine",
            Tool::LayoutFix => "7.1 layout fix tool",
            Tool::Resampler => "resampler",
            Tool::AdmConverter => "Dolby Atmos Conversion Tool",
        }
    }

    /// Name or path configured for this tool.
    fn configured<'a>(&self, settings: &'a ToolSettings) -> &'a str {
        match self {
            Tool::Truehdd => &settings.truehdd,
            Tool::Dee => &settings.dee,
            Tool::LayoutFix => &settings.layout_fix,
            Tool::Resampler => &settings.resampler,
            Tool::AdmConverter => &settings.adm_converter,
        }
    }

    /// Only looked up at its fixed install location.
    fn fixed_location(&self) -> bool {
        matches!(self, Tool::AdmConverter)
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A required tool could not be found.
#[derive(Error, Debug)]
#[error("{} '{name}' not found (searched {searched})", .tool.description())]
pub struct LocateError {
    pub tool: Tool,
    pub name: String,
    pub searched: String,
}

impl LocateError {
    pub fn not_found(tool: Tool, name: impl Into<String>, searched: impl Into<String>) -> Self {
        Self {
            tool,
            name: name.into(),
            searched: searched.into(),
        }
    }
}

/// Resolved absolute paths of located tools.
#[derive(Debug, Clone, Default)]
pub struct ToolPaths {
    paths: BTreeMap<Tool, PathBuf>,
}

impl ToolPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tool: Tool, path: impl Into<PathBuf>) {
        self.paths.insert(tool, path.into());
    }

    pub fn get(&self, tool: Tool) -> Option<&Path> {
        self.paths.get(&tool).map(PathBuf::as_path)
    }
}

/// Tools a run needs, known before the stream is inspected.
///
/// The resampler is not listed; it is located only once a run turns out
/// to need it.
pub fn required_tools(kind: InputKind, variants: &[OutputVariant]) -> Vec<Tool> {
    let mut tools = Vec::new();
    match kind {
        InputKind::TrueHd => tools.push(Tool::Truehdd),
        InputKind::Adm => tools.push(Tool::AdmConverter),
        InputKind::AtmosMezzanine => {}
    }
    tools.push(Tool::Dee);
    if variants.iter().any(|v| v.needs_layout_fix()) {
        tools.push(Tool::LayoutFix);
    }
    tools
}

/// Finds tool executables.
///
/// Search order: the binaries directory, then `PATH` (if enabled). The
/// ADM converter is only checked at its configured absolute path.
#[derive(Debug, Clone)]
pub struct BinaryLocator {
    binaries_dir: PathBuf,
    search_path: bool,
    settings: ToolSettings,
}

impl BinaryLocator {
    /// Locator for the given settings. A relative `binaries_dir` is taken
    /// relative to the running executable.
    pub fn from_settings(settings: &ToolSettings) -> Self {
        let configured = PathBuf::from(&settings.binaries_dir);
        let binaries_dir = if configured.is_absolute() {
            configured
        } else {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|p| p.join(&configured)))
                .unwrap_or(configured)
        };

        Self {
            binaries_dir,
            search_path: settings.search_path,
            settings: settings.clone(),
        }
    }

    /// Locate one tool.
    pub fn locate(&self, tool: Tool) -> Result<PathBuf, LocateError> {
        let name = tool.configured(&self.settings);
        let candidate = Path::new(name);

        if tool.fixed_location() || candidate.components().count() > 1 {
            return if candidate.is_file() {
                tracing::debug!("{} found at {}", tool, candidate.display());
                Ok(candidate.to_path_buf())
            } else {
                Err(LocateError::not_found(tool, name, candidate.display().to_string()))
            };
        }

        let bundled = self.binaries_dir.join(executable_name(name));
        if bundled.is_file() {
            tracing::debug!("{} found at {}", tool, bundled.display());
            return Ok(bundled);
        }

        if self.search_path {
            if let Ok(found) = which::which(name) {
                tracing::debug!("{} found on PATH at {}", tool, found.display());
                return Ok(found);
            }
        }

        let searched = if self.search_path {
            format!("{} and PATH", self.binaries_dir.display())
        } else {
            self.binaries_dir.display().to_string()
        };
        Err(LocateError::not_found(tool, name, searched))
    }

    /// Locate every tool in `tools`, failing on the first missing one.
    pub fn locate_all(&self, tools: &[Tool]) -> Result<ToolPaths, LocateError> {
        let mut paths = ToolPaths::new();
        for tool in tools {
            paths.insert(*tool, self.locate(*tool)?);
        }
        Ok(paths)
    }
}

/// Platform executable name (`.exe` on Windows).
fn executable_name(name: &str) -> String {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() || name.ends_with(suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn settings_for(dir: &Path) -> ToolSettings {
        ToolSettings {
            binaries_dir: dir.display().to_string(),
            search_path: false,
            ..ToolSettings::default()
        }
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(executable_name(name));
        fs::write(&path, "").unwrap();
        path
    }

    #[test]
    fn required_tools_follow_input_and_variants() {
        assert_eq!(
            required_tools(
                InputKind::TrueHd,
                &[OutputVariant::Atmos51, OutputVariant::Atmos71]
            ),
            vec![Tool::Truehdd, Tool::Dee, Tool::LayoutFix]
        );
        assert_eq!(
            required_tools(InputKind::TrueHd, &[OutputVariant::Atmos51]),
            vec![Tool::Truehdd, Tool::Dee]
        );
        assert_eq!(
            required_tools(InputKind::Adm, &[OutputVariant::TrueHdAtmos]),
            vec![Tool::AdmConverter, Tool::Dee]
        );
        assert_eq!(
            required_tools(InputKind::AtmosMezzanine, &[OutputVariant::Atmos51]),
            vec![Tool::Dee]
        );
    }

    #[test]
    fn finds_bundled_binary() {
        let dir = tempdir().unwrap();
        let dee = touch(dir.path(), "dee");
        let locator = BinaryLocator::from_settings(&settings_for(dir.path()));

        assert_eq!(locator.locate(Tool::Dee).unwrap(), dee);
    }

    #[test]
    fn missing_binary_names_tool() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "truehdd");
        let locator = BinaryLocator::from_settings(&settings_for(dir.path()));

        let err = locator
            .locate_all(&[Tool::Truehdd, Tool::Dee])
            .unwrap_err();
        assert_eq!(err.tool, Tool::Dee);
        assert!(err.to_string().contains("Dolby Encoding Engine"));
    }

    #[test]
    fn explicit_path_is_used_as_is() {
        let dir = tempdir().unwrap();
        let custom = dir.path().join("custom").join("my-dee");
        fs::create_dir_all(custom.parent().unwrap()).unwrap();
        fs::write(&custom, "").unwrap();

        let mut settings = settings_for(&dir.path().join("empty"));
        settings.dee = custom.display().to_string();
        let locator = BinaryLocator::from_settings(&settings);

        assert_eq!(locator.locate(Tool::Dee).unwrap(), custom);
    }

    #[test]
    fn adm_converter_only_at_fixed_path() {
        let dir = tempdir().unwrap();
        // A same-named file in binaries_dir must not count
        touch(dir.path(), "cmdline_atmos_conversion_tool");
        let mut settings = settings_for(dir.path());
        settings.adm_converter = dir.path().join("missing").display().to_string();
        let locator = BinaryLocator::from_settings(&settings);

        assert!(locator.locate(Tool::AdmConverter).is_err());

        let installed = touch(dir.path(), "converter");
        settings.adm_converter = installed.display().to_string();
        let locator = BinaryLocator::from_settings(&settings);
        assert_eq!(locator.locate(Tool::AdmConverter).unwrap(), installed);
    }
}
