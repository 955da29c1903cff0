//! Encoding engine version check.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::process::{run_captured, ToolCommand};

static VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Version\s+(\d+(?:\.\d+)*)").expect("valid regex"));

/// Outcome of comparing the installed engine with the recommended version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    Match(String),
    Mismatch { found: String, recommended: String },
    /// The version could not be read.
    Unknown,
}

impl VersionCheck {
    /// Warning to show the user, if any.
    pub fn warning(&self) -> Option<String> {
        match self {
            VersionCheck::Match(_) => None,
            VersionCheck::Mismatch { found, recommended } => Some(format!(
                "Dolby Encoding Engine {} detected; version {} is recommended",
                found, recommended
            )),
            VersionCheck::Unknown => {
                Some("Could not determine the Dolby Encoding Engine version".to_string())
            }
        }
    }
}

/// Run the engine without arguments and read its banner version.
///
/// The engine exits non-zero when given no job; only the banner matters.
pub fn detect_dee_version(dee: &Path) -> Option<String> {
    let output = run_captured(&ToolCommand::new("dee", dee)).ok()?;
    parse_version(&output.combined())
}

fn parse_version(text: &str) -> Option<String> {
    VERSION.captures(text).map(|caps| caps[1].to_string())
}

/// Compare a detected version with the recommended one.
pub fn check_dee_version(found: Option<&str>, recommended: &str) -> VersionCheck {
    match found {
        Some(v) if v == recommended => VersionCheck::Match(v.to_string()),
        Some(v) => VersionCheck::Mismatch {
            found: v.to_string(),
            recommended: recommended.to_string(),
        },
        None => VersionCheck::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_banner() {
        let banner = "Dolby Encoding Engine Version 5.2.1.42\nUsage: dee [options]";
        assert_eq!(parse_version(banner), Some("5.2.1.42".to_string()));
        assert_eq!(parse_version("Usage: dee"), None);
    }

    #[test]
    fn mismatch_is_a_warning_only() {
        assert_eq!(
            check_dee_version(Some("5.2.1"), "5.2.1"),
            VersionCheck::Match("5.2.1".to_string())
        );
        assert!(check_dee_version(Some("5.2.1"), "5.2.1").warning().is_none());

        let check = check_dee_version(Some("5.1.0"), "5.2.1");
        let warning = check.warning().unwrap();
        assert!(warning.contains("5.1.0"));
        assert!(warning.contains("5.2.1"));

        assert_eq!(check_dee_version(None, "5.2.1"), VersionCheck::Unknown);
    }

    #[cfg(unix)]
    #[test]
    fn reads_version_from_stub() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let dee = dir.path().join("dee");
        std::fs::write(&dee, "#!/bin/sh\necho 'Dolby Encoding Engine Version 5.2.1'\nexit 1\n")
            .unwrap();
        std::fs::set_permissions(&dee, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(detect_dee_version(&dee), Some("5.2.1".to_string()));
    }
}
