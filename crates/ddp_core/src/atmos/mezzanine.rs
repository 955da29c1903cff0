//! The `.atmos` file triplet.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Paths of one Atmos mezzanine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MezzanineSet {
    pub atmos: PathBuf,
    pub audio: PathBuf,
    pub metadata: PathBuf,
}

impl MezzanineSet {
    /// Triplet belonging to a `.atmos` master file.
    pub fn from_atmos(atmos: impl Into<PathBuf>) -> Self {
        let atmos = atmos.into();
        Self {
            audio: with_suffix(&atmos, ".audio"),
            metadata: with_suffix(&atmos, ".metadata"),
            atmos,
        }
    }

    /// Triplet named `<stem>.atmos*` in `dir`.
    pub fn in_dir(dir: &Path, stem: &str) -> Self {
        Self::from_atmos(dir.join(format!("{}.atmos", stem)))
    }

    pub fn files(&self) -> [&Path; 3] {
        [&self.atmos, &self.audio, &self.metadata]
    }

    /// Files of the triplet that do not exist.
    pub fn missing(&self) -> Vec<&Path> {
        self.files().into_iter().filter(|p| !p.is_file()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// First `.atmos` master in `dir`, by name.
    pub fn find_in(dir: &Path) -> io::Result<Option<Self>> {
        let mut masters: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().map_or(false, |e| e == "atmos"))
            .collect();
        masters.sort();
        Ok(masters.into_iter().next().map(Self::from_atmos))
    }

    /// Rename the triplet to `<stem>.atmos*` in `dir`.
    pub fn rename_to(&self, dir: &Path, stem: &str) -> io::Result<Self> {
        let target = Self::in_dir(dir, stem);
        if target == *self {
            return Ok(target);
        }
        for (from, to) in self.files().into_iter().zip(target.files()) {
            fs::rename(from, to)?;
        }
        Ok(target)
    }

    /// Copy the triplet to `<stem>.atmos*` in `dir`.
    pub fn copy_to(&self, dir: &Path, stem: &str) -> io::Result<Self> {
        let target = Self::in_dir(dir, stem);
        for (from, to) in self.files().into_iter().zip(target.files()) {
            fs::copy(from, to)?;
        }
        Ok(target)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_triplet(dir: &Path, stem: &str) -> MezzanineSet {
        let set = MezzanineSet::in_dir(dir, stem);
        for file in set.files() {
            fs::write(file, stem).unwrap();
        }
        set
    }

    #[test]
    fn siblings_append_suffix() {
        let set = MezzanineSet::from_atmos("/ws/abc123.atmos");
        assert_eq!(set.audio, PathBuf::from("/ws/abc123.atmos.audio"));
        assert_eq!(set.metadata, PathBuf::from("/ws/abc123.atmos.metadata"));
    }

    #[test]
    fn reports_missing_files() {
        let dir = tempdir().unwrap();
        let set = write_triplet(dir.path(), "mix");
        assert!(set.is_complete());

        fs::remove_file(&set.metadata).unwrap();
        assert_eq!(set.missing(), vec![set.metadata.as_path()]);
    }

    #[test]
    fn find_and_rename() {
        let dir = tempdir().unwrap();
        write_triplet(dir.path(), "decoded");

        let found = MezzanineSet::find_in(dir.path()).unwrap().unwrap();
        let renamed = found.rename_to(dir.path(), "abc123").unwrap();

        assert!(renamed.is_complete());
        assert!(renamed.atmos.ends_with("abc123.atmos"));
        assert!(!found.atmos.exists());
    }

    #[test]
    fn copy_leaves_source() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        let original = write_triplet(src.path(), "mix");

        let copy = original.copy_to(dst.path(), "abc123").unwrap();
        assert!(copy.is_complete());
        assert!(original.is_complete());
    }

    #[test]
    fn find_in_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(MezzanineSet::find_in(dir.path()).unwrap().is_none());
    }
}
