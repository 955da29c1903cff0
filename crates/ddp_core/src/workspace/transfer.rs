//! Moving finals out of the workspace.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Move `src` to `dest`, replacing any existing file.
///
/// A plain rename is tried first. Across filesystems the file is copied to
/// `<dest>.partial` and renamed into place, so `dest` never holds a
/// truncated file. The partial is removed on failure.
pub fn move_artifact(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(src, dest) {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(e),
        Err(e) => tracing::debug!(
            "rename {} -> {} failed ({}), copying",
            src.display(),
            dest.display(),
            e
        ),
    }

    let partial = partial_path(dest);
    let copied = fs::copy(src, &partial).and_then(|_| fs::rename(&partial, dest));
    if let Err(e) = copied {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }

    fs::remove_file(src)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn moves_and_replaces() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("ws").join("ab12cd_atmos_5_1.mp4");
        let dest = dir.path().join("movie_atmos_5_1.mp4");
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, "new").unwrap();
        fs::write(&dest, "old").unwrap();

        move_artifact(&src, &dest).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn missing_source_is_error() {
        let dir = tempdir().unwrap();
        let err = move_artifact(&dir.path().join("nope"), &dir.path().join("out")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!dir.path().join("out.partial").exists());
    }

    #[test]
    fn partial_suffix_is_appended() {
        assert_eq!(
            partial_path(Path::new("/out/movie.mp4")),
            PathBuf::from("/out/movie.mp4.partial")
        );
    }
}
