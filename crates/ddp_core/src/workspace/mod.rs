//! Per-run workspace and artifact handling.
//!
//! Every intermediate lives in a private directory under the output
//! folder, named after the run id. Finals are moved out once all stages
//! succeed; everything else goes with the directory on cleanup.

mod artifact;
mod transfer;

pub use artifact::{Artifact, ArtifactKind};
pub use transfer::move_artifact;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Isolated directory for one run.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// Create `<output_dir>/<run_id>.XXXXXX`.
    pub fn create(output_dir: &Path, run_id: &str) -> io::Result<Self> {
        fs::create_dir_all(output_dir)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}.", run_id))
            .rand_bytes(6)
            .tempdir_in(output_dir)?
            .keep();
        tracing::debug!("Created workspace {}", dir.display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.join(name)
    }

    /// Remove tracked intermediates, any stray file, then the directory.
    ///
    /// Final artifacts are skipped; by this point they have either been
    /// moved out or the run failed and they are stray anyway.
    pub fn cleanup(&self, artifacts: &[Artifact]) -> io::Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }

        for artifact in artifacts.iter().filter(|a| !a.kind.is_final()) {
            match fs::remove_file(&artifact.path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", artifact.path.display(), e),
            }
        }

        fs::remove_dir_all(&self.dir)?;
        tracing::debug!("Removed workspace {}", self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn workspace_is_named_after_run() {
        let out = tempdir().unwrap();
        let ws = Workspace::create(&out.path().join("ddp_encode"), "ab12cd").unwrap();

        let name = ws.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("ab12cd."));
        assert_eq!(name.len(), "ab12cd.".len() + 6);
        assert!(ws.path().is_dir());
    }

    #[test]
    fn concurrent_runs_get_distinct_dirs() {
        let out = tempdir().unwrap();
        let a = Workspace::create(out.path(), "ab12cd").unwrap();
        let b = Workspace::create(out.path(), "ab12cd").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn cleanup_removes_everything() {
        let out = tempdir().unwrap();
        let ws = Workspace::create(out.path(), "ab12cd").unwrap();
        let job = ws.join("ab12cd_encode_atmos_5_1.xml");
        fs::write(&job, "<job_config/>").unwrap();
        fs::write(ws.join("dee_scratch.tmp"), "x").unwrap();

        ws.cleanup(&[Artifact::new(&job, ArtifactKind::JobFile)]).unwrap();
        assert!(!ws.path().exists());

        // Second cleanup is a no-op.
        ws.cleanup(&[]).unwrap();
    }
}
