use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What a workspace file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    JobFile,
    /// Part of an Atmos mezzanine triplet.
    Mezzanine,
    /// Decoded PCM.
    Pcm,
    Resampled,
    /// Engine output that is superseded by a later stage.
    Encoded,
    /// File to be published.
    Final,
}

impl ArtifactKind {
    pub fn is_final(&self) -> bool {
        matches!(self, ArtifactKind::Final)
    }
}

/// A file created in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, kind: ArtifactKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}
