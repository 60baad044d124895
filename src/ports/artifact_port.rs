//! Model artifact persistence port trait.

use crate::domain::artifact::ModelArtifact;
use crate::domain::error::IndexcastError;

pub trait ArtifactPort {
    /// Write the artifact, replacing any previous one wholesale.
    fn save(&self, artifact: &ModelArtifact) -> Result<(), IndexcastError>;

    /// Load the current artifact. Missing or corrupt files are load errors.
    fn load(&self) -> Result<ModelArtifact, IndexcastError>;
}
