//! Upload collaborator: turns a user-supplied file into a staged, readable
//! path with an opaque id, and disposes of it afterwards.

use std::path::PathBuf;

use crate::error::ValidationError;

/// A staged upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub id: String,
    pub path: PathBuf,
}

pub trait UploadSource {
    /// Accept the upload and return where it can be read.
    fn handle_upload(&mut self) -> Result<Upload, ValidationError>;

    /// Dispose of the staged artifact. Never fails; problems are logged.
    fn cleanup(&mut self, id: &str);
}

/// Copies a local file into a staging directory under a fresh id.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    source: PathBuf,
    staging_dir: PathBuf,
}

impl StagedUpload {
    pub fn new(source: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            staging_dir: staging_dir.into(),
        }
    }

    fn staged_path(&self, id: &str) -> PathBuf {
        self.staging_dir.join(format!("{id}.json"))
    }
}

impl UploadSource for StagedUpload {
    fn handle_upload(&mut self) -> Result<Upload, ValidationError> {
        if !self.source.is_file() {
            return Err(ValidationError::UploadFailed(format!(
                "The file {} did not upload properly. Please try again.",
                self.source.display()
            )));
        }
        std::fs::create_dir_all(&self.staging_dir)
            .map_err(|e| ValidationError::UploadFailed(format!("cannot create staging area: {e}")))?;

        let id = uuid::Uuid::new_v4().simple().to_string();
        let path = self.staged_path(&id);
        std::fs::copy(&self.source, &path)
            .map_err(|e| ValidationError::UploadFailed(format!("cannot stage upload: {e}")))?;

        tracing::debug!(id = %id, source = %self.source.display(), "upload staged");
        Ok(Upload { id, path })
    }

    fn cleanup(&mut self, id: &str) {
        let path = self.staged_path(id);
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(id, "staged upload removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(id, error = %e, "failed to remove staged upload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_copy_and_cleans_it_up() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("export.json");
        std::fs::write(&source, b"{}").unwrap();

        let mut upload = StagedUpload::new(&source, dir.path().join("staging"));
        let staged = upload.handle_upload().unwrap();
        assert!(staged.path.is_file());
        assert_ne!(staged.path, source);

        upload.cleanup(&staged.id);
        assert!(!staged.path.exists());
        assert!(source.exists());
        // A second cleanup is a no-op.
        upload.cleanup(&staged.id);
    }

    #[test]
    fn missing_source_fails_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut upload = StagedUpload::new(dir.path().join("nope.json"), dir.path());
        assert!(matches!(
            upload.handle_upload(),
            Err(ValidationError::UploadFailed(_))
        ));
    }
}
