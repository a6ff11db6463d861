use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::media::VideoId;

/// Working directory shared by the transcoding engine and batch downloads.
///
/// The directory itself lives for the whole process; individual artifacts
/// inside it are request-scoped and carry request-unique names, so no
/// locking is needed across concurrent jobs.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Register a named artifact inside the workspace for guaranteed
    /// release. The file does not have to exist yet.
    pub fn scoped(&self, name: &str) -> ScopedArtifact {
        ScopedArtifact::new(self.dir.path().join(name))
    }
}

/// Request-unique artifact stem: `<unix-millis>-<video-id>-<token>`.
///
/// The timestamp plus a random token keeps concurrent requests for the
/// same video from ever sharing a path.
pub fn unique_stem(id: &VideoId) -> String {
    let token = uuid::Uuid::new_v4().to_string();
    format!(
        "{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        id,
        &token[..8]
    )
}

/// Temp-path guard that deletes its file exactly once, on whichever exit
/// path runs first: explicit `cleanup()` or `Drop`.
///
/// Deletion failures are logged and never surfaced; a cleanup problem must
/// not mask the request's primary result or error.
#[derive(Debug)]
pub struct ScopedArtifact {
    path: PathBuf,
    armed: bool,
}

impl ScopedArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the artifact now instead of waiting for drop.
    pub fn cleanup(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to remove temp artifact"
                );
            }
        }
    }
}

impl Drop for ScopedArtifact {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_id() -> VideoId {
        VideoId::parse("dQw4w9WgXcQ").unwrap()
    }

    #[test]
    fn test_artifact_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artifact.mp3");
        std::fs::write(&path, b"data").unwrap();

        {
            let _guard = ScopedArtifact::new(path.clone());
        }
        assert!(!path.exists(), "drop should remove the artifact");
    }

    #[test]
    fn test_cleanup_is_exactly_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artifact.mp3");
        std::fs::write(&path, b"data").unwrap();

        let mut guard = ScopedArtifact::new(path.clone());
        guard.cleanup();
        assert!(!path.exists());

        // A file recreated at the same path after cleanup belongs to
        // someone else; drop must not touch it again.
        std::fs::write(&path, b"new owner").unwrap();
        drop(guard);
        assert!(path.exists(), "second release must not fire");
    }

    #[test]
    fn test_missing_file_tolerated() {
        let dir = TempDir::new().unwrap();
        let mut guard = ScopedArtifact::new(dir.path().join("never-created"));
        guard.cleanup();
    }

    #[test]
    fn test_unique_stems_do_not_collide() {
        let id = test_id();
        let a = unique_stem(&id);
        let b = unique_stem(&id);
        assert_ne!(a, b);
        assert!(a.contains("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_workspace_scoped_paths_live_under_workspace() {
        let ws = Workspace::new().unwrap();
        let artifact = ws.scoped("abc-in.webm");
        assert!(artifact.path().starts_with(ws.path()));
    }
}
