//! Per-job scratch directory.
//!
//! Every job downloads into its own directory under `download_dir`, so file names from
//! different jobs never collide and never share a namespace with credential files. The
//! directory is removed when the workspace is closed or dropped, on every exit path.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    /// Creates `{parent}/job-{job_id}-XXXX/`.
    pub fn create(parent: &Path, job_id: &str) -> io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("job-{}-", job_id))
            .tempdir_in(parent)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Whether `path` lies inside this workspace.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(self.dir.path())
    }

    /// Removes everything a failed attempt left behind, keeping the directory itself.
    pub fn clear(&self) -> io::Result<()> {
        for entry in std::fs::read_dir(self.dir.path())? {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Best-effort removal of one file.
    pub fn remove_file(&self, path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }

    /// Regular files currently in the workspace (non-recursive).
    pub fn files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(self.dir.path())? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }

    /// Deletes the workspace now and reports failures; dropping does the same silently.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            log::warn!("Failed to remove job workspace {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_is_removed_on_close() {
        let parent = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::create(parent.path(), "abc").unwrap();
        let file = ws.path().join("a.zip");
        std::fs::write(&file, b"data").unwrap();
        let dir = ws.path().to_path_buf();

        assert!(ws.contains(&file));
        assert_eq!(ws.files().unwrap(), vec![file.clone()]);

        ws.close();
        assert!(!dir.exists());
    }

    #[test]
    fn test_workspace_is_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let dir = {
            let ws = JobWorkspace::create(parent.path(), "drop").unwrap();
            std::fs::write(ws.path().join("x"), b"1").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn test_clear_keeps_directory() {
        let parent = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::create(parent.path(), "clear").unwrap();
        std::fs::write(ws.path().join("partial.bin"), b"12").unwrap();
        std::fs::create_dir(ws.path().join("nested")).unwrap();

        ws.clear().unwrap();
        assert!(ws.path().exists());
        assert!(ws.files().unwrap().is_empty());
    }

    #[test]
    fn test_outside_path_not_contained() {
        let parent = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::create(parent.path(), "x").unwrap();
        assert!(!ws.contains(&parent.path().join("credentials").join("1.json")));
    }
}
