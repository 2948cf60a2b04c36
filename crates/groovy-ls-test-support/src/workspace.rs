use std::fs;
use std::path::{Path, PathBuf};

/// A disposable on-disk workspace for C8 file-walk tests. The backing [`tempfile::TempDir`]
/// is removed when this value drops.
pub struct TestWorkspace {
    dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().expect("create temp workspace directory") }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `contents` to `relative_path` under the workspace root, creating any
    /// missing parent directories. Returns the file's absolute path.
    pub fn write_file(&self, relative_path: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// Convenience for the conventional Maven/Gradle source root layout: writes
    /// `src/main/groovy/<relative_path>` and returns its absolute path.
    pub fn write_groovy_source(&self, relative_path: &str, contents: &str) -> PathBuf {
        self.write_file(&format!("src/main/groovy/{relative_path}"), contents)
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
