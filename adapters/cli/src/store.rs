//! Directory-backed profile store for the command-line adapter.

use std::fs;
use std::path::PathBuf;

use tracing::warn;

use skillweave_system_persistence::ProfileStore;

/// Stores each profile blob as a file beneath a root directory.
pub(crate) struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ProfileStore for DirStore {
    fn read(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.root.join(key)).ok()
    }

    fn write(&mut self, key: &str, value: String) {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), %error, "could not create profile directory");
                return;
            }
        }
        if let Err(error) = fs::write(&path, value) {
            warn!(path = %path.display(), %error, "could not write profile blob");
        }
    }
}
