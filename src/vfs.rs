//! Read-only virtual filesystem over the target repository.
//!
//! The core requests files by repo-relative path and never writes. The trait
//! keeps the analysis pipeline independent of where sources come from: the
//! CLI hands it a disk-backed tree, tests hand it an in-memory map.

use anyhow::Result;
use log::warn;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read-only access to a rooted source tree.
pub trait VirtualFS {
    /// Repo-relative paths of all files under `prefix`, sorted.
    fn list(&self, prefix: &str) -> Vec<String>;

    /// Full text of a file by repo-relative path, or `None` if absent or
    /// unreadable.
    fn read(&self, path: &str) -> Option<String>;

    /// Whether a file exists at the given repo-relative path.
    fn exists(&self, path: &str) -> bool {
        self.read(path).is_some()
    }
}

/// Disk-backed [`VirtualFS`] rooted at a project directory.
///
/// The tree is walked once at construction; hidden directories, `node_modules`,
/// `vendor`, `tmp`, and `log` are skipped. Inaccessible entries are logged
/// and skipped rather than failing the scan.
pub struct DiskFs {
    root: PathBuf,
    paths: Vec<String>,
}

impl DiskFs {
    /// Scan the project directory.
    ///
    /// # Errors
    ///
    /// Returns an error only if the root directory itself cannot be walked.
    pub fn scan(root: PathBuf) -> Result<DiskFs> {
        let mut paths = Vec::new();

        for entry in WalkDir::new(&root).into_iter().filter_entry(|e| {
            if e.path() == root {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            let skip = name.starts_with('.')
                || name == "node_modules"
                || name == "vendor"
                || name == "tmp"
                || name == "log";
            !skip
        }) {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        if let Ok(rel) = entry.path().strip_prefix(&root) {
                            paths.push(rel.to_string_lossy().replace('\\', "/"));
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to access path: {}", e);
                }
            }
        }

        paths.sort();
        Ok(DiskFs { root, paths })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl VirtualFS for DiskFs {
    fn list(&self, prefix: &str) -> Vec<String> {
        self.paths
            .iter()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn read(&self, path: &str) -> Option<String> {
        if !self.paths.iter().any(|p| p == path) {
            return None;
        }
        fs::read_to_string(self.root.join(path)).ok()
    }
}

/// In-memory [`VirtualFS`] for tests.
#[derive(Default)]
pub struct MemoryFs {
    files: BTreeMap<String, String>,
}

impl MemoryFs {
    pub fn new() -> MemoryFs {
        MemoryFs::default()
    }

    pub fn add(mut self, path: &str, content: &str) -> MemoryFs {
        self.files.insert(path.to_string(), content.to_string());
        self
    }
}

impl VirtualFS for MemoryFs {
    fn list(&self, prefix: &str) -> Vec<String> {
        self.files
            .keys()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn read(&self, path: &str) -> Option<String> {
        self.files.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_lists_files_sorted() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "config/routes.rb", "root 'home#index'");
        write(temp.path(), "app/controllers/users_controller.rb", "class UsersController; end");
        write(temp.path(), "Gemfile", "gem 'rails'");

        let vfs = DiskFs::scan(temp.path().to_path_buf()).unwrap();
        let all = vfs.list("");
        assert_eq!(
            all,
            vec![
                "Gemfile",
                "app/controllers/users_controller.rb",
                "config/routes.rb",
            ]
        );
    }

    #[test]
    fn test_list_with_prefix() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app/controllers/users_controller.rb", "");
        write(temp.path(), "app/models/user.rb", "");
        write(temp.path(), "config/routes.rb", "");

        let vfs = DiskFs::scan(temp.path().to_path_buf()).unwrap();
        let controllers = vfs.list("app/controllers/");
        assert_eq!(controllers, vec!["app/controllers/users_controller.rb"]);
    }

    #[test]
    fn test_read_and_missing() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "config/routes.rb", "root 'home#index'");

        let vfs = DiskFs::scan(temp.path().to_path_buf()).unwrap();
        assert_eq!(
            vfs.read("config/routes.rb").as_deref(),
            Some("root 'home#index'")
        );
        assert!(vfs.read("config/missing.rb").is_none());
        assert!(vfs.exists("config/routes.rb"));
        assert!(!vfs.exists("config/missing.rb"));
    }

    #[test]
    fn test_hidden_and_vendor_dirs_skipped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), ".git/config", "");
        write(temp.path(), "vendor/bundle/gem.rb", "");
        write(temp.path(), "config/routes.rb", "");

        let vfs = DiskFs::scan(temp.path().to_path_buf()).unwrap();
        assert_eq!(vfs.list(""), vec!["config/routes.rb"]);
    }

    #[test]
    fn test_memory_fs() {
        let vfs = MemoryFs::new()
            .add("config/routes.rb", "root 'home#index'")
            .add("config/routes/admin.rb", "resources :reports");
        assert_eq!(vfs.list("config/routes/").len(), 1);
        assert!(vfs.read("config/routes.rb").is_some());
        assert!(vfs.read("nope").is_none());
    }
}
