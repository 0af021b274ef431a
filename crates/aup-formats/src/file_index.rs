//! Block-file lookup in a project's data directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Bare file name to full path, for every file under the data directory.
#[derive(Clone, Debug, Default)]
pub struct FileNameIndex {
    root: PathBuf,
    files: HashMap<String, PathBuf>,
}

impl FileNameIndex {
    /// Recursively list `root`. On duplicate names the last one in sorted
    /// walk order wins.
    pub fn build(root: &Path) -> Result<Self, walkdir::Error> {
        let mut files = HashMap::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                files.insert(name.to_string(), entry.path().to_path_buf());
            }
        }
        log::debug!("indexed {} files under {}", files.len(), root.display());
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn lookup(&self, name: &str) -> Option<&Path> {
        self.files.get(name).map(PathBuf::as_path)
    }

    /// The data directory itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Find the data directory of a project file.
///
/// Tries `<projname>` next to the project file, then `<stem>-data`.
pub fn locate_data_dir(project_file: &Path, projname: &str) -> Option<PathBuf> {
    let dir = project_file.parent().unwrap_or_else(|| Path::new(""));

    if !projname.is_empty() {
        let candidate = dir.join(projname);
        if candidate.is_dir() {
            return Some(candidate);
        }
    }

    let stem = project_file.file_stem()?.to_string_lossy();
    let candidate = dir.join(format!("{stem}-data"));
    candidate.is_dir().then_some(candidate)
}
