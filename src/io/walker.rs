//! Repository snapshot loading for the CLI.
//!
//! The orchestrator itself never touches the filesystem; this walker
//! is the CLI's repository provider, turning a directory into the
//! ordered `(path, content)` snapshot the engine consumes.

use crate::config::AnalysisConfig;
use crate::core::SourceFile;
use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

pub struct SnapshotWalker {
    root: PathBuf,
}

impl SnapshotWalker {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Collect the snapshot, honoring gitignore rules plus the
    /// config's exclusion patterns and size cap. Paths in the
    /// snapshot are relative to the root; unreadable or non-UTF-8
    /// files are skipped with a warning.
    pub fn load(&self, config: &AnalysisConfig) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .sort_by_file_path(Ord::cmp)
            .build();

        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let size = entry.metadata().map(|m| m.len() as usize).unwrap_or(0);
            if !config.should_analyze(relative, size) {
                continue;
            }

            match read_text(path) {
                Some(content) => files.push(SourceFile::new(relative, content)),
                None => log::warn!("skipping unreadable file: {}", path.display()),
            }
        }

        Ok(files)
    }
}

fn read_text(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}
