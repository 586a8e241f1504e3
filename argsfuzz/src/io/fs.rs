//! Real filesystem behind [`PathSource`].

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::values::PathSource;

/// Scans with `walkdir`, sorted by file name so runs are reproducible.
/// Unreadable entries are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskPaths;

impl PathSource for DiskPaths {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn files(&self, dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| path.is_file())
            .collect()
    }

    fn directories<'a>(&'a self, dir: &Path) -> Box<dyn Iterator<Item = PathBuf> + 'a> {
        Box::new(
            WalkDir::new(dir)
                .min_depth(1)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_dir())
                .map(|entry| entry.into_path()),
        )
    }

    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }

    fn touch(&self, path: &Path) -> io::Result<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map(|_| ())
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}
