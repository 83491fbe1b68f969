// src/artifacts.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};

#[derive(Debug, Default)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
    /// Matched but gone by the time we got to it.
    pub vanished: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Delete coverage artifacts from a previous run.
///
/// Each pattern is matched inside `dir` only. All patterns are expanded before
/// anything is deleted. Per-file failures are collected, never returned as an
/// error.
pub fn clean_artifacts(dir: &Path, patterns: &[String]) -> CleanReport {
    let mut report = CleanReport::default();
    let base = Pattern::escape(&dir.to_string_lossy());
    let mut matched = Vec::new();

    for pat in patterns {
        let full = format!("{}/{}", base, pat);
        let paths = match glob(&full) {
            Ok(p) => p,
            Err(e) => {
                report.failed.push((PathBuf::from(&full), e.to_string()));
                continue;
            }
        };

        for entry in paths {
            match entry {
                Ok(path) if path.is_dir() => {}
                Ok(path) => matched.push(path),
                Err(e) => report.failed.push((e.path().to_path_buf(), e.to_string())),
            }
        }
    }

    remove_matched(matched, &mut report);
    report
}

/// Delete each path, sorting the outcome into `report`.
fn remove_matched(paths: Vec<PathBuf>, report: &mut CleanReport) {
    for path in paths {
        match fs::remove_file(&path) {
            Ok(()) => report.removed.push(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => report.vanished.push(path),
            Err(e) => report.failed.push((path, e.to_string())),
        }
    }
}
