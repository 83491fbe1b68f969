// src/executor/run.rs
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::state::RunResult;

pub fn run_test_binary(binary: &Path) -> RunResult {
    let binary = absolute(binary);

    match Command::new(&binary).output() {
        Ok(out) => RunResult {
            success: out.status.success(),
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        },
        Err(e) => RunResult {
            success: false,
            stdout: String::new(),
            stderr: format!("{}: {}", binary.display(), e),
        },
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    std::fs::canonicalize(path).unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}
