// src/executor/gcov.rs
use std::path::Path;
use std::process::Command;

use glob::{glob, Pattern};

use crate::config::PipelineConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run the coverage tool over the counters of the last test run.
///
/// gcov is handed the `.gcda` files directly because newer gcc names them
/// after the output binary (`test_binary-sample.gcda`), which the source
/// name alone would not find. The listings are written into the working
/// directory, named after each source file.
pub fn run_coverage_tool(cfg: &PipelineConfig) -> ToolOutput {
    let mut inputs = counter_files(&cfg.work_dir);
    if inputs.is_empty() {
        inputs.push(cfg.source.clone());
    }

    match Command::new(&cfg.coverage_tool)
        .args(&inputs)
        .current_dir(&cfg.work_dir)
        .output()
    {
        Ok(out) => ToolOutput {
            success: out.status.success(),
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        },
        Err(e) => ToolOutput {
            success: false,
            stdout: String::new(),
            stderr: format!("failed to launch {}: {}", cfg.coverage_tool, e),
        },
    }
}

fn counter_files(dir: &Path) -> Vec<String> {
    let pattern = format!("{}/*.gcda", Pattern::escape(&dir.to_string_lossy()));
    let Ok(paths) = glob(&pattern) else {
        return Vec::new();
    };

    let mut names: Vec<String> = paths
        .filter_map(Result::ok)
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}
