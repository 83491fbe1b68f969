// src/config.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::testgen::extract::Validation;

pub const CONFIG_FILE: &str = "covgen.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".into(),
            model: "codellama".into(),
            timeout_secs: 120,
        }
    }
}

/// Everything the pipeline needs to know about paths and tools.
///
/// `source`, `test_file` and `binary` are file names inside `work_dir`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub work_dir: PathBuf,
    pub source: String,
    pub test_file: String,
    pub binary: String,
    pub prompt_file: PathBuf,
    pub log_dir: Option<PathBuf>,

    pub compiler: String,
    pub compiler_flags: Vec<String>,
    pub coverage_tool: String,
    pub artifact_patterns: Vec<String>,

    pub validation: Validation,
    pub repair_log_chars: usize,

    pub llm: LlmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("input"),
            source: "sample.c".into(),
            test_file: "test_sample.c".into(),
            binary: "test_binary".into(),
            prompt_file: PathBuf::from("prompts/test_prompt.yaml"),
            log_dir: Some(PathBuf::from("logs")),
            compiler: "gcc".into(),
            compiler_flags: vec![
                "-Wall".into(),
                "-fprofile-arcs".into(),
                "-ftest-coverage".into(),
            ],
            coverage_tool: "gcov".into(),
            artifact_patterns: vec!["*.gcda".into(), "*.gcno".into(), "*.gcov".into()],
            validation: Validation::Strict,
            repair_log_chars: 1000,
            llm: LlmConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn source_path(&self) -> PathBuf {
        self.work_dir.join(&self.source)
    }

    pub fn test_path(&self) -> PathBuf {
        self.work_dir.join(&self.test_file)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.work_dir.join(&self.binary)
    }

    /// gcov names its listing after the source file, inside the directory it ran in.
    pub fn listing_path(&self) -> PathBuf {
        self.work_dir.join(format!("{}.gcov", self.source))
    }

    pub fn log_file(&self, name: &str) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|d| d.join(name))
    }
}

/// Resolve and load the config file.
///
/// Explicit path first, then `covgen.toml` in the current directory, then the
/// user config dir. Nothing found means defaults; a file that exists but does
/// not parse is an error.
pub fn load(explicit: Option<&Path>) -> Result<PipelineConfig, String> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    for path in candidate_paths() {
        if path.is_file() {
            return read_config(&path);
        }
    }

    Ok(PipelineConfig::default())
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("covgen/config.toml"));
    }
    paths
}

fn read_config(path: &Path) -> Result<PipelineConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;

    parse(&raw).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}

pub fn parse(raw: &str) -> Result<PipelineConfig, String> {
    toml::from_str(raw).map_err(|e| e.to_string())
}
