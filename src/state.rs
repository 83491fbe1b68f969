use std::collections::VecDeque;
use std::path::PathBuf;

use serde::Serialize;

use crate::coverage::CoverageReport;

pub const MAX_LOGS: usize = 1000;

/* ---------- lifecycle ---------- */

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Clean,
    Load,
    Generate,
    Save,
    Compile,
    Repair,
    Run,
    Coverage,
    Done,
    Failed(FailureReason),
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed(_))
    }
}

/// Why the pipeline stopped before finishing the coverage stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// Source file or prompt spec could not be read.
    Load(String),
    GenerationTimeout,
    GenerationFailed(String),
    EmptyGeneration,
    InvalidGeneration(String),
    InvalidRepair(String),
    /// The repaired test code still did not compile.
    BuildFailed,
    SaveFailed(String),
    MissingCoverageListing(PathBuf),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Load(e) => write!(f, "could not load inputs: {}", e),
            FailureReason::GenerationTimeout => write!(f, "model took too long to respond"),
            FailureReason::GenerationFailed(e) => write!(f, "model request failed: {}", e),
            FailureReason::EmptyGeneration => write!(f, "model returned no test code"),
            FailureReason::InvalidGeneration(e) => write!(f, "generated test code rejected: {}", e),
            FailureReason::InvalidRepair(e) => write!(f, "repaired test code rejected: {}", e),
            FailureReason::BuildFailed => write!(f, "final build failed"),
            FailureReason::SaveFailed(e) => write!(f, "could not write test file: {}", e),
            FailureReason::MissingCoverageListing(p) => {
                write!(f, "no coverage listing at {}", p.display())
            }
        }
    }
}

/* ---------- logging ---------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warn,
    Error,
}

#[derive(Clone, Debug)]
pub struct LogLine {
    pub level: LogLevel,
    pub text: String,
}

/* ---------- stage results ---------- */

#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    pub success: bool,
    pub diagnostics: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/* ---------- pipeline state ---------- */

pub struct PipelineState {
    pub phase: Phase,

    /* inputs */
    pub source: Option<SourceUnit>,
    pub instruction: String,

    /* generation */
    pub pending_code: Option<String>,
    pub saved_code: Option<String>,
    pub prompt_hashes: Vec<String>,
    pub repair_attempted: bool,

    /* build + run */
    pub compile_attempts: usize,
    pub last_compile: Option<CompileResult>,
    pub test_run: Option<RunResult>,

    /* coverage */
    pub coverage: Option<CoverageReport>,

    pub logs: VecDeque<LogLine>,
    pub echo: bool,
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Clean,
            source: None,
            instruction: String::new(),
            pending_code: None,
            saved_code: None,
            prompt_hashes: Vec::new(),
            repair_attempted: false,
            compile_attempts: 0,
            last_compile: None,
            test_run: None,
            coverage: None,
            logs: VecDeque::new(),
            echo: true,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.phase {
            Phase::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
