use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::state::{FailureReason, LogLevel, PipelineState};

#[derive(Debug, Serialize)]
pub struct CoverageSummary {
    pub executed: usize,
    pub total: usize,
    pub percent: Option<f64>,
    pub missed_lines: Vec<u32>,
}

/// Machine-readable summary of one pipeline run.
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub generated_at: String,
    pub source: String,
    pub test_file: String,
    pub model: String,
    pub completed: bool,
    pub failure: Option<FailureReason>,
    pub repair_attempted: bool,
    pub compile_attempts: usize,
    pub tests_passed: Option<bool>,
    pub coverage: Option<CoverageSummary>,
    pub prompt_hashes: Vec<String>,
    /// Warn and error log lines, in order.
    pub warnings: Vec<String>,
}

impl PipelineReport {
    pub fn build(cfg: &PipelineConfig, state: &PipelineState) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            source: state
                .source
                .as_ref()
                .map(|s| s.path.clone())
                .unwrap_or_else(|| cfg.source_path())
                .display()
                .to_string(),
            test_file: cfg.test_path().display().to_string(),
            model: cfg.llm.model.clone(),
            completed: state.failure().is_none() && state.phase.is_terminal(),
            failure: state.failure().cloned(),
            repair_attempted: state.repair_attempted,
            compile_attempts: state.compile_attempts,
            tests_passed: state.test_run.as_ref().map(|r| r.success),
            coverage: state.coverage.as_ref().map(|c| CoverageSummary {
                executed: c.executed,
                total: c.total,
                percent: c.percent().map(|p| (p * 10.0).round() / 10.0),
                missed_lines: c.missed_lines.clone(),
            }),
            prompt_hashes: state.prompt_hashes.clone(),
            warnings: state
                .logs
                .iter()
                .filter(|l| matches!(l.level, LogLevel::Warn | LogLevel::Error))
                .map(|l| l.text.clone())
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| e.to_string())
    }

    pub fn write(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
        }
        fs::write(path, self.to_json()?).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::CoverageReport;
    use crate::logger::log;
    use crate::state::{Phase, RunResult, SourceUnit};
    use serde_json::Value;

    #[test]
    fn completed_run_reports_coverage() {
        let cfg = PipelineConfig::default();
        let mut state = PipelineState::new();
        state.phase = Phase::Done;
        state.compile_attempts = 1;
        state.test_run = Some(RunResult {
            success: false,
            stdout: String::new(),
            stderr: String::new(),
        });
        state.coverage = Some(CoverageReport {
            executed: 2,
            total: 3,
            missed_lines: vec![7],
        });

        let v: Value = serde_json::from_str(&PipelineReport::build(&cfg, &state).to_json().unwrap()).unwrap();

        assert_eq!(v["completed"], true);
        assert_eq!(v["failure"], Value::Null);
        assert_eq!(v["tests_passed"], false);
        assert_eq!(v["coverage"]["percent"], 66.7);
        assert_eq!(v["coverage"]["missed_lines"][0], 7);
        assert_eq!(v["source"], "input/sample.c");
    }

    #[test]
    fn failed_run_names_reason() {
        let cfg = PipelineConfig::default();
        let mut state = PipelineState::new();
        state.phase = Phase::Failed(FailureReason::GenerationTimeout);

        let report = PipelineReport::build(&cfg, &state);
        let v: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(v["completed"], false);
        assert_eq!(v["failure"]["kind"], "generation_timeout");
        assert_eq!(v["coverage"], Value::Null);
    }

    #[test]
    fn writes_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json");
        let mut state = PipelineState::new();
        state.phase = Phase::Failed(FailureReason::BuildFailed);

        PipelineReport::build(&PipelineConfig::default(), &state)
            .write(&path)
            .unwrap();

        let v: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(v["failure"]["kind"], "build_failed");
    }

    #[test]
    fn warnings_and_loaded_source_path_are_reported() {
        let cfg = PipelineConfig::default();
        let mut state = PipelineState::new();
        state.echo = false;
        state.source = Some(SourceUnit {
            path: "elsewhere/lib.c".into(),
            code: String::new(),
        });
        log(&mut state, LogLevel::Info, "🧹 Cleaning old coverage files...");
        log(&mut state, LogLevel::Warn, "Could not delete input/x.gcda: denied");
        log(&mut state, LogLevel::Success, "Build succeeded.");
        log(&mut state, LogLevel::Error, "Final build failed.");

        let report = PipelineReport::build(&cfg, &state);

        assert_eq!(report.source, "elsewhere/lib.c");
        assert_eq!(
            report.warnings,
            vec!["Could not delete input/x.gcda: denied", "Final build failed."]
        );
    }
}
