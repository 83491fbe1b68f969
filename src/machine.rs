//! machine.rs
//!
//! Pipeline state machine.
//!
//! Clean → Load → Generate → Save → Compile → Run → Coverage → Done.
//! A failed first compile goes through Repair → Save → Compile once; every
//! early exit lands in `Phase::Failed` with a single `FailureReason`.

use std::fs;
use std::path::Path;

use similar::{ChangeTag, TextDiff};

use crate::{
    artifacts::clean_artifacts,
    config::PipelineConfig,
    coverage::analyze_file,
    executor::{compile::display_command, Toolchain},
    llm::{
        backend::{hash_prompt, Generation, TestGenerator},
        prompt::{build_prompt, repair_instruction, tail_chars, PromptSpec},
    },
    logger::{log, log_block},
    state::{FailureReason, LogLevel, Phase, PipelineState, SourceUnit},
    testgen::{
        extract::{extract_code, validate},
        materialize::materialize_test,
    },
};

pub struct Pipeline<'a> {
    pub cfg: &'a PipelineConfig,
    pub generator: &'a dyn TestGenerator,
    pub toolchain: &'a dyn Toolchain,
}

pub fn run(p: &Pipeline, state: &mut PipelineState) {
    while !state.phase.is_terminal() {
        step(p, state);
    }
}

pub fn step(p: &Pipeline, state: &mut PipelineState) {
    match state.phase {
        Phase::Clean => {
            clean(p.cfg, state);
            transition(state, Phase::Load);
        }
        Phase::Load => load_inputs(p.cfg, state),
        Phase::Generate => generate(p, state),
        Phase::Save => save(p.cfg, state),
        Phase::Compile => compile(p, state),
        Phase::Repair => repair(p, state),
        Phase::Run => run_tests(p, state),
        Phase::Coverage => coverage(p, state),

        Phase::Done | Phase::Failed(_) => {}
    }
}

/* ================= CLEAN ================= */

pub fn clean(cfg: &PipelineConfig, state: &mut PipelineState) {
    log(state, LogLevel::Info, "🧹 Cleaning old coverage files...");

    let report = clean_artifacts(&cfg.work_dir, &cfg.artifact_patterns);

    for path in &report.removed {
        log(state, LogLevel::Info, format!("🗑️  Deleted: {}", path.display()));
    }
    for path in &report.vanished {
        log(state, LogLevel::Info, format!("Already gone: {}", path.display()));
    }
    for (path, err) in &report.failed {
        log(
            state,
            LogLevel::Warn,
            format!("Could not delete {}: {}", path.display(), err),
        );
    }
}

/* ================= LOAD ================= */

fn load_inputs(cfg: &PipelineConfig, state: &mut PipelineState) {
    let path = cfg.source_path();
    let code = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!("Failed to read {}: {}", path.display(), e);
            log(state, LogLevel::Error, &msg);
            fail(state, FailureReason::Load(msg));
            return;
        }
    };

    let spec = match PromptSpec::load(&cfg.prompt_file) {
        Ok(s) => s,
        Err(e) => {
            log(state, LogLevel::Error, &e);
            fail(state, FailureReason::Load(e));
            return;
        }
    };

    log(
        state,
        LogLevel::Info,
        format!("Loaded {} ({} bytes)", path.display(), code.len()),
    );
    state.source = Some(SourceUnit { path, code });
    state.instruction = spec.flatten();
    transition(state, Phase::Generate);
}

/* ================= GENERATE ================= */

fn generate(p: &Pipeline, state: &mut PipelineState) {
    let Some((path, code)) = state
        .source
        .as_ref()
        .map(|s| (s.path.clone(), s.code.clone()))
    else {
        fail(state, FailureReason::Load("source not loaded".into()));
        return;
    };
    let instruction = state.instruction.clone();

    log(
        state,
        LogLevel::Info,
        format!("🧠 Generating unit tests for {}...", path.display()),
    );

    let prompt = build_prompt(&instruction, &code);
    state.prompt_hashes.push(hash_prompt(&prompt));
    dump(p.cfg, state, "prompt.txt", &prompt);

    let generation = p.generator.generate(&code, &instruction);
    if !generation.text().is_empty() {
        dump(p.cfg, state, "generated_test_code.c", generation.text());
    }

    match accept(p.cfg, state, generation) {
        Ok(test_code) => {
            state.pending_code = Some(test_code);
            transition(state, Phase::Save);
        }
        Err(reason) => {
            let reason = match reason {
                Rejected::Timeout => FailureReason::GenerationTimeout,
                Rejected::Failed(e) => FailureReason::GenerationFailed(e),
                Rejected::Empty => FailureReason::EmptyGeneration,
                Rejected::Invalid(e) => FailureReason::InvalidGeneration(e),
            };
            log(
                state,
                LogLevel::Warn,
                format!(
                    "Skipping test generation to avoid overwriting existing {}.",
                    p.cfg.test_file
                ),
            );
            fail(state, reason);
        }
    }
}

enum Rejected {
    Timeout,
    Failed(String),
    Empty,
    Invalid(String),
}

/// Turn a model reply into test code that is safe to write, or say why not.
fn accept(
    cfg: &PipelineConfig,
    state: &mut PipelineState,
    generation: Generation,
) -> Result<String, Rejected> {
    let raw = match generation {
        Generation::Text(t) => t,
        Generation::Timeout => {
            log(state, LogLevel::Error, "Timeout: Model took too long to respond.");
            return Err(Rejected::Timeout);
        }
        Generation::Failed(e) => {
            log(state, LogLevel::Error, format!("Error querying model: {}", e));
            return Err(Rejected::Failed(e));
        }
    };

    if raw.trim().is_empty() {
        log(state, LogLevel::Error, "Model returned an empty response.");
        return Err(Rejected::Empty);
    }

    let test_code = extract_code(&raw);
    if let Err(why) = validate(&test_code, cfg.validation) {
        log(
            state,
            LogLevel::Error,
            format!("Generated code is not a usable test: {}", why),
        );
        return Err(Rejected::Invalid(why));
    }

    Ok(test_code)
}

/* ================= SAVE ================= */

fn save(cfg: &PipelineConfig, state: &mut PipelineState) {
    let Some(test_code) = state.pending_code.take() else {
        fail(state, FailureReason::SaveFailed("no generated code to save".into()));
        return;
    };

    let path = cfg.test_path();
    if let Err(e) = materialize_test(&path, &test_code) {
        let msg = format!("{}: {}", path.display(), e);
        log(state, LogLevel::Error, format!("Failed to write test: {}", msg));
        fail(state, FailureReason::SaveFailed(msg));
        return;
    }

    log(state, LogLevel::Info, format!("Test written to {}", path.display()));
    state.saved_code = Some(test_code.trim().to_string());
    transition(state, Phase::Compile);
}

/* ================= COMPILE ================= */

fn compile(p: &Pipeline, state: &mut PipelineState) {
    state.compile_attempts += 1;
    if state.repair_attempted {
        log(state, LogLevel::Info, "🔁 Re-compiling fixed test...");
    } else {
        log(state, LogLevel::Info, "⚙️  Compiling tests...");
    }
    log(state, LogLevel::Info, display_command(p.cfg));

    let result = p.toolchain.compile(p.cfg);
    dump(p.cfg, state, "build.log", &result.diagnostics);
    let success = result.success;
    let diagnostics = result.diagnostics.clone();
    state.last_compile = Some(result);

    if success {
        log(state, LogLevel::Success, "Build succeeded.");
        transition(state, Phase::Run);
    } else if !state.repair_attempted {
        log(
            state,
            LogLevel::Error,
            "Build failed. Retrying with LLM using logs...",
        );
        transition(state, Phase::Repair);
    } else {
        log(state, LogLevel::Error, "Final build failed.");
        log_block(state, LogLevel::Error, "Compiler output", &diagnostics);
        fail(state, FailureReason::BuildFailed);
    }
}

/* ================= REPAIR ================= */

fn repair(p: &Pipeline, state: &mut PipelineState) {
    state.repair_attempted = true;

    let code = state
        .source
        .as_ref()
        .map(|s| s.code.clone())
        .unwrap_or_default();
    let broken = state.saved_code.clone().unwrap_or_default();
    let diagnostics = state
        .last_compile
        .as_ref()
        .map(|c| c.diagnostics.clone())
        .unwrap_or_default();

    let instruction = repair_instruction(
        &code,
        &broken,
        tail_chars(&diagnostics, p.cfg.repair_log_chars),
    );
    let prompt = build_prompt(&instruction, &code);
    state.prompt_hashes.push(hash_prompt(&prompt));
    dump(p.cfg, state, "repair_prompt.txt", &prompt);

    let generation = p.generator.generate(&code, &instruction);
    if !generation.text().is_empty() {
        dump(p.cfg, state, "repaired_test_code.c", generation.text());
    }

    match accept(p.cfg, state, generation) {
        Ok(fixed) => {
            let changed = changed_lines(&broken, &fixed);
            log(
                state,
                LogLevel::Info,
                format!("Repair changed {} line(s) of the test.", changed),
            );
            state.pending_code = Some(fixed);
            transition(state, Phase::Save);
        }
        Err(reason) => {
            let reason = match reason {
                Rejected::Timeout => FailureReason::GenerationTimeout,
                Rejected::Failed(e) => FailureReason::GenerationFailed(e),
                Rejected::Empty => FailureReason::InvalidRepair("empty test code".into()),
                Rejected::Invalid(e) => FailureReason::InvalidRepair(e),
            };
            log(
                state,
                LogLevel::Warn,
                format!("Keeping the broken {} on disk.", p.cfg.test_file),
            );
            fail(state, reason);
        }
    }
}

fn changed_lines(old: &str, new: &str) -> usize {
    TextDiff::from_lines(old, new)
        .iter_all_changes()
        .filter(|c| c.tag() != ChangeTag::Equal)
        .count()
}

/* ================= RUN ================= */

fn run_tests(p: &Pipeline, state: &mut PipelineState) {
    log(state, LogLevel::Info, "🚀 Running tests...");

    let result = p.toolchain.run(&p.cfg.binary_path());

    log_block(state, LogLevel::Info, "STDOUT", &result.stdout);
    log_block(state, LogLevel::Info, "STDERR", &result.stderr);

    if result.success {
        log(state, LogLevel::Success, "All tests passed.");
    } else {
        log(
            state,
            LogLevel::Warn,
            "Some tests failed (non-zero exit code).",
        );
    }
    state.test_run = Some(result);

    list_work_dir(&p.cfg.work_dir, state);
    transition(state, Phase::Coverage);
}

fn list_work_dir(dir: &Path, state: &mut PipelineState) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    log(
        state,
        LogLevel::Info,
        format!("📂 Files in '{}':", dir.display()),
    );
    for name in names {
        log(state, LogLevel::Info, format!(" - {}", name));
    }
}

/* ================= COVERAGE ================= */

fn coverage(p: &Pipeline, state: &mut PipelineState) {
    log(
        state,
        LogLevel::Info,
        format!(
            "🧮 Running line coverage check using {}...",
            p.cfg.coverage_tool
        ),
    );

    let out = p.toolchain.coverage(p.cfg);
    if !out.stdout.trim().is_empty() {
        log_block(state, LogLevel::Info, "Coverage tool output", &out.stdout);
    }
    if !out.stderr.trim().is_empty() {
        log_block(state, LogLevel::Warn, "Coverage tool errors", &out.stderr);
    }

    let listing = p.cfg.listing_path();
    if !listing.is_file() {
        log(state, LogLevel::Error, "No .gcov file generated.");
        fail(state, FailureReason::MissingCoverageListing(listing));
        return;
    }

    let report = match analyze_file(&listing) {
        Ok(r) => r,
        Err(e) => {
            log(
                state,
                LogLevel::Error,
                format!("Failed to read {}: {}", listing.display(), e),
            );
            fail(state, FailureReason::MissingCoverageListing(listing));
            return;
        }
    };

    if report.total > 0 {
        log(state, LogLevel::Success, format!("📈 {}", report));
    } else {
        log(state, LogLevel::Warn, report.to_string());
    }

    if !report.missed_lines.is_empty() {
        let lines: Vec<String> = report.missed_lines.iter().map(u32::to_string).collect();
        log(
            state,
            LogLevel::Info,
            format!("Uncovered lines: {}", lines.join(", ")),
        );
    }

    state.coverage = Some(report);
    transition(state, Phase::Done);
}

/* ================= HELPERS ================= */

fn transition(state: &mut PipelineState, next: Phase) {
    state.phase = next;
}

fn fail(state: &mut PipelineState, reason: FailureReason) {
    state.phase = Phase::Failed(reason);
}

/// Best-effort debug dump into the log directory.
fn dump(cfg: &PipelineConfig, state: &mut PipelineState, name: &str, contents: &str) {
    let Some(path) = cfg.log_file(name) else {
        return;
    };

    let written = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|_| fs::write(&path, contents));

    if let Err(e) = written {
        log(
            state,
            LogLevel::Warn,
            format!("Could not write {}: {}", path.display(), e),
        );
    }
}
