// src/executor/compile.rs
use std::path::Path;
use std::process::Command;

use crate::config::PipelineConfig;
use crate::state::CompileResult;

/// Build the instrumented test binary from the source + test pair.
///
/// Runs inside the working directory so the coverage notes land next to the
/// source. Launch errors come back as a failed result, never as an `Err`.
pub fn compile_tests(cfg: &PipelineConfig) -> CompileResult {
    let args = compile_args(cfg);

    let output = Command::new(&cfg.compiler)
        .args(&args)
        .current_dir(&cfg.work_dir)
        .output();

    match output {
        Ok(out) => {
            let mut diagnostics = String::from_utf8_lossy(&out.stdout).to_string();
            let stderr = String::from_utf8_lossy(&out.stderr);
            if !stderr.is_empty() {
                if !diagnostics.is_empty() && !diagnostics.ends_with('\n') {
                    diagnostics.push('\n');
                }
                diagnostics.push_str(&stderr);
            }

            CompileResult {
                success: out.status.success(),
                diagnostics,
            }
        }
        Err(e) => CompileResult {
            success: false,
            diagnostics: format!("failed to launch {}: {}", cfg.compiler, e),
        },
    }
}

pub fn compile_args(cfg: &PipelineConfig) -> Vec<String> {
    let mut args = cfg.compiler_flags.clone();
    args.push("-o".into());
    args.push(cfg.binary.clone());
    args.push(cfg.source.clone());
    args.push(cfg.test_file.clone());
    args
}

/// Human-readable form of the compile command, for banners and logs.
pub fn display_command(cfg: &PipelineConfig) -> String {
    let dir = if cfg.work_dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        cfg.work_dir.as_path()
    };

    format!(
        "(cd {} && {} {})",
        dir.display(),
        cfg.compiler,
        compile_args(cfg).join(" ")
    )
}
