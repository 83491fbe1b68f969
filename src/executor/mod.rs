pub mod compile;
pub mod gcov;
pub mod run;

use std::path::Path;

use crate::config::PipelineConfig;
use crate::state::{CompileResult, RunResult};

pub use gcov::ToolOutput;

/// The external processes the pipeline drives.
pub trait Toolchain {
    fn compile(&self, cfg: &PipelineConfig) -> CompileResult;
    fn run(&self, binary: &Path) -> RunResult;
    fn coverage(&self, cfg: &PipelineConfig) -> ToolOutput;
}

/// gcc + gcov on the local machine.
pub struct NativeToolchain;

impl Toolchain for NativeToolchain {
    fn compile(&self, cfg: &PipelineConfig) -> CompileResult {
        compile::compile_tests(cfg)
    }

    fn run(&self, binary: &Path) -> RunResult {
        run::run_test_binary(binary)
    }

    fn coverage(&self, cfg: &PipelineConfig) -> ToolOutput {
        gcov::run_coverage_tool(cfg)
    }
}
