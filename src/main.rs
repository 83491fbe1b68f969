mod artifacts;
mod config;
mod coverage;
mod executor;
mod llm;
mod logger;
mod machine;
mod report;
mod state;
mod testgen;

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    config::PipelineConfig,
    executor::NativeToolchain,
    llm::{ollama::Ollama, prompt::PromptSpec},
    logger::log,
    machine::Pipeline,
    report::PipelineReport,
    state::{LogLevel, PipelineState},
    testgen::extract::Validation,
};

#[derive(Parser)]
#[command(
    name = "covgen",
    version,
    about = "Generate C unit tests with a local LLM, build them with coverage, and report line coverage."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<CliCommand>,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Clean, generate, compile (with one repair), run, and measure coverage
    Run,
    /// Summarize an existing gcov listing
    Coverage {
        /// Path to a `.gcov` file
        listing: PathBuf,
    },
    /// Print the flattened instruction built from the prompt file
    Prompt,
    /// Remove coverage artifacts from the working directory
    Clean,
}

#[derive(Args, Debug, Default)]
struct Overrides {
    #[arg(long, global = true, help = "Config file (default: ./covgen.toml)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Directory holding source, test and binary")]
    work_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Source file name inside the working directory")]
    source: Option<String>,

    #[arg(long, global = true, help = "Test file name inside the working directory")]
    test_file: Option<String>,

    #[arg(long, global = true, help = "Prompt YAML file")]
    prompt: Option<PathBuf>,

    #[arg(long, global = true, help = "Model name sent to the LLM endpoint")]
    model: Option<String>,

    #[arg(long, global = true, help = "LLM generate endpoint URL")]
    endpoint: Option<String>,

    #[arg(long, global = true, help = "LLM request timeout in seconds")]
    timeout: Option<u64>,

    #[arg(
        long,
        global = true,
        default_value_t = false,
        help = "Accept any non-empty generated code"
    )]
    lenient: bool,

    #[arg(long, global = true, help = "Directory for prompt/response/build dumps")]
    log_dir: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value_t = false,
        help = "Disable prompt/response/build dumps"
    )]
    no_logs: bool,

    #[arg(long, global = true, help = "Write a JSON run report to this path")]
    report: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value_t = false,
        help = "Print only the JSON run report"
    )]
    json: bool,
}

impl Overrides {
    fn apply(&self, mut cfg: PipelineConfig) -> PipelineConfig {
        if let Some(dir) = &self.work_dir {
            cfg.work_dir = dir.clone();
        }
        if let Some(source) = &self.source {
            cfg.source = source.clone();
        }
        if let Some(test_file) = &self.test_file {
            cfg.test_file = test_file.clone();
        }
        if let Some(prompt) = &self.prompt {
            cfg.prompt_file = prompt.clone();
        }
        if let Some(model) = &self.model {
            cfg.llm.model = model.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            cfg.llm.endpoint = endpoint.clone();
        }
        if let Some(timeout) = self.timeout {
            cfg.llm.timeout_secs = timeout;
        }
        if self.lenient {
            cfg.validation = Validation::Lenient;
        }
        if let Some(dir) = &self.log_dir {
            cfg.log_dir = Some(dir.clone());
        }
        if self.no_logs {
            cfg.log_dir = None;
        }
        cfg
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let cfg = cli
        .overrides
        .apply(config::load(cli.overrides.config.as_deref())?);

    match cli.command.unwrap_or(CliCommand::Run) {
        CliCommand::Run => run_pipeline(&cfg, &cli.overrides),
        CliCommand::Coverage { listing } => {
            let report = coverage::analyze_file(&listing)
                .map_err(|e| format!("Failed to read {}: {}", listing.display(), e))?;
            println!("{}", report);
            Ok(())
        }
        CliCommand::Prompt => {
            println!("{}", PromptSpec::load(&cfg.prompt_file)?.flatten());
            Ok(())
        }
        CliCommand::Clean => {
            let mut state = PipelineState::new();
            machine::clean(&cfg, &mut state);
            Ok(())
        }
    }
}

fn run_pipeline(cfg: &PipelineConfig, opts: &Overrides) -> Result<(), Box<dyn Error>> {
    let generator = Ollama::new(&cfg.llm)?;
    let toolchain = NativeToolchain;

    let mut state = PipelineState::new();
    state.echo = !opts.json;

    log(
        &mut state,
        LogLevel::Info,
        format!(
            "covgen: {} → {} (model {})",
            cfg.source_path().display(),
            cfg.test_path().display(),
            generator.model()
        ),
    );

    let pipeline = Pipeline {
        cfg,
        generator: &generator,
        toolchain: &toolchain,
    };
    machine::run(&pipeline, &mut state);

    if let Some(reason) = state.failure().cloned() {
        log(&mut state, LogLevel::Error, format!("Pipeline stopped: {}", reason));
    }

    let report = PipelineReport::build(cfg, &state);
    if let Some(path) = &opts.report {
        report.write(path)?;
        log(
            &mut state,
            LogLevel::Info,
            format!("Report written to {}", path.display()),
        );
    }
    if opts.json {
        println!("{}", report.to_json()?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_replace_config_values() {
        let cli = Cli::parse_from([
            "covgen",
            "run",
            "--work-dir",
            "c_src",
            "--model",
            "phi",
            "--timeout",
            "30",
            "--lenient",
            "--no-logs",
        ]);

        let cfg = cli.overrides.apply(PipelineConfig::default());
        assert_eq!(cfg.work_dir, PathBuf::from("c_src"));
        assert_eq!(cfg.llm.model, "phi");
        assert_eq!(cfg.llm.timeout_secs, 30);
        assert_eq!(cfg.validation, Validation::Lenient);
        assert_eq!(cfg.log_dir, None);
        assert_eq!(cfg.source, "sample.c");
    }

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::parse_from(["covgen"]);
        assert!(cli.command.is_none());
        assert!(!cli.overrides.json);
    }

    #[test]
    fn coverage_subcommand_takes_listing() {
        let cli = Cli::parse_from(["covgen", "coverage", "input/sample.c.gcov"]);
        match cli.command {
            Some(CliCommand::Coverage { listing }) => {
                assert_eq!(listing, PathBuf::from("input/sample.c.gcov"))
            }
            _ => panic!("expected coverage subcommand"),
        }
    }
}
