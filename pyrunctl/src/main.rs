use std::path::PathBuf;

use clap::Parser;
use pyrunner::{ExecutionConfig, ExecutionResult, OutputMode, RunnerError};
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

/// Runs a Python script and its pinned dependencies inside a disposable
/// Docker container and captures any files the script creates into
/// ./results.
///
/// Exit codes: 0 when the script succeeded, 1 when the dependency install
/// or the script itself failed, 2 when the runner hit an infrastructure
/// fault (docker unreachable, filesystem error, missing declared file).
#[derive(Parser)]
#[command(name = "pyrunctl", version, verbatim_doc_comment)]
struct Cli {
    /// Path to the Python script to execute
    #[arg(long, value_name = "FILE")]
    script: PathBuf,

    /// Path to the requirements.txt listing the script's dependencies
    #[arg(long, value_name = "FILE")]
    reqs: PathBuf,

    /// Additional input file copied into the workspace (repeatable)
    #[arg(long = "input", value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Arguments forwarded to the script, split on whitespace
    #[arg(long, value_name = "ARGS", default_value = "")]
    script_args: String,

    /// Python tag used to derive the runtime image (python:<TAG>-slim)
    #[arg(long, value_name = "TAG", default_value = ExecutionConfig::DEFAULT_PYTHON_VERSION)]
    python_version: String,

    /// Emit a single JSON payload on stdout instead of human-readable text
    #[arg(long)]
    json: bool,
}

const EXIT_SUCCESS: i32 = 0;
const EXIT_SCRIPT_FAILURE: i32 = 1;
const EXIT_INFRA_FAILURE: i32 = 2;

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = ExecutionConfig {
        script: cli.script,
        requirements: cli.reqs,
        inputs: cli.inputs,
        script_args: cli.script_args,
        python_version: cli.python_version,
        output: if cli.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        },
    };

    let code = match pyrunner::run(&config) {
        Ok(result) => {
            report_result(&result, config.output);
            if result.status.is_success() {
                EXIT_SUCCESS
            } else {
                EXIT_SCRIPT_FAILURE
            }
        }
        Err(err) => {
            report_error(&err, config.output);
            EXIT_INFRA_FAILURE
        }
    };
    std::process::exit(code);
}

fn report_result(result: &ExecutionResult, output: OutputMode) {
    match output {
        OutputMode::Json => match serde_json::to_string(result) {
            Ok(payload) => println!("{}", payload),
            Err(err) => eprintln!("Failed to encode result payload: {}", err),
        },
        OutputMode::Human => {
            if result.status.is_success() {
                println!("{}", result.message);
                if !result.captured_files.is_empty() {
                    println!("Captured files: {}", result.captured_files.join(", "));
                }
            } else {
                eprintln!("{}", result.message);
            }
            if let Some(details) = &result.details {
                if !details.raw_logs.trim().is_empty() {
                    eprintln!("--- container logs ---");
                    eprint!("{}", details.raw_logs);
                }
            }
        }
    }
}

fn report_error(err: &RunnerError, output: OutputMode) {
    match output {
        OutputMode::Json => {
            let payload = json!({
                "status": "error",
                "message": err.message,
                "captured_files": [],
                "details": {
                    "kind": err.kind,
                    "context": err.details,
                },
            });
            println!("{}", payload);
        }
        OutputMode::Human => {
            eprintln!("ERROR: {}", err.message);
            for (key, value) in &err.details {
                eprintln!("  {}: {}", key, value);
            }
        }
    }
}
