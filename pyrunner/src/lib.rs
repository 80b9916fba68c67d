//! Run orchestration engine: provisions an ephemeral workspace, executes a
//! Python script with its declared pip dependencies inside a disposable
//! Docker container, classifies the outcome from exit code and log text,
//! and captures any files the script produced.
//!
//! Two channels leave this crate and must not be confused:
//!
//! - [`RunnerError`]: infrastructure faults (daemon unreachable, docker
//!   API failure, filesystem faults). These abort the remaining pipeline
//!   stages; workspace teardown still runs.
//! - [`ExecutionResult`]: script-domain outcomes, including dependency
//!   install failures and nonzero script exits. The pipeline completes
//!   normally around them: outputs are captured and the workspace is torn
//!   down.
//!
//! One run per process, fully synchronous. The wait on container exit has
//! no timeout, so a hung script hangs the run.

pub mod capture;
pub mod classify;
pub mod config;
pub mod docker;
pub mod error;
pub mod result;
pub mod retry;
pub mod workspace;

pub use config::{ExecutionConfig, OutputMode};
pub use error::{ErrorKind, RunnerError};
pub use result::{ExecutionDetails, ExecutionResult, ExecutionStatus};
pub use workspace::Workspace;

use tracing::info;

/// Runs the full pipeline for one configuration:
/// validate, provision, run container, classify, capture, teardown.
///
/// Validation happens before any resource is created, so a missing
/// declared file has zero side effects. The workspace is removed on every
/// path out of this function.
pub fn run(config: &ExecutionConfig) -> Result<ExecutionResult, RunnerError> {
    config.validate()?;

    let mut workspace = Workspace::provision(config)?;
    let outcome = execute_in_workspace(config, &workspace);
    workspace.teardown();
    outcome
}

fn execute_in_workspace(
    config: &ExecutionConfig,
    workspace: &Workspace,
) -> Result<ExecutionResult, RunnerError> {
    let exit = docker::run_container(config, workspace.root())?;
    let status = classify::classify(exit.exit_code, &exit.logs);
    info!(exit_code = exit.exit_code, ?status, "container run finished");

    // Even a failed script may have written partial output worth keeping.
    let captured_files = capture::capture_outputs(workspace)?;

    Ok(ExecutionResult {
        status,
        message: status.message().to_string(),
        details: Some(ExecutionDetails {
            exit_code: exit.exit_code,
            raw_logs: exit.logs,
        }),
        captured_files,
    })
}
