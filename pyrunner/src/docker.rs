use std::path::Path;
use std::process::{Command, Output, Stdio};

use tracing::{debug, warn};

use crate::config::ExecutionConfig;
use crate::error::RunnerError;
use crate::workspace::file_name_of;

const IMAGE_BASE: &str = "python";
const IMAGE_SUFFIX: &str = "slim";
/// Workspace bind-mount target, also the in-container working directory.
pub const CONTAINER_WORKDIR: &str = "/workdir";
const VENV_PATH: &str = "/tmp/venv";

/// Terminal state of one container run: in-container exit code plus the
/// combined stdout+stderr log text.
#[derive(Debug, Clone)]
pub struct ContainerExit {
    pub exit_code: i64,
    pub logs: String,
}

/// Runtime-assigned identity of the single container created for a run.
/// Owned by the orchestration call that created it; removal is attempted
/// exactly once within that call.
struct ContainerHandle {
    id: String,
    image: String,
    command: Vec<String>,
}

/// Image reference derived from the configured version tag.
pub fn image_reference(python_version: &str) -> String {
    format!("{}:{}-{}", IMAGE_BASE, python_version, IMAGE_SUFFIX)
}

/// Pulls the image, runs the container bound to the workspace, and returns
/// the in-container exit code with the combined logs.
///
/// `docker_daemon_error` is raised only for faults of the docker client or
/// daemon (spawn failure, nonzero docker CLI status on pull/create/start/
/// wait/logs). A nonzero exit code *inside* the container is returned as
/// data for classification. Blocks on `docker wait` with no timeout.
///
/// The container is removed on every path out of this call; a removal
/// fault is logged and never overrides the outcome.
pub fn run_container(
    config: &ExecutionConfig,
    workspace: &Path,
) -> Result<ContainerExit, RunnerError> {
    let image = image_reference(&config.python_version);
    debug!("Pulling image {}", image);
    docker(&[String::from("pull"), image.clone()])?;

    let handle = create_container(config, workspace, &image)?;
    debug!(
        container = %handle.id,
        image = %handle.image,
        command = ?handle.command,
        "container created"
    );
    let outcome = start_wait_and_collect(&handle);
    remove_container(&handle);
    outcome
}

fn create_container(
    config: &ExecutionConfig,
    workspace: &Path,
    image: &str,
) -> Result<ContainerHandle, RunnerError> {
    let command = container_command(config)?;
    let args = create_args(workspace, image, &command);
    let output = docker(&args)?;
    let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if id.is_empty() {
        return Err(RunnerError::docker("docker create returned no container id"));
    }
    Ok(ContainerHandle {
        id,
        image: image.to_string(),
        command,
    })
}

/// Argument vector for `docker create`: workspace mounted read-write at the
/// fixed in-container path, which is also the working directory.
fn create_args(workspace: &Path, image: &str, command: &[String]) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "-v".to_string(),
        format!("{}:{}", workspace.display(), CONTAINER_WORKDIR),
        "-w".to_string(),
        CONTAINER_WORKDIR.to_string(),
        image.to_string(),
    ];
    args.extend(command.iter().cloned());
    args
}

/// In-container command: create a venv, install the requirements, run the
/// script. The `&&` chain short-circuits on the first failure, leaving a
/// nonzero final exit code and whatever the earlier steps logged.
///
/// Script arguments ride as positional parameters after the `sh` argv0
/// placeholder and reach the script through `"$@"`, so shell
/// metacharacters in argument values are inert. Copied file names are
/// single-quote escaped.
fn container_command(config: &ExecutionConfig) -> Result<Vec<String>, RunnerError> {
    let script = file_name_of(&config.script)?;
    let requirements = file_name_of(&config.requirements)?;

    let chain = format!(
        "python -m venv {venv} && {venv}/bin/pip install -r {reqs} && {venv}/bin/python {script} \"$@\"",
        venv = VENV_PATH,
        reqs = shell_escape(&requirements),
        script = shell_escape(&script),
    );

    let mut command = vec![
        "sh".to_string(),
        "-c".to_string(),
        chain,
        "sh".to_string(),
    ];
    command.extend(config.script_args.split_whitespace().map(str::to_string));
    Ok(command)
}

fn start_wait_and_collect(handle: &ContainerHandle) -> Result<ContainerExit, RunnerError> {
    docker(&[String::from("start"), handle.id.clone()])?;

    // Blocks until the container reaches a terminal state. No timeout: a
    // hung script hangs the run (documented limitation).
    let wait = docker(&[String::from("wait"), handle.id.clone()])?;
    let wait_stdout = String::from_utf8_lossy(&wait.stdout);
    let exit_code: i64 = wait_stdout.trim().parse().map_err(|_| {
        RunnerError::docker(format!(
            "docker wait returned an unparseable exit code: {:?}",
            wait_stdout.trim()
        ))
    })?;

    let logs = docker(&[String::from("logs"), handle.id.clone()])?;
    let mut text = String::from_utf8_lossy(&logs.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&logs.stderr));

    Ok(ContainerExit {
        exit_code,
        logs: text,
    })
}

fn remove_container(handle: &ContainerHandle) {
    let removal = Command::new("docker")
        .args(["rm", "-f", &handle.id])
        .stdin(Stdio::null())
        .output();
    match removal {
        Ok(output) if output.status.success() => {}
        Ok(output) => warn!(
            "Failed to remove container {}: {}",
            handle.id,
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(err) => warn!("Failed to remove container {}: {}", handle.id, err),
    }
}

/// Invokes the docker CLI. Any client-side fault (spawn failure, nonzero
/// docker exit status) maps to `docker_daemon_error`.
fn docker(args: &[String]) -> Result<Output, RunnerError> {
    let verb = args.first().map(String::as_str).unwrap_or("");
    let output = Command::new("docker")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|err| {
            RunnerError::docker(format!(
                "Failed to invoke docker {}: {}. Is the Docker daemon running?",
                verb, err
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(
            RunnerError::docker(format!("docker {} failed: {}", verb, stderr))
                .with_detail("stderr", stderr.clone()),
        );
    }
    Ok(output)
}

fn shell_escape(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let escaped = arg.replace('\'', "'\\''");
    format!("'{}'", escaped)
}
