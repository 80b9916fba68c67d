use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ExecutionConfig;
use crate::error::RunnerError;
use crate::retry::retry_until;

/// Results directory, fixed relative to the invocation's working directory.
/// Reset unconditionally at the start of each run, so concurrent
/// invocations in the same directory are unsupported.
pub const RESULTS_DIR: &str = "results";

const TEARDOWN_INTERVAL: Duration = Duration::from_millis(250);
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Uniquely named ephemeral directory holding the copies of the script,
/// requirements and inputs for one run, plus the file-name baseline taken
/// right after provisioning.
///
/// Removal is attempted exactly once per run, on every exit path: either
/// through an explicit [`Workspace::teardown`] or through the Drop guard.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    results_dir: PathBuf,
    baseline: BTreeSet<String>,
    removed: bool,
}

impl Workspace {
    /// Provisions the workspace: unique temp directory, flat copies of the
    /// declared files, results directory reset, baseline snapshot.
    ///
    /// Existence of the declared files was already validated by the caller;
    /// a file vanishing between validation and copy still surfaces as
    /// `runner_internal_error`.
    pub fn provision(config: &ExecutionConfig) -> Result<Self, RunnerError> {
        Self::provision_with_results_dir(config, Path::new(RESULTS_DIR))
    }

    pub(crate) fn provision_with_results_dir(
        config: &ExecutionConfig,
        results_dir: &Path,
    ) -> Result<Self, RunnerError> {
        Self::provision_in(config, results_dir, &std::env::temp_dir())
    }

    fn provision_in(
        config: &ExecutionConfig,
        results_dir: &Path,
        temp_parent: &Path,
    ) -> Result<Self, RunnerError> {
        let dir = tempfile::Builder::new()
            .prefix("pyrunner-")
            .tempdir_in(temp_parent)
            .map_err(|err| RunnerError::internal(format!("Failed to create workspace: {}", err)))?;
        // Docker rejects relative or symlinked bind-mount sources. The
        // TempDir still owns cleanup here, so a canonicalize fault does not
        // leak the directory.
        let root = fs::canonicalize(dir.path()).map_err(|err| {
            RunnerError::internal(format!(
                "Failed to canonicalize workspace {}: {}",
                dir.path().display(),
                err
            ))
        })?;
        // The guard below takes over removal; disarm TempDir's cleanup so
        // the directory is not deleted out from under it.
        let _ = dir.keep();

        let mut workspace = Self {
            root,
            results_dir: results_dir.to_path_buf(),
            baseline: BTreeSet::new(),
            removed: false,
        };

        workspace.reset_results_dir()?;
        workspace.copy_declared_files(config)?;
        workspace.baseline = snapshot_names(&workspace.root)?;
        debug!(
            workspace = %workspace.root.display(),
            files = workspace.baseline.len(),
            "workspace provisioned"
        );
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// File names present immediately after provisioning, before execution.
    pub fn baseline(&self) -> &BTreeSet<String> {
        &self.baseline
    }

    fn reset_results_dir(&self) -> Result<(), RunnerError> {
        if self.results_dir.exists() {
            fs::remove_dir_all(&self.results_dir).map_err(|err| {
                RunnerError::internal(format!(
                    "Failed to clear results directory {}: {}",
                    self.results_dir.display(),
                    err
                ))
            })?;
        }
        fs::create_dir_all(&self.results_dir).map_err(|err| {
            RunnerError::internal(format!(
                "Failed to create results directory {}: {}",
                self.results_dir.display(),
                err
            ))
        })
    }

    fn copy_declared_files(&self, config: &ExecutionConfig) -> Result<(), RunnerError> {
        for path in config.declared_files() {
            let name = file_name_of(path)?;
            fs::copy(path, self.root.join(&name)).map_err(|err| {
                RunnerError::internal(format!(
                    "Failed to copy {} into workspace: {}",
                    path.display(),
                    err
                ))
            })?;
        }
        Ok(())
    }

    /// Removes the temp directory, retrying on a fixed interval while the
    /// filesystem releases handles. A residual failure past the bounded
    /// window is logged and never alters the run's outcome.
    pub fn teardown(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;

        let root = self.root.clone();
        let outcome = retry_until(TEARDOWN_INTERVAL, TEARDOWN_TIMEOUT, || {
            match fs::remove_dir_all(&root) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err),
            }
        });
        if let Err(err) = outcome {
            warn!(
                "Failed to remove workspace {} within {:?}: {}",
                root.display(),
                TEARDOWN_TIMEOUT,
                err
            );
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Names of the regular files directly under `dir`. Subdirectories are
/// ignored: capture is flat, matching provisioning.
pub(crate) fn snapshot_names(dir: &Path) -> Result<BTreeSet<String>, RunnerError> {
    let entries = fs::read_dir(dir).map_err(|err| {
        RunnerError::internal(format!("Failed to list workspace {}: {}", dir.display(), err))
    })?;

    let mut names = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            RunnerError::internal(format!("Failed to read workspace entry: {}", err))
        })?;
        let file_type = entry.file_type().map_err(|err| {
            RunnerError::internal(format!("Failed to stat workspace entry: {}", err))
        })?;
        if file_type.is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

pub(crate) fn file_name_of(path: &Path) -> Result<String, RunnerError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            RunnerError::internal(format!("Path {} has no usable file name", path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputMode;

    fn sample_config(dir: &Path) -> ExecutionConfig {
        let script = dir.join("main.py");
        let reqs = dir.join("requirements.txt");
        let data = dir.join("data.csv");
        fs::write(&script, "print('hi')\n").unwrap();
        fs::write(&reqs, "requests==2.31.0\n").unwrap();
        fs::write(&data, "a,b\n1,2\n").unwrap();
        ExecutionConfig {
            script,
            requirements: reqs,
            inputs: vec![data],
            script_args: String::new(),
            python_version: "3.10".to_string(),
            output: OutputMode::Human,
        }
    }

    #[test]
    fn provision_copies_files_and_snapshots_baseline() {
        let fixtures = tempfile::tempdir().unwrap();
        let results = fixtures.path().join("results");
        let config = sample_config(fixtures.path());

        let ws = Workspace::provision_with_results_dir(&config, &results).unwrap();

        assert!(ws.root().join("main.py").is_file());
        assert!(ws.root().join("requirements.txt").is_file());
        assert!(ws.root().join("data.csv").is_file());
        let expected: BTreeSet<String> = ["main.py", "requirements.txt", "data.csv"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(ws.baseline(), &expected);
        assert!(results.is_dir());
    }

    #[test]
    fn provision_discards_preexisting_results() {
        let fixtures = tempfile::tempdir().unwrap();
        let results = fixtures.path().join("results");
        fs::create_dir_all(&results).unwrap();
        fs::write(results.join("stale.txt"), "old").unwrap();
        let config = sample_config(fixtures.path());

        let _ws = Workspace::provision_with_results_dir(&config, &results).unwrap();

        assert!(results.is_dir());
        assert!(!results.join("stale.txt").exists());
    }

    #[test]
    fn vanished_file_surfaces_as_internal_error() {
        let fixtures = tempfile::tempdir().unwrap();
        let results = fixtures.path().join("results");
        let config = sample_config(fixtures.path());
        config.validate().unwrap();
        // Race between validation and copy.
        fs::remove_file(&config.inputs[0]).unwrap();

        let err = Workspace::provision_with_results_dir(&config, &results).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::RunnerInternalError);
        assert!(err.message.contains("data.csv"));
    }

    #[test]
    fn failed_provisioning_leaves_no_directory_behind() {
        let fixtures = tempfile::tempdir().unwrap();
        let temp_parent = fixtures.path().join("tmp");
        fs::create_dir_all(&temp_parent).unwrap();
        let results = fixtures.path().join("results");
        let config = sample_config(fixtures.path());
        fs::remove_file(&config.script).unwrap();

        let err = Workspace::provision_in(&config, &results, &temp_parent).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::RunnerInternalError);
        assert_eq!(fs::read_dir(&temp_parent).unwrap().count(), 0);
    }

    #[test]
    fn teardown_removes_root_and_is_idempotent() {
        let fixtures = tempfile::tempdir().unwrap();
        let results = fixtures.path().join("results");
        let config = sample_config(fixtures.path());

        let mut ws = Workspace::provision_with_results_dir(&config, &results).unwrap();
        let root = ws.root().to_path_buf();
        assert!(root.is_dir());

        ws.teardown();
        assert!(!root.exists());
        ws.teardown();
        drop(ws);
        assert!(!root.exists());
    }

    #[test]
    fn drop_removes_workspace() {
        let fixtures = tempfile::tempdir().unwrap();
        let results = fixtures.path().join("results");
        let config = sample_config(fixtures.path());

        let root = {
            let ws = Workspace::provision_with_results_dir(&config, &results).unwrap();
            ws.root().to_path_buf()
        };
        assert!(!root.exists());
    }
}
