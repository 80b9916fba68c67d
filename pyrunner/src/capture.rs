use std::fs;

use crate::error::RunnerError;
use crate::workspace::{snapshot_names, Workspace};

/// Copies every file that appeared in the workspace since the baseline
/// snapshot into the results directory and returns the sorted name list.
///
/// Only new file names are detected; a modified pre-existing file is not
/// captured. Runs regardless of the classified status, so a failed
/// script's partial output is still collected.
pub fn capture_outputs(workspace: &Workspace) -> Result<Vec<String>, RunnerError> {
    let current = snapshot_names(workspace.root())?;
    // BTreeSet difference iterates in order, so the list is already sorted.
    let new_files: Vec<String> = current.difference(workspace.baseline()).cloned().collect();

    for name in &new_files {
        let source = workspace.root().join(name);
        let target = workspace.results_dir().join(name);
        fs::copy(&source, &target).map_err(|err| {
            RunnerError::internal(format!(
                "Failed to copy output {} into {}: {}",
                source.display(),
                workspace.results_dir().display(),
                err
            ))
        })?;
    }
    Ok(new_files)
}
