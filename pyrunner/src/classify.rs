use crate::result::ExecutionStatus;

/// Substrings pip prints when dependency resolution or installation fails.
/// Matching is exact and case-sensitive.
pub const INSTALLER_FAILURE_SIGNATURES: &[&str] = &[
    "No matching distribution found",
    "Could not find a version that satisfies the requirement",
    "ERROR: Could not install packages",
    "error: subprocess-exited-with-error",
];

/// Maps an in-container exit code and the combined log text to an outcome.
///
/// Best-effort heuristic, not exact: a failing script whose own output
/// happens to contain one of the installer signatures is misclassified as
/// an environment-setup failure.
pub fn classify(exit_code: i64, logs: &str) -> ExecutionStatus {
    if exit_code == 0 {
        return ExecutionStatus::Success;
    }
    if INSTALLER_FAILURE_SIGNATURES
        .iter()
        .any(|signature| logs.contains(signature))
    {
        ExecutionStatus::EnvironmentSetupFailed
    } else {
        ExecutionStatus::ScriptFailed
    }
}
