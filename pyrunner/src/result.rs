use serde::Serialize;

/// Classified script-domain outcome. Anything here means the pipeline
/// itself completed; infrastructure faults travel as
/// [`crate::RunnerError`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    EnvironmentSetupFailed,
    ScriptFailed,
}

impl ExecutionStatus {
    pub fn is_success(self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }

    pub(crate) fn message(self) -> &'static str {
        match self {
            ExecutionStatus::Success => "Script executed successfully.",
            ExecutionStatus::EnvironmentSetupFailed => {
                "Failed to install dependencies inside the container."
            }
            ExecutionStatus::ScriptFailed => "Script exited with a nonzero status.",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionDetails {
    pub exit_code: i64,
    pub raw_logs: String,
}

/// Outcome of one completed run, serialized as-is in structured output
/// mode.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ExecutionDetails>,
    /// Sorted names of files present at the end of the run but absent from
    /// the baseline snapshot.
    pub captured_files: Vec<String>,
}
