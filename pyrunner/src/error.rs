use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

/// Machine-readable failure category carried by every [`RunnerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileNotFound,
    DockerDaemonError,
    EnvironmentSetupFailed,
    ScriptExecutionFailed,
    RunnerInternalError,
}

/// Infrastructure-channel failure: the pipeline aborts (teardown still
/// runs) and the process reports the error instead of a classified result.
///
/// A nonzero exit of the contained script is NOT a `RunnerError`: that is
/// a script-domain outcome and travels as [`crate::ExecutionResult`] data.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RunnerError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: BTreeMap<String, String>,
}

impl RunnerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn file_not_found(path: &Path) -> Self {
        Self::new(
            ErrorKind::FileNotFound,
            format!("File not found: {}", path.display()),
        )
    }

    pub fn docker(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DockerDaemonError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RunnerInternalError, message)
    }
}
