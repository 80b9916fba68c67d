use std::path::PathBuf;

use crate::error::RunnerError;

/// How the final outcome is rendered by the caller: human-readable text or
/// a single structured JSON payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Immutable description of one run, constructed once by the CLI layer.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Python script to execute inside the container.
    pub script: PathBuf,
    /// requirements.txt listing the script's pip dependencies.
    pub requirements: PathBuf,
    /// Additional input files copied flat into the workspace.
    pub inputs: Vec<PathBuf>,
    /// Raw argument string forwarded to the script, split on whitespace.
    pub script_args: String,
    /// Tag used to derive the runtime image (`python:<tag>-slim`).
    pub python_version: String,
    pub output: OutputMode,
}

impl ExecutionConfig {
    pub const DEFAULT_PYTHON_VERSION: &'static str = "3.10";

    /// Pre-flight check that every declared path is an existing regular
    /// file. Runs before any workspace or container exists, so a failure
    /// here has zero side effects.
    pub fn validate(&self) -> Result<(), RunnerError> {
        for path in self.declared_files() {
            if !path.is_file() {
                return Err(RunnerError::file_not_found(path));
            }
        }
        Ok(())
    }

    /// Script, requirements, then inputs in declaration order.
    pub(crate) fn declared_files(&self) -> impl Iterator<Item = &PathBuf> {
        [&self.script, &self.requirements]
            .into_iter()
            .chain(self.inputs.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;

    fn config_with(script: PathBuf, requirements: PathBuf, inputs: Vec<PathBuf>) -> ExecutionConfig {
        ExecutionConfig {
            script,
            requirements,
            inputs,
            script_args: String::new(),
            python_version: ExecutionConfig::DEFAULT_PYTHON_VERSION.to_string(),
            output: OutputMode::Human,
        }
    }

    #[test]
    fn validate_accepts_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("main.py");
        let reqs = dir.path().join("requirements.txt");
        let data = dir.path().join("data.csv");
        fs::write(&script, "print('hi')\n").unwrap();
        fs::write(&reqs, "").unwrap();
        fs::write(&data, "a,b\n").unwrap();

        config_with(script, reqs, vec![data]).validate().unwrap();
    }

    #[test]
    fn validate_rejects_missing_script() {
        let dir = tempfile::tempdir().unwrap();
        let reqs = dir.path().join("requirements.txt");
        fs::write(&reqs, "").unwrap();

        let err = config_with(dir.path().join("absent.py"), reqs, vec![])
            .validate()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileNotFound);
        assert!(err.message.contains("absent.py"));
    }

    #[test]
    fn validate_rejects_directory_as_input() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("main.py");
        let reqs = dir.path().join("requirements.txt");
        fs::write(&script, "").unwrap();
        fs::write(&reqs, "").unwrap();

        let err = config_with(script, reqs, vec![dir.path().to_path_buf()])
            .validate()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileNotFound);
    }
}
