//! File output for compiled policy.

use std::io::Write;
use std::path::{Path, PathBuf};

use domain::common::error::DomainError;
use domain::deployment::entity::CompiledDeployment;
use ports::secondary::policy_sink::PolicySinkPort;

/// Writes the compiled deployment as pretty JSON to one file.
///
/// The file is written next to its destination and renamed into place, so
/// a reader sees either the previous deployment or the new one in full.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back the deployment currently on disk.
    pub fn read(&self) -> Result<CompiledDeployment, DomainError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| sink_error(&self.path, &e))?;
        serde_json::from_str(&content).map_err(|e| sink_error(&self.path, &e))
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn sink_error(path: &Path, e: &dyn std::fmt::Display) -> DomainError {
    DomainError::Sink(format!("{}: {e}", path.display()))
}

impl PolicySinkPort for JsonFileSink {
    fn replace_all(&self, deployment: &CompiledDeployment) -> Result<(), DomainError> {
        let mut body =
            serde_json::to_vec_pretty(deployment).map_err(|e| sink_error(&self.path, &e))?;
        body.push(b'\n');

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| sink_error(parent, &e))?;
        }

        let staging = self.staging_path();
        let written = std::fs::File::create(&staging).and_then(|mut file| {
            file.write_all(&body)?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = std::fs::remove_file(&staging);
            return Err(sink_error(&staging, &e));
        }

        std::fs::rename(&staging, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&staging);
            sink_error(&self.path, &e)
        })?;

        tracing::debug!(
            path = %self.path.display(),
            bytes = body.len(),
            "compiled policy written"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "json_file"
    }
}
