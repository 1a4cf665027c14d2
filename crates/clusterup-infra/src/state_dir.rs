//! Run state persistence under `<state_dir>/runs/<run_id>/`.
//!
//! Each finished run leaves `params.json` (the parameter store snapshot)
//! and `report.json` (the full run report). Run ids are UUID v7, so the
//! lexically greatest directory name is the latest run.

use std::path::{Path, PathBuf};

use clusterup_core::sequencer::RunReport;
use clusterup_types::parameter::ParamEntry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

pub const PARAMS_FILE: &str = "params.json";
pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Error)]
pub enum StateDirError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no runs recorded under {}", path.display())]
    NoRuns { path: PathBuf },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StateDirError {
    move |source| StateDirError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Handle on the run-state area of a state directory.
#[derive(Debug, Clone)]
pub struct RunStateDir {
    state_dir: PathBuf,
}

impl RunStateDir {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.state_dir.join("runs")
    }

    pub fn run_dir(&self, run_id: Uuid) -> PathBuf {
        self.runs_dir().join(run_id.to_string())
    }

    /// Persist the final parameter snapshot and the report of a run.
    pub async fn save(&self, report: &RunReport) -> Result<PathBuf, StateDirError> {
        let dir = self.run_dir(report.run_id);
        tokio::fs::create_dir_all(&dir).await.map_err(io_err(&dir))?;

        write_json(&dir.join(PARAMS_FILE), &report.params).await?;
        write_json(&dir.join(REPORT_FILE), report).await?;

        tracing::info!(
            run_id = %report.run_id,
            params = report.params.len(),
            dir = %dir.display(),
            "saved run state"
        );
        Ok(dir)
    }

    pub async fn load_params(&self, run_id: Uuid) -> Result<Vec<ParamEntry>, StateDirError> {
        read_json(&self.run_dir(run_id).join(PARAMS_FILE)).await
    }

    pub async fn load_report(&self, run_id: Uuid) -> Result<RunReport, StateDirError> {
        read_json(&self.run_dir(run_id).join(REPORT_FILE)).await
    }

    /// Most recent run that left a parameter snapshot.
    pub async fn latest_run(&self) -> Result<Uuid, StateDirError> {
        let runs = self.runs_dir();
        let mut entries = match tokio::fs::read_dir(&runs).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StateDirError::NoRuns { path: runs.clone() });
            }
            Err(source) => {
                return Err(StateDirError::Io {
                    path: runs.clone(),
                    source,
                });
            }
        };

        let mut latest: Option<Uuid> = None;
        while let Some(entry) = entries.next_entry().await.map_err(io_err(&runs))? {
            let Some(run_id) = entry
                .file_name()
                .to_str()
                .and_then(|name| Uuid::parse_str(name).ok())
            else {
                continue;
            };
            if !entry.path().join(PARAMS_FILE).exists() {
                continue;
            }
            if latest.is_none_or(|current| run_id > current) {
                latest = Some(run_id);
            }
        }
        latest.ok_or(StateDirError::NoRuns { path: runs })
    }

    /// Delete run records and node data directories.
    ///
    /// The config file and the connection table stay in place.
    pub async fn remove_run_state(&self) -> Result<(), StateDirError> {
        for dir in [self.runs_dir(), self.state_dir.join("nodes")] {
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => tracing::info!(dir = %dir.display(), "removed"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(StateDirError::Io { path: dir, source }),
            }
        }
        Ok(())
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StateDirError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| StateDirError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, json).await.map_err(io_err(path))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StateDirError> {
    let text = tokio::fs::read_to_string(path).await.map_err(io_err(path))?;
    serde_json::from_str(&text).map_err(|source| StateDirError::Json {
        path: path.to_path_buf(),
        source,
    })
}
