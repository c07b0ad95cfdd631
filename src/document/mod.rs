//! Document updater
//!
//! Writes the three solar times into a per-request working copy of the
//! canonical workbook. The canonical file is only ever read.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::PanchangamConfig;
use crate::error::PipelineError;
use crate::models::SolarTimes;

pub mod cell;
pub mod workbook;

pub use cell::{CellRange, CellRef};
pub use workbook::SheetLocation;

/// Identifies one pipeline run; keeps per-request files apart
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Fresh identifier for a run started by `session`
    #[must_use]
    pub fn new(session: &str) -> Self {
        let session: String = session
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Self(format!("{session}-{}", Uuid::new_v4().simple()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A per-request copy of the canonical workbook, deleted on drop
#[derive(Debug)]
pub struct WorkingCopy {
    file: TempPath,
    sheet: SheetLocation,
}

impl WorkingCopy {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// The sheet that received the values
    #[must_use]
    pub fn sheet(&self) -> &SheetLocation {
        &self.sheet
    }

    /// Keep the file on disk after this value is dropped
    pub fn keep(self) -> io::Result<PathBuf> {
        self.file.keep().map_err(|e| e.error)
    }
}

/// Copies the canonical workbook and fills in the target cells
#[derive(Debug, Clone)]
pub struct DocumentUpdater {
    canonical: PathBuf,
    working_dir: PathBuf,
    cells: [CellRef; 3],
}

impl DocumentUpdater {
    /// `cells` are sunrise today, sunset today and sunrise tomorrow
    #[must_use]
    pub fn new(canonical: PathBuf, working_dir: PathBuf, cells: [CellRef; 3]) -> Self {
        Self {
            canonical,
            working_dir,
            cells,
        }
    }

    pub fn from_config(config: &PanchangamConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.canonical_path(),
            config.working_dir(),
            config.target_cells()?,
        ))
    }

    #[must_use]
    pub fn canonical_path(&self) -> &Path {
        &self.canonical
    }

    #[must_use]
    pub fn target_cells(&self) -> [CellRef; 3] {
        self.cells
    }

    /// Working-copy path for a request, unique per `RequestId`
    #[must_use]
    pub fn working_path(&self, request: &RequestId) -> PathBuf {
        let stem = self
            .canonical
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let extension = self
            .canonical
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "xlsx".to_string());
        self.working_dir
            .join(format!("{stem}-{request}.{extension}"))
    }

    /// Produce a working copy holding `times` in the target cells
    #[instrument(skip(self, times), fields(canonical = %self.canonical.display()))]
    pub async fn update(
        &self,
        times: &SolarTimes,
        request: &RequestId,
    ) -> Result<WorkingCopy, PipelineError> {
        let values: BTreeMap<CellRef, String> =
            self.cells.into_iter().zip(times.cell_values()).collect();
        let canonical = self.canonical.clone();
        let working = self.working_path(request);

        let copy = tokio::task::spawn_blocking(move || write_working_copy(&canonical, working, &values))
            .await
            .map_err(|e| PipelineError::document(format!("document task failed: {e}")))??;

        info!(
            "Wrote {} into sheet '{}' of {}",
            self.cells.map(|c| c.to_string()).join(", "),
            copy.sheet().name,
            copy.path().display()
        );
        Ok(copy)
    }
}

fn write_working_copy(
    canonical: &Path,
    working: PathBuf,
    values: &BTreeMap<CellRef, String>,
) -> Result<WorkingCopy, PipelineError> {
    if !canonical.is_file() {
        return Err(PipelineError::document(format!(
            "canonical workbook not found: {}",
            canonical.display()
        )));
    }
    if let Some(parent) = working.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            PipelineError::document(format!(
                "cannot create working directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let file = TempPath::from_path(working);
    fs::copy(canonical, &file).map_err(|e| {
        PipelineError::document(format!(
            "cannot copy {} to {}: {e}",
            canonical.display(),
            file.display()
        ))
    })?;
    debug!("Copied canonical workbook to {}", file.display());

    let sheet = workbook::write_cells(&file, values).map_err(|e| {
        PipelineError::document(format!(
            "cannot update {}: {e:#}",
            canonical.display()
        ))
    })?;

    Ok(WorkingCopy { file, sheet })
}
