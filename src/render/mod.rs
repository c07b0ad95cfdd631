//! Region renderer
//!
//! Rasterizes a fixed cell rectangle of a working copy into a PNG image.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempPath;

use crate::config::{PanchangamConfig, RenderEngine};
use crate::document::{CellRange, RequestId, SheetLocation};
use crate::error::PipelineError;

pub mod excel;

pub use excel::ExcelRenderer;

/// A rendering backend for workbook regions
#[async_trait]
pub trait RegionRenderer: Send + Sync {
    /// Render `region` of `sheet` in `workbook` to `output` and return the
    /// image path. Nothing is left at `output` on failure.
    async fn render(
        &self,
        workbook: &Path,
        sheet: &SheetLocation,
        region: CellRange,
        output: &Path,
    ) -> Result<PathBuf, PipelineError>;
}

/// Used where no rendering engine is available
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRenderer;

#[async_trait]
impl RegionRenderer for DisabledRenderer {
    async fn render(
        &self,
        _workbook: &Path,
        _sheet: &SheetLocation,
        _region: CellRange,
        _output: &Path,
    ) -> Result<PathBuf, PipelineError> {
        Err(PipelineError::unsupported_platform())
    }
}

#[must_use]
pub fn renderer_from_config(config: &PanchangamConfig) -> Arc<dyn RegionRenderer> {
    match config.render.engine {
        RenderEngine::Excel => Arc::new(ExcelRenderer::new(config.render.powershell.clone())),
        RenderEngine::Disabled => Arc::new(DisabledRenderer),
    }
}

/// Per-request image path next to the configured output path
#[must_use]
pub fn artifact_path(output: &Path, request: &RequestId) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "panchangam".to_string());
    output.with_file_name(format!("{stem}-{request}.png"))
}

/// The rendered image, deleted on drop unless kept
#[derive(Debug)]
pub struct RenderedArtifact {
    file: TempPath,
}

impl RenderedArtifact {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: TempPath::from_path(path),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Leave the image on disk and return its path
    pub fn keep(self) -> io::Result<PathBuf> {
        self.file.keep().map_err(|e| e.error)
    }
}
