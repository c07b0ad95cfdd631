//! Excel automation through PowerShell COM scripting (Windows only)

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tempfile::TempPath;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::RegionRenderer;
use crate::document::{CellRange, SheetLocation};
use crate::error::{PipelineError, RenderFailure};

const SCRIPT: &str = include_str!("render_region.ps1");

const EXIT_NO_PASTE_TARGET: i32 = 10;
const EXIT_CLIPBOARD_EMPTY: i32 = 11;

/// Drives Excel to copy the region as a picture and save it as PNG
#[derive(Debug, Clone)]
pub struct ExcelRenderer {
    powershell: String,
}

impl ExcelRenderer {
    #[must_use]
    pub fn new(powershell: String) -> Self {
        Self { powershell }
    }
}

#[async_trait]
impl RegionRenderer for ExcelRenderer {
    #[instrument(skip(self, sheet), fields(sheet = %sheet.name))]
    async fn render(
        &self,
        workbook: &Path,
        sheet: &SheetLocation,
        region: CellRange,
        output: &Path,
    ) -> Result<PathBuf, PipelineError> {
        if !cfg!(windows) {
            return Err(PipelineError::unsupported_platform());
        }
        let start_time = Instant::now();

        let script = TempPath::from_path(output.with_extension("ps1"));
        tokio::fs::write(&script, SCRIPT)
            .await
            .map_err(|e| PipelineError::engine(format!("cannot write render script: {e}")))?;

        // Removes a half-written image on every failure path
        let image = TempPath::from_path(output);
        // Declared after `image` so Excel is gone before the image is removed
        let mut engine = EngineGuard::new(output.with_extension("pid"));

        let workbook = std::path::absolute(workbook)
            .map_err(|e| PipelineError::engine(format!("invalid workbook path: {e}")))?;
        let image_path = std::path::absolute(&image)
            .map_err(|e| PipelineError::engine(format!("invalid output path: {e}")))?;
        let pid_path = std::path::absolute(engine.pid_file())
            .map_err(|e| PipelineError::engine(format!("invalid pid file path: {e}")))?;

        debug!("Running {} for region {}", self.powershell, region);
        let result = Command::new(&self.powershell)
            .args(["-NoProfile", "-NonInteractive", "-STA", "-ExecutionPolicy", "Bypass", "-File"])
            .arg(&*script)
            .arg(&workbook)
            .arg(sheet.index.to_string())
            .arg(region.to_string())
            .arg(&image_path)
            .arg(&pid_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                PipelineError::engine(format!("failed to start {}: {e}", self.powershell))
            })?;

        // An exit code means the script reached its cleanup block
        if result.status.code().is_some() {
            engine.disarm();
        }

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            warn!("Render script failed with {}: {}", result.status, stderr.trim());
            return Err(failure_from_exit(result.status.code(), &stderr).into());
        }
        if !image.is_file() {
            return Err(PipelineError::engine("render script produced no image"));
        }

        info!(
            "Rendered {} in {:.3}s",
            region,
            start_time.elapsed().as_secs_f64()
        );
        image
            .keep()
            .map_err(|e| PipelineError::engine(format!("cannot keep rendered image: {}", e.error)))
    }
}

/// Kills the Excel instance started by the script unless the script got to
/// shut it down itself. The script writes Excel's PID to `pid_file`.
#[derive(Debug)]
struct EngineGuard {
    pid_file: TempPath,
    armed: bool,
}

impl EngineGuard {
    fn new(pid_file: PathBuf) -> Self {
        Self {
            pid_file: TempPath::from_path(pid_file),
            armed: true,
        }
    }

    fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    /// PID recorded by the script, if it got that far
    fn recorded_pid(&self) -> Option<u32> {
        fs::read_to_string(&self.pid_file)
            .ok()
            .and_then(|content| parse_pid(&content))
    }
}

impl Drop for EngineGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(pid) = self.recorded_pid() else {
            return;
        };
        warn!("Render was interrupted, killing Excel process {}", pid);
        match std::process::Command::new("taskkill")
            .args(["/F", "/T", "/PID", &pid.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => debug!("Killed Excel process {}", pid),
            Ok(status) => warn!("taskkill for Excel process {} exited with {}", pid, status),
            Err(e) => warn!("Failed to run taskkill for Excel process {}: {}", pid, e),
        }
    }
}

fn parse_pid(content: &str) -> Option<u32> {
    content.trim().parse().ok().filter(|pid| *pid != 0)
}

/// Map the script's exit status to a render failure
fn failure_from_exit(code: Option<i32>, stderr: &str) -> RenderFailure {
    match code {
        Some(EXIT_NO_PASTE_TARGET) => RenderFailure::NoPasteTarget,
        Some(EXIT_CLIPBOARD_EMPTY) => RenderFailure::ClipboardEmpty,
        Some(code) => RenderFailure::Engine {
            message: format!("exit code {code}: {}", stderr.trim()),
        },
        None => RenderFailure::Engine {
            message: "render process was terminated".to_string(),
        },
    }
}
