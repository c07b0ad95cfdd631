//! The sun-times pipeline: resolve, compute, update, render
//!
//! Stages run in order; each is bounded by the stage timeout and a timed-out
//! stage reports its own error kind.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use tracing::{info, instrument, warn};

use crate::cache::PersistentCache;
use crate::config::PanchangamConfig;
use crate::document::{CellRange, DocumentUpdater, RequestId};
use crate::error::PipelineError;
use crate::geocoding::{self, LocationResolver};
use crate::models::{ResolvedLocation, SolarTimes};
use crate::render::{self, RegionRenderer, RenderedArtifact};
use crate::solar::{self, SolarTimeCalculator};

/// Everything a successful run produced
#[derive(Debug)]
pub struct PipelineOutput {
    pub location: ResolvedLocation,
    pub times: SolarTimes,
    pub artifact: RenderedArtifact,
}

/// Fixed per-deployment parameters of a run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub timezone: Tz,
    pub region: CellRange,
    pub output_path: PathBuf,
    pub stage_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &PanchangamConfig) -> Result<Self> {
        Ok(Self {
            timezone: config.timezone()?,
            region: config.render_region()?,
            output_path: config.output_path(),
            stage_timeout: config.stage_timeout(),
        })
    }
}

#[derive(Clone)]
pub struct Pipeline {
    resolver: LocationResolver,
    calculator: SolarTimeCalculator,
    updater: DocumentUpdater,
    renderer: Arc<dyn RegionRenderer>,
    settings: PipelineSettings,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        resolver: LocationResolver,
        calculator: SolarTimeCalculator,
        updater: DocumentUpdater,
        renderer: Arc<dyn RegionRenderer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            resolver,
            calculator,
            updater,
            renderer,
            settings,
        }
    }

    /// Wire up the configured providers
    pub fn from_config(config: &PanchangamConfig) -> Result<Self> {
        let cache = if config.cache.enabled {
            let dir = config.cache_dir();
            match PersistentCache::open(&dir) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    warn!("Geocoding cache disabled, cannot open {}: {:#}", dir.display(), e);
                    None
                }
            }
        } else {
            None
        };

        let geocoder = geocoding::geocoder_from_config(config, cache)
            .context("Failed to set up the geocoder")?;
        let source =
            solar::source_from_config(config).context("Failed to set up the solar source")?;

        Ok(Self::new(
            LocationResolver::new(geocoder),
            SolarTimeCalculator::new(source),
            DocumentUpdater::from_config(config)?,
            render::renderer_from_config(config),
            PipelineSettings::from_config(config)?,
        ))
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Resolve `text` and compute today's solar times there
    pub async fn times(&self, text: &str) -> Result<(ResolvedLocation, SolarTimes), PipelineError> {
        let location = self
            .within("geocoding", self.resolver.resolve(text), PipelineError::geocoding_unavailable)
            .await?;

        let timezone = self.settings.timezone;
        let times = self
            .within(
                "solar times",
                self.calculator
                    .compute(location.coordinates, timezone, solar::local_today(timezone)),
                PipelineError::service,
            )
            .await?;
        Ok((location, times))
    }

    /// Run every stage for one location message of `session`
    #[instrument(skip(self))]
    pub async fn run(&self, session: &str, text: &str) -> Result<PipelineOutput, PipelineError> {
        let request = RequestId::new(session);
        let (location, times) = self.times(text).await?;
        info!("{}: {}", location.name, times.summary());

        let working = self
            .within("document update", self.updater.update(&times, &request), PipelineError::document)
            .await?;

        let output = render::artifact_path(&self.settings.output_path, &request);
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PipelineError::engine(format!(
                    "cannot create output directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let image = self
            .within(
                "render",
                self.renderer
                    .render(working.path(), working.sheet(), self.settings.region, &output),
                PipelineError::engine,
            )
            .await?;

        Ok(PipelineOutput {
            location,
            times,
            artifact: RenderedArtifact::new(image),
        })
    }

    async fn within<T>(
        &self,
        stage: &str,
        future: impl Future<Output = Result<T, PipelineError>>,
        on_timeout: fn(String) -> PipelineError,
    ) -> Result<T, PipelineError> {
        match tokio::time::timeout(self.settings.stage_timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                let seconds = self.settings.stage_timeout.as_secs_f64();
                warn!("Stage '{}' timed out after {:.1}s", stage, seconds);
                Err(on_timeout(format!("{stage} timed out after {seconds:.1}s")))
            }
        }
    }
}
