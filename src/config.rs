//! Configuration management for the Panchangam bot
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::PanchangamError;
use crate::document::{CellRange, CellRef};
use anyhow::{Context, Result};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the Panchangam bot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanchangamConfig {
    /// Telegram Bot API settings
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Coordinate resolver settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Solar time source settings
    #[serde(default)]
    pub solar: SolarConfig,
    /// Canonical workbook and target cells
    #[serde(default)]
    pub document: DocumentConfig,
    /// Region renderer settings
    #[serde(default)]
    pub render: RenderConfig,
    /// Per-stage limits
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Conversation session settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Geocoding cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telegram Bot API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather
    pub bot_token: Option<String>,
    /// Base URL of the Bot API
    #[serde(default = "default_telegram_base_url")]
    pub api_base_url: String,
    /// Long-polling timeout in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_seconds: u32,
}

/// Geocoding backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeocodingProvider {
    #[serde(rename = "opencage")]
    OpenCage,
    #[serde(rename = "open-meteo")]
    OpenMeteo,
}

/// Coordinate resolver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_geocoding_provider")]
    pub provider: GeocodingProvider,
    /// API key (required for OpenCage)
    pub api_key: Option<String>,
    /// Base URL override; empty means the provider's public endpoint
    #[serde(default)]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Candidates requested from the provider
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

/// Solar time backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolarProvider {
    #[serde(rename = "sunrise-sunset")]
    SunriseSunset,
    #[serde(rename = "offline")]
    Offline,
}

/// Solar time source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarConfig {
    #[serde(default = "default_solar_provider")]
    pub provider: SolarProvider,
    /// Base URL for the sunrise-sunset API
    #[serde(default = "default_solar_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Canonical workbook and target cells
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Canonical workbook, never written to
    #[serde(default = "default_canonical_path")]
    pub canonical_path: String,
    /// Directory receiving the per-request working copies
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
    /// IANA timezone the times are written in
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_sunrise_today_cell")]
    pub sunrise_today_cell: String,
    #[serde(default = "default_sunset_today_cell")]
    pub sunset_today_cell: String,
    #[serde(default = "default_sunrise_tomorrow_cell")]
    pub sunrise_tomorrow_cell: String,
}

/// Rendering engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderEngine {
    #[serde(rename = "excel")]
    Excel,
    #[serde(rename = "disabled")]
    Disabled,
}

/// Region renderer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_render_engine")]
    pub engine: RenderEngine,
    /// Fixed dashboard region rendered for every request
    #[serde(default = "default_render_region")]
    pub region: String,
    /// Image path; each request writes a uniquely suffixed sibling
    #[serde(default = "default_output_path")]
    pub output_path: String,
    /// Engine executable used to run the automation script
    #[serde(default = "default_powershell")]
    pub powershell: String,
}

/// Per-stage limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound for every pipeline stage
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_seconds: u32,
}

/// Conversation session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions idle longer than this are evicted
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_minutes: u32,
    /// How often the eviction sweep runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u32,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether geocoding answers are cached
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cache directory location
    #[serde(default = "default_cache_location")]
    pub location: String,
    /// Cache TTL in hours
    #[serde(default = "default_cache_ttl")]
    pub ttl_hours: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_telegram_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u32 {
    30
}

fn default_geocoding_provider() -> GeocodingProvider {
    GeocodingProvider::OpenCage
}

fn default_http_timeout() -> u32 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_max_results() -> u32 {
    1
}

fn default_solar_provider() -> SolarProvider {
    SolarProvider::SunriseSunset
}

fn default_solar_base_url() -> String {
    "https://api.sunrise-sunset.org".to_string()
}

fn default_canonical_path() -> String {
    "Panchangam.xlsx".to_string()
}

fn default_working_dir() -> String {
    std::env::temp_dir()
        .join("panchangam")
        .to_string_lossy()
        .into_owned()
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

fn default_sunrise_today_cell() -> String {
    "O4".to_string()
}

fn default_sunset_today_cell() -> String {
    "O5".to_string()
}

fn default_sunrise_tomorrow_cell() -> String {
    "O6".to_string()
}

fn default_render_engine() -> RenderEngine {
    RenderEngine::Excel
}

fn default_render_region() -> String {
    "B1:L32".to_string()
}

fn default_output_path() -> String {
    std::env::temp_dir()
        .join("panchangam")
        .join("panchangam.png")
        .to_string_lossy()
        .into_owned()
}

fn default_powershell() -> String {
    "powershell.exe".to_string()
}

fn default_stage_timeout() -> u32 {
    30
}

fn default_idle_timeout() -> u32 {
    10
}

fn default_sweep_interval() -> u32 {
    60
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_location() -> String {
    "~/.cache/panchangam".to_string()
}

fn default_cache_ttl() -> u32 {
    24 * 7
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base_url: default_telegram_base_url(),
            poll_timeout_seconds: default_poll_timeout(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            provider: default_geocoding_provider(),
            api_key: None,
            base_url: String::new(),
            timeout_seconds: default_http_timeout(),
            max_retries: default_max_retries(),
            max_results: default_max_results(),
        }
    }
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            provider: default_solar_provider(),
            base_url: default_solar_base_url(),
            timeout_seconds: default_http_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            canonical_path: default_canonical_path(),
            working_dir: default_working_dir(),
            timezone: default_timezone(),
            sunrise_today_cell: default_sunrise_today_cell(),
            sunset_today_cell: default_sunset_today_cell(),
            sunrise_tomorrow_cell: default_sunrise_tomorrow_cell(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            engine: default_render_engine(),
            region: default_render_region(),
            output_path: default_output_path(),
            powershell: default_powershell(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_seconds: default_stage_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_minutes: default_idle_timeout(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            location: default_cache_location(),
            ttl_hours: default_cache_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl PanchangamConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. PANCHANGAM_TELEGRAM__BOT_TOKEN
        builder = builder.add_source(
            Environment::with_prefix("PANCHANGAM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: PanchangamConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("panchangam").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.telegram.api_base_url.is_empty() {
            self.telegram.api_base_url = default_telegram_base_url();
        }
        if self.telegram.poll_timeout_seconds == 0 {
            self.telegram.poll_timeout_seconds = default_poll_timeout();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_http_timeout();
        }
        if self.geocoding.max_results == 0 {
            self.geocoding.max_results = default_max_results();
        }
        if self.solar.base_url.is_empty() {
            self.solar.base_url = default_solar_base_url();
        }
        if self.solar.timeout_seconds == 0 {
            self.solar.timeout_seconds = default_http_timeout();
        }
        if self.document.working_dir.is_empty() {
            self.document.working_dir = default_working_dir();
        }
        if self.document.timezone.is_empty() {
            self.document.timezone = default_timezone();
        }
        if self.render.region.is_empty() {
            self.render.region = default_render_region();
        }
        if self.render.output_path.is_empty() {
            self.render.output_path = default_output_path();
        }
        if self.render.powershell.is_empty() {
            self.render.powershell = default_powershell();
        }
        if self.pipeline.stage_timeout_seconds == 0 {
            self.pipeline.stage_timeout_seconds = default_stage_timeout();
        }
        if self.session.idle_timeout_minutes == 0 {
            self.session.idle_timeout_minutes = default_idle_timeout();
        }
        if self.session.sweep_interval_seconds == 0 {
            self.session.sweep_interval_seconds = default_sweep_interval();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.cache.ttl_hours == 0 {
            self.cache.ttl_hours = default_cache_ttl();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_document_layout()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        if self.geocoding.provider == GeocodingProvider::OpenCage {
            match &self.geocoding.api_key {
                None => {
                    return Err(PanchangamError::config(
                        "The OpenCage geocoder needs an API key. Set geocoding.api_key or switch geocoding.provider to 'open-meteo'.",
                    )
                    .into());
                }
                Some(key) if key.trim().len() < 8 => {
                    return Err(PanchangamError::config(
                        "Geocoding API key appears to be invalid (too short). Please check your API key.",
                    )
                    .into());
                }
                Some(_) => {}
            }
        }

        if let Some(token) = &self.telegram.bot_token {
            if !token.contains(':') {
                return Err(PanchangamError::config(
                    "Telegram bot token must look like '<bot id>:<secret>'",
                )
                .into());
            }
        }

        Ok(())
    }

    /// The bot token, required only when the bot is started
    pub fn bot_token(&self) -> Result<&str> {
        self.telegram
            .bot_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                PanchangamError::config(
                    "Missing Telegram bot token. Set telegram.bot_token or PANCHANGAM_TELEGRAM__BOT_TOKEN.",
                )
                .into()
            })
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        let timeouts = [
            ("Geocoding timeout", self.geocoding.timeout_seconds),
            ("Solar service timeout", self.solar.timeout_seconds),
            ("Pipeline stage timeout", self.pipeline.stage_timeout_seconds),
            ("Telegram poll timeout", self.telegram.poll_timeout_seconds),
        ];
        for (name, seconds) in timeouts {
            if seconds > 300 {
                return Err(PanchangamError::config(format!(
                    "{name} cannot exceed 300 seconds"
                ))
                .into());
            }
        }

        if self.geocoding.max_retries > 10 || self.solar.max_retries > 10 {
            return Err(PanchangamError::config("HTTP max retries cannot exceed 10").into());
        }

        if self.geocoding.max_results > 10 {
            return Err(PanchangamError::config("Geocoding max results cannot exceed 10").into());
        }

        if self.cache.ttl_hours > 24 * 90 {
            return Err(
                PanchangamError::config("Cache TTL cannot exceed 2160 hours (90 days)").into(),
            );
        }

        if self.session.idle_timeout_minutes > 24 * 60 {
            return Err(
                PanchangamError::config("Session idle timeout cannot exceed 1440 minutes").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(PanchangamError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(PanchangamError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let mut urls = vec![
            ("Telegram API base URL", self.telegram.api_base_url.as_str()),
            ("Solar service base URL", self.solar.base_url.as_str()),
        ];
        if !self.geocoding.base_url.is_empty() {
            urls.push(("Geocoding base URL", self.geocoding.base_url.as_str()));
        }
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PanchangamError::config(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        self.timezone()?;

        Ok(())
    }

    /// Validate target cells and the render region
    fn validate_document_layout(&self) -> Result<()> {
        let cells = self.target_cells()?;
        if cells[0] == cells[1] || cells[1] == cells[2] || cells[0] == cells[2] {
            return Err(
                PanchangamError::config("The three target cells must be distinct").into(),
            );
        }
        self.render_region()?;
        if self.document.canonical_path.trim().is_empty() {
            return Err(PanchangamError::config("document.canonical_path cannot be empty").into());
        }
        Ok(())
    }

    /// Configured local timezone
    pub fn timezone(&self) -> Result<Tz> {
        self.document.timezone.parse::<Tz>().map_err(|_| {
            PanchangamError::config(format!(
                "Invalid timezone '{}'. Use an IANA name such as 'Asia/Kolkata'",
                self.document.timezone
            ))
            .into()
        })
    }

    /// Target cells in write order: sunrise today, sunset today, sunrise tomorrow
    pub fn target_cells(&self) -> Result<[CellRef; 3]> {
        let parse = |name: &str, value: &str| -> Result<CellRef> {
            value
                .parse::<CellRef>()
                .map_err(|e| PanchangamError::config(format!("{name}: {e}")).into())
        };
        Ok([
            parse("document.sunrise_today_cell", &self.document.sunrise_today_cell)?,
            parse("document.sunset_today_cell", &self.document.sunset_today_cell)?,
            parse(
                "document.sunrise_tomorrow_cell",
                &self.document.sunrise_tomorrow_cell,
            )?,
        ])
    }

    /// Fixed region rendered for every request
    pub fn render_region(&self) -> Result<CellRange> {
        self.render
            .region
            .parse::<CellRange>()
            .map_err(|e| PanchangamError::config(format!("render.region: {e}")).into())
    }

    #[must_use]
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.stage_timeout_seconds.into())
    }

    #[must_use]
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.session.idle_timeout_minutes) * 60)
    }

    #[must_use]
    pub fn canonical_path(&self) -> PathBuf {
        expand_home(&self.document.canonical_path)
    }

    #[must_use]
    pub fn working_dir(&self) -> PathBuf {
        expand_home(&self.document.working_dir)
    }

    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        expand_home(&self.render.output_path)
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        expand_home(&self.cache.location)
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PanchangamConfig {
        let mut config = PanchangamConfig::default();
        config.geocoding.api_key = Some("valid_api_key_123".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = PanchangamConfig::default();
        assert_eq!(config.solar.base_url, "https://api.sunrise-sunset.org");
        assert_eq!(config.document.timezone, "Asia/Kolkata");
        assert_eq!(config.document.sunrise_today_cell, "O4");
        assert_eq!(config.render.region, "B1:L32");
        assert_eq!(config.pipeline.stage_timeout_seconds, 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.telegram.bot_token.is_none());
    }

    #[test]
    fn test_opencage_requires_api_key() {
        let config = PanchangamConfig::default();
        let result = config.validate_api_keys();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key"));
    }

    #[test]
    fn test_open_meteo_needs_no_key() {
        let mut config = PanchangamConfig::default();
        config.geocoding.provider = GeocodingProvider::OpenMeteo;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = valid_config();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = valid_config();
        config.pipeline.stage_timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot exceed"));
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let mut config = valid_config();
        config.document.timezone = "Mars/Olympus".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Invalid timezone"));
    }

    #[test]
    fn test_duplicate_target_cells_rejected() {
        let mut config = valid_config();
        config.document.sunset_today_cell = "O4".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_layout_accessors() {
        let config = valid_config();
        let cells = config.target_cells().unwrap();
        assert_eq!(cells.map(|c| c.to_string()), ["O4", "O5", "O6"]);
        assert_eq!(config.render_region().unwrap().to_string(), "B1:L32");
        assert_eq!(config.timezone().unwrap(), chrono_tz::Asia::Kolkata);
    }

    #[test]
    fn test_bot_token_required_only_on_demand() {
        let mut config = valid_config();
        assert!(config.bot_token().is_err());
        config.telegram.bot_token = Some("12345:secret".to_string());
        assert_eq!(config.bot_token().unwrap(), "12345:secret");
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[geocoding]
provider = "open-meteo"

[document]
canonical_path = "/srv/panchangam/table.xlsx"
timezone = "Europe/Berlin"

[render]
engine = "disabled"
"#,
        )
        .unwrap();

        let config = PanchangamConfig::load_from_path(Some(path)).unwrap();
        assert_eq!(config.geocoding.provider, GeocodingProvider::OpenMeteo);
        assert_eq!(config.render.engine, RenderEngine::Disabled);
        assert_eq!(config.canonical_path(), PathBuf::from("/srv/panchangam/table.xlsx"));
        assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(config.document.sunrise_tomorrow_cell, "O6");
    }

    #[test]
    fn test_config_path_generation() {
        let path = PanchangamConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("panchangam"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
