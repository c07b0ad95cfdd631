//! `Panchangam` - local sunrise and sunset times for a Panchangam workbook
//!
//! This library resolves a place name to coordinates, computes the day's solar
//! events there, writes them into a working copy of the Panchangam workbook
//! and renders the table region to an image for the Telegram bot.

pub mod cache;
pub mod config;
pub mod conversation;
pub mod document;
pub mod error;
pub mod geocoding;
pub mod http;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod solar;
pub mod telegram;

// Re-export core types for public API
pub use cache::PersistentCache;
pub use config::PanchangamConfig;
pub use conversation::{ConversationState, FlowController, Inbound, Reply};
pub use document::{CellRange, CellRef, DocumentUpdater, RequestId, WorkingCopy};
pub use error::{PanchangamError, PipelineError, RenderFailure};
pub use geocoding::{Geocoder, LocationResolver};
pub use models::{Coordinates, ResolvedLocation, SolarTimes};
pub use pipeline::{Pipeline, PipelineOutput, PipelineSettings};
pub use render::{RegionRenderer, RenderedArtifact};
pub use solar::{SolarTimeCalculator, SolarTimeSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, PanchangamError>;
