//! Data models for the Panchangam bot
//!
//! This module contains the core domain models organized by concern:
//! - Location: validated geographic coordinates and the matched place
//! - Solar: the three local solar event times written into the table

pub mod location;
pub mod solar;

// Re-export all public types for convenient access
pub use location::{Coordinates, ResolvedLocation};
pub use solar::SolarTimes;
