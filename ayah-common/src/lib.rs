//! # Ayah Render Common Library
//!
//! Shared code for the ayah video render service including:
//! - Render request data model (ayahs, render config, templates)
//! - Input properties handed to the composition engine
//! - Service configuration and its layered resolution
//! - Common error type

pub mod config;
pub mod error;
pub mod render;

pub use error::{Error, Result};
pub use render::{AudioDurations, InputProps, RenderConfig, RenderRequest, Template};
