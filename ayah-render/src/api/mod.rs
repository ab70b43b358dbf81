//! HTTP API handlers for ayah-render

pub mod health;
pub mod render;

pub use health::health_routes;
pub use render::render_routes;
