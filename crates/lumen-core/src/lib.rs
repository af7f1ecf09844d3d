//! Lumen Core - Shared primitives for the Lumen asset pipeline
//!
//! This crate provides the small value types the importer and its callers
//! agree on:
//! - Mathematical primitives (re-exported from glam)
//! - `Color` for material factors
//! - `Aabb` axis-aligned bounding boxes with bounding-sphere helpers

pub mod types;

pub use glam::{Mat4, Vec2, Vec3, Vec4};
pub use types::{Aabb, Color};
