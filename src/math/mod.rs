//! Mathematical utilities and data structures

pub mod aabb;
pub mod plane;

pub use aabb::Aabb;
pub use plane::{Plane, Frustum};
