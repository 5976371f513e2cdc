//! Axis-aligned bounding box

use crate::core::types::Vec3;
use super::plane::Plane;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create AABB from center and half-extents
    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get half-extents
    pub fn half_extent(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Signed distance range of the box along a plane's normal.
    ///
    /// Returns `(min, max)` of `plane.distance_to_point` over all eight corners.
    /// If `min > 0` the whole box is outside the plane.
    pub fn project_range_in_plane(&self, plane: &Plane) -> (f32, f32) {
        let center_dist = plane.distance_to_point(self.center());
        let half = self.half_extent();
        let radius = half.x * plane.normal.x.abs()
            + half.y * plane.normal.y.abs()
            + half.z * plane.normal.z.abs();
        (center_dist - radius, center_dist + radius)
    }

    /// Signed distance from point to the box surface (negative inside)
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        let d = (self.min - p).max(p - self.max);
        let outside = d.max(Vec3::ZERO).length();
        let inside = d.max_element().min(0.0);
        outside + inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_accessors() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(aabb.center(), Vec3::splat(0.5));
        assert_eq!(aabb.size(), Vec3::ONE);
    }

    #[test]
    fn test_project_range_in_plane() {
        // Plane x = 2, outside towards +x
        let plane = Plane::new(Vec3::X, -2.0);
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let (min, max) = aabb.project_range_in_plane(&plane);
        assert!((min + 2.0).abs() < 1e-6);
        assert!((max + 1.0).abs() < 1e-6);

        let beyond = Aabb::new(Vec3::new(3.0, 0.0, 0.0), Vec3::new(4.0, 1.0, 1.0));
        let (min, _) = beyond.project_range_in_plane(&plane);
        assert!(min > 0.0);
    }

    #[test]
    fn test_signed_distance() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        assert!((aabb.signed_distance(Vec3::splat(1.0)) + 1.0).abs() < 1e-6);
        assert!((aabb.signed_distance(Vec3::new(5.0, 1.0, 1.0)) - 3.0).abs() < 1e-6);
    }
}
