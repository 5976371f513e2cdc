//! Clip planes and view frustum extraction

use crate::core::types::{Vec3, Vec4, Mat4};
use super::aabb::Aabb;

/// Cross products shorter than this are treated as degenerate
pub const PLANE_EPSILON: f32 = 1e-6;

/// A clip plane in Hessian normal form (normal.xyz, d).
///
/// The normal faces out of the convex volume the plane bounds, so a positive
/// distance means the point is outside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Default for Plane {
    fn default() -> Self {
        Self { normal: Vec3::Y, d: 0.0 }
    }
}

impl Plane {
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    /// Plane through `point` with the given (unnormalized) normal
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Option<Self> {
        let n = normal.try_normalize()?;
        Some(Self { normal: n, d: -n.dot(point) })
    }

    /// Plane through three points, normal = (b - a) x (c - a).
    ///
    /// Returns None when the points are (nearly) collinear.
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Option<Self> {
        let n = (b - a).cross(c - a);
        if n.length_squared() < PLANE_EPSILON * PLANE_EPSILON {
            return None;
        }
        Self::from_point_normal(a, n)
    }

    /// Signed distance from point to plane (positive = outside)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    pub fn is_point_outside(&self, point: Vec3) -> bool {
        self.distance_to_point(point) > 0.0
    }

    /// Same plane facing the other way
    pub fn flipped(&self) -> Self {
        Self { normal: -self.normal, d: -self.d }
    }
}

/// View frustum with 6 planes (Near, Far, Left, Right, Top, Bottom).
///
/// The near and far planes come first, which is the layout the portal
/// tracer expects for its input plane list.
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix.
    ///
    /// Uses the Gribb/Hartmann method with glam's [0, 1] clip depth range.
    /// Normals are flipped to face outwards.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        // Extract rows from the VP matrix (column-major storage)
        let rows = [
            Vec4::new(vp.col(0).x, vp.col(1).x, vp.col(2).x, vp.col(3).x),
            Vec4::new(vp.col(0).y, vp.col(1).y, vp.col(2).y, vp.col(3).y),
            Vec4::new(vp.col(0).z, vp.col(1).z, vp.col(2).z, vp.col(3).z),
            Vec4::new(vp.col(0).w, vp.col(1).w, vp.col(2).w, vp.col(3).w),
        ];

        // Near:   row2
        // Far:    row3 - row2
        // Left:   row3 + row0
        // Right:  row3 - row0
        // Top:    row3 - row1
        // Bottom: row3 + row1
        let raw = [
            rows[2],
            rows[3] - rows[2],
            rows[3] + rows[0],
            rows[3] - rows[0],
            rows[3] - rows[1],
            rows[3] + rows[1],
        ];

        let mut planes = [Plane::default(); 6];
        for (i, r) in raw.iter().enumerate() {
            planes[i] = Self::normalize_plane(*r);
        }

        Self { planes }
    }

    /// Perspective frustum for a camera at `position` looking along `forward`
    pub fn from_camera(
        position: Vec3,
        forward: Vec3,
        up: Vec3,
        fov_y_radians: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self::from_view_projection(&camera_view_projection(
            position, forward, up, fov_y_radians, aspect, near, far,
        ))
    }

    fn normalize_plane(plane: Vec4) -> Plane {
        let normal = Vec3::new(plane.x, plane.y, plane.z);
        let len = normal.length();
        if len <= 0.0 {
            return Plane::default();
        }
        // inward-facing from the extraction, flip to outward
        Plane {
            normal: -normal / len,
            d: -plane.w / len,
        }
    }

    pub fn near(&self) -> &Plane {
        &self.planes[0]
    }

    pub fn far(&self) -> &Plane {
        &self.planes[1]
    }

    /// All planes, near and far first
    pub fn as_slice(&self) -> &[Plane] {
        &self.planes
    }

    /// Check if point is inside frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| !p.is_point_outside(point))
    }

    /// Check if AABB intersects frustum (conservative test)
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes
            .iter()
            .all(|p| aabb.project_range_in_plane(p).0 <= 0.0)
    }
}

/// Right-handed view-projection matrix with glam's [0, 1] depth range
pub fn camera_view_projection(
    position: Vec3,
    forward: Vec3,
    up: Vec3,
    fov_y_radians: f32,
    aspect: f32,
    near: f32,
    far: f32,
) -> Mat4 {
    let proj = Mat4::perspective_rh(fov_y_radians, aspect, near, far);
    let view = Mat4::look_to_rh(position, forward, up);
    proj * view
}
