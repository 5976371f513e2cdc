//! Screen-space rectangles for portals seen through the camera.
//!
//! Bookkeeping only: the rectangles let a renderer scissor objects seen
//! through a portal, they never affect which objects are visible.

use crate::core::types::{Mat4, Vec2, Vec3};

/// Clip-space w below which a point counts as behind the camera
const MIN_W: f32 = 1e-5;

/// Axis-aligned rectangle in normalized device coordinates ([-1, 1] on both axes)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for ScreenRect {
    fn default() -> Self {
        Self::FULL
    }
}

impl ScreenRect {
    /// The whole screen
    pub const FULL: ScreenRect = ScreenRect {
        min: Vec2::new(-1.0, -1.0),
        max: Vec2::new(1.0, 1.0),
    };

    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Bounding rectangle of `points` projected by `xform`, clamped to the screen.
    ///
    /// Returns None if any point is at or behind the camera plane, where the
    /// projection is unbounded.
    pub fn from_projected_points(xform: &Mat4, points: &[Vec3]) -> Option<Self> {
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);

        for p in points {
            let clip = *xform * p.extend(1.0);
            if clip.w < MIN_W {
                return None;
            }
            let ndc = Vec2::new(clip.x, clip.y) / clip.w;
            min = min.min(ndc);
            max = max.max(ndc);
        }

        if points.is_empty() {
            return None;
        }

        Some(Self {
            min: min.clamp(Self::FULL.min, Self::FULL.max),
            max: max.clamp(Self::FULL.min, Self::FULL.max),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    /// Overlap of two rectangles (may be empty)
    pub fn intersection(&self, other: &ScreenRect) -> ScreenRect {
        ScreenRect {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    pub fn contains(&self, other: &ScreenRect) -> bool {
        other.min.x >= self.min.x
            && other.min.y >= self.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }

    /// Pixel rectangle (x, y, width, height) with y down, for a viewport size
    pub fn to_pixels(&self, width: u32, height: u32) -> (i32, i32, i32, i32) {
        let size = Vec2::new(width as f32, height as f32);
        let lo = (Vec2::new(self.min.x, -self.max.y) * 0.5 + 0.5) * size;
        let hi = (Vec2::new(self.max.x, -self.min.y) * 0.5 + 0.5) * size;
        let x = lo.x.floor() as i32;
        let y = lo.y.floor() as i32;
        (x, y, hi.x.ceil() as i32 - x, hi.y.ceil() as i32 - y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::plane::camera_view_projection;

    fn test_camera() -> Mat4 {
        camera_view_projection(
            Vec3::ZERO,
            Vec3::NEG_Z,
            Vec3::Y,
            std::f32::consts::FRAC_PI_2,
            1.0,
            0.1,
            100.0,
        )
    }

    #[test]
    fn test_project_square() {
        let points = [
            Vec3::new(-1.0, -1.0, -5.0),
            Vec3::new(1.0, -1.0, -5.0),
            Vec3::new(1.0, 1.0, -5.0),
            Vec3::new(-1.0, 1.0, -5.0),
        ];
        let rect = ScreenRect::from_projected_points(&test_camera(), &points).unwrap();
        assert!((rect.min - Vec2::splat(-0.2)).length() < 1e-4);
        assert!((rect.max - Vec2::splat(0.2)).length() < 1e-4);
    }

    #[test]
    fn test_point_behind_camera() {
        let points = [Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 5.0)];
        assert!(ScreenRect::from_projected_points(&test_camera(), &points).is_none());
    }

    #[test]
    fn test_clamped_to_screen() {
        let points = [Vec3::new(-100.0, 0.0, -1.0), Vec3::new(0.5, 0.5, -1.0)];
        let rect = ScreenRect::from_projected_points(&test_camera(), &points).unwrap();
        assert_eq!(rect.min.x, -1.0);
        assert!(ScreenRect::FULL.contains(&rect));
    }

    #[test]
    fn test_intersection() {
        let a = ScreenRect::new(Vec2::new(-1.0, -1.0), Vec2::new(0.5, 0.5));
        let b = ScreenRect::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));
        let i = a.intersection(&b);
        assert_eq!(i, ScreenRect::new(Vec2::ZERO, Vec2::splat(0.5)));
        assert!(!i.is_empty());

        let c = ScreenRect::new(Vec2::splat(0.8), Vec2::splat(0.9));
        assert!(a.intersection(&c).is_empty());
    }

    #[test]
    fn test_to_pixels() {
        assert_eq!(ScreenRect::FULL.to_pixels(640, 480), (0, 0, 640, 480));
        let top_left = ScreenRect::new(Vec2::new(-1.0, 0.0), Vec2::new(0.0, 1.0));
        assert_eq!(top_left.to_pixels(640, 480), (0, 0, 320, 240));
    }
}
