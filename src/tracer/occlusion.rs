//! Occlusion culling against room occluders
//!
//! Before a room is culled, [`PortalOcclusionCuller::prepare`] picks the
//! room's best occluders for the current viewer: spheres by apparent size,
//! polys by area over squared distance. Anything whose bounding sphere (or
//! box, for polys) sits entirely in the shadow of one of them is hidden.
//!
//! The tests are conservative. An occludee is only culled when a single
//! occluder covers it; several occluders together never hide anything.

use crate::core::types::Vec3;
use crate::math::{Aabb, Plane};
use crate::rooms::{OccluderShape, Room, RoomGraph};

/// Hard cap on either kind of occluder kept per room
pub const MAX_ACTIVE_OCCLUDERS: usize = 64;

/// Occludees closer to the viewer than this are never culled
const MIN_OCCLUDEE_DIST: f32 = 0.1;

/// A box must sit at least this far behind an occluder poly
const POLY_BEHIND_MARGIN: f32 = 0.2;

#[derive(Clone, Copy, Debug)]
struct ActiveSphere {
    center: Vec3,
    radius: f32,
    /// Distance from the viewer to the center
    dist: f32,
}

#[derive(Clone, Debug)]
struct ActivePoly {
    /// Poly plane, turned so the viewer is on the positive side
    plane: Plane,
    /// Range into `edge_planes`
    first_edge: usize,
    num_edges: usize,
}

/// Picks the active occluders of a room and tests occludees against them.
///
/// Lives in the tracer's scratch space and is re-prepared for every room
/// the trace enters.
pub struct PortalOcclusionCuller {
    max_spheres: usize,
    max_polys: usize,
    origin: Vec3,
    spheres: Vec<ActiveSphere>,
    polys: Vec<ActivePoly>,
    /// Planes through the viewer and each poly edge, the poly centroid inside
    edge_planes: Vec<Plane>,
    closest_sphere_dist: f32,
    /// (fit, occluder index) candidates, reused between prepares
    candidates: Vec<(f32, usize)>,
}

impl Default for PortalOcclusionCuller {
    fn default() -> Self {
        Self::new(8, 8)
    }
}

impl PortalOcclusionCuller {
    pub fn new(max_spheres: usize, max_polys: usize) -> Self {
        Self {
            max_spheres: max_spheres.min(MAX_ACTIVE_OCCLUDERS),
            max_polys: max_polys.min(MAX_ACTIVE_OCCLUDERS),
            origin: Vec3::ZERO,
            spheres: Vec::new(),
            polys: Vec::new(),
            edge_planes: Vec::new(),
            closest_sphere_dist: f32::MAX,
            candidates: Vec::new(),
        }
    }

    pub fn set_limits(&mut self, max_spheres: usize, max_polys: usize) {
        self.max_spheres = max_spheres.min(MAX_ACTIVE_OCCLUDERS);
        self.max_polys = max_polys.min(MAX_ACTIVE_OCCLUDERS);
    }

    /// Drop all active occluders; nothing is culled until the next prepare
    pub fn clear(&mut self) {
        self.spheres.clear();
        self.polys.clear();
        self.edge_planes.clear();
        self.closest_sphere_dist = f32::MAX;
    }

    pub fn occluders_present(&self) -> bool {
        !self.spheres.is_empty() || !self.polys.is_empty()
    }

    /// Choose the occluders of `room` that matter from `origin`.
    ///
    /// Occluders outside any of `planes` (or `near`) cannot hide anything
    /// visible and are skipped. Inactive occluders are skipped.
    pub fn prepare(
        &mut self,
        graph: &RoomGraph,
        room: &Room,
        origin: Vec3,
        planes: &[Plane],
        near: Option<&Plane>,
    ) {
        self.clear();
        self.origin = origin;
        if room.occluder_ids.is_empty() {
            return;
        }

        // spheres: bigger and closer is better
        self.candidates.clear();
        for occluder_id in &room.occluder_ids {
            let Some(occluder) = graph.occluder(*occluder_id) else {
                continue;
            };
            if !occluder.active {
                continue;
            }
            if let OccluderShape::Sphere { center, radius } = occluder.shape {
                if is_sphere_culled(center, radius, planes, near) {
                    continue;
                }
                let dist = (center - origin).length();
                let fit = 100.0 / dist.max(0.01) * radius;
                self.candidates.push((fit, occluder_id.index()));
            }
        }
        keep_best(&mut self.candidates, self.max_spheres);
        for (_, index) in &self.candidates {
            if let OccluderShape::Sphere { center, radius } = graph.occluders()[*index].shape {
                let dist = (center - origin).length();
                self.closest_sphere_dist = self.closest_sphere_dist.min(dist);
                self.spheres.push(ActiveSphere { center, radius, dist });
            }
        }
        // keeps the quick reject away from zero
        self.closest_sphere_dist = self.closest_sphere_dist.max(0.001);

        // polys: larger apparent area is better
        self.candidates.clear();
        for occluder_id in &room.occluder_ids {
            let Some(occluder) = graph.occluder(*occluder_id) else {
                continue;
            };
            if !occluder.active {
                continue;
            }
            if let OccluderShape::Poly { points, center, area, .. } = &occluder.shape {
                if is_poly_culled(points, planes, near) {
                    continue;
                }
                let dist_sq = (*center - origin).length_squared().max(1e-4);
                self.candidates.push((area / dist_sq, occluder_id.index()));
            }
        }
        keep_best(&mut self.candidates, self.max_polys);
        let candidates = std::mem::take(&mut self.candidates);
        for (_, index) in &candidates {
            if let OccluderShape::Poly { points, plane, center, .. } = &graph.occluders()[*index].shape {
                self.push_poly(points, *plane, *center);
            }
        }
        self.candidates = candidates;

        log::trace!(
            "Room {} occluders: {} spheres, {} polys",
            room.id.0,
            self.spheres.len(),
            self.polys.len()
        );
    }

    fn push_poly(&mut self, points: &[Vec3], plane: Plane, center: Vec3) {
        let dist = plane.distance_to_point(self.origin);
        // edge on, hides nothing
        if dist.abs() < 1e-4 {
            return;
        }
        let plane = if dist > 0.0 { plane } else { plane.flipped() };

        let first_edge = self.edge_planes.len();
        for (a, b) in points.iter().zip(points.iter().cycle().skip(1)) {
            let Some(edge) = Plane::from_points(self.origin, *a, *b) else {
                // viewer in line with an edge, the poly would not bound anything
                self.edge_planes.truncate(first_edge);
                return;
            };
            let edge = if edge.distance_to_point(center) > 0.0 { edge.flipped() } else { edge };
            self.edge_planes.push(edge);
        }
        self.polys.push(ActivePoly {
            plane,
            first_edge,
            num_edges: points.len(),
        });
    }

    /// True if the whole box is hidden by a single active occluder
    pub fn cull_aabb(&self, aabb: &Aabb) -> bool {
        if !self.occluders_present() {
            return false;
        }
        if self.cull_aabb_to_polys(aabb) {
            return true;
        }
        self.cull_sphere_impl(aabb.center(), aabb.size().length() * 0.5, false)
    }

    /// True if the whole sphere is hidden by a single active occluder
    pub fn cull_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.cull_sphere_impl(center, radius, true)
    }

    fn cull_sphere_impl(&self, center: Vec3, radius: f32, test_polys: bool) -> bool {
        if !self.occluders_present() {
            return false;
        }
        let offset = center - self.origin;
        let raw_dist = offset.length();
        // close up, and no divide by zero below
        if raw_dist < MIN_OCCLUDEE_DIST {
            return false;
        }
        let ray_dir = offset / raw_dist;
        let dist = raw_dist - radius;

        if self.cull_sphere_to_spheres(radius, ray_dir, dist) {
            return true;
        }
        test_polys && self.cull_sphere_to_polys(center, radius)
    }

    fn cull_sphere_to_spheres(&self, radius: f32, ray_dir: Vec3, dist: f32) -> bool {
        // also rejects a viewer inside the occludee
        if dist < self.closest_sphere_dist {
            return false;
        }
        for sphere in &self.spheres {
            if dist < sphere.dist {
                continue;
            }
            // shrink the occluder by the occludee's size at the occluder's depth
            let adjusted = radius * (sphere.dist / dist);
            let occluder_radius = sphere.radius - adjusted;
            if occluder_radius <= 0.0 {
                continue;
            }
            let hit = intersect_ray_sphere(
                self.origin,
                ray_dir,
                sphere.center,
                occluder_radius * occluder_radius,
            );
            if hit.is_some_and(|t| t < dist) {
                return true;
            }
        }
        false
    }

    fn cull_sphere_to_polys(&self, center: Vec3, radius: f32) -> bool {
        self.polys.iter().any(|poly| {
            // occludee must be fully on the far side
            if poly.plane.distance_to_point(center) > -radius {
                return false;
            }
            self.edges(poly)
                .iter()
                .all(|edge| edge.distance_to_point(center) <= -radius)
        })
    }

    fn cull_aabb_to_polys(&self, aabb: &Aabb) -> bool {
        self.polys.iter().any(|poly| {
            if aabb.project_range_in_plane(&poly.plane).1 > -POLY_BEHIND_MARGIN {
                return false;
            }
            self.edges(poly)
                .iter()
                .all(|edge| aabb.project_range_in_plane(edge).1 <= 0.0)
        })
    }

    fn edges(&self, poly: &ActivePoly) -> &[Plane] {
        &self.edge_planes[poly.first_edge..poly.first_edge + poly.num_edges]
    }
}

/// Sort candidates best first and keep at most `max`
fn keep_best(candidates: &mut Vec<(f32, usize)>, max: usize) {
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    candidates.truncate(max);
}

fn is_sphere_culled(center: Vec3, radius: f32, planes: &[Plane], near: Option<&Plane>) -> bool {
    planes
        .iter()
        .chain(near)
        .any(|p| p.distance_to_point(center) > radius)
}

fn is_poly_culled(points: &[Vec3], planes: &[Plane], near: Option<&Plane>) -> bool {
    planes
        .iter()
        .chain(near)
        .any(|p| points.iter().all(|pt| p.is_point_outside(*pt)))
}

/// Distance along a unit ray to the first hit with a sphere, if the sphere
/// is in front of the ray origin.
fn intersect_ray_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius_sq: f32) -> Option<f32> {
    let to_center = center - origin;
    let tca = to_center.dot(dir);
    if tca < 0.0 {
        return None;
    }
    let d2 = to_center.length_squared() - tca * tca;
    if d2 > radius_sq {
        return None;
    }
    Some(tca - (radius_sq - d2).sqrt())
}
