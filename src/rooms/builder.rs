//! Validating construction of a [`RoomGraph`].

use crate::core::types::{Result, Vec3};
use crate::core::Error;
use crate::math::{Aabb, Plane};
use crate::math::plane::PLANE_EPSILON;

use super::graph::{
    GlobalInstance, InstanceHandle, Occluder, OccluderId, OccluderShape, Portal, PortalId,
    RoamerId, Room, RoomGraph, RoomId, StaticId, StaticObject,
};
use super::pvs::Pvs;

/// Builds a room graph, checking every id as it goes.
#[derive(Default)]
pub struct RoomGraphBuilder {
    graph: RoomGraph,
}

impl RoomGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty room. Returns the new room's ID.
    pub fn add_room(&mut self, name: impl Into<String>, bounds: Option<Aabb>) -> RoomId {
        let id = RoomId(self.graph.rooms.len() as u32);
        self.graph.rooms.push(Room::new(id, name.into(), bounds));
        id
    }

    /// Set the convex hull (outward planes) used for point-in-room lookups
    pub fn set_room_hull(&mut self, room: RoomId, planes: Vec<Plane>) -> Result<()> {
        self.graph.check_room(room)?;
        self.graph.rooms[room.index()].bound_planes = planes;
        Ok(())
    }

    /// Add a static to its home room. Returns its global static index.
    pub fn add_static(
        &mut self,
        room: RoomId,
        aabb: Aabb,
        handle: InstanceHandle,
    ) -> Result<StaticId> {
        self.graph.check_room(room)?;
        let id = StaticId(self.graph.statics.len() as u32);
        self.graph.statics.push(StaticObject { aabb, handle, home_room: room });
        self.graph.rooms[room.index()].static_ids.push(id);
        Ok(id)
    }

    /// Register an existing static in another room its bounds extend into
    pub fn sprawl_static(&mut self, id: StaticId, room: RoomId) -> Result<()> {
        self.graph.check_room(room)?;
        if id.index() >= self.graph.statics.len() {
            return Err(Error::InvalidStatic(id.0));
        }
        let static_ids = &mut self.graph.rooms[room.index()].static_ids;
        if !static_ids.contains(&id) {
            static_ids.push(id);
        }
        Ok(())
    }

    /// Add a portal from `from` to `to`.
    ///
    /// The plane normal is made to point out of `from`: from the polygon
    /// winding, or away from the centre of `from` when it has bounds.
    pub fn add_portal(
        &mut self,
        from: RoomId,
        to: RoomId,
        points: Vec<Vec3>,
        margin: f32,
    ) -> Result<PortalId> {
        self.graph.check_room(from)?;
        self.graph.check_room(to)?;
        if from == to {
            return Err(Error::SelfLinkedPortal(from.0));
        }
        if points.len() < 3 {
            return Err(Error::TooFewPortalPoints(points.len()));
        }

        let normal = newell_normal(&points);
        if normal.length() < PLANE_EPSILON {
            return Err(Error::DegeneratePortal);
        }

        let center = points.iter().copied().sum::<Vec3>() / points.len() as f32;
        let mut plane = Plane::from_point_normal(center, normal).ok_or(Error::DegeneratePortal)?;

        if let Some(bounds) = &self.graph.rooms[from.index()].aabb {
            if plane.is_point_outside(bounds.center()) {
                plane = plane.flipped();
            }
        }

        let id = PortalId(self.graph.portals.len() as u32);
        self.graph.portals.push(Portal {
            id,
            points,
            plane,
            center,
            margin,
            active: true,
            linked_rooms: [from, to],
        });
        self.graph.rooms[from.index()].portal_ids.push(id);
        self.graph.rooms[to.index()].portal_ids.push(id);
        Ok(id)
    }

    pub fn add_roamer(
        &mut self,
        room: RoomId,
        aabb: Aabb,
        handle: InstanceHandle,
    ) -> Result<RoamerId> {
        self.graph.create_roamer(aabb, handle, Some(room))
    }

    /// Add a sphere occluder, seen by traces passing through `room`
    pub fn add_occluder_sphere(&mut self, room: RoomId, center: Vec3, radius: f32) -> Result<OccluderId> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::DegenerateOccluder);
        }
        self.push_occluder(room, OccluderShape::Sphere { center, radius })
    }

    /// Add a convex polygon occluder, seen by traces passing through `room`
    pub fn add_occluder_poly(&mut self, room: RoomId, points: Vec<Vec3>) -> Result<OccluderId> {
        if points.len() < 3 {
            return Err(Error::DegenerateOccluder);
        }
        let normal = newell_normal(&points);
        let area = normal.length() * 0.5;
        let center = points.iter().copied().sum::<Vec3>() / points.len() as f32;
        let plane = Plane::from_point_normal(center, normal).ok_or(Error::DegenerateOccluder)?;
        self.push_occluder(room, OccluderShape::Poly { points, plane, center, area })
    }

    fn push_occluder(&mut self, room: RoomId, shape: OccluderShape) -> Result<OccluderId> {
        self.graph.check_room(room)?;
        let id = OccluderId(self.graph.occluders.len() as u32);
        self.graph.occluders.push(Occluder { id, shape, room, active: true });
        self.graph.rooms[room.index()].occluder_ids.push(id);
        Ok(id)
    }

    pub fn add_global(&mut self, aabb: Aabb, handle: InstanceHandle, layer_mask: u32) {
        self.graph.globals.push(GlobalInstance { aabb, handle, layer_mask });
    }

    pub fn build(self) -> RoomGraph {
        log::debug!(
            "Built room graph: {} rooms, {} portals, {} statics, {} roamers, {} globals, {} occluders",
            self.graph.rooms.len(),
            self.graph.portals.len(),
            self.graph.statics.len(),
            self.graph.roamers.len(),
            self.graph.globals.len(),
            self.graph.occluders.len(),
        );
        self.graph
    }

    /// Build and attach a PVS that covers rooms up to `max_depth` hops out
    /// (see [`Pvs::build`]). Portal traces only prune with it inside that
    /// horizon, so a small depth never hides rooms a trace can reach.
    pub fn build_with_pvs(self, max_depth: usize) -> RoomGraph {
        let mut graph = self.build();
        let pvs = Pvs::build(&graph, max_depth);
        graph.set_pvs(Some(pvs));
        graph
    }
}

/// Polygon normal by Newell's method, robust to slightly non-planar loops.
/// Its length is twice the polygon area.
fn newell_normal(points: &[Vec3]) -> Vec3 {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .fold(Vec3::ZERO, |n, (a, b)| n + a.cross(*b))
}
