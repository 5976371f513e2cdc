//! Room graph data model: rooms, portals, statics, roamers and globals.

use crate::core::types::{Result, Vec3};
use crate::core::Error;
use crate::math::{Aabb, Plane};

use super::pvs::Pvs;

/// Index of a room in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub u32);

/// Global static index, shared by every room the static sprawls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StaticId(pub u32);

/// Index of a portal in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortalId(pub u32);

/// Slot in the roamer pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoamerId(pub u32);

/// Index of an occluder in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OccluderId(pub u32);

/// Opaque handle into a renderer-owned instance table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InstanceHandle(pub u32);

macro_rules! impl_index {
    ($($ty:ident),*) => {
        $(impl $ty {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        })*
    };
}

impl_index!(RoomId, StaticId, PortalId, RoamerId, OccluderId);

/// A convex region holding statics, roamers and the portals leading out of it.
#[derive(Clone, Debug)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// Optional bounds, used for room lookup and portal orientation
    pub aabb: Option<Aabb>,
    /// Convex hull of the room (outward planes), may be empty
    pub bound_planes: Vec<Plane>,
    /// Statics placed in or sprawled into this room
    pub static_ids: Vec<StaticId>,
    /// Portals with this room on either side
    pub portal_ids: Vec<PortalId>,
    /// Roamers currently inside this room
    pub roamer_ids: Vec<RoamerId>,
    /// Occluders that hide things behind them when seen from this room
    pub occluder_ids: Vec<OccluderId>,
}

impl Room {
    pub(crate) fn new(id: RoomId, name: String, aabb: Option<Aabb>) -> Self {
        Self {
            id,
            name,
            aabb,
            bound_planes: Vec::new(),
            static_ids: Vec::new(),
            portal_ids: Vec::new(),
            roamer_ids: Vec::new(),
            occluder_ids: Vec::new(),
        }
    }

    /// Signed distance of a point from the room (negative = inside).
    ///
    /// Uses the hull planes when present, then the AABB. A room with
    /// neither is infinitely far from everything.
    pub fn is_point_within(&self, point: Vec3) -> f32 {
        if !self.bound_planes.is_empty() {
            return self
                .bound_planes
                .iter()
                .map(|p| p.distance_to_point(point))
                .fold(f32::NEG_INFINITY, f32::max);
        }
        match &self.aabb {
            Some(aabb) => aabb.signed_distance(point),
            None => f32::INFINITY,
        }
    }
}

/// Result of classifying a portal polygon against a clip plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipResult {
    /// Every vertex is inside the plane
    Inside,
    /// The plane cuts the polygon
    Partial,
    /// Every vertex is outside the plane
    Outside,
}

/// A polygonal opening between two rooms.
///
/// The plane normal points from `linked_rooms[0]` into `linked_rooms[1]`.
#[derive(Clone, Debug)]
pub struct Portal {
    pub id: PortalId,
    /// World space vertex loop
    pub points: Vec<Vec3>,
    pub plane: Plane,
    /// Centroid of `points`
    pub center: Vec3,
    /// Extra distance the polygon is treated as extending when clip testing
    pub margin: f32,
    /// Closed portals (e.g. shut doors) are never traversed
    pub active: bool,
    pub linked_rooms: [RoomId; 2],
}

impl Portal {
    /// The room on the far side of the portal when looking from `room`,
    /// and whether the portal is outgoing from `room`.
    ///
    /// Returns None if `room` is not linked to this portal.
    pub fn other_side(&self, room: RoomId) -> Option<(RoomId, bool)> {
        if self.linked_rooms[0] == room {
            Some((self.linked_rooms[1], true))
        } else if self.linked_rooms[1] == room {
            Some((self.linked_rooms[0], false))
        } else {
            None
        }
    }

    /// Classify the polygon against a clip plane.
    ///
    /// A vertex counts as outside when it lies at least `margin` beyond the plane.
    pub fn clip_with_plane(&self, plane: &Plane) -> ClipResult {
        let outside = self
            .points
            .iter()
            .filter(|p| plane.distance_to_point(**p) >= self.margin)
            .count();

        if outside == self.points.len() {
            ClipResult::Outside
        } else if outside == 0 {
            ClipResult::Inside
        } else {
            ClipResult::Partial
        }
    }

    /// Append the planes of the pyramid from `origin` through the polygon edges.
    ///
    /// Each plane faces away from the polygon centroid, so the pyramid
    /// interior is the view through the portal. Degenerate edges (collinear
    /// with the origin) are skipped. Returns the number of planes added.
    pub fn add_planes(&self, origin: Vec3, planes: &mut Vec<Plane>) -> usize {
        let count = self.points.len();
        let before = planes.len();

        for i in 0..count {
            let a = self.points[i];
            let b = self.points[(i + 1) % count];
            let Some(mut plane) = Plane::from_points(origin, a, b) else {
                continue;
            };
            if plane.is_point_outside(self.center) {
                plane = plane.flipped();
            }
            planes.push(plane);
        }

        planes.len() - before
    }
}

/// A static renderable, registered in its home room and any sprawl rooms.
#[derive(Clone, Debug)]
pub struct StaticObject {
    pub aabb: Aabb,
    pub handle: InstanceHandle,
    pub home_room: RoomId,
}

/// A dynamic object tracked in whichever room currently contains it.
#[derive(Clone, Debug)]
pub struct Roamer {
    pub aabb: Aabb,
    pub handle: InstanceHandle,
    pub room: Option<RoomId>,
}

/// Slot arena of roamers with LIFO slot reuse.
#[derive(Clone, Debug, Default)]
pub struct RoamerPool {
    slots: Vec<Option<Roamer>>,
    free_slots: Vec<u32>,
}

impl RoamerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a roamer, reusing the most recently freed slot
    pub fn insert(&mut self, roamer: Roamer) -> RoamerId {
        if let Some(slot) = self.free_slots.pop() {
            self.slots[slot as usize] = Some(roamer);
            RoamerId(slot)
        } else {
            self.slots.push(Some(roamer));
            RoamerId(self.slots.len() as u32 - 1)
        }
    }

    pub fn remove(&mut self, id: RoamerId) -> Option<Roamer> {
        let roamer = self.slots.get_mut(id.index())?.take()?;
        self.free_slots.push(id.0);
        Some(roamer)
    }

    pub fn get(&self, id: RoamerId) -> Option<&Roamer> {
        self.slots.get(id.index())?.as_ref()
    }

    pub fn get_mut(&mut self, id: RoamerId) -> Option<&mut Roamer> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Number of slots ever allocated (live or free)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live roamers
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (RoamerId, &Roamer)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|r| (RoamerId(i as u32), r)))
    }
}

/// Solid geometry that hides whatever is behind it.
#[derive(Clone, Debug, PartialEq)]
pub enum OccluderShape {
    Sphere { center: Vec3, radius: f32 },
    /// Convex polygon, occluding from either side
    Poly { points: Vec<Vec3>, plane: Plane, center: Vec3, area: f32 },
}

#[derive(Clone, Debug)]
pub struct Occluder {
    pub id: OccluderId,
    pub shape: OccluderShape,
    pub room: RoomId,
    pub active: bool,
}

/// An instance outside the room graph, culled only against the view planes.
#[derive(Clone, Debug)]
pub struct GlobalInstance {
    pub aabb: Aabb,
    pub handle: InstanceHandle,
    pub layer_mask: u32,
}

/// The full room/portal graph read by the tracer.
#[derive(Clone, Debug, Default)]
pub struct RoomGraph {
    pub(crate) rooms: Vec<Room>,
    pub(crate) portals: Vec<Portal>,
    pub(crate) statics: Vec<StaticObject>,
    pub(crate) roamers: RoamerPool,
    pub(crate) globals: Vec<GlobalInstance>,
    pub(crate) occluders: Vec<Occluder>,
    pub(crate) pvs: Option<Pvs>,
}

impl RoomGraph {
    pub fn num_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn num_portals(&self) -> usize {
        self.portals.len()
    }

    /// Total static count, the size a `TraceResult` static bit set needs
    pub fn num_statics(&self) -> usize {
        self.statics.len()
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.index())
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn portal(&self, id: PortalId) -> Option<&Portal> {
        self.portals.get(id.index())
    }

    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }

    pub fn static_object(&self, id: StaticId) -> Option<&StaticObject> {
        self.statics.get(id.index())
    }

    pub fn roamer(&self, id: RoamerId) -> Option<&Roamer> {
        self.roamers.get(id)
    }

    pub fn roamers(&self) -> &RoamerPool {
        &self.roamers
    }

    pub fn globals(&self) -> &[GlobalInstance] {
        &self.globals
    }

    pub fn occluder(&self, id: OccluderId) -> Option<&Occluder> {
        self.occluders.get(id.index())
    }

    pub fn occluders(&self) -> &[Occluder] {
        &self.occluders
    }

    pub fn pvs(&self) -> Option<&Pvs> {
        self.pvs.as_ref()
    }

    pub fn set_pvs(&mut self, pvs: Option<Pvs>) {
        self.pvs = pvs;
    }

    /// Open or close a portal
    pub fn set_portal_active(&mut self, id: PortalId, active: bool) -> Result<()> {
        let portal = self
            .portals
            .get_mut(id.index())
            .ok_or(Error::InvalidPortal(id.0))?;
        portal.active = active;
        Ok(())
    }

    /// Switch an occluder on or off (e.g. a wall that can be destroyed)
    pub fn set_occluder_active(&mut self, id: OccluderId, active: bool) -> Result<()> {
        let occluder = self
            .occluders
            .get_mut(id.index())
            .ok_or(Error::InvalidOccluder(id.0))?;
        occluder.active = active;
        Ok(())
    }

    /// Update the bounds of a static that moves without changing rooms
    pub fn set_static_aabb(&mut self, id: StaticId, aabb: Aabb) -> Result<()> {
        let stat = self
            .statics
            .get_mut(id.index())
            .ok_or(Error::InvalidStatic(id.0))?;
        stat.aabb = aabb;
        Ok(())
    }

    /// Add a roamer, optionally placing it in a room
    pub fn create_roamer(
        &mut self,
        aabb: Aabb,
        handle: InstanceHandle,
        room: Option<RoomId>,
    ) -> Result<RoamerId> {
        if let Some(room_id) = room {
            self.check_room(room_id)?;
        }
        let id = self.roamers.insert(Roamer { aabb, handle, room });
        if let Some(room_id) = room {
            self.rooms[room_id.index()].roamer_ids.push(id);
        }
        Ok(id)
    }

    /// Update a roamer's bounds and move it to `room` (None = outside all rooms)
    pub fn move_roamer(&mut self, id: RoamerId, aabb: Aabb, room: Option<RoomId>) -> Result<()> {
        if let Some(room_id) = room {
            self.check_room(room_id)?;
        }
        let roamer = self.roamers.get_mut(id).ok_or(Error::InvalidRoamer(id.0))?;
        roamer.aabb = aabb;
        let previous = roamer.room;
        if previous == room {
            return Ok(());
        }
        roamer.room = room;

        if let Some(old) = previous {
            self.rooms[old.index()].roamer_ids.retain(|r| *r != id);
        }
        if let Some(new) = room {
            self.rooms[new.index()].roamer_ids.push(id);
        }
        log::trace!("Roamer {} moved from {:?} to {:?}", id.0, previous, room);
        Ok(())
    }

    pub fn remove_roamer(&mut self, id: RoamerId) -> Result<()> {
        let roamer = self.roamers.remove(id).ok_or(Error::InvalidRoamer(id.0))?;
        if let Some(room) = roamer.room {
            self.rooms[room.index()].roamer_ids.retain(|r| *r != id);
        }
        Ok(())
    }

    /// Find the room containing `point`, or failing that the closest room.
    ///
    /// `previous` is checked first since objects rarely change room.
    pub fn find_room_within(&self, point: Vec3, previous: Option<RoomId>) -> Option<RoomId> {
        let mut closest = f32::INFINITY;
        let mut closest_room = None;

        if let Some(room) = previous.and_then(|id| self.room(id)) {
            closest = room.is_point_within(point);
            closest_room = Some(room.id);
            if closest < 0.0 {
                return closest_room;
            }
        }

        for room in &self.rooms {
            if Some(room.id) == previous {
                continue;
            }
            let dist = room.is_point_within(point);
            if dist < closest || closest_room.is_none() {
                closest = dist;
                closest_room = Some(room.id);
                if dist < 0.0 {
                    break;
                }
            }
        }

        closest_room
    }

    pub(crate) fn check_room(&self, id: RoomId) -> Result<()> {
        if id.index() < self.rooms.len() {
            Ok(())
        } else {
            Err(Error::InvalidRoom(id.0))
        }
    }
}
