//! Portal Tracer - recursive room visibility through portals
//!
//! Starting from the viewer's room, the trace culls that room's statics and
//! roamers against the view planes, then looks through each open portal the
//! viewer is behind. Every portal passed narrows the clip volume: parent
//! planes that cut the portal are kept, and a new plane is added through the
//! viewer and each portal edge. The trace recurses into the room behind with
//! the narrowed volume.
//!
//! - Rooms on the current path are stamped with the trace tick, so cyclic
//!   graphs terminate without clearing a visited set every frame
//! - The stamp is per path, not per trace: a room reached through two portal
//!   paths is entered again on the same tick and culled through both volumes
//! - Statics and roamers are deduplicated by the result's bit sets
//! - Each room's occluders are prepared on entry and hide the portals and
//!   objects behind them

use crate::core::types::{Mat4, Vec3};
use crate::math::{Aabb, Plane};
use crate::rooms::pvs::PVS_VISIBLE;
use crate::rooms::{ClipResult, InstanceHandle, Portal, PortalId, Room, RoomGraph, RoomId};

use super::config::{CullMode, TracerConfig};
use super::occlusion::PortalOcclusionCuller;
use super::planes_pool::PlanesPool;
use super::result::TraceResult;
use super::scissor::ScreenRect;

/// Warnings logged at most once per tracer, so a bad level does not flood the log
#[derive(Default)]
struct Warnings {
    depth_limit: bool,
    pool_empty: bool,
    missing_pvs: bool,
}

/// Scratch state reused across traces
#[derive(Default)]
struct Scratch {
    planes_pool: PlanesPool,
    /// Per room: tick of the trace that currently has it on its path
    room_ticks: Vec<u64>,
    occlusion: PortalOcclusionCuller,
    warnings: Warnings,
}

impl Scratch {
    fn prepare(&mut self, graph: &RoomGraph, config: &TracerConfig) {
        if self.room_ticks.len() < graph.num_rooms() {
            self.room_ticks.resize(graph.num_rooms(), 0);
        }
        self.occlusion.clear();
        self.occlusion
            .set_limits(config.max_occluder_spheres, config.max_occluder_polys);
    }
}

/// Finds the statics and roamers visible from a point in a room graph.
///
/// One tracer per camera. The tracer owns no graph data, only reusable
/// scratch buffers and the tick counter.
pub struct PortalTracer {
    config: TracerConfig,
    scratch: Scratch,
    /// Decompressed PVS of the current source room, one byte per room
    pvs_table: Vec<u8>,
    tick: u64,
}

impl Default for PortalTracer {
    fn default() -> Self {
        Self::new(TracerConfig::default())
    }
}

impl PortalTracer {
    pub fn new(config: TracerConfig) -> Self {
        Self {
            config,
            scratch: Scratch::default(),
            pvs_table: Vec::new(),
            tick: 0,
        }
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: TracerConfig) {
        self.config = config;
    }

    /// Number of traces run so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Run whichever trace the config selects.
    ///
    /// `debug_sprawl` wins over `mode`; the camera matrix is only used when
    /// `use_scissor` is set.
    pub fn cull(
        &mut self,
        graph: &RoomGraph,
        origin: Vec3,
        camera: Option<&Mat4>,
        planes: &[Plane],
        start_room: RoomId,
        result: &mut TraceResult,
    ) {
        if self.config.debug_sprawl {
            self.trace_debug_sprawl(graph, start_room, result);
            return;
        }
        match self.config.mode {
            CullMode::Portals => {
                let xform = camera.filter(|_| self.config.use_scissor);
                self.trace(graph, origin, xform, planes, start_room, result);
            }
            CullMode::Pvs => self.trace_pvs(graph, planes, start_room, result),
        }
    }

    /// Trace statics and roamers visible from `origin` through portals.
    ///
    /// `planes` are the view planes: near, far, then the side planes (the
    /// layout [`Frustum`](crate::math::Frustum) produces). Near and far are
    /// tested against objects but never used to clip portals, since the
    /// viewer may be standing in a doorway.
    ///
    /// With `xform` (view-projection) set, each traversed portal also gets a
    /// screen rect in `result.xportal_rects`.
    ///
    /// `result` is not cleared first.
    pub fn trace(
        &mut self,
        graph: &RoomGraph,
        origin: Vec3,
        xform: Option<&Mat4>,
        planes: &[Plane],
        start_room: RoomId,
        result: &mut TraceResult,
    ) {
        if !self.begin(graph, start_room, result) {
            return;
        }
        let (near_far, side_planes) = split_view_planes(planes);

        let use_pvs = self.config.prune_with_pvs
            && graph
                .pvs()
                .is_some_and(|pvs| pvs.decompress(start_room, graph.num_rooms(), &mut self.pvs_table));
        // a depth-bounded PVS knows nothing about rooms past its horizon
        let pvs_horizon = graph
            .pvs()
            .and_then(|pvs| pvs.horizon())
            .unwrap_or(usize::MAX);

        let Some(pool_id) = self.scratch.planes_pool.request() else {
            return;
        };
        let mut start_planes = std::mem::take(self.scratch.planes_pool.get(pool_id));
        start_planes.clear();
        start_planes.extend_from_slice(side_planes);

        let mut ctx = TraceContext {
            graph,
            result: &mut *result,
            scratch: &mut self.scratch,
            tick: self.tick,
            origin,
            near_far,
            xform,
            pvs: use_pvs.then_some(self.pvs_table.as_slice()),
            pvs_horizon,
            use_occlusion: self.config.use_occlusion,
            depth_limit: self.config.effective_depth_limit(),
            rooms_entered: 0,
        };
        ctx.trace_recursive(0, start_room, &start_planes, 0);
        let rooms_entered = ctx.rooms_entered;

        *self.scratch.planes_pool.get(pool_id) = start_planes;
        self.scratch.planes_pool.free(pool_id);

        log::debug!(
            "Portal trace {} from room {}: {} rooms entered, {} statics, {} roamers",
            self.tick,
            start_room.0,
            rooms_entered,
            result.visible_static_ids.len(),
            result.visible_roamer_pool_ids.len()
        );
    }

    /// Cull every room in the source room's PVS against the unclipped view planes.
    ///
    /// Cheaper than [`trace`](Self::trace) but looser: there is no portal
    /// narrowing and, with no viewer position, no occlusion culling. Without
    /// PVS data only the source room is culled.
    pub fn trace_pvs(
        &mut self,
        graph: &RoomGraph,
        planes: &[Plane],
        source_room: RoomId,
        result: &mut TraceResult,
    ) {
        if !self.begin(graph, source_room, result) {
            return;
        }
        let (near_far, side_planes) = split_view_planes(planes);

        let has_pvs = graph
            .pvs()
            .is_some_and(|pvs| pvs.decompress(source_room, graph.num_rooms(), &mut self.pvs_table));
        if !has_pvs {
            if !self.scratch.warnings.missing_pvs {
                log::warn!("PVS cull requested for room {} without PVS data, culling that room only", source_room.0);
                self.scratch.warnings.missing_pvs = true;
            }
            self.pvs_table.clear();
            self.pvs_table.resize(graph.num_rooms(), 0);
            self.pvs_table[source_room.index()] = PVS_VISIBLE;
        }

        let mut ctx = TraceContext {
            graph,
            result: &mut *result,
            scratch: &mut self.scratch,
            tick: self.tick,
            origin: Vec3::ZERO,
            near_far,
            xform: None,
            pvs: None,
            pvs_horizon: usize::MAX,
            use_occlusion: false,
            depth_limit: 0,
            rooms_entered: 0,
        };
        for (room, visible) in graph.rooms().iter().zip(&self.pvs_table) {
            if *visible == 0 {
                continue;
            }
            ctx.rooms_entered += 1;
            ctx.cull_statics(room, side_planes, 0);
            ctx.cull_roamers(room, side_planes);
        }
        let rooms_entered = ctx.rooms_entered;

        log::debug!(
            "PVS trace {} from room {}: {} rooms culled, {} statics, {} roamers",
            self.tick,
            source_room.0,
            rooms_entered,
            result.visible_static_ids.len(),
            result.visible_roamer_pool_ids.len()
        );
    }

    /// Debug view: every static reachable through open portals, no clipping.
    ///
    /// Shows which statics sprawl into which rooms regardless of where the
    /// camera looks. Roamers are not reported.
    pub fn trace_debug_sprawl(
        &mut self,
        graph: &RoomGraph,
        start_room: RoomId,
        result: &mut TraceResult,
    ) {
        if !self.begin(graph, start_room, result) {
            return;
        }

        let mut ctx = TraceContext {
            graph,
            result: &mut *result,
            scratch: &mut self.scratch,
            tick: self.tick,
            origin: Vec3::ZERO,
            near_far: [None, None],
            xform: None,
            pvs: None,
            pvs_horizon: usize::MAX,
            use_occlusion: false,
            depth_limit: self.config.effective_depth_limit(),
            rooms_entered: 0,
        };
        ctx.trace_debug_sprawl_recursive(0, start_room);
        let rooms_entered = ctx.rooms_entered;

        log::debug!(
            "Sprawl trace {} from room {}: {} rooms, {} statics",
            self.tick,
            start_room.0,
            rooms_entered,
            result.visible_static_ids.len()
        );
    }

    /// Cull instances that live outside the room graph.
    ///
    /// Handles of globals whose layer mask overlaps `mask` and whose bounds
    /// are not outside any of `planes` are written to `out` from index
    /// `first`. Writing stops at `max` (or the end of `out`). Returns the
    /// index one past the last entry written.
    pub fn trace_globals(
        &self,
        graph: &RoomGraph,
        planes: &[Plane],
        out: &mut [InstanceHandle],
        first: usize,
        max: usize,
        mask: u32,
    ) -> usize {
        let limit = max.min(out.len());
        let mut current = first;
        if current >= limit {
            return current;
        }

        for global in graph.globals() {
            if global.layer_mask & mask == 0 || is_aabb_outside(&global.aabb, planes) {
                continue;
            }
            out[current] = global.handle;
            current += 1;
            if current >= limit {
                break;
            }
        }
        current
    }

    /// Shared setup for every trace. Returns false if the trace cannot start.
    fn begin(&mut self, graph: &RoomGraph, start_room: RoomId, result: &mut TraceResult) -> bool {
        // new trace, new tick, so nothing is hit twice
        self.tick += 1;
        self.scratch.planes_pool.reset();

        if graph.room(start_room).is_none() {
            log::warn!(
                "Trace start room {} does not exist ({} rooms)",
                start_room.0,
                graph.num_rooms()
            );
            return false;
        }
        self.scratch.prepare(graph, &self.config);

        if result.num_statics() < graph.num_statics() {
            log::warn!(
                "TraceResult sized for {} statics but graph has {}, recreating",
                result.num_statics(),
                graph.num_statics()
            );
            result.create(graph.num_statics());
        }
        if result.xportal_rects.is_empty() {
            result.xportal_rects.push(ScreenRect::FULL);
        }
        true
    }
}

/// Everything one trace needs, threaded through the recursion
struct TraceContext<'a> {
    graph: &'a RoomGraph,
    result: &'a mut TraceResult,
    scratch: &'a mut Scratch,
    tick: u64,
    origin: Vec3,
    /// Explicit near and far planes, tested against objects only
    near_far: [Option<Plane>; 2],
    xform: Option<&'a Mat4>,
    /// Decompressed PVS of the start room, when pruning with it
    pvs: Option<&'a [u8]>,
    /// Hops out to which the PVS is complete; rooms further away are never pruned
    pvs_horizon: usize,
    use_occlusion: bool,
    depth_limit: usize,
    rooms_entered: usize,
}

impl TraceContext<'_> {
    fn trace_recursive(&mut self, depth: usize, room_id: RoomId, planes: &[Plane], xportal_id: u16) {
        let graph = self.graph;
        let Some(room) = graph.room(room_id) else {
            debug_assert!(false, "portal leads to missing room {}", room_id.0);
            return;
        };
        log::trace!(
            "Trace {} entering room {} '{}' at depth {} with {} planes",
            self.tick,
            room_id.0,
            room.name,
            depth,
            planes.len()
        );
        self.rooms_entered += 1;

        let previous_tick = std::mem::replace(&mut self.scratch.room_ticks[room_id.index()], self.tick);

        self.prepare_occlusion(room, planes);
        self.cull_statics(room, planes, xportal_id);
        self.cull_roamers(room, planes);

        for portal_id in &room.portal_ids {
            if self.trace_portal(depth, room, *portal_id, planes, xportal_id) {
                // the child room replaced the active occluders
                self.prepare_occlusion(room, planes);
            }
        }

        self.scratch.room_ticks[room_id.index()] = previous_tick;
    }

    fn prepare_occlusion(&mut self, room: &Room, planes: &[Plane]) {
        if self.use_occlusion {
            self.scratch.occlusion.prepare(
                self.graph,
                room,
                self.origin,
                planes,
                self.near_far[0].as_ref(),
            );
        }
    }

    /// Look through one portal of `room`. Returns true if the trace recursed
    /// into the room behind it.
    fn trace_portal(
        &mut self,
        depth: usize,
        room: &Room,
        portal_id: PortalId,
        planes: &[Plane],
        xportal_id: u16,
    ) -> bool {
        let graph = self.graph;
        let Some(portal) = graph.portal(portal_id) else {
            debug_assert!(false, "room {} lists missing portal {}", room.id.0, portal_id.0);
            return false;
        };

        // portals can be switched on and off at runtime, like doors
        if !portal.active {
            return false;
        }

        let Some((linked_room, outgoing)) = portal.other_side(room.id) else {
            debug_assert!(false, "portal {} is not linked to room {}", portal_id.0, room.id.0);
            return false;
        };

        // already on the current path (cycle), or not a valid room
        if self
            .scratch
            .room_ticks
            .get(linked_room.index())
            .is_none_or(|t| *t == self.tick)
        {
            return false;
        }

        // the linked room is depth + 1 hops out, so only trust a PVS "hidden"
        // within its horizon
        if let Some(pvs) = self.pvs {
            if depth < self.pvs_horizon && pvs.get(linked_room.index()).is_none_or(|v| *v == 0) {
                return false;
            }
        }

        // the viewer has to be behind the portal plane to see through it
        let mut dist_cam = portal.plane.distance_to_point(self.origin);
        if !outgoing {
            dist_cam = -dist_cam;
        }
        if dist_cam >= 0.0 {
            return false;
        }

        if depth + 1 > self.depth_limit {
            if !self.scratch.warnings.depth_limit {
                log::warn!(
                    "Portal depth limit {} reached (seeing through too many portals)",
                    self.depth_limit
                );
                self.scratch.warnings.depth_limit = true;
            }
            return false;
        }

        if self.use_occlusion {
            let radius = portal
                .points
                .iter()
                .map(|p| p.distance(portal.center))
                .fold(0.0, f32::max);
            if self.scratch.occlusion.cull_sphere(portal.center, radius) {
                return false;
            }
        }

        let Some(pool_id) = self.scratch.planes_pool.request() else {
            debug_assert!(false, "planes pool exhausted at depth {}", depth);
            if !self.scratch.warnings.pool_empty {
                log::warn!("Planes pool is empty, not tracing through portal {}", portal_id.0);
                self.scratch.warnings.pool_empty = true;
            }
            return false;
        };
        let mut new_planes = std::mem::take(self.scratch.planes_pool.get(pool_id));
        new_planes.clear();

        // keep the planes that cut the portal, drop those that contain it
        let mut culled = false;
        for plane in planes {
            match portal.clip_with_plane(plane) {
                ClipResult::Outside => {
                    culled = true;
                    break;
                }
                ClipResult::Partial => new_planes.push(*plane),
                ClipResult::Inside => {}
            }
        }

        let recursed = !culled && portal.add_planes(self.origin, &mut new_planes) > 0;
        if recursed {
            let child_xportal = self.create_xportal(portal, xportal_id);
            self.trace_recursive(depth + 1, linked_room, &new_planes, child_xportal);
        }

        *self.scratch.planes_pool.get(pool_id) = new_planes;
        self.scratch.planes_pool.free(pool_id);
        recursed
    }

    /// Record the screen rect of a portal, clipped to its parent's rect.
    /// Returns the new xportal id, or 0 when there is no camera matrix.
    fn create_xportal(&mut self, portal: &Portal, parent_id: u16) -> u16 {
        let Some(xform) = self.xform else {
            return 0;
        };
        let rects = &mut self.result.xportal_rects;
        if rects.len() > u16::MAX as usize {
            return parent_id;
        }
        let parent = rects.get(parent_id as usize).copied().unwrap_or(ScreenRect::FULL);

        let rect = match ScreenRect::from_projected_points(xform, &portal.points) {
            Some(rect) => rect.intersection(&parent),
            // straddles the camera plane
            None => parent,
        };
        rects.push(rect);
        (rects.len() - 1) as u16
    }

    fn cull_statics(&mut self, room: &Room, planes: &[Plane], xportal_id: u16) {
        let graph = self.graph;
        for static_id in &room.static_ids {
            let Some(stat) = graph.static_object(*static_id) else {
                continue;
            };
            if !self.test_cull_inside(&stat.aabb, planes) {
                continue;
            }

            let index = static_id.index();
            if self.result.add_static(*static_id) {
                if let Some(x) = self.result.static_xportal_ids.get_mut(index) {
                    *x = xportal_id;
                }
            } else if let Some(x) = self.result.static_xportal_ids.get_mut(index) {
                // seen through more than one portal, no single scissor fits
                if *x != xportal_id {
                    *x = 0;
                }
            }
        }
    }

    fn cull_roamers(&mut self, room: &Room, planes: &[Plane]) {
        let graph = self.graph;
        for roamer_id in &room.roamer_ids {
            if self.result.is_roamer_visible(*roamer_id) {
                continue;
            }
            let Some(roamer) = graph.roamer(*roamer_id) else {
                continue;
            };
            if self.test_cull_inside(&roamer.aabb, planes) {
                self.result.add_roamer(*roamer_id);
            }
        }
    }

    fn trace_debug_sprawl_recursive(&mut self, depth: usize, room_id: RoomId) {
        let graph = self.graph;
        let Some(room) = graph.room(room_id) else {
            return;
        };
        // nothing narrows in a sprawl, so one visit per room is enough
        self.scratch.room_ticks[room_id.index()] = self.tick;
        self.rooms_entered += 1;

        self.cull_statics_debug_sprawl(room);

        if depth >= self.depth_limit {
            return;
        }
        for portal_id in &room.portal_ids {
            let Some(portal) = graph.portal(*portal_id) else {
                continue;
            };
            if !portal.active {
                continue;
            }
            let Some((linked_room, _)) = portal.other_side(room_id) else {
                continue;
            };
            if self
                .scratch
                .room_ticks
                .get(linked_room.index())
                .is_some_and(|t| *t != self.tick)
            {
                self.trace_debug_sprawl_recursive(depth + 1, linked_room);
            }
        }
    }

    fn cull_statics_debug_sprawl(&mut self, room: &Room) {
        for static_id in &room.static_ids {
            self.result.add_static(*static_id);
        }
    }

    /// False if the box is outside any clip plane or the explicit near/far
    /// planes, or hidden behind an occluder of the current room
    fn test_cull_inside(&self, aabb: &Aabb, planes: &[Plane]) -> bool {
        if is_aabb_outside(aabb, planes) {
            return false;
        }
        if self
            .near_far
            .iter()
            .flatten()
            .any(|p| aabb.project_range_in_plane(p).0 > 0.0)
        {
            return false;
        }
        !(self.use_occlusion && self.scratch.occlusion.cull_aabb(aabb))
    }
}

/// True if the box lies entirely outside at least one plane
fn is_aabb_outside(aabb: &Aabb, planes: &[Plane]) -> bool {
    planes.iter().any(|p| aabb.project_range_in_plane(p).0 > 0.0)
}

/// Split view planes into (near, far) and the side planes
fn split_view_planes(planes: &[Plane]) -> ([Option<Plane>; 2], &[Plane]) {
    match planes {
        [near, far, sides @ ..] => ([Some(*near), Some(*far)], sides),
        [near] => ([Some(*near), None], &[]),
        [] => ([None, None], &[]),
    }
}
