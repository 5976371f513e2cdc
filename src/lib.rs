//! Roomcull - rooms and portals visibility culling
//!
//! A [`RoomGraph`](rooms::RoomGraph) describes rooms, the portals joining them
//! and the objects inside them. A [`PortalTracer`](tracer::PortalTracer) walks
//! that graph from a viewer position and reports which statics and roamers
//! are potentially visible.

pub mod core;
pub mod math;
pub mod rooms;
pub mod tracer;
