//! Room and portal graph
//!
//! The graph is built once (by [`RoomGraphBuilder`] or from a [`SceneDesc`])
//! and then read by the tracer every frame. Between traces the owner may
//! toggle portals, move roamers and update dynamic static bounds.

pub mod graph;
pub mod builder;
pub mod pvs;
pub mod scene;

pub use graph::{
    ClipResult, GlobalInstance, InstanceHandle, Occluder, OccluderId, OccluderShape, Portal,
    PortalId, Roamer, RoamerId, RoamerPool, Room, RoomGraph, RoomId, StaticId, StaticObject,
};
pub use builder::RoomGraphBuilder;
pub use pvs::Pvs;
pub use scene::{OccluderDesc, SceneDesc};
