//! Portal visibility tracing
//!
//! [`PortalTracer`] walks a [`RoomGraph`](crate::rooms::RoomGraph) outward
//! from the viewer's room, narrowing the clip volume at every portal, and
//! fills a [`TraceResult`] with the statics and roamers that may be visible.

pub mod planes_pool;
pub mod result;
pub mod scissor;
pub mod config;
pub mod occlusion;
pub mod portal_tracer;

pub use planes_pool::{PlanesPool, PoolId, POOL_MAX};
pub use result::TraceResult;
pub use scissor::ScreenRect;
pub use config::{CullMode, TracerConfig};
pub use occlusion::PortalOcclusionCuller;
pub use portal_tracer::PortalTracer;
