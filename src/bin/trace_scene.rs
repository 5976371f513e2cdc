//! Scene tracer binary - runs one visibility trace over a JSON scene.
//!
//! Usage: cargo run --release --bin trace_scene -- --scene <FILE> [OPTIONS]
//!
//! Options:
//!   --scene <FILE>     Scene description (JSON, required)
//!   --config <FILE>    Tracer config (JSON, default: built-in defaults)
//!   --pos <X,Y,Z>      Camera position (default: 0,0,0)
//!   --dir <X,Y,Z>      Camera forward direction (default: 0,0,-1)
//!   --fov <DEGREES>    Vertical field of view (default: 90)
//!   --far <METERS>     Far plane distance (default: 1000)
//!   --room <INDEX>     Start room (default: room containing the camera)

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use glam::Vec3;

use roomcull::math::Frustum;
use roomcull::math::plane::camera_view_projection;
use roomcull::rooms::{RoomGraph, RoomId, SceneDesc};
use roomcull::tracer::{PortalTracer, TraceResult, TracerConfig};

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(scene_path) = parse_str_arg(&args, "--scene").map(PathBuf::from) else {
        eprintln!("Usage: trace_scene --scene <FILE> [--config <FILE>] [--pos x,y,z] [--dir x,y,z] [--fov deg] [--far m] [--room n]");
        return ExitCode::FAILURE;
    };
    let position = parse_vec3_arg(&args, "--pos").unwrap_or(Vec3::ZERO);
    let forward = parse_vec3_arg(&args, "--dir").unwrap_or(Vec3::NEG_Z).normalize_or(Vec3::NEG_Z);
    let fov = parse_f32_arg(&args, "--fov").unwrap_or(90.0);
    let far = parse_f32_arg(&args, "--far").unwrap_or(1000.0);

    let config = match parse_str_arg(&args, "--config") {
        Some(path) => match TracerConfig::load(&PathBuf::from(path)) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load tracer config: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => TracerConfig::default(),
    };

    let graph = match SceneDesc::load(&scene_path).and_then(|desc| RoomGraph::from_desc(&desc)) {
        Ok(graph) => graph,
        Err(e) => {
            log::error!("Failed to load scene {}: {}", scene_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let start_room = match parse_u32_arg(&args, "--room") {
        Some(index) => RoomId(index),
        None => match graph.find_room_within(position, None) {
            Some(room) => room,
            None => {
                log::error!("Scene has no rooms");
                return ExitCode::FAILURE;
            }
        },
    };
    // up must not be parallel to forward
    let up = if forward.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
    let view_proj = camera_view_projection(position, forward, up, fov.to_radians(), 1.0, 0.1, far);
    let frustum = Frustum::from_view_projection(&view_proj);

    println!("=== Room Trace ===");
    println!("Scene:  {}", scene_path.display());
    println!(
        "Rooms:  {}, portals: {}, statics: {}, occluders: {}",
        graph.num_rooms(),
        graph.num_portals(),
        graph.num_statics(),
        graph.occluders().len()
    );
    println!("Camera: {:?} looking {:?}, fov {}", position, forward, fov);
    println!("Start:  room {}", start_room.0);
    println!("Mode:   {:?}{}", config.mode, if config.debug_sprawl { " (debug sprawl)" } else { "" });
    println!();

    let mut tracer = PortalTracer::new(config);
    let mut result = TraceResult::new(graph.num_statics());

    let start = Instant::now();
    tracer.cull(&graph, position, Some(&view_proj), frustum.as_slice(), start_room, &mut result);
    let elapsed = start.elapsed();

    let statics: Vec<u32> = result.visible_static_ids.iter().map(|id| id.0).collect();
    let roamers: Vec<u32> = result.visible_roamer_pool_ids.iter().map(|id| id.0).collect();
    println!("Visible statics ({}): {:?}", statics.len(), statics);
    println!("Visible roamers ({}): {:?}", roamers.len(), roamers);
    if result.xportal_rects.len() > 1 {
        println!("Portal rects:");
        for (i, rect) in result.xportal_rects.iter().enumerate().skip(1) {
            println!("  {}: {:?}", i, rect.to_pixels(1920, 1080));
        }
    }
    println!();
    println!("Trace took {:.1}us", elapsed.as_secs_f64() * 1e6);

    ExitCode::SUCCESS
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_vec3_arg(args: &[String], flag: &str) -> Option<Vec3> {
    let s = parse_str_arg(args, flag)?;
    let parts: Vec<f32> = s.split(',').filter_map(|p| p.trim().parse().ok()).collect();
    match parts.as_slice() {
        [x, y, z] => Some(Vec3::new(*x, *y, *z)),
        _ => None,
    }
}
