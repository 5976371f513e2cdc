//! JSON scene description for room graphs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::{Result, Vec3};
use crate::math::Aabb;

use super::builder::RoomGraphBuilder;
use super::graph::{InstanceHandle, PortalId, RoomGraph, RoomId, StaticId};

/// Min/max corners of a bounding box
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundsDesc {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundsDesc {
    pub fn to_aabb(&self) -> Aabb {
        Aabb::new(Vec3::from_array(self.min), Vec3::from_array(self.max))
    }
}

impl From<Aabb> for BoundsDesc {
    fn from(aabb: Aabb) -> Self {
        Self { min: aabb.min.to_array(), max: aabb.max.to_array() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticDesc {
    pub bounds: BoundsDesc,
    pub handle: u32,
    /// Extra rooms (by index) this static extends into
    #[serde(default)]
    pub sprawl: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomDesc {
    pub name: String,
    #[serde(default)]
    pub bounds: Option<BoundsDesc>,
    #[serde(default)]
    pub statics: Vec<StaticDesc>,
    #[serde(default)]
    pub occluders: Vec<OccluderDesc>,
}

/// Occluder geometry, tagged by `"type"` in JSON
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OccluderDesc {
    Sphere { center: [f32; 3], radius: f32 },
    Poly { points: Vec<[f32; 3]> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortalDesc {
    pub from: u32,
    pub to: u32,
    pub points: Vec<[f32; 3]>,
    #[serde(default)]
    pub margin: f32,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoamerDesc {
    pub room: u32,
    pub bounds: BoundsDesc,
    pub handle: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalDesc {
    pub bounds: BoundsDesc,
    pub handle: u32,
    #[serde(default = "default_layer_mask")]
    pub layer_mask: u32,
}

fn default_active() -> bool {
    true
}

fn default_layer_mask() -> u32 {
    1
}

/// Serializable description of a whole room graph
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDesc {
    pub rooms: Vec<RoomDesc>,
    #[serde(default)]
    pub portals: Vec<PortalDesc>,
    #[serde(default)]
    pub roamers: Vec<RoamerDesc>,
    #[serde(default)]
    pub globals: Vec<GlobalDesc>,
    /// Build a PVS of this depth when loading
    #[serde(default)]
    pub pvs_depth: Option<usize>,
}

impl SceneDesc {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl RoomGraph {
    /// Build a graph from a scene description, validating every reference
    pub fn from_desc(desc: &SceneDesc) -> Result<RoomGraph> {
        let mut builder = RoomGraphBuilder::new();

        for room in &desc.rooms {
            builder.add_room(room.name.clone(), room.bounds.map(|b| b.to_aabb()));
        }

        let mut sprawls: Vec<(StaticId, u32)> = Vec::new();
        for (room_index, room) in desc.rooms.iter().enumerate() {
            let room_id = RoomId(room_index as u32);
            for occluder in &room.occluders {
                match occluder {
                    OccluderDesc::Sphere { center, radius } => {
                        builder.add_occluder_sphere(room_id, Vec3::from_array(*center), *radius)?;
                    }
                    OccluderDesc::Poly { points } => {
                        let points = points.iter().map(|p| Vec3::from_array(*p)).collect();
                        builder.add_occluder_poly(room_id, points)?;
                    }
                }
            }
            for stat in &room.statics {
                let id = builder.add_static(
                    room_id,
                    stat.bounds.to_aabb(),
                    InstanceHandle(stat.handle),
                )?;
                sprawls.extend(stat.sprawl.iter().map(|r| (id, *r)));
            }
        }
        for (id, room) in sprawls {
            builder.sprawl_static(id, RoomId(room))?;
        }

        let mut closed: Vec<PortalId> = Vec::new();
        for portal in &desc.portals {
            let points = portal.points.iter().map(|p| Vec3::from_array(*p)).collect();
            let id = builder.add_portal(RoomId(portal.from), RoomId(portal.to), points, portal.margin)?;
            if !portal.active {
                closed.push(id);
            }
        }

        for roamer in &desc.roamers {
            builder.add_roamer(
                RoomId(roamer.room),
                roamer.bounds.to_aabb(),
                InstanceHandle(roamer.handle),
            )?;
        }

        for global in &desc.globals {
            builder.add_global(global.bounds.to_aabb(), InstanceHandle(global.handle), global.layer_mask);
        }

        let mut graph = match desc.pvs_depth {
            Some(depth) => builder.build_with_pvs(depth),
            None => builder.build(),
        };
        for id in closed {
            graph.set_portal_active(id, false)?;
        }

        log::info!(
            "Loaded scene: {} rooms, {} portals, {} statics, {} occluders",
            graph.num_rooms(),
            graph.num_portals(),
            graph.num_statics(),
            graph.occluders().len()
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use tempfile::TempDir;

    fn bounds(min: [f32; 3], max: [f32; 3]) -> BoundsDesc {
        BoundsDesc { min, max }
    }

    fn two_room_desc() -> SceneDesc {
        SceneDesc {
            rooms: vec![
                RoomDesc {
                    name: "hall".into(),
                    bounds: Some(bounds([-5.0, -5.0, -5.0], [5.0, 5.0, 5.0])),
                    statics: vec![StaticDesc {
                        bounds: bounds([-1.0, -1.0, -3.0], [1.0, 1.0, -2.0]),
                        handle: 10,
                        sprawl: vec![1],
                    }],
                    occluders: vec![OccluderDesc::Sphere { center: [0.0, 0.0, -4.0], radius: 0.5 }],
                },
                RoomDesc {
                    name: "vault".into(),
                    bounds: Some(bounds([-5.0, -5.0, -15.0], [5.0, 5.0, -5.0])),
                    statics: Vec::new(),
                    occluders: vec![OccluderDesc::Poly {
                        points: vec![[-1.0, -1.0, -8.0], [1.0, -1.0, -8.0], [0.0, 1.0, -8.0]],
                    }],
                },
            ],
            portals: vec![PortalDesc {
                from: 0,
                to: 1,
                points: vec![
                    [-1.0, -1.0, -5.0],
                    [1.0, -1.0, -5.0],
                    [1.0, 1.0, -5.0],
                    [-1.0, 1.0, -5.0],
                ],
                margin: 0.0,
                active: false,
            }],
            roamers: vec![RoamerDesc {
                room: 1,
                bounds: bounds([0.0, 0.0, -10.0], [1.0, 1.0, -9.0]),
                handle: 20,
            }],
            globals: vec![GlobalDesc {
                bounds: bounds([0.0; 3], [1.0; 3]),
                handle: 30,
                layer_mask: 1,
            }],
            pvs_depth: Some(4),
        }
    }

    #[test]
    fn test_from_desc() {
        let graph = RoomGraph::from_desc(&two_room_desc()).unwrap();
        assert_eq!(graph.num_rooms(), 2);
        assert_eq!(graph.num_statics(), 1);
        assert_eq!(graph.room(RoomId(1)).unwrap().static_ids, vec![StaticId(0)]);
        assert!(!graph.portal(PortalId(0)).unwrap().active);
        assert_eq!(graph.roamers().len(), 1);
        assert_eq!(graph.globals().len(), 1);
        assert_eq!(graph.pvs().unwrap().num_rooms(), 2);
        assert_eq!(graph.occluders().len(), 2);
        assert_eq!(graph.room(RoomId(1)).unwrap().occluder_ids, vec![crate::rooms::OccluderId(1)]);
    }

    #[test]
    fn test_from_desc_rejects_bad_room() {
        let mut desc = two_room_desc();
        desc.portals[0].to = 9;
        assert!(matches!(RoomGraph::from_desc(&desc), Err(Error::InvalidRoom(9))));
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{
            "rooms": [{ "name": "solo" }],
            "globals": [{ "bounds": { "min": [0, 0, 0], "max": [1, 1, 1] }, "handle": 4 }]
        }"#;
        let desc: SceneDesc = serde_json::from_str(json).unwrap();
        assert!(desc.rooms[0].statics.is_empty());
        assert!(desc.rooms[0].occluders.is_empty());
        assert!(desc.portals.is_empty());
        assert_eq!(desc.globals[0].layer_mask, 1);
        assert_eq!(desc.pvs_depth, None);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("scenes/two_rooms.json");
        let desc = two_room_desc();
        desc.save(&path).expect("save failed");
        let loaded = SceneDesc::load(&path).expect("load failed");
        assert_eq!(loaded, desc);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let result = SceneDesc::load(&temp_dir.path().join("nope.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_occluder_json() {
        let json = r#"{
            "rooms": [{
                "name": "yard",
                "occluders": [
                    { "type": "sphere", "center": [0, 0, -3], "radius": 1.5 },
                    { "type": "poly", "points": [[0, 0, -6], [1, 0, -6], [0, 1, -6]] }
                ]
            }]
        }"#;
        let desc: SceneDesc = serde_json::from_str(json).unwrap();
        assert_eq!(
            desc.rooms[0].occluders[0],
            OccluderDesc::Sphere { center: [0.0, 0.0, -3.0], radius: 1.5 }
        );
        let graph = RoomGraph::from_desc(&desc).unwrap();
        assert_eq!(graph.occluders().len(), 2);
    }
}
