//! Tracer configuration, owned by the host and loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Result;

use super::planes_pool::POOL_MAX;

/// How the tracer decides which rooms to cull
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullMode {
    /// Recursive portal clipping
    #[default]
    Portals,
    /// Precomputed PVS lookup, culled against the unclipped view planes
    Pvs,
}

/// Tracer settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    pub mode: CullMode,
    /// In portal mode, skip portals into rooms the PVS says are hidden.
    /// A PVS built to a fixed depth only prunes rooms within that depth.
    pub prune_with_pvs: bool,
    /// Compute screen rects for traversed portals (needs a camera matrix)
    pub use_scissor: bool,
    /// Replace the trace with an unclipped sprawl from the start room
    pub debug_sprawl: bool,
    /// Maximum number of portals to see through. Clamped to `POOL_MAX - 1`.
    pub depth_limit: usize,
    /// Cull portals and objects hidden behind room occluders
    pub use_occlusion: bool,
    /// Occluder spheres kept per room, best fit first. Clamped to 64.
    pub max_occluder_spheres: usize,
    /// Occluder polys kept per room. Clamped to 64.
    pub max_occluder_polys: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            mode: CullMode::Portals,
            prune_with_pvs: true,
            use_scissor: false,
            debug_sprawl: false,
            depth_limit: 16,
            use_occlusion: true,
            max_occluder_spheres: 8,
            max_occluder_polys: 8,
        }
    }
}

impl TracerConfig {
    /// Depth limit the planes pool can actually support
    pub fn effective_depth_limit(&self) -> usize {
        self.depth_limit.min(POOL_MAX - 1)
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = TracerConfig::default();
        assert_eq!(config.mode, CullMode::Portals);
        assert!(config.prune_with_pvs);
        assert_eq!(config.effective_depth_limit(), 16);
        assert!(config.use_occlusion);
        assert_eq!(config.max_occluder_spheres, 8);
    }

    #[test]
    fn test_depth_limit_clamped_to_pool() {
        let config = TracerConfig { depth_limit: 1000, ..Default::default() };
        assert_eq!(config.effective_depth_limit(), POOL_MAX - 1);
    }

    #[test]
    fn test_partial_json() {
        let config: TracerConfig = serde_json::from_str(r#"{ "mode": "pvs" }"#).unwrap();
        assert_eq!(config.mode, CullMode::Pvs);
        assert_eq!(config.depth_limit, 16);
        assert_eq!(config.max_occluder_polys, 8);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("tracer.json");
        let config = TracerConfig {
            mode: CullMode::Pvs,
            use_scissor: true,
            depth_limit: 4,
            ..Default::default()
        };
        config.save(&path).expect("save failed");
        assert_eq!(TracerConfig::load(&path).expect("load failed"), config);
    }
}
