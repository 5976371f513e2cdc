//! Potentially visible set: room-to-room visibility, precomputed.
//!
//! Stored compactly as one flat list of room ids with a (first, size) range
//! per source room. The tracer decompresses one source room at a time into a
//! byte-per-room table.
//!
//! A PVS built from portal connectivity only looks a fixed number of hops
//! out. Rooms further away than that horizon are unknown, not hidden.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::graph::{RoomGraph, RoomId};

/// Value written into a decompressed PVS table for visible rooms
pub const PVS_VISIBLE: u8 = 255;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PvsRange {
    first: u32,
    size: u32,
}

/// Room-granularity potentially visible set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pvs {
    room_ids: Vec<u32>,
    ranges: Vec<PvsRange>,
    /// Portal hops the lists are complete for, None = complete at any distance
    #[serde(default)]
    horizon: Option<u32>,
}

impl Pvs {
    /// Build from one visible-room list per source room.
    ///
    /// Lists are sorted and deduplicated, and trusted at any distance.
    pub fn from_lists(lists: Vec<Vec<RoomId>>) -> Self {
        let mut pvs = Pvs::default();
        for mut list in lists {
            list.sort_unstable();
            list.dedup();
            pvs.ranges.push(PvsRange {
                first: pvs.room_ids.len() as u32,
                size: list.len() as u32,
            });
            pvs.room_ids.extend(list.iter().map(|r| r.0));
        }
        pvs
    }

    /// PVS from portal connectivity, conservative out to `max_depth` hops.
    ///
    /// Every room reachable from the source within `max_depth` portal hops is
    /// flagged, whether or not the portals are currently active (doors may
    /// open later). The source room always sees itself. Rooms further out
    /// are not listed, so the PVS only rules out rooms within its
    /// [`horizon`](Self::horizon).
    pub fn build(graph: &RoomGraph, max_depth: usize) -> Self {
        let num_rooms = graph.num_rooms();
        let mut lists = Vec::with_capacity(num_rooms);
        let mut depth = vec![usize::MAX; num_rooms];
        let mut queue = VecDeque::new();

        for source in graph.rooms() {
            depth.fill(usize::MAX);
            queue.clear();

            depth[source.id.index()] = 0;
            queue.push_back(source.id);
            let mut visible = vec![source.id];

            while let Some(room_id) = queue.pop_front() {
                let d = depth[room_id.index()];
                if d >= max_depth {
                    continue;
                }
                let Some(room) = graph.room(room_id) else {
                    continue;
                };
                for portal_id in &room.portal_ids {
                    let Some((next, _)) = graph
                        .portal(*portal_id)
                        .and_then(|p| p.other_side(room_id))
                    else {
                        continue;
                    };
                    if depth.get(next.index()).is_some_and(|nd| *nd == usize::MAX) {
                        depth[next.index()] = d + 1;
                        visible.push(next);
                        queue.push_back(next);
                    }
                }
            }

            lists.push(visible);
        }

        let mut pvs = Self::from_lists(lists);
        pvs.horizon = Some(u32::try_from(max_depth).unwrap_or(u32::MAX));
        log::debug!(
            "Built PVS for {} rooms, {} entries (depth {})",
            num_rooms,
            pvs.room_ids.len(),
            max_depth
        );
        pvs
    }

    /// Hop distance up to which an unlisted room is known to be hidden.
    /// None means the lists hold at any distance.
    pub fn horizon(&self) -> Option<usize> {
        self.horizon.map(|h| h as usize)
    }

    /// Number of source rooms with PVS data
    pub fn num_rooms(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Rooms potentially visible from `source`, in ascending id order
    pub fn visible_rooms(&self, source: RoomId) -> impl Iterator<Item = RoomId> + '_ {
        let range = self.ranges.get(source.index()).copied().unwrap_or_default();
        let start = range.first as usize;
        let end = start + range.size as usize;
        self.room_ids
            .get(start..end)
            .unwrap_or(&[])
            .iter()
            .map(|r| RoomId(*r))
    }

    /// Decompress the PVS of `source` into a byte per room.
    ///
    /// `out` is resized to `num_rooms` and filled with 0 or [`PVS_VISIBLE`].
    /// Returns false (leaving every room hidden) if `source` has no data.
    pub fn decompress(&self, source: RoomId, num_rooms: usize, out: &mut Vec<u8>) -> bool {
        out.clear();
        out.resize(num_rooms, 0);

        if source.index() >= self.ranges.len() {
            return false;
        }
        for room in self.visible_rooms(source) {
            if let Some(byte) = out.get_mut(room.index()) {
                *byte = PVS_VISIBLE;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::rooms::RoomGraphBuilder;

    fn quad_at_x(x: f32) -> Vec<Vec3> {
        vec![
            Vec3::new(x, -1.0, -1.0),
            Vec3::new(x, -1.0, 1.0),
            Vec3::new(x, 1.0, 1.0),
            Vec3::new(x, 1.0, -1.0),
        ]
    }

    /// Four rooms in a line: 0 - 1 - 2 - 3
    fn corridor() -> RoomGraph {
        let mut builder = RoomGraphBuilder::new();
        let rooms: Vec<RoomId> = (0..4).map(|i| builder.add_room(format!("r{}", i), None)).collect();
        for i in 0..3 {
            builder
                .add_portal(rooms[i], rooms[i + 1], quad_at_x(i as f32 * 10.0 + 5.0), 0.0)
                .unwrap();
        }
        builder.build()
    }

    #[test]
    fn test_from_lists_sorts_and_dedups() {
        let pvs = Pvs::from_lists(vec![
            vec![RoomId(2), RoomId(0), RoomId(2)],
            vec![RoomId(1)],
        ]);
        assert_eq!(pvs.num_rooms(), 2);
        let visible: Vec<RoomId> = pvs.visible_rooms(RoomId(0)).collect();
        assert_eq!(visible, vec![RoomId(0), RoomId(2)]);
        assert_eq!(pvs.visible_rooms(RoomId(7)).count(), 0);
    }

    #[test]
    fn test_build_respects_depth() {
        let graph = corridor();
        let pvs = Pvs::build(&graph, 1);
        let from0: Vec<RoomId> = pvs.visible_rooms(RoomId(0)).collect();
        assert_eq!(from0, vec![RoomId(0), RoomId(1)]);
        let from1: Vec<RoomId> = pvs.visible_rooms(RoomId(1)).collect();
        assert_eq!(from1, vec![RoomId(0), RoomId(1), RoomId(2)]);

        let full = Pvs::build(&graph, 8);
        assert_eq!(full.visible_rooms(RoomId(0)).count(), 4);
        assert_eq!(pvs.horizon(), Some(1));
        assert_eq!(Pvs::from_lists(vec![vec![RoomId(0)]]).horizon(), None);
    }

    #[test]
    fn test_build_includes_inactive_portals() {
        let mut graph = corridor();
        graph.set_portal_active(crate::rooms::PortalId(0), false).unwrap();
        let pvs = Pvs::build(&graph, 8);
        assert_eq!(pvs.visible_rooms(RoomId(0)).count(), 4);
    }

    #[test]
    fn test_decompress() {
        let pvs = Pvs::from_lists(vec![vec![RoomId(0), RoomId(3)]]);
        let mut table = vec![9u8; 2];
        assert!(pvs.decompress(RoomId(0), 4, &mut table));
        assert_eq!(table, vec![PVS_VISIBLE, 0, 0, PVS_VISIBLE]);

        assert!(!pvs.decompress(RoomId(1), 4, &mut table));
        assert_eq!(table, vec![0; 4]);
    }

    #[test]
    fn test_serde_round_trip() {
        let pvs = Pvs::build(&corridor(), 2);
        let json = serde_json::to_string(&pvs).unwrap();
        let back: Pvs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pvs);
    }
}
