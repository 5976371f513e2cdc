//! Output of a trace, reused frame to frame.

use bitvec::prelude::{BitVec, Lsb0};

use crate::rooms::{RoamerId, StaticId};

use super::scissor::ScreenRect;

/// Which statics and roamers a trace found.
///
/// Each static and roamer appears at most once in the result, in the order a
/// trace reached it. Call [`clear`](Self::clear) before each trace; the
/// tracer itself never clears, so several sub-traces can accumulate into one
/// result and still list every object once.
#[derive(Clone, Debug, Default)]
pub struct TraceResult {
    /// One bit per static, for O(1) membership queries
    pub bf_visible_statics: BitVec<usize, Lsb0>,
    /// One bit per roamer pool slot, grown on demand
    pub bf_visible_roamers: BitVec<usize, Lsb0>,
    pub visible_static_ids: Vec<StaticId>,
    pub visible_roamer_pool_ids: Vec<RoamerId>,
    /// Index into `xportal_rects` a static was seen through, or 0 when it was
    /// seen from the start room or through more than one portal.
    /// Only meaningful for visible statics.
    pub static_xportal_ids: Vec<u16>,
    /// Screen rects of traversed portals, entry 0 is the whole screen
    pub xportal_rects: Vec<ScreenRect>,
}

impl TraceResult {
    /// Result sized for a graph with `num_statics` statics
    pub fn new(num_statics: usize) -> Self {
        let mut result = Self::default();
        result.create(num_statics);
        result
    }

    /// Resize for `num_statics` statics and clear
    pub fn create(&mut self, num_statics: usize) {
        self.bf_visible_statics = BitVec::repeat(false, num_statics);
        self.static_xportal_ids.clear();
        self.static_xportal_ids.resize(num_statics, 0);
        self.clear();
    }

    /// Reset for a new frame without releasing storage
    pub fn clear(&mut self) {
        self.bf_visible_statics.fill(false);
        self.bf_visible_roamers.fill(false);
        self.visible_static_ids.clear();
        self.visible_roamer_pool_ids.clear();
        self.xportal_rects.clear();
        self.xportal_rects.push(ScreenRect::FULL);
    }

    /// Number of statics this result is sized for
    pub fn num_statics(&self) -> usize {
        self.bf_visible_statics.len()
    }

    pub fn is_static_visible(&self, id: StaticId) -> bool {
        self.bf_visible_statics.get(id.index()).is_some_and(|bit| *bit)
    }

    pub fn is_roamer_visible(&self, id: RoamerId) -> bool {
        self.bf_visible_roamers.get(id.index()).is_some_and(|bit| *bit)
    }

    /// Record a static, returning true if it was not already listed.
    /// Statics outside the sized range are ignored.
    pub(crate) fn add_static(&mut self, id: StaticId) -> bool {
        if id.index() >= self.bf_visible_statics.len() || self.bf_visible_statics.replace(id.index(), true) {
            return false;
        }
        self.visible_static_ids.push(id);
        true
    }

    /// Record a roamer, returning true if it was not already listed
    pub(crate) fn add_roamer(&mut self, id: RoamerId) -> bool {
        let index = id.index();
        if index >= self.bf_visible_roamers.len() {
            self.bf_visible_roamers.resize(index + 1, false);
        }
        if self.bf_visible_roamers.replace(index, true) {
            return false;
        }
        self.visible_roamer_pool_ids.push(id);
        true
    }

    /// Scissor rect for a visible static
    pub fn static_rect(&self, id: StaticId) -> ScreenRect {
        self.static_xportal_ids
            .get(id.index())
            .and_then(|x| self.xportal_rects.get(*x as usize))
            .copied()
            .unwrap_or(ScreenRect::FULL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec2;

    #[test]
    fn test_new_is_cleared() {
        let result = TraceResult::new(10);
        assert_eq!(result.num_statics(), 10);
        assert!(result.visible_static_ids.is_empty());
        assert_eq!(result.xportal_rects, vec![ScreenRect::FULL]);
        assert!(!result.is_static_visible(StaticId(3)));
        assert!(!result.is_static_visible(StaticId(99)));
    }

    #[test]
    fn test_add_static_once() {
        let mut result = TraceResult::new(8);
        assert!(result.add_static(StaticId(7)));
        assert!(!result.add_static(StaticId(7)));
        assert!(!result.add_static(StaticId(8)));
        assert_eq!(result.visible_static_ids, vec![StaticId(7)]);
        assert_eq!(result.bf_visible_statics.count_ones(), 1);
    }

    #[test]
    fn test_add_roamer_grows_and_dedups() {
        let mut result = TraceResult::new(0);
        assert!(result.add_roamer(RoamerId(5)));
        assert!(result.add_roamer(RoamerId(1)));
        assert!(!result.add_roamer(RoamerId(5)));
        assert!(result.is_roamer_visible(RoamerId(1)));
        assert!(!result.is_roamer_visible(RoamerId(2)));
        assert_eq!(result.visible_roamer_pool_ids, vec![RoamerId(5), RoamerId(1)]);
    }

    #[test]
    fn test_clear_resets_lists_and_bits() {
        let mut result = TraceResult::new(16);
        result.add_static(StaticId(4));
        result.add_roamer(RoamerId(1));
        result.xportal_rects.push(ScreenRect::new(Vec2::ZERO, Vec2::ONE));

        result.clear();
        assert!(!result.is_static_visible(StaticId(4)));
        assert!(!result.is_roamer_visible(RoamerId(1)));
        assert!(result.visible_static_ids.is_empty());
        assert!(result.visible_roamer_pool_ids.is_empty());
        assert_eq!(result.xportal_rects.len(), 1);
        assert_eq!(result.num_statics(), 16);
        assert!(result.add_roamer(RoamerId(1)));
    }

    #[test]
    fn test_static_rect_lookup() {
        let mut result = TraceResult::new(2);
        let rect = ScreenRect::new(Vec2::ZERO, Vec2::ONE);
        result.xportal_rects.push(rect);
        result.static_xportal_ids[1] = 1;
        assert_eq!(result.static_rect(StaticId(0)), ScreenRect::FULL);
        assert_eq!(result.static_rect(StaticId(1)), rect);
    }
}
