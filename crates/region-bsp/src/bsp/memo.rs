//! Memo of region pairs already known not to overlap.

use std::collections::HashSet;

use super::RegionId;

/// Symmetric table of region pairs whose interiors were checked and found
/// disjoint. `(a, b)` and `(b, a)` are the same entry.
#[derive(Debug, Clone, Default)]
pub struct OverlapMemo {
    cleared: HashSet<(RegionId, RegionId)>,
}

#[inline]
fn key(a: RegionId, b: RegionId) -> (RegionId, RegionId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl OverlapMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `a` and `b` do not overlap.
    pub fn mark_cleared(&mut self, a: RegionId, b: RegionId) {
        if a != b {
            self.cleared.insert(key(a, b));
        }
    }

    pub fn is_cleared(&self, a: RegionId, b: RegionId) -> bool {
        self.cleared.contains(&key(a, b))
    }

    /// Forgets every pair involving `id`. Returns how many were dropped.
    pub fn invalidate(&mut self, id: RegionId) -> usize {
        let before = self.cleared.len();
        self.cleared.retain(|&(a, b)| a != id && b != id);
        before - self.cleared.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cleared.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cleared.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_unordered() {
        let mut memo = OverlapMemo::new();
        memo.mark_cleared(RegionId(3), RegionId(1));
        assert!(memo.is_cleared(RegionId(1), RegionId(3)));
        assert!(memo.is_cleared(RegionId(3), RegionId(1)));
        memo.mark_cleared(RegionId(1), RegionId(3));
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn self_pairs_are_ignored() {
        let mut memo = OverlapMemo::new();
        memo.mark_cleared(RegionId(2), RegionId(2));
        assert!(memo.is_empty());
    }

    #[test]
    fn invalidate_drops_every_pair_of_a_region() {
        let mut memo = OverlapMemo::new();
        memo.mark_cleared(RegionId(0), RegionId(1));
        memo.mark_cleared(RegionId(2), RegionId(0));
        memo.mark_cleared(RegionId(1), RegionId(2));

        assert_eq!(memo.invalidate(RegionId(0)), 2);
        assert!(!memo.is_cleared(RegionId(0), RegionId(1)));
        assert!(memo.is_cleared(RegionId(2), RegionId(1)));
        assert_eq!(memo.invalidate(RegionId(0)), 0);
    }
}
