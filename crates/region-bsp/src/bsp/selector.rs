//! Partition edge selection strategies.
//!
//! When a second region lands in an occupied leaf, the leaf gets a child
//! node whose partition line is one of the candidates' edges. The choice
//! affects how many regions are split and how deep the tree grows.

/// How the regions competing for a leaf fall against one candidate edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeScore {
    /// Regions entirely on the left (touching allowed).
    pub left: usize,
    /// Regions entirely on the right (touching allowed).
    pub right: usize,
    /// Regions the line would split.
    pub straddling: usize,
}

impl EdgeScore {
    /// A line makes progress if it separates at least two regions or splits
    /// at least one. Lines that leave every region on one side would only
    /// recreate the same crowded leaf one level deeper.
    #[inline]
    pub fn makes_progress(&self) -> bool {
        self.straddling > 0 || (self.left > 0 && self.right > 0)
    }
}

/// Strategy for selecting which candidate edge becomes a partition line.
pub trait EdgeSelector {
    /// Select a candidate by index.
    ///
    /// Returns `None` if no candidate makes progress.
    fn select(&self, scores: &[EdgeScore]) -> Option<usize>;
}

/// Selects the first edge that makes progress.
///
/// Fast, but the resulting partition depends on region and edge order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstEdge;

impl EdgeSelector for FirstEdge {
    fn select(&self, scores: &[EdgeScore]) -> Option<usize> {
        scores.iter().position(EdgeScore::makes_progress)
    }
}

/// Selects the progressing edge that splits the fewest regions, preferring
/// earlier edges on ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct FewestSplits;

impl EdgeSelector for FewestSplits {
    fn select(&self, scores: &[EdgeScore]) -> Option<usize> {
        scores
            .iter()
            .enumerate()
            .filter(|(_, s)| s.makes_progress())
            .min_by_key(|(i, s)| (s.straddling, *i))
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(left: usize, right: usize, straddling: usize) -> EdgeScore {
        EdgeScore {
            left,
            right,
            straddling,
        }
    }

    #[test]
    fn progress_rules() {
        assert!(!score(3, 0, 0).makes_progress());
        assert!(!score(0, 2, 0).makes_progress());
        assert!(score(1, 1, 0).makes_progress());
        assert!(score(2, 0, 1).makes_progress());
    }

    #[test]
    fn first_edge_empty_list() {
        assert!(FirstEdge.select(&[]).is_none());
        assert!(FewestSplits.select(&[]).is_none());
    }

    #[test]
    fn first_edge_skips_stalled_candidates() {
        let scores = [score(2, 0, 0), score(1, 0, 1), score(1, 1, 0)];
        assert_eq!(FirstEdge.select(&scores), Some(1));
    }

    #[test]
    fn fewest_splits_prefers_clean_partitions() {
        let scores = [score(2, 0, 0), score(1, 0, 1), score(1, 1, 0), score(0, 2, 0)];
        assert_eq!(FewestSplits.select(&scores), Some(2));
    }

    #[test]
    fn nothing_progresses() {
        let scores = [score(2, 0, 0), score(0, 2, 0)];
        assert!(FirstEdge.select(&scores).is_none());
        assert!(FewestSplits.select(&scores).is_none());
    }
}
