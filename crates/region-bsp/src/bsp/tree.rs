//! BSP tree container, insertion and queries.

use std::any::Any;
use std::collections::{BTreeSet, VecDeque};
use std::iter;

use tracing::{debug, instrument, trace, warn};

use crate::config::TreeConfig;
use crate::{
    classify_point, join_convex, BspError, BspResult, Classification, Clipped, InvalidRegion,
    LineSide, Point, PointSides, PropertyValue, Region, SplitFailure, AREA_EPSILON,
};

use super::memo::OverlapMemo;
use super::node::{BspNode, NodeId, RegionId, Side};
use super::selector::{EdgeScore, EdgeSelector, FewestSplits};
use super::visitor::RegionVisitor;

const LEFT: &[Side] = &[Side::Left];
const RIGHT: &[Side] = &[Side::Right];
const BOTH: &[Side] = &[Side::Left, Side::Right];

#[derive(Debug, Clone)]
struct RegionSlot {
    region: Region,
    /// Regions sharing a border with this one.
    adjacent: BTreeSet<RegionId>,
    /// Whether the region currently sits in a leaf cell.
    placed: bool,
}

/// Tree state captured before a structural operation so a failure can be
/// rolled back.
#[derive(Debug)]
struct Snapshot {
    nodes: Vec<BspNode>,
    root: Option<NodeId>,
    slots: Vec<Option<RegionSlot>>,
    memo: OverlapMemo,
}

/// A Binary Space Partitioning tree indexing 2D regions.
///
/// Nodes and regions live in arenas addressed by [`NodeId`] and
/// [`RegionId`]. Every node splits the plane with a line taken from a region
/// edge. Each half of a node either continues into a child node or is a leaf
/// cell holding regions that lie entirely on that side of every ancestor
/// line. A region that straddles a line on its way down is split and both
/// fragments are placed again from the root.
///
/// The tree only stores convex regions. [`BspTree::insert`] and
/// [`BspTree::resolve_overlaps`] optimize their input and break concave
/// polygons into convex pieces, which is why they return a list of ids.
///
/// # Construction
///
/// ```ignore
/// use region_bsp::{BspTree, Region};
///
/// let mut tree = BspTree::new();
/// let ids = tree.resolve_overlaps(Region::from_coords(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]))?;
/// ```
///
/// # Region graph
///
/// Whenever a region is stored its border adjacency is recomputed, so
/// [`BspTree::neighbors`] always reflects the current partition. The
/// pathfinder walks this graph.
///
/// Nodes are never deleted. A leaf emptied by removals is reused by later
/// insertions.
///
/// # Failures
///
/// [`BspTree::insert`], [`BspTree::resolve_overlaps`] and
/// [`BspTree::remove_region`] either succeed completely or leave the tree
/// exactly as it was before the call.
#[derive(Debug, Clone)]
pub struct BspTree<S = FewestSplits> {
    nodes: Vec<BspNode>,
    root: Option<NodeId>,
    slots: Vec<Option<RegionSlot>>,
    memo: OverlapMemo,
    selector: S,
    config: TreeConfig,
}

impl Default for BspTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BspTree {
    /// Creates an empty tree using the [`FewestSplits`] edge selector.
    pub fn new() -> Self {
        Self::with_selector(FewestSplits)
    }
}

impl<S: EdgeSelector> BspTree<S> {
    /// Creates an empty tree choosing partition lines with `selector`.
    pub fn with_selector(selector: S) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            slots: Vec::new(),
            memo: OverlapMemo::new(),
            selector,
            config: TreeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Returns the number of regions stored in the tree.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().filter(|s| s.placed).count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&BspNode> {
        self.nodes.get(id.0)
    }

    #[inline]
    pub fn memo(&self) -> &OverlapMemo {
        &self.memo
    }

    /// Returns the maximum depth of the tree (0 for an empty tree).
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut deepest = 0;
        let mut stack = vec![(root, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            for &side in BOTH {
                if let Some(child) = self.nodes[node.0].half(side).child() {
                    stack.push((child, depth + 1));
                }
            }
        }
        deepest
    }

    /// Returns the stored region with this id.
    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.slots
            .get(id.0)?
            .as_ref()
            .filter(|s| s.placed)
            .map(|s| &s.region)
    }

    #[inline]
    pub fn contains(&self, id: RegionId) -> bool {
        self.region(id).is_some()
    }

    /// Every stored region, ordered by id.
    pub fn region_list(&self) -> Vec<(RegionId, &Region)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                slot.as_ref()
                    .filter(|s| s.placed)
                    .map(|s| (RegionId(i), &s.region))
            })
            .collect()
    }

    /// Regions sharing a border of positive length with `id`.
    pub fn neighbors(&self, id: RegionId) -> BspResult<&BTreeSet<RegionId>> {
        self.placed_slot(id).map(|s| &s.adjacent)
    }

    /// Stores a property on a region without touching its geometry.
    pub fn set_property<T: Any + Send + Sync>(
        &mut self,
        id: RegionId,
        key: impl Into<String>,
        value: T,
    ) -> BspResult<Option<PropertyValue>> {
        self.placed_slot(id)?;
        Ok(self.slot_mut(id)?.region.set_property(key, value))
    }

    /// Inserts a region without checking for overlaps.
    ///
    /// The region is optimized and decomposed into convex pieces first.
    /// Returns the ids of every fragment the region ended up as. Inserting a
    /// region that overlaps a stored one can fail with
    /// [`BspError::NoPartition`]; use [`BspTree::resolve_overlaps`] when the
    /// input may overlap.
    #[instrument(level = "debug", skip_all, fields(vertices = region.len()))]
    pub fn insert(&mut self, region: Region) -> BspResult<Vec<RegionId>> {
        let pieces = normalize(region)?;
        let ids = self.atomically(|tree| {
            let mut ids = Vec::new();
            for piece in pieces {
                let id = tree.alloc(piece);
                ids.extend(tree.place(id)?);
            }
            Ok(ids)
        })?;
        debug!(fragments = ids.len(), "inserted region");
        Ok(ids)
    }

    /// Inserts a region, overwriting whatever part of the stored regions it
    /// covers.
    ///
    /// Stored regions overlapping the newcomer are removed and their
    /// uncovered fragments are inserted again with the original properties.
    /// Pairs found not to overlap are remembered in the [`OverlapMemo`].
    /// Returns the ids of the newcomer's fragments.
    #[instrument(level = "debug", skip_all, fields(vertices = region.len()))]
    pub fn resolve_overlaps(&mut self, region: Region) -> BspResult<Vec<RegionId>> {
        let pieces = normalize(region)?;
        self.atomically(|tree| tree.resolve_pieces(pieces))
    }

    fn resolve_pieces(&mut self, pieces: Vec<Region>) -> BspResult<Vec<RegionId>> {
        let newcomers: Vec<RegionId> = pieces
            .into_iter()
            .map(|piece| self.alloc(piece))
            .collect();
        let mut pending: VecDeque<RegionId> = newcomers.iter().copied().collect();
        let mut ids = Vec::new();
        let mut work = 0;

        'pending: while let Some(current) = pending.pop_front() {
            work += 1;
            if work > self.config.max_work_items {
                return Err(BspError::InsertionDivergence {
                    limit: self.config.max_work_items,
                });
            }

            let candidates = self.collect_candidates(&self.slot(current)?.region, false);
            for other in candidates {
                if other == current || self.memo.is_cleared(current, other) {
                    continue;
                }
                let Some(clipped) = self.interior_overlap(current, other)? else {
                    self.memo.mark_cleared(current, other);
                    continue;
                };

                debug!(
                    newcomer = %current,
                    existing = %other,
                    remnants = clipped.outside.len(),
                    "newcomer overwrites overlapped region"
                );
                self.detach(other)?;
                for remnant in clipped.outside {
                    pending.push_back(self.alloc(remnant));
                }
                pending.push_front(current);
                continue 'pending;
            }

            let placed = self.place(current)?;
            if newcomers.contains(&current) {
                ids.extend(placed);
            }
        }
        Ok(ids)
    }

    /// Removes a region from the tree and returns it.
    ///
    /// The region is scrubbed from its neighbors' adjacency and from the
    /// overlap memo. Fails with [`BspError::UnknownRegion`] if the id is not
    /// stored.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_region(&mut self, id: RegionId) -> BspResult<Region> {
        self.detach(id)
    }

    /// Every check runs before the first mutation, so a failed removal
    /// leaves the tree untouched.
    fn detach(&mut self, id: RegionId) -> BspResult<Region> {
        let slot = self.placed_slot(id)?;
        let (node, side) = self.find_leaf(id, &slot.region)?;
        let slot = self.slots[id.0].take().ok_or(BspError::UnknownRegion(id))?;
        self.nodes[node.0].remove_neighbor(side, id);

        for other in &slot.adjacent {
            if let Some(neighbor) = self.slots[other.0].as_mut() {
                neighbor.adjacent.remove(&id);
            }
        }
        let forgotten = self.memo.invalidate(id);
        debug!(region = %id, forgotten, "removed region");
        Ok(slot.region)
    }

    /// Returns every region containing `point` (boundary included).
    ///
    /// A point on a partition line is searched on both sides, so a point on
    /// a shared border returns both regions. Fails with
    /// [`BspError::PointNotFound`] if no region contains it.
    pub fn locate(&self, point: &Point) -> BspResult<BTreeSet<RegionId>> {
        let mut found = BTreeSet::new();
        if let Some(root) = self.root {
            let mut stack = vec![root];
            while let Some(node_id) = stack.pop() {
                let node = &self.nodes[node_id.0];
                for &side in node.sides_of(point) {
                    let half = node.half(side);
                    match half.child() {
                        Some(child) => stack.push(child),
                        None => found.extend(half.neighbors()),
                    }
                }
            }
        }

        found.retain(|&id| self.region(id).is_some_and(|r| r.contains_point(point)));
        if found.is_empty() {
            return Err(BspError::PointNotFound {
                x: point.x(),
                y: point.y(),
            });
        }
        Ok(found)
    }

    /// Returns the single region containing `point`.
    ///
    /// Fails with [`BspError::AmbiguousLocation`] on a shared border.
    pub fn locate_one(&self, point: &Point) -> BspResult<RegionId> {
        let found = self.locate(point)?;
        match found.len() {
            1 => found
                .first()
                .copied()
                .ok_or(BspError::PointNotFound { x: point.x(), y: point.y() }),
            count => Err(BspError::AmbiguousLocation { count }),
        }
    }

    /// Regions whose interior might overlap `region`.
    ///
    /// A conservative superset: a straddled node contributes its whole
    /// subtree.
    pub fn potential_overlaps(&self, region: &Region) -> BTreeSet<RegionId> {
        self.collect_candidates(region, false)
    }

    /// Visits the leaf cells in order of distance from `point`: at every
    /// node the half containing the point goes first.
    pub fn traverse_near_to_far<V: RegionVisitor>(&self, point: &Point, visitor: &mut V) {
        if let Some(root) = self.root {
            self.traverse_node(root, point, visitor);
        }
    }

    fn traverse_node<V: RegionVisitor>(&self, node_id: NodeId, point: &Point, visitor: &mut V) {
        let node = &self.nodes[node_id.0];
        let (a, b) = node.line();
        let near = match classify_point(point, a, b) {
            LineSide::Right => Side::Right,
            LineSide::Left | LineSide::On => Side::Left,
        };

        for side in [near, near.opposite()] {
            let half = node.half(side);
            if let Some(child) = half.child() {
                self.traverse_node(child, point, visitor);
                continue;
            }
            let regions: Vec<(RegionId, &Region)> = half
                .neighbors()
                .iter()
                .filter_map(|&id| self.region(id).map(|r| (id, r)))
                .collect();
            if !regions.is_empty() {
                visitor.visit(&regions);
            }
        }
    }

    /// Runs a structural operation, restoring the previous state if it fails.
    fn atomically<T>(&mut self, op: impl FnOnce(&mut Self) -> BspResult<T>) -> BspResult<T> {
        let snapshot = Snapshot {
            nodes: self.nodes.clone(),
            root: self.root,
            slots: self.slots.clone(),
            memo: self.memo.clone(),
        };
        let result = op(self);
        if let Err(error) = &result {
            warn!(%error, "structural operation failed, rolling back");
            self.nodes = snapshot.nodes;
            self.root = snapshot.root;
            self.slots = snapshot.slots;
            self.memo = snapshot.memo;
        }
        result
    }

    /// Places an allocated region, and any residents it displaces, through
    /// the work queue. Returns the ids `id` ended up as after splits.
    fn place(&mut self, id: RegionId) -> BspResult<Vec<RegionId>> {
        let mut queue: VecDeque<(RegionId, Option<NodeId>)> = VecDeque::from([(id, None)]);
        let mut lineage = vec![id];
        let mut stored = BTreeSet::new();
        let mut work = 0;

        'queue: while let Some((current, start)) = queue.pop_front() {
            work += 1;
            if work > self.config.max_work_items {
                return Err(BspError::InsertionDivergence {
                    limit: self.config.max_work_items,
                });
            }

            let mut node = match start.or(self.root) {
                Some(node) => node,
                None => self.create_root(current)?,
            };

            loop {
                let sides = self.nodes[node.0].classify(self.slot(current)?.region.points());
                let Some(side) = placement_side(sides.classification()) else {
                    let fragment = self.split_region(current, node)?;
                    if lineage.contains(&current) {
                        lineage.push(fragment);
                    }
                    queue.push_back((current, None));
                    queue.push_back((fragment, None));
                    continue 'queue;
                };

                let half = self.nodes[node.0].half(side);
                if let Some(child) = half.child() {
                    node = child;
                    continue;
                }
                if half.neighbors().is_empty() {
                    self.nodes[node.0].add_neighbor(side, current);
                    self.slot_mut(current)?.placed = true;
                    stored.insert(current);
                    trace!(region = %current, node = node.0, ?side, "stored region");
                    continue 'queue;
                }

                // Occupied leaf: grow a child and send the residents into it.
                let residents: Vec<RegionId> = half.neighbors().iter().copied().collect();
                let child = self.partition(current, &residents)?;
                self.nodes[node.0].take_neighbors(side);
                self.nodes[node.0].set_child(side, child);
                for &resident in &residents {
                    self.slot_mut(resident)?.placed = false;
                    queue.push_back((resident, Some(child)));
                }
                node = child;
            }
        }

        for &id in &stored {
            if self.slot(id)?.placed {
                self.refresh_adjacency(id)?;
            }
        }
        Ok(lineage)
    }

    fn create_root(&mut self, id: RegionId) -> BspResult<NodeId> {
        let region = &self.slot(id)?.region;
        let (_, a, b) = region
            .edges()
            .next()
            .ok_or(InvalidRegion::TooFewVertices { count: region.len() })?;
        let node = BspNode::new(a.clone(), b.clone());
        let root = self.push_node(node);
        self.root = Some(root);
        debug!(region = %id, "created root node");
        Ok(root)
    }

    /// Builds a child node whose line separates or splits the regions
    /// competing for one leaf.
    fn partition(&mut self, current: RegionId, residents: &[RegionId]) -> BspResult<NodeId> {
        let members: Vec<&Region> = iter::once(current)
            .chain(residents.iter().copied())
            .map(|id| self.slot(id).map(|s| &s.region))
            .collect::<BspResult<_>>()?;

        let mut candidates: Vec<(Point, Point)> = members
            .iter()
            .flat_map(|r| r.edges().map(|(_, a, b)| (a.clone(), b.clone())))
            .collect();
        let scores: Vec<EdgeScore> = candidates
            .iter()
            .map(|(a, b)| {
                let mut score = EdgeScore::default();
                for region in &members {
                    match PointSides::of_region(a, b, region).classification() {
                        Classification::Left | Classification::Colinear => score.left += 1,
                        Classification::Right => score.right += 1,
                        Classification::Straddling => score.straddling += 1,
                    }
                }
                score
            })
            .collect();

        let choice = self
            .selector
            .select(&scores)
            .ok_or(BspError::NoPartition { region: current })?;
        let (a, b) = candidates.swap_remove(choice);
        let score = scores[choice];
        debug!(
            region = %current,
            residents = residents.len(),
            straddling = score.straddling,
            from = %a,
            to = %b,
            "created partition node"
        );
        Ok(self.push_node(BspNode::new(a, b)))
    }

    /// Splits a region along a node's line. The region keeps its id for the
    /// left fragment; the right fragment gets a fresh id, which is returned.
    fn split_region(&mut self, id: RegionId, node: NodeId) -> BspResult<RegionId> {
        let (a, b) = self.nodes[node.0].line();
        let (left, right) = self
            .slot(id)?
            .region
            .split_fragments(a, b, true)
            .map_err(|failure| split_error(id, failure))?;

        self.slot_mut(id)?.region = left;
        self.memo.invalidate(id);
        let fragment = self.alloc(right);
        debug!(region = %id, %fragment, node = node.0, "split straddling region");
        Ok(fragment)
    }

    /// Walks the path a stored region took to its leaf.
    fn find_leaf(&self, id: RegionId, region: &Region) -> BspResult<(NodeId, Side)> {
        let mut node_id = self.root.ok_or(BspError::UnknownRegion(id))?;
        loop {
            let node = &self.nodes[node_id.0];
            let side = placement_side(node.classify(region.points()).classification())
                .ok_or(BspError::UnknownRegion(id))?;
            let half = node.half(side);
            match half.child() {
                Some(child) => node_id = child,
                None if half.neighbors().contains(&id) => return Ok((node_id, side)),
                None => return Err(BspError::UnknownRegion(id)),
            }
        }
    }

    /// Collects regions in every leaf `region` may reach. With
    /// `include_touching`, a region touching a line searches both halves.
    fn collect_candidates(&self, region: &Region, include_touching: bool) -> BTreeSet<RegionId> {
        let mut found = BTreeSet::new();
        let Some(root) = self.root else {
            return found;
        };

        let mut stack = vec![root];
        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id.0];
            let sides = node.classify(region.points());
            let halves = match sides.classification() {
                Classification::Straddling => {
                    self.collect_subtree(node_id, &mut found);
                    continue;
                }
                Classification::Colinear => BOTH,
                _ if include_touching && sides.touches_line() => BOTH,
                Classification::Left => LEFT,
                Classification::Right => RIGHT,
            };
            for &side in halves {
                let half = node.half(side);
                match half.child() {
                    Some(child) => stack.push(child),
                    None => found.extend(half.neighbors()),
                }
            }
        }
        found
    }

    fn collect_subtree(&self, node_id: NodeId, found: &mut BTreeSet<RegionId>) {
        let mut stack = vec![node_id];
        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id.0];
            for &side in BOTH {
                let half = node.half(side);
                match half.child() {
                    Some(child) => stack.push(child),
                    None => found.extend(half.neighbors()),
                }
            }
        }
    }

    /// Recomputes the border adjacency of a freshly stored region, keeping
    /// both directions of every link in sync.
    fn refresh_adjacency(&mut self, id: RegionId) -> BspResult<()> {
        let stale = std::mem::take(&mut self.slot_mut(id)?.adjacent);
        for other in stale {
            if let Some(slot) = self.slots[other.0].as_mut() {
                slot.adjacent.remove(&id);
            }
        }

        let region = &self.slot(id)?.region;
        let linked: Vec<RegionId> = self
            .collect_candidates(region, true)
            .into_iter()
            .filter(|&other| other != id)
            .filter(|&other| self.region(other).is_some_and(|r| r.borders(region)))
            .collect();

        for &other in &linked {
            self.slot_mut(other)?.adjacent.insert(id);
        }
        trace!(region = %id, neighbors = linked.len(), "refreshed adjacency");
        self.slot_mut(id)?.adjacent = linked.into_iter().collect();
        Ok(())
    }

    /// Clips the stored region `existing` against `newcomer` if their
    /// interiors overlap.
    fn interior_overlap(&self, newcomer: RegionId, existing: RegionId) -> BspResult<Option<Clipped>> {
        let incoming = &self.slot(newcomer)?.region;
        let stored = &self.slot(existing)?.region;
        let (Some(a), Some(b)) = (incoming.extents(), stored.extents()) else {
            return Ok(None);
        };
        if !a.overlaps_interior(&b)
            || separated_by_edge(incoming, stored)
            || separated_by_edge(stored, incoming)
        {
            return Ok(None);
        }

        let clipped = stored
            .clip(incoming)
            .map_err(|failure| split_error(existing, failure))?;
        Ok(clipped.filter(|c| c.inside_area() > AREA_EPSILON))
    }

    fn alloc(&mut self, region: Region) -> RegionId {
        let id = RegionId(self.slots.len());
        self.slots.push(Some(RegionSlot {
            region,
            adjacent: BTreeSet::new(),
            placed: false,
        }));
        id
    }

    fn push_node(&mut self, node: BspNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn slot(&self, id: RegionId) -> BspResult<&RegionSlot> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(BspError::UnknownRegion(id))
    }

    fn slot_mut(&mut self, id: RegionId) -> BspResult<&mut RegionSlot> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(BspError::UnknownRegion(id))
    }

    fn placed_slot(&self, id: RegionId) -> BspResult<&RegionSlot> {
        self.slot(id)
            .ok()
            .filter(|s| s.placed)
            .ok_or(BspError::UnknownRegion(id))
    }
}

/// Optimizes a region and breaks it into as few convex pieces as joining
/// allows.
fn normalize(region: Region) -> Result<Vec<Region>, InvalidRegion> {
    let pieces = region.convex_decompose()?;
    Ok(if pieces.len() > 1 {
        join_convex(pieces)
    } else {
        pieces
    })
}

/// Half a region is stored in, or `None` if the line splits it. Regions
/// lying on the line go left.
#[inline]
fn placement_side(classification: Classification) -> Option<Side> {
    match classification {
        Classification::Left | Classification::Colinear => Some(Side::Left),
        Classification::Right => Some(Side::Right),
        Classification::Straddling => None,
    }
}

/// Returns `true` if some edge of the convex region `a` has all of `b` on
/// its outer side.
fn separated_by_edge(a: &Region, b: &Region) -> bool {
    a.edges().any(|(_, p, q)| {
        matches!(
            PointSides::of_region(p, q, b).classification(),
            Classification::Right | Classification::Colinear
        )
    })
}

fn split_error(region: RegionId, failure: SplitFailure) -> BspError {
    match failure {
        SplitFailure::Intersections(intersections) => BspError::SplitInvariant {
            region,
            intersections,
        },
        SplitFailure::NotStraddling => BspError::SplitInvariant {
            region,
            intersections: 0,
        },
        SplitFailure::Invalid(invalid) => BspError::Invalid(invalid),
    }
}
