//! Thread-shared tree with tracking of in-flight bulk insertions.
//!
//! Readers share one [`RwLock`]; structural operations take it exclusively.
//! Insertion runs through the tree's own work queue and never re-enters a
//! lock, so a single tree-level lock is enough.
//!
//! Bulk producers register with [`PendingInsertions`] before they start. The
//! pathfinder waits until no producer is active.

use std::collections::BTreeSet;
use std::sync::{
    Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::config::PathfinderConfig;
use crate::path::{CostEvaluator, Path, Pathfinder};
use crate::{BspResult, PathError, Point, Region};

use super::{BspTree, EdgeSelector, FewestSplits, RegionId};

/// Counter of bulk insertions still running.
#[derive(Debug, Default)]
pub struct PendingInsertions {
    count: Mutex<usize>,
    settled: Condvar,
}

impl PendingInsertions {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of insertions currently registered.
    pub fn count(&self) -> usize {
        *self.lock()
    }

    /// Registers an insertion. It stays pending until the guard is dropped.
    pub fn begin(self: &Arc<Self>) -> PendingGuard {
        *self.lock() += 1;
        PendingGuard {
            pending: Arc::clone(self),
        }
    }

    fn finish(&self) {
        let mut count = self.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.settled.notify_all();
        }
    }

    /// Blocks until no insertion is pending.
    pub fn wait_until_settled(&self) {
        let mut count = self.lock();
        while *count > 0 {
            count = self
                .settled
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`wait_until_settled`](Self::wait_until_settled) but gives up
    /// after `timeout`. Returns `true` if the counter reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let count = self.lock();
        let (count, _) = self
            .settled
            .wait_timeout_while(count, timeout, |c| *c > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *count == 0
    }
}

/// Keeps one insertion registered with [`PendingInsertions`] while alive.
#[derive(Debug)]
pub struct PendingGuard {
    pending: Arc<PendingInsertions>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.finish();
    }
}

/// A [`BspTree`] shared between threads.
///
/// Cloning is cheap and every clone refers to the same tree. A poisoned lock
/// is recovered rather than propagated.
#[derive(Debug)]
pub struct SharedTree<S = FewestSplits> {
    tree: Arc<RwLock<BspTree<S>>>,
    pending: Arc<PendingInsertions>,
    pathfinder: PathfinderConfig,
}

impl<S> Clone for SharedTree<S> {
    fn clone(&self) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            pending: Arc::clone(&self.pending),
            pathfinder: self.pathfinder,
        }
    }
}

impl Default for SharedTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedTree {
    pub fn new() -> Self {
        Self::from_tree(BspTree::new())
    }
}

impl<S: EdgeSelector> SharedTree<S> {
    pub fn from_tree(tree: BspTree<S>) -> Self {
        Self {
            tree: Arc::new(RwLock::new(tree)),
            pending: Arc::new(PendingInsertions::new()),
            pathfinder: PathfinderConfig::default(),
        }
    }

    pub fn with_pathfinder_config(mut self, config: PathfinderConfig) -> Self {
        self.pathfinder = config;
        self
    }

    /// Shared read access. Blocks while a structural operation runs.
    pub fn read(&self) -> RwLockReadGuard<'_, BspTree<S>> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access for structural operations.
    pub fn write(&self) -> RwLockWriteGuard<'_, BspTree<S>> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn pending(&self) -> &Arc<PendingInsertions> {
        &self.pending
    }

    pub fn resolve_overlaps(&self, region: Region) -> BspResult<Vec<RegionId>> {
        self.write().resolve_overlaps(region)
    }

    pub fn remove_region(&self, id: RegionId) -> BspResult<Region> {
        self.write().remove_region(id)
    }

    pub fn locate(&self, point: &Point) -> BspResult<BTreeSet<RegionId>> {
        self.read().locate(point)
    }

    /// Finds a path once every pending bulk insertion has finished.
    pub fn find_path<M, C>(
        &self,
        start: &Point,
        destination: &Point,
        mover: &M,
        cost_fn: &C,
    ) -> Result<Path, PathError>
    where
        M: ?Sized,
        C: CostEvaluator<M>,
    {
        self.pending.wait_until_settled();
        let tree = self.read();
        Pathfinder::new(&*tree)
            .with_config(self.pathfinder)
            .find_path(start, destination, mover, cost_fn)
    }
}

impl<S> SharedTree<S>
where
    S: EdgeSelector + Send + Sync + 'static,
{
    /// Resolves `regions` into the tree on a background thread.
    ///
    /// The write lock is taken per region so readers can interleave. The
    /// insertion counts as pending from this call until the thread ends,
    /// whether it succeeds, fails or panics. The thread stops at the first
    /// error.
    pub fn spawn_bulk_insert(&self, regions: Vec<Region>) -> JoinHandle<BspResult<Vec<RegionId>>> {
        let guard = self.pending.begin();
        let tree = self.clone();
        thread::spawn(move || {
            let _guard = guard;
            let total = regions.len();
            let mut ids = Vec::with_capacity(total);
            for region in regions {
                ids.extend(tree.resolve_overlaps(region)?);
            }
            debug!(regions = total, fragments = ids.len(), "bulk insertion finished");
            Ok(ids)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_square(x0: f64, y0: f64) -> Region {
        Region::from_coords(&[(x0, y0), (x0 + 1.0, y0), (x0 + 1.0, y0 + 1.0), (x0, y0 + 1.0)])
    }

    fn uniform(_: &Region, _: &()) -> f64 {
        1.0
    }

    #[test]
    fn guard_tracks_pending_count() {
        let pending = Arc::new(PendingInsertions::new());
        let first = pending.begin();
        let second = pending.begin();
        assert_eq!(pending.count(), 2);
        drop(first);
        assert!(!pending.wait_timeout(Duration::from_millis(10)));
        drop(second);
        assert_eq!(pending.count(), 0);
        assert!(pending.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn bulk_insert_from_several_threads() {
        let shared = SharedTree::new();
        let lower = shared.spawn_bulk_insert((0..4).map(|i| make_square(i as f64, 0.0)).collect());
        let upper = shared.spawn_bulk_insert((0..4).map(|i| make_square(i as f64, 1.0)).collect());

        let lower_ids = lower.join().unwrap().unwrap();
        let upper_ids = upper.join().unwrap().unwrap();
        assert!(lower_ids.len() >= 4 && upper_ids.len() >= 4);
        assert_eq!(shared.pending().count(), 0);

        let tree = shared.read();
        let area: f64 = tree.region_list().iter().map(|(_, r)| r.area()).sum();
        assert!((area - 8.0).abs() < 1e-9);
        assert!(tree.locate_one(&Point::new(3.5, 1.5)).is_ok());
    }

    #[test]
    fn find_path_waits_for_pending_insertions() {
        let shared = SharedTree::new();
        shared.resolve_overlaps(make_square(0.0, 0.0)).unwrap();
        shared.resolve_overlaps(make_square(1.0, 0.0)).unwrap();

        let guard = shared.pending().begin();
        let searcher = {
            let shared = shared.clone();
            thread::spawn(move || {
                shared.find_path(&Point::new(0.5, 0.5), &Point::new(1.5, 0.5), &(), &uniform)
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!searcher.is_finished());
        drop(guard);

        let path = searcher.join().unwrap().unwrap();
        assert_eq!(path.regions.len(), 2);
        assert!((path.cost - 1.0).abs() < 1e-9);
    }

    #[test]
    fn failed_bulk_insert_still_settles() {
        let shared = SharedTree::new();
        let handle = shared.spawn_bulk_insert(vec![Region::from_coords(&[(0.0, 0.0), (1.0, 1.0)])]);
        assert!(handle.join().unwrap().is_err());
        assert_eq!(shared.pending().count(), 0);
    }
}
