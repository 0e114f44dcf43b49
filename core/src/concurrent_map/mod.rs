//! A concurrent hash map with per-bucket locking and online, non-blocking
//! growth.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::ConcurrentMapConfig;

struct Bucket<K, V> {
    entries: Vec<(K, V)>,
    /// Set once this bucket's entries have been migrated into a newer
    /// [`BucketsAccessor`]; a reader or writer that observes this must
    /// reload the map's current accessor and retry against the new bucket
    /// layout instead of trusting this bucket's (now stale) contents.
    obsolete: bool,
}

impl<K, V> Bucket<K, V> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            obsolete: false,
        }
    }
}

struct BucketsAccessor<K, V> {
    buckets: Vec<Mutex<Bucket<K, V>>>,
}

impl<K, V> BucketsAccessor<K, V> {
    fn new(bucket_count: usize) -> Self {
        Self {
            buckets: (0..bucket_count).map(|_| Mutex::new(Bucket::new())).collect(),
        }
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }
}

/// A hash map safe for concurrent `insert`/`remove`/`get` from any number of
/// threads, backed by a fixed array of per-bucket mutexes that is itself
/// swapped out for a larger one as the map grows.
///
/// The bucket array lives behind a short-held `RwLock<Arc<_>>`: readers only
/// hold the lock long enough to clone the `Arc`, so they never block behind
/// a resize for longer than that clone. A resize allocates a new, larger
/// array, locks
/// every bucket in it up front (blocking anyone who loads the new array
/// before migration finishes), publishes it, then walks the old array one
/// bucket at a time, marking each bucket obsolete and redistributing its
/// entries into the already-locked new buckets. Any operation that finds
/// its bucket marked obsolete reloads the current array and retries; this
/// is the only case `insert`/`remove`/`get` ever loop.
///
/// Growth triggers when `floor(sqrt(size)) > bucket_count`, checked after
/// every successful insert, and is attempted with a non-blocking
/// `try_lock`: if another thread is already resizing, the check is simply
/// skipped for this insert.
pub struct ConcurrentMap<K, V, S = RandomState> {
    accessor: RwLock<Arc<BucketsAccessor<K, V>>>,
    size: AtomicUsize,
    resize_lock: Mutex<()>,
    hasher_builder: S,
}

impl<K, V> ConcurrentMap<K, V, RandomState>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::with_config(ConcurrentMapConfig::default())
    }

    pub fn with_config(config: ConcurrentMapConfig) -> Self {
        Self::with_bucket_count(config.initial_bucket_count.max(1))
    }

    pub fn with_bucket_count(bucket_count: usize) -> Self {
        Self {
            accessor: RwLock::new(Arc::new(BucketsAccessor::new(bucket_count.max(1)))),
            size: AtomicUsize::new(0),
            resize_lock: Mutex::new(()),
            hasher_builder: RandomState::new(),
        }
    }
}

impl<K, V> Default for ConcurrentMap<K, V, RandomState>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ConcurrentMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn bucket_index(&self, key: &K, bucket_count: usize) -> usize {
        (self.hasher_builder.hash_one(key) as usize) % bucket_count
    }

    fn current(&self) -> Arc<BucketsAccessor<K, V>> {
        self.accessor.read().clone()
    }

    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.current().len()
    }

    /// Inserts `value` under `key`. Returns `false` without modifying the
    /// map if `key` is already present; returns `true` once the entry has
    /// been added.
    pub fn insert(&self, key: K, value: V) -> bool {
        let inserted = loop {
            let accessor = self.current();
            let idx = self.bucket_index(&key, accessor.len());
            let mut bucket = accessor.buckets[idx].lock();
            if bucket.obsolete {
                continue;
            }
            if bucket.entries.iter().any(|(k, _)| *k == key) {
                break false;
            }
            bucket.entries.push((key, value));
            break true;
        };

        if inserted {
            self.size.fetch_add(1, Ordering::Relaxed);
            self.maybe_resize();
        }
        inserted
    }

    /// Returns a clone of the value stored under `key`, if present.
    pub fn get(&self, key: &K) -> Option<V> {
        loop {
            let accessor = self.current();
            let idx = self.bucket_index(key, accessor.len());
            let bucket = accessor.buckets[idx].lock();
            if bucket.obsolete {
                continue;
            }
            return bucket.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = loop {
            let accessor = self.current();
            let idx = self.bucket_index(key, accessor.len());
            let mut bucket = accessor.buckets[idx].lock();
            if bucket.obsolete {
                continue;
            }
            break bucket
                .entries
                .iter()
                .position(|(k, _)| k == key)
                .map(|pos| bucket.entries.swap_remove(pos).1);
        };

        if removed.is_some() {
            self.size.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    fn maybe_resize(&self) {
        let size = self.size.load(Ordering::Relaxed);
        let bucket_count = self.current().len();
        let threshold = (size as f64).sqrt().floor() as usize;
        if threshold > bucket_count {
            self.resize(bucket_count * 2);
        }
    }

    fn resize(&self, new_count: usize) {
        let resize_guard = match self.resize_lock.try_lock() {
            Some(guard) => guard,
            None => return,
        };

        let old = self.current();
        if new_count <= old.len() {
            return;
        }

        let new_accessor = Arc::new(BucketsAccessor::<K, V>::new(new_count));
        let mut new_buckets: Vec<_> = new_accessor.buckets.iter().map(|bucket| bucket.lock()).collect();

        *self.accessor.write() = new_accessor.clone();

        for old_bucket in &old.buckets {
            let mut old_bucket = old_bucket.lock();
            old_bucket.obsolete = true;
            for (key, value) in old_bucket.entries.drain(..) {
                let idx = self.bucket_index(&key, new_count);
                new_buckets[idx].entries.push((key, value));
            }
        }

        drop(new_buckets);
        drop(resize_guard);
    }
}
