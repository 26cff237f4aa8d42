//! The unique identifier registry
//!
//! Membership is a `BTreeMap` behind a single mutex. Random candidates are
//! drawn with the mutex released so a slow source never stalls unrelated
//! callers; every draw is re-tested once the lock is held again. This is
//! not a lock-free scheme: the check-and-insert critical section is still
//! serialised.

use crate::entry::{CheckSite, Entry};
use crate::source::{CandidateSource, ThreadRngSource};
use crate::stats::UniqueStats;

use objectio_common::{Error, Result, UniqueConfig};
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::collections::btree_map;
use tracing::{debug, error, trace, warn};

/// Registry of live identifiers
///
/// Constructed once at startup and shared (by reference or `Arc`) with
/// every subsystem that tags objects. Dropping it, or calling
/// [`finalize`](Self::finalize), ends its lifetime.
pub struct UniqueRegistry<S = ThreadRngSource> {
    tree: Mutex<BTreeMap<u64, Entry>>,
    bits: u32,
    mask: u64,
    max_attempts: Option<u64>,
    source: S,
    stats: UniqueStats,
}

impl UniqueRegistry<ThreadRngSource> {
    /// Create a registry drawing candidates from the thread-local RNG
    pub fn new(config: &UniqueConfig) -> Result<Self> {
        Self::with_source(config, ThreadRngSource)
    }
}

impl Default for UniqueRegistry<ThreadRngSource> {
    fn default() -> Self {
        Self::build(&UniqueConfig::default(), ThreadRngSource)
    }
}

impl<S: CandidateSource> UniqueRegistry<S> {
    /// Create a registry with a custom candidate source
    pub fn with_source(config: &UniqueConfig, source: S) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, source))
    }

    fn build(config: &UniqueConfig, source: S) -> Self {
        debug!(
            bits = config.bits,
            max_attempts = ?config.max_attempts,
            "unique registry initialized"
        );
        Self {
            tree: Mutex::new(BTreeMap::new()),
            bits: config.bits,
            mask: config.mask(),
            max_attempts: config.max_attempts,
            source,
            stats: UniqueStats::default(),
        }
    }

    /// Tear the registry down
    ///
    /// Callers must have stopped using it. Live values are not an error;
    /// they are logged and dropped.
    pub fn finalize(self) {
        let tree = self.tree.into_inner();
        if !tree.is_empty() {
            warn!(live = tree.len(), "unique registry finalized with live values");
        }
        debug!(stats = ?self.stats.snapshot(), "unique registry finalized");
    }

    /// Mint a value that is unique at the instant it is generated
    ///
    /// The value is no longer registered when this returns. A caller that
    /// needs it to stay unique must [`insert`](Self::insert) it before
    /// handing it to anyone else; that insert may legitimately return a
    /// different value if another caller got there first.
    pub fn create(&self) -> u64 {
        let value = self.insert(0);
        self.remove(value);
        value
    }

    /// Like [`create`](Self::create), but bounded the way
    /// [`try_insert`](Self::try_insert) is
    pub fn try_create(&self) -> Result<u64> {
        let value = self.try_insert(0)?;
        self.remove(value);
        Ok(value)
    }

    /// Register `candidate`, or a random free value if it is unusable
    ///
    /// Pass 0 to ask for any free value. A nonzero, in-mask candidate that
    /// is not live is accepted as is. Retries until a free value is found,
    /// with no upper bound, even when `max_attempts` is configured.
    pub fn insert(&self, candidate: u64) -> u64 {
        self.insert_limited(candidate, &mut 0, None)
            .unwrap_or_else(|| unreachable!("unbounded insert always finds a free value"))
    }

    /// Like [`insert`](Self::insert), but gives up after the configured
    /// `max_attempts` random draws
    ///
    /// Without a configured limit this behaves exactly like `insert`.
    pub fn try_insert(&self, candidate: u64) -> Result<u64> {
        let Some(limit) = self.max_attempts else {
            return Ok(self.insert(candidate));
        };

        let mut attempts = 0;
        match self.insert_limited(candidate, &mut attempts, Some(limit)) {
            Some(value) => Ok(value),
            None => {
                UniqueStats::bump(&self.stats.exhausted);
                warn!(
                    attempts,
                    bits = self.bits,
                    live = self.len(),
                    "unique registry gave up looking for a free value"
                );
                Err(Error::IdSpaceExhausted {
                    attempts,
                    bits: self.bits,
                })
            }
        }
    }

    /// Register a value for the lifetime of the returned guard
    pub fn pin(&self, candidate: u64) -> UniqueGuard<'_, S> {
        UniqueGuard {
            registry: self,
            value: self.insert(candidate),
        }
    }

    /// Unregister `value`
    ///
    /// Removing a value that is not live does nothing.
    pub fn remove(&self, value: u64) {
        let mut tree = self.tree.lock();
        match tree.entry(value) {
            btree_map::Entry::Occupied(slot) => {
                verify(slot.get(), CheckSite::BeforeRemove);
                let entry = slot.remove();
                verify(&entry, CheckSite::AfterRemove);
                drop(entry);
                UniqueStats::bump(&self.stats.removed);
                trace!(value, "unique value removed");
            }
            btree_map::Entry::Vacant(_) => {
                UniqueStats::bump(&self.stats.missed_removes);
                trace!(value, "unique value not live, nothing to remove");
            }
        }
    }

    /// The check-and-insert loop shared by both insert flavours
    ///
    /// Returns `None` once `attempts` random draws have reached `limit`
    /// without finding a free value. With no limit it only returns `Some`.
    fn insert_limited(
        &self,
        mut candidate: u64,
        attempts: &mut u64,
        limit: Option<u64>,
    ) -> Option<u64> {
        let mut tree = self.tree.lock();
        loop {
            if candidate != 0 && candidate & !self.mask == 0 {
                match tree.entry(candidate) {
                    btree_map::Entry::Vacant(slot) => {
                        let entry = Entry::new(candidate);
                        verify(&entry, CheckSite::BeforeInsert);
                        let entry = slot.insert(entry);
                        verify(entry, CheckSite::AfterInsert);
                        UniqueStats::bump(&self.stats.inserted);
                        trace!(value = candidate, draws = *attempts, "unique value inserted");
                        return Some(candidate);
                    }
                    btree_map::Entry::Occupied(slot) => {
                        verify(slot.get(), CheckSite::Collision);
                        UniqueStats::bump(&self.stats.collisions);
                    }
                }
            }
            UniqueStats::bump(&self.stats.rejected);

            if limit.is_some_and(|limit| *attempts >= limit) {
                return None;
            }
            *attempts += 1;
            candidate = MutexGuard::unlocked(&mut tree, || {
                self.source.next_candidate() & self.mask
            });
            trace!(candidate, "unique candidate drawn");
        }
    }

    /// Check whether `value` is live
    pub fn contains(&self, value: u64) -> bool {
        self.tree.lock().contains_key(&value)
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.tree.lock().len()
    }

    /// Check whether no values are live
    pub fn is_empty(&self) -> bool {
        self.tree.lock().is_empty()
    }

    /// Live values in ascending order
    pub fn values(&self) -> Vec<u64> {
        self.tree.lock().keys().copied().collect()
    }

    /// Width of the identifier space in bits
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Mask of valid identifier bits
    pub const fn mask(&self) -> u64 {
        self.mask
    }

    /// Bounded-insertion attempt limit, if any
    pub const fn max_attempts(&self) -> Option<u64> {
        self.max_attempts
    }

    /// Registry statistics
    pub fn stats(&self) -> &UniqueStats {
        &self.stats
    }

    #[cfg(test)]
    fn inject(&self, entry: Entry) {
        self.tree.lock().insert(entry.value(), entry);
    }
}

impl<S> std::fmt::Debug for UniqueRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniqueRegistry")
            .field("bits", &self.bits)
            .field("live", &self.tree.lock().len())
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Guard corruption means the map can no longer be trusted; the process
/// stops here regardless of the build's panic strategy.
fn verify(entry: &Entry, site: CheckSite) {
    if let Err(corruption) = entry.check() {
        error!(%site, value = corruption.value, "unique: guard words modified: {corruption}");
        if unwind_on_corruption() {
            panic!("unique: guard words modified {site}: {corruption}");
        }
        eprintln!("unique: guard words modified {site}: {corruption}");
        std::process::abort();
    }
}

#[cfg(not(test))]
const fn unwind_on_corruption() -> bool {
    false
}

#[cfg(test)]
fn unwind_on_corruption() -> bool {
    tests::UNWIND_ON_CORRUPTION.with(std::cell::Cell::get)
}

/// A value registered by [`UniqueRegistry::pin`], removed on drop
#[must_use = "dropping the guard unregisters the value immediately"]
pub struct UniqueGuard<'a, S: CandidateSource = ThreadRngSource> {
    registry: &'a UniqueRegistry<S>,
    value: u64,
}

impl<S: CandidateSource> UniqueGuard<'_, S> {
    /// The pinned value
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// Keep the value registered and hand ownership of its removal to the
    /// caller
    pub fn into_value(self) -> u64 {
        let value = self.value;
        std::mem::forget(self);
        value
    }
}

impl<S: CandidateSource> Drop for UniqueGuard<'_, S> {
    fn drop(&mut self) {
        self.registry.remove(self.value);
    }
}

impl<S: CandidateSource> std::fmt::Debug for UniqueGuard<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("UniqueGuard").field(&self.value).finish()
    }
}
