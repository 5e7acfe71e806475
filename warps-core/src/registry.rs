//! The warp registry: the authoritative `world → (owner → location)` map.
//!
//! Invariants held after every operation:
//! - at most one location per owner in a world (the inner map is keyed by
//!   owner)
//! - a location is claimed by at most one owner in its world (checked by
//!   [`WarpRegistry::add_warp`] and on load)
//!
//! All state sits behind one `parking_lot::RwLock`. Readers get owned
//! snapshots, never references into the map. Mutations bump a generation
//! counter; a save records the generation it wrote so mutations that race a
//! save still leave the registry dirty.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, WarpsError};
use crate::persistence::{StoredWarp, WarpStore};
use crate::types::{BlockLocation, PlayerId, WarpRecord, WorldId};

/// Summary of a [`WarpRegistry::load_warp_list`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows accepted into the registry.
    pub loaded: usize,
    /// Rows with an unparseable owner id.
    pub skipped_malformed: usize,
    /// Rows naming a world that is not active.
    pub dropped_unresolved: usize,
    /// Rows whose block was already claimed by an earlier row.
    pub skipped_duplicate: usize,
}

/// One page of a world's warps, for the browsing panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarpPage {
    /// Warps on this page, ordered by owner id.
    pub entries: Vec<WarpRecord>,
    /// Zero-based page index.
    pub page: usize,
    /// Number of pages for the world (at least 1).
    pub total_pages: usize,
    /// Number of warps in the world.
    pub total: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    warps: HashMap<WorldId, HashMap<PlayerId, BlockLocation>>,
    generation: u64,
    saved_generation: u64,
}

impl RegistryState {
    fn touch(&mut self) {
        self.generation += 1;
    }

    fn claimed(&self, location: &BlockLocation) -> bool {
        self.warps
            .get(&location.world)
            .is_some_and(|owners| owners.values().any(|l| l == location))
    }

    fn snapshot(&self) -> Vec<StoredWarp> {
        self.warps
            .values()
            .flat_map(|owners| {
                owners
                    .iter()
                    .map(|(owner, location)| StoredWarp::from_parts(*owner, location))
            })
            .collect()
    }
}

/// In-memory warp registry shared by the event reactor and the panel.
#[derive(Debug, Default)]
pub struct WarpRegistry {
    state: RwLock<RegistryState>,
}

impl WarpRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Claim `location` as `owner`'s warp.
    ///
    /// Returns `false` without touching the map if any owner in that world
    /// already has this exact block, the same owner included.
    pub fn add_warp(&self, owner: PlayerId, location: BlockLocation) -> bool {
        self.try_add_warp(owner, location).is_ok()
    }

    /// Typed variant of [`add_warp`](Self::add_warp).
    ///
    /// An owner who already holds a different block in the same world has
    /// that entry replaced; the displaced block is returned.
    ///
    /// # Errors
    /// Returns [`WarpsError::DuplicateWarpLocation`] if the block is claimed.
    pub fn try_add_warp(
        &self,
        owner: PlayerId,
        location: BlockLocation,
    ) -> Result<Option<BlockLocation>> {
        let mut state = self.state.write();
        if state.claimed(&location) {
            debug!(owner = %owner, location = %location, "Rejected duplicate warp location");
            return Err(WarpsError::DuplicateWarpLocation { location });
        }

        let world = location.world.clone();
        let displaced = state
            .warps
            .entry(world)
            .or_default()
            .insert(owner, location.clone());
        state.touch();

        if let Some(ref old) = displaced {
            debug!(owner = %owner, old = %old, new = %location, "Warp replaced earlier location");
        } else {
            debug!(owner = %owner, location = %location, "Warp added");
        }
        Ok(displaced)
    }

    /// Remove every warp backed by `location`, whoever owns it.
    ///
    /// Calling this for an unclaimed block is a no-op.
    pub fn remove_warp_at(&self, location: &BlockLocation) {
        let mut state = self.state.write();
        let mut removed = 0usize;
        for owners in state.warps.values_mut() {
            let before = owners.len();
            owners.retain(|_, l| l != location);
            removed += before - owners.len();
        }
        if removed > 0 {
            state.warps.retain(|_, owners| !owners.is_empty());
            state.touch();
            debug!(location = %location, removed, "Warp removed by location");
        }
    }

    /// Remove `owner`'s warp in `world`, if any.
    pub fn remove_warp(&self, world: &WorldId, owner: PlayerId) {
        let mut state = self.state.write();
        let Some(owners) = state.warps.get_mut(world) else {
            return;
        };
        if owners.remove(&owner).is_none() {
            return;
        }
        if owners.is_empty() {
            state.warps.remove(world);
        }
        state.touch();
        debug!(world = %world, owner = %owner, "Warp removed by owner");
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// `owner`'s warp in `world`.
    #[must_use]
    pub fn get_warp(&self, world: &WorldId, owner: PlayerId) -> Option<BlockLocation> {
        self.state
            .read()
            .warps
            .get(world)
            .and_then(|owners| owners.get(&owner))
            .cloned()
    }

    /// Whether `owner` has a warp in `world`.
    #[must_use]
    pub fn has_warp(&self, world: &WorldId, owner: PlayerId) -> bool {
        self.state
            .read()
            .warps
            .get(world)
            .is_some_and(|owners| owners.contains_key(&owner))
    }

    /// Snapshot of `world`'s owner → location map (empty if none).
    ///
    /// The snapshot does not follow later mutations.
    #[must_use]
    pub fn warp_map(&self, world: &WorldId) -> HashMap<PlayerId, BlockLocation> {
        self.state.read().warps.get(world).cloned().unwrap_or_default()
    }

    /// Reverse lookup: who owns the warp on this block.
    #[must_use]
    pub fn owner_at(&self, location: &BlockLocation) -> Option<PlayerId> {
        self.state.read().warps.get(&location.world).and_then(|owners| {
            owners
                .iter()
                .find_map(|(owner, l)| (l == location).then_some(*owner))
        })
    }

    /// Every warp in `world`, ordered by owner id.
    ///
    /// The sequence is a snapshot taken now; call again to restart.
    pub fn list_warps(&self, world: &WorldId) -> std::vec::IntoIter<WarpRecord> {
        let mut records: Vec<WarpRecord> = self
            .state
            .read()
            .warps
            .get(world)
            .map(|owners| {
                owners
                    .iter()
                    .map(|(owner, location)| WarpRecord {
                        owner: *owner,
                        location: location.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by_key(|r| r.owner);
        records.into_iter()
    }

    /// Page `page` (zero-based) of `world`'s warps.
    ///
    /// A `page_size` of zero is treated as one. Pages past the end are empty.
    #[must_use]
    pub fn page(&self, world: &WorldId, page: usize, page_size: usize) -> WarpPage {
        let page_size = page_size.max(1);
        let all: Vec<WarpRecord> = self.list_warps(world).collect();
        let total = all.len();
        let total_pages = total.div_ceil(page_size).max(1);
        let entries = all
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect();
        WarpPage {
            entries,
            page,
            total_pages,
            total,
        }
    }

    /// Number of warps in `world`.
    #[must_use]
    pub fn warp_count(&self, world: &WorldId) -> usize {
        self.state.read().warps.get(world).map_or(0, HashMap::len)
    }

    /// Number of warps across all worlds.
    #[must_use]
    pub fn total_warps(&self) -> usize {
        self.state.read().warps.values().map(HashMap::len).sum()
    }

    /// Worlds that currently hold at least one warp, sorted by name.
    #[must_use]
    pub fn worlds(&self) -> Vec<WorldId> {
        let mut worlds: Vec<WorldId> = self.state.read().warps.keys().cloned().collect();
        worlds.sort();
        worlds
    }

    /// Whether there are mutations not yet written by a save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let state = self.state.read();
        state.generation != state.saved_generation
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Replace the registry contents with the records in `store`.
    ///
    /// `is_active` decides whether a record's world is currently loaded;
    /// records for other worlds are dropped. Bad rows are skipped, never
    /// fatal. The store is read before the registry is touched; the new
    /// contents replace the old under a single write lock. On a store
    /// failure the registry is left empty.
    ///
    /// # Errors
    /// Returns the store's error if it could not be read at all.
    pub fn load_warp_list<F>(&self, store: &dyn WarpStore, is_active: F) -> Result<LoadReport>
    where
        F: Fn(&WorldId) -> bool,
    {
        let start = Instant::now();
        let rows = match store.load_all() {
            Ok(rows) => rows,
            Err(e) => {
                self.install(HashMap::new());
                return Err(e);
            }
        };
        let mut report = LoadReport::default();
        let mut warps: HashMap<WorldId, HashMap<PlayerId, BlockLocation>> = HashMap::new();

        for row in rows {
            let Ok(owner) = PlayerId::parse(&row.owner) else {
                warn!(owner = %row.owner, world = %row.world, "Skipping warp with bad owner id");
                report.skipped_malformed += 1;
                continue;
            };
            let location = row.location();
            if !is_active(&location.world) {
                let err = WarpsError::UnresolvedWorld {
                    world: location.world.clone(),
                };
                debug!(owner = %owner, error = %err, "Dropping warp for inactive world");
                report.dropped_unresolved += 1;
                continue;
            }
            let owners = warps.entry(location.world.clone()).or_default();
            if owners.values().any(|l| *l == location) {
                warn!(owner = %owner, location = %location, "Skipping warp on a claimed block");
                report.skipped_duplicate += 1;
                continue;
            }
            if owners.insert(owner, location).is_some() {
                warn!(owner = %owner, "Owner listed twice in one world; keeping the later row");
            } else {
                report.loaded += 1;
            }
        }

        self.install(warps);

        info!(
            store = %store.describe(),
            loaded = report.loaded,
            malformed = report.skipped_malformed,
            unresolved = report.dropped_unresolved,
            duplicate = report.skipped_duplicate,
            elapsed_us = start.elapsed().as_micros(),
            "Warp list loaded"
        );
        Ok(report)
    }

    /// Swap in freshly loaded contents, which match the store by definition.
    fn install(&self, warps: HashMap<WorldId, HashMap<PlayerId, BlockLocation>>) {
        let mut state = self.state.write();
        state.warps = warps;
        state.touch();
        state.saved_generation = state.generation;
    }

    /// Write every warp to `store`, replacing what it held.
    ///
    /// The snapshot is taken under the read lock and written after the lock
    /// is released. Returns the number of records written.
    ///
    /// # Errors
    /// Returns the store's error; the registry stays dirty in that case.
    pub fn save_warp_list(&self, store: &dyn WarpStore) -> Result<usize> {
        let start = Instant::now();
        let (records, generation) = {
            let state = self.state.read();
            (state.snapshot(), state.generation)
        };

        store.save_all(&records)?;

        {
            let mut state = self.state.write();
            state.saved_generation = state.saved_generation.max(generation);
        }

        info!(
            store = %store.describe(),
            records = records.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Warp list saved"
        );
        Ok(records.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
