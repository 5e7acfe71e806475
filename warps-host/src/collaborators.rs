//! Host services the reactor calls into.
//!
//! Each trait is a narrow slice of the host API. The host adapter implements
//! them over the real server; tests implement them over plain maps.

use warps_core::types::{BlockLocation, PlayerId, WorldId};

use crate::sign::SignState;

/// Read and update sign blocks in loaded worlds.
pub trait SignBlocks {
    /// The sign at `location`, or `None` if the block is not a sign.
    fn sign_at(&self, location: &BlockLocation) -> Option<SignState>;

    /// Rewrite one line (0..=3) of the sign at `location` and push the
    /// update to clients. Does nothing if the block is not a sign.
    fn set_sign_line(&self, location: &BlockLocation, index: usize, text: &str);
}

/// Permission and operator checks.
pub trait Permissions {
    /// Whether `player` holds the permission node `node`.
    fn has_permission(&self, player: PlayerId, node: &str) -> bool;

    /// Whether `player` is a server operator.
    fn is_op(&self, player: PlayerId) -> bool;
}

/// Island (territory) membership.
pub trait Territory {
    /// Whether `player` currently stands within their own island in `world`.
    fn is_on_own_territory(&self, world: &WorldId, player: PlayerId) -> bool;
}

/// Island level lookup, provided by an optional levelling addon.
pub trait LevelProvider: Send + Sync {
    /// `player`'s island level in `world`. May be negative.
    fn level(&self, world: &WorldId, player: PlayerId) -> i64;
}

/// Used when no levelling addon is installed: everyone is level 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLevels;

impl LevelProvider for NoLevels {
    fn level(&self, _world: &WorldId, _player: PlayerId) -> i64 {
        0
    }
}

/// The host services needed to handle one event.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    /// Sign block access.
    pub blocks: &'a dyn SignBlocks,
    /// Permission checks.
    pub permissions: &'a dyn Permissions,
    /// Island membership.
    pub territory: &'a dyn Territory,
}
