//! Core type definitions for the warps system.
//!
//! All types are serializable and hashable so they can key maps directly.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Create a new random player ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a hyphenated or simple UUID string.
    ///
    /// # Errors
    /// Returns the underlying [`uuid::Error`] if `s` is not a UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Suffix the host appends to a nether dimension world name.
pub const NETHER_SUFFIX: &str = "_nether";
/// Suffix the host appends to an end dimension world name.
pub const THE_END_SUFFIX: &str = "_the_end";

/// Identifier for a game world, by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorldId(pub String);

impl WorldId {
    /// Create a world id from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The world name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// The overworld this world belongs to.
    ///
    /// Nether and end dimensions share their overworld's registration, so
    /// `skyblock_nether` and `skyblock_the_end` both map to `skyblock`.
    #[must_use]
    pub fn overworld(&self) -> Self {
        let name = self
            .0
            .strip_suffix(THE_END_SUFFIX)
            .or_else(|| self.0.strip_suffix(NETHER_SUFFIX))
            .unwrap_or(&self.0);
        Self(name.to_string())
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A block position in a specific world.
///
/// Equality is structural: two locations are the same warp block only if
/// world and all three coordinates match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockLocation {
    /// World the block is in.
    pub world: WorldId,
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl BlockLocation {
    /// Create a block location.
    #[must_use]
    pub fn new(world: WorldId, x: i32, y: i32, z: i32) -> Self {
        Self { world, x, y, z }
    }

    /// The block containing an entity-space position.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_position(world: WorldId, x: f64, y: f64, z: f64) -> Self {
        Self {
            world,
            x: x.floor() as i32,
            y: y.floor() as i32,
            z: z.floor() as i32,
        }
    }
}

impl fmt::Display for BlockLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.world, self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One published warp: who owns it and which block backs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WarpRecord {
    /// The player the warp belongs to.
    pub owner: PlayerId,
    /// The sign block.
    pub location: BlockLocation,
}
