//! Game-mode worlds that host warp signs.
//!
//! Each island game mode (sky block, acid island, ...) registers its
//! overworld together with the prefix of its permission nodes.

use std::collections::HashMap;

use tracing::info;
use warps_core::types::WorldId;

/// A game mode owning one overworld.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameModeWorld {
    /// Game mode name, for logs.
    pub game_mode: String,
    /// Permission prefix, e.g. `bskyblock`.
    pub perm_prefix: String,
}

impl GameModeWorld {
    /// Node required to create a warp sign.
    #[must_use]
    pub fn add_warp_permission(&self) -> String {
        format!("{}.island.addwarp", self.perm_prefix)
    }

    /// Node that lets moderators break other players' warp signs.
    #[must_use]
    pub fn remove_sign_permission(&self) -> String {
        format!("{}.mod.removesign", self.perm_prefix)
    }
}

/// The set of worlds in which warp signs are honoured.
///
/// Lookups normalise nether and end dimensions to their overworld.
#[derive(Debug, Clone, Default)]
pub struct RegisteredWorlds {
    worlds: HashMap<WorldId, GameModeWorld>,
}

impl RegisteredWorlds {
    /// No registered worlds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `world` for `game_mode`. A later registration of the same
    /// world replaces the earlier one.
    pub fn register(&mut self, world: &WorldId, game_mode: &str, perm_prefix: &str) {
        let world = world.overworld();
        info!(world = %world, game_mode, "Hooking warp signs into world");
        self.worlds.insert(
            world,
            GameModeWorld {
                game_mode: game_mode.to_string(),
                perm_prefix: perm_prefix.to_string(),
            },
        );
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, world: &str, game_mode: &str, perm_prefix: &str) -> Self {
        self.register(&WorldId::new(world), game_mode, perm_prefix);
        self
    }

    /// The game mode owning `world` or its overworld.
    #[must_use]
    pub fn get(&self, world: &WorldId) -> Option<&GameModeWorld> {
        self.worlds.get(&world.overworld())
    }

    /// Permission prefix of the game mode owning `world`.
    #[must_use]
    pub fn perm_prefix(&self, world: &WorldId) -> Option<&str> {
        self.get(world).map(|gm| gm.perm_prefix.as_str())
    }

    /// Whether `world` belongs to a registered game mode.
    #[must_use]
    pub fn contains(&self, world: &WorldId) -> bool {
        self.get(world).is_some()
    }

    /// Number of registered overworlds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}
