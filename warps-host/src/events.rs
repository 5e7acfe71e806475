//! Host events consumed by the reactor, and warp events it emits.

use warps_core::types::{BlockLocation, PlayerId};

/// A world mutation reported by the host.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// A block was broken by a player.
    SignBroken(SignBroken),
    /// A player finished editing a sign's text.
    SignTextChanged(SignTextChanged),
}

impl HostEvent {
    /// Whether another handler already cancelled this event.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::SignBroken(e) => e.cancelled,
            Self::SignTextChanged(e) => e.cancelled,
        }
    }
}

/// A block break. The block may or may not be a sign.
#[derive(Debug, Clone)]
pub struct SignBroken {
    /// The broken block.
    pub block: BlockLocation,
    /// Who broke it.
    pub actor: PlayerId,
    /// Already cancelled by an earlier handler.
    pub cancelled: bool,
}

/// New text written to a sign, before the host applies it.
#[derive(Debug, Clone)]
pub struct SignTextChanged {
    /// The sign block.
    pub block: BlockLocation,
    /// Who wrote the text.
    pub actor: PlayerId,
    /// The four lines as typed.
    pub lines: [String; 4],
    /// Already cancelled by an earlier handler.
    pub cancelled: bool,
}

/// Broadcast to other host components (statistics, maps, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarpEvent {
    /// A warp sign became active.
    Created {
        /// The sign block.
        location: BlockLocation,
        /// The warp's owner.
        owner: PlayerId,
    },
    /// A warp stopped existing.
    Removed {
        /// The sign block.
        location: BlockLocation,
        /// The warp's owner.
        owner: PlayerId,
        /// Who caused the removal (the owner, a moderator, or the owner
        /// placing a new sign).
        removed_by: PlayerId,
    },
}
