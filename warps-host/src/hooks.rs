//! Integration hooks for the host's listeners.
//!
//! The host adapter owns the event subscription. From each listener it
//! builds a [`HostEvent`] with these constructors and hands it to
//! [`WarpsContext::dispatch`](crate::WarpsContext::dispatch).

use warps_core::types::{BlockLocation, PlayerId, WorldId};

use crate::events::{HostEvent, SignBroken, SignTextChanged};

/// Create a break event from the host's block-break listener.
#[must_use]
pub fn on_block_break(
    world: WorldId,
    x: i32,
    y: i32,
    z: i32,
    actor: PlayerId,
    cancelled: bool,
) -> HostEvent {
    HostEvent::SignBroken(SignBroken {
        block: BlockLocation::new(world, x, y, z),
        actor,
        cancelled,
    })
}

/// Create a sign-change event from the host's sign editor listener.
///
/// Missing lines are filled with empty strings; extra lines are ignored.
#[must_use]
pub fn on_sign_change<S: AsRef<str>>(
    world: WorldId,
    x: i32,
    y: i32,
    z: i32,
    actor: PlayerId,
    lines: &[S],
    cancelled: bool,
) -> HostEvent {
    let mut text: [String; 4] = Default::default();
    for (slot, line) in text.iter_mut().zip(lines) {
        *slot = line.as_ref().to_string();
    }
    HostEvent::SignTextChanged(SignTextChanged {
        block: BlockLocation::new(world, x, y, z),
        actor,
        lines: text,
        cancelled,
    })
}
