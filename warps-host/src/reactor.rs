//! Warp sign reactor.
//!
//! Decides what a sign break or sign edit means for the registry. Handlers
//! never talk to players directly: they return an [`Outcome`] listing the
//! messages to send, warp events to broadcast, whether to cancel the host
//! event and the final sign text.
//!
//! ## Sign change
//!
//! 1. Ignore events outside registered worlds or whose first line is not
//!    the welcome text.
//! 2. Require `<prefix>.island.addwarp` and the configured island level.
//! 3. Outside the player's own island the sign is marked inactive.
//! 4. An older active sign of the same owner is deactivated and removed.
//! 5. The new block is claimed; the marker turns green on success, red on
//!    a duplicate.
//!
//! ## Sign break
//!
//! Breaking an active warp sign removes the warp if the breaker owns it, is
//! an operator or holds `<prefix>.mod.removesign`. Anyone else has the break
//! cancelled.

use tracing::{debug, info};
use warps_core::types::PlayerId;

use crate::collaborators::Services;
use crate::context::WarpsContext;
use crate::events::{SignBroken, SignTextChanged, WarpEvent};
use crate::messages::{Locale, Message, MessageKey};
use crate::sign::{active_marker, eq_ignore_case, inactive_marker, translate_body_lines};

/// What the host should do after a handler ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Messages to send, in order.
    pub messages: Vec<(PlayerId, Message)>,
    /// Warp events to broadcast, in order.
    pub events: Vec<WarpEvent>,
    /// Cancel the host event.
    pub cancel: bool,
    /// Replacement sign text for a sign change event.
    pub lines: Option<[String; 4]>,
}

impl Outcome {
    fn tell(&mut self, player: PlayerId, message: Message) {
        self.messages.push((player, message));
    }

    /// Whether the handler left the event alone.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }

    /// Messages rendered through `locale`.
    #[must_use]
    pub fn render_messages(&self, locale: &Locale) -> Vec<(PlayerId, String)> {
        self.messages
            .iter()
            .map(|(player, msg)| (*player, locale.render(msg)))
            .collect()
    }
}

/// Handle a broken block.
pub fn on_sign_break(ctx: &WarpsContext, services: &Services<'_>, event: &SignBroken) -> Outcome {
    let mut outcome = Outcome::default();
    if event.cancelled {
        return outcome;
    }
    let Some(game_mode) = ctx.worlds().get(&event.block.world) else {
        return outcome;
    };
    let Some(sign) = services.blocks.sign_at(&event.block) else {
        return outcome;
    };
    if !sign.is_active_warp(&ctx.config().signs.welcome_line) {
        return outcome;
    }
    let Some(owner) = ctx.registry().owner_at(&event.block) else {
        return outcome;
    };

    let breaker = event.actor;
    let allowed = owner == breaker
        || services.permissions.is_op(breaker)
        || services
            .permissions
            .has_permission(breaker, &game_mode.remove_sign_permission());

    if allowed {
        ctx.registry().remove_warp_at(&event.block);
        info!(location = %event.block, owner = %owner, removed_by = %breaker, "Warp sign broken");
        outcome.events.push(WarpEvent::Removed {
            location: event.block.clone(),
            owner,
            removed_by: breaker,
        });
    } else {
        debug!(location = %event.block, breaker = %breaker, "Refused to break foreign warp sign");
        outcome.tell(breaker, Message::new(MessageKey::NoRemove));
        outcome.cancel = true;
    }
    outcome
}

/// Handle new text written to a sign.
pub fn on_sign_change(
    ctx: &WarpsContext,
    services: &Services<'_>,
    event: &SignTextChanged,
) -> Outcome {
    let mut outcome = Outcome::default();
    if event.cancelled {
        return outcome;
    }
    let Some(game_mode) = ctx.worlds().get(&event.block.world) else {
        return outcome;
    };
    let signs = &ctx.config().signs;
    let welcome = signs.welcome_line.as_str();
    if !eq_ignore_case(&event.lines[0], welcome) {
        return outcome;
    }

    let player = event.actor;
    let world = &event.block.world;

    // ---- gating ----

    let node = game_mode.add_warp_permission();
    if !services.permissions.has_permission(player, &node) {
        outcome.tell(player, Message::new(MessageKey::NoPermission));
        outcome.tell(player, Message::new(MessageKey::YouNeed).with("permission", node));
        return outcome;
    }

    let level = ctx.levels().level(world, player);
    if level < signs.warp_level_restriction {
        outcome.tell(player, Message::new(MessageKey::NotEnoughLevel));
        outcome.tell(
            player,
            Message::new(MessageKey::YourLevelIs)
                .with("level", level)
                .with("required", signs.warp_level_restriction),
        );
        return outcome;
    }

    if !services.territory.is_on_own_territory(world, player) {
        outcome.tell(player, Message::new(MessageKey::NotOnIsland));
        let mut lines = event.lines.clone();
        lines[0] = inactive_marker(welcome);
        outcome.lines = Some(lines);
        return outcome;
    }

    // ---- retire the previous sign ----

    if let Some(old) = ctx.registry().get_warp(world, player) {
        let still_active = services
            .blocks
            .sign_at(&old)
            .is_some_and(|s| s.is_active_warp(welcome));
        if still_active {
            services.blocks.set_sign_line(&old, 0, &inactive_marker(welcome));
            outcome.tell(player, Message::new(MessageKey::Deactivate));
            ctx.registry().remove_warp(world, player);
            debug!(owner = %player, old = %old, "Deactivated previous warp sign");
            outcome.events.push(WarpEvent::Removed {
                location: old,
                owner: player,
                removed_by: player,
            });
        }
    }

    // ---- claim ----

    let mut lines = event.lines.clone();
    translate_body_lines(&mut lines);
    match ctx.registry().try_add_warp(player, event.block.clone()) {
        Ok(displaced) => {
            // Earlier entry whose sign is already gone.
            if let Some(old) = displaced {
                outcome.events.push(WarpEvent::Removed {
                    location: old,
                    owner: player,
                    removed_by: player,
                });
            }
            lines[0] = active_marker(welcome);
            outcome.tell(player, Message::new(MessageKey::Success));
            info!(owner = %player, location = %event.block, "Warp sign created");
            outcome.events.push(WarpEvent::Created {
                location: event.block.clone(),
                owner: player,
            });
        }
        Err(e) => {
            debug!(owner = %player, error = %e, "Warp sign rejected");
            lines[0] = inactive_marker(welcome);
            outcome.tell(player, Message::new(MessageKey::Duplicate));
        }
    }
    outcome.lines = Some(lines);
    outcome
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    use warps_core::config::WarpsConfig;
    use warps_core::persistence::SqliteWarpStore;
    use warps_core::types::{BlockLocation, WorldId};

    use super::*;
    use crate::collaborators::{LevelProvider, Permissions, SignBlocks, Territory};
    use crate::hooks;
    use crate::sign::{GREEN, RED, SignKind, SignState};
    use crate::worlds::RegisteredWorlds;
    use crate::HostEvent;

    // ---------------------------------------------------------------------------
    // Fake host
    // ---------------------------------------------------------------------------

    #[derive(Default)]
    struct FakeHost {
        signs: RefCell<HashMap<BlockLocation, SignState>>,
        perms: HashSet<(PlayerId, String)>,
        ops: HashSet<PlayerId>,
        on_island: HashSet<PlayerId>,
    }

    impl FakeHost {
        fn place<S: AsRef<str>>(&self, at: &BlockLocation, lines: &[S]) {
            self.signs
                .borrow_mut()
                .insert(at.clone(), SignState::new(SignKind::Standing, lines));
        }

        fn line0(&self, at: &BlockLocation) -> String {
            self.signs.borrow()[at].lines[0].clone()
        }

        /// Permission, on-island and nothing else: the happy path.
        fn allow(&mut self, player: PlayerId) {
            self.perms.insert((player, "bskyblock.island.addwarp".into()));
            self.on_island.insert(player);
        }

        fn services(&self) -> Services<'_> {
            Services {
                blocks: self,
                permissions: self,
                territory: self,
            }
        }
    }

    impl SignBlocks for FakeHost {
        fn sign_at(&self, location: &BlockLocation) -> Option<SignState> {
            self.signs.borrow().get(location).cloned()
        }

        fn set_sign_line(&self, location: &BlockLocation, index: usize, text: &str) {
            if let Some(sign) = self.signs.borrow_mut().get_mut(location) {
                sign.lines[index] = text.to_string();
            }
        }
    }

    impl Permissions for FakeHost {
        fn has_permission(&self, player: PlayerId, node: &str) -> bool {
            self.perms.contains(&(player, node.to_string()))
        }

        fn is_op(&self, player: PlayerId) -> bool {
            self.ops.contains(&player)
        }
    }

    impl Territory for FakeHost {
        fn is_on_own_territory(&self, _world: &WorldId, player: PlayerId) -> bool {
            self.on_island.contains(&player)
        }
    }

    struct FixedLevels(HashMap<PlayerId, i64>);

    impl LevelProvider for FixedLevels {
        fn level(&self, _world: &WorldId, player: PlayerId) -> i64 {
            self.0.get(&player).copied().unwrap_or_default()
        }
    }

    fn world() -> WorldId {
        WorldId::new("bskyblock_world")
    }

    fn at(x: i32) -> BlockLocation {
        BlockLocation::new(world(), x, 64, 0)
    }

    fn context_with(config: WarpsConfig) -> WarpsContext {
        let store = SqliteWarpStore::open_in_memory().expect("store");
        let worlds = RegisteredWorlds::new().with("bskyblock_world", "BSkyBlock", "bskyblock");
        WarpsContext::start(config, Box::new(store), worlds)
    }

    fn context() -> WarpsContext {
        context_with(WarpsConfig::default())
    }

    /// Context with a level restriction and one player's known level.
    fn levelled(restriction: i64, player: PlayerId, level: i64) -> WarpsContext {
        let mut config = WarpsConfig::default();
        config.signs.warp_level_restriction = restriction;
        let levels = FixedLevels(HashMap::from([(player, level)]));
        context_with(config).with_level_provider(Box::new(levels))
    }

    fn write(
        ctx: &WarpsContext,
        host: &FakeHost,
        player: PlayerId,
        block: &BlockLocation,
        lines: &[&str],
    ) -> Outcome {
        let BlockLocation { world, x, y, z } = block.clone();
        let event = hooks::on_sign_change(world, x, y, z, player, lines, false);
        ctx.dispatch(&event, &host.services())
    }

    fn break_block(
        ctx: &WarpsContext,
        host: &FakeHost,
        player: PlayerId,
        block: &BlockLocation,
    ) -> Outcome {
        let BlockLocation { world, x, y, z } = block.clone();
        let event = hooks::on_block_break(world, x, y, z, player, false);
        ctx.dispatch(&event, &host.services())
    }

    fn keys(outcome: &Outcome) -> Vec<MessageKey> {
        outcome.messages.iter().map(|(_, m)| m.key).collect()
    }

    // ---------------------------------------------------------------------------
    // Sign change
    // ---------------------------------------------------------------------------

    #[test]
    fn creates_warp_and_colours_lines() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        host.allow(alice);

        let outcome = write(&ctx, &host, alice, &at(1), &["[welcome]", "&bAlice's", "shop"]);
        let lines = outcome.lines.clone().expect("lines");
        assert_eq!(lines[0], format!("{GREEN}[WELCOME]"));
        assert_eq!(lines[1], "\u{a7}bAlice's");
        assert_eq!(keys(&outcome), [MessageKey::Success]);
        assert_eq!(
            outcome.events,
            [WarpEvent::Created {
                location: at(1),
                owner: alice
            }]
        );
        assert_eq!(ctx.warp_of(&world(), alice), Some(at(1)));
    }

    #[test]
    fn ignores_other_text_and_unregistered_worlds() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        host.allow(alice);

        assert!(write(&ctx, &host, alice, &at(1), &["For sale"]).is_noop());
        let lobby = BlockLocation::new(WorldId::new("lobby"), 0, 0, 0);
        assert!(write(&ctx, &host, alice, &lobby, &["[WELCOME]"]).is_noop());
        assert_eq!(ctx.registry().total_warps(), 0);
    }

    #[test]
    fn nether_signs_count_as_registered() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        host.allow(alice);
        let nether = BlockLocation::new(WorldId::new("bskyblock_world_nether"), 0, 40, 0);

        let outcome = write(&ctx, &host, alice, &nether, &["[WELCOME]"]);
        assert_eq!(keys(&outcome), [MessageKey::Success]);
    }

    #[test]
    fn missing_permission_names_node() {
        let ctx = context();
        let host = FakeHost::default();
        let bob = PlayerId::new();

        let outcome = write(&ctx, &host, bob, &at(1), &["[WELCOME]"]);
        assert_eq!(keys(&outcome), [MessageKey::NoPermission, MessageKey::YouNeed]);
        assert_eq!(
            outcome.messages[1].1.placeholder("permission"),
            Some("bskyblock.island.addwarp")
        );
        assert_eq!(outcome.lines, None);
        assert_eq!(ctx.registry().total_warps(), 0);
    }

    #[test]
    fn level_restriction_reports_levels() {
        let alice = PlayerId::new();
        let ctx = levelled(10, alice, 4);
        let mut host = FakeHost::default();
        host.allow(alice);

        let outcome = write(&ctx, &host, alice, &at(1), &["[WELCOME]"]);
        assert_eq!(keys(&outcome), [MessageKey::NotEnoughLevel, MessageKey::YourLevelIs]);
        let detail = &outcome.messages[1].1;
        assert_eq!(detail.placeholder("level"), Some("4"));
        assert_eq!(detail.placeholder("required"), Some("10"));
        assert_eq!(ctx.registry().total_warps(), 0);
    }

    #[test]
    fn negative_level_fails_zero_restriction() {
        let alice = PlayerId::new();
        let ctx = levelled(0, alice, -1);
        let mut host = FakeHost::default();
        host.allow(alice);

        let outcome = write(&ctx, &host, alice, &at(1), &["[WELCOME]"]);
        assert_eq!(keys(&outcome), [MessageKey::NotEnoughLevel, MessageKey::YourLevelIs]);
        assert_eq!(outcome.messages[1].1.placeholder("level"), Some("-1"));
        assert_eq!(ctx.registry().total_warps(), 0);
    }

    #[test]
    fn level_at_restriction_passes() {
        let alice = PlayerId::new();
        let ctx = levelled(10, alice, 10);
        let mut host = FakeHost::default();
        host.allow(alice);

        assert_eq!(keys(&write(&ctx, &host, alice, &at(1), &["[WELCOME]"])), [MessageKey::Success]);
    }

    #[test]
    fn off_island_marks_sign_red() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        host.allow(alice);
        host.on_island.clear();

        let outcome = write(&ctx, &host, alice, &at(1), &["[WELCOME]", "&bhi"]);
        assert_eq!(keys(&outcome), [MessageKey::NotOnIsland]);
        let lines = outcome.lines.expect("lines");
        assert_eq!(lines[0], format!("{RED}[WELCOME]"));
        assert_eq!(lines[1], "&bhi");
        assert_eq!(ctx.registry().total_warps(), 0);
    }

    #[test]
    fn new_sign_deactivates_previous_one() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        host.allow(alice);

        write(&ctx, &host, alice, &at(1), &["[WELCOME]"]);
        host.place(&at(1), &[active_marker("[WELCOME]")]);

        let outcome = write(&ctx, &host, alice, &at(2), &["[WELCOME]"]);
        assert_eq!(keys(&outcome), [MessageKey::Deactivate, MessageKey::Success]);
        assert_eq!(host.line0(&at(1)), format!("{RED}[WELCOME]"));
        assert_eq!(
            outcome.events,
            [
                WarpEvent::Removed {
                    location: at(1),
                    owner: alice,
                    removed_by: alice
                },
                WarpEvent::Created {
                    location: at(2),
                    owner: alice
                },
            ]
        );
        assert_eq!(ctx.warp_of(&world(), alice), Some(at(2)));
        assert_eq!(ctx.registry().warp_count(&world()), 1);
    }

    #[test]
    fn stale_previous_warp_is_replaced_without_deactivate() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        host.allow(alice);

        // The old block is no longer a sign.
        write(&ctx, &host, alice, &at(1), &["[WELCOME]"]);

        let outcome = write(&ctx, &host, alice, &at(2), &["[WELCOME]"]);
        assert_eq!(keys(&outcome), [MessageKey::Success]);
        assert_eq!(ctx.registry().owner_at(&at(1)), None);
        assert_eq!(ctx.warp_of(&world(), alice), Some(at(2)));
        assert!(outcome.events.contains(&WarpEvent::Removed {
            location: at(1),
            owner: alice,
            removed_by: alice
        }));
    }

    #[test]
    fn duplicate_block_turns_red() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        let bob = PlayerId::new();
        host.allow(alice);
        host.allow(bob);

        write(&ctx, &host, alice, &at(1), &["[WELCOME]"]);
        let outcome = write(&ctx, &host, bob, &at(1), &["[WELCOME]"]);
        assert_eq!(keys(&outcome), [MessageKey::Duplicate]);
        assert_eq!(outcome.lines.expect("lines")[0], format!("{RED}[WELCOME]"));
        assert!(outcome.events.is_empty());
        assert_eq!(ctx.registry().owner_at(&at(1)), Some(alice));
        assert_eq!(ctx.warp_of(&world(), bob), None);
    }

    #[test]
    fn cancelled_and_disabled_events_are_ignored() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        host.allow(alice);
        let event = hooks::on_sign_change(world(), 1, 64, 0, alice, &["[WELCOME]"], true);
        assert!(ctx.dispatch(&event, &host.services()).is_noop());

        let mut config = WarpsConfig::default();
        config.general.enabled = false;
        let disabled = context_with(config);
        assert!(write(&disabled, &host, alice, &at(1), &["[WELCOME]"]).is_noop());
        assert_eq!(disabled.registry().total_warps(), 0);
    }

    // ---------------------------------------------------------------------------
    // Sign break
    // ---------------------------------------------------------------------------

    fn with_warp(host: &mut FakeHost, ctx: &WarpsContext, owner: PlayerId, block: &BlockLocation) {
        host.allow(owner);
        write(ctx, host, owner, block, &["[WELCOME]"]);
        host.place(block, &[active_marker("[WELCOME]")]);
    }

    #[test]
    fn owner_breaks_own_sign() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        with_warp(&mut host, &ctx, alice, &at(1));

        let outcome = break_block(&ctx, &host, alice, &at(1));
        assert!(!outcome.cancel);
        assert!(outcome.messages.is_empty());
        assert_eq!(
            outcome.events,
            [WarpEvent::Removed {
                location: at(1),
                owner: alice,
                removed_by: alice
            }]
        );
        assert_eq!(ctx.registry().total_warps(), 0);
    }

    #[test]
    fn stranger_cannot_break_sign() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        let mallory = PlayerId::new();
        with_warp(&mut host, &ctx, alice, &at(1));

        let outcome = break_block(&ctx, &host, mallory, &at(1));
        assert!(outcome.cancel);
        assert_eq!(keys(&outcome), [MessageKey::NoRemove]);
        assert_eq!(outcome.messages[0].0, mallory);
        assert_eq!(ctx.registry().owner_at(&at(1)), Some(alice));
    }

    #[test]
    fn moderator_and_op_may_break() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        let moderator = PlayerId::new();
        let op = PlayerId::new();
        host.perms.insert((moderator, "bskyblock.mod.removesign".into()));
        host.ops.insert(op);

        with_warp(&mut host, &ctx, alice, &at(1));
        let outcome = break_block(&ctx, &host, moderator, &at(1));
        assert_eq!(
            outcome.events,
            [WarpEvent::Removed {
                location: at(1),
                owner: alice,
                removed_by: moderator
            }]
        );

        with_warp(&mut host, &ctx, alice, &at(2));
        assert!(!break_block(&ctx, &host, op, &at(2)).cancel);
        assert_eq!(ctx.registry().total_warps(), 0);
    }

    #[test]
    fn cancelled_break_is_ignored() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        let mallory = PlayerId::new();
        with_warp(&mut host, &ctx, alice, &at(1));

        let BlockLocation { world, x, y, z } = at(1);
        let event = hooks::on_block_break(world, x, y, z, alice, true);
        assert!(ctx.dispatch(&event, &host.services()).is_noop());

        let HostEvent::SignBroken(mut broken) = event else {
            panic!("expected break");
        };
        broken.actor = mallory;
        assert!(on_sign_break(&ctx, &host.services(), &broken).is_noop());
        assert_eq!(ctx.registry().owner_at(&at(1)), Some(alice));
    }

    #[test]
    fn break_ignores_plain_and_inactive_signs() {
        let ctx = context();
        let mut host = FakeHost::default();
        let alice = PlayerId::new();
        let mallory = PlayerId::new();
        with_warp(&mut host, &ctx, alice, &at(1));

        // Red marker: not an active warp sign.
        host.place(&at(1), &[inactive_marker("[WELCOME]")]);
        assert!(break_block(&ctx, &host, mallory, &at(1)).is_noop());

        // Green marker but not in the registry.
        host.place(&at(5), &[active_marker("[WELCOME]")]);
        assert!(break_block(&ctx, &host, mallory, &at(5)).is_noop());

        // Not a sign at all.
        assert!(break_block(&ctx, &host, mallory, &at(9)).is_noop());

        assert_eq!(ctx.registry().owner_at(&at(1)), Some(alice));
    }

    #[test]
    fn messages_render_through_locale() {
        let ctx = context();
        let host = FakeHost::default();
        let bob = PlayerId::new();
        let event: HostEvent = hooks::on_sign_change(world(), 0, 0, 0, bob, &["[WELCOME]"], false);
        let rendered = ctx.dispatch(&event, &host.services()).render_messages(ctx.locale());
        assert_eq!(rendered[1], (bob, "\u{a7}cYou need bskyblock.island.addwarp".to_string()));
    }
}
