//! # warps-host: Host Integration for Warp Signs
//!
//! This crate sits between the game-agnostic `warps-core` registry and the
//! host game server's world, permission and event APIs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │               Host server                 │
//! │   block break / sign change events        │
//! │  ┌────────────────────────────────────┐  │
//! │  │           warps-host               │  │
//! │  │  ┌──────────┐   ┌───────────────┐  │  │
//! │  │  │  hooks   │──▶│    reactor    │  │  │
//! │  │  └──────────┘   └───────┬───────┘  │  │
//! │  │   collaborators ◀───────┤          │  │
//! │  │                         ▼          │  │
//! │  │    ┌──────────────────────────┐    │  │
//! │  │    │        warps-core        │    │  │
//! │  │    │  registry · persistence  │    │  │
//! │  │    └──────────────────────────┘    │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `context`: the explicitly constructed addon state (registry, config, worlds)
//! - `events`: incoming host events and outgoing warp events
//! - `hooks`: constructors the host adapter calls from its listeners
//! - `reactor`: sign break / sign change decision logic
//! - `collaborators`: traits standing in for host services
//! - `sign`: marker text and colour codes
//! - `messages`: localized player messages
//! - `worlds`: game-mode world registration
//! - `telemetry`: `tracing` subscriber setup

pub mod collaborators;
pub mod context;
pub mod events;
pub mod hooks;
pub mod messages;
pub mod reactor;
pub mod sign;
pub mod telemetry;
pub mod worlds;

pub use context::WarpsContext;
pub use events::{HostEvent, WarpEvent};
pub use reactor::Outcome;
