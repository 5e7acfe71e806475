//! # Warps Core Library
//!
//! Game-agnostic registry of player warp signs.
//!
//! Every player may publish one sign per world as a teleport destination.
//! The [`WarpRegistry`] is the single source of truth for "does this player
//! have a warp, and where":
//!
//! - **Registry**: `world → (owner → location)`, one location per owner,
//!   no location shared between owners of the same world
//! - **Persistence**: [`WarpStore`] backends (SQLite, JSON) loaded at start
//!   and flushed on demand
//! - **Configuration**: `warps.toml`, see [`WarpsConfig`]
//!
//! ## Durability Contract
//!
//! Mutations are held in memory and marked dirty. Nothing is written until
//! [`WarpRegistry::save_warp_list`] runs, so mutations made after the last
//! save are lost if the process dies abnormally.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod persistence;
pub mod registry;
pub mod types;

pub use config::WarpsConfig;
pub use error::WarpsError;
pub use persistence::{StoredWarp, WarpStore};
pub use registry::{LoadReport, WarpPage, WarpRegistry};
pub use types::*;
