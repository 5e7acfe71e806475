//! Addon state, constructed explicitly by the host.
//!
//! [`WarpsContext`] owns the registry, configuration, registered worlds,
//! locale, level provider and store. There is no global instance; the host
//! adapter creates one at enable time and passes it to its listeners.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};
use warps_core::config::WarpsConfig;
use warps_core::error::{Result, WarpsError};
use warps_core::persistence::WarpStore;
use warps_core::registry::{WarpPage, WarpRegistry};
use warps_core::types::{BlockLocation, PlayerId, WorldId};

use crate::collaborators::{LevelProvider, NoLevels, Services, SignBlocks};
use crate::events::HostEvent;
use crate::messages::Locale;
use crate::reactor::{self, Outcome};
use crate::sign::SignKind;
use crate::worlds::RegisteredWorlds;

/// What a warp sign shows, for panel icons and teleport prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInfo {
    /// Sign variant.
    pub kind: SignKind,
    /// The three body lines under the marker.
    pub body: Vec<String>,
}

/// Owned warp signs state for one server.
pub struct WarpsContext {
    registry: WarpRegistry,
    config: WarpsConfig,
    worlds: RegisteredWorlds,
    locale: Locale,
    levels: Box<dyn LevelProvider>,
    store: Box<dyn WarpStore>,
    // Set when the start-up load failed; cleared by `force_save`.
    load_failed: AtomicBool,
}

impl std::fmt::Debug for WarpsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarpsContext")
            .field("store", &self.store.describe())
            .field("worlds", &self.worlds.len())
            .field("warps", &self.registry.total_warps())
            .field("load_failed", &self.store_load_failed())
            .finish_non_exhaustive()
    }
}

impl WarpsContext {
    /// Build the context and load saved warps for `worlds`.
    ///
    /// A failed load is logged and the context starts with no warps. The
    /// store is then protected: [`save`](Self::save) and
    /// [`shutdown`](Self::shutdown) refuse to write it until
    /// [`force_save`](Self::force_save) is called.
    #[must_use]
    pub fn start(config: WarpsConfig, store: Box<dyn WarpStore>, worlds: RegisteredWorlds) -> Self {
        let registry = WarpRegistry::new();
        let load_failed = match registry.load_warp_list(store.as_ref(), |w| worlds.contains(w)) {
            Ok(report) => {
                debug!(loaded = report.loaded, "Warp list restored");
                false
            }
            Err(e) => {
                error!(store = %store.describe(), error = %e, "Warp load failed; starting empty");
                true
            }
        };
        if !config.general.enabled {
            info!("Warp signs disabled by configuration");
        }
        Self {
            registry,
            config,
            worlds,
            locale: Locale::english(),
            levels: Box::new(NoLevels),
            store,
            load_failed: AtomicBool::new(load_failed),
        }
    }

    /// Use `levels` for the island level restriction.
    #[must_use]
    pub fn with_level_provider(mut self, levels: Box<dyn LevelProvider>) -> Self {
        self.levels = levels;
        self
    }

    /// Use `locale` for rendering messages.
    #[must_use]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The warp registry.
    #[must_use]
    pub fn registry(&self) -> &WarpRegistry {
        &self.registry
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &WarpsConfig {
        &self.config
    }

    /// Worlds warp signs are honoured in.
    #[must_use]
    pub fn worlds(&self) -> &RegisteredWorlds {
        &self.worlds
    }

    /// Message templates.
    #[must_use]
    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Island level source.
    #[must_use]
    pub fn levels(&self) -> &dyn LevelProvider {
        self.levels.as_ref()
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Route a host event to the reactor.
    ///
    /// Returns an empty outcome when the feature is disabled or the event
    /// was already cancelled.
    pub fn dispatch(&self, event: &HostEvent, services: &Services<'_>) -> Outcome {
        if !self.config.general.enabled || event.is_cancelled() {
            return Outcome::default();
        }
        match event {
            HostEvent::SignBroken(e) => reactor::on_sign_break(self, services, e),
            HostEvent::SignTextChanged(e) => reactor::on_sign_change(self, services, e),
        }
    }

    // ------------------------------------------------------------------
    // Presentation queries
    // ------------------------------------------------------------------

    /// Whether `world` (or its overworld) is registered.
    #[must_use]
    pub fn in_registered_world(&self, world: &WorldId) -> bool {
        self.worlds.contains(world)
    }

    /// One page of `world`'s warps, sized by `panel.page_size`.
    #[must_use]
    pub fn warps_page(&self, world: &WorldId, page: usize) -> WarpPage {
        self.registry.page(world, page, self.config.panel.page_size)
    }

    /// `owner`'s warp in `world`.
    #[must_use]
    pub fn warp_of(&self, world: &WorldId, owner: PlayerId) -> Option<BlockLocation> {
        self.registry.get_warp(world, owner)
    }

    /// Body text of `owner`'s warp sign. `None` if there is no warp or its
    /// block no longer shows the active marker.
    #[must_use]
    pub fn sign_info(
        &self,
        world: &WorldId,
        owner: PlayerId,
        blocks: &dyn SignBlocks,
    ) -> Option<SignInfo> {
        let location = self.registry.get_warp(world, owner)?;
        let sign = blocks
            .sign_at(&location)
            .filter(|s| s.is_active_warp(&self.config.signs.welcome_line))?;
        let [_, body @ ..] = sign.lines;
        Some(SignInfo {
            kind: sign.kind,
            body: body.into_iter().collect(),
        })
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Whether the start-up load failed and the store is still protected.
    #[must_use]
    pub fn store_load_failed(&self) -> bool {
        self.load_failed.load(Ordering::Acquire)
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.store_load_failed() {
            warn!(store = %self.store.describe(), "Store failed to load; not overwriting it");
            return Err(WarpsError::UnloadedStore {
                store: self.store.describe(),
            });
        }
        Ok(())
    }

    /// Write the full warp set to the store, even if it failed to load at
    /// start. A successful write lifts that protection.
    ///
    /// # Errors
    /// Returns the store's error; the registry stays dirty.
    pub fn force_save(&self) -> Result<usize> {
        let written = self.registry.save_warp_list(self.store.as_ref())?;
        if self.load_failed.swap(false, Ordering::AcqRel) {
            info!(store = %self.store.describe(), "Store overwritten after a failed load");
        }
        Ok(written)
    }

    /// Write the warp set if it changed since the last save.
    ///
    /// Returns `Ok(None)` when nothing needed writing.
    ///
    /// # Errors
    /// Returns `WarpsError::UnloadedStore` if the store failed to load at
    /// start, otherwise the store's error. The registry stays dirty.
    pub fn save(&self) -> Result<Option<usize>> {
        self.ensure_loaded()?;
        if !self.registry.is_dirty() {
            debug!("Warp list unchanged; skipping save");
            return Ok(None);
        }
        self.force_save().map(Some)
    }

    /// Save on a blocking worker so the caller's task is not held up.
    ///
    /// # Errors
    /// Returns the save error, or `WarpsError::Io` if the worker panicked.
    pub async fn save_async(self: Arc<Self>) -> Result<Option<usize>> {
        tokio::task::spawn_blocking(move || self.save())
            .await
            .map_err(|e| WarpsError::Io(std::io::Error::other(e)))?
    }

    /// Backup then final save at disable time.
    ///
    /// The backup is taken first so it holds the previous save. A failed
    /// backup is logged; a failed or refused save is returned.
    ///
    /// # Errors
    /// Returns `WarpsError::UnloadedStore` if the store failed to load at
    /// start, otherwise the save error.
    pub fn shutdown(&self) -> Result<usize> {
        if let Err(e) = self.store.backup() {
            warn!(store = %self.store.describe(), error = %e, "Warp store backup failed");
        }
        self.ensure_loaded()?;
        let written = self.force_save()?;
        info!(warps = written, "Warp signs shut down");
        Ok(written)
    }
}
