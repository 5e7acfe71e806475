//! Localized player messages.
//!
//! The reactor never formats text. It returns [`Message`]s (a key plus
//! placeholder values) and the host renders them through a [`Locale`],
//! which may be overridden from a TOML file.

use std::collections::HashMap;
use std::fmt;

use warps_core::error::{Result, WarpsError};

use crate::sign::{ALT_COLOR_CHAR, translate_color_codes};

/// Every message the warp signs feature can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Warp sign created.
    Success,
    /// Block already holds a warp.
    Duplicate,
    /// Missing the add-warp permission.
    NoPermission,
    /// Follow-up naming the missing permission node.
    YouNeed,
    /// Island level below the configured restriction.
    NotEnoughLevel,
    /// Follow-up stating the current and required level.
    YourLevelIs,
    /// Sign placed outside the player's own island.
    NotOnIsland,
    /// An older warp sign was turned off.
    Deactivate,
    /// Not allowed to break someone else's warp sign.
    NoRemove,
}

impl MessageKey {
    /// All keys, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Success,
        Self::Duplicate,
        Self::NoPermission,
        Self::YouNeed,
        Self::NotEnoughLevel,
        Self::YourLevelIs,
        Self::NotOnIsland,
        Self::Deactivate,
        Self::NoRemove,
    ];

    /// Dotted locale key.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Success => "warps.success",
            Self::Duplicate => "warps.error.duplicate",
            Self::NoPermission => "warps.error.no-permission",
            Self::YouNeed => "general.errors.you-need",
            Self::NotEnoughLevel => "warps.error.not-enough-level",
            Self::YourLevelIs => "warps.error.your-level-is",
            Self::NotOnIsland => "warps.error.not-on-island",
            Self::Deactivate => "warps.deactivate",
            Self::NoRemove => "warps.error.no-remove",
        }
    }

    fn english(self) -> &'static str {
        match self {
            Self::Success => "&aSuccess!",
            Self::Duplicate => "&cSorry! There is a sign already in that location!",
            Self::NoPermission => "&cYou do not have permission to do that!",
            Self::YouNeed => "&cYou need [permission]",
            Self::NotEnoughLevel => "&cYour island level is not high enough!",
            Self::YourLevelIs => {
                "&cYour island level is only [level] and must be higher than [required]"
            }
            Self::NotOnIsland => "&cYou must be on your island to do that!",
            Self::Deactivate => "&cOld warp sign deactivated!",
            Self::NoRemove => "&cYou cannot remove that sign!",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A message to render for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// What to say.
    pub key: MessageKey,
    /// `[name]` placeholder substitutions.
    pub placeholders: Vec<(&'static str, String)>,
}

impl Message {
    /// A message with no placeholders.
    #[must_use]
    pub fn new(key: MessageKey) -> Self {
        Self {
            key,
            placeholders: Vec::new(),
        }
    }

    /// Add a placeholder value.
    #[must_use]
    pub fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        self.placeholders.push((name, value.to_string()));
        self
    }

    /// Value bound to `name`, if any.
    #[must_use]
    pub fn placeholder(&self, name: &str) -> Option<&str> {
        self.placeholders
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Message templates by dotted key.
#[derive(Debug, Clone)]
pub struct Locale {
    templates: HashMap<String, String>,
}

impl Default for Locale {
    fn default() -> Self {
        Self::english()
    }
}

impl Locale {
    /// Built-in English templates.
    #[must_use]
    pub fn english() -> Self {
        let templates = MessageKey::ALL
            .iter()
            .map(|k| (k.key().to_string(), k.english().to_string()))
            .collect();
        Self { templates }
    }

    /// English templates overridden by a TOML locale file.
    ///
    /// Keys may be nested tables (`[warps.error] duplicate = "..."`) or
    /// quoted dotted keys. Non-string values are ignored.
    ///
    /// # Errors
    /// Returns `WarpsError::Config` if the TOML does not parse.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let table: toml::Table =
            toml::from_str(toml_str).map_err(|e| WarpsError::Config(format!("locale: {e}")))?;
        let mut locale = Self::english();
        flatten(&mut locale.templates, "", &table);
        Ok(locale)
    }

    /// Render `message` with placeholders filled and colour codes applied.
    /// An unknown template renders as its key.
    #[must_use]
    pub fn render(&self, message: &Message) -> String {
        let key = message.key.key();
        let mut text = self.templates.get(key).cloned().unwrap_or_else(|| key.to_string());
        for (name, value) in &message.placeholders {
            text = text.replace(&format!("[{name}]"), value);
        }
        translate_color_codes(ALT_COLOR_CHAR, &text)
    }
}

fn flatten(out: &mut HashMap<String, String>, prefix: &str, table: &toml::Table) {
    for (name, value) in table {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        match value {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(t) => flatten(out, &key, t),
            _ => {}
        }
    }
}
