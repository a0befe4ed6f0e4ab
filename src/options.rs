//! Loader configuration and the per-game options store.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::objects::ClassId;

/// Options consulted while loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreOptions {
    /// Active game identifier, if any.
    pub game: Option<String>,
    /// Kinds registered as placeholders without attempting construction.
    pub ignore_class_ids: BTreeSet<ClassId>,
    pub game_options: GameOptions,
}

impl CoreOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let mut options: Self = serde_json::from_str(json)?;
        options.game_options.migrate();
        Ok(options)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Options of one game, stored as JSON under the game's identifier.
pub trait GameSpecificOptions: Serialize + DeserializeOwned + Default {
    /// Bring an older stored value up to date.
    fn migrate(self) -> Self {
        self
    }
}

/// Versioned store of game-specific option blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameOptions {
    pub version: u32,
    pub storage: BTreeMap<String, serde_json::Value>,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            version: Self::LATEST_VERSION,
            storage: BTreeMap::new(),
        }
    }
}

impl GameOptions {
    pub const LATEST_VERSION: u32 = 1;

    /// Stored options for `game`, migrated. `None` when absent or not an
    /// object.
    pub fn try_get<T: GameSpecificOptions>(&self, game: &str) -> Option<T> {
        let value = self.storage.get(game).filter(|v| v.is_object())?;
        T::deserialize(value).ok().map(T::migrate)
    }

    pub fn set<T: Serialize>(&mut self, game: &str, options: &T) -> Result<()> {
        self.storage
            .insert(game.to_owned(), serde_json::to_value(options)?);
        Ok(())
    }

    /// Rewrite the stored value for `game` in its migrated form, or the
    /// default when nothing usable is stored.
    pub fn migrate_options<T: GameSpecificOptions>(&mut self, game: &str) -> Result<()> {
        let options = self.try_get::<T>(game).unwrap_or_default();
        self.set(game, &options)
    }

    /// Bring the store itself to [`Self::LATEST_VERSION`].
    pub fn migrate(&mut self) -> &mut Self {
        self.version = Self::LATEST_VERSION;
        self
    }
}
