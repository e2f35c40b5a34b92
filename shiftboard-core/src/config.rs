//! Settings at ~/.config/shiftboard/config.toml

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::cache::LocalCache;
use crate::error::{ShiftboardError, ShiftboardResult};
use crate::record::{Collection, Entry, Payload as _, Pin, Stroke};
use crate::remote::FirebaseStore;

static DEFAULT_CACHE_DIR: &str = "~/.local/share/shiftboard";

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_entries() -> String {
    Entry::DEFAULT_COLLECTION.to_string()
}

fn default_pins() -> String {
    Pin::DEFAULT_COLLECTION.to_string()
}

fn default_strokes() -> String {
    Stroke::DEFAULT_COLLECTION.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default)]
    pub remote: Option<RemoteSettings>,

    #[serde(default)]
    pub collections: CollectionNames,
}

/// Connection details for the hosted realtime database.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSettings {
    #[serde(default)]
    pub database_url: String,

    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionNames {
    #[serde(default = "default_entries")]
    pub entries: String,
    #[serde(default = "default_pins")]
    pub pins: String,
    #[serde(default = "default_strokes")]
    pub strokes: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        CollectionNames {
            entries: default_entries(),
            pins: default_pins(),
            strokes: default_strokes(),
        }
    }
}

impl Settings {
    pub fn config_path() -> ShiftboardResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ShiftboardError::Config("Could not determine config directory".into()))?
            .join("shiftboard");

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> ShiftboardResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load settings from `path`, creating a commented default file first if
    /// there is none. `SHIFTBOARD__*` environment variables override the file.
    pub fn load_from(path: &Path) -> ShiftboardResult<Self> {
        if !path.exists() {
            Self::create_default_config(path)?;
        }

        let settings: Settings = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("SHIFTBOARD").separator("__"))
            .build()
            .map_err(|e| ShiftboardError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ShiftboardError::Config(e.to_string()))?;

        tracing::debug!(
            path = %path.display(),
            remote = settings.remote_configured(),
            "settings loaded"
        );
        Ok(settings)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> ShiftboardResult<()> {
        let contents = format!(
            "\
# shiftboard configuration

# Where the offline copy of every month and map is kept:
# cache_dir = \"{DEFAULT_CACHE_DIR}\"

# Shared realtime database. Leave unset to work offline only.
# [remote]
# database_url = \"https://your-project-default-rtdb.firebaseio.com\"
# auth_token = \"...\"

# Collection names in the database:
# [collections]
# entries = \"{}\"
# pins = \"{}\"
# strokes = \"{}\"
",
            default_entries(),
            default_pins(),
            default_strokes(),
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ShiftboardError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ShiftboardError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn cache_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.cache_dir.to_string_lossy()).into_owned())
    }

    /// The cache directory in display-friendly form, keeping `~`.
    pub fn display_cache_path(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache(&self) -> LocalCache {
        LocalCache::new(self.cache_path())
    }

    /// A remote store is configured exactly when a non-empty URL is set.
    pub fn remote_configured(&self) -> bool {
        self.remote
            .as_ref()
            .is_some_and(|r| !r.database_url.trim().is_empty())
    }

    /// The configured remote store, if any.
    pub fn firebase(&self) -> ShiftboardResult<Option<FirebaseStore>> {
        match &self.remote {
            Some(remote) if self.remote_configured() => Ok(Some(FirebaseStore::new(
                remote.database_url.trim(),
                remote.auth_token.clone(),
            )?)),
            _ => Ok(None),
        }
    }

    pub fn entries(&self) -> Collection {
        Collection::named::<Entry>(&self.collections.entries)
    }

    pub fn pins(&self) -> Collection {
        Collection::named::<Pin>(&self.collections.pins)
    }

    pub fn strokes(&self) -> Collection {
        Collection::named::<Stroke>(&self.collections.strokes)
    }
}
