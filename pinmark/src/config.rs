//! User configuration for pinmark.
//!
//! Read once at startup from `$XDG_CONFIG_HOME/pinmark/config.toml` (falling back
//! to `~/.config/pinmark/config.toml`). Every key is optional:
//!
//! ```toml
//! theme = "catppuccin-mocha"          # or "dark"
//! page_url = "http://localhost:5173/"
//!
//! [store]
//! backend = "sqlite"                  # or "http"
//! path = ".pinmark/comments.db"
//! base_url = "http://localhost:3000/api"
//!
//! [author]
//! id = "local"
//! name = "Local Reviewer"
//! avatar = ""
//! ```
//!
//! A missing file means defaults. An unparsable file also means defaults, with a
//! note on stderr, so a typo never prevents startup.

use std::path::PathBuf;

use pinmark_core::store::http::DEFAULT_BASE_URL;
use pinmark_core::types::Author;
use serde::Deserialize;

/// Which [`CommentStore`](pinmark_core::store::CommentStore) backend to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Http,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    /// SQLite database file, used by the `sqlite` backend.
    pub path: String,
    /// API root, used by the `http` backend.
    pub base_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            path: ".pinmark/comments.db".to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthorConfig {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            id: "local".to_owned(),
            name: "Local Reviewer".to_owned(),
            avatar: String::new(),
        }
    }
}

impl From<AuthorConfig> for Author {
    fn from(config: AuthorConfig) -> Self {
        Author { id: config.id, name: config.name, avatar: config.avatar }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: String,
    /// Page the comments belong to; scopes the SQLite store.
    pub page_url: String,
    pub store: StoreConfig,
    pub author: AuthorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "catppuccin-mocha".to_owned(),
            page_url: "http://localhost:5173/".to_owned(),
            store: StoreConfig::default(),
            author: AuthorConfig::default(),
        }
    }
}

/// Returns the path to the pinmark config file.
///
/// Prefers `$XDG_CONFIG_HOME/pinmark/config.toml`; falls back to
/// `~/.config/pinmark/config.toml` when the env var is absent.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("pinmark").join("config.toml")
}

/// Parses config text. Unknown keys are ignored.
pub fn parse(raw: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(raw)
}

/// Loads the config file, falling back to [`Config::default`].
///
/// Never fails: parse errors are soft failures printed to stderr.
pub fn load() -> Config {
    let path = config_path();
    let raw = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(_) => return Config::default(),
    };
    match parse(&raw) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("pinmark: config parse error in {:?}: {}", path, e);
            Config::default()
        }
    }
}
