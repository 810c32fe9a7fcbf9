/// Runtime settings, read from the environment with sensible defaults
use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

const DEFAULT_USER_AGENT: &str = concat!("resenas/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine user data directory, set RESENAS_DB")]
    NoDataDir,

    #[error("could not determine cache directory, set RESENAS_TILE_CACHE")]
    NoCacheDir,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// SQLite file holding the reseñas
    pub database: PathBuf,
    /// Tile URL template with `{z}`, `{x}`, `{y}` and optionally `{s}`
    pub tile_url: String,
    /// Directory for downloaded tiles
    pub tile_cache: PathBuf,
    /// Sent with every tile request
    pub user_agent: String,
}

impl Settings {
    /// - `RESENAS_DB`: defaults to `<data dir>/resenas/resenas.db`
    /// - `RESENAS_TILE_URL`: defaults to OpenStreetMap
    /// - `RESENAS_TILE_CACHE`: defaults to `<cache dir>/resenas/tiles`
    /// - `RESENAS_USER_AGENT`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database = match lookup("RESENAS_DB") {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let tile_cache = match lookup("RESENAS_TILE_CACHE") {
            Some(path) => PathBuf::from(path),
            None => default_tile_cache()?,
        };

        Ok(Settings {
            database,
            tile_url: lookup("RESENAS_TILE_URL").unwrap_or_else(|| DEFAULT_TILE_URL.to_string()),
            tile_cache,
            user_agent: lookup("RESENAS_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
    }
}

/// - Linux: ~/.local/share/resenas/resenas.db
/// - macOS: ~/Library/Application Support/resenas/resenas.db
/// - Windows: %APPDATA%\resenas\resenas.db
fn default_db_path() -> Result<PathBuf, ConfigError> {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or(ConfigError::NoDataDir)?;

    path.push("resenas");
    path.push("resenas.db");
    Ok(path)
}

/// ~/.cache/resenas/tiles on Linux
fn default_tile_cache() -> Result<PathBuf, ConfigError> {
    let mut path = dirs_next::cache_dir()
        .or_else(dirs_next::home_dir)
        .ok_or(ConfigError::NoCacheDir)?;

    path.push("resenas");
    path.push("tiles");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn explicit_values_win() {
        let vars: HashMap<&str, &str> = [
            ("RESENAS_DB", "/tmp/r.db"),
            ("RESENAS_TILE_URL", "https://{s}.example.org/{z}/{x}/{y}.png"),
            ("RESENAS_TILE_CACHE", "/tmp/tiles"),
            ("RESENAS_USER_AGENT", "survey-office"),
        ]
        .into_iter()
        .collect();

        let settings = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.database, PathBuf::from("/tmp/r.db"));
        assert_eq!(settings.tile_url, "https://{s}.example.org/{z}/{x}/{y}.png");
        assert_eq!(settings.tile_cache, PathBuf::from("/tmp/tiles"));
        assert_eq!(settings.user_agent, "survey-office");
    }

    #[test]
    fn tile_defaults_apply() {
        let settings = Settings::from_lookup(|k| match k {
            "RESENAS_DB" => Some("/tmp/r.db".into()),
            "RESENAS_TILE_CACHE" => Some("/tmp/tiles".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.tile_url, DEFAULT_TILE_URL);
        assert!(settings.user_agent.starts_with("resenas/"));
    }
}
