/// Raster tiles for the card maps
///
/// Tiles come from a slippy-map server (OpenStreetMap by default),
/// are kept on disk under the cache directory and decoded handles are
/// kept in memory, shared by every map on screen.
use iced::widget::image::Handle;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Decoded tiles kept in memory before old ones are dropped
const MAX_TILES: usize = 512;

const SUBDOMAINS: [&str; 3] = ["a", "b", "c"];

#[derive(Debug, Error)]
pub enum TileError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone)]
pub enum TileState {
    Loading,
    Ready(Handle),
    Failed,
}

/// Tile server URL template
#[derive(Debug, Clone, PartialEq)]
pub struct TileSource {
    template: String,
}

impl TileSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn url(&self, key: TileKey) -> String {
        let subdomain = SUBDOMAINS[((key.x + key.y) as usize) % SUBDOMAINS.len()];
        self.template
            .replace("{s}", subdomain)
            .replace("{z}", &key.z.to_string())
            .replace("{x}", &key.x.to_string())
            .replace("{y}", &key.y.to_string())
    }
}

/// Location of a tile inside the disk cache
pub fn cache_path(dir: &Path, key: TileKey) -> PathBuf {
    dir.join(key.z.to_string())
        .join(key.x.to_string())
        .join(format!("{}.png", key.y))
}

/// In-memory tile store shared by every map
#[derive(Debug)]
pub struct TileCache {
    source: TileSource,
    dir: PathBuf,
    client: reqwest::Client,
    tiles: HashMap<TileKey, TileState>,
}

impl TileCache {
    pub fn new(source: TileSource, dir: PathBuf, user_agent: &str) -> Result<Self, TileError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            source,
            dir,
            client,
            tiles: HashMap::new(),
        })
    }

    pub fn get(&self, key: &TileKey) -> Option<&TileState> {
        self.tiles.get(key)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Mark the keys nobody asked for yet as loading and return them.
    /// Failed tiles are not retried.
    pub fn missing(&mut self, wanted: impl IntoIterator<Item = TileKey>) -> Vec<TileKey> {
        let mut fresh = Vec::new();
        for key in wanted {
            if !self.tiles.contains_key(&key) {
                self.tiles.insert(key, TileState::Loading);
                fresh.push(key);
            }
        }
        fresh
    }

    pub fn finish(&mut self, key: TileKey, result: Result<Vec<u8>, String>) {
        let state = match result {
            Ok(bytes) => TileState::Ready(Handle::from_bytes(bytes)),
            Err(e) => {
                warn!("🗺️  Tile {}/{}/{} failed: {e}", key.z, key.x, key.y);
                TileState::Failed
            }
        };
        self.tiles.insert(key, state);
    }

    /// Drop ready tiles no mounted map needs once the cache is over capacity
    pub fn evict(&mut self, keep: &HashSet<TileKey>) {
        if self.tiles.len() <= MAX_TILES {
            return;
        }
        let before = self.tiles.len();
        self.tiles
            .retain(|key, state| keep.contains(key) || matches!(state, TileState::Loading));
        debug!("Evicted {} tiles", before - self.tiles.len());
    }

    /// Everything a background fetch needs, detached from `self`
    pub fn request(&self, key: TileKey) -> TileRequest {
        TileRequest {
            url: self.source.url(key),
            path: cache_path(&self.dir, key),
            client: self.client.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TileRequest {
    url: String,
    path: PathBuf,
    client: reqwest::Client,
}

impl TileRequest {
    /// Read the tile from disk, or download it and write it to disk
    pub async fn fetch(self) -> Result<Vec<u8>, String> {
        self.fetch_inner().await.map_err(|e| e.to_string())
    }

    async fn fetch_inner(self) -> Result<Vec<u8>, TileError> {
        if let Ok(bytes) = tokio::fs::read(&self.path).await {
            return Ok(bytes);
        }

        let bytes = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec();

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, &bytes).await?;
        debug!("Downloaded {}", self.url);

        Ok(bytes)
    }
}
