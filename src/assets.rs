// Asset catalog collaborator - the queue consumes assets, it does not own them

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of asset as classified by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    Video,
    Image,
    Audio,
    Document,
}

/// Identity of a catalog asset, snapshotted into each export job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    pub id: String,
    pub display_name: String,
    pub kind: AssetKind,
    /// Opaque key into the storage backend, resolved to a URL on demand
    pub storage_key: String,
}

/// Resolution error types
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("storage key '{0}' not known to the asset library")]
    UnknownKey(String),

    #[error("storage backend rejected key '{key}': {reason}")]
    Backend { key: String, reason: String },
}

/// Mints a retrievable download URL for a storage key
pub trait AssetResolver: Send + Sync {
    fn resolve_download_url(&self, storage_key: &str) -> Result<String, ResolveError>;
}

/// In-memory asset library backing the demo and tests
#[derive(Debug, Clone)]
pub struct StaticAssetLibrary {
    base_url: String,
    assets: Vec<AssetRef>,
}

impl StaticAssetLibrary {
    pub fn new(base_url: impl Into<String>, assets: Vec<AssetRef>) -> Self {
        Self {
            base_url: base_url.into(),
            assets,
        }
    }

    /// Small fixed library of production-flavored assets
    pub fn sample() -> Self {
        let assets = vec![
            AssetRef {
                id: "ast-0001".to_string(),
                display_name: "A012_C003 dailies take 1".to_string(),
                kind: AssetKind::Video,
                storage_key: "proj7/dailies/a012_c003_t1.mov".to_string(),
            },
            AssetRef {
                id: "ast-0002".to_string(),
                display_name: "Harbor moodboard frame".to_string(),
                kind: AssetKind::Image,
                storage_key: "proj7/moodboard/harbor_014.png".to_string(),
            },
            AssetRef {
                id: "ast-0003".to_string(),
                display_name: "Location scout interview".to_string(),
                kind: AssetKind::Audio,
                storage_key: "proj7/audio/scout_interview.wav".to_string(),
            },
            AssetRef {
                id: "ast-0004".to_string(),
                display_name: "Permit packet (city)".to_string(),
                kind: AssetKind::Document,
                storage_key: "proj7/permits/city_packet_v3.pdf".to_string(),
            },
        ];

        Self::new("https://assets.internal/v1", assets)
    }

    pub fn assets(&self) -> &[AssetRef] {
        &self.assets
    }

    pub fn get(&self, id: &str) -> Option<&AssetRef> {
        self.assets.iter().find(|a| a.id == id)
    }
}

impl AssetResolver for StaticAssetLibrary {
    fn resolve_download_url(&self, storage_key: &str) -> Result<String, ResolveError> {
        if self.assets.iter().any(|a| a.storage_key == storage_key) {
            Ok(format!("{}/{}", self.base_url, storage_key))
        } else {
            Err(ResolveError::UnknownKey(storage_key.to_string()))
        }
    }
}
