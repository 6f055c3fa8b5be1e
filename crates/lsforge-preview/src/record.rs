use std::collections::BTreeMap;
use std::path::Path;
use std::time::SystemTime;

use serde::Serialize;

/// A structured preview of one file.
///
/// Immutable once produced. Errors never escape the preview engine —
/// they land in the `error` field and the record is still returned, so a
/// consumer always has something to display.
///
/// `cache_mtime`/`cache_size` are the stat observed when the record was
/// cached; the cache compares them against a fresh stat on every lookup
/// and evicts on drift.
#[derive(Clone, Debug, Serialize)]
pub struct PreviewRecord {
    pub filename: String,
    pub size: u64,
    pub extension: String,
    /// Human-readable preview body (UTF-8 text).
    pub content: String,
    /// Decoded thumbnail for texture previews. Not serialized — pixel
    /// data has no place in JSON output.
    #[serde(skip)]
    pub thumbnail: Option<Thumbnail>,
    pub metadata: BTreeMap<String, String>,
    pub error: Option<String>,
    #[serde(skip)]
    pub cache_mtime: Option<SystemTime>,
    pub cache_size: Option<u64>,
}

impl PreviewRecord {
    /// A record describing a failed preview.
    #[must_use]
    pub fn error(path: &Path, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut metadata = BTreeMap::new();
        metadata.insert("error".to_string(), "true".to_string());
        Self {
            filename: filename_of(path),
            size: 0,
            extension: extension_of(path),
            content: format!("Error: {message}"),
            thumbnail: None,
            metadata,
            error: Some(message),
            cache_mtime: None,
            cache_size: None,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A decoded thumbnail image. Opaque to this crate beyond its
/// dimensions; rendering is the consumer's business.
#[derive(Clone, Debug)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Seam for texture decoding, which is outside this toolkit's scope.
///
/// The engine asks an installed decoder for a thumbnail and falls back
/// to a descriptive text placeholder when none is installed or decoding
/// fails.
pub trait ThumbnailDecoder: Send + Sync {
    fn decode(&self, path: &Path, max_size: (u32, u32)) -> Option<Thumbnail>;
}

pub(crate) fn filename_of(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| "Unknown".to_string(), |n| n.to_string_lossy().into_owned())
}

pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
