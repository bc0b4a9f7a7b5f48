use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{FontDescriptor, FontError, FontSource, LoadedFont};

const INDEX_FILE: &str = "index.json";

/// Resolves a descriptor to font bytes. Implementations are called from
/// worker threads, one call per descriptor.
pub trait FontFetch: Send + Sync {
    fn fetch(&self, descriptor: &FontDescriptor) -> Result<LoadedFont, FontError>;
}

/// Reads fonts from disk or downloads them, caching remote fonts by family.
pub struct FontLoader {
    http: Option<Client>,
    cache_dir: Option<PathBuf>,
    index_lock: Mutex<()>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct CacheIndex {
    #[serde(default)]
    fonts: BTreeMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct CacheEntry {
    source: String,
    file: String,
    bytes: u64,
}

impl FontLoader {
    /// Builds a loader. With `cache_only` set no HTTP client is created and
    /// remote fonts must already be present in `cache_dir`.
    pub fn new(cache_dir: Option<PathBuf>, cache_only: bool) -> Result<Self, FontError> {
        let http = if cache_only {
            None
        } else {
            Some(
                Client::builder()
                    .user_agent(concat!("titlecard/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .map_err(|err| FontError::Http {
                        family: String::new(),
                        url: String::new(),
                        message: format!("failed to construct HTTP client: {err}"),
                    })?,
            )
        };
        Ok(Self {
            http,
            cache_dir,
            index_lock: Mutex::new(()),
        })
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    fn read_path(&self, family: &str, path: &Path) -> Result<LoadedFont, FontError> {
        let data = fs::read(path).map_err(|err| FontError::Io {
            family: family.to_string(),
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        validated(LoadedFont::new(family, data))
    }

    fn fetch_url(&self, family: &str, url: &str) -> Result<LoadedFont, FontError> {
        if let Some(cached) = self.lookup_cache(family, url) {
            debug!(family, path = %cached.display(), "using cached font");
            match self.read_path(family, &cached) {
                Ok(font) => return Ok(font),
                Err(err) => warn!(family, error = %err, "cached font unusable; refetching"),
            }
        }

        let Some(http) = self.http.as_ref() else {
            return Err(FontError::NotCached {
                family: family.to_string(),
            });
        };

        debug!(family, %url, "downloading font");
        let http_error = |message: String| FontError::Http {
            family: family.to_string(),
            url: url.to_string(),
            message,
        };
        let response = http
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| http_error(err.to_string()))?;
        let bytes = response.bytes().map_err(|err| http_error(err.to_string()))?;
        let font = validated(LoadedFont::new(family, bytes.to_vec()))?;

        if let Err(err) = self.store_cache(family, url, font.data()) {
            warn!(family, error = %err, "failed to cache downloaded font");
        }
        Ok(font)
    }

    fn lookup_cache(&self, family: &str, url: &str) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let _guard = self.index_lock.lock().ok()?;
        let index = read_index(dir);
        let entry = index.fonts.get(family)?;
        if entry.source != url {
            return None;
        }
        let path = dir.join(&entry.file);
        path.exists().then_some(path)
    }

    fn store_cache(&self, family: &str, url: &str, data: &[u8]) -> std::io::Result<()> {
        let Some(dir) = self.cache_dir.as_ref() else {
            return Ok(());
        };
        let _guard = self
            .index_lock
            .lock()
            .map_err(|_| std::io::Error::other("font cache index lock poisoned"))?;
        fs::create_dir_all(dir)?;
        let file = format!("{}.ttf", family_slug(family));
        fs::write(dir.join(&file), data)?;

        let mut index = read_index(dir);
        index.fonts.insert(
            family.to_string(),
            CacheEntry {
                source: url.to_string(),
                file,
                bytes: data.len() as u64,
            },
        );
        let encoded = serde_json::to_string_pretty(&index).map_err(std::io::Error::other)?;
        fs::write(dir.join(INDEX_FILE), encoded)
    }
}

impl FontFetch for FontLoader {
    fn fetch(&self, descriptor: &FontDescriptor) -> Result<LoadedFont, FontError> {
        match &descriptor.source {
            FontSource::Path(path) => self.read_path(&descriptor.family, path),
            FontSource::Url(url) => self.fetch_url(&descriptor.family, url),
        }
    }
}

fn validated(font: LoadedFont) -> Result<LoadedFont, FontError> {
    if font.is_valid() {
        Ok(font)
    } else {
        Err(FontError::InvalidData {
            family: font.family().to_string(),
        })
    }
}

fn read_index(dir: &Path) -> CacheIndex {
    let path = dir.join(INDEX_FILE);
    let Ok(raw) = fs::read_to_string(&path) else {
        return CacheIndex::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(path = %path.display(), error = %err, "ignoring corrupt font cache index");
        CacheIndex::default()
    })
}

fn family_slug(family: &str) -> String {
    family
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn slug_is_filesystem_friendly() {
        assert_eq!(family_slug("Fjalla One"), "fjalla-one");
        assert_eq!(family_slug("A/B"), "a-b");
    }

    #[test]
    fn missing_path_reports_io_error() {
        let loader = FontLoader::new(None, true).unwrap();
        let descriptor = FontDescriptor::new(
            "Ghost",
            FontSource::Path(PathBuf::from("/definitely/not/here.ttf")),
        );
        let err = loader.fetch(&descriptor).unwrap_err();
        assert!(matches!(err, FontError::Io { .. }));
    }

    #[test]
    fn non_font_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.ttf");
        fs::write(&path, b"definitely not a font").unwrap();
        let loader = FontLoader::new(None, true).unwrap();
        let err = loader
            .fetch(&FontDescriptor::new("Notes", FontSource::Path(path)))
            .unwrap_err();
        assert!(matches!(err, FontError::InvalidData { .. }));
    }

    #[test]
    fn cache_only_without_entry_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let loader = FontLoader::new(Some(dir.path().to_path_buf()), true).unwrap();
        let descriptor = FontDescriptor::new(
            "Remote",
            FontSource::Url("https://example.invalid/remote.ttf".into()),
        );
        let err = loader.fetch(&descriptor).unwrap_err();
        assert!(matches!(err, FontError::NotCached { .. }));
    }

    #[test]
    fn cache_index_round_trips_entries() {
        let dir = TempDir::new().unwrap();
        let loader = FontLoader::new(Some(dir.path().to_path_buf()), true).unwrap();
        loader
            .store_cache("Fjalla One", "https://example.invalid/f.ttf", b"abc")
            .unwrap();

        let hit = loader.lookup_cache("Fjalla One", "https://example.invalid/f.ttf");
        assert_eq!(hit, Some(dir.path().join("fjalla-one.ttf")));
        assert!(loader
            .lookup_cache("Fjalla One", "https://example.invalid/other.ttf")
            .is_none());
    }
}
