//! Font resources for the title card text layer.
//!
//! - `FontDescriptor` names a family and where its bytes live (a local path or
//!   an `http(s)://` URL).
//! - `FontLoader` resolves descriptors, downloading remote fonts into an
//!   on-disk cache so later runs can work offline.
//! - `FontJoin` loads N descriptors on worker threads and reports once every
//!   one of them has resolved, so callers can poll it from a frame loop
//!   without blocking.
//! - `registry()` is the process-wide set of loaded fonts, keyed by family
//!   and written at most once per family.

mod join;
mod loader;
mod registry;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub use join::{FontJoin, JoinStatus};
pub use loader::{FontFetch, FontLoader};
pub use registry::{registry, FontRegistry};

#[derive(Debug, Clone, thiserror::Error)]
pub enum FontError {
    #[error("failed to read font '{family}' from {path}: {message}")]
    Io {
        family: String,
        path: PathBuf,
        message: String,
    },
    #[error("failed to download font '{family}' from {url}: {message}")]
    Http {
        family: String,
        url: String,
        message: String,
    },
    #[error("font '{family}' is not cached and remote fetches are disabled")]
    NotCached { family: String },
    #[error("data for font '{family}' is not a readable font file")]
    InvalidData { family: String },
    #[error("font loading timed out after {seconds:.1}s")]
    Timeout { seconds: f32 },
    #[error("font worker for '{family}' exited before reporting a result")]
    Disconnected { family: String },
}

/// Where the bytes for a font family come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    Path(PathBuf),
    Url(String),
}

impl FontSource {
    /// Interprets `http://` and `https://` prefixes as URLs, anything else as a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            FontSource::Url(trimmed.to_string())
        } else {
            FontSource::Path(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSource::Path(path) => write!(f, "{}", path.display()),
            FontSource::Url(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontDescriptor {
    pub family: String,
    pub source: FontSource,
}

impl FontDescriptor {
    pub fn new(family: impl Into<String>, source: FontSource) -> Self {
        Self {
            family: family.into(),
            source,
        }
    }
}

/// Raw font bytes tagged with the family they were registered under.
///
/// The bytes are shared, so clones are cheap and the registry can hand the
/// same data to every text layer.
#[derive(Clone)]
pub struct LoadedFont {
    family: String,
    data: Arc<Vec<u8>>,
}

impl LoadedFont {
    pub fn new(family: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            family: family.into(),
            data: Arc::new(data),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns true when the bytes parse as a font face.
    pub fn is_valid(&self) -> bool {
        swash::FontRef::from_index(&self.data, 0).is_some()
    }
}

impl fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedFont")
            .field("family", &self.family)
            .field("bytes", &self.data.len())
            .finish()
    }
}
