use std::path::PathBuf;

/// Errors reading or writing a way document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot tell the document format of '{}' (expected .osm, .xml or .json)", path.display())]
    UnknownFormat { path: PathBuf },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid XML: {0}")]
    Xml(String),

    #[error("document has no top-level 'elements' array")]
    MissingElements,

    #[error("way element at index {index} has no integer 'id'")]
    MissingWayId { index: usize },

    #[error("way {way}: tag '{key}' has a non-string value")]
    NonStringTag { way: i64, key: String },

    #[error("way {way}: 'tags' is not an object")]
    InvalidTags { way: i64 },

    #[error("way {way}: <tag> needs both 'k' and 'v' attributes")]
    MalformedTag { way: i64 },
}

impl DocumentError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> DocumentError {
        let path = path.into();
        move |source| DocumentError::Io { path, source }
    }

    pub(crate) fn xml(err: impl std::fmt::Display) -> DocumentError {
        DocumentError::Xml(err.to_string())
    }
}
