use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTML parse error: {0}")]
    Html(String),
}

/// Coarse classification used when logging provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// The source could not be reached or answered with an error status.
    Fetch,
    /// The source answered but the payload could not be understood.
    Parse,
}

impl SourceError {
    #[must_use]
    pub fn kind(&self) -> SourceErrorKind {
        match self {
            SourceError::Http(e) if e.is_decode() => SourceErrorKind::Parse,
            SourceError::Http(_)
            | SourceError::UnexpectedStatus { .. }
            | SourceError::Timeout(_) => SourceErrorKind::Fetch,
            SourceError::Xml(_) | SourceError::Json { .. } | SourceError::Html(_) => {
                SourceErrorKind::Parse
            }
        }
    }
}

impl std::fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceErrorKind::Fetch => write!(f, "fetch"),
            SourceErrorKind::Parse => write!(f, "parse"),
        }
    }
}
