// errors.rs
use thiserror::Error;

/// Startup-only failures. The process must not start polling after one of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SEARCH_URL is not set")]
    MissingSearchUrl,
    #[error("search url {url:?} is not an absolute http(s) url")]
    InvalidSearchUrl { url: String },
    #[error("{name} must be an integer between 1 and {max}, got {value:?}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        max: u64,
    },
    #[error("invalid css selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("http client setup failed: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    HttpStatus(u16),
    RateLimited(u16),
}

#[derive(Debug, Clone, Error)]
#[error("fetch failed ({kind:?}) after {attempts} attempt(s): {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub attempts: u32,
    pub message: String,
}

impl FetchError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            attempts: 1,
            message: message.into(),
        }
    }

    /// 403, 429 and 503 mean the site is throttling or blocking us.
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let kind = match code {
            403 | 429 | 503 => FetchErrorKind::RateLimited(code),
            _ => FetchErrorKind::HttpStatus(code),
        };
        Self {
            kind,
            attempts: 1,
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.kind, FetchErrorKind::RateLimited(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Nothing on the page looks like a results page any more.
    StructureChanged,
    /// The results container is there but holds no cards and no "no results" notice.
    EmptyResult,
}

#[derive(Debug, Clone, Error)]
#[error("parse failed ({kind:?}): {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
}

impl ParseError {
    pub fn structure_changed(message: impl Into<String>) -> Self {
        Self {
            kind: ParseErrorKind::StructureChanged,
            message: message.into(),
        }
    }

    pub fn empty_result(message: impl Into<String>) -> Self {
        Self {
            kind: ParseErrorKind::EmptyResult,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("failed to open database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("mail api error: {0}")]
    ApiError(String),
    #[error("mail client setup failed: {0}")]
    ClientSetup(String),
}

/// Anything that ends a discovery cycle early.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
