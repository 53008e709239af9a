use ::scraper::error::SelectorErrorKind;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use crate::model::Entity;

/// All errors that can occur while scraping and persisting snapshots.
#[derive(thiserror::Error, Debug)]
pub enum ScorpionError {
    /// HTTP request failed (network, DNS, TLS, etc.).
    #[error("http request failed for {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    /// Server returned a non-success HTTP status code.
    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Failed to read the response body as text.
    #[error("failed to read response body from {url}: {source}")]
    ResponseBody {
        url: String,
        source: reqwest::Error,
    },

    /// Failed to build the HTTP client.
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),

    /// A CSS selector string could not be parsed.
    #[error("invalid CSS selector: {0}")]
    Selector(String),

    /// A text pattern could not be compiled.
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Failed to parse an integer from scraped text.
    #[error("failed to parse integer: {0}")]
    IntParse(#[from] ParseIntError),

    /// Failed to parse a date from scraped text.
    #[error("failed to parse date: {0}")]
    DateParse(#[from] chrono::ParseError),

    /// The page does not have the layout its extractor expects.
    #[error("unexpected page layout: {context} not found")]
    Layout { context: &'static str },

    /// Reading or writing a snapshot file failed.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// CSV encoding or decoding failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet encoding or decoding failed.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Building or reading an Arrow batch failed.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// A snapshot file does not match the record schema.
    #[error("snapshot schema mismatch: {0}")]
    Schema(String),

    /// A stage was started before its upstream snapshot was written.
    #[error("{entity} stage requires a {upstream} snapshot, none has been written yet")]
    MissingUpstream { entity: Entity, upstream: Entity },

    /// Every fetch attempted by a stage failed.
    #[error("{entity} stage could not reach any source ({failed} urls failed)")]
    SourceUnreachable { entity: Entity, failed: usize },
}

/// Coarse classification used to decide whether an error is recovered
/// per page or aborts the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ErrorKind {
    Network,
    Parse,
    Write,
    Precondition,
}

impl ScorpionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http { .. }
            | Self::Timeout { .. }
            | Self::UnexpectedStatus { .. }
            | Self::ResponseBody { .. } => ErrorKind::Network,
            Self::Selector(_)
            | Self::Regex(_)
            | Self::IntParse(_)
            | Self::DateParse(_)
            | Self::Layout { .. } => ErrorKind::Parse,
            Self::Io { .. }
            | Self::Csv(_)
            | Self::Parquet(_)
            | Self::Arrow(_)
            | Self::Schema(_) => ErrorKind::Write,
            Self::Client(_) | Self::MissingUpstream { .. } | Self::SourceUnreachable { .. } => {
                ErrorKind::Precondition
            }
        }
    }

    /// Recoverable errors only drop the affected page from the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Parse)
    }

    /// Whether another attempt at the same URL may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Timeout { .. } | Self::ResponseBody { .. } => true,
            Self::UnexpectedStatus { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl<'a> From<SelectorErrorKind<'a>> for ScorpionError {
    fn from(err: SelectorErrorKind<'a>) -> Self {
        ScorpionError::Selector(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScorpionError>;
