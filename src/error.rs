// src/error.rs
//! Error taxonomy for the feed client.
//!
//! Every variant here is recoverable at the boundary where it occurs; none of
//! them should ever take the session down.

use thiserror::Error;

/// Failures talking to the external news query service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport failure (connect, TLS, body read).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{url} answered with HTTP {status}")]
    Status { status: u16, url: String },

    /// The body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid service URL {0}")]
    InvalidUrl(String),
}

/// Failures surfaced by read model operations. Prior state is always retained.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("snapshot load failed: {0}")]
    SnapshotLoad(#[source] ServiceError),

    #[error("search failed: {0}")]
    Search(#[source] ServiceError),

    #[error("analysis for article {id} failed: {source}")]
    Enrichment {
        id: String,
        #[source]
        source: ServiceError,
    },

    /// Selection or enrichment referenced an article that is not displayed
    /// (or has no id to ask the analysis service about).
    #[error("article {0} is not in the current feed")]
    UnknownArticle(String),

    #[error("realtime stats fetch failed: {0}")]
    Stats(#[source] ServiceError),
}

/// Failures of the live push channel that are reported to callers.
///
/// Transport errors are deliberately absent: they only ever show up as a
/// close followed by a scheduled reconnect.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("live channel is not connected")]
    NotConnected,

    #[error("could not encode outbound message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}
