// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod article;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod filters;
pub mod metrics;
pub mod news_api;
pub mod preferences;
pub mod reducer;
pub mod stats;

// Live push channel (connect / subscribe / dispatch / reconnect)
pub mod live;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::article::{Article, ArticleId, BiasLevel};
pub use crate::dashboard::{Dashboard, Notice};
pub use crate::error::{ChannelError, FeedError, ServiceError};
pub use crate::filters::FilterState;
pub use crate::live::{ChannelConfig, ChannelState, LiveChannel, LiveMessage};
pub use crate::news_api::{HttpNewsService, NewsService};
pub use crate::reducer::{FeedView, LiveOutcome, Reducer};
pub use crate::stats::{recompute_stats, Stats, StatsPatch};
