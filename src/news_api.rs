// src/news_api.rs
//! Client side of the external news query service.
//!
//! [`NewsService`] is the seam the read model talks through; the HTTP
//! implementation follows the backend's `/api/v1` routes.

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::article::{Article, ArticleId};
use crate::error::ServiceError;
use crate::filters::FilterState;
use crate::stats::StatsPatch;

/// Number of articles requested per snapshot/search.
pub const DEFAULT_REQUEST_LIMIT: usize = 50;

#[derive(Debug, Clone, Deserialize)]
struct ArticlesResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

/// Realtime stats endpoint: partial stats plus trending headlines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealtimeStats {
    #[serde(flatten)]
    pub stats: StatsPatch,
    #[serde(default)]
    pub trending: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    /// "up" | "down" | "neutral"
    #[serde(default)]
    pub trend: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TrendingResponse {
    #[serde(default)]
    topics: Vec<TrendingTopic>,
}

#[async_trait::async_trait]
pub trait NewsService: Send + Sync {
    /// Full article list for `filters`.
    async fn fetch_news(
        &self,
        filters: &FilterState,
        limit: usize,
    ) -> Result<Vec<Article>, ServiceError>;

    /// Free-text search narrowed by `filters`.
    async fn search_news(
        &self,
        query: &str,
        filters: &FilterState,
        limit: usize,
    ) -> Result<Vec<Article>, ServiceError>;

    /// Analysis payload for one article (display-only).
    async fn analyze_article(&self, id: &ArticleId) -> Result<Value, ServiceError>;

    async fn realtime_stats(&self) -> Result<RealtimeStats, ServiceError>;

    async fn fact_check(&self, claim: &str) -> Result<Value, ServiceError>;

    async fn trending_topics(&self) -> Result<Vec<TrendingTopic>, ServiceError>;

    fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct HttpNewsService {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpNewsService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request when set.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| ServiceError::InvalidUrl(format!("{raw}: {e}")))
    }

    fn authorize(&self, rb: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(t) => rb.bearer_auth(t),
            None => rb,
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, rb: RequestBuilder) -> Result<T, ServiceError> {
        let rsp = self.authorize(rb).send().await?;
        let status = rsp.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                url: rsp.url().to_string(),
            });
        }
        let body = rsp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait::async_trait]
impl NewsService for HttpNewsService {
    async fn fetch_news(
        &self,
        filters: &FilterState,
        limit: usize,
    ) -> Result<Vec<Article>, ServiceError> {
        let url = self.endpoint("/api/v1/news/politics")?;
        let rb = self.client.get(url).query(&filters.snapshot_query(limit));
        let rsp: ArticlesResponse = self.read_json(rb).await?;
        Ok(rsp.articles)
    }

    async fn search_news(
        &self,
        query: &str,
        filters: &FilterState,
        limit: usize,
    ) -> Result<Vec<Article>, ServiceError> {
        let url = self.endpoint("/api/v1/news/search")?;
        let rb = self.client.get(url).query(&filters.search_query(query, limit));
        let rsp: ArticlesResponse = self.read_json(rb).await?;
        Ok(rsp.articles)
    }

    async fn analyze_article(&self, id: &ArticleId) -> Result<Value, ServiceError> {
        let mut url = self.endpoint("/api/v1/analysis/article")?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidUrl(self.base_url.clone()))?
            .push(&id.to_string());
        let mut body: Value = self.read_json(self.client.post(url)).await?;
        // The backend wraps the payload as {articleId, analysis, timestamp}.
        Ok(match body.get_mut("analysis") {
            Some(inner) => inner.take(),
            None => body,
        })
    }

    async fn realtime_stats(&self) -> Result<RealtimeStats, ServiceError> {
        let url = self.endpoint("/api/v1/stats/realtime")?;
        self.read_json(self.client.get(url)).await
    }

    async fn fact_check(&self, claim: &str) -> Result<Value, ServiceError> {
        let url = self.endpoint("/api/v1/analysis/fact-check")?;
        let rb = self.client.post(url).json(&json!({ "claim": claim }));
        self.read_json(rb).await
    }

    async fn trending_topics(&self) -> Result<Vec<TrendingTopic>, ServiceError> {
        let url = self.endpoint("/api/v1/trending/politics")?;
        let rsp: TrendingResponse = self.read_json(self.client.get(url)).await?;
        Ok(rsp.topics)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
