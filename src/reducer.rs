//! # Read Model
//! Single source of truth for what the dashboard displays: the bounded
//! article window, the derived [`Stats`], the live [`FilterState`] and the
//! selected article.
//!
//! Every mutation that touches the list goes through the same recompute
//! path, so the stats are always a function of the current window (except
//! for fields a pushed `stats_update` overrides). Failed service calls leave
//! the model untouched.
//!
//! There are no sequence numbers: a snapshot that completes after a live
//! `new_article` replaces it. Last applied wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::article::Article;
use crate::error::FeedError;
use crate::feed::{FeedWindow, DEFAULT_FEED_CAPACITY};
use crate::filters::FilterState;
use crate::live::LiveMessage;
use crate::metrics::ensure_metrics_described;
use crate::news_api::{NewsService, DEFAULT_REQUEST_LIMIT};
use crate::stats::{Stats, StatsPatch};

/// What a live event did to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveOutcome {
    Prepended,
    StatsMerged,
    Ignored,
}

/// Serializable copy of the model for the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedView {
    pub articles: Vec<Article>,
    pub stats: Stats,
    pub filters: FilterState,
    pub active_filters: usize,
    pub query: Option<String>,
    pub selected: Option<Article>,
}

/// The synchronous state; every method is a pure transition.
#[derive(Debug, Clone)]
pub struct ReadModel {
    feed: FeedWindow,
    stats: Stats,
    filters: FilterState,
    query: Option<String>,
    selected: Option<Article>,
    selection_seq: u64,
}

impl ReadModel {
    pub fn new(capacity: usize, now: DateTime<Utc>) -> Self {
        Self {
            feed: FeedWindow::with_capacity(capacity),
            stats: Stats::empty(now),
            filters: FilterState::default(),
            query: None,
            selected: None,
            selection_seq: 0,
        }
    }

    /// Wholesale replacement from a snapshot or search result.
    pub fn replace(&mut self, mut articles: Vec<Article>, now: DateTime<Utc>) -> usize {
        for a in &mut articles {
            a.stamp_received(now);
        }
        self.feed.replace(articles);
        self.recompute(now);
        self.feed.len()
    }

    pub fn apply_live(&mut self, msg: &LiveMessage, now: DateTime<Utc>) -> LiveOutcome {
        match msg {
            LiveMessage::NewArticle(article) => {
                let mut article = article.as_ref().clone();
                article.stamp_received(now);
                self.feed.prepend(article);
                self.recompute(now);
                LiveOutcome::Prepended
            }
            LiveMessage::StatsUpdate(patch) => {
                self.stats.merge(patch);
                LiveOutcome::StatsMerged
            }
            LiveMessage::Other { .. } => LiveOutcome::Ignored,
        }
    }

    pub fn merge_stats(&mut self, patch: &StatsPatch) {
        self.stats.merge(patch);
    }

    fn recompute(&mut self, now: DateTime<Utc>) {
        self.stats = Stats::from_articles(self.feed.iter(), now);
        gauge!("feed_articles").set(self.feed.len() as f64);
    }

    pub fn articles(&self) -> &FeedWindow {
        &self.feed
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn selected(&self) -> Option<&Article> {
        self.selected.as_ref()
    }

    pub fn view(&self) -> FeedView {
        FeedView {
            articles: self.feed.to_vec(),
            stats: self.stats.clone(),
            filters: self.filters.clone(),
            active_filters: self.filters.active_count(),
            query: self.query.clone(),
            selected: self.selected.clone(),
        }
    }
}

pub struct Reducer {
    service: Arc<dyn NewsService>,
    limit: usize,
    model: Mutex<ReadModel>,
}

impl Reducer {
    pub fn new(service: Arc<dyn NewsService>) -> Self {
        Self::with_limits(service, DEFAULT_FEED_CAPACITY, DEFAULT_REQUEST_LIMIT)
    }

    pub fn with_limits(service: Arc<dyn NewsService>, capacity: usize, limit: usize) -> Self {
        ensure_metrics_described();
        Self {
            service,
            limit,
            model: Mutex::new(ReadModel::new(capacity, Utc::now())),
        }
    }

    pub fn service(&self) -> &Arc<dyn NewsService> {
        &self.service
    }

    /// Fetch the list for `filters` and replace the window. On failure the
    /// model (filters included) is left as it was.
    pub async fn load_snapshot(&self, filters: &FilterState) -> Result<usize, FeedError> {
        let articles = match self.service.fetch_news(filters, self.limit).await {
            Ok(v) => v,
            Err(e) => {
                counter!("feed_snapshot_errors_total").increment(1);
                warn!(error = %e, service = self.service.name(), "snapshot load failed");
                return Err(FeedError::SnapshotLoad(e));
            }
        };

        let mut model = self.model.lock();
        model.filters = filters.clone();
        model.query = None;
        let n = model.replace(articles, Utc::now());
        counter!("feed_snapshot_loads_total").increment(1);
        info!(articles = n, active_filters = filters.active_count(), "snapshot loaded");
        Ok(n)
    }

    /// Blank queries fall back to [`Reducer::load_snapshot`].
    pub async fn search(&self, query: &str, filters: &FilterState) -> Result<usize, FeedError> {
        if query.trim().is_empty() {
            return self.load_snapshot(filters).await;
        }

        let articles = match self.service.search_news(query, filters, self.limit).await {
            Ok(v) => v,
            Err(e) => {
                counter!("feed_search_errors_total").increment(1);
                warn!(error = %e, query, "search failed");
                return Err(FeedError::Search(e));
            }
        };

        let mut model = self.model.lock();
        model.filters = filters.clone();
        model.query = Some(query.to_string());
        let n = model.replace(articles, Utc::now());
        info!(articles = n, query, "search results loaded");
        Ok(n)
    }

    /// Re-run whatever produced the current list: the active search, or a
    /// snapshot for the live filters.
    pub async fn refresh(&self) -> Result<usize, FeedError> {
        let (filters, query) = {
            let model = self.model.lock();
            (model.filters.clone(), model.query.clone())
        };
        match query {
            Some(q) => self.search(&q, &filters).await,
            None => self.load_snapshot(&filters).await,
        }
    }

    pub fn apply_live_event(&self, msg: &LiveMessage) -> LiveOutcome {
        let outcome = self.model.lock().apply_live(msg, Utc::now());
        match outcome {
            LiveOutcome::Prepended => counter!("feed_live_articles_total").increment(1),
            LiveOutcome::StatsMerged => debug!("stats merged from live update"),
            LiveOutcome::Ignored => debug!(kind = msg.kind(), "live event ignored"),
        }
        outcome
    }

    /// Pull realtime stats and merge them like a pushed `stats_update`.
    /// Returns the trending headlines that came along.
    pub async fn refresh_realtime_stats(&self) -> Result<Vec<String>, FeedError> {
        let rs = self
            .service
            .realtime_stats()
            .await
            .map_err(FeedError::Stats)?;
        self.model.lock().merge_stats(&rs.stats);
        Ok(rs.trending)
    }

    /// Select the first displayed article with `id` and enrich a copy of it.
    ///
    /// The selection is set before the analysis call; if that call fails the
    /// article stays selected without analysis.
    pub async fn select_article(&self, id: &str) -> Result<Article, FeedError> {
        let (article, seq) = {
            let mut model = self.model.lock();
            let Some(article) = model.feed.find(id).cloned() else {
                return Err(FeedError::UnknownArticle(id.to_string()));
            };
            model.selection_seq += 1;
            model.selected = Some(article.clone());
            (article, model.selection_seq)
        };
        let Some(article_id) = article.id.clone() else {
            return Err(FeedError::UnknownArticle(id.to_string()));
        };

        match self.service.analyze_article(&article_id).await {
            Ok(analysis) => {
                let mut enriched = article;
                enriched.analysis = Some(analysis);
                let mut model = self.model.lock();
                // A newer selection wins over a slow enrichment.
                if model.selection_seq == seq {
                    model.selected = Some(enriched.clone());
                }
                Ok(enriched)
            }
            Err(e) => {
                warn!(error = %e, article = %article_id, "article analysis failed");
                Err(FeedError::Enrichment {
                    id: article_id.to_string(),
                    source: e,
                })
            }
        }
    }

    pub fn clear_selection(&self) {
        let mut model = self.model.lock();
        model.selection_seq += 1;
        model.selected = None;
    }

    pub fn view(&self) -> FeedView {
        self.model.lock().view()
    }

    pub fn stats(&self) -> Stats {
        self.model.lock().stats.clone()
    }

    pub fn filters(&self) -> FilterState {
        self.model.lock().filters.clone()
    }

    pub fn articles(&self) -> Vec<Article> {
        self.model.lock().feed.to_vec()
    }
}
