// src/dashboard.rs
//! Wires the read model to the live channel and the user-facing actions.
//!
//! Startup order: snapshot for the live filters, then the live channel with
//! the reducer as listener. Dropping the dashboard disconnects the channel so
//! no reconnect loop outlives it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::article::Article;
use crate::config::FeedConfig;
use crate::error::{FeedError, ServiceError};
use crate::filters::FilterState;
use crate::live::{ChannelState, LiveChannel, LiveMessage};
use crate::news_api::{HttpNewsService, NewsService, TrendingTopic};
use crate::preferences::Preferences;
use crate::reducer::{FeedView, LiveOutcome, Reducer};
use crate::stats::Stats;

const NOTICE_BUFFER: usize = 64;

/// User-facing, non-fatal notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Connected,
    NewArticle { title: Option<String> },
    LoadFailed { reason: String },
    SearchFailed { reason: String },
    SearchResults { count: usize },
}

pub struct Dashboard {
    reducer: Arc<Reducer>,
    channel: LiveChannel,
    prefs: Mutex<Preferences>,
    notices: broadcast::Sender<Notice>,
    refresh_interval: Option<Duration>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Dashboard {
    pub fn new(reducer: Reducer, channel: LiveChannel, prefs: Preferences) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_BUFFER);
        Self {
            reducer: Arc::new(reducer),
            channel,
            prefs: Mutex::new(prefs),
            notices,
            refresh_interval: None,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// HTTP query service + WebSocket channel as described by `cfg`.
    pub fn from_config(cfg: &FeedConfig) -> Self {
        let service: Arc<dyn NewsService> = Arc::new(
            HttpNewsService::new(cfg.api_base_url.clone()).with_token(cfg.api_token.clone()),
        );
        let reducer = Reducer::with_limits(service, cfg.feed_capacity, cfg.request_limit);
        let channel = LiveChannel::new(cfg.channel_config());
        let prefs = Preferences::load(cfg.preferences_path.clone());
        Self::new(reducer, channel, prefs).with_refresh_interval(cfg.refresh_interval())
    }

    pub fn with_refresh_interval(mut self, every: Option<Duration>) -> Self {
        self.refresh_interval = every;
        self
    }

    /// Initial snapshot, then the live channel. A failed snapshot is reported
    /// (notice + return value) but the channel is opened anyway.
    pub async fn start(&self) -> Result<usize, FeedError> {
        let filters = self.reducer.filters();
        let initial = self.load(&filters).await;

        self.stop_tasks();
        self.spawn_connection_watch();
        self.spawn_refresh();

        let reducer = Arc::clone(&self.reducer);
        let notices = self.notices.clone();
        self.channel.connect(move |msg| {
            if reducer.apply_live_event(msg) == LiveOutcome::Prepended {
                let title = match msg {
                    LiveMessage::NewArticle(a) => a.title().map(str::to_string),
                    _ => None,
                };
                let _ = notices.send(Notice::NewArticle { title });
            }
        });
        initial
    }

    /// Make `filters` the live FilterState by loading its snapshot.
    pub async fn set_filters(&self, filters: FilterState) -> Result<usize, FeedError> {
        self.load(&filters).await
    }

    pub async fn reset_filters(&self) -> Result<usize, FeedError> {
        self.set_filters(FilterState::default()).await
    }

    pub async fn search(&self, query: &str) -> Result<usize, FeedError> {
        let filters = self.reducer.filters();
        if query.trim().is_empty() {
            return self.load(&filters).await;
        }
        match self.reducer.search(query, &filters).await {
            Ok(count) => {
                self.notify(Notice::SearchResults { count });
                Ok(count)
            }
            Err(e) => {
                self.notify(Notice::SearchFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    pub async fn select_article(&self, id: &str) -> Result<Article, FeedError> {
        self.reducer.select_article(id).await
    }

    pub fn clear_selection(&self) {
        self.reducer.clear_selection();
    }

    pub async fn refresh_realtime_stats(&self) -> Result<Vec<String>, FeedError> {
        self.reducer.refresh_realtime_stats().await
    }

    pub async fn trending_topics(&self) -> Result<Vec<TrendingTopic>, ServiceError> {
        self.reducer.service().trending_topics().await
    }

    pub async fn fact_check(&self, claim: &str) -> Result<Value, ServiceError> {
        self.reducer.service().fact_check(claim).await
    }

    pub fn dark_mode(&self) -> bool {
        self.prefs.lock().dark_mode()
    }

    pub fn toggle_dark_mode(&self) -> anyhow::Result<bool> {
        self.prefs.lock().toggle_dark_mode()
    }

    pub fn connection_state(&self) -> ChannelState {
        self.channel.state()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ChannelState> {
        self.channel.watch_state()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn view(&self) -> FeedView {
        self.reducer.view()
    }

    pub fn stats(&self) -> Stats {
        self.reducer.stats()
    }

    pub fn filters(&self) -> FilterState {
        self.reducer.filters()
    }

    pub fn reducer(&self) -> &Arc<Reducer> {
        &self.reducer
    }

    pub fn channel(&self) -> &LiveChannel {
        &self.channel
    }

    /// Stop background work and release the live connection.
    pub fn shutdown(&self) {
        self.stop_tasks();
        self.channel.disconnect();
    }

    async fn load(&self, filters: &FilterState) -> Result<usize, FeedError> {
        let res = self.reducer.load_snapshot(filters).await;
        if let Err(e) = &res {
            self.notify(Notice::LoadFailed {
                reason: e.to_string(),
            });
        }
        res
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }

    fn stop_tasks(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }

    fn spawn_connection_watch(&self) {
        let mut rx = self.channel.watch_state();
        let notices = self.notices.clone();
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = *rx.borrow_and_update();
                debug!(?state, "live channel state");
                if state == ChannelState::Subscribed {
                    info!("connected to real-time feed");
                    let _ = notices.send(Notice::Connected);
                }
            }
        });
        self.tasks.lock().push(task);
    }

    /// Periodic full refresh; corrects drift from frames lost while reconnecting.
    fn spawn_refresh(&self) {
        let Some(period) = self.refresh_interval else {
            return;
        };
        let reducer = Arc::clone(&self.reducer);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick fires immediately; the initial load already ran.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match reducer.refresh().await {
                    Ok(n) => info!(target: "refresh", articles = n, "periodic refresh"),
                    Err(e) => warn!(target: "refresh", error = %e, "periodic refresh failed"),
                }
            }
        });
        self.tasks.lock().push(task);
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}
