//! Bounded window of displayed articles, newest first.

use std::collections::VecDeque;

use crate::article::Article;

/// Default number of articles kept for display.
pub const DEFAULT_FEED_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct FeedWindow {
    items: VecDeque<Article>,
    cap: usize,
}

impl FeedWindow {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            items: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Put `article` at position 0; anything past the cap falls off the end
    /// (eviction by position, not by timestamp).
    pub fn prepend(&mut self, article: Article) {
        self.items.push_front(article);
        self.items.truncate(self.cap);
    }

    /// Replace the whole window, keeping the first `cap` entries in order.
    pub fn replace(&mut self, articles: Vec<Article>) {
        self.items = articles.into_iter().take(self.cap).collect();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn iter(&self) -> impl Iterator<Item = &Article> {
        self.items.iter()
    }

    /// First article whose id renders as `id`. Duplicates resolve to the newest.
    pub fn find(&self, id: &str) -> Option<&Article> {
        self.items
            .iter()
            .find(|a| a.id.as_ref().is_some_and(|x| x.to_string() == id))
    }

    pub fn to_vec(&self) -> Vec<Article> {
        self.items.iter().cloned().collect()
    }
}

impl Default for FeedWindow {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }
}
