// src/stats.rs
//! Aggregate counts over the displayed article list.
//!
//! `Stats` is always re-derived from the list by [`recompute_stats`]; the only
//! other writer is a pushed `stats_update`, merged field by field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::article::{lenient_timestamp, Article, BiasLevel};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_articles: usize,
    pub verified_claims: usize,
    pub low_bias: usize,
    pub medium_bias: usize,
    pub high_bias: usize,
    pub sources_active: usize,
    pub last_update: DateTime<Utc>,
}

impl Stats {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            total_articles: 0,
            verified_claims: 0,
            low_bias: 0,
            medium_bias: 0,
            high_bias: 0,
            sources_active: 0,
            last_update: now,
        }
    }

    /// Single pass over `articles`, stamped with `now`.
    pub fn from_articles<'a, I>(articles: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Article>,
    {
        let mut stats = Stats::empty(now);
        let mut sources: HashSet<&str> = HashSet::new();

        for a in articles {
            stats.total_articles += 1;
            match a.bias_level {
                Some(BiasLevel::Low) => stats.low_bias += 1,
                Some(BiasLevel::Medium) => stats.medium_bias += 1,
                Some(BiasLevel::High) => stats.high_bias += 1,
                None => {}
            }
            if a.verified {
                stats.verified_claims += 1;
            }
            sources.insert(a.source.as_str());
        }

        stats.sources_active = sources.len();
        stats
    }

    /// Overwrite every field present in `patch`; absent fields are kept.
    pub fn merge(&mut self, patch: &StatsPatch) {
        if let Some(v) = patch.total_articles {
            self.total_articles = v;
        }
        if let Some(v) = patch.verified_claims {
            self.verified_claims = v;
        }
        if let Some(v) = patch.low_bias {
            self.low_bias = v;
        }
        if let Some(v) = patch.medium_bias {
            self.medium_bias = v;
        }
        if let Some(v) = patch.high_bias {
            self.high_bias = v;
        }
        if let Some(v) = patch.sources_active {
            self.sources_active = v;
        }
        if let Some(v) = patch.last_update {
            self.last_update = v;
        }
    }

    /// Share of the displayed articles carrying `level`, in 0.0..=1.0.
    pub fn bias_share(&self, level: BiasLevel) -> f32 {
        if self.total_articles == 0 {
            return 0.0;
        }
        let n = match level {
            BiasLevel::Low => self.low_bias,
            BiasLevel::Medium => self.medium_bias,
            BiasLevel::High => self.high_bias,
        };
        n as f32 / self.total_articles as f32
    }
}

/// Partial stats as pushed in `stats_update` or served by the realtime endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_articles: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_claims: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_bias: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium_bias: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_bias: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_active: Option<usize>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_update: Option<DateTime<Utc>>,
}

/// Recompute stats for `articles`, stamped with the current time.
pub fn recompute_stats(articles: &[Article]) -> Stats {
    Stats::from_articles(articles, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Vec<Article> {
        vec![
            Article::new("1", "A").with_bias(BiasLevel::Low).verified(true),
            Article::new("2", "B").with_bias(BiasLevel::High),
            Article::new("3", "A").with_bias(BiasLevel::Low),
            Article::new("4", "C"),
        ]
    }

    #[test]
    fn tallies_bias_verified_and_sources() {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        let s = Stats::from_articles(&sample(), now);
        assert_eq!(s.total_articles, 4);
        assert_eq!(s.low_bias, 2);
        assert_eq!(s.medium_bias, 0);
        assert_eq!(s.high_bias, 1);
        assert_eq!(s.verified_claims, 1);
        assert_eq!(s.sources_active, 3);
        assert!(s.low_bias + s.medium_bias + s.high_bias <= s.total_articles);
        assert_eq!(s.last_update, now);
    }

    #[test]
    fn recompute_is_deterministic_apart_from_timestamp() {
        let list = sample();
        let mut a = recompute_stats(&list);
        let b = recompute_stats(&list);
        a.last_update = b.last_update;
        assert_eq!(a, b);
    }

    #[test]
    fn duplicates_are_counted_not_collapsed() {
        let list = vec![Article::new("dup", "A"), Article::new("dup", "A")];
        let s = recompute_stats(&list);
        assert_eq!(s.total_articles, 2);
        assert_eq!(s.sources_active, 1);
    }

    #[test]
    fn merge_only_touches_present_fields() {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        let mut s = Stats::from_articles(&sample(), now);
        let before = s.clone();
        let patch: StatsPatch = serde_json::from_str(r#"{"lowBias": 7}"#).unwrap();
        s.merge(&patch);
        assert_eq!(s.low_bias, 7);
        assert_eq!(
            Stats {
                low_bias: before.low_bias,
                ..s.clone()
            },
            before
        );
    }

    #[test]
    fn patch_accepts_zone_less_timestamp() {
        let patch: StatsPatch =
            serde_json::from_str(r#"{"lastUpdate": "2025-09-06T09:00:00.123456"}"#).unwrap();
        assert!(patch.last_update.is_some());
    }

    #[test]
    fn bias_share_handles_empty() {
        let s = Stats::empty(Utc::now());
        assert_eq!(s.bias_share(BiasLevel::Low), 0.0);
    }
}
