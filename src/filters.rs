// src/filters.rs
//! FilterState: the user-selected narrowing criteria sent with every
//! snapshot/search request.

use serde::{Deserialize, Serialize};

use crate::article::BiasLevel;

/// Category sent with search requests.
pub const SEARCH_CATEGORY: &str = "politics";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    #[default]
    All,
    NorthAmerica,
    Europe,
    Asia,
    MiddleEast,
    Africa,
    LatinAmerica,
    Oceania,
}

impl Region {
    pub const ALL: [Region; 8] = [
        Region::All,
        Region::NorthAmerica,
        Region::Europe,
        Region::Asia,
        Region::MiddleEast,
        Region::Africa,
        Region::LatinAmerica,
        Region::Oceania,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::All => "all",
            Region::NorthAmerica => "north-america",
            Region::Europe => "europe",
            Region::Asia => "asia",
            Region::MiddleEast => "middle-east",
            Region::Africa => "africa",
            Region::LatinAmerica => "latin-america",
            Region::Oceania => "oceania",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Region::All => "All Regions",
            Region::NorthAmerica => "North America",
            Region::Europe => "Europe",
            Region::Asia => "Asia",
            Region::MiddleEast => "Middle East",
            Region::Africa => "Africa",
            Region::LatinAmerica => "Latin America",
            Region::Oceania => "Oceania",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    #[default]
    All,
    Elections,
    Diplomacy,
    Trade,
    Security,
    Climate,
    HumanRights,
    Technology,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::All => "all",
            Topic::Elections => "elections",
            Topic::Diplomacy => "diplomacy",
            Topic::Trade => "trade",
            Topic::Security => "security",
            Topic::Climate => "climate",
            Topic::HumanRights => "human-rights",
            Topic::Technology => "technology",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Topic::All => "All Topics",
            Topic::Elections => "Elections & Democracy",
            Topic::Diplomacy => "International Relations",
            Topic::Trade => "Trade & Economics",
            Topic::Security => "Security & Defense",
            Topic::Climate => "Climate Policy",
            Topic::HumanRights => "Human Rights",
            Topic::Technology => "Tech Policy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1h")]
    LastHour,
    #[default]
    #[serde(rename = "24h")]
    LastDay,
    #[serde(rename = "7d")]
    LastWeek,
    #[serde(rename = "30d")]
    LastMonth,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::LastHour => "1h",
            TimeRange::LastDay => "24h",
            TimeRange::LastWeek => "7d",
            TimeRange::LastMonth => "30d",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::LastHour => "Last Hour",
            TimeRange::LastDay => "Last 24 Hours",
            TimeRange::LastWeek => "Last 7 Days",
            TimeRange::LastMonth => "Last 30 Days",
        }
    }
}

/// Bias narrowing; `All` means no narrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasFilter {
    #[default]
    All,
    Low,
    Medium,
    High,
}

impl BiasFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiasFilter::All => "all",
            BiasFilter::Low => "low",
            BiasFilter::Medium => "medium",
            BiasFilter::High => "high",
        }
    }

    pub fn level(&self) -> Option<BiasLevel> {
        match self {
            BiasFilter::All => None,
            BiasFilter::Low => Some(BiasLevel::Low),
            BiasFilter::Medium => Some(BiasLevel::Medium),
            BiasFilter::High => Some(BiasLevel::High),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub region: Region,
    pub topic: Topic,
    pub time_range: TimeRange,
    pub bias_level: BiasFilter,
    pub verified: bool,
}

impl FilterState {
    /// Number of fields narrowed away from their defaults.
    pub fn active_count(&self) -> usize {
        [
            self.region != Region::All,
            self.topic != Topic::All,
            self.time_range != TimeRange::LastDay,
            self.bias_level != BiasFilter::All,
            self.verified,
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    /// Query pairs for a snapshot fetch.
    pub fn snapshot_query(&self, limit: usize) -> Vec<(&'static str, String)> {
        let mut q = self.filter_pairs();
        q.push(("limit", limit.to_string()));
        q
    }

    /// Query pairs for a search fetch: `q`, the fixed category, the filters, `limit`.
    pub fn search_query(&self, query: &str, limit: usize) -> Vec<(&'static str, String)> {
        let mut q = vec![
            ("q", query.to_string()),
            ("category", SEARCH_CATEGORY.to_string()),
        ];
        q.extend(self.filter_pairs());
        q.push(("limit", limit.to_string()));
        q
    }

    fn filter_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("region", self.region.as_str().to_string()),
            ("topic", self.topic.as_str().to_string()),
            ("timeRange", self.time_range.as_str().to_string()),
            ("biasLevel", self.bias_level.as_str().to_string()),
            ("verified", self.verified.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_reset_state() {
        let f = FilterState::default();
        assert_eq!(
            serde_json::to_value(&f).unwrap(),
            json!({
                "region": "all",
                "topic": "all",
                "timeRange": "24h",
                "biasLevel": "all",
                "verified": false
            })
        );
        assert_eq!(f.active_count(), 0);
    }

    #[test]
    fn active_count_ignores_defaults() {
        let f = FilterState {
            region: Region::MiddleEast,
            time_range: TimeRange::LastWeek,
            verified: true,
            ..Default::default()
        };
        assert_eq!(f.active_count(), 3);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let f: FilterState =
            serde_json::from_value(json!({"topic": "human-rights", "biasLevel": "low"})).unwrap();
        assert_eq!(f.topic, Topic::HumanRights);
        assert_eq!(f.bias_level.level(), Some(BiasLevel::Low));
        assert_eq!(f.time_range, TimeRange::LastDay);
    }

    #[test]
    fn search_query_order_and_category() {
        let f = FilterState::default();
        let q = f.search_query("nato", 50);
        assert_eq!(q[0], ("q", "nato".to_string()));
        assert_eq!(q[1], ("category", "politics".to_string()));
        assert_eq!(q.last(), Some(&("limit", "50".to_string())));
        assert!(q.contains(&("verified", "false".to_string())));
    }

    #[test]
    fn region_wire_names_roundtrip() {
        for r in Region::ALL {
            let v = serde_json::to_value(r).unwrap();
            assert_eq!(v, json!(r.as_str()));
        }
    }
}
