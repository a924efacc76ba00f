// Aggregated stats record.
// The single value the rest of the site consumes; replaced wholesale on each refresh.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ranked language → percentage mapping.
///
/// Serializes as a JSON object whose key order is the ranking order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopLanguages(Vec<(String, u32)>);

impl TopLanguages {
    pub fn new(ranked: Vec<(String, u32)>) -> Self {
        Self(ranked)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, language: &str) -> Option<u32> {
        self.0
            .iter()
            .find(|(name, _)| name == language)
            .map(|(_, pct)| *pct)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(name, pct)| (name.as_str(), *pct))
    }
}

impl Serialize for TopLanguages {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, pct) in &self.0 {
            map.serialize_entry(name, pct)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TopLanguages {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RankedVisitor;

        impl<'de> Visitor<'de> for RankedVisitor {
            type Value = TopLanguages;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of language names to percentages")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut ranked = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, pct)) = access.next_entry::<String, u32>()? {
                    ranked.push((name, pct));
                }
                Ok(TopLanguages(ranked))
            }
        }

        deserializer.deserialize_map(RankedVisitor)
    }
}

/// Summary of a developer's GitHub activity.
///
/// `total_contributions`, `current_streak` and `longest_streak` are
/// estimates derived from the recent event feed, not GitHub's contribution
/// calendar. Present them as approximations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    pub total_stars: u64,
    pub total_forks: u64,
    pub total_repos: u64,
    pub private_repos: u64,
    pub followers: u64,
    pub following: u64,
    pub public_gists: u64,
    pub account_created: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub top_languages: TopLanguages,
    pub recent_activity_score: u64,
    /// Commits pushed this calendar year, as visible in the event feed.
    pub total_commits: u64,
    #[serde(rename = "totalPRs")]
    pub total_prs: u64,
    pub total_issues: u64,
    pub contributed_to: u64,
    /// Estimate.
    pub total_contributions: u64,
    /// Estimate in days.
    pub current_streak: u64,
    /// Estimate in days.
    pub longest_streak: u64,
    pub last_updated: DateTime<Utc>,
}
