// Aggregation engine.
// Pure functions that turn fetched repos and events into derived statistics.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::github::{EventRecord, LanguageBreakdown, RepoSummary, UserProfile};

use super::record::{StatsRecord, TopLanguages};

/// Repos pushed longer ago than this are ignored for the language mix.
pub const LANGUAGE_WINDOW_DAYS: i64 = 365;

/// Largest number of repos whose language breakdown is fetched.
pub const LANGUAGE_TOP_REPOS: usize = 20;

/// Number of languages reported from per-repo breakdowns.
pub const TOP_LANGUAGE_LIMIT: usize = 6;

/// Number of languages reported by the primary-language fallback.
pub const PRIMARY_LANGUAGE_LIMIT: usize = 5;

/// Window for the recent-activity score.
pub const RECENT_WINDOW_DAYS: i64 = 30;

const CURRENT_STREAK_CAP: u64 = 30;
const LONGEST_STREAK_CAP: u64 = 100;

/// Repos worth fetching a language breakdown for: non-fork, non-empty,
/// pushed within the window, largest first, capped at `top_k`.
pub fn language_candidates<'a>(
    repos: &'a [RepoSummary],
    now: DateTime<Utc>,
    window: Duration,
    top_k: usize,
) -> Vec<&'a RepoSummary> {
    let cutoff = now - window;
    let mut candidates: Vec<&RepoSummary> = repos
        .iter()
        .filter(|repo| !repo.is_fork && repo.size_bytes > 0)
        .filter(|repo| repo.pushed_at.is_some_and(|at| at > cutoff))
        .collect();

    candidates.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
    candidates.truncate(top_k);
    candidates
}

/// Combine per-repo byte counts into the ranked top languages.
///
/// Percentages are relative to the bytes of the languages kept, each rounded
/// independently, so the total may be off 100 by rounding.
pub fn top_languages<'a, I>(breakdowns: I, limit: usize) -> TopLanguages
where
    I: IntoIterator<Item = &'a LanguageBreakdown>,
{
    let mut bytes: HashMap<&str, u64> = HashMap::new();
    for breakdown in breakdowns {
        for (language, &count) in breakdown {
            if count > 0 {
                *bytes.entry(language.as_str()).or_default() += count as u64;
            }
        }
    }

    rank(bytes, limit)
}

/// Fallback mix from each repo's primary language weighted by repo size.
pub fn primary_language_mix(repos: &[RepoSummary], limit: usize) -> TopLanguages {
    let mut bytes: HashMap<&str, u64> = HashMap::new();
    for repo in repos {
        if let Some(language) = repo.language.as_deref() {
            if repo.size_bytes > 0 {
                *bytes.entry(language).or_default() += repo.size_bytes;
            }
        }
    }

    rank(bytes, limit)
}

fn rank(bytes: HashMap<&str, u64>, limit: usize) -> TopLanguages {
    let mut by_bytes: Vec<(&str, u64)> = bytes.into_iter().collect();
    by_bytes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    by_bytes.truncate(limit);

    let kept_total: u64 = by_bytes.iter().map(|(_, b)| b).sum();
    if kept_total == 0 {
        return TopLanguages::default();
    }

    let mut ranked: Vec<(&str, u64, u32)> = by_bytes
        .into_iter()
        .map(|(name, b)| {
            let pct = ((b as f64 / kept_total as f64) * 100.0).round() as u32;
            (name, b, pct)
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.2.cmp(&a.2)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.0.cmp(b.0))
    });

    TopLanguages::new(
        ranked
            .into_iter()
            .map(|(name, _, pct)| (name.to_string(), pct))
            .collect(),
    )
}

/// Commits pushed during `now`'s calendar year. Pushes without a commit
/// list count as one.
pub fn count_commits(events: &[EventRecord], now: DateTime<Utc>) -> u64 {
    events
        .iter()
        .filter(|event| event.is_push() && event.created_at.year() == now.year())
        .map(|event| u64::from(event.commit_count.unwrap_or(1)))
        .sum()
}

/// Repos pushed plus events created within the last 30 days.
pub fn recent_activity_score(
    repos: &[RepoSummary],
    events: &[EventRecord],
    now: DateTime<Utc>,
) -> u64 {
    let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
    let recent_repos = repos
        .iter()
        .filter(|repo| repo.pushed_at.is_some_and(|at| at > cutoff))
        .count();
    let recent_events = events
        .iter()
        .filter(|event| event.created_at > cutoff)
        .count();

    (recent_repos + recent_events) as u64
}

/// Estimated streaks in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakEstimate {
    pub current: u64,
    pub longest: u64,
}

/// Heuristic streaks from the recent-activity score. The public event feed
/// has no per-day calendar, so these are bounded guesses.
pub fn estimate_streaks(recent_activity: u64) -> StreakEstimate {
    StreakEstimate {
        current: recent_activity.min(CURRENT_STREAK_CAP),
        longest: recent_activity.saturating_mul(2).min(LONGEST_STREAK_CAP),
    }
}

/// Heuristic contribution total.
pub fn estimate_contributions(total_commits: u64, recent_activity: u64) -> u64 {
    total_commits.saturating_add(recent_activity.saturating_mul(3))
}

/// Distinct owners of repos not owned by `own_login`.
pub fn unique_contributed_to(repos: &[RepoSummary], own_login: &str) -> u64 {
    repos
        .iter()
        .map(|repo| repo.owner_login.as_str())
        .filter(|owner| !owner.eq_ignore_ascii_case(own_login))
        .collect::<HashSet<_>>()
        .len() as u64
}

pub fn total_stars(repos: &[RepoSummary]) -> u64 {
    repos.iter().map(|repo| repo.star_count).sum()
}

pub fn total_forks(repos: &[RepoSummary]) -> u64 {
    repos.iter().map(|repo| repo.fork_count).sum()
}

/// Most recent event time, falling back to the profile's last update.
pub fn last_activity(events: &[EventRecord], profile: &UserProfile) -> DateTime<Utc> {
    events
        .iter()
        .map(|event| event.created_at)
        .max()
        .unwrap_or(profile.updated_at)
}

/// Everything fetched for one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregationInput {
    pub profile: UserProfile,
    /// Every repo visible to the account (owned and collaborations).
    pub repos: Vec<RepoSummary>,
    /// Public repos owned by the account.
    pub public_repos: Vec<RepoSummary>,
    pub events: Vec<EventRecord>,
    pub total_prs: u64,
    pub total_issues: u64,
    pub top_languages: TopLanguages,
}

/// Assemble the stats record.
pub fn build_record(input: AggregationInput, now: DateTime<Utc>) -> StatsRecord {
    let total_commits = count_commits(&input.events, now);
    let recent = recent_activity_score(&input.repos, &input.events, now);
    let streaks = estimate_streaks(recent);

    StatsRecord {
        total_stars: total_stars(&input.public_repos),
        total_forks: total_forks(&input.public_repos),
        total_repos: input.profile.public_repos,
        private_repos: input.profile.total_private_repos.unwrap_or(0),
        followers: input.profile.followers,
        following: input.profile.following,
        public_gists: input.profile.public_gists,
        account_created: input.profile.created_at,
        last_activity: last_activity(&input.events, &input.profile),
        top_languages: input.top_languages,
        recent_activity_score: recent,
        total_commits,
        total_prs: input.total_prs,
        total_issues: input.total_issues,
        contributed_to: unique_contributed_to(&input.repos, &input.profile.login),
        total_contributions: estimate_contributions(total_commits, recent),
        current_streak: streaks.current,
        longest_streak: streaks.longest,
        last_updated: now,
    }
}
