// Stats facade.
// Cache-first loading of the stats record with forced refresh, retry, and single-flight fetches.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::batch::{BatchConfig, BatchRunner};
use crate::cache::{CacheStore, DiskSlot};
use crate::clock::Clock;
use crate::error::{PulseError, Result};
use crate::github::endpoints::Endpoints;
use crate::github::{
    Event, EventRecord, LanguageBreakdown, RepoSummary, Repository, SearchTotal, UserProfile,
};
use crate::proxy::{EndpointFetcher, FetchMode, fetch_as};
use crate::retry::{DEFAULT_ATTEMPT_TIMEOUT, RetryPolicy, retry_with};

use super::aggregate::{
    self, AggregationInput, LANGUAGE_TOP_REPOS, LANGUAGE_WINDOW_DAYS, PRIMARY_LANGUAGE_LIMIT,
    TOP_LANGUAGE_LIMIT,
};
use super::record::{StatsRecord, TopLanguages};

/// Key of the stats record in the presentation cache.
pub const STATS_CACHE_KEY: &str = "stats_cache";

/// Where the facade is in its load cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FacadePhase {
    #[default]
    Idle,
    CheckingCache,
    CacheHit,
    CacheMiss,
    Fetching,
    Aggregating,
    Caching,
    Done,
    Error(String),
}

impl FacadePhase {
    /// True while an upstream fetch sequence is running.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            FacadePhase::Fetching | FacadePhase::Aggregating | FacadePhase::Caching
        )
    }
}

/// Settings for a [`StatsFacade`].
#[derive(Debug, Clone)]
pub struct FacadeConfig {
    pub endpoints: Endpoints,
    /// Retry policy for the top-level profile, repo, event and search fetches.
    pub retry: RetryPolicy,
    pub attempt_timeout: Duration,
    /// Settings for the per-repo language fetches.
    pub batch: BatchConfig,
}

impl FacadeConfig {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            retry: RetryPolicy::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            batch: BatchConfig::default(),
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<StatsRecord>>>>;

struct Inner {
    fetcher: Arc<dyn EndpointFetcher>,
    cache: CacheStore<StatsRecord>,
    disk: Option<DiskSlot>,
    clock: Arc<dyn Clock>,
    config: FacadeConfig,
    runner: BatchRunner,
    phase: watch::Sender<FacadePhase>,
    progress: watch::Sender<u8>,
    inflight: Mutex<Option<SharedFetch>>,
}

/// Owns the stats record and the pipeline that produces it.
#[derive(Clone)]
pub struct StatsFacade {
    inner: Arc<Inner>,
}

impl StatsFacade {
    pub fn new(
        fetcher: Arc<dyn EndpointFetcher>,
        cache: CacheStore<StatsRecord>,
        disk: Option<DiskSlot>,
        clock: Arc<dyn Clock>,
        config: FacadeConfig,
    ) -> Self {
        let runner = BatchRunner::new(config.batch);
        Self {
            inner: Arc::new(Inner {
                fetcher,
                cache,
                disk,
                clock,
                config,
                runner,
                phase: watch::Sender::new(FacadePhase::Idle),
                progress: watch::Sender::new(0),
                inflight: Mutex::new(None),
            }),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> FacadePhase {
        self.inner.phase.borrow().clone()
    }

    /// Watch phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<FacadePhase> {
        self.inner.phase.subscribe()
    }

    /// Watch language-fetch progress (0-100).
    pub fn progress(&self) -> watch::Receiver<u8> {
        self.inner.progress.subscribe()
    }

    /// Return the cached record if fresh, otherwise fetch a new one.
    pub async fn load(&self) -> Result<Arc<StatsRecord>> {
        if let Some(running) = self.running() {
            debug!("joining in-flight stats fetch");
            return running.await;
        }

        self.inner.set_phase(FacadePhase::CheckingCache);
        if let Some(record) = self.inner.cached_record() {
            self.inner.set_phase(FacadePhase::CacheHit);
            self.inner.set_phase(FacadePhase::Done);
            return Ok(Arc::new(record));
        }

        self.inner.set_phase(FacadePhase::CacheMiss);
        self.start_or_join(FetchMode::Cached).await
    }

    /// Drop any cached record and fetch a new one, skipping cached upstream
    /// responses. The fresh responses replace them.
    pub async fn force_refresh(&self) -> Result<Arc<StatsRecord>> {
        if let Some(running) = self.running() {
            return running.await;
        }

        self.inner.cache.remove(STATS_CACHE_KEY);
        if let Some(disk) = &self.inner.disk {
            disk.clear();
        }
        self.start_or_join(FetchMode::Refresh).await
    }

    /// Re-run the fetch after an error, without consulting the stats record cache.
    /// Upstream responses that succeeded last time are still served from the proxy cache.
    pub async fn retry(&self) -> Result<Arc<StatsRecord>> {
        self.start_or_join(FetchMode::Cached).await
    }

    fn running(&self) -> Option<SharedFetch> {
        self.inner
            .inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Join the running fetch or spawn a new one. The pipeline runs on its own
    /// task so it finishes even if every caller stops waiting.
    fn start_or_join(&self, mode: FetchMode) -> SharedFetch {
        let mut slot = self.inner.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }

        let inner = Arc::clone(&self.inner);
        // The slot lock is held until the handle is stored, so the task cannot
        // clear it first.
        let task = tokio::spawn(async move {
            let result = inner.run_pipeline(mode).await;
            inner
                .inflight
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take();
            result
        });
        let fetch = async move {
            task.await.unwrap_or_else(|e| {
                error!(error = %e, "stats fetch task failed");
                Err(PulseError::Unknown(format!("Stats fetch task failed: {}", e)))
            })
        }
        .boxed()
        .shared();

        *slot = Some(fetch.clone());
        fetch
    }
}

impl Inner {
    fn set_phase(&self, phase: FacadePhase) {
        debug!(?phase, "stats facade phase");
        self.phase.send_replace(phase);
    }

    /// Memory cache first, then the disk slot (promoting a disk hit).
    fn cached_record(&self) -> Option<StatsRecord> {
        if let Some(record) = self.cache.get(STATS_CACHE_KEY) {
            return Some(record);
        }

        let record = self.disk.as_ref()?.read::<StatsRecord>()?;
        self.cache.set(STATS_CACHE_KEY, record.clone());
        Some(record)
    }

    async fn run_pipeline(&self, mode: FetchMode) -> Result<Arc<StatsRecord>> {
        self.set_phase(FacadePhase::Fetching);
        self.progress.send_replace(0);

        let input = match self.fetch_input(mode).await {
            Ok(input) => input,
            Err(e) => {
                error!(error = %e, "failed to fetch GitHub data");
                self.set_phase(FacadePhase::Error(format!(
                    "Failed to fetch GitHub data: {}",
                    e
                )));
                return Err(e);
            }
        };

        self.set_phase(FacadePhase::Aggregating);
        let record = Arc::new(aggregate::build_record(input, self.clock.now()));

        self.set_phase(FacadePhase::Caching);
        self.store(&record);

        self.set_phase(FacadePhase::Done);
        info!(
            repos = record.total_repos,
            commits = record.total_commits,
            languages = record.top_languages.len(),
            "stats refreshed"
        );
        Ok(record)
    }

    fn store(&self, record: &StatsRecord) {
        if let Err(e) = self.cache.try_set(STATS_CACHE_KEY, record.clone()) {
            warn!(error = %e, "stats record not cached");
        }
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.write(record) {
                warn!(path = %disk.path().display(), error = %e, "failed to persist stats record");
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: String, mode: FetchMode) -> Result<T> {
        retry_with(&self.config.retry, self.config.attempt_timeout, || {
            fetch_as::<T>(self.fetcher.as_ref(), &endpoint, mode)
        })
        .await
    }

    async fn fetch_input(&self, mode: FetchMode) -> Result<AggregationInput> {
        let endpoints = &self.config.endpoints;

        let (profile, repos, events) = tokio::try_join!(
            self.get::<UserProfile>(endpoints.profile(), mode),
            self.get::<Vec<Repository>>(endpoints.owned_repos(), mode),
            self.get::<Vec<Event>>(endpoints.events(), mode),
        )?;
        let public_repos = self
            .get::<Vec<Repository>>(endpoints.public_repos(), mode)
            .await?;
        let (prs, issues) = tokio::try_join!(
            self.get::<SearchTotal>(endpoints.search_prs(), mode),
            self.get::<SearchTotal>(endpoints.search_issues(), mode),
        )?;

        let repos: Vec<RepoSummary> = repos.into_iter().map(RepoSummary::from).collect();
        let public_repos: Vec<RepoSummary> =
            public_repos.into_iter().map(RepoSummary::from).collect();
        let events: Vec<EventRecord> = events.into_iter().map(EventRecord::from).collect();

        let top_languages = self.fetch_languages(&repos, mode).await;

        Ok(AggregationInput {
            profile,
            repos,
            public_repos,
            events,
            total_prs: prs.total_count,
            total_issues: issues.total_count,
            top_languages,
        })
    }

    async fn fetch_languages(&self, repos: &[RepoSummary], mode: FetchMode) -> TopLanguages {
        let candidates = aggregate::language_candidates(
            repos,
            self.clock.now(),
            chrono::Duration::days(LANGUAGE_WINDOW_DAYS),
            LANGUAGE_TOP_REPOS,
        );
        debug!(
            candidates = candidates.len(),
            total = repos.len(),
            "fetching language breakdowns"
        );

        let breakdowns = self
            .runner
            .run(
                &candidates,
                |repo| {
                    let fetcher = Arc::clone(&self.fetcher);
                    let endpoint = Endpoints::languages(&repo.full_name);
                    async move {
                        fetch_as::<LanguageBreakdown>(fetcher.as_ref(), &endpoint, mode).await
                    }
                },
                |progress| {
                    self.progress.send_replace(progress);
                },
            )
            .await;

        let top = aggregate::top_languages(breakdowns.iter().flatten(), TOP_LANGUAGE_LIMIT);
        if !top.is_empty() {
            return top;
        }

        warn!("no language breakdowns available, using primary repo languages");
        aggregate::primary_language_mix(repos, PRIMARY_LANGUAGE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use axum::{Json, Router, http::StatusCode, http::Uri, response::IntoResponse};
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tokio::sync::Semaphore;

    use crate::cache::CacheConfig;
    use crate::clock::ManualClock;
    use crate::github::GitHubClient;
    use crate::proxy::ProxyFetcher;

    /// Canned upstream keyed by endpoint, with call counting and an
    /// optional gate that holds profile requests until released.
    struct FakeFetcher {
        responses: Mutex<HashMap<String, Result<Value>>>,
        calls: Mutex<HashMap<String, usize>>,
        refreshes: Mutex<HashMap<String, usize>>,
        gate: Option<Arc<Semaphore>>,
    }

    impl FakeFetcher {
        fn new(responses: HashMap<String, Result<Value>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(HashMap::new()),
                refreshes: Mutex::new(HashMap::new()),
                gate: None,
            }
        }

        fn calls(&self, endpoint: &str) -> usize {
            self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
        }

        fn refreshes(&self, endpoint: &str) -> usize {
            self.refreshes
                .lock()
                .unwrap()
                .get(endpoint)
                .copied()
                .unwrap_or(0)
        }

        fn respond(&self, endpoint: &str, response: Result<Value>) {
            self.responses
                .lock()
                .unwrap()
                .insert(endpoint.to_string(), response);
        }
    }

    #[async_trait]
    impl EndpointFetcher for FakeFetcher {
        async fn fetch(&self, endpoint: &str, _use_cache: bool) -> Result<Value> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(endpoint.to_string())
                .or_default() += 1;

            if endpoint == "/user" {
                if let Some(gate) = &self.gate {
                    let _permit = gate.acquire().await.unwrap();
                }
            }

            self.responses
                .lock()
                .unwrap()
                .get(endpoint)
                .cloned()
                .unwrap_or_else(|| Err(PulseError::NotFound(endpoint.to_string())))
        }

        async fn refresh(&self, endpoint: &str) -> Result<Value> {
            *self
                .refreshes
                .lock()
                .unwrap()
                .entry(endpoint.to_string())
                .or_default() += 1;
            self.fetch(endpoint, false).await
        }
    }

    /// Serve `payloads` over HTTP, keyed by path and query.
    async fn spawn_upstream(payloads: Arc<Mutex<HashMap<String, Value>>>) -> String {
        let router = Router::new().fallback(move |uri: Uri| {
            let payloads = payloads.clone();
            async move {
                let key = uri.path_and_query().map(|p| p.as_str()).unwrap_or_default();
                let payload = payloads.lock().unwrap().get(key).cloned();
                match payload {
                    Some(value) => Json(value).into_response(),
                    None => StatusCode::NOT_FOUND.into_response(),
                }
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    fn repo_json(owner: &str, name: &str, language: &str, size: u64, stars: u64) -> Value {
        json!({
            "name": name,
            "full_name": format!("{}/{}", owner, name),
            "owner": { "login": owner },
            "language": language,
            "size": size,
            "stargazers_count": stars,
            "forks_count": 1,
            "pushed_at": "2026-06-10T00:00:00Z",
            "updated_at": "2026-06-10T00:00:00Z",
            "fork": false,
            "private": false
        })
    }

    fn upstream() -> HashMap<String, Result<Value>> {
        let endpoints = Endpoints::new("octo", true);
        let owned = json!([
            repo_json("octo", "engine", "Rust", 700, 10),
            repo_json("octo", "site", "TypeScript", 300, 2),
            repo_json("friends", "shared", "Go", 50, 0),
        ]);
        let public = json!([
            repo_json("octo", "engine", "Rust", 700, 10),
            repo_json("octo", "site", "TypeScript", 300, 2),
        ]);

        HashMap::from([
            (
                endpoints.profile(),
                Ok(json!({
                    "login": "octo",
                    "public_repos": 2,
                    "total_private_repos": 1,
                    "followers": 12,
                    "following": 3,
                    "public_gists": 0,
                    "created_at": "2015-01-01T00:00:00Z",
                    "updated_at": "2026-06-01T00:00:00Z"
                })),
            ),
            (endpoints.owned_repos(), Ok(owned)),
            (endpoints.public_repos(), Ok(public)),
            (
                endpoints.events(),
                Ok(json!([
                    {
                        "type": "PushEvent",
                        "created_at": "2026-06-14T00:00:00Z",
                        "payload": { "commits": [{ "sha": "a" }, { "sha": "b" }] }
                    },
                    { "type": "WatchEvent", "created_at": "2026-06-13T00:00:00Z" }
                ])),
            ),
            (endpoints.search_prs(), Ok(json!({ "total_count": 5 }))),
            (endpoints.search_issues(), Ok(json!({ "total_count": 2 }))),
            (
                Endpoints::languages("octo/engine"),
                Ok(json!({ "Rust": 600, "Shell": 100 })),
            ),
            (
                Endpoints::languages("octo/site"),
                Ok(json!({ "TypeScript": 300 })),
            ),
            (
                Endpoints::languages("friends/shared"),
                Ok(json!({ "Go": 0 })),
            ),
        ])
    }

    fn facade_with(
        fetcher: Arc<dyn EndpointFetcher>,
        disk: Option<DiskSlot>,
    ) -> (StatsFacade, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(now()));
        let mut config = FacadeConfig::new(Endpoints::new("octo", true));
        config.retry = RetryPolicy::none();
        config.batch.retry = RetryPolicy::none();
        config.attempt_timeout = StdDuration::from_secs(5);

        let cache = CacheStore::new(CacheConfig::default(), clock.clone());
        let facade = StatsFacade::new(fetcher, cache, disk, clock.clone(), config);
        (facade, clock)
    }

    #[tokio::test]
    async fn test_load_fetches_then_hits_cache() {
        let fetcher = Arc::new(FakeFetcher::new(upstream()));
        let (facade, _) = facade_with(fetcher.clone(), None);
        assert_eq!(facade.phase(), FacadePhase::Idle);

        let record = facade.load().await.unwrap();
        assert_eq!(facade.phase(), FacadePhase::Done);
        assert_eq!(record.total_stars, 12);
        assert_eq!(record.total_forks, 2);
        assert_eq!(record.private_repos, 1);
        assert_eq!(record.total_commits, 2);
        assert_eq!(record.total_prs, 5);
        assert_eq!(record.total_issues, 2);
        assert_eq!(record.contributed_to, 1);
        // 3 repos pushed recently + 2 recent events
        assert_eq!(record.recent_activity_score, 5);
        assert_eq!(record.top_languages.get("Rust"), Some(60));
        assert_eq!(record.top_languages.get("TypeScript"), Some(30));
        assert_eq!(record.top_languages.get("Shell"), Some(10));
        assert_eq!(*facade.progress().borrow(), 100);

        let again = facade.load().await.unwrap();
        assert_eq!(*again, *record);
        assert_eq!(fetcher.calls("/user"), 1);
        assert_eq!(fetcher.refreshes("/user"), 0);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let fetcher = Arc::new(FakeFetcher::new(upstream()));
        let (facade, _) = facade_with(fetcher.clone(), None);

        facade.load().await.unwrap();
        facade.force_refresh().await.unwrap();
        assert_eq!(fetcher.calls("/user"), 2);
        assert_eq!(fetcher.refreshes("/user"), 1);
        assert_eq!(fetcher.refreshes(&Endpoints::languages("octo/engine")), 1);
        assert_eq!(facade.phase(), FacadePhase::Done);
    }

    #[tokio::test]
    async fn test_force_refresh_replaces_proxy_cached_responses() {
        let payloads: HashMap<String, Value> = upstream()
            .into_iter()
            .map(|(endpoint, response)| (endpoint, response.unwrap()))
            .collect();
        let payloads = Arc::new(Mutex::new(payloads));
        let base = spawn_upstream(payloads.clone()).await;

        let client = GitHubClient::new(&base, Some("secret"), StdDuration::from_secs(5)).unwrap();
        let proxy_clock = Arc::new(ManualClock::new(now()));
        let proxy = Arc::new(ProxyFetcher::new(
            client,
            CacheStore::new(CacheConfig::default(), proxy_clock),
        ));
        let (facade, _) = facade_with(proxy.clone(), None);

        assert_eq!(facade.load().await.unwrap().followers, 12);
        payloads.lock().unwrap().get_mut("/user").unwrap()["followers"] = json!(99);

        let refreshed = facade.force_refresh().await.unwrap();
        assert_eq!(refreshed.followers, 99);
        assert_eq!(proxy.cache().get("/user").unwrap()["followers"], 99);
        assert_eq!(facade.load().await.unwrap().followers, 99);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_fetch() {
        let gate = Arc::new(Semaphore::new(0));
        let mut fake = FakeFetcher::new(upstream());
        fake.gate = Some(gate.clone());
        let fetcher = Arc::new(fake);
        let (facade, _) = facade_with(fetcher.clone(), None);

        let (a, b, _) = tokio::join!(facade.load(), facade.load(), async {
            tokio::time::sleep(StdDuration::from_millis(20)).await;
            gate.add_permits(10);
        });

        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(fetcher.calls("/user"), 1);
        assert_eq!(fetcher.calls("/user/repos?per_page=100&sort=updated&type=all"), 1);
    }

    #[tokio::test]
    async fn test_abandoned_load_still_completes() {
        let gate = Arc::new(Semaphore::new(0));
        let mut fake = FakeFetcher::new(upstream());
        fake.gate = Some(gate.clone());
        let fetcher = Arc::new(fake);
        let (facade, _) = facade_with(fetcher.clone(), None);

        let abandoned = tokio::time::timeout(StdDuration::from_millis(20), facade.load()).await;
        assert!(abandoned.is_err());
        assert!(facade.phase().is_busy());

        gate.add_permits(10);
        let mut phases = facade.subscribe();
        tokio::time::timeout(
            StdDuration::from_secs(5),
            phases.wait_for(|phase| *phase == FacadePhase::Done),
        )
        .await
        .unwrap()
        .unwrap();

        let record = facade.load().await.unwrap();
        assert_eq!(record.followers, 12);
        assert_eq!(fetcher.calls("/user"), 1);
    }

    #[tokio::test]
    async fn test_profile_failure_then_retry() {
        let fetcher = Arc::new(FakeFetcher::new(upstream()));
        fetcher.respond("/user", Err(PulseError::RateLimited { reset_at: None }));
        let (facade, _) = facade_with(fetcher.clone(), None);

        let err = facade.load().await.unwrap_err();
        assert!(matches!(err, PulseError::RateLimited { .. }));
        match facade.phase() {
            FacadePhase::Error(message) => assert!(message.contains("rate limit")),
            other => panic!("expected error phase, got {:?}", other),
        }

        fetcher.respond("/user", upstream().remove("/user").unwrap());
        let record = facade.retry().await.unwrap();
        assert_eq!(record.followers, 12);
        assert_eq!(facade.phase(), FacadePhase::Done);
    }

    #[tokio::test]
    async fn test_language_failures_are_absorbed() {
        let fetcher = Arc::new(FakeFetcher::new(upstream()));
        fetcher.respond(
            &Endpoints::languages("octo/engine"),
            Err(PulseError::UpstreamUnavailable),
        );
        let (facade, _) = facade_with(fetcher.clone(), None);

        let record = facade.load().await.unwrap();
        assert_eq!(record.top_languages.len(), 1);
        assert_eq!(record.top_languages.get("TypeScript"), Some(100));
    }

    #[tokio::test]
    async fn test_all_language_failures_fall_back_to_primary_language() {
        let mut responses = upstream();
        responses.retain(|endpoint, _| !endpoint.ends_with("/languages"));
        let fetcher = Arc::new(FakeFetcher::new(responses));
        let (facade, _) = facade_with(fetcher, None);

        let record = facade.load().await.unwrap();
        assert_eq!(record.top_languages.get("Rust"), Some(67));
        assert_eq!(record.top_languages.get("TypeScript"), Some(29));
        assert_eq!(record.top_languages.get("Go"), Some(5));
    }

    #[tokio::test]
    async fn test_expired_cache_refetches() {
        let fetcher = Arc::new(FakeFetcher::new(upstream()));
        let (facade, clock) = facade_with(fetcher.clone(), None);

        facade.load().await.unwrap();
        clock.advance(chrono::Duration::days(15));
        facade.load().await.unwrap();
        assert_eq!(fetcher.calls("/user"), 2);
    }

    #[tokio::test]
    async fn test_disk_slot_survives_new_facade() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stats_cache.json");
        let slot = |clock: Arc<ManualClock>| {
            DiskSlot::new(&path, StdDuration::from_secs(3600), clock)
        };

        let fetcher = Arc::new(FakeFetcher::new(upstream()));
        let clock = Arc::new(ManualClock::new(now()));
        let (first, _) = facade_with(fetcher.clone(), Some(slot(clock.clone())));
        let record = first.load().await.unwrap();
        assert!(path.exists());

        let (second, _) = facade_with(fetcher.clone(), Some(slot(clock)));
        let cached = second.load().await.unwrap();
        assert_eq!(*cached, *record);
        assert_eq!(fetcher.calls("/user"), 1);

        second.force_refresh().await.unwrap();
        assert_eq!(fetcher.calls("/user"), 2);
    }
}
