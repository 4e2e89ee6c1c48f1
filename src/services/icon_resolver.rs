//! Icon resolution service
//!
//! Drives a symbol through cache lookup, sequential candidate attempts and the
//! sanitize fallback:
//!
//! ```text
//! Init -> CacheCheck -> CacheHit                              -> Done
//!                    -> Attempting(0) .. Attempting(n-1)      -> Done(Remote)
//!                    -> AllExhausted -> SanitizeAttempt       -> Done(Local | Unresolved)
//! ```
//!
//! Requests for the same symbol are coalesced: only one state machine runs per
//! symbol at a time and waiters take its cached outcome. A resolution runs on
//! its own task, so a caller that goes away does not cancel it and the outcome
//! still lands in the cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::errors::{AppResult, ResolveError};
use crate::models::{Candidate, ResolvedIcon, Symbol};
use crate::services::candidates::{CandidateStrategy, CasePermutationStrategy};
use crate::services::resolution_cache::{InMemoryResolutionCache, ResolutionCache};
use crate::utils::http_client::{HttpIconFetcher, IconFetcher};
use crate::utils::svg_sanitizer::ContentSanitizer;

/// Steps of a single resolution, used for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Init,
    CacheCheck,
    CacheHit,
    Attempting(usize),
    AllExhausted,
    SanitizeAttempt,
    Done,
}

/// Where a resolution's answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Empty input; nothing attempted, nothing cached
    EmptySymbol,
    Cache,
    /// Waited on a concurrent resolution of the same symbol
    Coalesced,
    Network,
}

/// Full account of one `resolve` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Normalized symbol, `None` for empty input
    pub symbol: Option<String>,
    pub icon: ResolvedIcon,
    pub source: ResolutionSource,
    /// Candidate URLs tried by this call, in order
    pub attempted: Vec<String>,
    /// URL whose raw content was fetched for repair, if the fallback ran
    pub sanitize_source: Option<String>,
}

impl ResolutionReport {
    fn empty() -> Self {
        Self {
            symbol: None,
            icon: ResolvedIcon::Unresolved,
            source: ResolutionSource::EmptySymbol,
            attempted: Vec::new(),
            sanitize_source: None,
        }
    }

    fn settled(symbol: &Symbol, icon: ResolvedIcon, source: ResolutionSource) -> Self {
        Self {
            symbol: Some(symbol.key().to_string()),
            icon,
            source,
            attempted: Vec::new(),
            sanitize_source: None,
        }
    }
}

/// The state machine proper; cloned into the task that runs it
#[derive(Clone)]
struct ResolutionMachine {
    cache: Arc<dyn ResolutionCache>,
    fetcher: Arc<dyn IconFetcher>,
    strategy: Arc<dyn CandidateStrategy>,
    attempt_timeout: Duration,
    fetch_timeout: Duration,
}

struct MachineOutcome {
    icon: ResolvedIcon,
    attempted: Vec<String>,
    sanitize_source: Option<String>,
}

impl ResolutionMachine {
    async fn run(&self, symbol: &Symbol) -> MachineOutcome {
        let started = Instant::now();
        let candidates = self.strategy.generate(symbol);
        let mut attempted = Vec::with_capacity(candidates.len());

        for (index, candidate) in candidates.iter().enumerate() {
            trace!("{} -> {:?}", symbol, ResolutionState::Attempting(index));
            attempted.push(candidate.url.clone());

            match self.attempt(candidate).await {
                Ok(()) => {
                    debug!(
                        "Resolved {} to {} after {} attempt(s) in {:?}",
                        symbol,
                        candidate.url,
                        index + 1,
                        started.elapsed()
                    );
                    return MachineOutcome {
                        icon: ResolvedIcon::remote(candidate.url.clone()),
                        attempted,
                        sanitize_source: None,
                    };
                }
                Err(e) => debug!("{}", e),
            }
        }

        trace!("{} -> {:?}", symbol, ResolutionState::AllExhausted);
        let exhausted = ResolveError::AllCandidatesExhausted {
            symbol: symbol.key().to_string(),
            attempts: attempted.len(),
        };

        let Some(last) = candidates.last() else {
            warn!("{}; no candidates to salvage", exhausted);
            return MachineOutcome {
                icon: ResolvedIcon::Unresolved,
                attempted,
                sanitize_source: None,
            };
        };

        debug!("{}; attempting to repair {}", exhausted, last.url);
        trace!("{} -> {:?}", symbol, ResolutionState::SanitizeAttempt);
        let icon = self.salvage(symbol, last).await;

        MachineOutcome {
            icon,
            attempted,
            sanitize_source: Some(last.url.clone()),
        }
    }

    async fn attempt(&self, candidate: &Candidate) -> Result<(), ResolveError> {
        match tokio::time::timeout(self.attempt_timeout, self.fetcher.load(&candidate.url)).await
        {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Timeout {
                url: candidate.url.clone(),
                after: self.attempt_timeout,
            }),
        }
    }

    /// Fetch the raw content of `candidate` and re-host a repaired copy
    async fn salvage(&self, symbol: &Symbol, candidate: &Candidate) -> ResolvedIcon {
        let fetched =
            match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch_text(&candidate.url))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ResolveError::Timeout {
                    url: candidate.url.clone(),
                    after: self.fetch_timeout,
                }),
            };

        match fetched {
            Ok(raw) => {
                let inspection = ContentSanitizer::inspect(&raw);
                if inspection.needs_repair() {
                    warn!(
                        "Icon content for {} needs repair ({:?}), using best effort",
                        symbol, inspection
                    );
                }
                let icon = ContentSanitizer::package(ContentSanitizer::sanitize(&raw));
                info!("Resolved {} to repaired local icon {}", symbol, icon.reference);
                ResolvedIcon::Local(icon)
            }
            Err(e) => {
                warn!("Giving up on icon for {}: {}", symbol, e);
                ResolvedIcon::Unresolved
            }
        }
    }
}

/// Resolves symbols to renderable icon references
///
/// Never fails: anything that goes wrong ends in `ResolvedIcon::Unresolved`,
/// which the presentation layer renders as a placeholder.
#[derive(Clone)]
pub struct IconResolver {
    machine: ResolutionMachine,
    in_flight: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl IconResolver {
    pub fn new(
        cache: Arc<dyn ResolutionCache>,
        fetcher: Arc<dyn IconFetcher>,
        strategy: Arc<dyn CandidateStrategy>,
    ) -> Self {
        let defaults = crate::config::ResolverConfig::default();
        Self {
            machine: ResolutionMachine {
                cache,
                fetcher,
                strategy,
                attempt_timeout: defaults.attempt_timeout,
                fetch_timeout: defaults.fetch_timeout,
            },
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Resolver with an in-memory cache, the HTTP fetcher and case permutations
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::from_config_with_cache(config, Arc::new(InMemoryResolutionCache::new()))
    }

    /// Like `from_config`, sharing the caller's cache
    pub fn from_config_with_cache(
        config: &Config,
        cache: Arc<dyn ResolutionCache>,
    ) -> AppResult<Self> {
        let fetcher = HttpIconFetcher::from_config(&config.resolver)?;
        Ok(Self::new(
            cache,
            Arc::new(fetcher),
            Arc::new(CasePermutationStrategy::from_config(config)),
        )
        .with_timeouts(config.resolver.attempt_timeout, config.resolver.fetch_timeout))
    }

    pub fn with_timeouts(mut self, attempt_timeout: Duration, fetch_timeout: Duration) -> Self {
        self.machine.attempt_timeout = attempt_timeout;
        self.machine.fetch_timeout = fetch_timeout;
        self
    }

    pub fn cache(&self) -> Arc<dyn ResolutionCache> {
        self.machine.cache.clone()
    }

    pub async fn resolve(&self, input: &str) -> ResolvedIcon {
        self.resolve_with_report(input).await.icon
    }

    pub async fn resolve_with_report(&self, input: &str) -> ResolutionReport {
        let Some(symbol) = Symbol::parse(input) else {
            debug!("Empty symbol, rendering placeholder");
            return ResolutionReport::empty();
        };
        trace!("{} -> {:?}", symbol, ResolutionState::Init);

        trace!("{} -> {:?}", symbol, ResolutionState::CacheCheck);
        if let Some(icon) = self.machine.cache.get(symbol.key()).await {
            trace!("{} -> {:?}", symbol, ResolutionState::CacheHit);
            return ResolutionReport::settled(&symbol, icon, ResolutionSource::Cache);
        }

        let flight = self.acquire_in_flight_lock(symbol.key()).await;
        let guard = flight.clone().lock_owned().await;

        // A concurrent resolution may have settled while we waited
        if let Some(icon) = self.machine.cache.get(symbol.key()).await {
            drop(guard);
            self.release_in_flight_lock(symbol.key(), &flight).await;
            trace!("{} -> {:?} (coalesced)", symbol, ResolutionState::CacheHit);
            return ResolutionReport::settled(&symbol, icon, ResolutionSource::Coalesced);
        }

        let machine = self.machine.clone();
        let resolver = self.clone();
        let task_symbol = symbol.clone();
        let handle = tokio::spawn(async move {
            let outcome = machine.run(&task_symbol).await;
            machine
                .cache
                .set(task_symbol.key(), outcome.icon.clone())
                .await;
            trace!("{} -> {:?}", task_symbol, ResolutionState::Done);
            drop(guard);
            resolver
                .release_in_flight_lock(task_symbol.key(), &flight)
                .await;
            outcome
        });

        match handle.await {
            Ok(outcome) => ResolutionReport {
                symbol: Some(symbol.key().to_string()),
                icon: outcome.icon,
                source: ResolutionSource::Network,
                attempted: outcome.attempted,
                sanitize_source: outcome.sanitize_source,
            },
            Err(e) => {
                warn!("Icon resolution task for {} failed: {}", symbol, e);
                ResolutionReport::settled(&symbol, ResolvedIcon::Unresolved, ResolutionSource::Network)
            }
        }
    }

    /// Resolve several symbols concurrently; duplicates share one resolution
    pub async fn resolve_many<S: AsRef<str>>(&self, inputs: &[S]) -> Vec<ResolvedIcon> {
        futures::future::join_all(inputs.iter().map(|input| self.resolve(input.as_ref()))).await
    }

    /// Drop the cached outcome for a symbol; returns what was removed
    pub async fn invalidate(&self, input: &str) -> Option<ResolvedIcon> {
        let symbol = Symbol::parse(input)?;
        self.machine.cache.invalidate(symbol.key()).await
    }

    /// A previously resolved reference failed to render: forget it and start over
    pub async fn report_broken(&self, input: &str) -> ResolvedIcon {
        if let Some(previous) = self.invalidate(input).await {
            warn!(
                "Cached icon for {} failed to render ({}), re-resolving",
                input.trim(),
                previous.reference().unwrap_or("unresolved")
            );
        }
        self.resolve(input).await
    }

    async fn acquire_in_flight_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut guard = self.in_flight.lock().await;
        guard
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn release_in_flight_lock(&self, key: &str, flight: &Arc<Mutex<()>>) {
        let mut guard = self.in_flight.lock().await;
        if guard
            .get(key)
            .map(|current| Arc::ptr_eq(current, flight))
            .unwrap_or(false)
        {
            guard.remove(key);
        }
    }

    #[cfg(test)]
    async fn in_flight_len(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    use crate::errors::ResolveResult;

    const BASE: &str = "https://icons.example.com/tokens";

    /// Fetcher that serves a fixed set of loadable URLs and raw bodies
    #[derive(Default)]
    struct ScriptedFetcher {
        loadable: HashSet<String>,
        bodies: HashMap<String, String>,
        load_delay: Option<Duration>,
        fetch_delay: Option<Duration>,
        loads: StdMutex<Vec<String>>,
        fetches: StdMutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn loads(&self) -> Vec<String> {
            self.loads.lock().unwrap().clone()
        }

        fn fetches(&self) -> Vec<String> {
            self.fetches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IconFetcher for ScriptedFetcher {
        async fn load(&self, url: &str) -> ResolveResult<()> {
            self.loads.lock().unwrap().push(url.to_string());
            if let Some(delay) = self.load_delay {
                tokio::time::sleep(delay).await;
            }
            if self.loadable.contains(url) {
                Ok(())
            } else {
                Err(ResolveError::load_failed(url, "HTTP 404 Not Found"))
            }
        }

        async fn fetch_text(&self, url: &str) -> ResolveResult<String> {
            self.fetches.lock().unwrap().push(url.to_string());
            if let Some(delay) = self.fetch_delay {
                tokio::time::sleep(delay).await;
            }
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| ResolveError::fetch_failed(url, "HTTP 404 Not Found"))
        }
    }

    fn resolver_with(fetcher: Arc<ScriptedFetcher>) -> IconResolver {
        let strategy = CasePermutationStrategy::new(BASE, "svg")
            .with_override("YIELDUSD", format!("{BASE}/YieldUSD.svg"));
        IconResolver::new(
            Arc::new(InMemoryResolutionCache::new()),
            fetcher,
            Arc::new(strategy),
        )
    }

    #[tokio::test]
    async fn test_first_candidate_success_is_cached() {
        let fetcher = Arc::new(ScriptedFetcher {
            loadable: HashSet::from([format!("{BASE}/eth.svg")]),
            ..Default::default()
        });
        let resolver = resolver_with(fetcher.clone());

        let report = resolver.resolve_with_report("eth").await;
        assert_eq!(report.icon, ResolvedIcon::remote(format!("{BASE}/eth.svg")));
        assert_eq!(report.source, ResolutionSource::Network);
        assert_eq!(report.attempted.len(), 1);
        assert_eq!(
            resolver.cache().get("ETH").await,
            Some(ResolvedIcon::remote(format!("{BASE}/eth.svg")))
        );
    }

    #[tokio::test]
    async fn test_cache_hit_issues_no_attempts() {
        let fetcher = Arc::new(ScriptedFetcher {
            loadable: HashSet::from([format!("{BASE}/eth.svg")]),
            ..Default::default()
        });
        let resolver = resolver_with(fetcher.clone());

        let first = resolver.resolve("ETH").await;
        let loads_after_first = fetcher.loads().len();
        let report = resolver.resolve_with_report("eth").await;

        assert_eq!(report.icon, first);
        assert_eq!(report.source, ResolutionSource::Cache);
        assert_eq!(fetcher.loads().len(), loads_after_first);
    }

    #[tokio::test]
    async fn test_empty_symbol_is_unresolved_without_io() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let resolver = resolver_with(fetcher.clone());

        let report = resolver.resolve_with_report("  ").await;
        assert_eq!(report.icon, ResolvedIcon::Unresolved);
        assert_eq!(report.source, ResolutionSource::EmptySymbol);
        assert!(fetcher.loads().is_empty());
        assert!(fetcher.fetches().is_empty());
        assert!(resolver.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_cached_unresolved_short_circuits() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let resolver = resolver_with(fetcher.clone());

        assert_eq!(resolver.resolve("XYZ").await, ResolvedIcon::Unresolved);
        let loads = fetcher.loads().len();
        let fetches = fetcher.fetches().len();

        let report = resolver.resolve_with_report("xyz").await;
        assert_eq!(report.icon, ResolvedIcon::Unresolved);
        assert_eq!(report.source, ResolutionSource::Cache);
        assert_eq!(fetcher.loads().len(), loads);
        assert_eq!(fetcher.fetches().len(), fetches);
    }

    #[tokio::test]
    async fn test_sanitize_fallback_uses_last_candidate() {
        let strategy = CasePermutationStrategy::new(BASE, "svg");
        let candidates = strategy.generate(&Symbol::parse("XYZ").unwrap());
        let last = candidates.last().unwrap().url.clone();

        let fetcher = Arc::new(ScriptedFetcher {
            bodies: HashMap::from([(last.clone(), "<svg crossorigin=\"\"><g/></svg>".to_string())]),
            ..Default::default()
        });
        let resolver = resolver_with(fetcher.clone());

        let report = resolver.resolve_with_report("XYZ").await;
        assert_eq!(report.attempted.len(), candidates.len());
        assert_eq!(report.sanitize_source.as_deref(), Some(last.as_str()));
        match report.icon {
            ResolvedIcon::Local(icon) => assert_eq!(icon.content, "<svg><g/></svg>"),
            other => panic!("expected local icon, got {other:?}"),
        }
        assert_eq!(fetcher.fetches(), vec![last]);
    }

    #[tokio::test]
    async fn test_attempt_timeout_advances_to_next_candidate() {
        let fetcher = Arc::new(ScriptedFetcher {
            loadable: HashSet::from([format!("{BASE}/eth.svg")]),
            load_delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let resolver = resolver_with(fetcher.clone())
            .with_timeouts(Duration::from_millis(20), Duration::from_millis(20));

        // Every load outlives the bounded wait, including the loadable one
        let report = resolver.resolve_with_report("ETH").await;
        assert_eq!(report.attempted.len(), 6);
        assert_eq!(report.icon, ResolvedIcon::Unresolved);
    }

    #[tokio::test]
    async fn test_slow_raw_fetch_ends_unresolved() {
        let strategy = CasePermutationStrategy::new(BASE, "svg");
        let last = strategy
            .generate(&Symbol::parse("AB").unwrap())
            .last()
            .unwrap()
            .url
            .clone();

        // Repairable content that arrives long after the bounded wait
        let fetcher = Arc::new(ScriptedFetcher {
            bodies: HashMap::from([(last.clone(), "<svg crossorigin><g/></svg>".to_string())]),
            fetch_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let resolver = resolver_with(fetcher.clone())
            .with_timeouts(Duration::from_secs(1), Duration::from_millis(50));

        let started = Instant::now();
        let report = resolver.resolve_with_report("AB").await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(report.icon, ResolvedIcon::Unresolved);
        assert_eq!(report.sanitize_source.as_deref(), Some(last.as_str()));
        assert_eq!(fetcher.fetches(), vec![last]);
        assert_eq!(
            resolver.cache().get("AB").await,
            Some(ResolvedIcon::Unresolved)
        );
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_coalesced() {
        let fetcher = Arc::new(ScriptedFetcher {
            loadable: HashSet::from([format!("{BASE}/Eth.svg")]),
            load_delay: Some(Duration::from_millis(5)),
            ..Default::default()
        });
        let resolver = resolver_with(fetcher.clone());

        let icons = resolver.resolve_many(&["ETH", "eth", " Eth "]).await;
        let expected = ResolvedIcon::remote(format!("{BASE}/Eth.svg"));
        assert!(icons.iter().all(|icon| *icon == expected));

        // One candidate walk: ETH, eth, eTH, Eth
        assert_eq!(fetcher.loads().len(), 4);
        assert_eq!(resolver.in_flight_len().await, 0);
    }

    #[tokio::test]
    async fn test_report_broken_reruns_from_start() {
        let fetcher = Arc::new(ScriptedFetcher {
            loadable: HashSet::from([format!("{BASE}/ETH.svg")]),
            ..Default::default()
        });
        let resolver = resolver_with(fetcher.clone());

        resolver.resolve("ETH").await;
        assert_eq!(fetcher.loads(), vec![format!("{BASE}/ETH.svg")]);

        let icon = resolver.report_broken("ETH").await;
        assert_eq!(icon, ResolvedIcon::remote(format!("{BASE}/ETH.svg")));
        assert_eq!(fetcher.loads().len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_empty_symbol_is_noop() {
        let resolver = resolver_with(Arc::new(ScriptedFetcher::default()));
        assert!(resolver.invalidate("").await.is_none());
    }
}
