#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use token_icon_resolver::errors::{ResolveError, ResolveResult};
use token_icon_resolver::services::{
    CasePermutationStrategy, IconResolver, InMemoryResolutionCache,
};
use token_icon_resolver::utils::IconFetcher;

pub const BASE: &str = "https://raw.githubusercontent.com/Switcheo/token-icons/main/tokens";

/// In-memory stand-in for the icon repository that records every request
#[derive(Default)]
pub struct RecordingFetcher {
    loadable: Mutex<HashSet<String>>,
    bodies: Mutex<HashMap<String, String>>,
    pub load_delay: Option<Duration>,
    loads: Mutex<Vec<String>>,
    fetches: Mutex<Vec<String>>,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            load_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn serve(&self, url: &str) {
        self.loadable.lock().unwrap().insert(url.to_string());
    }

    pub fn break_url(&self, url: &str) {
        self.loadable.lock().unwrap().remove(url);
    }

    pub fn raw_body(&self, url: &str, body: &str) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn reset_log(&self) {
        self.loads.lock().unwrap().clear();
        self.fetches.lock().unwrap().clear();
    }
}

#[async_trait]
impl IconFetcher for RecordingFetcher {
    async fn load(&self, url: &str) -> ResolveResult<()> {
        self.loads.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        if self.loadable.lock().unwrap().contains(url) {
            Ok(())
        } else {
            Err(ResolveError::load_failed(url, "HTTP 404 Not Found"))
        }
    }

    async fn fetch_text(&self, url: &str) -> ResolveResult<String> {
        self.fetches.lock().unwrap().push(url.to_string());
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ResolveError::fetch_failed(url, "HTTP 404 Not Found"))
    }
}

pub fn default_strategy() -> CasePermutationStrategy {
    CasePermutationStrategy::new(BASE, "svg")
        .with_override("YIELDUSD", format!("{BASE}/YieldUSD.svg"))
        .with_override("WSTETH", format!("{BASE}/wstETH.svg"))
}

pub fn resolver(fetcher: Arc<RecordingFetcher>) -> (IconResolver, InMemoryResolutionCache) {
    let cache = InMemoryResolutionCache::new();
    let resolver = IconResolver::new(
        Arc::new(cache.clone()),
        fetcher,
        Arc::new(default_strategy()),
    );
    (resolver, cache)
}
