/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Routes the background worker's intercepted requests through named caches.
//!
//! Every `GET` request is matched against an ordered rule table. The first
//! matching rule names the cache and the strategy:
//!
//! - `NetworkFirst` goes to the network and keeps a copy, falling back to
//!   that copy while offline.
//! - `CacheFirst` answers from the cache and only asks the network on a miss.
//! - `StaleWhileRevalidate` answers from the cache and refreshes the entry in
//!   the background for next time.
//!
//! Anything else goes straight to the network and is never stored. Only
//! responses with a status in [`rule::CACHEABLE_STATUSES`] are stored.

pub mod clock;
pub mod fetch;
pub mod rule;
pub mod store;

use std::sync::Arc;

use reqwest::Method;
use tokio::task::JoinHandle;

use self::clock::{CacheClock, Clock};
use self::fetch::{Fetcher, Request, Response};
use self::rule::{find_rule, is_cacheable, CacheRule, Strategy};
use self::store::CacheStorage;
use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    /// Served from cache while a refresh runs.
    HitRevalidating,
    /// Fetched and stored.
    MissStored,
    /// Fetched; the status is not worth keeping.
    MissNotCacheable,
    /// The network failed and the cached copy was served.
    NetworkFallback,
    /// No rule applies.
    Passthrough,
}

#[derive(Debug)]
pub struct RouteOutcome {
    pub response: Response,
    pub cache_outcome: CacheOutcome,
    /// The background refresh started by a stale-while-revalidate hit.
    pub revalidation: Option<JoinHandle<()>>,
}

impl RouteOutcome {
    fn new(response: Response, cache_outcome: CacheOutcome) -> Self {
        Self {
            response,
            cache_outcome,
            revalidation: None,
        }
    }
}

pub struct CacheRouter<F> {
    rules: Vec<CacheRule>,
    storage: Arc<CacheStorage>,
    fetcher: Arc<F>,
}

impl<F: Fetcher> CacheRouter<F> {
    pub fn new(rules: Vec<CacheRule>, fetcher: F) -> Self {
        Self::new_with_clock(rules, fetcher, Arc::new(CacheClock))
    }

    pub fn new_with_clock(rules: Vec<CacheRule>, fetcher: F, clock: Arc<dyn Clock>) -> Self {
        Self {
            rules,
            storage: Arc::new(CacheStorage::new(clock)),
            fetcher: Arc::new(fetcher),
        }
    }

    pub fn rules(&self) -> &[CacheRule] {
        &self.rules
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    pub async fn handle(&self, request: Request) -> Result<RouteOutcome, FetchError> {
        if request.method != Method::GET {
            return self.passthrough(&request).await;
        }
        let rule = match find_rule(&self.rules, &request) {
            Some(rule) => rule,
            None => return self.passthrough(&request).await,
        };
        log::trace!(
            "{} -> {} ({:?})",
            request.url,
            rule.cache_name,
            rule.strategy
        );
        match rule.strategy {
            Strategy::NetworkFirst => self.network_first(rule, &request).await,
            Strategy::CacheFirst => self.cache_first(rule, &request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(rule, &request).await,
        }
    }

    async fn passthrough(&self, request: &Request) -> Result<RouteOutcome, FetchError> {
        let response = self.fetcher.fetch(request).await?;
        Ok(RouteOutcome::new(response, CacheOutcome::Passthrough))
    }

    async fn network_first(
        &self,
        rule: &CacheRule,
        request: &Request,
    ) -> Result<RouteOutcome, FetchError> {
        match fetch_and_store(&self.storage, self.fetcher.as_ref(), rule, request).await {
            Ok((response, outcome)) => Ok(RouteOutcome::new(response, outcome)),
            Err(e) => match self.storage.lookup(rule, &request.cache_key()) {
                Some(cached) => {
                    log::info!("{} unreachable, serving cached copy: {}", request.url, e);
                    Ok(RouteOutcome::new(cached, CacheOutcome::NetworkFallback))
                }
                None => Err(e),
            },
        }
    }

    async fn cache_first(
        &self,
        rule: &CacheRule,
        request: &Request,
    ) -> Result<RouteOutcome, FetchError> {
        if let Some(cached) = self.storage.lookup(rule, &request.cache_key()) {
            return Ok(RouteOutcome::new(cached, CacheOutcome::Hit));
        }
        let (response, outcome) =
            fetch_and_store(&self.storage, self.fetcher.as_ref(), rule, request).await?;
        Ok(RouteOutcome::new(response, outcome))
    }

    async fn stale_while_revalidate(
        &self,
        rule: &CacheRule,
        request: &Request,
    ) -> Result<RouteOutcome, FetchError> {
        let cached = match self.storage.lookup(rule, &request.cache_key()) {
            Some(cached) => cached,
            None => {
                let (response, outcome) =
                    fetch_and_store(&self.storage, self.fetcher.as_ref(), rule, request).await?;
                return Ok(RouteOutcome::new(response, outcome));
            }
        };

        let storage = Arc::clone(&self.storage);
        let fetcher = Arc::clone(&self.fetcher);
        let rule = rule.clone();
        let request = request.clone();
        let revalidation = tokio::spawn(async move {
            if let Err(e) = fetch_and_store(&storage, fetcher.as_ref(), &rule, &request).await {
                log::warn!("revalidating {} failed: {}", request.url, e);
            }
        });
        Ok(RouteOutcome {
            response: cached,
            cache_outcome: CacheOutcome::HitRevalidating,
            revalidation: Some(revalidation),
        })
    }
}

async fn fetch_and_store<F: Fetcher + ?Sized>(
    storage: &CacheStorage,
    fetcher: &F,
    rule: &CacheRule,
    request: &Request,
) -> Result<(Response, CacheOutcome), FetchError> {
    let response = fetcher.fetch(request).await?;
    if !is_cacheable(response.status) {
        log::debug!(
            "not caching {} in {}: status {}",
            request.url,
            rule.cache_name,
            response.status
        );
        return Ok((response, CacheOutcome::MissNotCacheable));
    }
    storage.store(rule, &request.cache_key(), response.clone());
    Ok((response, CacheOutcome::MissStored))
}
