/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::time::Duration;

use url::{Origin, Url};

use super::fetch::{Destination, Request};

const DAY: u64 = 60 * 60 * 24;

/// Statuses worth keeping: opaque cross-origin responses and plain 200s.
pub const CACHEABLE_STATUSES: [u16; 2] = [0, 200];

pub fn is_cacheable(status: u16) -> bool {
    CACHEABLE_STATUSES.contains(&status)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Same origin as `origin`; `images` selects image requests or
    /// everything else.
    SameOrigin { origin: Origin, images: bool },
    OriginIs(String),
    OriginContains(String),
    AnyOf(Vec<Matcher>),
}

impl Matcher {
    pub fn matches(&self, request: &Request) -> bool {
        match self {
            Matcher::SameOrigin { origin, images } => {
                request.url.origin() == *origin
                    && (request.destination == Destination::Image) == *images
            }
            Matcher::OriginIs(expected) => request.url.origin().ascii_serialization() == *expected,
            Matcher::OriginContains(needle) => request
                .url
                .origin()
                .ascii_serialization()
                .contains(needle.as_str()),
            Matcher::AnyOf(matchers) => matchers.iter().any(|m| m.matches(request)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
    StaleWhileRevalidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiration {
    pub max_entries: usize,
    pub max_age: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRule {
    pub cache_name: String,
    pub matcher: Matcher,
    pub strategy: Strategy,
    pub expiration: Expiration,
}

impl CacheRule {
    pub fn new(
        cache_name: impl Into<String>,
        matcher: Matcher,
        strategy: Strategy,
        max_entries: usize,
        max_age: Duration,
    ) -> Self {
        Self {
            cache_name: cache_name.into(),
            matcher,
            strategy,
            expiration: Expiration {
                max_entries,
                max_age,
            },
        }
    }
}

/// The worker's routing table, in evaluation order.
pub fn default_rules(api_base: &Url) -> Vec<CacheRule> {
    let api_origin = api_base.origin();
    vec![
        CacheRule::new(
            "storytale-api",
            Matcher::SameOrigin {
                origin: api_origin.clone(),
                images: false,
            },
            Strategy::NetworkFirst,
            30,
            Duration::from_secs(DAY),
        ),
        CacheRule::new(
            "storytale-api-images",
            Matcher::SameOrigin {
                origin: api_origin,
                images: true,
            },
            Strategy::StaleWhileRevalidate,
            50,
            Duration::from_secs(7 * DAY),
        ),
        CacheRule::new(
            "fontawesome",
            Matcher::AnyOf(vec![
                Matcher::OriginIs("https://cdnjs.cloudflare.com".to_string()),
                Matcher::OriginContains("fontawesome".to_string()),
            ]),
            Strategy::CacheFirst,
            30,
            Duration::from_secs(365 * DAY),
        ),
        CacheRule::new(
            "osm-tiles",
            Matcher::OriginContains("tile.openstreetmap.org".to_string()),
            Strategy::CacheFirst,
            100,
            Duration::from_secs(7 * DAY),
        ),
    ]
}

/// First match wins.
pub fn find_rule<'a>(rules: &'a [CacheRule], request: &Request) -> Option<&'a CacheRule> {
    rules.iter().find(|rule| rule.matcher.matches(request))
}
