/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

#![allow(unknown_lints)]
#![warn(rust_2018_idioms)]
//! # StoryTale Push
//!
//! This crate keeps a web application's
//! [WebPush](https://developer.mozilla.org/en-US/docs/Web/API/Push_API)
//! subscription in step with the story service, and implements the background
//! worker that caches the application's network traffic and shows its push
//! notifications.
//!
//! ## Background Concepts
//!
//! ### Two copies of one subscription
//!
//! A push subscription lives in two places. The browser's push manager owns
//! the *local* copy: an endpoint URL plus the `p256dh` and `auth` keys a sender
//! needs to encrypt messages. The story service keeps a *remote* copy so it
//! knows where to send pushes when a story is created.
//!
//! The two stores fail independently. The [`PushManager`] changes them in a
//! fixed order and records a compensation for every step with a side effect,
//! so a failure part way through is rolled back instead of leaving a local
//! subscription nobody sends to, or a remote record for a dead endpoint.
//!
//! ### The background worker
//!
//! The worker is a separate execution context. It shares no memory with the
//! page; the page and the platform reach it through a [`WorkerHandle`], and it
//! reaches open windows through [`WorkerMessage`]s. It does two jobs:
//!
//! * [`CacheRouter`] answers intercepted `GET` requests from a fixed table of
//!   named, bounded caches.
//! * [`PushDeliveryHandler`] turns pushes into notifications and notification
//!   clicks into in-app navigation.
//!
//! ## API
//!
//! ### Initialization
//!
//! The host supplies the platform pieces as trait implementations:
//! [`NotificationPlatform`] for the permission prompt, [`PushRegistry`] for
//! the browser push manager, [`Alerts`] to show messages to the user, and an
//! [`AccessTokenProvider`] for the story service's bearer token.
//!
//! ```ignore
//! let config = PushConfiguration::new("https://story-api.example.com/v1", VAPID_PUBLIC_KEY);
//! let connection = ConnectHttp::connect(&config, Arc::new(|| session.token()))?;
//! let manager = PushManager::new(&config, platform, registry, connection, alerts)?;
//!
//! let result = manager.subscribe().await;
//! if !result.ok {
//!     // result.reason says which step failed; nothing was left half done
//! }
//! ```
//!
//! ### Worker
//!
//! ```ignore
//! let router = CacheRouter::new(config.cache_rules()?, HttpFetcher::default());
//! let delivery = PushDeliveryHandler::new(app_origin, display, clients);
//! let (worker, _task) = ServiceWorker::new(router, delivery).spawn();
//!
//! let outcome = worker.fetch(Request::get(url)).await?;
//! ```

use serde::{Deserialize, Serialize};

mod error;
mod internal;
#[cfg(test)]
mod test_utils;

pub use error::{FetchError, PushError, Result, SubscriptionFailure, SubscriptionResult};
pub use internal::cache::clock::{CacheClock, Clock};
pub use internal::cache::fetch::{Destination, Fetcher, HttpFetcher, Request, Response};
pub use internal::cache::rule::{
    default_rules, CacheRule, Expiration, Matcher, Strategy, CACHEABLE_STATUSES,
};
pub use internal::cache::store::CacheStorage;
pub use internal::cache::{CacheOutcome, CacheRouter, RouteOutcome};
pub use internal::capability::{
    Alert, AlertLevel, Alerts, CapabilityProbe, NotificationPlatform, Permission,
};
pub use internal::communications::{AccessTokenProvider, ConnectHttp, Connection, SyncResponse};
pub use internal::config::{PushConfiguration, SubscribeOptions};
pub use internal::delivery::{
    ClickOutcome, Clients, Notification, NotificationAction, NotificationData,
    NotificationDisplay, NotificationOptions, PushDeliveryHandler, WindowClient, WorkerMessage,
};
pub use internal::page::{window_channel, Navigator, PageMessageListener};
pub use internal::push_manager::PushManager;
pub use internal::registry::{PushRegistry, RegistryClient};
pub use internal::worker::{ServiceWorker, WorkerEvent, WorkerHandle};

/// Key material of a subscription; both values are base64url strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub p256dh: String,
    pub auth: String,
}

/// A push subscription as the browser reports it and the story service
/// stores it. The endpoint identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscriptionDescriptor {
    pub endpoint: String,
    pub keys: KeyInfo,
}
