/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Stateful in-memory stand-ins for the platform and the story service.
//! They share state through an `Arc`, so a clone handed to the code under
//! test can still be inspected afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{FetchError, PushError, Result};
use crate::internal::cache::fetch::{Fetcher, Request, Response};
use crate::internal::capability::{Alert, Alerts, NotificationPlatform, Permission};
use crate::internal::communications::{Connection, SyncResponse};
use crate::internal::config::SubscribeOptions;
use crate::internal::registry::PushRegistry;
use crate::{KeyInfo, PushSubscriptionDescriptor};

pub const TEST_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send/dummy-endpoint";
pub const TEST_P256DH: &str =
    "BBcJdfs1GtMyymFTtty6lIGWRFXrEtJP40Df0gOvRDR4D8CKVgqE6vlYR7tCYksIRdKD1MxDPhQVmKLnzuife50";
pub const TEST_AUTH: &str = "LsuUOBKVQRY6-l7_Ajo-Ag";

pub fn test_subscription() -> PushSubscriptionDescriptor {
    PushSubscriptionDescriptor {
        endpoint: TEST_ENDPOINT.to_string(),
        keys: KeyInfo {
            p256dh: TEST_P256DH.to_string(),
            auth: TEST_AUTH.to_string(),
        },
    }
}

#[derive(Debug)]
pub struct BrowserState {
    pub supported: bool,
    pub permission: Permission,
    pub prompt_answer: Permission,
    pub prompts: usize,
    pub registered: bool,
    pub subscription: Option<PushSubscriptionDescriptor>,
    pub subscribe_calls: usize,
    pub unsubscribe_calls: usize,
    pub refuse_subscribe: bool,
    pub refuse_unsubscribe: bool,
    next_id: usize,
}

/// A browser with a notification API and a worker registration.
#[derive(Clone)]
pub struct FakeBrowser {
    pub state: Arc<Mutex<BrowserState>>,
}

impl FakeBrowser {
    /// Permission granted, worker registered, no subscription yet.
    pub fn ready() -> Self {
        Self {
            state: Arc::new(Mutex::new(BrowserState {
                supported: true,
                permission: Permission::Granted,
                prompt_answer: Permission::Granted,
                prompts: 0,
                registered: true,
                subscription: None,
                subscribe_calls: 0,
                unsubscribe_calls: 0,
                refuse_subscribe: false,
                refuse_unsubscribe: false,
                next_id: 0,
            })),
        }
    }

    /// The user revokes permission in the browser settings; the platform
    /// drops the subscription without telling the page.
    pub fn revoke(&self) {
        let mut state = self.state.lock();
        state.permission = Permission::Denied;
        state.subscription = None;
    }
}

#[async_trait]
impl NotificationPlatform for FakeBrowser {
    fn is_supported(&self) -> bool {
        self.state.lock().supported
    }

    fn permission(&self) -> Permission {
        self.state.lock().permission
    }

    async fn request_permission(&self) -> Permission {
        let mut state = self.state.lock();
        state.prompts += 1;
        state.permission = state.prompt_answer;
        state.permission
    }
}

#[async_trait]
impl PushRegistry for FakeBrowser {
    async fn has_registration(&self) -> bool {
        self.state.lock().registered
    }

    async fn get_subscription(&self) -> Result<Option<PushSubscriptionDescriptor>> {
        let state = self.state.lock();
        if !state.registered {
            return Err(PushError::RegistrationMissing);
        }
        Ok(state.subscription.clone())
    }

    async fn subscribe(&self, options: &SubscribeOptions) -> Result<PushSubscriptionDescriptor> {
        let mut state = self.state.lock();
        if !state.registered {
            return Err(PushError::RegistrationMissing);
        }
        state.subscribe_calls += 1;
        if state.refuse_subscribe {
            return Err(PushError::PlatformError("AbortError".to_string()));
        }
        if let Some(existing) = &state.subscription {
            return Ok(existing.clone());
        }
        assert!(!options.application_server_key.is_empty());
        state.next_id += 1;
        let subscription = PushSubscriptionDescriptor {
            endpoint: format!("{}-{}", TEST_ENDPOINT, state.next_id),
            ..test_subscription()
        };
        state.subscription = Some(subscription.clone());
        Ok(subscription)
    }

    async fn unsubscribe(&self, subscription: &PushSubscriptionDescriptor) -> Result<bool> {
        let mut state = self.state.lock();
        state.unsubscribe_calls += 1;
        if state.refuse_unsubscribe {
            return Ok(false);
        }
        match &state.subscription {
            Some(current) if current.endpoint == subscription.endpoint => {
                state.subscription = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Debug, Default)]
pub struct ServerState {
    pub records: HashMap<String, KeyInfo>,
    pub register_calls: usize,
    pub unregister_calls: usize,
    pub refuse_register: bool,
    pub refuse_unregister: bool,
}

/// The story service's subscription table.
#[derive(Clone, Default)]
pub struct FakeServer {
    pub state: Arc<Mutex<ServerState>>,
}

#[async_trait]
impl Connection for FakeServer {
    async fn register(&self, subscription: &PushSubscriptionDescriptor) -> SyncResponse {
        let mut state = self.state.lock();
        state.register_calls += 1;
        if state.refuse_register {
            return SyncResponse::failed("Internal Server Error");
        }
        state
            .records
            .insert(subscription.endpoint.clone(), subscription.keys.clone());
        SyncResponse::ok()
    }

    async fn unregister(&self, endpoint: &str) -> SyncResponse {
        let mut state = self.state.lock();
        state.unregister_calls += 1;
        if state.refuse_unregister {
            return SyncResponse::failed("Internal Server Error");
        }
        state.records.remove(endpoint);
        SyncResponse::ok()
    }
}

/// Keeps every alert for later inspection.
#[derive(Clone, Default)]
pub struct RecordingAlerts {
    pub alerts: Arc<Mutex<Vec<Alert>>>,
}

#[async_trait]
impl Alerts for RecordingAlerts {
    async fn alert(&self, alert: Alert) {
        self.alerts.lock().push(alert);
    }
}

#[derive(Debug, Default)]
pub struct NetworkState {
    pub responses: HashMap<String, Response>,
    pub offline: bool,
    pub requests: Vec<String>,
}

/// A network that answers from a script; unknown URLs get a 404.
#[derive(Clone, Default)]
pub struct ScriptedNetwork {
    pub state: Arc<Mutex<NetworkState>>,
}

impl ScriptedNetwork {
    pub fn respond(&self, url: &str, response: Response) {
        self.state
            .lock()
            .responses
            .insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    pub fn calls(&self) -> usize {
        self.state.lock().requests.len()
    }
}

#[async_trait]
impl Fetcher for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> std::result::Result<Response, FetchError> {
        let mut state = self.state.lock();
        state.requests.push(request.url.to_string());
        if state.offline {
            return Err(FetchError::Network("offline".to_string()));
        }
        Ok(state
            .responses
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| Response::new(404, "")))
    }
}
