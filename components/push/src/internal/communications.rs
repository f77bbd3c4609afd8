/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Server Communications.
//!
//! Mirrors the browser-side subscription on the story service so it can
//! send pushes to this installation. Failures never escape as errors here:
//! every outcome is folded into a [`SyncResponse`] so the orchestrator can
//! compensate uniformly.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PushError, Result};
use crate::internal::config::PushConfiguration;
use crate::PushSubscriptionDescriptor;

const SUBSCRIBE_PATH: &str = "notifications/subscribe";

/// Whether the remote service accepted a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResponse {
    pub ok: bool,
    pub message: Option<String>,
}

impl SyncResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
        }
    }
}

/// A communication link to the story service's subscription endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connection: Send + Sync {
    /// Store a subscription server-side, keyed by its endpoint.
    async fn register(&self, subscription: &PushSubscriptionDescriptor) -> SyncResponse;

    /// Drop the server-side record for `endpoint`.
    async fn unregister(&self, endpoint: &str) -> SyncResponse;
}

/// Supplies the bearer token for authenticated calls. Where the token lives
/// is up to the host.
pub trait AccessTokenProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

impl<F> AccessTokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn access_token(&self) -> Option<String> {
        self()
    }
}

#[derive(Serialize)]
struct UnregisterBody<'a> {
    endpoint: &'a str,
}

/// The story service's response envelope.
#[derive(Deserialize, Debug, Default)]
struct ServiceResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Talk to the story service over HTTP.
pub struct ConnectHttp {
    client: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl ConnectHttp {
    pub fn connect(
        options: &PushConfiguration,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<ConnectHttp> {
        Ok(ConnectHttp {
            client: reqwest::Client::new(),
            base_url: options.api_base()?,
            tokens,
        })
    }

    fn subscribe_url(&self) -> Result<Url> {
        // `Url::join` drops the last path segment unless it ends with '/'
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(SUBSCRIBE_PATH)?)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.access_token() {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<SyncResponse> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        log::info!("{} via {}: {}", what, response.url(), status);
        // The body is informational only; the status decides.
        let body: ServiceResponse = response.json().await.unwrap_or_default();
        if status.is_success() {
            if body.error {
                log::warn!("{} succeeded but the service flagged an error", what);
            }
            return Ok(SyncResponse {
                ok: true,
                message: body.message,
            });
        }
        let message = body
            .message
            .unwrap_or_else(|| format!("Unexpected status {}", status));
        if status.is_server_error() {
            return Err(PushError::CommunicationServerError(message));
        }
        Err(PushError::CommunicationError(message))
    }

    async fn try_register(
        &self,
        subscription: &PushSubscriptionDescriptor,
    ) -> Result<SyncResponse> {
        let request = self.client.post(self.subscribe_url()?).json(subscription);
        self.send(request, "register").await
    }

    async fn try_unregister(&self, endpoint: &str) -> Result<SyncResponse> {
        let request = self
            .client
            .delete(self.subscribe_url()?)
            .json(&UnregisterBody { endpoint });
        self.send(request, "unregister").await
    }
}

fn into_sync_response(what: &str, result: Result<SyncResponse>) -> SyncResponse {
    match result {
        Ok(response) => response,
        Err(e) => {
            log::error!("{} failed: {}", what, e);
            SyncResponse::failed(e.to_string())
        }
    }
}

#[async_trait]
impl Connection for ConnectHttp {
    async fn register(&self, subscription: &PushSubscriptionDescriptor) -> SyncResponse {
        into_sync_response("register", self.try_register(subscription).await)
    }

    async fn unregister(&self, endpoint: &str) -> SyncResponse {
        into_sync_response("unregister", self.try_unregister(endpoint).await)
    }
}
