/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::fmt;

pub type Result<T, E = PushError> = std::result::Result<T, E>;

/// Errors from setup and from the individual steps. The orchestrator folds
/// them into a [`SubscriptionResult`] before returning.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// No background worker registration controls the page yet
    #[error("No background worker registration")]
    RegistrationMissing,

    /// The platform push manager or notification API rejected a call
    #[error("Platform error: {0}")]
    PlatformError(String),

    /// A Client communication error
    #[error("Communication Error: {0:?}")]
    CommunicationError(String),

    /// An error returned from the remote service
    #[error("Communication Server Error: {0:?}")]
    CommunicationServerError(String),

    #[error("Invalid application server key: {0}")]
    InvalidServerKey(#[from] base64::DecodeError),

    /// A failure to parse a URL.
    #[error("URL parse error: {0:?}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Push payload is not JSON: {0}")]
    PayloadParseFailed(#[from] serde_json::Error),

    #[error("The background worker has stopped")]
    WorkerGone,
}

impl From<reqwest::Error> for PushError {
    fn from(e: reqwest::Error) -> Self {
        PushError::CommunicationError(e.to_string())
    }
}

/// The reasons a `subscribe()` or `unsubscribe()` call can fail, as seen by
/// the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionFailure {
    /// The user denied or dismissed the notification permission prompt.
    PermissionDenied,
    /// No background worker is installed to own a subscription.
    WorkerNotReady,
    /// There is no subscription to remove.
    NotSubscribed,
    /// The remote service refused or never received the change.
    RemoteSyncFailed,
    /// The platform refused to create the browser-side subscription.
    LocalSubscribeFailed,
    /// The platform refused to destroy the browser-side subscription.
    LocalDestroyFailed,
}

impl fmt::Display for SubscriptionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubscriptionFailure::PermissionDenied => "permission denied",
            SubscriptionFailure::WorkerNotReady => "background worker not ready",
            SubscriptionFailure::NotSubscribed => "not subscribed",
            SubscriptionFailure::RemoteSyncFailed => "remote sync failed",
            SubscriptionFailure::LocalSubscribeFailed => "local subscribe failed",
            SubscriptionFailure::LocalDestroyFailed => "local destroy failed",
        })
    }
}

/// Outcome of an orchestrator transition. Failures are reported here rather
/// than as an `Err`, so the caller can always render something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionResult {
    pub ok: bool,
    pub reason: Option<SubscriptionFailure>,
    pub message: Option<String>,
}

impl SubscriptionResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            reason: None,
            message: None,
        }
    }

    pub fn failure(reason: SubscriptionFailure, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
            message: Some(message.into()),
        }
    }
}

/// Errors handed back to whoever issued an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Network request failed: {0}")]
    Network(String),

    #[error("The background worker has stopped")]
    WorkerGone,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(e.to_string())
    }
}
