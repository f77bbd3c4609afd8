/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Turns incoming pushes into notifications, and notification clicks into
//! navigation of an application window.
//!
//! Payloads are `{"title": ..., "options": {...}}` JSON. Anything that does
//! not parse is shown as plain text under the default title. Every shown
//! notification has a title, an `open` and a `close` action, and click data.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use crate::error::{PushError, Result};

pub const DEFAULT_TITLE: &str = "StoryTale App | Story berhasil dibuat!";
pub const DEFAULT_ICON: &str = "/favicon.png";
pub const DEFAULT_URL: &str = "/#/story";
pub const OPEN_ACTION: &str = "open";
pub const CLOSE_ACTION: &str = "close";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

impl NotificationAction {
    fn new(action: &str, title: &str) -> Self {
        Self {
            action: action.to_string(),
            title: title.to_string(),
        }
    }
}

/// Where a click should take the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Per-action targets, keyed by action name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationOptions {
    #[serde(default)]
    pub body: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub actions: Vec<NotificationAction>,
    #[serde(default)]
    pub data: Option<NotificationData>,
    /// Options we don't interpret (badge, image, tag, ...) pass through.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

impl Default for NotificationOptions {
    fn default() -> Self {
        Self {
            body: String::new(),
            icon: default_icon(),
            actions: Vec::new(),
            data: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub options: NotificationOptions,
}

impl Notification {
    /// Builds the notification for a push. Never fails: a missing or
    /// unreadable payload still yields a renderable notification.
    pub fn from_push_data(data: Option<&[u8]>) -> Self {
        let mut notification = match data {
            None => Self::text(String::new()),
            Some(bytes) => match Self::parse(bytes) {
                Ok(parsed) => parsed,
                Err(e) => {
                    log::debug!("push payload is not a notification object: {}", e);
                    Self::text(String::from_utf8_lossy(bytes).into_owned())
                }
            },
        };
        notification.fill_defaults();
        notification
    }

    /// Strict parse of a JSON payload, without defaults applied.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn text(body: String) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            options: NotificationOptions {
                body,
                ..Default::default()
            },
        }
    }

    fn fill_defaults(&mut self) {
        if self.title.trim().is_empty() {
            self.title = DEFAULT_TITLE.to_string();
        }
        let actions = &mut self.options.actions;
        for (action, title) in [(OPEN_ACTION, "Lihat Story"), (CLOSE_ACTION, "Tutup")] {
            if !actions.iter().any(|a| a.action == action) {
                actions.push(NotificationAction::new(action, title));
            }
        }
        if self.options.data.is_none() {
            self.options.data = Some(NotificationData {
                url: Some(DEFAULT_URL.to_string()),
                actions: BTreeMap::new(),
            });
        }
    }

    /// The clicked action's target if it has one, else the notification's
    /// url, else the application root.
    pub fn click_target(&self, action: Option<&str>) -> &str {
        let data = match &self.options.data {
            Some(data) => data,
            None => return "/",
        };
        action
            .filter(|a| !a.is_empty())
            .and_then(|a| data.actions.get(a))
            .or(data.url.as_ref())
            .map_or("/", String::as_str)
    }
}

/// Messages the worker posts to application windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Route to `url` inside the running application, without a reload.
    Navigate { url: String },
}

/// An open application window, as seen from the worker.
#[derive(Debug, Clone)]
pub struct WindowClient {
    pub id: String,
    pub url: Url,
    messages: UnboundedSender<WorkerMessage>,
}

impl WindowClient {
    pub fn new(id: impl Into<String>, url: Url, messages: UnboundedSender<WorkerMessage>) -> Self {
        Self {
            id: id.into(),
            url,
            messages,
        }
    }

    pub fn post_message(&self, message: WorkerMessage) -> Result<()> {
        self.messages
            .send(message)
            .map_err(|_| PushError::PlatformError(format!("window {} is gone", self.id)))
    }
}

/// The platform's notification tray.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDisplay: Send + Sync {
    async fn show_notification(&self, notification: &Notification) -> Result<()>;

    async fn close(&self, notification: &Notification);
}

/// The windows the worker can reach.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Clients: Send + Sync {
    /// Every open window, including those this worker does not control.
    async fn match_windows(&self) -> Vec<WindowClient>;

    async fn focus(&self, client: &WindowClient) -> Result<()>;

    async fn open_window(&self, url: &Url) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The `close` action; nothing else happens.
    Dismissed,
    /// An existing window was focused and told to route to `url`.
    Messaged { client_id: String, url: String },
    Opened(Url),
}

pub struct PushDeliveryHandler<D, C> {
    origin: Url,
    display: D,
    clients: C,
}

impl<D: NotificationDisplay, C: Clients> PushDeliveryHandler<D, C> {
    /// `origin` is the worker's own origin; click targets resolve against it.
    pub fn new(origin: Url, display: D, clients: C) -> Self {
        Self {
            origin,
            display,
            clients,
        }
    }

    pub async fn on_push(&self, data: Option<&[u8]>) -> Result<Notification> {
        let notification = Notification::from_push_data(data);
        log::info!("showing notification {:?}", notification.title);
        self.display.show_notification(&notification).await?;
        Ok(notification)
    }

    pub async fn on_notification_click(
        &self,
        notification: &Notification,
        action: Option<&str>,
    ) -> Result<ClickOutcome> {
        self.display.close(notification).await;
        if action == Some(CLOSE_ACTION) {
            return Ok(ClickOutcome::Dismissed);
        }

        let target = notification.click_target(action).to_string();
        let origin = self.origin.origin();
        let windows = self.clients.match_windows().await;
        if let Some(window) = windows.iter().find(|w| w.url.origin() == origin) {
            if let Err(e) = self.clients.focus(window).await {
                log::warn!("could not focus window {}: {}", window.id, e);
            }
            match window.post_message(WorkerMessage::Navigate {
                url: target.clone(),
            }) {
                Ok(()) => {
                    log::debug!("asked window {} to route to {}", window.id, target);
                    return Ok(ClickOutcome::Messaged {
                        client_id: window.id.clone(),
                        url: target,
                    });
                }
                Err(e) => log::warn!("{}; opening a new window instead", e),
            }
        }

        let url = self.origin.join(&target)?;
        self.clients.open_window(&url).await?;
        log::debug!("opened new window at {}", url);
        Ok(ClickOutcome::Opened(url))
    }
}
