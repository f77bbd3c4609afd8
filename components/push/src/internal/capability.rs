/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Notification capability and permission handling, plus the alert channel
//! used to tell the user what happened.

use async_trait::async_trait;

/// The platform's notification permission states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// The prompt was dismissed without an answer.
    Default,
}

/// The page's notification API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    /// Whether the notification API exists at all.
    fn is_supported(&self) -> bool;

    /// The current permission, without prompting.
    fn permission(&self) -> Permission;

    /// Shows the platform permission prompt.
    async fn request_permission(&self) -> Permission;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Success,
    Error,
}

/// A user-facing message. How it is rendered is up to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub title: String,
    pub text: Option<String>,
}

impl Alert {
    pub fn new(level: AlertLevel, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Alerts: Send + Sync {
    async fn alert(&self, alert: Alert);
}

pub struct CapabilityProbe<'a, P, A> {
    platform: &'a P,
    alerts: &'a A,
}

impl<'a, P: NotificationPlatform, A: Alerts> CapabilityProbe<'a, P, A> {
    pub fn new(platform: &'a P, alerts: &'a A) -> Self {
        Self { platform, alerts }
    }

    pub fn is_notification_supported(&self) -> bool {
        self.platform.is_supported()
    }

    pub fn is_permission_granted(&self) -> bool {
        self.platform.permission() == Permission::Granted
    }

    /// Makes sure notifications may be shown, prompting at most once.
    ///
    /// Returns `true` without prompting when permission is already granted.
    /// A denied or dismissed prompt yields `false` and an alert; it is never
    /// retried automatically.
    pub async fn request_permission(&self) -> bool {
        if !self.is_notification_supported() {
            log::error!("Notification API unsupported.");
            self.alerts
                .alert(
                    Alert::new(AlertLevel::Error, "Notifikasi tidak didukung")
                        .with_text("Browser ini tidak mendukung notifikasi."),
                )
                .await;
            return false;
        }

        if self.is_permission_granted() {
            return true;
        }

        match self.platform.request_permission().await {
            Permission::Granted => true,
            Permission::Denied => {
                log::info!("notification permission denied");
                self.alerts
                    .alert(Alert::new(AlertLevel::Error, "Izin notifikasi ditolak."))
                    .await;
                false
            }
            Permission::Default => {
                log::info!("notification permission prompt dismissed");
                self.alerts
                    .alert(Alert::new(
                        AlertLevel::Info,
                        "Izin notifikasi ditutup atau diabaikan.",
                    ))
                    .await;
                false
            }
        }
    }
}
