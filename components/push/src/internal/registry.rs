/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Access to the browser-side push subscription, owned by the platform push
//! manager of the background worker registration.

use async_trait::async_trait;

use crate::error::{PushError, Result};
use crate::internal::config::SubscribeOptions;
use crate::PushSubscriptionDescriptor;

/// The platform push manager, reached through the worker registration.
///
/// Every method that needs a registration reports
/// [`PushError::RegistrationMissing`] when there is none.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushRegistry: Send + Sync {
    /// Whether a background worker registration exists for this page.
    async fn has_registration(&self) -> bool;

    async fn get_subscription(&self) -> Result<Option<PushSubscriptionDescriptor>>;

    async fn subscribe(&self, options: &SubscribeOptions) -> Result<PushSubscriptionDescriptor>;

    /// Returns `Ok(false)` when the platform declined to drop the subscription.
    async fn unsubscribe(&self, subscription: &PushSubscriptionDescriptor) -> Result<bool>;
}

pub struct RegistryClient<'a, R> {
    registry: &'a R,
}

impl<'a, R: PushRegistry> RegistryClient<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    pub async fn has_registration(&self) -> bool {
        self.registry.has_registration().await
    }

    /// The live subscription, re-queried every time.
    ///
    /// `None` covers both "no worker, can't tell" and "confirmed
    /// unsubscribed"; the two are only told apart in the log.
    pub async fn get_current_subscription(&self) -> Option<PushSubscriptionDescriptor> {
        if !self.registry.has_registration().await {
            log::info!("no worker registration; subscription state unknown");
            return None;
        }
        match self.registry.get_subscription().await {
            Ok(Some(subscription)) => Some(subscription),
            Ok(None) => {
                log::info!("worker registered but no push subscription");
                None
            }
            Err(PushError::RegistrationMissing) => {
                log::info!("worker registration vanished; subscription state unknown");
                None
            }
            Err(e) => {
                log::warn!("could not read push subscription: {}", e);
                None
            }
        }
    }

    /// Like [`Self::get_current_subscription`], but only `Ok(None)` means
    /// confirmed unsubscribed. A missing registration or a failed read is
    /// an `Err`.
    pub async fn read_subscription(&self) -> Result<Option<PushSubscriptionDescriptor>> {
        if !self.registry.has_registration().await {
            return Err(PushError::RegistrationMissing);
        }
        self.registry.get_subscription().await
    }

    pub async fn create_subscription(
        &self,
        options: &SubscribeOptions,
    ) -> Result<PushSubscriptionDescriptor> {
        if !self.registry.has_registration().await {
            return Err(PushError::RegistrationMissing);
        }
        let subscription = self.registry.subscribe(options).await?;
        log::debug!("created push subscription for {}", subscription.endpoint);
        Ok(subscription)
    }

    /// Platform errors are reported as `false`, the same as a refusal.
    pub async fn destroy_subscription(&self, subscription: &PushSubscriptionDescriptor) -> bool {
        match self.registry.unsubscribe(subscription).await {
            Ok(true) => {
                log::debug!("destroyed push subscription for {}", subscription.endpoint);
                true
            }
            Ok(false) => {
                log::warn!(
                    "platform declined to destroy subscription for {}",
                    subscription.endpoint
                );
                false
            }
            Err(e) => {
                log::warn!("destroying subscription failed: {}", e);
                false
            }
        }
    }
}
