/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! A compensation log for multi-step changes that span the browser-side
//! subscription and the remote record.
//!
//! Each step that has a side effect records how to undo it. If a later step
//! fails, [`Saga::rollback`] runs the recorded compensations newest first.
//! Compensations are attempted once; their failures are logged and do not
//! change what the caller reports.

use crate::internal::communications::Connection;
use crate::internal::registry::{PushRegistry, RegistryClient};
use crate::PushSubscriptionDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Undo a browser-side subscription created by this operation.
    DestroyLocal(PushSubscriptionDescriptor),
    /// Undo a remote unregistration made by this operation.
    RestoreRemote(PushSubscriptionDescriptor),
}

#[derive(Debug)]
pub struct Saga {
    name: &'static str,
    compensations: Vec<Compensation>,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            compensations: Vec::new(),
        }
    }

    pub fn record(&mut self, compensation: Compensation) {
        self.compensations.push(compensation);
    }

    /// Every step succeeded; nothing needs undoing.
    pub fn commit(self) {
        log::debug!("{}: committed after {} steps", self.name, self.compensations.len());
    }

    /// Returns `true` if every compensation succeeded.
    pub async fn rollback<R: PushRegistry, C: Connection>(
        self,
        registry: &RegistryClient<'_, R>,
        connection: &C,
    ) -> bool {
        let mut all_ok = true;
        for compensation in self.compensations.into_iter().rev() {
            log::info!("{}: compensating with {:?}", self.name, compensation);
            let ok = match &compensation {
                Compensation::DestroyLocal(subscription) => {
                    registry.destroy_subscription(subscription).await
                }
                Compensation::RestoreRemote(original) => {
                    restore_remote(registry, connection, original).await
                }
            };
            if !ok {
                log::error!("{}: compensation {:?} failed", self.name, compensation);
                all_ok = false;
            }
        }
        all_ok
    }
}

/// Re-registers the subscription that is live now, not the one read before
/// the failed step: its keys may have been rotated in between. Only a
/// confirmed absence skips the re-registration; when the state can't be read
/// the original descriptor is restored.
async fn restore_remote<R: PushRegistry, C: Connection>(
    registry: &RegistryClient<'_, R>,
    connection: &C,
    original: &PushSubscriptionDescriptor,
) -> bool {
    let current = match registry.read_subscription().await {
        Ok(Some(current)) => current,
        Ok(None) => {
            log::info!(
                "subscription for {} is gone locally; not restoring remote record",
                original.endpoint
            );
            return true;
        }
        Err(e) => {
            log::warn!("could not read subscription ({}); restoring original record", e);
            original.clone()
        }
    };
    if current.keys != original.keys {
        log::info!("subscription keys changed since unsubscribe began; restoring fresh keys");
    }
    connection.register(&current).await.ok
}
