/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Main entrypoint for the push component, handles the push subscription of
//! this browser installation.
//!
//! Exposes a struct [`PushManager`] that keeps two independently failing
//! stores in agreement: the browser-side subscription held by the platform
//! push manager, and the record the story service keeps for it.
//!
//! The [`PushManager`] allows users to:
//! - Subscribe, asking for notification permission first if needed
//! - Unsubscribe
//! - Check whether this browser is currently subscribed
//!
//! Both transitions are written as a [`Saga`]: every step with a side effect
//! records its compensation, and a later failure rolls those back before the
//! failure is reported. Callers should not start a second transition while
//! one is pending.

use crate::error::{PushError, Result, SubscriptionFailure, SubscriptionResult};
use crate::internal::capability::{
    Alert, AlertLevel, Alerts, CapabilityProbe, NotificationPlatform,
};
use crate::internal::communications::Connection;
use crate::internal::config::{PushConfiguration, SubscribeOptions};
use crate::internal::registry::{PushRegistry, RegistryClient};
use crate::internal::saga::{Compensation, Saga};
use crate::PushSubscriptionDescriptor;

const SUBSCRIBE_FAILED: &str = "Langganan push notification gagal diaktifkan.";
const SUBSCRIBE_OK: &str = "Langganan push notification berhasil diaktifkan.";
const UNSUBSCRIBE_FAILED: &str = "Langganan push notification gagal dinonaktifkan.";
const UNSUBSCRIBE_OK: &str = "Langganan push notification berhasil dinonaktifkan.";

pub struct PushManager<P, R, C, A> {
    platform: P,
    registry: R,
    connection: C,
    alerts: A,
    subscribe_options: SubscribeOptions,
}

impl<P, R, C, A> PushManager<P, R, C, A>
where
    P: NotificationPlatform,
    R: PushRegistry,
    C: Connection,
    A: Alerts,
{
    pub fn new(
        config: &PushConfiguration,
        platform: P,
        registry: R,
        connection: C,
        alerts: A,
    ) -> Result<Self> {
        config.validate()?;
        log::debug!("PushManager api_base_url: {}", config.api_base_url);
        Ok(Self {
            platform,
            registry,
            connection,
            alerts,
            subscribe_options: config.subscribe_options()?,
        })
    }

    fn probe(&self) -> CapabilityProbe<'_, P, A> {
        CapabilityProbe::new(&self.platform, &self.alerts)
    }

    fn registry_client(&self) -> RegistryClient<'_, R> {
        RegistryClient::new(&self.registry)
    }

    pub fn is_notification_supported(&self) -> bool {
        self.probe().is_notification_supported()
    }

    pub fn is_permission_granted(&self) -> bool {
        self.probe().is_permission_granted()
    }

    pub async fn request_permission(&self) -> bool {
        self.probe().request_permission().await
    }

    /// The live browser-side subscription, if any.
    pub async fn get_subscription(&self) -> Option<PushSubscriptionDescriptor> {
        self.registry_client().get_current_subscription().await
    }

    /// Always asks the platform; the answer can change behind our back, for
    /// example when the user revokes permission in the browser settings.
    pub async fn is_subscribed(&self) -> bool {
        self.get_subscription().await.is_some()
    }

    pub async fn subscribe(&self) -> SubscriptionResult {
        if !self.request_permission().await {
            return SubscriptionResult::failure(
                SubscriptionFailure::PermissionDenied,
                "Permission not granted",
            );
        }

        let registry = self.registry_client();
        if registry.get_current_subscription().await.is_some() {
            log::debug!("already subscribed; nothing to do");
            let alert = Alert::new(AlertLevel::Info, "Sudah Berlangganan!");
            self.alert(alert).await;
            return SubscriptionResult::success();
        }

        // A subscription created without a worker would be orphaned.
        if !registry.has_registration().await {
            return self.worker_not_ready().await;
        }

        let mut saga = Saga::new("subscribe");
        let subscription = match registry.create_subscription(&self.subscribe_options).await {
            Ok(subscription) => subscription,
            Err(PushError::RegistrationMissing) => return self.worker_not_ready().await,
            Err(e) => {
                log::error!("subscribe: creating the subscription failed: {}", e);
                let alert = Alert::new(AlertLevel::Error, "Terjadi Kesalahan!")
                    .with_text(SUBSCRIBE_FAILED);
                self.alert(alert).await;
                return SubscriptionResult::failure(
                    SubscriptionFailure::LocalSubscribeFailed,
                    e.to_string(),
                );
            }
        };
        saga.record(Compensation::DestroyLocal(subscription.clone()));

        let response = self.connection.register(&subscription).await;
        if !response.ok {
            log::error!("subscribe: response: {:?}", response);
            saga.rollback(&registry, &self.connection).await;
            let alert = Alert::new(AlertLevel::Error, "Gagal!")
                .with_text(SUBSCRIBE_FAILED);
            self.alert(alert).await;
            return SubscriptionResult::failure(
                SubscriptionFailure::RemoteSyncFailed,
                response
                    .message
                    .unwrap_or_else(|| SUBSCRIBE_FAILED.to_string()),
            );
        }

        saga.commit();
        log::info!("subscribed {}", subscription.endpoint);
        let alert = Alert::new(AlertLevel::Success, "Subscribe Berhasil!")
            .with_text(SUBSCRIBE_OK);
        self.alert(alert).await;
        SubscriptionResult::success()
    }

    pub async fn unsubscribe(&self) -> SubscriptionResult {
        let registry = self.registry_client();
        let subscription = match registry.get_current_subscription().await {
            Some(subscription) => subscription,
            None => {
                let alert = Alert::new(AlertLevel::Info, "Belum Berlangganan").with_text(
                    "Tidak bisa memutus langganan karena belum berlangganan sebelumnya.",
                );
                self.alert(alert).await;
                return SubscriptionResult::failure(
                    SubscriptionFailure::NotSubscribed,
                    "No active push subscription",
                );
            }
        };

        let mut saga = Saga::new("unsubscribe");
        let response = self.connection.unregister(&subscription.endpoint).await;
        if !response.ok {
            // The browser-side subscription is untouched, so both sides
            // still agree.
            log::error!("unsubscribe: response: {:?}", response);
            let alert = Alert::new(AlertLevel::Error, "Gagal!")
                .with_text(UNSUBSCRIBE_FAILED);
            self.alert(alert).await;
            return SubscriptionResult::failure(
                SubscriptionFailure::RemoteSyncFailed,
                response
                    .message
                    .unwrap_or_else(|| UNSUBSCRIBE_FAILED.to_string()),
            );
        }
        saga.record(Compensation::RestoreRemote(subscription.clone()));

        if !registry.destroy_subscription(&subscription).await {
            saga.rollback(&registry, &self.connection).await;
            let alert = Alert::new(AlertLevel::Error, "Gagal!")
                .with_text(UNSUBSCRIBE_FAILED);
            self.alert(alert).await;
            return SubscriptionResult::failure(
                SubscriptionFailure::LocalDestroyFailed,
                UNSUBSCRIBE_FAILED,
            );
        }

        saga.commit();
        log::info!("unsubscribed {}", subscription.endpoint);
        let alert = Alert::new(AlertLevel::Success, "Unsubscribe Berhasil!")
            .with_text(UNSUBSCRIBE_OK);
        self.alert(alert).await;
        SubscriptionResult::success()
    }

    async fn worker_not_ready(&self) -> SubscriptionResult {
        let alert = Alert::new(AlertLevel::Info, "Service Worker Belum Terpasang").with_text(
            "Pastikan service worker sudah aktif sebelum berlangganan notifikasi.",
        );
        self.alert(alert).await;
        SubscriptionResult::failure(
            SubscriptionFailure::WorkerNotReady,
            "No background worker registration",
        )
    }

    async fn alert(&self, alert: Alert) {
        self.alerts.alert(alert).await
    }
}

#[cfg(test)]
mod test {
    use mockall::predicate::eq;

    use super::*;
    use crate::internal::capability::{MockAlerts, MockNotificationPlatform, Permission};
    use crate::internal::communications::{MockConnection, SyncResponse};
    use crate::internal::registry::MockPushRegistry;
    use crate::test_utils::{
        test_subscription, FakeBrowser, FakeServer, RecordingAlerts, TEST_ENDPOINT,
    };

    type MockManager =
        PushManager<MockNotificationPlatform, MockPushRegistry, MockConnection, MockAlerts>;
    type FakeManager = PushManager<FakeBrowser, FakeBrowser, FakeServer, RecordingAlerts>;

    fn get_test_manager() -> MockManager {
        let mut platform = MockNotificationPlatform::new();
        platform.expect_is_supported().return_const(true);
        platform
            .expect_permission()
            .return_const(Permission::Granted);
        let mut alerts = MockAlerts::new();
        alerts.expect_alert().return_const(());
        PushManager::new(
            &PushConfiguration::default(),
            platform,
            MockPushRegistry::new(),
            MockConnection::new(),
            alerts,
        )
        .unwrap()
    }

    fn get_fake_manager() -> (FakeManager, FakeBrowser, FakeServer, RecordingAlerts) {
        let browser = FakeBrowser::ready();
        let server = FakeServer::default();
        let alerts = RecordingAlerts::default();
        let pm = PushManager::new(
            &PushConfiguration::default(),
            browser.clone(),
            browser.clone(),
            server.clone(),
            alerts.clone(),
        )
        .unwrap();
        (pm, browser, server, alerts)
    }

    #[test]
    fn test_rejects_bad_config() {
        let browser = FakeBrowser::ready();
        let config = PushConfiguration {
            vapid_public_key: "***".to_string(),
            ..Default::default()
        };
        assert!(PushManager::new(
            &config,
            browser.clone(),
            browser,
            FakeServer::default(),
            RecordingAlerts::default()
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_subscribe_existing_is_noop() {
        let mut pm = get_test_manager();
        pm.registry.expect_has_registration().return_const(true);
        pm.registry
            .expect_get_subscription()
            .times(1)
            .returning(|| Ok(Some(test_subscription())));
        pm.registry.expect_subscribe().times(0);
        pm.connection.expect_register().times(0);

        let result = pm.subscribe().await;
        assert_eq!(result, SubscriptionResult::success());
    }

    #[tokio::test]
    async fn test_subscribe_happy_path() {
        let mut pm = get_test_manager();
        pm.registry.expect_has_registration().return_const(true);
        pm.registry
            .expect_get_subscription()
            .times(1)
            .returning(|| Ok(None));
        pm.registry
            .expect_subscribe()
            .times(1)
            .returning(|_| Ok(test_subscription()));
        pm.connection
            .expect_register()
            .with(eq(test_subscription()))
            .times(1)
            .returning(|_| SyncResponse::ok());
        pm.registry.expect_unsubscribe().times(0);

        assert!(pm.subscribe().await.ok);
    }

    #[tokio::test]
    async fn test_subscribe_permission_denied() {
        let mut platform = MockNotificationPlatform::new();
        platform.expect_is_supported().return_const(true);
        platform
            .expect_permission()
            .return_const(Permission::Default);
        platform
            .expect_request_permission()
            .times(1)
            .returning(|| Permission::Denied);
        let mut alerts = MockAlerts::new();
        alerts.expect_alert().return_const(());
        let mut registry = MockPushRegistry::new();
        registry.expect_get_subscription().times(0);
        registry.expect_subscribe().times(0);

        let pm = PushManager::new(
            &PushConfiguration::default(),
            platform,
            registry,
            MockConnection::new(),
            alerts,
        )
        .unwrap();
        let result = pm.subscribe().await;
        assert!(!result.ok);
        assert_eq!(result.reason, Some(SubscriptionFailure::PermissionDenied));
    }

    #[tokio::test]
    async fn test_subscribe_without_worker() {
        let mut pm = get_test_manager();
        pm.registry.expect_has_registration().return_const(false);
        pm.registry.expect_subscribe().times(0);
        pm.connection.expect_register().times(0);

        let result = pm.subscribe().await;
        assert_eq!(result.reason, Some(SubscriptionFailure::WorkerNotReady));
    }

    #[tokio::test]
    async fn test_subscribe_remote_failure_destroys_local() {
        let mut pm = get_test_manager();
        pm.registry.expect_has_registration().return_const(true);
        pm.registry
            .expect_get_subscription()
            .returning(|| Ok(None));
        pm.registry
            .expect_subscribe()
            .times(1)
            .returning(|_| Ok(test_subscription()));
        pm.connection
            .expect_register()
            .times(1)
            .returning(|_| SyncResponse::failed("Internal Server Error"));
        pm.registry
            .expect_unsubscribe()
            .with(eq(test_subscription()))
            .times(1)
            .returning(|_| Ok(true));

        let result = pm.subscribe().await;
        assert!(!result.ok);
        assert_eq!(result.reason, Some(SubscriptionFailure::RemoteSyncFailed));
        assert_eq!(result.message.as_deref(), Some("Internal Server Error"));
    }

    #[tokio::test]
    async fn test_subscribe_failed_rollback_keeps_original_failure() {
        let mut pm = get_test_manager();
        pm.registry.expect_has_registration().return_const(true);
        pm.registry
            .expect_get_subscription()
            .returning(|| Ok(None));
        pm.registry
            .expect_subscribe()
            .returning(|_| Ok(test_subscription()));
        pm.connection
            .expect_register()
            .returning(|_| SyncResponse::failed("nope"));
        pm.registry
            .expect_unsubscribe()
            .times(1)
            .returning(|_| Err(PushError::PlatformError("stuck".to_string())));

        let result = pm.subscribe().await;
        assert_eq!(result.reason, Some(SubscriptionFailure::RemoteSyncFailed));
    }

    #[tokio::test]
    async fn test_subscribe_platform_refuses() {
        let mut pm = get_test_manager();
        pm.registry.expect_has_registration().return_const(true);
        pm.registry
            .expect_get_subscription()
            .returning(|| Ok(None));
        pm.registry
            .expect_subscribe()
            .returning(|_| Err(PushError::PlatformError("AbortError".to_string())));
        pm.connection.expect_register().times(0);

        let result = pm.subscribe().await;
        assert_eq!(
            result.reason,
            Some(SubscriptionFailure::LocalSubscribeFailed)
        );
    }

    #[tokio::test]
    async fn test_unsubscribe_not_subscribed() {
        let mut pm = get_test_manager();
        pm.registry.expect_has_registration().return_const(true);
        pm.registry
            .expect_get_subscription()
            .returning(|| Ok(None));
        pm.connection.expect_unregister().times(0);

        let result = pm.unsubscribe().await;
        assert!(!result.ok);
        assert_eq!(result.reason, Some(SubscriptionFailure::NotSubscribed));
    }

    #[tokio::test]
    async fn test_unsubscribe_remote_failure_keeps_local() {
        let mut pm = get_test_manager();
        pm.registry.expect_has_registration().return_const(true);
        pm.registry
            .expect_get_subscription()
            .returning(|| Ok(Some(test_subscription())));
        pm.connection
            .expect_unregister()
            .with(eq(TEST_ENDPOINT))
            .times(1)
            .returning(|_| SyncResponse::failed("offline"));
        pm.registry.expect_unsubscribe().times(0);

        let result = pm.unsubscribe().await;
        assert_eq!(result.reason, Some(SubscriptionFailure::RemoteSyncFailed));
    }

    #[tokio::test]
    async fn test_unsubscribe_local_failure_restores_remote() {
        let mut pm = get_test_manager();
        pm.registry.expect_has_registration().return_const(true);
        pm.registry
            .expect_get_subscription()
            .returning(|| Ok(Some(test_subscription())));
        pm.connection
            .expect_unregister()
            .times(1)
            .returning(|_| SyncResponse::ok());
        pm.registry
            .expect_unsubscribe()
            .times(1)
            .returning(|_| Ok(false));
        pm.connection
            .expect_register()
            .with(eq(test_subscription()))
            .times(1)
            .returning(|_| SyncResponse::ok());

        let result = pm.unsubscribe().await;
        assert_eq!(result.reason, Some(SubscriptionFailure::LocalDestroyFailed));
    }

    #[tokio::test]
    async fn test_repeated_subscribe_is_idempotent() {
        let _ = env_logger::try_init();
        let (pm, browser, server, _) = get_fake_manager();
        for _ in 0..5 {
            assert!(pm.subscribe().await.ok);
        }
        assert_eq!(browser.state.lock().subscribe_calls, 1);
        let server = server.state.lock();
        assert_eq!(server.register_calls, 1);
        assert_eq!(server.records.len(), 1);
    }

    #[tokio::test]
    async fn test_no_orphan_after_remote_failure() {
        let (pm, browser, server, alerts) = get_fake_manager();
        server.state.lock().refuse_register = true;

        let result = pm.subscribe().await;
        assert_eq!(result.reason, Some(SubscriptionFailure::RemoteSyncFailed));
        assert!(browser.state.lock().subscription.is_none());
        assert!(server.state.lock().records.is_empty());
        assert!(!pm.is_subscribed().await);
        let alerts = alerts.alerts.lock();
        assert_eq!(alerts.last().map(|a| a.level), Some(AlertLevel::Error));
    }

    #[tokio::test]
    async fn test_no_divergence_after_local_destroy_failure() {
        let (pm, browser, server, _) = get_fake_manager();
        assert!(pm.subscribe().await.ok);
        browser.state.lock().refuse_unsubscribe = true;

        let result = pm.unsubscribe().await;
        assert_eq!(result.reason, Some(SubscriptionFailure::LocalDestroyFailed));
        let live = browser.state.lock().subscription.clone().unwrap();
        let server = server.state.lock();
        assert_eq!(server.records.get(&live.endpoint), Some(&live.keys));
        assert_eq!(server.unregister_calls, 1);
    }

    #[tokio::test]
    async fn test_unsupported_browser() {
        let (pm, browser, _, _) = get_fake_manager();
        browser.state.lock().supported = false;
        assert!(!pm.is_notification_supported());
        assert_eq!(
            pm.subscribe().await.reason,
            Some(SubscriptionFailure::PermissionDenied)
        );
        assert_eq!(browser.state.lock().prompts, 0);
    }

    #[tokio::test]
    async fn test_platform_refuses_subscription() {
        let (pm, browser, server, _) = get_fake_manager();
        browser.state.lock().refuse_subscribe = true;
        assert_eq!(
            pm.subscribe().await.reason,
            Some(SubscriptionFailure::LocalSubscribeFailed)
        );
        assert_eq!(server.state.lock().register_calls, 0);
    }

    #[tokio::test]
    async fn test_remote_unregister_failure_keeps_both() {
        let (pm, browser, server, _) = get_fake_manager();
        assert!(pm.subscribe().await.ok);
        server.state.lock().refuse_unregister = true;

        assert_eq!(
            pm.unsubscribe().await.reason,
            Some(SubscriptionFailure::RemoteSyncFailed)
        );
        assert!(pm.is_subscribed().await);
        assert_eq!(browser.state.lock().unsubscribe_calls, 0);
        assert_eq!(server.state.lock().records.len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_unsubscribe_cycle() {
        let (pm, browser, server, alerts) = get_fake_manager();
        assert!(!pm.is_subscribed().await);
        assert!(pm.subscribe().await.ok);
        assert!(pm.is_subscribed().await);
        assert!(pm.unsubscribe().await.ok);
        assert!(!pm.is_subscribed().await);
        assert!(browser.state.lock().subscription.is_none());
        assert!(server.state.lock().records.is_empty());
        // a second unsubscribe has nothing to do
        assert_eq!(
            pm.unsubscribe().await.reason,
            Some(SubscriptionFailure::NotSubscribed)
        );
        let levels: Vec<_> = alerts.alerts.lock().iter().map(|a| a.level).collect();
        assert_eq!(
            levels,
            vec![AlertLevel::Success, AlertLevel::Success, AlertLevel::Info]
        );
    }

    #[tokio::test]
    async fn test_is_subscribed_sees_revocation() {
        let (pm, browser, _, _) = get_fake_manager();
        assert!(pm.subscribe().await.ok);
        assert!(pm.is_subscribed().await);
        browser.revoke();
        assert!(!pm.is_subscribed().await);
        assert!(!pm.is_permission_granted());
    }

    #[tokio::test]
    async fn test_prompt_once_then_subscribe() {
        let (pm, browser, _, _) = get_fake_manager();
        browser.state.lock().permission = Permission::Default;
        assert!(pm.subscribe().await.ok);
        assert!(pm.subscribe().await.ok);
        assert_eq!(browser.state.lock().prompts, 1);
    }

    #[tokio::test]
    async fn test_unregistered_worker_state_unknown() {
        let (pm, browser, server, _) = get_fake_manager();
        browser.state.lock().registered = false;
        assert!(!pm.is_subscribed().await);
        assert_eq!(
            pm.subscribe().await.reason,
            Some(SubscriptionFailure::WorkerNotReady)
        );
        assert_eq!(browser.state.lock().subscribe_calls, 0);
        assert_eq!(server.state.lock().register_calls, 0);
    }
}
