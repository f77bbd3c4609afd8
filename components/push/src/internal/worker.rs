/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The background worker's event loop.
//!
//! The worker runs as its own task and shares nothing with the page; every
//! interaction is a [`WorkerEvent`] sent through a [`WorkerHandle`]. Each
//! event is handled on its own task, so a slow network fetch does not hold
//! up a push.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{FetchError, PushError, Result};
use crate::internal::cache::fetch::{Fetcher, Request};
use crate::internal::cache::{CacheRouter, RouteOutcome};
use crate::internal::delivery::{
    ClickOutcome, Clients, Notification, NotificationDisplay, PushDeliveryHandler,
};

const EVENT_QUEUE_SIZE: usize = 64;

#[derive(Debug)]
pub enum WorkerEvent {
    Fetch {
        request: Request,
        respond_to: oneshot::Sender<std::result::Result<RouteOutcome, FetchError>>,
    },
    Push {
        data: Option<Vec<u8>>,
        respond_to: oneshot::Sender<Result<Notification>>,
    },
    NotificationClick {
        notification: Notification,
        action: Option<String>,
        respond_to: oneshot::Sender<Result<ClickOutcome>>,
    },
}

pub struct ServiceWorker<F, D, C> {
    router: CacheRouter<F>,
    delivery: PushDeliveryHandler<D, C>,
}

impl<F, D, C> ServiceWorker<F, D, C>
where
    F: Fetcher,
    D: NotificationDisplay + 'static,
    C: Clients + 'static,
{
    pub fn new(router: CacheRouter<F>, delivery: PushDeliveryHandler<D, C>) -> Self {
        Self { router, delivery }
    }

    /// Starts the worker on the current tokio runtime. It stops once every
    /// handle has been dropped.
    pub fn spawn(self) -> (WorkerHandle, JoinHandle<()>) {
        let (events, mut inbox) = mpsc::channel(EVENT_QUEUE_SIZE);
        let worker = Arc::new(self);
        let task = tokio::spawn(async move {
            log::debug!("worker started");
            while let Some(event) = inbox.recv().await {
                let worker = Arc::clone(&worker);
                tokio::spawn(async move { worker.dispatch(event).await });
            }
            log::debug!("worker stopped");
        });
        (WorkerHandle { events }, task)
    }

    async fn dispatch(&self, event: WorkerEvent) {
        // A requester that gave up is not an error for the worker.
        match event {
            WorkerEvent::Fetch {
                request,
                respond_to,
            } => {
                let _ = respond_to.send(self.router.handle(request).await);
            }
            WorkerEvent::Push { data, respond_to } => {
                let result = self.delivery.on_push(data.as_deref()).await;
                if let Err(e) = &result {
                    log::error!("showing push notification failed: {}", e);
                }
                let _ = respond_to.send(result);
            }
            WorkerEvent::NotificationClick {
                notification,
                action,
                respond_to,
            } => {
                let result = self
                    .delivery
                    .on_notification_click(&notification, action.as_deref())
                    .await;
                let _ = respond_to.send(result);
            }
        }
    }
}

/// Cheap to clone; every clone feeds the same worker.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    events: mpsc::Sender<WorkerEvent>,
}

impl WorkerHandle {
    pub async fn fetch(&self, request: Request) -> std::result::Result<RouteOutcome, FetchError> {
        let (respond_to, response) = oneshot::channel();
        self.events
            .send(WorkerEvent::Fetch {
                request,
                respond_to,
            })
            .await
            .map_err(|_| FetchError::WorkerGone)?;
        response.await.map_err(|_| FetchError::WorkerGone)?
    }

    pub async fn push(&self, data: Option<Vec<u8>>) -> Result<Notification> {
        let (respond_to, response) = oneshot::channel();
        self.send(WorkerEvent::Push { data, respond_to }).await?;
        response.await.map_err(|_| PushError::WorkerGone)?
    }

    pub async fn notification_click(
        &self,
        notification: Notification,
        action: Option<String>,
    ) -> Result<ClickOutcome> {
        let (respond_to, response) = oneshot::channel();
        self.send(WorkerEvent::NotificationClick {
            notification,
            action,
            respond_to,
        })
        .await?;
        response.await.map_err(|_| PushError::WorkerGone)?
    }

    async fn send(&self, event: WorkerEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| PushError::WorkerGone)
    }
}
