/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The page side of the worker's `NAVIGATE` messages.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::internal::delivery::WorkerMessage;

/// Routes the running application; usually by assigning the location.
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Creates the message channel for one application window. The sender goes
/// into that window's [`WindowClient`](crate::WindowClient).
pub fn window_channel() -> (UnboundedSender<WorkerMessage>, UnboundedReceiver<WorkerMessage>) {
    unbounded_channel()
}

pub struct PageMessageListener<N> {
    navigator: N,
    messages: UnboundedReceiver<WorkerMessage>,
}

impl<N: Navigator> PageMessageListener<N> {
    pub fn new(navigator: N, messages: UnboundedReceiver<WorkerMessage>) -> Self {
        Self {
            navigator,
            messages,
        }
    }

    /// Handles messages until the worker side hangs up. Returns how many
    /// navigations were performed.
    pub async fn run(mut self) -> usize {
        let mut navigations = 0;
        while let Some(message) = self.messages.recv().await {
            self.handle_message(message);
            navigations += 1;
        }
        navigations
    }

    pub fn handle_message(&self, message: WorkerMessage) {
        match message {
            WorkerMessage::Navigate { url } => {
                log::debug!("navigating to {}", url);
                self.navigator.navigate(&url);
            }
        }
    }

    /// Handles a message in its serialized form. Anything that isn't a
    /// known worker message is ignored.
    pub fn handle_json(&self, raw: &str) -> bool {
        match serde_json::from_str::<WorkerMessage>(raw) {
            Ok(message) => {
                self.handle_message(message);
                true
            }
            Err(e) => {
                log::trace!("ignoring page message {:?}: {}", raw, e);
                false
            }
        }
    }
}
