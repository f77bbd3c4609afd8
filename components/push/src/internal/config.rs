/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Provides configuration for the [PushManager](`crate::PushManager`) and the
//! background worker's [CacheRouter](`crate::CacheRouter`).

use base64::Engine;
use serde::Deserialize;
use url::Url;

use crate::error::{PushError, Result};
use crate::internal::cache::rule::{default_rules, CacheRule};

/// Options handed to the platform push manager when creating a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Every push must result in a user-visible notification.
    pub user_visible_only: bool,
    /// Raw VAPID public key bytes.
    pub application_server_key: Vec<u8>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PushConfiguration {
    /// Base URL of the story service, e.g. `https://story-api.example.com/v1`
    pub api_base_url: String,

    /// VAPID public key of the story service, base64url-encoded
    pub vapid_public_key: String,
}

impl PushConfiguration {
    pub fn new(api_base_url: impl Into<String>, vapid_public_key: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            vapid_public_key: vapid_public_key.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let base = self.api_base()?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(PushError::ConfigError(format!(
                "api_base_url must be http(s), got {}",
                base.scheme()
            )));
        }
        if self.application_server_key()?.is_empty() {
            return Err(PushError::ConfigError(
                "vapid_public_key is empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn api_base(&self) -> Result<Url> {
        Ok(Url::parse(&self.api_base_url)?)
    }

    /// Decodes the VAPID key into the byte form the platform expects.
    ///
    /// Keys are usually distributed as unpadded base64url, but padded and
    /// standard-alphabet copies circulate too, so all of those are accepted.
    pub fn application_server_key(&self) -> Result<Vec<u8>> {
        let normalized: String = self
            .vapid_public_key
            .trim()
            .trim_end_matches('=')
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                c => c,
            })
            .collect();
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(normalized)?)
    }

    pub fn subscribe_options(&self) -> Result<SubscribeOptions> {
        Ok(SubscribeOptions {
            user_visible_only: true,
            application_server_key: self.application_server_key()?,
        })
    }

    /// The worker's routing table, in evaluation order.
    pub fn cache_rules(&self) -> Result<Vec<CacheRule>> {
        Ok(default_rules(&self.api_base()?))
    }
}

#[cfg(test)]
pub(crate) const TEST_VAPID_KEY: &str =
    "BCCs2eonMI-6H2ctvFaWg-UYdDv387Vno_bzUzALpB442r2lCnsHmtrx8biyPi_E-1fSGABK_Qs_GlvPoJJqxbk";

#[cfg(test)]
// To avoid a future footgun, the default implementation is only for tests
impl Default for PushConfiguration {
    fn default() -> PushConfiguration {
        PushConfiguration {
            api_base_url: String::from("https://story-api.example.com/v1"),
            vapid_public_key: String::from(TEST_VAPID_KEY),
        }
    }
}
