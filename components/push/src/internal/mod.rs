/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

pub mod cache;
pub mod capability;
pub mod communications;
pub mod config;
pub mod delivery;
pub mod page;
pub mod push_manager;
pub mod registry;
pub mod saga;
pub mod worker;
