// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Request-time context supplied by the caller of the serving engine.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::clock::{ClockError, LocalSlot, ServingClock};

/// Geographic hints about the viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

impl GeoLocation {
    /// Returns true if any of country, region or city equals `target`
    /// (ASCII case-insensitive).
    #[must_use]
    pub fn matches(&self, target: &str) -> bool {
        [&self.country, &self.region, &self.city]
            .into_iter()
            .flatten()
            .any(|value| value.eq_ignore_ascii_case(target.trim()))
    }
}

/// Viewer context. `session_id` and `device_type` are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserContext {
    pub session_id: String,
    pub device_type: String,
    pub location: Option<GeoLocation>,
    pub demographics: BTreeMap<String, String>,
    pub returning_user: bool,
    pub customer_id: Option<String>,
}

/// Page context. `page_url` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageContext {
    pub page_url: String,
    pub referrer_url: Option<String>,
    pub category: Option<String>,
    pub search_query: Option<String>,
}

/// Device context, all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
}

/// The normalized view of a request that targeting evaluates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub location: Option<GeoLocation>,
    pub device_type: String,
    pub demographics: BTreeMap<String, String>,
    pub page_category: Option<String>,
    pub search_query: Option<String>,
    pub returning_user: bool,
    pub now: OffsetDateTime,
    pub local_slot: LocalSlot,
}

impl RequestContext {
    /// Builds the targeting context from the caller's user and page context.
    ///
    /// # Arguments
    ///
    /// * `user` - Viewer context
    /// * `page` - Page context
    /// * `now` - The request instant (UTC)
    /// * `clock` - Clock used to derive the local schedule slot
    ///
    /// # Errors
    ///
    /// Returns an error if the local slot cannot be resolved.
    pub fn from_contexts(
        user: &UserContext,
        page: &PageContext,
        now: OffsetDateTime,
        clock: &ServingClock,
    ) -> Result<Self, ClockError> {
        let local_slot: LocalSlot = clock.local_slot(now)?;
        Ok(Self {
            location: user.location.clone(),
            device_type: user.device_type.clone(),
            demographics: user.demographics.clone(),
            page_category: page.category.clone(),
            search_query: page.search_query.clone(),
            returning_user: user.returning_user,
            now,
            local_slot,
        })
    }
}

/// Where on the creative the viewer clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickPosition {
    pub x: i32,
    pub y: i32,
}

impl ClickPosition {
    /// A reported `(0, 0)` position is treated the same as a missing one.
    #[must_use]
    pub const fn is_origin(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

/// Signals available to the fraud scorer when a click arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickContext {
    /// Seconds between serve and click.
    pub time_to_click: Decimal,
    /// Clicks already recorded from the impression's IP within the lookback window.
    pub recent_clicks_from_ip: u32,
    pub user_agent: Option<String>,
    pub click_position: Option<ClickPosition>,
}
