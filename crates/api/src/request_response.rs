// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request and response data transfer objects.

use adserve_domain::{ClickPosition, DeviceContext, PageContext, UserContext};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// API request to run an ad auction for a placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionApiRequest {
    /// The placement being filled.
    pub placement_id: String,
    /// Caller-supplied idempotency key. Generated when absent.
    #[serde(default)]
    pub request_id: Option<String>,
    /// Viewer context; `session_id` and `device_type` are required.
    pub user_context: UserContext,
    /// Page context; `page_url` is required.
    pub page_context: PageContext,
    #[serde(default)]
    pub device_context: DeviceContext,
}

/// The creative chosen to serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeInfo {
    pub creative_id: String,
    pub ad_group_id: String,
    pub campaign_id: String,
    pub creative_type: String,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub destination_url: String,
}

/// API response for an auction that served an ad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionApiResponse {
    /// The recorded auction.
    pub auction_id: String,
    /// The request id the auction is recorded under.
    pub request_id: String,
    /// The impression to report viewability and clicks against.
    pub impression_id: String,
    /// The winning creative.
    pub creative: CreativeInfo,
    /// The winner's own bid.
    pub bid_amount: Decimal,
    /// The generalized second price the winner pays.
    pub clearing_price: Decimal,
}

/// The outcome of an auction call.
///
/// `NoAd` is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionResult {
    /// An ad was served.
    Served(AuctionApiResponse),
    /// Nothing to show.
    NoAd,
}

impl AuctionResult {
    /// Returns the served ad, if any.
    #[must_use]
    pub fn served(self) -> Option<AuctionApiResponse> {
        match self {
            Self::Served(response) => Some(response),
            Self::NoAd => None,
        }
    }
}

/// API request to report viewability for a served impression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackImpressionRequest {
    pub impression_id: String,
    #[serde(default = "default_true")]
    pub viewable: bool,
    /// Time on screen in milliseconds.
    #[serde(default)]
    pub view_duration: u64,
    /// Percentage of the page scrolled, `0..=100`.
    #[serde(default)]
    pub scroll_depth: Option<Decimal>,
}

/// API response for a tracked impression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackImpressionResponse {
    pub impression_id: String,
    /// A success message.
    pub message: String,
}

/// API request to record a click on an impression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackClickRequest {
    pub impression_id: String,
    #[serde(default)]
    pub click_position: Option<ClickPosition>,
    /// Seconds between serve and click.
    #[serde(default)]
    pub time_to_click: Decimal,
    /// Overrides the creative's landing page.
    #[serde(default)]
    pub destination_url: Option<String>,
}

/// API response for a tracked click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackClickResponse {
    pub click_id: String,
    /// False if the fraud scorer rejected the click. Invalid clicks are never billed.
    pub is_valid: bool,
    /// A success message.
    pub message: String,
}

/// API request to record a conversion following a click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConversionRequest {
    pub click_id: String,
    /// One of `purchase`, `signup`, `lead`, `app_install`, `page_view`,
    /// `add_to_cart` or `custom`.
    pub conversion_type: String,
    #[serde(default)]
    pub conversion_value: Option<Decimal>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub attribution_model: Option<String>,
    #[serde(default)]
    pub verification_method: Option<String>,
    /// Unverified conversions are stored but not counted.
    #[serde(default = "default_true")]
    pub is_verified: bool,
    #[serde(default)]
    pub custom_data: serde_json::Value,
}

/// API response for a tracked conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConversionResponse {
    pub conversion_id: String,
    pub conversion_value: Decimal,
    /// A success message.
    pub message: String,
}

/// API response for a corrective deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidEventsResponse {
    /// Number of impressions removed.
    pub impressions: usize,
    /// Number of clicks removed.
    pub clicks: usize,
    /// Number of conversions removed.
    pub conversions: usize,
}

const fn default_true() -> bool {
    true
}
