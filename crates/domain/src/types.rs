// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Catalog entities supplied read-only by the campaign management layer.
//!
//! Campaigns, ad groups, creatives and placements are configuration. The
//! serving engine never mutates them, except for the cumulative performance
//! counters, which it owns.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::DomainError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub fn new(value: &str) -> Self {
                Self(value.to_string())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of the tenant that owns campaigns and placements.
    OrganizationId
);
string_id!(
    /// Identifier of a campaign.
    CampaignId
);
string_id!(
    /// Identifier of an ad group.
    AdGroupId
);
string_id!(
    /// Identifier of a creative.
    CreativeId
);
string_id!(
    /// Identifier of a placement (ad slot).
    PlacementId
);

/// Campaign lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    PendingApproval,
    Active,
    Paused,
    Completed,
    Rejected,
    Expired,
}

impl CampaignStatus {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

/// Campaign type. Only `Search` campaigns are keyword-targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    Search,
    Display,
    Banner,
    SponsoredProduct,
    SponsoredMerchant,
    Native,
}

/// How a campaign's bid is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiddingStrategy {
    ManualCpc,
    AutoCpc,
    TargetCpa,
    TargetRoas,
    MaximizeClicks,
    MaximizeConversions,
}

impl BiddingStrategy {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ManualCpc => "manual_cpc",
            Self::AutoCpc => "auto_cpc",
            Self::TargetCpa => "target_cpa",
            Self::TargetRoas => "target_roas",
            Self::MaximizeClicks => "maximize_clicks",
            Self::MaximizeConversions => "maximize_conversions",
        }
    }
}

/// Ad group status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdGroupStatus {
    Active,
    Paused,
    Removed,
}

/// Creative format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreativeType {
    Text,
    Image,
    Video,
    Carousel,
    Product,
    Merchant,
}

impl CreativeType {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Carousel => "carousel",
            Self::Product => "product",
            Self::Merchant => "merchant",
        }
    }
}

/// Creative review/serving status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreativeStatus {
    Active,
    Paused,
    PendingReview,
    Rejected,
    Removed,
}

/// The event a placement bills on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    /// Billed once per valid click, at the impression's clearing price.
    #[default]
    Cpc,
    /// Billed per impression at `clearing_price / 1000`.
    Cpm,
}

impl PricingModel {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cpc => "cpc",
            Self::Cpm => "cpm",
        }
    }
}

impl FromStr for PricingModel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpc" => Ok(Self::Cpc),
            "cpm" => Ok(Self::Cpm),
            _ => Err(DomainError::UnknownVariant {
                kind: "pricing_model",
                value: s.to_string(),
            }),
        }
    }
}

/// Kind of downstream action attributed to a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionType {
    Purchase,
    Signup,
    Lead,
    AppInstall,
    PageView,
    AddToCart,
    Custom,
}

impl ConversionType {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Signup => "signup",
            Self::Lead => "lead",
            Self::AppInstall => "app_install",
            Self::PageView => "page_view",
            Self::AddToCart => "add_to_cart",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for ConversionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(Self::Purchase),
            "signup" => Ok(Self::Signup),
            "lead" => Ok(Self::Lead),
            "app_install" => Ok(Self::AppInstall),
            "page_view" => Ok(Self::PageView),
            "add_to_cart" => Ok(Self::AddToCart),
            "custom" => Ok(Self::Custom),
            _ => Err(DomainError::UnknownVariant {
                kind: "conversion_type",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ConversionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day-of-week key used by schedule targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// Returns the lowercase weekday name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }
}

/// Inclusive local-hour window for one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    #[serde(default)]
    pub start_hour: u8,
    #[serde(default = "HourWindow::last_hour")]
    pub end_hour: u8,
}

impl HourWindow {
    const fn last_hour() -> u8 {
        23
    }

    /// Returns true if `hour` lies in `[start_hour, end_hour]`.
    #[must_use]
    pub const fn contains(&self, hour: u8) -> bool {
        self.start_hour <= hour && hour <= self.end_hour
    }
}

impl Default for HourWindow {
    fn default() -> Self {
        Self {
            start_hour: 0,
            end_hour: Self::last_hour(),
        }
    }
}

/// Campaign targeting rules. Every empty collection means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Targeting {
    /// Country, region or city names.
    pub locations: Vec<String>,
    /// Device types (e.g., "mobile", "desktop").
    pub devices: Vec<String>,
    /// Demographic attribute to accepted values.
    pub demographics: BTreeMap<String, Vec<String>>,
    /// Search keywords; only consulted for search campaigns.
    pub keywords: Vec<String>,
    /// Page category names.
    pub categories: Vec<String>,
    /// Serving hours per weekday.
    pub schedule: BTreeMap<DayOfWeek, HourWindow>,
    /// Negative keywords.
    pub exclude_keywords: Vec<String>,
    /// Placements this campaign must never serve on.
    pub exclude_placements: Vec<PlacementId>,
}

/// Cumulative performance counters kept per campaign, ad group and creative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceCounters {
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub spend: Decimal,
    pub revenue: Decimal,
}

impl PerformanceCounters {
    /// Click-through rate as a percentage (`clicks / impressions × 100`).
    ///
    /// Returns zero when there are no impressions.
    #[must_use]
    pub fn ctr_percent(&self) -> Decimal {
        if self.impressions == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.clicks) / Decimal::from(self.impressions) * Decimal::ONE_HUNDRED
    }
}

fn default_true() -> bool {
    true
}

/// A campaign as configured by the campaign management layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub name: String,
    pub campaign_type: CampaignType,
    pub status: CampaignStatus,
    pub bidding_strategy: BiddingStrategy,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub daily_budget: Decimal,
    #[serde(default)]
    pub total_budget: Option<Decimal>,
    pub default_bid: Decimal,
    #[serde(default)]
    pub max_bid: Option<Decimal>,
    #[serde(default)]
    pub target_cpa: Option<Decimal>,
    /// Target return on ad spend, in percent.
    #[serde(default)]
    pub target_roas: Option<Decimal>,
    #[serde(default)]
    pub targeting: Targeting,
    /// Pause the campaign once its daily budget is exhausted.
    #[serde(default = "default_true")]
    pub auto_pause_low_performance: bool,
    /// Counters carried over from before this process started.
    #[serde(default)]
    pub counters: PerformanceCounters,
}

impl Campaign {
    /// Returns true if `now` lies in `[start_date, end_date]`.
    #[must_use]
    pub fn is_within_window(&self, now: OffsetDateTime) -> bool {
        self.start_date <= now && self.end_date.is_none_or(|end| now <= end)
    }

    /// Returns true if lifetime spend is below the total budget (or there is none).
    #[must_use]
    pub fn has_total_budget_remaining(&self, lifetime_spend: Decimal) -> bool {
        self.total_budget
            .is_none_or(|total_budget| lifetime_spend < total_budget)
    }

    /// Status, flight window and lifetime budget checks combined.
    #[must_use]
    pub fn is_active(&self, now: OffsetDateTime, lifetime_spend: Decimal) -> bool {
        self.status == CampaignStatus::Active
            && self.is_within_window(now)
            && self.has_total_budget_remaining(lifetime_spend)
    }
}

/// An ad group within a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdGroup {
    pub id: AdGroupId,
    pub campaign_id: CampaignId,
    #[serde(default)]
    pub name: String,
    pub status: AdGroupStatus,
    /// Bid override for this group; falls back to the campaign default.
    #[serde(default)]
    pub default_bid: Option<Decimal>,
    #[serde(default)]
    pub counters: PerformanceCounters,
}

/// A servable creative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creative {
    pub id: CreativeId,
    pub ad_group_id: AdGroupId,
    #[serde(default)]
    pub name: String,
    pub creative_type: CreativeType,
    pub status: CreativeStatus,
    /// Relevance multiplier; `None` is scored as 5.0.
    #[serde(default)]
    pub quality_score: Option<Decimal>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub destination_url: String,
    #[serde(default)]
    pub counters: PerformanceCounters,
}

/// An ad slot on a publisher surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub id: PlacementId,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub name: String,
    pub supported_formats: Vec<CreativeType>,
    pub minimum_bid: Decimal,
    #[serde(default)]
    pub pricing_model: PricingModel,
    #[serde(default)]
    pub base_cpc: Option<Decimal>,
    #[serde(default)]
    pub base_cpm: Option<Decimal>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Placement {
    /// Returns true if creatives of `creative_type` can render here.
    #[must_use]
    pub fn supports(&self, creative_type: CreativeType) -> bool {
        self.supported_formats.contains(&creative_type)
    }
}
