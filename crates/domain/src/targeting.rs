// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Campaign eligibility for a single ad request.
//!
//! All rules are AND'd. The first failing rule is reported so callers can log
//! why a campaign sat out an auction. Ineligibility is a normal outcome, not an
//! error.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::context::RequestContext;
use crate::types::{Campaign, CampaignStatus, CampaignType, Placement, Targeting};

/// The rule that excluded a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ineligibility {
    OrganizationMismatch,
    NotActive,
    NotStarted,
    Ended,
    TotalBudgetExhausted,
    DailyBudgetExhausted,
    LocationMismatch,
    DeviceMismatch,
    DemographicMismatch,
    CategoryMismatch,
    KeywordMismatch,
    NegativeKeyword,
    PlacementExcluded,
    OutsideSchedule,
    NoCompatibleCreative,
}

impl Ineligibility {
    /// Returns a stable label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OrganizationMismatch => "organization_mismatch",
            Self::NotActive => "not_active",
            Self::NotStarted => "not_started",
            Self::Ended => "ended",
            Self::TotalBudgetExhausted => "total_budget_exhausted",
            Self::DailyBudgetExhausted => "daily_budget_exhausted",
            Self::LocationMismatch => "location_mismatch",
            Self::DeviceMismatch => "device_mismatch",
            Self::DemographicMismatch => "demographic_mismatch",
            Self::CategoryMismatch => "category_mismatch",
            Self::KeywordMismatch => "keyword_mismatch",
            Self::NegativeKeyword => "negative_keyword",
            Self::PlacementExcluded => "placement_excluded",
            Self::OutsideSchedule => "outside_schedule",
            Self::NoCompatibleCreative => "no_compatible_creative",
        }
    }
}

impl std::fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the matcher needs to know about one campaign besides its config.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityInput<'a> {
    pub campaign: &'a Campaign,
    pub placement: &'a Placement,
    /// Lifetime spend from the campaign's cumulative counters.
    pub lifetime_spend: Decimal,
    /// Result of the budget ledger's availability check for today.
    pub daily_budget_available: bool,
    /// Active creatives in active ad groups whose format the placement supports.
    pub compatible_creatives: usize,
}

/// Evaluates every targeting rule for a campaign.
///
/// # Arguments
///
/// * `input` - The campaign, placement and budget state
/// * `ctx` - The normalized request context
///
/// # Errors
///
/// Returns the first rule the campaign fails.
pub fn check_eligibility(
    input: &EligibilityInput<'_>,
    ctx: &RequestContext,
) -> Result<(), Ineligibility> {
    let campaign: &Campaign = input.campaign;
    let targeting: &Targeting = &campaign.targeting;

    if campaign.organization_id != input.placement.organization_id {
        return Err(Ineligibility::OrganizationMismatch);
    }
    if campaign.status != CampaignStatus::Active {
        return Err(Ineligibility::NotActive);
    }
    if campaign.start_date > ctx.now {
        return Err(Ineligibility::NotStarted);
    }
    if campaign.end_date.is_some_and(|end| end < ctx.now) {
        return Err(Ineligibility::Ended);
    }
    if !campaign.has_total_budget_remaining(input.lifetime_spend) {
        return Err(Ineligibility::TotalBudgetExhausted);
    }
    if !input.daily_budget_available {
        return Err(Ineligibility::DailyBudgetExhausted);
    }
    if !location_matches(targeting, ctx) {
        return Err(Ineligibility::LocationMismatch);
    }
    if !targeting.devices.is_empty() && !targeting.devices.contains(&ctx.device_type) {
        return Err(Ineligibility::DeviceMismatch);
    }
    if !demographics_match(&targeting.demographics, &ctx.demographics) {
        return Err(Ineligibility::DemographicMismatch);
    }
    if !category_matches(targeting, ctx) {
        return Err(Ineligibility::CategoryMismatch);
    }
    if campaign.campaign_type == CampaignType::Search
        && !targeting.keywords.is_empty()
        && !ctx
            .search_query
            .as_deref()
            .is_some_and(|query| matches_any_keyword(query, &targeting.keywords))
    {
        return Err(Ineligibility::KeywordMismatch);
    }
    if ctx
        .search_query
        .as_deref()
        .is_some_and(|query| matches_any_keyword(query, &targeting.exclude_keywords))
    {
        return Err(Ineligibility::NegativeKeyword);
    }
    if targeting.exclude_placements.contains(&input.placement.id) {
        return Err(Ineligibility::PlacementExcluded);
    }
    if !schedule_matches(targeting, ctx) {
        return Err(Ineligibility::OutsideSchedule);
    }
    if input.compatible_creatives == 0 {
        return Err(Ineligibility::NoCompatibleCreative);
    }

    Ok(())
}

/// Boolean form of [`check_eligibility`].
#[must_use]
pub fn is_eligible(input: &EligibilityInput<'_>, ctx: &RequestContext) -> bool {
    check_eligibility(input, ctx).is_ok()
}

fn location_matches(targeting: &Targeting, ctx: &RequestContext) -> bool {
    if targeting.locations.is_empty() {
        return true;
    }
    ctx.location.as_ref().is_some_and(|location| {
        targeting
            .locations
            .iter()
            .any(|target| location.matches(target))
    })
}

/// Demographic targeting predicate.
///
/// Always true: no demographic model exists yet, so configured demographic
/// targets never exclude a campaign.
#[must_use]
pub const fn demographics_match(
    _targets: &BTreeMap<String, Vec<String>>,
    _viewer: &BTreeMap<String, String>,
) -> bool {
    true
}

fn category_matches(targeting: &Targeting, ctx: &RequestContext) -> bool {
    if targeting.categories.is_empty() {
        return true;
    }
    ctx.page_category
        .as_ref()
        .is_some_and(|category| targeting.categories.contains(category))
}

fn schedule_matches(targeting: &Targeting, ctx: &RequestContext) -> bool {
    if targeting.schedule.is_empty() {
        return true;
    }
    targeting
        .schedule
        .get(&ctx.local_slot.weekday)
        .is_some_and(|window| window.contains(ctx.local_slot.hour))
}

/// Returns true if `query` contains every word of at least one keyword.
///
/// Matching is case-insensitive over whitespace-separated tokens. An empty
/// query, or a keyword with no words, never matches.
#[must_use]
pub fn matches_any_keyword(query: &str, keywords: &[String]) -> bool {
    let query_words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if query_words.is_empty() {
        return false;
    }

    keywords.iter().any(|keyword| {
        let mut words = keyword.split_whitespace().map(str::to_lowercase).peekable();
        words.peek().is_some() && words.all(|word| query_words.contains(&word))
    })
}
