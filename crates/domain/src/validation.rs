// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use rust_decimal::Decimal;

use crate::context::{PageContext, UserContext};
use crate::error::DomainError;
use crate::types::{Campaign, HourWindow};

/// Largest accepted bid-like amount (bids, bid caps, placement floors).
pub const MAX_BID_AMOUNT: Decimal = Decimal::from_parts(99_999_999, 0, 0, false, 4);

/// Largest accepted daily or lifetime budget.
pub const MAX_BUDGET_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Largest accepted target cost per acquisition.
pub const MAX_TARGET_CPA: Decimal = Decimal::from_parts(99_999_999, 0, 0, false, 2);

/// Largest accepted target return on ad spend, in percent.
pub const MAX_TARGET_ROAS: Decimal = Decimal::from_parts(999_999, 0, 0, false, 2);

/// Largest accepted creative quality score.
pub const MAX_QUALITY_SCORE: Decimal = Decimal::from_parts(9_999, 0, 0, false, 2);

/// Validates the caller-supplied context of an auction request.
///
/// # Arguments
///
/// * `user` - The viewer context
/// * `page` - The page context
///
/// # Errors
///
/// Returns `DomainError::MissingField` if:
/// - `session_id` is empty
/// - `device_type` is empty
/// - `page_url` is empty
pub fn validate_auction_context(user: &UserContext, page: &PageContext) -> Result<(), DomainError> {
    if user.session_id.trim().is_empty() {
        return Err(DomainError::MissingField {
            field: "session_id",
        });
    }
    if user.device_type.trim().is_empty() {
        return Err(DomainError::MissingField {
            field: "device_type",
        });
    }
    if page.page_url.trim().is_empty() {
        return Err(DomainError::MissingField { field: "page_url" });
    }
    Ok(())
}

/// Validates a client viewability report.
///
/// # Errors
///
/// Returns an error if `scroll_depth` is outside `0..=100`.
pub fn validate_viewability(scroll_depth: Decimal) -> Result<(), DomainError> {
    if scroll_depth < Decimal::ZERO || scroll_depth > Decimal::ONE_HUNDRED {
        return Err(DomainError::InvalidScrollDepth(scroll_depth));
    }
    Ok(())
}

/// Validates that an amount reported by a caller is not negative.
///
/// # Errors
///
/// Returns `DomainError::NegativeAmount` naming `field`.
pub fn validate_non_negative(field: &'static str, value: Decimal) -> Result<(), DomainError> {
    if value < Decimal::ZERO {
        return Err(DomainError::NegativeAmount { field, value });
    }
    Ok(())
}

/// Validates a catalog amount: not negative and at most `max`.
///
/// # Errors
///
/// Returns `DomainError::NegativeAmount` or `DomainError::AmountTooLarge`
/// naming `field`.
pub fn validate_amount(field: &'static str, value: Decimal, max: Decimal) -> Result<(), DomainError> {
    validate_non_negative(field, value)?;
    if value > max {
        return Err(DomainError::AmountTooLarge { field, value, max });
    }
    Ok(())
}

/// Validates a creative quality score.
///
/// # Errors
///
/// Returns `DomainError::InvalidQualityScore` unless the score is in
/// `(0, MAX_QUALITY_SCORE]`.
pub fn validate_quality_score(value: Decimal) -> Result<(), DomainError> {
    if value <= Decimal::ZERO || value > MAX_QUALITY_SCORE {
        return Err(DomainError::InvalidQualityScore {
            value,
            max: MAX_QUALITY_SCORE,
        });
    }
    Ok(())
}

/// Validates a campaign's money fields and schedule.
///
/// # Errors
///
/// Returns the first field that is negative or out of range, or an invalid
/// schedule window.
pub fn validate_campaign(campaign: &Campaign) -> Result<(), DomainError> {
    validate_amount("daily_budget", campaign.daily_budget, MAX_BUDGET_AMOUNT)?;
    if let Some(total_budget) = campaign.total_budget {
        validate_amount("total_budget", total_budget, MAX_BUDGET_AMOUNT)?;
    }
    validate_amount("default_bid", campaign.default_bid, MAX_BID_AMOUNT)?;
    if let Some(max_bid) = campaign.max_bid {
        validate_amount("max_bid", max_bid, MAX_BID_AMOUNT)?;
    }
    if let Some(target_cpa) = campaign.target_cpa {
        validate_amount("target_cpa", target_cpa, MAX_TARGET_CPA)?;
    }
    if let Some(target_roas) = campaign.target_roas {
        validate_amount("target_roas", target_roas, MAX_TARGET_ROAS)?;
    }
    validate_campaign_schedule(campaign)
}

/// Validates a campaign's schedule targeting.
///
/// # Errors
///
/// Returns `DomainError::InvalidScheduleWindow` for the first window whose
/// hours fall outside `0..=23` or whose end precedes its start.
pub fn validate_campaign_schedule(campaign: &Campaign) -> Result<(), DomainError> {
    for (day, window) in &campaign.targeting.schedule {
        let HourWindow {
            start_hour,
            end_hour,
        } = *window;
        if end_hour > 23 || start_hour > end_hour {
            return Err(DomainError::InvalidScheduleWindow {
                day: day.as_str().to_string(),
                start_hour,
                end_hour,
            });
        }
    }
    Ok(())
}
