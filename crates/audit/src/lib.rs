// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Auction audit records.
//!
//! Every auction that collected at least one bid produces exactly one
//! [`AuctionRecord`], keyed by its request id, whether or not a winner cleared.
//! Records are immutable once created and carry the full bid snapshot so a
//! clearing price can be recomputed offline.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]

use adserve_domain::{AdGroupId, CampaignId, CreativeId, PlacementId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One campaign's entry in an auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidSnapshot {
    /// The bidding campaign.
    pub campaign_id: CampaignId,
    /// The ad group the creative belongs to.
    pub ad_group_id: AdGroupId,
    /// The creative the campaign entered.
    pub creative_id: CreativeId,
    /// The campaign's bid.
    pub bid_amount: Decimal,
    /// The creative's quality score at auction time.
    pub quality_score: Decimal,
    /// `bid_amount × quality_score`.
    pub ad_rank: Decimal,
}

impl BidSnapshot {
    /// Creates a snapshot, deriving the ad rank.
    ///
    /// Returns `None` if the ad rank does not fit in a `Decimal`.
    ///
    /// # Arguments
    ///
    /// * `campaign_id` - The bidding campaign
    /// * `ad_group_id` - The creative's ad group
    /// * `creative_id` - The entered creative
    /// * `bid_amount` - The campaign's bid
    /// * `quality_score` - The creative's quality score
    #[must_use]
    pub fn new(
        campaign_id: CampaignId,
        ad_group_id: AdGroupId,
        creative_id: CreativeId,
        bid_amount: Decimal,
        quality_score: Decimal,
    ) -> Option<Self> {
        let ad_rank: Decimal = bid_amount.checked_mul(quality_score)?;
        Some(Self {
            campaign_id,
            ad_group_id,
            creative_id,
            bid_amount,
            quality_score,
            ad_rank,
        })
    }
}

/// The creative that won an auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionWinner {
    /// The winning campaign.
    pub campaign_id: CampaignId,
    /// The winning creative's ad group.
    pub ad_group_id: AdGroupId,
    /// The winning creative.
    pub creative_id: CreativeId,
    /// The winner's own bid.
    pub winning_bid: Decimal,
    /// The price the winner pays.
    pub clearing_price: Decimal,
}

/// A serialized view of the request an auction ran for.
///
/// Opaque to this crate; the serving layer decides its shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// The serialized request context.
    pub data: String,
}

impl ContextSnapshot {
    /// Creates a new `ContextSnapshot`.
    #[must_use]
    pub const fn new(data: String) -> Self {
        Self { data }
    }
}

/// An immutable record of one auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionRecord {
    /// Unique id of this auction.
    pub auction_id: String,
    /// The caller's request id. At most one record exists per request id.
    pub request_id: String,
    /// The placement auctioned.
    pub placement_id: PlacementId,
    /// The request the auction ran for.
    pub context: ContextSnapshot,
    /// Every campaign that passed targeting.
    pub eligible_campaign_ids: Vec<CampaignId>,
    /// Every bid collected, ranked by ad rank descending.
    pub participating_bids: Vec<BidSnapshot>,
    /// The winner, if any bid cleared the placement minimum.
    pub winner: Option<AuctionWinner>,
    /// Wall-clock time spent filtering, bidding, ranking and clearing.
    pub duration_micros: u64,
    /// When the auction ran.
    #[serde(with = "time::serde::rfc3339")]
    pub auction_time: OffsetDateTime,
}

impl AuctionRecord {
    /// Number of campaigns that passed targeting.
    #[must_use]
    pub fn total_eligible(&self) -> usize {
        self.eligible_campaign_ids.len()
    }

    /// Number of bids collected.
    #[must_use]
    pub fn total_participating(&self) -> usize {
        self.participating_bids.len()
    }

    /// The winner's bid, if any.
    #[must_use]
    pub fn winning_bid(&self) -> Option<Decimal> {
        self.winner.as_ref().map(|winner| winner.winning_bid)
    }

    /// The price the winner pays, if any.
    #[must_use]
    pub fn clearing_price(&self) -> Option<Decimal> {
        self.winner.as_ref().map(|winner| winner.clearing_price)
    }

    /// Checks the record's internal invariants.
    ///
    /// A consistent record has a winner drawn from its own bid snapshot, and a
    /// clearing price that does not exceed the winning bid.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.winner.as_ref().is_none_or(|winner| {
            winner.clearing_price <= winner.winning_bid
                && self.participating_bids.iter().any(|bid| {
                    bid.creative_id == winner.creative_id && bid.bid_amount == winner.winning_bid
                })
        })
    }
}

#[cfg(test)]
mod tests;
