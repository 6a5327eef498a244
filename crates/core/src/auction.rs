// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The auction engine.
//!
//! One auction moves through
//! `Received → Filtered → Bid → Ranked → Cleared → Recorded`.
//!
//! ## Invariants
//!
//! - An auction that collected zero bids writes nothing
//! - Any auction with at least one bid writes exactly one [`AuctionRecord`],
//!   with or without a winner
//! - At most one record exists per request id; a replay returns the stored
//!   record and the stored impression without re-running
//! - `clearing_price <= winning_bid` and, with a runner-up,
//!   `clearing_price >= runner_up.ad_rank / winner.quality_score`
//!
//! Filtering, bidding, ranking and clearing do no I/O beyond reads of the
//! ledger and the counter store.

use std::sync::Arc;
use std::time::Instant;

use adserve_audit::{AuctionRecord, AuctionWinner, BidSnapshot, ContextSnapshot};
use adserve_domain::{
    AdGroup, BidInputs, Campaign, CampaignId, CreativeCandidate, CreativeScorer, DeviceContext,
    EligibilityInput, GeoLocation, PageContext, PerformanceCounters, Placement, PlacementId, RequestContext,
    ServingClock, UserContext, calculate_bid, check_eligibility, effective_quality_score,
    is_servable, select_best_creative,
};
use rust_decimal::{Decimal, RoundingStrategy};
use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::counters::{CounterScope, CounterStore};
use crate::error::CoreError;
use crate::ledger::BudgetLedger;
use crate::store::{EventStore, ImpressionRecord, InsertOutcome};

/// The smallest amount by which a clearing price beats the runner-up.
pub const MIN_PRICE_INCREMENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

const PRICE_SCALE: u32 = 2;

/// Where an auction is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuctionStage {
    Received,
    Filtered,
    Bid,
    Ranked,
    Cleared,
    Recorded,
}

impl AuctionStage {
    /// Returns the following stage, or `None` after `Recorded`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::Filtered),
            Self::Filtered => Some(Self::Bid),
            Self::Bid => Some(Self::Ranked),
            Self::Ranked => Some(Self::Cleared),
            Self::Cleared => Some(Self::Recorded),
            Self::Recorded => None,
        }
    }

    /// Returns a stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Filtered => "filtered",
            Self::Bid => "bid",
            Self::Ranked => "ranked",
            Self::Cleared => "cleared",
            Self::Recorded => "recorded",
        }
    }
}

/// Tracks one auction's stage and refuses to move backwards or skip.
#[derive(Debug)]
struct StageTracker<'a> {
    request_id: &'a str,
    stage: AuctionStage,
}

impl<'a> StageTracker<'a> {
    const fn new(request_id: &'a str) -> Self {
        Self {
            request_id,
            stage: AuctionStage::Received,
        }
    }

    fn advance(&mut self, to: AuctionStage) {
        if self.stage.next() == Some(to) {
            debug!(request_id = %self.request_id, stage = to.as_str(), "Auction stage");
            self.stage = to;
        }
    }
}

/// Everything the engine needs to run one auction.
#[derive(Debug, Clone)]
pub struct AuctionRequest {
    pub request_id: String,
    pub placement_id: PlacementId,
    pub user: UserContext,
    pub page: PageContext,
    pub device: DeviceContext,
    pub now: OffsetDateTime,
}

/// A recorded auction and the impression it served, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAuction {
    pub record: AuctionRecord,
    pub impression: Option<ImpressionRecord>,
    /// True if the request id had already been auctioned.
    pub replayed: bool,
}

/// The engine's answer to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionOutcome {
    /// No campaign produced a bid. Nothing was written.
    NoBids,
    /// The auction was recorded; check `record.winner` for a served ad.
    Recorded(RecordedAuction),
}

/// Ranks, clears and records auctions.
pub struct AuctionEngine {
    catalog: Arc<Catalog>,
    ledger: Arc<dyn BudgetLedger>,
    counters: Arc<dyn CounterStore>,
    store: Arc<dyn EventStore>,
    scorer: Arc<dyn CreativeScorer>,
    clock: ServingClock,
}

impl std::fmt::Debug for AuctionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuctionEngine")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl AuctionEngine {
    /// Creates a new engine.
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        ledger: Arc<dyn BudgetLedger>,
        counters: Arc<dyn CounterStore>,
        store: Arc<dyn EventStore>,
        scorer: Arc<dyn CreativeScorer>,
        clock: ServingClock,
    ) -> Self {
        Self {
            catalog,
            ledger,
            counters,
            store,
            scorer,
            clock,
        }
    }

    /// Runs (or replays) the auction for a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the placement is unknown or inactive, the clock
    /// cannot resolve the serving day, or a store fails.
    pub fn run(&self, request: &AuctionRequest) -> Result<AuctionOutcome, CoreError> {
        if let Some(replayed) = self.replay(&request.request_id)? {
            info!(request_id = %request.request_id, "Auction replayed");
            return Ok(AuctionOutcome::Recorded(replayed));
        }

        let started: Instant = Instant::now();
        let mut tracker: StageTracker<'_> = StageTracker::new(&request.request_id);

        let placement: &Placement = self.catalog.placement(&request.placement_id)?;
        let ctx: RequestContext =
            RequestContext::from_contexts(&request.user, &request.page, request.now, &self.clock)?;
        let today: Date = self.clock.local_date(request.now)?;

        let mut eligible_campaign_ids: Vec<CampaignId> = Vec::new();
        let mut bids: Vec<BidSnapshot> = Vec::new();

        for campaign in self
            .catalog
            .campaigns_for_organization(&placement.organization_id)
        {
            if !self.is_eligible(campaign, placement, &ctx, today)? {
                continue;
            }
            eligible_campaign_ids.push(campaign.id.clone());

            if let Some(bid) = self.collect_bid(campaign, placement, &ctx, today)? {
                bids.push(bid);
            }
        }
        tracker.advance(AuctionStage::Filtered);
        tracker.advance(AuctionStage::Bid);

        if bids.is_empty() {
            info!(
                request_id = %request.request_id,
                placement_id = %placement.id,
                eligible = eligible_campaign_ids.len(),
                "No bids"
            );
            return Ok(AuctionOutcome::NoBids);
        }

        rank_bids(&mut bids);
        tracker.advance(AuctionStage::Ranked);

        let winner: Option<AuctionWinner> = select_winner(&bids, placement.minimum_bid);
        tracker.advance(AuctionStage::Cleared);

        let duration_micros: u64 =
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

        let record: AuctionRecord = AuctionRecord {
            auction_id: uuid::Uuid::new_v4().to_string(),
            request_id: request.request_id.clone(),
            placement_id: placement.id.clone(),
            context: snapshot_context(request),
            eligible_campaign_ids,
            participating_bids: bids,
            winner,
            duration_micros,
            auction_time: request.now,
        };

        let impression: Option<ImpressionRecord> = record
            .winner
            .as_ref()
            .map(|winner| build_impression(&record, winner, request));

        let outcome: InsertOutcome<AuctionRecord> =
            self.store.insert_auction(&record, impression.as_ref())?;
        tracker.advance(AuctionStage::Recorded);

        match outcome {
            InsertOutcome::Created(record) => {
                info!(
                    request_id = %record.request_id,
                    auction_id = %record.auction_id,
                    bids = record.total_participating(),
                    winning_bid = ?record.winning_bid(),
                    clearing_price = ?record.clearing_price(),
                    duration_micros = record.duration_micros,
                    "Auction recorded"
                );
                Ok(AuctionOutcome::Recorded(RecordedAuction {
                    record,
                    impression,
                    replayed: false,
                }))
            }
            InsertOutcome::Existing(record) => {
                info!(request_id = %record.request_id, "Auction raced a replay; using stored record");
                let impression: Option<ImpressionRecord> =
                    self.store.impression_for_auction(&record.auction_id)?;
                Ok(AuctionOutcome::Recorded(RecordedAuction {
                    record,
                    impression,
                    replayed: true,
                }))
            }
        }
    }

    fn replay(&self, request_id: &str) -> Result<Option<RecordedAuction>, CoreError> {
        let Some(record) = self.store.auction_by_request_id(request_id)? else {
            return Ok(None);
        };
        let impression: Option<ImpressionRecord> =
            self.store.impression_for_auction(&record.auction_id)?;
        Ok(Some(RecordedAuction {
            record,
            impression,
            replayed: true,
        }))
    }

    fn is_eligible(
        &self,
        campaign: &Campaign,
        placement: &Placement,
        ctx: &RequestContext,
        today: Date,
    ) -> Result<bool, CoreError> {
        if self.catalog.is_paused(&campaign.id)? {
            debug!(campaign_id = %campaign.id, reason = "paused", "Campaign not eligible");
            return Ok(false);
        }

        let compatible_creatives: usize = self
            .catalog
            .ad_groups(&campaign.id)
            .iter()
            .map(|ad_group| {
                self.catalog
                    .creatives(&ad_group.id)
                    .iter()
                    .filter(|creative| is_servable(ad_group, creative, placement))
                    .count()
            })
            .sum();

        let campaign_counters: PerformanceCounters = self
            .counters
            .counters(&CounterScope::Campaign(campaign.id.clone()))?;

        let input: EligibilityInput<'_> = EligibilityInput {
            campaign,
            placement,
            lifetime_spend: campaign_counters.spend,
            daily_budget_available: self.ledger.check_available(&campaign.id, today)?,
            compatible_creatives,
        };

        match check_eligibility(&input, ctx) {
            Ok(()) => Ok(true),
            Err(reason) => {
                debug!(campaign_id = %campaign.id, %reason, "Campaign not eligible");
                Ok(false)
            }
        }
    }

    fn collect_bid(
        &self,
        campaign: &Campaign,
        placement: &Placement,
        ctx: &RequestContext,
        today: Date,
    ) -> Result<Option<BidSnapshot>, CoreError> {
        let mut candidates: Vec<CreativeCandidate<'_>> = Vec::new();
        for ad_group in self.catalog.ad_groups(&campaign.id) {
            for creative in self.catalog.creatives(&ad_group.id) {
                if !is_servable(ad_group, creative, placement) {
                    continue;
                }
                let counters: PerformanceCounters = self
                    .counters
                    .counters(&CounterScope::Creative(creative.id.clone()))?;
                candidates.push(CreativeCandidate {
                    ad_group,
                    creative,
                    counters,
                });
            }
        }

        let Some(best) = select_best_creative(&candidates, self.scorer.as_ref()) else {
            return Ok(None);
        };
        let ad_group: &AdGroup = best.ad_group;

        let campaign_counters: PerformanceCounters = self
            .counters
            .counters(&CounterScope::Campaign(campaign.id.clone()))?;
        let inputs: BidInputs<'_> = BidInputs {
            campaign,
            ad_group,
            campaign_counters: &campaign_counters,
            today_spend: self.ledger.spend(&campaign.id, today)?,
            returning_user: ctx.returning_user,
        };

        let Some(bid_amount) = calculate_bid(&inputs) else {
            debug!(campaign_id = %campaign.id, "Campaign produced no positive bid");
            return Ok(None);
        };

        let quality_score: Decimal = effective_quality_score(best.creative);
        let snapshot: Option<BidSnapshot> = BidSnapshot::new(
            campaign.id.clone(),
            ad_group.id.clone(),
            best.creative.id.clone(),
            bid_amount,
            quality_score,
        );
        if snapshot.is_none() {
            warn!(
                campaign_id = %campaign.id,
                %bid_amount,
                %quality_score,
                "Ad rank overflowed; bid dropped"
            );
        }
        Ok(snapshot)
    }
}

/// Sorts bids by ad rank, highest first. Equal ranks keep catalog order.
pub fn rank_bids(bids: &mut [BidSnapshot]) {
    bids.sort_by(|a, b| b.ad_rank.cmp(&a.ad_rank));
}

/// Picks the winner from ranked bids and prices it.
///
/// The top bid wins only if it meets the placement minimum.
#[must_use]
pub fn select_winner(ranked: &[BidSnapshot], minimum_bid: Decimal) -> Option<AuctionWinner> {
    let top: &BidSnapshot = ranked.first()?;
    if top.bid_amount < minimum_bid {
        return None;
    }
    Some(AuctionWinner {
        campaign_id: top.campaign_id.clone(),
        ad_group_id: top.ad_group_id.clone(),
        creative_id: top.creative_id.clone(),
        winning_bid: top.bid_amount,
        clearing_price: clearing_price(top, ranked.get(1)),
    })
}

/// Generalized second-price clearing.
///
/// Without a runner-up, or with a non-positive winner quality score, the
/// winner pays its own bid. Otherwise it pays the least amount whose ad rank
/// beats the runner-up: `runner_up.ad_rank / winner.quality_score + 0.01`,
/// rounded up to the cent and capped at its own bid. A price too large to
/// represent is capped the same way.
#[must_use]
pub fn clearing_price(winner: &BidSnapshot, runner_up: Option<&BidSnapshot>) -> Decimal {
    let Some(runner_up) = runner_up else {
        return winner.bid_amount;
    };
    if winner.quality_score <= Decimal::ZERO {
        return winner.bid_amount;
    }
    runner_up
        .ad_rank
        .checked_div(winner.quality_score)
        .and_then(|price| price.checked_add(MIN_PRICE_INCREMENT))
        .map_or(winner.bid_amount, |price| {
            price
                .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::AwayFromZero)
                .min(winner.bid_amount)
        })
}

fn snapshot_context(request: &AuctionRequest) -> ContextSnapshot {
    let data: serde_json::Value = serde_json::json!({
        "user_context": request.user,
        "page_context": request.page,
        "device_context": request.device,
    });
    ContextSnapshot::new(data.to_string())
}

fn build_impression(
    record: &AuctionRecord,
    winner: &AuctionWinner,
    request: &AuctionRequest,
) -> ImpressionRecord {
    let location: GeoLocation = request.user.location.clone().unwrap_or_default();
    ImpressionRecord {
        impression_id: uuid::Uuid::new_v4().to_string(),
        auction_id: Some(record.auction_id.clone()),
        request_id: Some(record.request_id.clone()),
        campaign_id: winner.campaign_id.clone(),
        ad_group_id: winner.ad_group_id.clone(),
        creative_id: winner.creative_id.clone(),
        placement_id: record.placement_id.clone(),
        session_id: request.user.session_id.clone(),
        user_agent: request.device.user_agent.clone(),
        ip_address: request.device.ip_address.clone(),
        page_url: request.page.page_url.clone(),
        referrer_url: request.page.referrer_url.clone(),
        country: location.country,
        region: location.region,
        city: location.city,
        device_type: request.user.device_type.clone(),
        browser: request.device.browser.clone(),
        os: request.device.os.clone(),
        bid_amount: winner.winning_bid,
        cost: winner.clearing_price,
        billed_amount: Decimal::ZERO,
        viewable: false,
        view_duration_ms: 0,
        scroll_depth: None,
        served_at: request.now,
    }
}
