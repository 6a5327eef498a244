// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The serving façade: auction, impression, click and conversion handlers.
//!
//! Each handler validates its request, delegates to the engine and the event
//! store, and applies metrics only for events this call actually created.
//! Duplicate deliveries return the stored event and change nothing.

use std::str::FromStr;
use std::sync::Arc;

use adserve::{
    AuctionEngine, AuctionOutcome, AuctionRequest, Catalog, ClickRecord, ConversionRecord,
    CoreError, EventStore, ImpressionRecord, InsertOutcome, MetricsAggregator, RecordedAuction,
    Stores, ViewabilityUpdate, VoidedEvents, click_charge, impression_charge,
};
use adserve_audit::AuctionWinner;
use adserve_domain::{
    ClickContext, ConversionType, Creative, CreativeScorer, CtrBoostedScorer, FraudAssessment,
    PlacementId, PricingModel, ServingClock, score_click, validate_auction_context,
    validate_non_negative, validate_viewability,
};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{DEFAULT_ATTRIBUTION_MODEL, DEFAULT_VERIFICATION_METHOD, ServingConfig};
use crate::error::{ApiError, translate_core_error, translate_domain_error};
use crate::request_response::{
    AuctionApiRequest, AuctionApiResponse, AuctionResult, CreativeInfo, TrackClickRequest,
    TrackClickResponse, TrackConversionRequest, TrackConversionResponse, TrackImpressionRequest,
    TrackImpressionResponse, VoidEventsResponse,
};

/// Serves ads and tracks what happens to them.
///
/// All methods take `&self`; one server is shared across request threads.
/// Contention is confined to the stores behind it.
pub struct AdServer {
    catalog: Arc<Catalog>,
    engine: AuctionEngine,
    metrics: MetricsAggregator,
    events: Arc<dyn EventStore>,
    clock: ServingClock,
    config: ServingConfig,
}

impl std::fmt::Debug for AdServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdServer")
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AdServer {
    /// Creates a server using the CTR-boosted creative scorer.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured timezone is unknown or the
    /// catalog's counters cannot be seeded into the counter store.
    pub fn new(catalog: Catalog, stores: &Stores, config: ServingConfig) -> Result<Self, ApiError> {
        Self::with_scorer(catalog, stores, config, Arc::new(CtrBoostedScorer))
    }

    /// Creates a server with a custom creative scorer.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Campaigns, ad groups, creatives and placements
    /// * `stores` - Ledger, counter and event stores
    /// * `config` - Serving configuration
    /// * `scorer` - Relevance model used to pick each campaign's creative
    ///
    /// # Errors
    ///
    /// Returns an error if the configured timezone is unknown or the
    /// catalog's counters cannot be seeded into the counter store.
    pub fn with_scorer(
        catalog: Catalog,
        stores: &Stores,
        config: ServingConfig,
        scorer: Arc<dyn CreativeScorer>,
    ) -> Result<Self, ApiError> {
        let clock: ServingClock =
            ServingClock::new(&config.timezone).map_err(|e| ApiError::InvalidInput {
                field: String::from("timezone"),
                message: e.to_string(),
            })?;

        let catalog: Arc<Catalog> = Arc::new(catalog);
        catalog
            .seed_counters(stores.counters.as_ref())
            .map_err(translate_core_error)?;

        let engine: AuctionEngine = AuctionEngine::new(
            Arc::clone(&catalog),
            Arc::clone(&stores.ledger),
            Arc::clone(&stores.counters),
            Arc::clone(&stores.events),
            scorer,
            clock,
        );
        let metrics: MetricsAggregator = MetricsAggregator::new(
            Arc::clone(&catalog),
            Arc::clone(&stores.counters),
            Arc::clone(&stores.ledger),
        );

        info!(
            timezone = clock.timezone(),
            campaigns = catalog.campaigns().len(),
            "Ad server ready"
        );

        Ok(Self {
            catalog,
            engine,
            metrics,
            events: Arc::clone(&stores.events),
            clock,
            config,
        })
    }

    /// Returns the catalog being served.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the serving configuration.
    #[must_use]
    pub const fn config(&self) -> &ServingConfig {
        &self.config
    }

    /// Runs an auction for a placement and serves the winner.
    ///
    /// A served ad has its impression recorded and billed before this returns.
    /// Replaying a request id returns the stored outcome without charging again.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` if `session_id`, `device_type` or
    /// `page_url` is missing. Every other failure is logged and answered
    /// with [`AuctionResult::NoAd`].
    pub fn auction(
        &self,
        request: AuctionApiRequest,
        now: OffsetDateTime,
    ) -> Result<AuctionResult, ApiError> {
        validate_auction_context(&request.user_context, &request.page_context)
            .map_err(translate_domain_error)?;

        let request_id: String = request
            .request_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let engine_request: AuctionRequest = AuctionRequest {
            request_id,
            placement_id: PlacementId::new(&request.placement_id),
            user: request.user_context,
            page: request.page_context,
            device: request.device_context,
            now,
        };

        match self.serve(&engine_request) {
            Ok(result) => Ok(result),
            Err(err @ (CoreError::PlacementNotFound(_) | CoreError::PlacementInactive(_))) => {
                warn!(
                    request_id = %engine_request.request_id,
                    error = %err,
                    "Auction for unavailable placement"
                );
                Ok(AuctionResult::NoAd)
            }
            Err(err) => {
                error!(
                    request_id = %engine_request.request_id,
                    placement_id = %engine_request.placement_id,
                    error = %err,
                    "Auction failed; serving no ad"
                );
                Ok(AuctionResult::NoAd)
            }
        }
    }

    fn serve(&self, request: &AuctionRequest) -> Result<AuctionResult, CoreError> {
        let recorded: RecordedAuction = match self.engine.run(request)? {
            AuctionOutcome::NoBids => return Ok(AuctionResult::NoAd),
            AuctionOutcome::Recorded(recorded) => recorded,
        };

        let (Some(winner), Some(impression)) =
            (recorded.record.winner.as_ref(), recorded.impression)
        else {
            debug!(request_id = %request.request_id, "No bid cleared the placement minimum");
            return Ok(AuctionResult::NoAd);
        };

        if !recorded.replayed {
            self.count_impression(&impression, request.now)?;
        }

        let creative: &Creative = self.catalog.creative(&winner.creative_id).ok_or_else(|| {
            CoreError::InvalidCatalog(format!("winning creative {} missing", winner.creative_id))
        })?;

        Ok(AuctionResult::Served(AuctionApiResponse {
            auction_id: recorded.record.auction_id.clone(),
            request_id: recorded.record.request_id.clone(),
            impression_id: impression.impression_id,
            creative: creative_info(creative, winner),
            bid_amount: winner.winning_bid,
            clearing_price: winner.clearing_price,
        }))
    }

    /// Counts and bills a freshly recorded impression.
    ///
    /// The impression row is already committed. If counting or billing fails
    /// it is withdrawn, so a replay of the request serves nothing and no
    /// click can land on an impression that was never counted.
    fn count_impression(
        &self,
        impression: &ImpressionRecord,
        now: OffsetDateTime,
    ) -> Result<(), CoreError> {
        let billed: Decimal = match self.bill_impression(impression, now) {
            Ok(billed) => billed,
            Err(err) => {
                self.withdraw_impression(impression, None);
                return Err(err);
            }
        };
        if billed == Decimal::ZERO {
            return Ok(());
        }
        if let Err(err) = self
            .events
            .set_impression_billed(&impression.impression_id, billed)
        {
            self.withdraw_impression(impression, Some(billed));
            return Err(err);
        }
        Ok(())
    }

    fn bill_impression(
        &self,
        impression: &ImpressionRecord,
        now: OffsetDateTime,
    ) -> Result<Decimal, CoreError> {
        let amount: Decimal = impression_charge(self.pricing_model(impression)?, impression.cost);
        let date: Date = self.clock.local_date(now)?;
        self.metrics.on_impression(impression, amount, date, now)
    }

    /// Deletes an impression whose serving failed. `counted` carries the
    /// billed amount if its counters were already applied.
    fn withdraw_impression(&self, impression: &ImpressionRecord, counted: Option<Decimal>) {
        if let Err(err) = self.events.delete_impression(&impression.impression_id) {
            error!(
                impression_id = %impression.impression_id,
                error = %err,
                "Failed to withdraw uncounted impression"
            );
            return;
        }
        if let Some(billed) = counted {
            let reversal: ImpressionRecord = ImpressionRecord {
                billed_amount: billed,
                ..impression.clone()
            };
            if let Err(err) = self.metrics.reverse_impression(&reversal) {
                error!(
                    impression_id = %impression.impression_id,
                    error = %err,
                    "Failed to reverse counters of withdrawn impression"
                );
            }
        }
        warn!(
            impression_id = %impression.impression_id,
            "Impression withdrawn after billing failure"
        );
    }

    /// Records client viewability for a served impression.
    ///
    /// # Errors
    ///
    /// Returns an error if `scroll_depth` is outside `0..=100` or the
    /// impression does not exist.
    pub fn track_impression(
        &self,
        request: &TrackImpressionRequest,
    ) -> Result<TrackImpressionResponse, ApiError> {
        if let Some(depth) = request.scroll_depth {
            validate_viewability(depth).map_err(translate_domain_error)?;
        }

        let update: ViewabilityUpdate = ViewabilityUpdate {
            viewable: request.viewable,
            view_duration_ms: request.view_duration,
            scroll_depth: request.scroll_depth,
        };
        let updated: Option<ImpressionRecord> = self
            .events
            .update_viewability(&request.impression_id, &update)
            .map_err(translate_core_error)?;
        if updated.is_none() {
            return Err(translate_core_error(CoreError::ImpressionNotFound(
                request.impression_id.clone(),
            )));
        }

        debug!(
            impression_id = %request.impression_id,
            viewable = request.viewable,
            view_duration_ms = request.view_duration,
            "Impression viewability recorded"
        );

        Ok(TrackImpressionResponse {
            impression_id: request.impression_id.clone(),
            message: String::from("Impression tracked successfully"),
        })
    }

    /// Records a click, scoring it for fraud and billing it if valid.
    ///
    /// A second click on the same impression returns the first click.
    ///
    /// # Errors
    ///
    /// Returns an error if `time_to_click` is negative, the impression does
    /// not exist, or a store fails.
    pub fn track_click(
        &self,
        request: TrackClickRequest,
        now: OffsetDateTime,
    ) -> Result<TrackClickResponse, ApiError> {
        validate_non_negative("time_to_click", request.time_to_click)
            .map_err(translate_domain_error)?;

        let impression: ImpressionRecord = self
            .events
            .impression(&request.impression_id)
            .map_err(translate_core_error)?
            .ok_or_else(|| {
                translate_core_error(CoreError::ImpressionNotFound(request.impression_id.clone()))
            })?;

        self.record_click(&impression, request, now)
            .map_err(translate_core_error)
    }

    fn record_click(
        &self,
        impression: &ImpressionRecord,
        request: TrackClickRequest,
        now: OffsetDateTime,
    ) -> Result<TrackClickResponse, CoreError> {
        let since: OffsetDateTime = now
            .checked_sub(self.config.fraud_lookback)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        let recent_clicks_from_ip: u32 = match impression.ip_address.as_deref() {
            Some(ip) => self.events.count_clicks_from_ip_since(ip, since)?,
            None => 0,
        };

        let assessment: FraudAssessment = score_click(&ClickContext {
            time_to_click: request.time_to_click,
            recent_clicks_from_ip,
            user_agent: impression.user_agent.clone(),
            click_position: request.click_position,
        });

        let destination_url: String = request
            .destination_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| {
                self.catalog
                    .creative(&impression.creative_id)
                    .map(|creative| creative.destination_url.clone())
            })
            .unwrap_or_default();

        let click: ClickRecord = ClickRecord {
            click_id: Uuid::new_v4().to_string(),
            impression_id: impression.impression_id.clone(),
            campaign_id: impression.campaign_id.clone(),
            ad_group_id: impression.ad_group_id.clone(),
            creative_id: impression.creative_id.clone(),
            ip_address: impression.ip_address.clone(),
            user_agent: impression.user_agent.clone(),
            destination_url,
            click_position: request.click_position,
            time_to_click: request.time_to_click,
            is_valid: assessment.is_valid,
            fraud_score: assessment.score,
            fraud_reason: assessment.reason(),
            cost: Decimal::ZERO,
            clicked_at: now,
        };

        let mut click: ClickRecord = match self.events.insert_click(&click)? {
            InsertOutcome::Created(click) => click,
            InsertOutcome::Existing(existing) => {
                info!(
                    impression_id = %existing.impression_id,
                    click_id = %existing.click_id,
                    "Duplicate click; returning stored click"
                );
                return Ok(click_response(&existing));
            }
        };

        if click.is_valid {
            let amount: Decimal =
                click_charge(self.pricing_model(impression)?, impression.cost, true);
            let date: Date = self.clock.local_date(now)?;
            let billed: Decimal = self.metrics.on_click(&click, amount, date, now)?;
            if billed > Decimal::ZERO {
                self.events.set_click_cost(&click.click_id, billed)?;
                click.cost = billed;
            }
            info!(
                click_id = %click.click_id,
                impression_id = %click.impression_id,
                cost = %click.cost,
                "Click recorded"
            );
        } else {
            info!(
                click_id = %click.click_id,
                impression_id = %click.impression_id,
                fraud_score = %click.fraud_score,
                reasons = %click.fraud_reason,
                "Click rejected as invalid"
            );
        }

        Ok(click_response(&click))
    }

    /// Records a conversion following a click.
    ///
    /// A conversion carrying a transaction or order id already recorded for
    /// the same click returns the stored conversion.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversion type is unknown, the value is
    /// negative, the click does not exist, or a store fails.
    pub fn track_conversion(
        &self,
        request: TrackConversionRequest,
        now: OffsetDateTime,
    ) -> Result<TrackConversionResponse, ApiError> {
        let conversion_type: ConversionType =
            ConversionType::from_str(&request.conversion_type).map_err(translate_domain_error)?;
        let conversion_value: Decimal = request
            .conversion_value
            .unwrap_or(self.config.default_conversion_value);
        validate_non_negative("conversion_value", conversion_value)
            .map_err(translate_domain_error)?;

        let click: ClickRecord = self
            .events
            .click(&request.click_id)
            .map_err(translate_core_error)?
            .ok_or_else(|| {
                translate_core_error(CoreError::ClickNotFound(request.click_id.clone()))
            })?;

        let custom_data: serde_json::Value = if request.custom_data.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            request.custom_data
        };

        let conversion: ConversionRecord = ConversionRecord {
            conversion_id: Uuid::new_v4().to_string(),
            click_id: click.click_id.clone(),
            campaign_id: click.campaign_id.clone(),
            ad_group_id: click.ad_group_id.clone(),
            creative_id: click.creative_id.clone(),
            conversion_type,
            conversion_value,
            currency: self.config.currency.clone(),
            order_id: non_empty(request.order_id),
            transaction_id: non_empty(request.transaction_id),
            attribution_model: non_empty(request.attribution_model)
                .unwrap_or_else(|| DEFAULT_ATTRIBUTION_MODEL.to_string()),
            verification_method: Some(
                non_empty(request.verification_method)
                    .unwrap_or_else(|| DEFAULT_VERIFICATION_METHOD.to_string()),
            ),
            is_verified: request.is_verified,
            custom_data,
            converted_at: now,
        };

        self.record_conversion(&conversion, now)
            .map_err(translate_core_error)
    }

    fn record_conversion(
        &self,
        conversion: &ConversionRecord,
        now: OffsetDateTime,
    ) -> Result<TrackConversionResponse, CoreError> {
        match self.events.insert_conversion(conversion)? {
            InsertOutcome::Created(conversion) => {
                let date: Date = self.clock.local_date(now)?;
                self.metrics.on_conversion(&conversion, date)?;
                info!(
                    conversion_id = %conversion.conversion_id,
                    click_id = %conversion.click_id,
                    conversion_type = %conversion.conversion_type,
                    value = %conversion.conversion_value,
                    verified = conversion.is_verified,
                    "Conversion recorded"
                );
                Ok(conversion_response(&conversion))
            }
            InsertOutcome::Existing(existing) => {
                info!(
                    conversion_id = %existing.conversion_id,
                    click_id = %existing.click_id,
                    "Duplicate conversion; returning stored conversion"
                );
                Ok(conversion_response(&existing))
            }
        }
    }

    /// Deletes an impression with its click and conversions and backs them
    /// out of the counters. Budget already charged stays charged.
    ///
    /// # Errors
    ///
    /// Returns an error if the impression does not exist or a store fails.
    pub fn void_impression(&self, impression_id: &str) -> Result<VoidEventsResponse, ApiError> {
        let voided: VoidedEvents = self
            .events
            .delete_impression(impression_id)
            .map_err(translate_core_error)?;
        if voided.impression.is_none() {
            return Err(translate_core_error(CoreError::ImpressionNotFound(
                impression_id.to_string(),
            )));
        }
        self.reverse(&voided)
    }

    /// Deletes a click with its conversions and backs them out of the counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the click does not exist or a store fails.
    pub fn void_click(&self, click_id: &str) -> Result<VoidEventsResponse, ApiError> {
        let voided: VoidedEvents = self
            .events
            .delete_click(click_id)
            .map_err(translate_core_error)?;
        if voided.click.is_none() {
            return Err(translate_core_error(CoreError::ClickNotFound(
                click_id.to_string(),
            )));
        }
        self.reverse(&voided)
    }

    /// Deletes a conversion and backs it out of the counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversion does not exist or a store fails.
    pub fn void_conversion(&self, conversion_id: &str) -> Result<VoidEventsResponse, ApiError> {
        let voided: VoidedEvents = self
            .events
            .delete_conversion(conversion_id)
            .map_err(translate_core_error)?;
        if voided.conversions.is_empty() {
            return Err(translate_core_error(CoreError::ConversionNotFound(
                conversion_id.to_string(),
            )));
        }
        self.reverse(&voided)
    }

    fn reverse(&self, voided: &VoidedEvents) -> Result<VoidEventsResponse, ApiError> {
        for conversion in &voided.conversions {
            self.metrics
                .reverse_conversion(conversion)
                .map_err(translate_core_error)?;
        }
        if let Some(click) = &voided.click {
            self.metrics
                .reverse_click(click)
                .map_err(translate_core_error)?;
        }
        if let Some(impression) = &voided.impression {
            self.metrics
                .reverse_impression(impression)
                .map_err(translate_core_error)?;
        }

        let response: VoidEventsResponse = VoidEventsResponse {
            impressions: usize::from(voided.impression.is_some()),
            clicks: usize::from(voided.click.is_some()),
            conversions: voided.conversions.len(),
        };
        warn!(
            impressions = response.impressions,
            clicks = response.clicks,
            conversions = response.conversions,
            "Serving events voided"
        );
        Ok(response)
    }

    fn pricing_model(&self, impression: &ImpressionRecord) -> Result<PricingModel, CoreError> {
        self.catalog
            .placement_any(&impression.placement_id)
            .map(|placement| placement.pricing_model)
            .ok_or_else(|| CoreError::PlacementNotFound(impression.placement_id.clone()))
    }
}

fn creative_info(creative: &Creative, winner: &AuctionWinner) -> CreativeInfo {
    CreativeInfo {
        creative_id: creative.id.to_string(),
        ad_group_id: winner.ad_group_id.to_string(),
        campaign_id: winner.campaign_id.to_string(),
        creative_type: creative.creative_type.as_str().to_string(),
        headline: creative.headline.clone(),
        description: creative.description.clone(),
        image_url: creative.image_url.clone(),
        destination_url: creative.destination_url.clone(),
    }
}

fn click_response(click: &ClickRecord) -> TrackClickResponse {
    TrackClickResponse {
        click_id: click.click_id.clone(),
        is_valid: click.is_valid,
        message: String::from("Click tracked successfully"),
    }
}

fn conversion_response(conversion: &ConversionRecord) -> TrackConversionResponse {
    TrackConversionResponse {
        conversion_id: conversion.conversion_id.clone(),
        conversion_value: conversion.conversion_value,
        message: String::from("Conversion tracked successfully"),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
