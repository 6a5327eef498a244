// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read-only serving catalog.
//!
//! Campaigns, ad groups, creatives and placements are owned by the campaign
//! management layer and loaded once. The only state the engine may change is
//! an auto-pause override on a campaign, held beside the catalog rather than
//! in it.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use adserve_domain::{
    AdGroup, AdGroupId, Campaign, CampaignId, CampaignStatus, Creative, CreativeId,
    MAX_BID_AMOUNT, OrganizationId, Placement, PlacementId, validate_amount, validate_campaign,
    validate_quality_score,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::counters::{CounterScope, CounterStore};
use crate::error::CoreError;

/// The catalog as supplied by the campaign management layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogData {
    pub campaigns: Vec<Campaign>,
    pub ad_groups: Vec<AdGroup>,
    pub creatives: Vec<Creative>,
    pub placements: Vec<Placement>,
}

/// Indexed, validated catalog.
#[derive(Debug)]
pub struct Catalog {
    campaigns: Vec<Campaign>,
    campaign_index: HashMap<CampaignId, usize>,
    ad_groups: HashMap<CampaignId, Vec<AdGroup>>,
    ad_group_index: HashMap<AdGroupId, CampaignId>,
    creatives: HashMap<AdGroupId, Vec<Creative>>,
    creative_index: HashMap<CreativeId, AdGroupId>,
    placements: HashMap<PlacementId, Placement>,
    paused: RwLock<HashSet<CampaignId>>,
}

impl Catalog {
    /// Validates and indexes catalog data.
    ///
    /// Campaign order is preserved; it is the iteration order of every
    /// auction and so the tie-break order for equal scores.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - an id is duplicated
    /// - an ad group references an unknown campaign
    /// - a creative references an unknown ad group
    /// - a budget, bid or target is negative or out of range
    /// - a quality score is not positive or out of range
    /// - a schedule window is malformed
    pub fn new(data: CatalogData) -> Result<Self, CoreError> {
        let mut campaign_index: HashMap<CampaignId, usize> = HashMap::new();
        for (position, campaign) in data.campaigns.iter().enumerate() {
            validate_campaign(campaign)?;
            if campaign_index.insert(campaign.id.clone(), position).is_some() {
                return Err(CoreError::InvalidCatalog(format!(
                    "duplicate campaign id {}",
                    campaign.id
                )));
            }
        }

        let mut ad_groups: HashMap<CampaignId, Vec<AdGroup>> = HashMap::new();
        let mut ad_group_index: HashMap<AdGroupId, CampaignId> = HashMap::new();
        for ad_group in data.ad_groups {
            if !campaign_index.contains_key(&ad_group.campaign_id) {
                return Err(CoreError::InvalidCatalog(format!(
                    "ad group {} references unknown campaign {}",
                    ad_group.id, ad_group.campaign_id
                )));
            }
            if let Some(bid) = ad_group.default_bid {
                validate_amount("ad_group.default_bid", bid, MAX_BID_AMOUNT)?;
            }
            if ad_group_index
                .insert(ad_group.id.clone(), ad_group.campaign_id.clone())
                .is_some()
            {
                return Err(CoreError::InvalidCatalog(format!(
                    "duplicate ad group id {}",
                    ad_group.id
                )));
            }
            ad_groups
                .entry(ad_group.campaign_id.clone())
                .or_default()
                .push(ad_group);
        }

        let mut creatives: HashMap<AdGroupId, Vec<Creative>> = HashMap::new();
        let mut creative_index: HashMap<CreativeId, AdGroupId> = HashMap::new();
        for creative in data.creatives {
            if !ad_group_index.contains_key(&creative.ad_group_id) {
                return Err(CoreError::InvalidCatalog(format!(
                    "creative {} references unknown ad group {}",
                    creative.id, creative.ad_group_id
                )));
            }
            if let Some(quality_score) = creative.quality_score {
                validate_quality_score(quality_score)?;
            }
            if creative_index
                .insert(creative.id.clone(), creative.ad_group_id.clone())
                .is_some()
            {
                return Err(CoreError::InvalidCatalog(format!(
                    "duplicate creative id {}",
                    creative.id
                )));
            }
            creatives
                .entry(creative.ad_group_id.clone())
                .or_default()
                .push(creative);
        }

        let mut placements: HashMap<PlacementId, Placement> = HashMap::new();
        for placement in data.placements {
            validate_amount("minimum_bid", placement.minimum_bid, MAX_BID_AMOUNT)?;
            if let Some(base_cpc) = placement.base_cpc {
                validate_amount("base_cpc", base_cpc, MAX_BID_AMOUNT)?;
            }
            if let Some(base_cpm) = placement.base_cpm {
                validate_amount("base_cpm", base_cpm, MAX_BID_AMOUNT)?;
            }
            let id: PlacementId = placement.id.clone();
            if placements.insert(id.clone(), placement).is_some() {
                return Err(CoreError::InvalidCatalog(format!(
                    "duplicate placement id {id}"
                )));
            }
        }

        info!(
            campaigns = data.campaigns.len(),
            ad_groups = ad_group_index.len(),
            creatives = creative_index.len(),
            placements = placements.len(),
            "Catalog loaded"
        );

        Ok(Self {
            campaigns: data.campaigns,
            campaign_index,
            ad_groups,
            ad_group_index,
            creatives,
            creative_index,
            placements,
            paused: RwLock::new(HashSet::new()),
        })
    }

    /// Parses and validates a JSON catalog.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidCatalog` if the JSON is malformed, or any
    /// error from [`Catalog::new`].
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let data: CatalogData = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidCatalog(format!("malformed catalog JSON: {e}")))?;
        Self::new(data)
    }

    /// Looks up a placement that is accepting ads.
    ///
    /// # Errors
    ///
    /// Returns `PlacementNotFound` for an unknown id and `PlacementInactive`
    /// for a disabled placement.
    pub fn placement(&self, id: &PlacementId) -> Result<&Placement, CoreError> {
        let placement: &Placement = self
            .placements
            .get(id)
            .ok_or_else(|| CoreError::PlacementNotFound(id.clone()))?;
        if !placement.is_active {
            return Err(CoreError::PlacementInactive(id.clone()));
        }
        Ok(placement)
    }

    /// Looks up a placement regardless of whether it is active.
    #[must_use]
    pub fn placement_any(&self, id: &PlacementId) -> Option<&Placement> {
        self.placements.get(id)
    }

    #[must_use]
    pub fn campaign(&self, id: &CampaignId) -> Option<&Campaign> {
        self.campaign_index
            .get(id)
            .and_then(|position| self.campaigns.get(*position))
    }

    /// Returns the organization's campaigns in catalog order.
    pub fn campaigns_for_organization<'a>(
        &'a self,
        organization_id: &'a OrganizationId,
    ) -> impl Iterator<Item = &'a Campaign> + 'a {
        self.campaigns
            .iter()
            .filter(move |campaign| &campaign.organization_id == organization_id)
    }

    #[must_use]
    pub fn campaigns(&self) -> &[Campaign] {
        &self.campaigns
    }

    #[must_use]
    pub fn ad_groups(&self, campaign_id: &CampaignId) -> &[AdGroup] {
        self.ad_groups.get(campaign_id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn ad_group(&self, id: &AdGroupId) -> Option<&AdGroup> {
        let campaign_id: &CampaignId = self.ad_group_index.get(id)?;
        self.ad_groups(campaign_id)
            .iter()
            .find(|ad_group| &ad_group.id == id)
    }

    #[must_use]
    pub fn creatives(&self, ad_group_id: &AdGroupId) -> &[Creative] {
        self.creatives.get(ad_group_id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn creative(&self, id: &CreativeId) -> Option<&Creative> {
        let ad_group_id: &AdGroupId = self.creative_index.get(id)?;
        self.creatives(ad_group_id)
            .iter()
            .find(|creative| &creative.id == id)
    }

    /// Marks a campaign paused for the rest of the process lifetime.
    ///
    /// # Returns
    ///
    /// True if this call paused it, false if it was already paused.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign is unknown or the pause set is poisoned.
    pub fn pause_campaign(&self, id: &CampaignId) -> Result<bool, CoreError> {
        if !self.campaign_index.contains_key(id) {
            return Err(CoreError::CampaignNotFound(id.clone()));
        }
        let mut paused = self
            .paused
            .write()
            .map_err(|_| CoreError::LockPoisoned("paused campaigns"))?;
        let newly_paused: bool = paused.insert(id.clone());
        if newly_paused {
            warn!(campaign_id = %id, "Campaign paused");
        }
        Ok(newly_paused)
    }

    /// Returns true if the campaign has been paused by the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the pause set is poisoned.
    pub fn is_paused(&self, id: &CampaignId) -> Result<bool, CoreError> {
        let paused = self
            .paused
            .read()
            .map_err(|_| CoreError::LockPoisoned("paused campaigns"))?;
        Ok(paused.contains(id))
    }

    /// The campaign's status with any engine pause applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the pause set is poisoned.
    pub fn effective_status(&self, campaign: &Campaign) -> Result<CampaignStatus, CoreError> {
        if self.is_paused(&campaign.id)? {
            Ok(CampaignStatus::Paused)
        } else {
            Ok(campaign.status)
        }
    }

    /// Seeds a counter store with the counters carried in the catalog.
    ///
    /// Scopes the store already knows are left untouched, so reseeding a
    /// persistent store on restart does not roll counters back.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn seed_counters(&self, store: &dyn CounterStore) -> Result<(), CoreError> {
        for campaign in &self.campaigns {
            store.seed(&CounterScope::Campaign(campaign.id.clone()), &campaign.counters)?;
        }
        for ad_group in self.ad_groups.values().flatten() {
            store.seed(&CounterScope::AdGroup(ad_group.id.clone()), &ad_group.counters)?;
        }
        for creative in self.creatives.values().flatten() {
            store.seed(&CounterScope::Creative(creative.id.clone()), &creative.counters)?;
        }
        Ok(())
    }
}
