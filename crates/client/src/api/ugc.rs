//! UGC marketplace endpoints: campaigns, applications, deliverables,
//! creator and brand profiles, and content packages.
//!
//! Records are read-only projections fetched per screen. Only the package
//! catalog is cached.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use avenue_core::{
    ApplicationId, ApplicationStatus, BrandId, CampaignId, CampaignStatus, CreatorId,
    DeliverableId, DeliverableStatus, PackageId, UserId,
};

use super::cache::{CacheValue, PACKAGES_KEY};
use super::shop::path_segment;
use super::ApiClient;
use crate::error::ClientError;

// =============================================================================
// Campaigns
// =============================================================================

/// A brand's request for creator content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub brand_name: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub budget: Option<Decimal>,
    #[serde(default)]
    pub videos_required: u32,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub applications_count: u32,
}

/// Catalog filter. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignFilter {
    pub category: Option<String>,
    pub status: Option<CampaignStatus>,
}

/// New campaign details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCampaign {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub budget: Decimal,
    pub videos_required: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    pub requirements: Vec<String>,
}

// =============================================================================
// Applications
// =============================================================================

/// A creator's application to a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub campaign_id: CampaignId,
    #[serde(default)]
    pub campaign_title: Option<String>,
    #[serde(default)]
    pub creator_id: Option<CreatorId>,
    #[serde(default)]
    pub creator_name: Option<String>,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default, alias = "message")]
    pub proposal: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub proposed_rate: Option<Decimal>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Application payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyRequest {
    pub proposal: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub proposed_rate: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct StatusUpdate<S> {
    status: S,
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback: Option<String>,
}

// =============================================================================
// Deliverables
// =============================================================================

/// A piece of content a creator owes for an accepted application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliverable {
    pub id: DeliverableId,
    pub campaign_id: CampaignId,
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: DeliverableStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub payment_amount: Option<Decimal>,
}

/// Content submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliverableSubmission {
    pub content_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Brand decision on a submitted deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    RequestChanges,
}

impl ReviewDecision {
    const fn status(self) -> DeliverableStatus {
        match self {
            Self::Approve => DeliverableStatus::Approved,
            Self::RequestChanges => DeliverableStatus::ChangesRequested,
        }
    }
}

// =============================================================================
// Profiles
// =============================================================================

/// Public creator profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorProfile {
    #[serde(default)]
    pub id: Option<CreatorId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub tiktok: Option<String>,
    #[serde(default)]
    pub portfolio_urls: Vec<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub rate_per_video: Option<Decimal>,
}

impl CreatorProfile {
    /// Whether the profile has everything brands need to evaluate the creator:
    /// a bio, a city, at least one category, one social handle and one
    /// portfolio link.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let filled =
            |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());

        filled(&self.bio)
            && filled(&self.city)
            && !self.categories.is_empty()
            && (filled(&self.instagram) || filled(&self.tiktok))
            && self.portfolio_urls.iter().any(|url| !url.trim().is_empty())
    }
}

/// Brand account profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandProfile {
    pub id: BrandId,
    pub company_name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Videos left from purchased packages.
    #[serde(default)]
    pub credits_remaining: u32,
}

// =============================================================================
// Packages
// =============================================================================

/// A prepaid bundle of UGC videos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub video_count: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub popular: bool,
}

impl Package {
    /// Unit price per video, rounded to whole pesos. `None` for an empty package.
    #[must_use]
    pub fn price_per_video(&self) -> Option<Decimal> {
        (self.video_count > 0)
            .then(|| (self.price / Decimal::from(self.video_count)).round_dp(0))
    }
}

/// Result of buying a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackagePurchase {
    #[serde(default, alias = "checkout_url")]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub credits_remaining: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Endpoints
// =============================================================================

impl ApiClient {
    /// `GET /api/ugc/campaigns`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn campaigns(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>, ClientError> {
        self.get_query(
            "/api/ugc/campaigns",
            &[
                ("category", filter.category.as_deref()),
                ("status", filter.status.as_ref().map(CampaignStatus::as_str)),
            ],
        )
        .await
    }

    /// `GET /api/ugc/campaigns/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign is not found or the request fails.
    #[instrument(skip(self), fields(campaign_id = %id))]
    pub async fn campaign(&self, id: &CampaignId) -> Result<Campaign, ClientError> {
        self.get(&format!("/api/ugc/campaigns/{}", path_segment(id.as_str())))
            .await
    }

    /// `POST /api/ugc/campaigns`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the campaign is rejected.
    #[instrument(skip(self, campaign), fields(title = %campaign.title))]
    pub async fn create_campaign(&self, campaign: &NewCampaign) -> Result<Campaign, ClientError> {
        self.post("/api/ugc/campaigns", campaign).await
    }

    /// `GET /api/ugc/brands/me/campaigns`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn my_campaigns(&self) -> Result<Vec<Campaign>, ClientError> {
        self.get("/api/ugc/brands/me/campaigns").await
    }

    /// `POST /api/ugc/campaigns/{id}/apply`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the creator already applied.
    #[instrument(skip(self, request), fields(campaign_id = %id))]
    pub async fn apply_to_campaign(
        &self,
        id: &CampaignId,
        request: &ApplyRequest,
    ) -> Result<Application, ClientError> {
        self.post(
            &format!("/api/ugc/campaigns/{}/apply", path_segment(id.as_str())),
            request,
        )
        .await
    }

    /// `GET /api/ugc/applications/me`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn my_applications(&self) -> Result<Vec<Application>, ClientError> {
        self.get("/api/ugc/applications/me").await
    }

    /// `GET /api/ugc/campaigns/{id}/applications`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(campaign_id = %id))]
    pub async fn campaign_applications(
        &self,
        id: &CampaignId,
    ) -> Result<Vec<Application>, ClientError> {
        self.get(&format!(
            "/api/ugc/campaigns/{}/applications",
            path_segment(id.as_str())
        ))
        .await
    }

    /// `PUT /api/ugc/applications/{id}/status`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the transition is rejected.
    #[instrument(skip(self), fields(application_id = %id, status = %status))]
    pub async fn update_application_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, ClientError> {
        self.put(
            &format!("/api/ugc/applications/{}/status", path_segment(id.as_str())),
            &StatusUpdate {
                status,
                feedback: None,
            },
        )
        .await
    }

    /// `GET /api/ugc/deliverables/me`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn my_deliverables(&self) -> Result<Vec<Deliverable>, ClientError> {
        self.get("/api/ugc/deliverables/me").await
    }

    /// `POST /api/ugc/deliverables/{id}/submit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, submission), fields(deliverable_id = %id))]
    pub async fn submit_deliverable(
        &self,
        id: &DeliverableId,
        submission: &DeliverableSubmission,
    ) -> Result<Deliverable, ClientError> {
        self.post(
            &format!("/api/ugc/deliverables/{}/submit", path_segment(id.as_str())),
            submission,
        )
        .await
    }

    /// `PUT /api/ugc/deliverables/{id}/review`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, feedback), fields(deliverable_id = %id))]
    pub async fn review_deliverable(
        &self,
        id: &DeliverableId,
        decision: ReviewDecision,
        feedback: Option<String>,
    ) -> Result<Deliverable, ClientError> {
        self.put(
            &format!("/api/ugc/deliverables/{}/review", path_segment(id.as_str())),
            &StatusUpdate {
                status: decision.status(),
                feedback,
            },
        )
        .await
    }

    /// `GET /api/ugc/creators/me`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn creator_profile(&self) -> Result<CreatorProfile, ClientError> {
        self.get("/api/ugc/creators/me").await
    }

    /// `PUT /api/ugc/creators/me`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the profile is rejected.
    #[instrument(skip(self, profile))]
    pub async fn update_creator_profile(
        &self,
        profile: &CreatorProfile,
    ) -> Result<CreatorProfile, ClientError> {
        self.put("/api/ugc/creators/me", profile).await
    }

    /// `GET /api/ugc/brands/me`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn brand_profile(&self) -> Result<BrandProfile, ClientError> {
        self.get("/api/ugc/brands/me").await
    }

    /// `GET /api/ugc/packages`, cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn packages(&self) -> Result<Vec<Package>, ClientError> {
        if let Some(CacheValue::Packages(packages)) = self.inner.cache.get(PACKAGES_KEY).await {
            debug!("Cache hit for packages");
            return Ok(packages);
        }

        let packages: Vec<Package> = self.get("/api/ugc/packages").await?;

        self.inner
            .cache
            .insert(PACKAGES_KEY.to_string(), CacheValue::Packages(packages.clone()))
            .await;

        Ok(packages)
    }

    /// `POST /api/ugc/packages/{id}/purchase`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(package_id = %id))]
    pub async fn purchase_package(&self, id: &PackageId) -> Result<PackagePurchase, ClientError> {
        self.post_empty(&format!(
            "/api/ugc/packages/{}/purchase",
            path_segment(id.as_str())
        ))
        .await
    }
}
