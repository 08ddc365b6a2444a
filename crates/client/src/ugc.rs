//! Creator and brand dashboards.
//!
//! Each dashboard loads its records concurrently and derives the summary
//! cards from them; nothing is cached between loads.

use rust_decimal::Decimal;
use tracing::{info, instrument};

use avenue_core::{ApplicationStatus, CampaignStatus, DeliverableStatus, Price};

use crate::api::ApiClient;
use crate::api::ugc::{Application, BrandProfile, Campaign, CreatorProfile, Deliverable, Package};
use crate::error::ClientError;

/// Summary cards on the creator dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CreatorSummary {
    pub pending_applications: usize,
    pub accepted_applications: usize,
    /// Deliverables pending or sent back for changes.
    pub deliverables_due: usize,
    /// Sum of payments on approved deliverables.
    pub earnings: Decimal,
}

impl CreatorSummary {
    #[must_use]
    pub fn from_records(applications: &[Application], deliverables: &[Deliverable]) -> Self {
        let count = |status| applications.iter().filter(|a| a.status == status).count();
        Self {
            pending_applications: count(ApplicationStatus::Pending),
            accepted_applications: count(ApplicationStatus::Accepted),
            deliverables_due: deliverables
                .iter()
                .filter(|d| d.status.awaits_creator())
                .count(),
            earnings: deliverables
                .iter()
                .filter(|d| d.status == DeliverableStatus::Approved)
                .filter_map(|d| d.payment_amount)
                .sum(),
        }
    }

    #[must_use]
    pub fn earnings_price(&self) -> Price {
        Price::cop(self.earnings)
    }
}

/// Everything the creator dashboard shows.
#[derive(Debug, Clone)]
pub struct CreatorDashboard {
    pub profile: CreatorProfile,
    pub applications: Vec<Application>,
    pub deliverables: Vec<Deliverable>,
    pub summary: CreatorSummary,
}

impl CreatorDashboard {
    /// Load profile, applications and deliverables concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first failing request.
    #[instrument(skip(api))]
    pub async fn load(api: &ApiClient) -> Result<Self, ClientError> {
        let (profile, applications, deliverables) = tokio::try_join!(
            api.creator_profile(),
            api.my_applications(),
            api.my_deliverables()
        )?;
        let summary = CreatorSummary::from_records(&applications, &deliverables);
        info!(
            applications = applications.len(),
            deliverables = deliverables.len(),
            "Creator dashboard loaded"
        );
        Ok(Self {
            profile,
            applications,
            deliverables,
            summary,
        })
    }

    /// Whether to show the "complete your profile" banner.
    #[must_use]
    pub fn needs_profile(&self) -> bool {
        !self.profile.is_complete()
    }
}

/// Summary cards on the brand dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BrandSummary {
    pub active_campaigns: usize,
    pub total_applications: u32,
    pub credits_remaining: u32,
}

impl BrandSummary {
    #[must_use]
    pub fn from_records(profile: &BrandProfile, campaigns: &[Campaign]) -> Self {
        Self {
            active_campaigns: campaigns
                .iter()
                .filter(|c| c.status == CampaignStatus::Active)
                .count(),
            total_applications: campaigns.iter().map(|c| c.applications_count).sum(),
            credits_remaining: profile.credits_remaining,
        }
    }
}

/// Everything the brand dashboard shows.
#[derive(Debug, Clone)]
pub struct BrandDashboard {
    pub profile: BrandProfile,
    pub campaigns: Vec<Campaign>,
    pub packages: Vec<Package>,
    pub summary: BrandSummary,
}

impl BrandDashboard {
    /// Load profile, campaigns and the package catalog concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first failing request.
    #[instrument(skip(api))]
    pub async fn load(api: &ApiClient) -> Result<Self, ClientError> {
        let (profile, campaigns, packages) =
            tokio::try_join!(api.brand_profile(), api.my_campaigns(), api.packages())?;
        let summary = BrandSummary::from_records(&profile, &campaigns);
        info!(campaigns = campaigns.len(), "Brand dashboard loaded");
        Ok(Self {
            profile,
            campaigns,
            packages,
            summary,
        })
    }
}
