//! UGC marketplace commands.

use clap::Subcommand;

use avenue_client::api::ugc::CampaignFilter;
use avenue_client::ugc::{BrandDashboard, CreatorDashboard};
use avenue_core::{CampaignStatus, Price};

use super::{CliError, Context};

#[derive(Subcommand)]
pub enum UgcAction {
    /// Browse campaigns
    Campaigns {
        #[arg(long)]
        category: Option<String>,

        /// draft, active, paused or closed
        #[arg(long)]
        status: Option<CampaignStatus>,
    },
    /// Your applications
    Applications,
    /// Creator dashboard, or the brand dashboard with `--brand`
    Dashboard {
        #[arg(long)]
        brand: bool,
    },
    /// Content packages for brands
    Packages,
}

pub async fn run(ctx: &Context, action: UgcAction) -> Result<(), CliError> {
    let api = &ctx.api;
    match action {
        UgcAction::Campaigns { category, status } => {
            let campaigns = api.campaigns(&CampaignFilter { category, status }).await?;
            for c in campaigns {
                let budget = c.budget.map(|b| Price::cop(b).to_string()).unwrap_or_default();
                println!("[{}] {} ({}) {budget}", c.id, c.title, c.status);
            }
        }
        UgcAction::Applications => {
            for a in api.my_applications().await? {
                println!(
                    "[{}] {} - {}",
                    a.id,
                    a.campaign_title.as_deref().unwrap_or(a.campaign_id.as_str()),
                    a.status
                );
            }
        }
        UgcAction::Dashboard { brand: true } => {
            let dashboard = BrandDashboard::load(api).await?;
            let s = dashboard.summary;
            println!("{}", dashboard.profile.company_name);
            println!("  active campaigns:  {}", s.active_campaigns);
            println!("  applications:      {}", s.total_applications);
            println!("  video credits:     {}", s.credits_remaining);
        }
        UgcAction::Dashboard { brand: false } => {
            let dashboard = CreatorDashboard::load(api).await?;
            let s = dashboard.summary;
            println!("  pending applications:  {}", s.pending_applications);
            println!("  accepted applications: {}", s.accepted_applications);
            println!("  deliverables due:      {}", s.deliverables_due);
            println!("  earnings:              {}", s.earnings_price());
            if dashboard.needs_profile() {
                println!("  ⚠ complete your profile so brands can find you");
            }
        }
        UgcAction::Packages => {
            for p in api.packages().await? {
                let unit = p
                    .price_per_video()
                    .map(|u| format!(" ({} per video)", Price::cop(u)))
                    .unwrap_or_default();
                let popular = if p.popular { " ★" } else { "" };
                println!(
                    "[{}] {}{popular}: {} videos, {}{unit}",
                    p.id,
                    p.name,
                    p.video_count,
                    Price::cop(p.price)
                );
            }
        }
    }
    Ok(())
}
