//! Interactive inactivity tracking.
//!
//! Every line typed counts as activity. `extend` keeps the session alive
//! from the warning and `logout` ends it.

use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};

use avenue_client::session::{Activity, Phase, SessionTimeout, TimeoutSettings};

use super::{CliError, Context};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run the inactivity tracker until the session ends
    Watch,
}

pub async fn run(ctx: &Context, action: SessionAction) -> Result<(), CliError> {
    match action {
        SessionAction::Watch => watch(ctx).await,
    }
}

async fn watch(ctx: &Context) -> Result<(), CliError> {
    let settings = TimeoutSettings::try_from(ctx.config.session)?;
    let tracker = SessionTimeout::spawn(ctx.api.store().clone(), settings)
        .ok_or_else(|| CliError::Usage("Not signed in".to_string()))?;
    let mut phase = tracker.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "Session active; logs out after {} minutes without input",
        settings.timeout().as_secs() / 60
    );

    loop {
        tokio::select! {
            changed = phase.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *phase.borrow_and_update();
                match current {
                    Phase::Active => println!("Session active"),
                    Phase::Warning { remaining_seconds } => {
                        println!("Session expires in {remaining_seconds}s (type `extend` to stay)");
                    }
                    Phase::LoggedOut => {
                        println!("Logged out");
                        break;
                    }
                }
            }
            line = lines.next_line() => {
                match line?.as_deref().map(str::trim) {
                    Some("extend") => {
                        if let Err(e) = tracker.extend().await {
                            println!("{e}");
                        }
                    }
                    Some("logout") => {
                        tracker.logout().await;
                    }
                    Some(_) => tracker.record(Activity::KeyPress),
                    // stdin closed; nothing more can count as activity
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
