//! Notification commands.

use std::time::Duration;

use clap::Subcommand;

use avenue_client::notifications::{DEFAULT_POLL_INTERVAL, NotificationCenter, UnreadCountPoller};
use avenue_core::NotificationId;

use super::{CliError, Context};

#[derive(Subcommand)]
pub enum NotificationsAction {
    /// List notifications
    List,
    /// Mark one notification read
    Read { id: String },
    /// Mark everything read
    ReadAll,
    /// Print the unread count whenever it changes (Ctrl-C to stop)
    Watch {
        /// Poll interval in seconds
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
        interval: u64,
    },
}

pub async fn run(ctx: &Context, action: NotificationsAction) -> Result<(), CliError> {
    let center = NotificationCenter::new(ctx.api.clone());
    match action {
        NotificationsAction::List => {
            let notifications = center.list().await?;
            if notifications.is_empty() {
                println!("No notifications");
            }
            for n in notifications {
                let marker = if n.read { ' ' } else { '•' };
                println!("{marker} [{}] {}", n.id, n.title);
                if !n.message.is_empty() {
                    println!("    {}", n.message);
                }
            }
        }
        NotificationsAction::Read { id } => {
            center.mark_read(&NotificationId::new(id)).await?;
            println!("Marked read");
        }
        NotificationsAction::ReadAll => {
            center.mark_all_read().await?;
            println!("All notifications marked read");
        }
        NotificationsAction::Watch { interval } => {
            let poller = UnreadCountPoller::spawn(
                ctx.api.clone(),
                Duration::from_secs(interval.max(1)),
            )
            .ok_or_else(|| CliError::Usage("Sign in to see notifications".to_string()))?;
            let mut count = poller.subscribe();
            loop {
                tokio::select! {
                    changed = count.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        println!("Unread: {}", *count.borrow_and_update());
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
    }
    Ok(())
}
