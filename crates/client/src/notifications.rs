//! Notification bell.
//!
//! [`NotificationCenter`] wraps the list and mark-read calls;
//! [`UnreadCountPoller`] keeps the badge count fresh in the background.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use avenue_core::NotificationId;

use crate::api::ApiClient;
use crate::api::notifications::Notification;
use crate::error::ClientError;

/// How often the badge is refreshed by default.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Notification list operations for the signed-in user.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    api: ApiClient,
}

impl NotificationCenter {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// All notifications, newest first as the backend returns them.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<Notification>, ClientError> {
        self.api.notifications().await
    }

    /// Unread badge count.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn unread_count(&self) -> Result<u32, ClientError> {
        self.api.unread_count().await
    }

    /// Mark one notification read.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn mark_read(&self, id: &NotificationId) -> Result<(), ClientError> {
        self.api.mark_notification_read(id).await?;
        Ok(())
    }

    /// Mark everything read.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn mark_all_read(&self) -> Result<(), ClientError> {
        self.api.mark_all_notifications_read().await?;
        Ok(())
    }
}

/// Background unread-count refresh published on a `watch` channel.
///
/// A failed poll keeps the last known count. Dropping the handle stops
/// polling.
#[derive(Debug)]
pub struct UnreadCountPoller {
    count: watch::Receiver<u32>,
    task: JoinHandle<()>,
}

impl UnreadCountPoller {
    /// Start polling every `interval`, first poll immediately. Returns
    /// `None` when nobody is signed in.
    #[must_use]
    pub fn spawn(api: ApiClient, interval: Duration) -> Option<Self> {
        if !api.store().has_auth_token() {
            debug!("No auth token, unread count polling not started");
            return None;
        }

        let (tx, count) = watch::channel(0);
        let task = tokio::spawn(poll_loop(api, interval, tx));
        info!(interval_secs = interval.as_secs(), "Unread count polling started");
        Some(Self { count, task })
    }

    /// Last known unread count.
    #[must_use]
    pub fn count(&self) -> u32 {
        *self.count.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.count.clone()
    }
}

impl Drop for UnreadCountPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[instrument(name = "unread_count_poller", skip_all)]
async fn poll_loop(api: ApiClient, interval: Duration, tx: watch::Sender<u32>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match api.unread_count().await {
            Ok(count) => {
                tx.send_if_modified(|current| {
                    if *current == count {
                        false
                    } else {
                        debug!(count, "Unread count changed");
                        *current = count;
                        true
                    }
                });
            }
            Err(e) => warn!(error = %e, "Unread count poll failed"),
        }
    }
}
