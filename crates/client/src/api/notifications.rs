//! In-app notification endpoints.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use avenue_core::NotificationId;

use super::shop::path_segment;
use super::{Ack, ApiClient};
use crate::error::ClientError;

/// A notification shown in the bell menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, alias = "is_read")]
    pub read: bool,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnreadCount {
    #[serde(alias = "unread_count")]
    count: u32,
}

impl ApiClient {
    /// `GET /api/notifications`.
    ///
    /// # Errors
    ///
    /// Returns an error if not logged in or the request fails.
    #[instrument(skip(self))]
    pub async fn notifications(&self) -> Result<Vec<Notification>, ClientError> {
        self.get("/api/notifications").await
    }

    /// `GET /api/notifications/unread-count`.
    ///
    /// # Errors
    ///
    /// Returns an error if not logged in or the request fails.
    #[instrument(skip(self))]
    pub async fn unread_count(&self) -> Result<u32, ClientError> {
        let body: UnreadCount = self.get("/api/notifications/unread-count").await?;
        Ok(body.count)
    }

    /// `PUT /api/notifications/{id}/read`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(notification_id = %id))]
    pub async fn mark_notification_read(
        &self,
        id: &NotificationId,
    ) -> Result<Option<Ack>, ClientError> {
        self.put(
            &format!("/api/notifications/{}/read", path_segment(id.as_str())),
            &serde_json::json!({}),
        )
        .await
    }

    /// `PUT /api/notifications/read-all`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn mark_all_notifications_read(&self) -> Result<Option<Ack>, ClientError> {
        self.put("/api/notifications/read-all", &serde_json::json!({}))
            .await
    }
}
