//! Photo-studio reservation endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use avenue_core::{ReservationId, ReservationStatus};

use super::ApiClient;
use crate::error::ClientError;

/// Availability of one opening hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourSlot {
    /// Hour of day, 0-23.
    pub hour: u8,
    pub available: bool,
}

/// Per-hour availability for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub date: NaiveDate,
    #[serde(alias = "availability")]
    pub slots: Vec<HourSlot>,
}

impl Availability {
    /// Whether the backend marked `hour` available.
    ///
    /// Unknown hours are unavailable, and an hour listed more than once is
    /// available only if every entry for it says so.
    #[must_use]
    pub fn is_hour_available(&self, hour: u8) -> bool {
        let mut entries = self.slots.iter().filter(|slot| slot.hour == hour).peekable();
        entries.peek().is_some() && entries.all(|slot| slot.available)
    }

    /// Hours marked available, ascending.
    #[must_use]
    pub fn available_hours(&self) -> Vec<u8> {
        let mut hours: Vec<u8> = self
            .slots
            .iter()
            .map(|slot| slot.hour)
            .filter(|hour| self.is_hour_available(*hour))
            .collect();
        hours.sort_unstable();
        hours.dedup();
        hours
    }
}

/// Reservation submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationRequest {
    pub date: NaiveDate,
    /// `HH:00`.
    pub start_time: String,
    pub duration_hours: u8,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A reservation accepted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_hours: u8,
    #[serde(default)]
    pub status: ReservationStatus,
    #[serde(default, alias = "price", with = "rust_decimal::serde::float_option")]
    pub total_price: Option<Decimal>,
}

impl ApiClient {
    /// `GET /api/reservations/availability/{date}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(date = %date))]
    pub async fn availability(&self, date: NaiveDate) -> Result<Availability, ClientError> {
        self.get(&format!(
            "/api/reservations/availability/{}",
            date.format("%Y-%m-%d")
        ))
        .await
    }

    /// `POST /api/reservations`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the slot was taken meanwhile.
    #[instrument(
        skip(self, request),
        fields(date = %request.date, start = %request.start_time, hours = request.duration_hours)
    )]
    pub async fn create_reservation(
        &self,
        request: &ReservationRequest,
    ) -> Result<Reservation, ClientError> {
        self.post("/api/reservations", request).await
    }

    /// `GET /api/reservations` for the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if not logged in or the request fails.
    #[instrument(skip(self))]
    pub async fn my_reservations(&self) -> Result<Vec<Reservation>, ClientError> {
        self.get("/api/reservations").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_hours_are_unavailable() {
        let availability: Availability = serde_json::from_str(
            r#"{"date":"2026-10-20","slots":[{"hour":12,"available":true},{"hour":10,"available":true},{"hour":11,"available":false}]}"#,
        )
        .unwrap();
        assert!(availability.is_hour_available(10));
        assert!(!availability.is_hour_available(11));
        assert!(!availability.is_hour_available(9));
        assert_eq!(availability.available_hours(), vec![10, 12]);
    }

    #[test]
    fn test_conflicting_duplicate_hour_is_taken() {
        let availability: Availability = serde_json::from_str(
            r#"{"date":"2026-10-20","slots":[{"hour":10,"available":true},{"hour":10,"available":false},{"hour":11,"available":true},{"hour":11,"available":true}]}"#,
        )
        .unwrap();
        assert!(!availability.is_hour_available(10));
        assert!(availability.is_hour_available(11));
        assert_eq!(availability.available_hours(), vec![11]);
    }
}
