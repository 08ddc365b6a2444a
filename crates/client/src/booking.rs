//! Photo-studio booking wizard.
//!
//! `SelectDate -> SelectTime -> ContactForm -> Confirmed`. The draft lives
//! only in the wizard; it becomes a reservation when the backend accepts the
//! final POST.
//!
//! Rules enforced here:
//! - A date is bookable online only from tomorrow on. Same-day requests go
//!   through WhatsApp.
//! - A slot needs every hour in `[start, start + duration)` available and
//!   must end by closing time.
//! - Prices come from a fixed table per package, never from an hourly rate.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use avenue_core::{Email, Price};

use crate::api::ApiClient;
use crate::api::reservations::{Availability, Reservation, ReservationRequest};
use crate::error::{ClientError, ValidationError};

/// Studio closing hour; slots must end at or before it.
pub const CLOSING_HOUR: u8 = 22;

/// Bookable package length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingDuration {
    TwoHours,
    FourHours,
    SixHours,
    EightHours,
}

impl BookingDuration {
    /// All packages, shortest first.
    pub const ALL: [Self; 4] = [
        Self::TwoHours,
        Self::FourHours,
        Self::SixHours,
        Self::EightHours,
    ];

    /// Length in hours.
    #[must_use]
    pub const fn hours(self) -> u8 {
        match self {
            Self::TwoHours => 2,
            Self::FourHours => 4,
            Self::SixHours => 6,
            Self::EightHours => 8,
        }
    }

    /// Fixed package price in COP.
    #[must_use]
    pub fn price(self) -> Price {
        let amount: i64 = match self {
            Self::TwoHours => 250_000,
            Self::FourHours => 450_000,
            Self::SixHours => 650_000,
            Self::EightHours => 800_000,
        };
        Price::cop(Decimal::from(amount))
    }
}

impl TryFrom<u8> for BookingDuration {
    type Error = ValidationError;

    fn try_from(hours: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|d| d.hours() == hours)
            .ok_or(ValidationError::UnsupportedDuration(hours))
    }
}

/// Whether `date` can be booked online when today is `today`.
#[must_use]
pub fn is_date_selectable(date: NaiveDate, today: NaiveDate) -> bool {
    today
        .checked_add_days(Days::new(1))
        .is_some_and(|first_bookable| date >= first_bookable)
}

/// Whether `start` for `duration` fits in `availability` and before closing.
#[must_use]
pub fn is_slot_selectable(
    availability: &Availability,
    start: u8,
    duration: BookingDuration,
) -> bool {
    let Some(end) = start.checked_add(duration.hours()) else {
        return false;
    };
    end <= CLOSING_HOUR && (start..end).all(|hour| availability.is_hour_available(hour))
}

/// Start hours offered for `duration`, ascending.
#[must_use]
pub fn selectable_starts(availability: &Availability, duration: BookingDuration) -> Vec<u8> {
    availability
        .available_hours()
        .into_iter()
        .filter(|&start| is_slot_selectable(availability, start, duration))
        .collect()
}

/// Contact form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
}

impl ContactDetails {
    /// Check required fields; returns the normalized email.
    ///
    /// # Errors
    ///
    /// Returns the first failing check.
    pub fn validate(&self) -> Result<Email, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingField("email"));
        }
        let email = Email::parse(&self.email)?;
        if self.phone.trim().is_empty() {
            return Err(ValidationError::MissingField("phone"));
        }
        Ok(email)
    }
}

/// Wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStep {
    SelectDate,
    SelectTime,
    ContactForm,
    Confirmed,
}

/// The slot chosen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotChoice {
    pub date: NaiveDate,
    pub start_hour: u8,
    pub duration: BookingDuration,
}

impl SlotChoice {
    /// Package price.
    #[must_use]
    pub fn price(&self) -> Price {
        self.duration.price()
    }

    /// Hour the session ends.
    #[must_use]
    pub const fn end_hour(&self) -> u8 {
        self.start_hour + self.duration.hours()
    }
}

/// Three-step reservation flow.
#[derive(Debug)]
pub struct BookingWizard {
    api: ApiClient,
    step: BookingStep,
    date: Option<NaiveDate>,
    availability: Option<Availability>,
    slot: Option<SlotChoice>,
    reservation: Option<Reservation>,
}

impl BookingWizard {
    /// A wizard at `SelectDate`.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self {
            api,
            step: BookingStep::SelectDate,
            date: None,
            availability: None,
            slot: None,
            reservation: None,
        }
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> BookingStep {
        self.step
    }

    /// Availability for the chosen date.
    #[must_use]
    pub const fn availability(&self) -> Option<&Availability> {
        self.availability.as_ref()
    }

    /// Chosen slot.
    #[must_use]
    pub const fn slot(&self) -> Option<&SlotChoice> {
        self.slot.as_ref()
    }

    /// Confirmed reservation.
    #[must_use]
    pub const fn reservation(&self) -> Option<&Reservation> {
        self.reservation.as_ref()
    }

    /// Choose a date and load its availability.
    ///
    /// # Errors
    ///
    /// Returns `DateNotBookable` for today or earlier without a request, or
    /// the request error.
    #[instrument(skip(self), fields(date = %date))]
    pub async fn select_date(
        &mut self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<&Availability, ClientError> {
        if self.step != BookingStep::SelectDate {
            return Err(ClientError::InvalidState("date already selected"));
        }
        if !is_date_selectable(date, today) {
            return Err(ValidationError::DateNotBookable(date).into());
        }

        let availability = self.api.availability(date).await?;
        self.date = Some(date);
        self.step = BookingStep::SelectTime;
        Ok(self.availability.insert(availability))
    }

    /// Choose duration and start hour.
    ///
    /// # Errors
    ///
    /// Returns `SlotUnavailable` if any hour is taken or the slot runs past
    /// closing.
    pub fn select_slot(
        &mut self,
        duration: BookingDuration,
        start_hour: u8,
    ) -> Result<SlotChoice, ClientError> {
        let (BookingStep::SelectTime, Some(date), Some(availability)) =
            (self.step, self.date, self.availability.as_ref())
        else {
            return Err(ClientError::InvalidState("no date selected"));
        };

        if !is_slot_selectable(availability, start_hour, duration) {
            return Err(ValidationError::SlotUnavailable {
                start: start_hour,
                hours: duration.hours(),
            }
            .into());
        }

        let slot = SlotChoice {
            date,
            start_hour,
            duration,
        };
        self.slot = Some(slot);
        self.step = BookingStep::ContactForm;
        Ok(slot)
    }

    /// Step back without losing earlier choices.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` from `SelectDate` or `Confirmed`.
    pub fn back(&mut self) -> Result<BookingStep, ClientError> {
        self.step = match self.step {
            BookingStep::SelectTime => BookingStep::SelectDate,
            BookingStep::ContactForm => BookingStep::SelectTime,
            BookingStep::SelectDate | BookingStep::Confirmed => {
                return Err(ClientError::InvalidState("cannot go back from this step"));
            }
        };
        Ok(self.step)
    }

    /// Validate the contact form and submit the reservation.
    ///
    /// # Errors
    ///
    /// Returns a validation error without a request, or the backend's
    /// rejection (for example a slot taken meanwhile).
    #[instrument(skip(self, contact))]
    pub async fn submit(&mut self, contact: &ContactDetails) -> Result<&Reservation, ClientError> {
        let (BookingStep::ContactForm, Some(slot)) = (self.step, self.slot) else {
            return Err(ClientError::InvalidState("no slot selected"));
        };
        let email = contact.validate()?;

        let request = ReservationRequest {
            date: slot.date,
            start_time: format!("{:02}:00", slot.start_hour),
            duration_hours: slot.duration.hours(),
            price: slot.price().amount,
            customer_name: contact.name.trim().to_string(),
            customer_email: email.into_inner(),
            customer_phone: contact.phone.trim().to_string(),
            notes: contact
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from),
        };

        let reservation = self.api.create_reservation(&request).await?;
        info!(reservation_id = %reservation.id, "Reservation confirmed");
        self.step = BookingStep::Confirmed;
        Ok(self.reservation.insert(reservation))
    }
}
