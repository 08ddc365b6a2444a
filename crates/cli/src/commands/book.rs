//! Studio booking commands.

use chrono::{Local, NaiveDate};
use clap::Subcommand;

use avenue_client::booking::{BookingDuration, BookingWizard, ContactDetails, selectable_starts};

use super::{CliError, Context};

#[derive(Subcommand)]
pub enum BookAction {
    /// Show free hours for a date
    Availability {
        /// Date as YYYY-MM-DD
        date: NaiveDate,
    },
    /// Reserve a slot
    Reserve {
        /// Date as YYYY-MM-DD
        date: NaiveDate,

        /// Start hour (24h)
        #[arg(long)]
        start: u8,

        /// Package length: 2, 4, 6 or 8 hours
        #[arg(long)]
        hours: u8,

        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        phone: String,

        #[arg(long)]
        notes: Option<String>,
    },
}

pub async fn run(ctx: &Context, action: BookAction) -> Result<(), CliError> {
    let today = Local::now().date_naive();
    let mut wizard = BookingWizard::new(ctx.api.clone());

    match action {
        BookAction::Availability { date } => {
            let availability = wizard.select_date(date, today).await?;
            let free = availability.available_hours();
            if free.is_empty() {
                println!("{date}: fully booked");
                return Ok(());
            }
            println!(
                "{date}: free hours {}",
                free.iter()
                    .map(|h| format!("{h:02}:00"))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            for duration in BookingDuration::ALL {
                let starts = selectable_starts(availability, duration);
                println!(
                    "  {}h ({}): {}",
                    duration.hours(),
                    duration.price(),
                    if starts.is_empty() {
                        "-".to_string()
                    } else {
                        starts
                            .iter()
                            .map(|h| format!("{h:02}:00"))
                            .collect::<Vec<_>>()
                            .join(" ")
                    }
                );
            }
        }
        BookAction::Reserve {
            date,
            start,
            hours,
            name,
            email,
            phone,
            notes,
        } => {
            let duration = BookingDuration::try_from(hours)?;
            wizard.select_date(date, today).await?;
            let slot = wizard.select_slot(duration, start)?;
            println!(
                "{date} {:02}:00-{:02}:00, {}",
                slot.start_hour,
                slot.end_hour(),
                slot.price()
            );

            let reservation = wizard
                .submit(&ContactDetails {
                    name,
                    email,
                    phone,
                    notes,
                })
                .await?;
            println!("Reservation {} ({})", reservation.id, reservation.status);
        }
    }
    Ok(())
}
