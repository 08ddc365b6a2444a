//! Studio booking against a mocked reservations backend.

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use avenue_client::booking::{BookingDuration, BookingStep, BookingWizard, ContactDetails};
use avenue_client::{ClientError, ValidationError};
use avenue_integration_tests::TestContext;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 3, 14).unwrap()
}

fn tomorrow() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 3, 15).unwrap()
}

/// Opening hours 9-21 with `taken` hours booked.
fn slots(taken: &[u8]) -> Value {
    let slots: Vec<Value> = (9..22)
        .map(|hour| json!({"hour": hour, "available": !taken.contains(&hour)}))
        .collect();
    json!({"date": "2030-03-15", "slots": slots})
}

fn contact() -> ContactDetails {
    ContactDetails {
        name: " Sofía Restrepo ".to_string(),
        email: "sofia@example.com".to_string(),
        phone: "3109876543".to_string(),
        notes: Some("Sesión de producto".to_string()),
    }
}

async fn mock_availability(ctx: &TestContext, taken: &[u8]) {
    Mock::given(method("GET"))
        .and(path("/api/reservations/availability/2030-03-15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(slots(taken)))
        .expect(1)
        .mount(&ctx.server)
        .await;
}

#[tokio::test]
async fn test_four_hour_booking_from_ten() {
    let ctx = TestContext::logged_in().await;
    mock_availability(&ctx, &[15, 16]).await;

    Mock::given(method("POST"))
        .and(path("/api/reservations"))
        .and(body_partial_json(json!({
            "date": "2030-03-15",
            "start_time": "10:00",
            "duration_hours": 4,
            "price": 450_000.0,
            "customer_name": "Sofía Restrepo"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "res-9",
            "date": "2030-03-15",
            "start_time": "10:00",
            "duration_hours": 4,
            "status": "pending",
            "total_price": 450_000
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let mut wizard = BookingWizard::new(ctx.api.clone());
    wizard.select_date(tomorrow(), today()).await.unwrap();

    let slot = wizard.select_slot(BookingDuration::FourHours, 10).unwrap();
    assert_eq!(slot.end_hour(), 14);
    assert_eq!(slot.price().amount, Decimal::from(450_000));
    assert_eq!(wizard.step(), BookingStep::ContactForm);

    let reservation = wizard.submit(&contact()).await.unwrap();
    assert_eq!(reservation.id.as_str(), "res-9");
    assert_eq!(reservation.total_price, Some(Decimal::from(450_000)));
    assert_eq!(wizard.step(), BookingStep::Confirmed);
}

#[tokio::test]
async fn test_slot_overlapping_booked_hour_is_rejected() {
    let ctx = TestContext::logged_in().await;
    mock_availability(&ctx, &[12]).await;

    Mock::given(method("POST"))
        .and(path("/api/reservations"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let mut wizard = BookingWizard::new(ctx.api.clone());
    wizard.select_date(tomorrow(), today()).await.unwrap();

    let err = wizard.select_slot(BookingDuration::FourHours, 10).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::SlotUnavailable { start: 10, hours: 4 })
    ));
    assert_eq!(wizard.step(), BookingStep::SelectTime);

    // Two hours before the booked one still fits
    wizard.select_slot(BookingDuration::TwoHours, 10).unwrap();
}

#[tokio::test]
async fn test_slot_past_closing_is_rejected() {
    let ctx = TestContext::logged_in().await;
    mock_availability(&ctx, &[]).await;

    let mut wizard = BookingWizard::new(ctx.api.clone());
    wizard.select_date(tomorrow(), today()).await.unwrap();

    assert!(wizard.select_slot(BookingDuration::EightHours, 15).is_err());
    wizard.select_slot(BookingDuration::EightHours, 14).unwrap();
}

#[tokio::test]
async fn test_today_is_not_bookable() {
    let ctx = TestContext::logged_in().await;

    Mock::given(method("GET"))
        .and(path("/api/reservations/availability/2030-03-14"))
        .respond_with(ResponseTemplate::new(200).set_body_json(slots(&[])))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let mut wizard = BookingWizard::new(ctx.api.clone());
    let err = wizard.select_date(today(), today()).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::DateNotBookable(_))
    ));
    assert_eq!(wizard.step(), BookingStep::SelectDate);
}

#[tokio::test]
async fn test_slot_taken_meanwhile_surfaces_backend_message() {
    let ctx = TestContext::logged_in().await;
    mock_availability(&ctx, &[]).await;

    Mock::given(method("POST"))
        .and(path("/api/reservations"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"detail": "Horario no disponible"})),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let mut wizard = BookingWizard::new(ctx.api.clone());
    wizard.select_date(tomorrow(), today()).await.unwrap();
    wizard.select_slot(BookingDuration::TwoHours, 18).unwrap();

    let err = wizard.submit(&contact()).await.unwrap_err();
    assert_eq!(err.backend_message(), Some("Horario no disponible"));
    assert_eq!(wizard.step(), BookingStep::ContactForm);
}
