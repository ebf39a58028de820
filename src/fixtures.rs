// Booking payloads used by the flow: the two canonical bookings and randomly seeded ones

use crate::generators::{self, GeneratorError};
use crate::model::{Booking, BookingDates, Credentials};
use chrono::{Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "password123";

const ADDITIONAL_NEEDS: &[&str] = &["Breakfast", "Late checkout", "Airport transfer", "Parking"];

pub fn default_credentials() -> Credentials {
    Credentials::new(DEFAULT_USERNAME, DEFAULT_PASSWORD)
}

fn stay() -> BookingDates {
    BookingDates::new(
        NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
        NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default(),
    )
}

// Payload submitted by the create step
pub fn created_booking() -> Booking {
    Booking {
        firstname: "Angie Dayanna".to_string(),
        lastname: "Rodriguez Mora".to_string(),
        totalprice: 111,
        depositpaid: true,
        bookingdates: stay(),
        additionalneeds: Some("Breakfast".to_string()),
    }
}

// Full replacement submitted by the update step
pub fn updated_booking() -> Booking {
    Booking {
        firstname: "Angie".to_string(),
        lastname: "Brown".to_string(),
        ..created_booking()
    }
}

fn capitalized_name<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    let letters = generators::random_letters(rng, length);
    let mut chars = letters.chars();
    match chars.next() {
        Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Builds a booking with random guest names, price, deposit flag and a 1..=30 night stay.
///
/// The guest's national identifier goes into `additionalneeds` so a booking can be traced back
/// to the fixture that created it.
pub fn random_booking<R: Rng + ?Sized>(rng: &mut R) -> Result<Booking, GeneratorError> {
    let first_len = rng.gen_range(3..=8);
    let last_len = rng.gen_range(4..=10);
    let guest_id = generators::random_checksummed_id(rng, 8)?;

    let base = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default();
    let checkin = base + Duration::days(rng.gen_range(0..3000));
    let checkout = checkin + Duration::days(rng.gen_range(1..=30));
    let need = ADDITIONAL_NEEDS.choose(rng).copied().unwrap_or("Breakfast");

    Ok(Booking {
        firstname: capitalized_name(rng, first_len),
        lastname: capitalized_name(rng, last_len),
        totalprice: rng.gen_range(50..=2000),
        depositpaid: rng.gen_bool(0.5),
        bookingdates: BookingDates::new(checkin, checkout),
        additionalneeds: Some(format!("{need}; guest {guest_id}")),
    })
}
