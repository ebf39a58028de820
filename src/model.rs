// Wire types for the booking service
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Session token issued by POST /auth, presented back as the `token` cookie
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn cookie(&self) -> String {
        format!("token={}", self.0)
    }
}

// Keep tokens out of logs
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

// Body of a POST /auth reply: a token on success, a reason when the credentials are refused
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub u64);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDates {
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
}

impl BookingDates {
    pub fn new(checkin: NaiveDate, checkout: NaiveDate) -> Self {
        Self { checkin, checkout }
    }

    // The service accepts reversed dates; callers that care can check
    pub fn is_ordered(&self) -> bool {
        self.checkin <= self.checkout
    }

    pub fn nights(&self) -> i64 {
        (self.checkout - self.checkin).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub firstname: String,
    pub lastname: String,
    pub totalprice: u32,
    pub depositpaid: bool,
    pub bookingdates: BookingDates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additionalneeds: Option<String>,
}

// Reply to POST /booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub bookingid: BookingId,
    pub booking: Booking,
}

// One element of the GET /booking array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingIdRecord {
    pub bookingid: BookingId,
}

// Optional query filters accepted by GET /booking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub checkin: Option<NaiveDate>,
    pub checkout: Option<NaiveDate>,
}

impl BookingFilter {
    pub fn by_name(firstname: impl Into<String>, lastname: impl Into<String>) -> Self {
        Self {
            firstname: Some(firstname.into()),
            lastname: Some(lastname.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(firstname) = &self.firstname {
            pairs.push(("firstname", firstname.clone()));
        }
        if let Some(lastname) = &self.lastname {
            pairs.push(("lastname", lastname.clone()));
        }
        if let Some(checkin) = self.checkin {
            pairs.push(("checkin", checkin.format("%Y-%m-%d").to_string()));
        }
        if let Some(checkout) = self.checkout {
            pairs.push(("checkout", checkout.format("%Y-%m-%d").to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_booking_wire_format() {
        let booking = Booking {
            firstname: "Jim".to_string(),
            lastname: "Brown".to_string(),
            totalprice: 111,
            depositpaid: true,
            bookingdates: BookingDates::new(date("2018-01-01"), date("2019-01-01")),
            additionalneeds: Some("Breakfast".to_string()),
        };

        let value = serde_json::to_value(&booking).unwrap();
        assert_eq!(
            value,
            json!({
                "firstname": "Jim",
                "lastname": "Brown",
                "totalprice": 111,
                "depositpaid": true,
                "bookingdates": {"checkin": "2018-01-01", "checkout": "2019-01-01"},
                "additionalneeds": "Breakfast"
            })
        );
    }

    #[test]
    fn test_booking_without_additional_needs() {
        let value = json!({
            "firstname": "Sally",
            "lastname": "Jones",
            "totalprice": 0,
            "depositpaid": false,
            "bookingdates": {"checkin": "2020-05-01", "checkout": "2020-04-01"}
        });

        let booking: Booking = serde_json::from_value(value).unwrap();
        assert_eq!(booking.additionalneeds, None);
        assert!(!booking.bookingdates.is_ordered());
        assert_eq!(booking.bookingdates.nights(), -30);
    }

    #[test]
    fn test_booking_record_and_id_list() {
        let record: BookingRecord = serde_json::from_value(json!({
            "bookingid": 42,
            "booking": {
                "firstname": "Jim",
                "lastname": "Brown",
                "totalprice": 10,
                "depositpaid": true,
                "bookingdates": {"checkin": "2018-01-01", "checkout": "2018-01-02"}
            }
        }))
        .unwrap();
        assert_eq!(record.bookingid, BookingId(42));
        assert_eq!(record.booking.bookingdates.nights(), 1);

        let ids: Vec<BookingIdRecord> =
            serde_json::from_value(json!([{"bookingid": 1}, {"bookingid": 7}])).unwrap();
        assert_eq!(ids[1].bookingid.to_string(), "7");
    }

    #[test]
    fn test_auth_token_cookie_and_redacted_debug() {
        let token = AuthToken::new("abc123");
        assert_eq!(token.cookie(), "token=abc123");
        assert_eq!(format!("{token:?}"), "AuthToken(***)");
    }

    #[test]
    fn test_filter_query_pairs() {
        assert!(BookingFilter::default().is_empty());
        assert!(BookingFilter::default().query_pairs().is_empty());

        let mut filter = BookingFilter::by_name("Angie", "Brown");
        filter.checkin = Some(date("2018-01-01"));
        assert_eq!(
            filter.query_pairs(),
            vec![
                ("firstname", "Angie".to_string()),
                ("lastname", "Brown".to_string()),
                ("checkin", "2018-01-01".to_string()),
            ]
        );
    }
}
