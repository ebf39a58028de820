// Random fixture data: alphanumeric strings, letters, digits and checksummed identifiers
// Every generator takes the random source as an argument so a seeded StdRng reproduces its output

use rand::Rng;
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &[u8] = b"1234567890";

// Lengths the checksummed identifier supports, with the range of its leading digit
const SHORT_ID_LEN: usize = 7;
const LONG_ID_LEN: usize = 8;
const SHORT_ID_LEADING: RangeInclusive<u32> = 1..=4;
const LONG_ID_LEADING: RangeInclusive<u32> = 4..=6;

// Draws `length` independent uniform samples from `alphabet`
fn sample<R: Rng + ?Sized>(rng: &mut R, alphabet: &[u8], length: usize) -> String {
    (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

pub fn random_alphanumeric<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    sample(rng, ALPHANUMERIC, length)
}

pub fn random_letters<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    sample(rng, LETTERS, length)
}

pub fn random_digits<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    sample(rng, DIGITS, length)
}

/// Value of an identifier's trailing check character.
///
/// The modulo-11 scheme yields 0..=10; ten has no single-digit rendering and is written as `K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckDigit {
    Digit(u8),
    Ten,
}

impl CheckDigit {
    pub fn as_char(self) -> char {
        match self {
            CheckDigit::Digit(d) => char::from(b'0' + d),
            CheckDigit::Ten => 'K',
        }
    }
}

/// Computes the check value of a body of decimal digits.
///
/// Digits are weighted right to left with the cycle 2, 3, 4, 5, 6, 7, 2, ...;
/// the check value is `11 - (sum mod 11)`, or 0 when the sum is a multiple of 11.
pub fn checksum_digit(body: &str) -> Result<CheckDigit, GeneratorError> {
    if body.is_empty() {
        return Err(GeneratorError::InvalidArgument(
            "checksum body must not be empty".to_string(),
        ));
    }

    let mut sum = 0u32;
    let mut factor = 2u32;
    for c in body.chars().rev() {
        let digit = c.to_digit(10).ok_or_else(|| {
            GeneratorError::InvalidArgument(format!("non-digit character {c:?} in checksum body"))
        })?;
        sum += digit * factor;
        factor = if factor == 7 { 2 } else { factor + 1 };
    }

    Ok(match sum % 11 {
        0 => CheckDigit::Digit(0),
        1 => CheckDigit::Ten,
        remainder => CheckDigit::Digit((11 - remainder) as u8),
    })
}

/// Generates a national-ID-style identifier of length 7 or 8 whose last character is its check digit.
///
/// Length-8 identifiers render a check value of ten as `K`. Length-7 identifiers stay all-digit:
/// a body whose check value is ten is discarded and drawn again.
pub fn random_checksummed_id<R: Rng + ?Sized>(
    rng: &mut R,
    length: usize,
) -> Result<String, GeneratorError> {
    let leading = match length {
        SHORT_ID_LEN => SHORT_ID_LEADING,
        LONG_ID_LEN => LONG_ID_LEADING,
        other => {
            return Err(GeneratorError::InvalidArgument(format!(
                "identifier length must be {SHORT_ID_LEN} or {LONG_ID_LEN}, got {other}"
            )))
        }
    };

    loop {
        let mut id = String::with_capacity(length);
        id.push(digit_char(rng.gen_range(leading.clone())));
        for i in 0..length - 2 {
            // The first generated digit is never 0
            let digit = if i == 0 {
                rng.gen_range(1..=9)
            } else {
                rng.gen_range(0..=9)
            };
            id.push(digit_char(digit));
        }

        match checksum_digit(&id)? {
            CheckDigit::Ten if length == SHORT_ID_LEN => {
                trace!(body = %id, "check value ten has no digit form, redrawing body");
            }
            check => {
                id.push(check.as_char());
                return Ok(id);
            }
        }
    }
}

/// Returns true when `id` has the shape `random_checksummed_id` produces and its last
/// character matches its body.
///
/// That means a leading digit in range for its length, and no `K` on a 7-character id.
pub fn verify_checksummed_id(id: &str) -> bool {
    if !id.is_ascii() {
        return false;
    }
    let leading = match id.len() {
        SHORT_ID_LEN => SHORT_ID_LEADING,
        LONG_ID_LEN => LONG_ID_LEADING,
        _ => return false,
    };
    let (body, check) = id.split_at(id.len() - 1);
    let lead = body.chars().next().and_then(|c| c.to_digit(10));
    if !lead.map_or(false, |d| leading.contains(&d)) {
        return false;
    }
    match checksum_digit(body) {
        Ok(CheckDigit::Ten) if id.len() == SHORT_ID_LEN => false,
        Ok(expected) => check.starts_with(expected.as_char()),
        Err(_) => false,
    }
}

fn digit_char(digit: u32) -> char {
    char::from_digit(digit, 10).unwrap_or('0')
}
