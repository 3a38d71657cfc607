// ── Identity inputs ──
//
// Iranian mobile numbers and national IDs as typed by users: Persian or
// Arabic-Indic digits, spaces and dashes are accepted and normalized to
// bare ASCII digits before validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Map Persian (U+06F0..) and Arabic-Indic (U+0660..) digits to ASCII and
/// drop whitespace and dashes.
pub fn normalize_digits(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' => ascii_digit(c, '\u{06F0}'),
            '\u{0660}'..='\u{0669}' => ascii_digit(c, '\u{0660}'),
            other => other,
        })
        .collect()
}

fn ascii_digit(c: char, zero: char) -> char {
    let offset = u32::from(c) - u32::from(zero);
    char::from_digit(offset, 10).unwrap_or(c)
}

// ── PhoneNumber ─────────────────────────────────────────────────────

/// Mobile number in the `09xxxxxxxxx` form the backend expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0912 345 6789`
    pub fn formatted(&self) -> String {
        format!("{} {} {}", &self.0[..4], &self.0[4..7], &self.0[7..])
    }
}

impl FromStr for PhoneNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = normalize_digits(s);
        let valid = digits.len() == 11
            && digits.starts_with("09")
            && digits.bytes().all(|b| b.is_ascii_digit());
        if valid {
            Ok(Self(digits))
        } else {
            Err(Error::InvalidInput {
                field: "phone number",
                reason: format!("'{s}' is not an 11-digit mobile number starting with 09"),
            })
        }
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── NationalId ──────────────────────────────────────────────────────

/// Ten-digit national ID (کد ملی) with a valid check digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NationalId(String);

impl NationalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `123-456789-0`
    pub fn formatted(&self) -> String {
        format!("{}-{}-{}", &self.0[..3], &self.0[3..9], &self.0[9..])
    }
}

/// Weighted sum of the first nine digits mod 11; the last digit must be
/// the remainder when it is below 2, else 11 minus it.
fn has_valid_check_digit(digits: &[u32]) -> bool {
    let Some((&check, body)) = digits.split_last() else {
        return false;
    };
    let sum: u32 = body.iter().zip((2..=10).rev()).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 {
        check == remainder
    } else {
        check == 11 - remainder
    }
}

impl FromStr for NationalId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::InvalidInput {
            field: "national ID",
            reason: reason.to_owned(),
        };

        let normalized = normalize_digits(s);
        let digits: Vec<u32> = normalized.chars().filter_map(|c| c.to_digit(10)).collect();
        if digits.len() != 10 || normalized.len() != 10 {
            return Err(invalid("must be exactly 10 digits"));
        }
        if digits.iter().all(|d| *d == digits[0]) {
            return Err(invalid("cannot be a single repeated digit"));
        }
        if !has_valid_check_digit(&digits) {
            return Err(invalid("check digit does not match"));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for NationalId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NationalId> for String {
    fn from(id: NationalId) -> Self {
        id.0
    }
}

impl fmt::Display for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn persian_digits_and_separators_normalize() {
        assert_eq!(normalize_digits(" ۰۹۱۲-۳۴۵ ۶۷۸۹ "), "09123456789");
        assert_eq!(normalize_digits("٠٩١٢"), "0912");
    }

    #[test]
    fn phone_numbers() {
        let phone: PhoneNumber = "۰۹۱۲ ۳۴۵ ۶۷۸۹".parse().unwrap();
        assert_eq!(phone.as_str(), "09123456789");
        assert_eq!(phone.formatted(), "0912 345 6789");

        assert!("9123456789".parse::<PhoneNumber>().is_err());
        assert!("0812345678".parse::<PhoneNumber>().is_err());
        assert!("0912345678x".parse::<PhoneNumber>().is_err());
    }

    #[test]
    fn national_id_checksum() {
        let id: NationalId = "0499370899".parse().unwrap();
        assert_eq!(id.formatted(), "049-937089-9");
        assert!("0013542419".parse::<NationalId>().is_ok());

        assert!("0499370898".parse::<NationalId>().is_err());
        assert!("1111111111".parse::<NationalId>().is_err());
        assert!("049937089".parse::<NationalId>().is_err());
    }

    #[test]
    fn serde_validates() {
        let phone: PhoneNumber = serde_json::from_str("\"09123456789\"").unwrap();
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"09123456789\"");
        assert!(serde_json::from_str::<NationalId>("\"1234\"").is_err());
    }
}
