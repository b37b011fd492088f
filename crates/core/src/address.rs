//! Shipping address form validation.
//!
//! [`AddressForm`] holds the raw strings posted by the checkout form;
//! [`AddressForm::validate`] trims and normalizes them into a
//! [`ShippingAddress`] or returns per-field errors.

use serde::{Deserialize, Serialize};

use crate::validation::{FieldErrors, non_blank, required};

const MAX_NAME: usize = 100;
const MAX_LINE: usize = 200;
const MAX_CITY: usize = 100;
const MAX_REGION: usize = 100;
const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

/// A validated shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Single-line rendering for tables and confirmations.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.full_name.clone(), self.line1.clone()];
        if let Some(line2) = &self.line2 {
            parts.push(line2.clone());
        }
        parts.push(format!("{}, {} {}", self.city, self.region, self.postal_code));
        parts.push(self.country.clone());
        parts.join(", ")
    }

    /// Lines for a multi-line postal label.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.full_name.clone(), self.line1.clone()];
        if let Some(line2) = &self.line2 {
            lines.push(line2.clone());
        }
        lines.push(format!("{}, {} {}", self.city, self.region, self.postal_code));
        lines.push(self.country.clone());
        lines
    }
}

/// Raw checkout form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressForm {
    pub full_name: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

impl AddressForm {
    /// Validate and normalize the form.
    ///
    /// # Errors
    ///
    /// Returns the errors keyed by form field name when any field is invalid.
    pub fn validate(&self) -> Result<ShippingAddress, FieldErrors> {
        let mut errors = FieldErrors::new();

        let full_name = required(&mut errors, "full_name", "Full name", &self.full_name, MAX_NAME);
        let line1 = required(&mut errors, "line1", "Street address", &self.line1, MAX_LINE);
        let line2 = non_blank(&self.line2);
        if line2.as_ref().is_some_and(|line| line.chars().count() > MAX_LINE) {
            errors.add("line2", format!("Apartment or suite must be at most {MAX_LINE} characters"));
        }
        let city = required(&mut errors, "city", "City", &self.city, MAX_CITY);
        let region = required(&mut errors, "region", "State or province", &self.region, MAX_REGION);

        let country = self.country.trim().to_ascii_uppercase();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.add("country", "Country must be a two-letter code such as US");
        }

        let postal_code = match normalize_postal_code(&country, &self.postal_code) {
            Ok(code) => code,
            Err(message) => {
                errors.add("postal_code", message);
                String::new()
            }
        };

        let phone = non_blank(&self.phone);
        if let Some(phone) = &phone {
            if let Err(message) = check_phone(phone) {
                errors.add("phone", message);
            }
        }

        errors.into_result(ShippingAddress {
            full_name,
            line1,
            line2,
            city,
            region: if country == "US" || country == "CA" {
                region.to_ascii_uppercase()
            } else {
                region
            },
            postal_code,
            country,
            phone,
        })
    }
}

impl From<&ShippingAddress> for AddressForm {
    fn from(address: &ShippingAddress) -> Self {
        Self {
            full_name: address.full_name.clone(),
            line1: address.line1.clone(),
            line2: address.line2.clone().unwrap_or_default(),
            city: address.city.clone(),
            region: address.region.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            phone: address.phone.clone().unwrap_or_default(),
        }
    }
}

fn normalize_postal_code(country: &str, input: &str) -> Result<String, &'static str> {
    let code = input.trim().to_ascii_uppercase();
    if code.is_empty() {
        return Err("Postal code is required");
    }
    match country {
        "US" => {
            let bytes = code.as_bytes();
            let five = bytes.len() == 5 && bytes.iter().all(u8::is_ascii_digit);
            let nine = bytes.len() == 10
                && code.chars().enumerate().all(|(i, c)| {
                    if i == 5 { c == '-' } else { c.is_ascii_digit() }
                });
            if five || nine {
                Ok(code)
            } else {
                Err("ZIP code must look like 12345 or 12345-6789")
            }
        }
        "CA" => {
            let compact: Vec<char> = code.chars().filter(|c| !c.is_whitespace()).collect();
            let valid = compact.len() == 6
                && compact.iter().enumerate().all(|(i, c)| {
                    if i % 2 == 0 { c.is_ascii_alphabetic() } else { c.is_ascii_digit() }
                });
            if valid {
                let (head, tail) = compact.split_at(3);
                Ok(format!(
                    "{} {}",
                    head.iter().collect::<String>(),
                    tail.iter().collect::<String>()
                ))
            } else {
                Err("Postal code must look like A1A 1A1")
            }
        }
        _ => {
            let valid = (3..=10).contains(&code.len())
                && code
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-');
            if valid {
                Ok(code)
            } else {
                Err("Postal code is not valid")
            }
        }
    }
}

fn check_phone(phone: &str) -> Result<(), &'static str> {
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')' | '.'))
    {
        return Err("Phone number may only contain digits, spaces and + - ( ) .");
    }
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        Ok(())
    } else {
        Err("Phone number must have between 7 and 15 digits")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> AddressForm {
        AddressForm {
            full_name: " Ada Buyer ".into(),
            line1: "1 Cocoa Way".into(),
            line2: "  ".into(),
            city: "Portland".into(),
            region: "or".into(),
            postal_code: "97201".into(),
            country: "us".into(),
            phone: String::new(),
        }
    }

    #[test]
    fn test_valid_address_is_normalized() {
        let address = form().validate().unwrap();
        assert_eq!(address.full_name, "Ada Buyer");
        assert_eq!(address.line2, None);
        assert_eq!(address.region, "OR");
        assert_eq!(address.country, "US");
        assert_eq!(address.phone, None);
        assert_eq!(address.one_line(), "Ada Buyer, 1 Cocoa Way, Portland, OR 97201, US");
    }

    #[test]
    fn test_missing_required_fields() {
        let errors = AddressForm::default().validate().unwrap_err();
        assert_eq!(errors.get("full_name"), Some("Full name is required"));
        assert_eq!(errors.get("line1"), Some("Street address is required"));
        assert_eq!(errors.get("city"), Some("City is required"));
        assert_eq!(errors.get("region"), Some("State or province is required"));
        assert!(errors.get("country").is_some());
        assert_eq!(errors.get("postal_code"), Some("Postal code is required"));
        assert!(errors.get("line2").is_none());
    }

    #[test]
    fn test_us_zip_formats() {
        let mut f = form();
        f.postal_code = "97201-1234".into();
        assert!(f.validate().is_ok());

        for bad in ["9720", "972011", "97201 1234", "ABCDE"] {
            f.postal_code = bad.into();
            let errors = f.validate().unwrap_err();
            assert_eq!(
                errors.get("postal_code"),
                Some("ZIP code must look like 12345 or 12345-6789"),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_canadian_postal_code_is_spaced() {
        let mut f = form();
        f.country = "CA".into();
        f.region = "bc".into();
        f.postal_code = "v6b1a1".into();
        let address = f.validate().unwrap();
        assert_eq!(address.postal_code, "V6B 1A1");
        assert_eq!(address.region, "BC");

        f.postal_code = "123 456".into();
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_other_countries_accept_generic_codes() {
        let mut f = form();
        f.country = "GB".into();
        f.region = "London".into();
        f.postal_code = "sw1a 1aa".into();
        let address = f.validate().unwrap();
        assert_eq!(address.postal_code, "SW1A 1AA");
        assert_eq!(address.region, "London");
    }

    #[test]
    fn test_phone_validation() {
        let mut f = form();
        f.phone = "+1 (503) 555-0100".into();
        assert_eq!(f.validate().unwrap().phone.as_deref(), Some("+1 (503) 555-0100"));

        f.phone = "555".into();
        assert!(f.validate().unwrap_err().get("phone").is_some());

        f.phone = "call me".into();
        assert!(f.validate().unwrap_err().get("phone").is_some());
    }

    #[test]
    fn test_bad_country() {
        let mut f = form();
        f.country = "USA".into();
        let errors = f.validate().unwrap_err();
        assert_eq!(
            errors.get("country"),
            Some("Country must be a two-letter code such as US")
        );
    }
}
