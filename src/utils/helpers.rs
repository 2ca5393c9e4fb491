//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

/// Normalize a phone number to the `+7XXXXXXXXXX` form.
///
/// Strips spaces, dashes and parentheses; an `8`-prefixed eleven-digit
/// number becomes `+7…`. Inputs that do not look like a phone are returned
/// with only the junk characters removed.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    let bare: String = digits.chars().filter(|c| c.is_ascii_digit()).collect();

    if bare.len() == 11 && (bare.starts_with('8') || bare.starts_with('7')) {
        format!("+7{}", &bare[1..])
    } else if bare.len() == 10 {
        format!("+7{}", bare)
    } else if digits.starts_with('+') {
        digits
    } else if bare.is_empty() {
        String::new()
    } else {
        format!("+{}", bare)
    }
}

/// Extract the referrer telegram id from a raw referral command string.
///
/// The front-end forwards `/start <payload>` verbatim; only a digit-only
/// payload identifies a referrer.
pub fn parse_referral_payload(raw: &str) -> Option<String> {
    let payload = raw.trim().rsplit(' ').next().unwrap_or("").trim();
    if !payload.is_empty() && payload.chars().all(|c| c.is_ascii_digit()) {
        Some(payload.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+7 (900) 123-45-67"), "+79001234567");
        assert_eq!(normalize_phone("89001234567"), "+79001234567");
        assert_eq!(normalize_phone("79001234567"), "+79001234567");
        assert_eq!(normalize_phone("9001234567"), "+79001234567");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn test_parse_referral_payload() {
        assert_eq!(parse_referral_payload("/start 123456"), Some("123456".to_string()));
        assert_eq!(parse_referral_payload("123456"), Some("123456".to_string()));
        assert_eq!(parse_referral_payload("/start promo_code"), None);
        assert_eq!(parse_referral_payload(""), None);
    }
}
