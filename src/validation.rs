use crate::errors::GameError;
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_NAME_CHARS: usize = 80;

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9]\d{7,14}$").expect("phone pattern"));

/// Strips the usual separators and checks for an international number
/// (`+` followed by 8 to 15 digits).
pub fn normalize_phone(raw: &str) -> Result<String, GameError> {
    let phone: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    if phone.is_empty() {
        return Err(GameError::validation("phone number is required"));
    }
    if !PHONE.is_match(&phone) {
        return Err(GameError::validation(
            "phone number must look like +972501234567",
        ));
    }
    Ok(phone)
}

pub fn normalize_name(raw: &str) -> Result<String, GameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(GameError::validation("name is required"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(GameError::validation(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

/// `+972 (50) 123-4567` for Israeli numbers, anything else unchanged.
pub fn format_phone(phone: &str) -> String {
    if phone.len() != 13 || !phone.starts_with("+972") || !phone.is_ascii() {
        return phone.to_string();
    }
    format!(
        "{} ({}) {}-{}",
        &phone[..4],
        &phone[4..6],
        &phone[6..9],
        &phone[9..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_separators_are_stripped() {
        assert_eq!(normalize_phone("+972 (50) 123-4567").unwrap(), "+972501234567");
        assert_eq!(normalize_phone("+1 415.555.0100").unwrap(), "+14155550100");
    }

    #[test]
    fn malformed_phones_are_rejected() {
        for raw in ["", "   ", "0501234567", "+0501234567", "+97250abc4567", "+1234", "+1234567890123456"] {
            assert!(
                matches!(normalize_phone(raw), Err(GameError::Validation(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(normalize_name("  Dana  ").unwrap(), "Dana");
        assert!(normalize_name("   ").is_err());
        assert!(normalize_name(&"x".repeat(81)).is_err());
    }

    #[test]
    fn israeli_numbers_are_grouped() {
        assert_eq!(format_phone("+972501234567"), "+972 (50) 123-4567");
        assert_eq!(format_phone("+14155550100"), "+14155550100");
    }
}
