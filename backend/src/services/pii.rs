//! PII masking for log output
//!
//! Log lines and error text must not contain driver or admin personal data.
//! Names are reduced to their first character before they reach a tracing
//! call; opaque identifiers (LINE user ids, phone numbers) are dropped
//! entirely.

/// Mask a personal name: "山田太郎" → "山***", "" → "***".
pub fn mask_name(name: &str) -> String {
    match name.chars().next() {
        Some(first) => format!("{}***", first),
        None => "***".to_string(),
    }
}

/// Mask an opaque identifier such as a LINE user id.
pub fn mask_id(_id: &str) -> &'static str {
    "***"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_name_keeps_first_char_only() {
        assert_eq!(mask_name("山田太郎"), "山***");
        assert_eq!(mask_name("Sato"), "S***");
        assert_eq!(mask_name("佐"), "佐***");
    }

    #[test]
    fn test_mask_name_empty() {
        assert_eq!(mask_name(""), "***");
    }

    #[test]
    fn test_mask_id() {
        assert_eq!(mask_id("U1234567890abcdef"), "***");
    }
}
