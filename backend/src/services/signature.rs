//! Webhook and scheduler authenticity checks
//!
//! LINE signs each webhook delivery with HMAC-SHA256 over the raw body,
//! base64-encoded in the `X-Line-Signature` header. Scheduled-job triggers
//! authenticate with a bearer shared secret. Both comparisons are
//! constant-time so response latency does not reveal how much of a forged
//! value matched.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify a LINE webhook signature against the raw request body.
pub fn verify_line_signature(body: &[u8], signature_b64: &str, channel_secret: &str) -> bool {
    let mut mac = match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    let provided = match BASE64.decode(signature_b64) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    constant_time_eq(&expected, &provided)
}

/// Verify the `Authorization` header of a scheduled-job trigger.
pub fn verify_scheduler_token(auth_header: Option<&str>, cron_secret: &str) -> bool {
    let Some(header) = auth_header else {
        return false;
    };
    let expected = format!("Bearer {}", cron_secret);
    constant_time_eq(header.as_bytes(), expected.as_bytes())
}

/// Constant-time byte comparison.
///
/// Length mismatch short-circuits to false; equal-length inputs are always
/// scanned in full with an XOR accumulator so the time taken does not depend
/// on the position of the first differing byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"events":[]}"#;
        let signature = sign(body, "channel-secret");
        assert!(verify_line_signature(body, &signature, "channel-secret"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = br#"{"events":[]}"#;
        let signature = sign(body, "channel-secret");
        assert!(!verify_line_signature(body, &signature, "other-secret"));
    }

    #[test]
    fn test_body_mutation_rejected() {
        let body = br#"{"events":[{"type":"message"}]}"#.to_vec();
        let signature = sign(&body, "channel-secret");

        for i in 0..body.len() {
            let mut mutated = body.clone();
            mutated[i] ^= 0x01;
            assert!(
                !verify_line_signature(&mutated, &signature, "channel-secret"),
                "flipping byte {} must invalidate the signature",
                i
            );
        }
    }

    #[test]
    fn test_signature_mutation_rejected() {
        let body = br#"{"events":[]}"#;
        let signature = sign(body, "channel-secret");
        let decoded = BASE64.decode(&signature).unwrap();

        for i in 0..decoded.len() {
            let mut mutated = decoded.clone();
            mutated[i] ^= 0x01;
            let reencoded = BASE64.encode(&mutated);
            assert!(!verify_line_signature(body, &reencoded, "channel-secret"));
        }
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(!verify_line_signature(b"body", "not base64!!", "secret"));
        assert!(!verify_line_signature(b"body", "", "secret"));
    }

    #[test]
    fn test_constant_time_eq_scans_full_buffer() {
        // Same code path for an early and a late mismatch: both run the
        // XOR accumulator over every byte and only differ in the result.
        let reference = [0u8; 32];
        let mut early = reference;
        early[0] = 1;
        let mut late = reference;
        late[31] = 1;

        assert!(!constant_time_eq(&reference, &early));
        assert!(!constant_time_eq(&reference, &late));
        assert!(constant_time_eq(&reference, &reference));
    }

    #[test]
    fn test_constant_time_eq_length_mismatch() {
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(!constant_time_eq(b"", b"a"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_scheduler_token() {
        assert!(verify_scheduler_token(Some("Bearer cron-secret"), "cron-secret"));
        assert!(!verify_scheduler_token(Some("Bearer wrong"), "cron-secret"));
        assert!(!verify_scheduler_token(Some("cron-secret"), "cron-secret"));
        assert!(!verify_scheduler_token(None, "cron-secret"));
    }
}
