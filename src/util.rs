//! Shared utility functions for the Block Builder license server.

use rand::Rng;

use crate::models::LicenseType;

/// Alphabet for the random segments of generated license keys.
const KEY_SEGMENT_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const KEY_SEGMENT_LEN: usize = 4;

/// Generate a license key of the form `<PREFIX>-<TYPE>-XXXX-XXXX-XXXX`,
/// where each `XXXX` is a random upper-alphanumeric segment.
pub fn generate_license_key(prefix: &str, license_type: LicenseType) -> String {
    let mut rng = rand::thread_rng();
    let mut segment = || -> String {
        (0..KEY_SEGMENT_LEN)
            .map(|_| KEY_SEGMENT_CHARS[rng.gen_range(0..KEY_SEGMENT_CHARS.len())] as char)
            .collect()
    };

    format!(
        "{}-{}-{}-{}-{}",
        prefix,
        license_type.as_ref(),
        segment(),
        segment(),
        segment()
    )
}

/// Lightweight email syntax check: a single `@` with a non-empty local part
/// and a dotted host, no whitespace. Deliberately not full RFC validation.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(host), None) => {
            !local.is_empty()
                && host.contains('.')
                && !host.starts_with('.')
                && !host.ends_with('.')
        }
        _ => false,
    }
}
