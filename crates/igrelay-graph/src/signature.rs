// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification for Meta's `X-Hub-Signature-256` header.
//!
//! The HMAC must be computed over the exact raw request body -- any
//! reserialized form changes the bytes and the hash no longer matches.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Verify a webhook body against its `X-Hub-Signature-256` header.
///
/// Returns false on a missing `sha256=` prefix, non-hex payload, or
/// mismatch -- malformed input is simply "not verified", never an error.
/// The comparison is constant time via `Mac::verify_slice`.
pub fn verify_signature(app_secret: &[u8], body: &[u8], signature_header: &str) -> bool {
    let Some(hex_sig) = signature_header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(app_secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the `sha256=<hex>` header value for a body.
pub fn sign(app_secret: &[u8], body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret)
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"app-secret";
    const BODY: &[u8] = br#"{"object":"instagram","entry":[]}"#;

    #[test]
    fn valid_signature_verifies() {
        let header = sign(SECRET, BODY);
        assert!(verify_signature(SECRET, BODY, &header));
    }

    #[test]
    fn any_single_byte_mutation_fails() {
        let header = sign(SECRET, BODY);
        for i in 0..BODY.len() {
            let mut mutated = BODY.to_vec();
            mutated[i] ^= 0x01;
            assert!(
                !verify_signature(SECRET, &mutated, &header),
                "mutation at byte {i} must invalidate the signature"
            );
        }
    }

    #[test]
    fn wrong_secret_fails() {
        let header = sign(SECRET, BODY);
        assert!(!verify_signature(b"other-secret", BODY, &header));
    }

    #[test]
    fn missing_prefix_fails() {
        let header = sign(SECRET, BODY);
        let bare = header.strip_prefix("sha256=").unwrap();
        assert!(!verify_signature(SECRET, BODY, bare));
    }

    #[test]
    fn wrong_prefix_fails() {
        assert!(!verify_signature(SECRET, BODY, "sha1=abcdef"));
    }

    #[test]
    fn non_hex_payload_fails_without_panicking() {
        assert!(!verify_signature(SECRET, BODY, "sha256=not-hex-at-all"));
    }

    #[test]
    fn empty_header_fails() {
        assert!(!verify_signature(SECRET, BODY, ""));
    }

    #[test]
    fn truncated_digest_fails() {
        let header = sign(SECRET, BODY);
        assert!(!verify_signature(SECRET, BODY, &header[..header.len() - 2]));
    }
}
