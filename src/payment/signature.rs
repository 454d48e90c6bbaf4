// Gateway callback integrity check: HMAC-SHA256 over
// `"{order_id}|{payment_id}"` with the server-held key secret,
// compared in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex signature the gateway is expected to supply for a captured
/// payment.
pub fn compute_signature(order_id: &str, payment_id: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time verification of a supplied hex signature.
pub fn verify_signature(order_id: &str, payment_id: &str, supplied: &str, secret: &str) -> bool {
    let supplied_bytes = match hex::decode(supplied) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac.verify_slice(&supplied_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_signature_verifies() {
        let signature = compute_signature("order_123", "pay_456", "topsecret");
        assert!(verify_signature("order_123", "pay_456", &signature, "topsecret"));
    }

    #[test]
    fn any_mismatch_fails() {
        let signature = compute_signature("order_123", "pay_456", "topsecret");

        assert!(!verify_signature("order_124", "pay_456", &signature, "topsecret"));
        assert!(!verify_signature("order_123", "pay_457", &signature, "topsecret"));
        assert!(!verify_signature("order_123", "pay_456", &signature, "othersecret"));
    }

    #[test]
    fn malformed_hex_fails_closed() {
        assert!(!verify_signature("order_123", "pay_456", "not-hex!", "topsecret"));
        assert!(!verify_signature("order_123", "pay_456", "", "topsecret"));
        // Truncated but valid hex
        let signature = compute_signature("order_123", "pay_456", "topsecret");
        assert!(!verify_signature("order_123", "pay_456", &signature[..32], "topsecret"));
    }

    #[test]
    fn separator_is_part_of_the_mac() {
        // "a|bc" and "ab|c" must not collide
        let one = compute_signature("a", "bc", "k");
        let two = compute_signature("ab", "c", "k");
        assert_ne!(one, two);
    }
}
