//! PKCE (Proof Key for Code Exchange) per RFC 7636.
//!
//! S256 challenge computation and verification, shared by the authorization
//! server (verify side) and the OAuth client (generate side).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Compute the S256 code challenge for a verifier: `BASE64URL(SHA256(verifier))`.
#[must_use]
pub fn challenge_s256(code_verifier: &str) -> String {
    let hash = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Verify a PKCE S256 code challenge against a verifier.
#[must_use]
pub fn verify_s256(code_verifier: &str, code_challenge: &str) -> bool {
    challenge_s256(code_verifier) == code_challenge
}

/// Generate a random code verifier (43-128 unreserved characters per RFC 7636 §4.1).
///
/// Two simple UUIDs give 64 hex characters of entropy.
#[must_use]
pub fn generate_verifier() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s256_valid() {
        // RFC 7636 Appendix B test vector
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let challenge = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";
        assert!(verify_s256(verifier, challenge));
    }

    #[test]
    fn test_s256_invalid_verifier() {
        let challenge = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";
        assert!(!verify_s256("wrong-verifier", challenge));
    }

    #[test]
    fn test_s256_invalid_challenge() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert!(!verify_s256(verifier, "wrong-challenge"));
    }

    #[test]
    fn test_generated_verifier_roundtrip() {
        let verifier = generate_verifier();
        assert!(verifier.len() >= 43 && verifier.len() <= 128);
        let challenge = challenge_s256(&verifier);
        assert!(verify_s256(&verifier, &challenge));
    }
}
