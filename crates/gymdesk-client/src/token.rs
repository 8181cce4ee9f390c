//! Access-token inspection.
//!
//! The backend issues JWT access tokens. The client never verifies the
//! signature (that is the server's job); it only decodes the payload segment
//! to read the expiry claim, so "is my token still usable" can be answered
//! without a round trip. Anything that fails to decode is treated as not
//! authenticated rather than an error.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use gymdesk_common::TokenClaims;

/// Decode the claims from a JWT's payload segment.
///
/// Returns `None` for anything that is not a three-segment token with a
/// base64url JSON payload carrying the expected claims.
#[must_use]
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    // Some issuers pad their base64; the strict no-pad engine would reject it.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Check whether a token's `exp` claim is still in the future.
///
/// Malformed tokens are never live.
#[must_use]
pub fn is_live(token: &str) -> bool {
    decode_claims(token).is_some_and(|claims| claims.exp > Utc::now().timestamp())
}

/// Build an unsigned token with the given claims, for tests only.
#[cfg(test)]
pub(crate) fn forge_token(email: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::json!({ "email": email, "exp": exp }).to_string());
    format!("{header}.{payload}.forged-signature")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_decodes_claims_from_payload_segment() {
        let token = forge_token("a@b.com", 4_102_444_800);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.exp, 4_102_444_800);
    }

    #[test]
    fn test_live_for_future_expiry() {
        let token = forge_token("a@b.com", Utc::now().timestamp() + 3600);
        assert!(is_live(&token));
    }

    #[test]
    fn test_not_live_for_past_expiry() {
        let token = forge_token("a@b.com", Utc::now().timestamp() - 1);
        assert!(!is_live(&token));
    }

    #[test]
    fn test_not_live_for_garbage() {
        assert!(!is_live("not-a-jwt"));
        assert!(!is_live("a.b.c"));
        assert!(!is_live(""));
        // Valid base64, but the payload is not a claims object.
        let bogus = format!("x.{}.y", URL_SAFE_NO_PAD.encode(b"[1,2,3]"));
        assert!(!is_live(&bogus));
    }

    #[test]
    fn test_tolerates_padded_base64() {
        let token = forge_token("a@b.com", Utc::now().timestamp() + 3600);
        let mut parts = token.splitn(3, '.');
        let header = parts.next().unwrap();
        let payload = parts.next().unwrap();
        let padded = format!("{header}.{payload}==.sig");
        assert!(is_live(&padded));
    }
}
