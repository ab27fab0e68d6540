//! Unverified JWT claim access.
//!
//! The password flow only needs to know when its own access token expires;
//! the signature is the server's business.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<f64>,
}

/// Expiry of `token` in epoch milliseconds, if its payload carries a
/// numeric `exp` claim.
///
/// Any structural problem (missing segment, bad base64, non-JSON payload,
/// non-numeric `exp`) yields `None`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn jwt_expiration_ms(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    claim.exp.map(|exp| (exp * 1000.0) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn reads_numeric_exp_claim() {
        assert_eq!(jwt_expiration_ms(&token(r#"{"exp":1700000000}"#)), Some(1_700_000_000_000));
    }

    #[test]
    fn missing_or_malformed_claims_yield_none() {
        assert_eq!(jwt_expiration_ms(&token(r#"{"sub":"did:plc:x"}"#)), None);
        assert_eq!(jwt_expiration_ms(&token(r#"{"exp":"soon"}"#)), None);
        assert_eq!(jwt_expiration_ms(&token("not json")), None);
        assert_eq!(jwt_expiration_ms("opaque-token"), None);
        assert_eq!(jwt_expiration_ms("a.!!!.c"), None);
    }
}
