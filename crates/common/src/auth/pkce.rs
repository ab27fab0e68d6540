//! PKCE (RFC 7636) verifier/challenge pairs and the anti-CSRF state.
//!
//! The client is public, so the verifier is the only thing tying the code
//! exchange to the party that started the authorization.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Challenge method advertised in the authorization request.
pub const CHALLENGE_METHOD: &str = "S256";

/// 32 random bytes, base64url without padding (43 characters).
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[must_use]
pub fn generate_code_verifier() -> String {
    random_token()
}

/// `BASE64URL(SHA256(verifier))`.
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[must_use]
pub fn generate_state() -> String {
    random_token()
}

/// Compare the stored and returned state without short-circuiting on the
/// first differing byte.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    let (expected, actual) = (expected.as_bytes(), actual.as_bytes());
    expected.len() == actual.len()
        && expected.iter().zip(actual).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// Verifier, challenge and state for one authorization attempt.
///
/// The verifier and state are stored with the pending attempt; only the
/// challenge and state leave the client before the callback.
#[derive(Debug, Clone)]
pub struct PKCEChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
    pub state: String,
}

impl PKCEChallenge {
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        Self {
            code_challenge: generate_code_challenge(&code_verifier),
            code_verifier,
            state: generate_state(),
        }
    }

    #[must_use]
    pub fn challenge_method(&self) -> &str {
        CHALLENGE_METHOD
    }
}
