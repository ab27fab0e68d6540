//! Proof-of-possession and PKCE primitives for the OAuth flow
//!
//! These are the pure building blocks of the authorization round trip; the
//! HTTP side lives in `panelpost-infra`.
//!
//! ```text
//! prepare ──► PKCEChallenge  (verifier, challenge, state)
//!         └─► DpopKeyPair    (ES256 signing key, public JWK)
//!
//! request ──► DpopKeyPair::create_proof  (fresh jti + iat every call)
//! ```
//!
//! # Module Organization
//!
//! - **[`pkce`]**: verifier, challenge and state generation
//! - **[`dpop`]**: P-256 key pair, JWK import/export, signed proofs
//! - **[`jwt`]**: unverified claim decoding used for expiry checks

pub mod dpop;
pub mod jwt;
pub mod pkce;

pub use dpop::{
    hash_access_token, DpopError, DpopKeyPair, PrivateJwk, ProofOptions, PublicJwk,
    SerializedKeyPair,
};
pub use jwt::jwt_expiration_ms;
pub use pkce::{
    generate_code_challenge, generate_code_verifier, generate_state, validate_state,
    PKCEChallenge,
};
