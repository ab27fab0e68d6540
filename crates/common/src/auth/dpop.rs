//! DPoP (RFC 9449) key pairs and proofs.
//!
//! Every authenticated request carries a freshly signed proof: a compact
//! ES256 JWT whose header embeds the public JWK and whose payload binds the
//! HTTP method, the target URI and (optionally) the access token. Proofs
//! are never cached; each call mints a new `jti` and `iat`.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

const KEY_TYPE: &str = "EC";
const CURVE: &str = "P-256";

/// Errors raised by key import and proof construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DpopError {
    /// The serialized key pair is malformed or inconsistent.
    #[error("Failed to import DPoP key: {0}")]
    KeyImport(String),

    /// A proof could not be encoded.
    #[error("Failed to encode DPoP proof: {0}")]
    Encoding(String),
}

/// Public half as a JSON Web Key. Never carries `d`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
}

/// Private half as a JSON Web Key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
    pub d: String,
}

impl fmt::Debug for PrivateJwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateJwk")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("d", &"[REDACTED]")
            .finish()
    }
}

/// Persistable form of a key pair: both halves as JWK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedKeyPair {
    pub public_key: PublicJwk,
    pub private_key: PrivateJwk,
}

/// Inputs bound into a single proof.
#[derive(Debug, Clone, Copy)]
pub struct ProofOptions<'a> {
    /// HTTP method (`htm`).
    pub method: &'a str,
    /// Target URI (`htu`).
    pub target_uri: &'a str,
    /// Access-token hash (`ath`), see [`hash_access_token`].
    pub access_token_hash: Option<&'a str>,
}

#[derive(Serialize)]
struct ProofHeader<'a> {
    typ: &'static str,
    alg: &'static str,
    jwk: &'a PublicJwk,
}

#[derive(Serialize)]
struct ProofClaims<'a> {
    htm: &'a str,
    htu: &'a str,
    iat: i64,
    jti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ath: Option<&'a str>,
}

/// ES256 signing key with its public JWK.
#[derive(Clone)]
pub struct DpopKeyPair {
    signing_key: SigningKey,
    public_jwk: PublicJwk,
}

impl fmt::Debug for DpopKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DpopKeyPair")
            .field("public_jwk", &self.public_jwk)
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for DpopKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public_jwk == other.public_jwk
    }
}

impl DpopKeyPair {
    /// Generate a fresh P-256 key pair.
    #[must_use]
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let public_jwk = public_jwk_for(&signing_key);
        Self { signing_key, public_jwk }
    }

    #[must_use]
    pub fn public_jwk(&self) -> &PublicJwk {
        &self.public_jwk
    }

    /// Export both halves for persistence.
    #[must_use]
    pub fn export(&self) -> SerializedKeyPair {
        let PublicJwk { kty, crv, x, y } = self.public_jwk.clone();
        SerializedKeyPair {
            public_key: self.public_jwk.clone(),
            private_key: PrivateJwk {
                kty,
                crv,
                x,
                y,
                d: URL_SAFE_NO_PAD.encode(self.signing_key.to_bytes()),
            },
        }
    }

    /// Rebuild a key pair from its serialized form.
    ///
    /// # Errors
    ///
    /// [`DpopError::KeyImport`] when the key type or curve is wrong, `d`
    /// is not a valid scalar, or the stored public half does not belong to
    /// the private scalar.
    pub fn import(serialized: &SerializedKeyPair) -> Result<Self, DpopError> {
        let private = &serialized.private_key;
        if private.kty != KEY_TYPE || private.crv != CURVE {
            return Err(DpopError::KeyImport(format!(
                "unsupported key type {}/{}",
                private.kty, private.crv
            )));
        }

        let d = URL_SAFE_NO_PAD
            .decode(private.d.as_bytes())
            .map_err(|e| DpopError::KeyImport(format!("invalid d: {e}")))?;
        let signing_key =
            SigningKey::from_slice(&d).map_err(|e| DpopError::KeyImport(e.to_string()))?;

        let public_jwk = public_jwk_for(&signing_key);
        if public_jwk != serialized.public_key {
            return Err(DpopError::KeyImport("public key does not match private key".into()));
        }

        Ok(Self { signing_key, public_jwk })
    }

    /// Sign a single-use proof for one request.
    ///
    /// # Errors
    ///
    /// [`DpopError::Encoding`] if the header or claims fail to serialize.
    pub fn create_proof(&self, options: ProofOptions<'_>) -> Result<String, DpopError> {
        let header = ProofHeader { typ: "dpop+jwt", alg: "ES256", jwk: &self.public_jwk };
        let claims = ProofClaims {
            htm: options.method,
            htu: options.target_uri,
            iat: Utc::now().timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            ath: options.access_token_hash,
        };

        let header = serde_json::to_vec(&header).map_err(|e| DpopError::Encoding(e.to_string()))?;
        let claims = serde_json::to_vec(&claims).map_err(|e| DpopError::Encoding(e.to_string()))?;
        let signing_input =
            format!("{}.{}", URL_SAFE_NO_PAD.encode(header), URL_SAFE_NO_PAD.encode(claims));

        let signature: Signature = self.signing_key.sign(signing_input.as_bytes());
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes())))
    }
}

fn public_jwk_for(signing_key: &SigningKey) -> PublicJwk {
    let point = signing_key.verifying_key().to_encoded_point(false);
    // An uncompressed point always carries both coordinates.
    let coordinate =
        |c: Option<&p256::FieldBytes>| c.map(|b| URL_SAFE_NO_PAD.encode(b)).unwrap_or_default();
    PublicJwk {
        kty: KEY_TYPE.to_string(),
        crv: CURVE.to_string(),
        x: coordinate(point.x()),
        y: coordinate(point.y()),
    }
}

/// `ath` value: base64url of the first half of SHA-256(token).
#[must_use]
pub fn hash_access_token(access_token: &str) -> String {
    let digest = Sha256::digest(access_token.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
}
