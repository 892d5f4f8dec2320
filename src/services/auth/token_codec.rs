//! Compact signed tokens (JWT compact serialization, HMAC family only).
//!
//! Responsibility:
//! - `encode`: header + payload -> `b64url(header).b64url(payload).b64url(mac)`
//! - `decode`: segment count -> algorithm -> signature -> time bounds
//!
//! Every stage rejects on its own. `DecodeError` says which stage failed so the
//! caller can log it; the HTTP layer never tells the client which one it was.

use std::{fmt, str::FromStr};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac, digest::KeyInit};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Sha256, Sha384, Sha512};
use thiserror::Error;

use crate::services::auth::claims::Claims;

/// Supported signing algorithms and the hash each one runs HMAC over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::HS256 => "HS256",
            Algorithm::HS384 => "HS384",
            Algorithm::HS512 => "HS512",
        }
    }

    /// Header `alg` lookup. Names are matched exactly, as JOSE requires.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "HS256" => Some(Algorithm::HS256),
            "HS384" => Some(Algorithm::HS384),
            "HS512" => Some(Algorithm::HS512),
            _ => None,
        }
    }

    fn sign(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self {
            Algorithm::HS256 => mac::<Hmac<Sha256>>(key, data),
            Algorithm::HS384 => mac::<Hmac<Sha384>>(key, data),
            Algorithm::HS512 => mac::<Hmac<Sha512>>(key, data),
        }
    }

    fn verify(&self, key: &[u8], data: &[u8], signature: &[u8]) -> bool {
        match self {
            Algorithm::HS256 => verify_mac::<Hmac<Sha256>>(key, data, signature),
            Algorithm::HS384 => verify_mac::<Hmac<Sha384>>(key, data, signature),
            Algorithm::HS512 => verify_mac::<Hmac<Sha512>>(key, data, signature),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::from_name(&s.trim().to_ascii_uppercase())
            .ok_or_else(|| DecodeError::UnsupportedAlgorithm(s.to_string()))
    }
}

fn mac<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut m = <M as KeyInit>::new_from_slice(key).map_err(|_| CodecError::InvalidKey)?;
    Mac::update(&mut m, data);
    Ok(m.finalize().into_bytes().to_vec())
}

// `verify_slice` compares in constant time.
fn verify_mac<M: Mac + KeyInit>(key: &[u8], data: &[u8], signature: &[u8]) -> bool {
    let Ok(mut m) = <M as KeyInit>::new_from_slice(key) else {
        return false;
    };
    Mac::update(&mut m, data);
    m.verify_slice(signature).is_ok()
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to serialize token segment: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("signing key rejected")]
    InvalidKey,
}

/// Why a token was rejected. Never shown to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed token")]
    Malformed,
    #[error("unsupported algorithm: {0:?}")]
    UnsupportedAlgorithm(String),
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("token issued in the future")]
    IssuedInFuture,
}

#[derive(Serialize)]
struct Header<'a> {
    typ: &'a str,
    alg: &'a str,
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(default)]
    alg: Option<String>,
}

/// Signs and verifies tokens with one process-wide secret.
///
/// Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
    algorithm: Algorithm,
    leeway_seconds: i64,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: impl Into<Vec<u8>>, algorithm: Algorithm) -> Self {
        Self {
            secret: secret.into(),
            algorithm,
            leeway_seconds: 0,
        }
    }

    /// Clock-skew allowance applied to `exp`, `nbf` and `iat`.
    pub fn with_leeway(mut self, seconds: i64) -> Self {
        self.leeway_seconds = seconds.max(0);
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, CodecError> {
        let header = Header {
            typ: "JWT",
            alg: self.algorithm.as_str(),
        };

        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let signing_input = format!("{header}.{payload}");

        let signature = self
            .algorithm
            .sign(&self.secret, signing_input.as_bytes())?;

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
        self.decode_at(token, chrono::Utc::now().timestamp())
    }

    /// Decode against an explicit clock (seconds since the epoch).
    pub fn decode_at(&self, token: &str, now: i64) -> Result<Claims, DecodeError> {
        // (a) shape
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(DecodeError::Malformed);
        };

        // (b) algorithm
        let raw: RawHeader = decode_segment(header)?;
        let alg = raw.alg.unwrap_or_default();
        let algorithm =
            Algorithm::from_name(&alg).ok_or(DecodeError::UnsupportedAlgorithm(alg))?;

        // (c) signature
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| DecodeError::Malformed)?;
        let signing_input = &token[..header.len() + 1 + payload.len()];
        if !algorithm.verify(&self.secret, signing_input.as_bytes(), &signature) {
            return Err(DecodeError::BadSignature);
        }

        // (d) time bounds
        let claims: Claims = decode_segment(payload)?;
        self.check_time(&claims, now)?;

        Ok(claims)
    }

    fn check_time(&self, claims: &Claims, now: i64) -> Result<(), DecodeError> {
        let leeway = self.leeway_seconds;

        if let Some(exp) = claims.exp
            && exp.saturating_add(leeway) < now
        {
            return Err(DecodeError::Expired);
        }
        if let Some(nbf) = claims.nbf
            && nbf.saturating_sub(leeway) > now
        {
            return Err(DecodeError::NotYetValid);
        }
        if let Some(iat) = claims.iat
            && iat.saturating_sub(leeway) > now
        {
            return Err(DecodeError::IssuedInFuture);
        }
        Ok(())
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, DecodeError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| DecodeError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| DecodeError::Malformed)
}
