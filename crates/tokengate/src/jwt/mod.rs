//! JWT infrastructure - key resolution and claim validation
//!
//! ```text
//! ┌──────────────┐   kid    ┌──────────────┐  SigningKey  ┌──────────────┐
//! │ TokenHeader  │ ───────▶ │ KeyResolver  │ ───────────▶ │ JwtValidator │
//! │ (untrusted)  │          │ (ArcSwap set)│              │ (ordered     │
//! └──────────────┘          └──────────────┘              │  checks)     │
//!                                                          └──────┬───────┘
//!                                                                 ▼
//!                                                             ClaimSet
//! ```
//!
//! # Modules
//!
//! - `jwks` - JWKS parsing, the key set and its refreshable resolver
//! - `validator` - signature verification and claim policy enforcement

pub mod jwks;
pub mod validator;

pub use jwks::{KeyFamily, KeyResolver, KeySet, KeySource, SigningKey};
pub use validator::JwtValidator;

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, VerifyError};

/// Token header fields that drive key lookup
///
/// Parsed without any signature check. Nothing here is trusted until the
/// validator has verified the signature with the key it selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Signing algorithm claimed by the token
    pub alg: Algorithm,
    /// Key identifier, if the issuer set one
    pub kid: Option<String>,
    /// Media type (`typ`), informational only
    pub typ: Option<String>,
}

impl TokenHeader {
    /// Parse the header of a compact JWS
    ///
    /// # Errors
    ///
    /// [`VerifyError::MalformedToken`] when the token is not three dot-separated
    /// segments, the header is not base64url JSON, or names an algorithm this
    /// crate does not support (including `none`).
    pub fn parse(token: &str) -> Result<Self> {
        if token.split('.').count() != 3 {
            return Err(VerifyError::malformed(
                "token must have three parts separated by '.'",
            ));
        }

        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| VerifyError::malformed(format!("invalid token header: {e}")))?;

        Ok(Self {
            alg: header.alg,
            kid: header.kid.filter(|kid| !kid.is_empty()),
            typ: header.typ,
        })
    }
}

/// Claims carried by a verified token
///
/// A thin wrapper over the JSON object so issuer-specific claims pass through
/// untouched. Registered claims have typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    /// Wrap a JSON object
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Raw claim lookup
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether a claim is present
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Set or replace a claim
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    fn str_claim(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Issuer (`iss`)
    pub fn iss(&self) -> Option<&str> {
        self.str_claim("iss")
    }

    /// Subject (`sub`)
    pub fn sub(&self) -> Option<&str> {
        self.str_claim("sub")
    }

    /// Token identifier (`jti`); empty strings count as absent
    pub fn jti(&self) -> Option<&str> {
        self.str_claim("jti").filter(|jti| !jti.is_empty())
    }

    /// Space-delimited scope string (`scope`)
    pub fn scope(&self) -> Option<&str> {
        self.str_claim("scope")
    }

    /// Audience values; a bare string is a one-element set
    pub fn audiences(&self) -> Vec<&str> {
        match self.0.get("aud") {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Whether `audience` is one of the token audiences
    pub fn has_audience(&self, audience: &str) -> bool {
        self.audiences().contains(&audience)
    }

    /// Expiry (`exp`) in Unix seconds
    ///
    /// # Errors
    ///
    /// [`VerifyError::MalformedToken`] if present but not numeric.
    pub fn exp(&self) -> Result<Option<i64>> {
        self.numeric_date("exp")
    }

    /// Not-before (`nbf`) in Unix seconds
    ///
    /// # Errors
    ///
    /// [`VerifyError::MalformedToken`] if present but not numeric.
    pub fn nbf(&self) -> Result<Option<i64>> {
        self.numeric_date("nbf")
    }

    /// Issued-at (`iat`) in Unix seconds, ignoring non-numeric values
    pub fn iat(&self) -> Option<i64> {
        self.numeric_date("iat").ok().flatten()
    }

    // RFC 7519 NumericDate may be fractional; truncate toward the past.
    fn numeric_date(&self, name: &str) -> Result<Option<i64>> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.floor() as i64))
                .map(Some)
                .ok_or_else(|| VerifyError::malformed(format!("{name} claim out of range"))),
            Some(_) => Err(VerifyError::malformed(format!(
                "{name} claim must be a number"
            ))),
        }
    }

    /// Iterate over all claims
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Borrow the underlying JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Unwrap into the underlying JSON object
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}
