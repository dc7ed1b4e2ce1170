//! JWT signature and claim policy validation
//!
//! Checks run in a fixed order and each one fails with its own error:
//!
//! 1. Algorithm: the header algorithm must be the key's declared algorithm
//!    (or at least its key family) and the policy's pinned algorithm, if any
//! 2. Signature over header and payload with the resolved key
//! 3. Expiry: rejected when `now > exp + leeway`
//! 4. Not-before: rejected when `now < nbf - leeway`
//! 5. Issuer: exact match
//! 6. Audience: the policy audience must be one of the token audiences
//!
//! Leeway applies to the time checks only. `jsonwebtoken` is used strictly for
//! signature verification; every claim decision is made here, against the
//! caller's `now`, so tests can pin time and trip exactly one check.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Validation, decode};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{ClaimSet, SigningKey, TokenHeader};
use crate::config::VerificationPolicy;
use crate::error::{Result, VerifyError};

/// Applies a [`VerificationPolicy`] to individual tokens
#[derive(Debug, Clone)]
pub struct JwtValidator {
    policy: Arc<VerificationPolicy>,
}

impl JwtValidator {
    /// Create a validator for one trust domain
    pub fn new(policy: Arc<VerificationPolicy>) -> Self {
        Self { policy }
    }

    /// The policy being enforced
    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    /// Validate `token` with an already-resolved key
    ///
    /// # Errors
    ///
    /// One of [`VerifyError::AlgorithmMismatch`], [`VerifyError::Signature`],
    /// [`VerifyError::Expired`], [`VerifyError::NotYetValid`],
    /// [`VerifyError::IssuerMismatch`], [`VerifyError::AudienceMismatch`], in
    /// that order of precedence. [`VerifyError::MalformedToken`] if the payload
    /// cannot be decoded or `exp` is missing.
    pub fn validate(
        &self,
        header: &TokenHeader,
        token: &str,
        key: &SigningKey,
        now: i64,
    ) -> Result<ClaimSet> {
        self.check_algorithm(header, key)?;
        let claims = verify_signature(header, token, key)?;
        self.check_expiry(&claims, now)?;
        self.check_not_before(&claims, now)?;
        self.check_issuer(&claims)?;
        self.check_audience(&claims)?;

        debug!(
            kid = key.kid(),
            subject = ?claims.sub(),
            algorithm = ?header.alg,
            "JWT validation successful"
        );
        Ok(claims)
    }

    fn check_algorithm(&self, header: &TokenHeader, key: &SigningKey) -> Result<()> {
        if !key.permits(header.alg) {
            let expected = match key.algorithm() {
                Some(alg) => format!("{alg:?}"),
                None => format!("{:?} family", key.family()),
            };
            warn!(kid = key.kid(), algorithm = ?header.alg, %expected, "Algorithm not permitted by key");
            return Err(VerifyError::AlgorithmMismatch {
                expected,
                found: format!("{:?}", header.alg),
            });
        }

        if let Some(pinned) = self.policy.algorithm()
            && pinned != header.alg
        {
            warn!(algorithm = ?header.alg, pinned = ?pinned, "Algorithm not permitted by policy");
            return Err(VerifyError::AlgorithmMismatch {
                expected: format!("{pinned:?}"),
                found: format!("{:?}", header.alg),
            });
        }
        Ok(())
    }

    fn check_expiry(&self, claims: &ClaimSet, now: i64) -> Result<()> {
        let exp = claims
            .exp()?
            .ok_or_else(|| VerifyError::malformed("missing exp claim"))?;
        if now > exp.saturating_add(self.policy.leeway_secs()) {
            return Err(VerifyError::Expired { exp, now });
        }
        Ok(())
    }

    fn check_not_before(&self, claims: &ClaimSet, now: i64) -> Result<()> {
        if let Some(nbf) = claims.nbf()?
            && now < nbf.saturating_sub(self.policy.leeway_secs())
        {
            return Err(VerifyError::NotYetValid { nbf, now });
        }
        Ok(())
    }

    fn check_issuer(&self, claims: &ClaimSet) -> Result<()> {
        let Some(expected) = self.policy.issuer() else {
            return Ok(());
        };
        if claims.iss() != Some(expected) {
            return Err(VerifyError::IssuerMismatch {
                expected: expected.to_string(),
                found: claims.iss().map(str::to_string),
            });
        }
        Ok(())
    }

    fn check_audience(&self, claims: &ClaimSet) -> Result<()> {
        check_audience(self.policy.audience(), claims)
    }
}

/// Audience rule shared with the introspection path
pub(crate) fn check_audience(expected: Option<&str>, claims: &ClaimSet) -> Result<()> {
    match expected {
        Some(expected) if !claims.has_audience(expected) => Err(VerifyError::AudienceMismatch {
            expected: expected.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Verify the signature and hand back the decoded payload
///
/// Every claim check of `jsonwebtoken` is switched off; only the signature and
/// the algorithm/key pairing are left to it.
fn verify_signature(header: &TokenHeader, token: &str, key: &SigningKey) -> Result<ClaimSet> {
    let mut validation = Validation::new(header.alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Map<String, Value>>(token, key.decoding_key(), &validation).map_err(
        |e| match e.kind() {
            JwtErrorKind::InvalidSignature => {
                warn!(kid = key.kid(), "JWT signature verification failed");
                VerifyError::Signature
            }
            JwtErrorKind::InvalidAlgorithm => VerifyError::AlgorithmMismatch {
                expected: format!("{:?} family", key.family()),
                found: format!("{:?}", header.alg),
            },
            JwtErrorKind::InvalidToken
            | JwtErrorKind::Base64(_)
            | JwtErrorKind::Json(_)
            | JwtErrorKind::Utf8(_) => VerifyError::malformed(format!("invalid token payload: {e}")),
            _ => {
                warn!(kid = key.kid(), error = %e, "JWT signature could not be checked");
                VerifyError::Signature
            }
        },
    )?;

    Ok(ClaimSet::new(data.claims))
}
