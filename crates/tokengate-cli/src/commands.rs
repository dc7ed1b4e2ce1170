//! Command implementations on top of the verification engine

use crate::cli::{CheckArgs, DecodeArgs, TokenArgs, VerifyArgs};
use crate::error::{CliError, CliResult};
use crate::formatter::{DecodeReport, TokenReport, VerifyReport};
use crate::token::{ClientCredentials, mask};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokengate::{
    Algorithm, Clock, JwtValidator, KeyResolver, KeySource, LocalVerifier, SigningKey,
    SystemClock, TokenHeader, TokenVerifier, TrustDomainConfig, VerificationPolicy,
    VerificationSource, VerifiedToken, build_verifier, decode_unverified,
};
use tracing::debug;

/// Key id given to a `--secret` key when the token header names none
const SECRET_KEY_ID: &str = "cli";

/// Decode a token without verifying it
pub fn decode(args: &DecodeArgs) -> CliResult<DecodeReport> {
    let token = decode_unverified(&args.token)?;
    Ok(DecodeReport {
        signature_hex: token.signature_hex(),
        header: token.header,
        payload: token.payload,
    })
}

/// Verify a token against a shared secret or a JWKS file
pub async fn verify(args: &VerifyArgs) -> CliResult<VerifyReport> {
    let token = args.token.trim();
    let mut policy = VerificationPolicy::new().with_leeway(Duration::from_secs(args.leeway));
    if let Some(issuer) = &args.issuer {
        policy = policy.with_issuer(issuer.clone());
    }
    if let Some(audience) = &args.audience {
        policy = policy.with_audience(audience.clone());
    }

    let verified = match (&args.secret, &args.jwks) {
        (Some(secret), None) => {
            let algorithm = args.algorithm.unwrap_or(Algorithm::HS256);
            verify_with_secret(token, secret, policy.with_algorithm(algorithm))?
        }
        (None, Some(path)) => {
            if let Some(algorithm) = args.algorithm {
                policy = policy.with_algorithm(algorithm);
            }
            let keys = KeyResolver::load(KeySource::File(path.clone())).await?;
            debug!(keys = keys.snapshot().len(), path = %path.display(), "Loaded JWKS");
            LocalVerifier::new(policy, Arc::new(keys))
                .verify(token)
                .await?
        }
        _ => {
            return Err(CliError::InvalidArguments(
                "exactly one of --secret or --jwks is required".to_string(),
            ));
        }
    };

    report(verified)
}

/// Verify a token with the verifier a trust-domain configuration describes
pub async fn check(args: &CheckArgs) -> CliResult<VerifyReport> {
    let config = TrustDomainConfig::from_file(&args.config, &args.env_prefix)?;
    let verifier = build_verifier(&config).await?;
    debug!(?verifier, "Built verifier from configuration");
    report(verifier.verify(args.token.trim()).await?)
}

/// Fetch a client-credentials token; masked unless `--reveal`
pub async fn token(args: &TokenArgs) -> CliResult<TokenReport> {
    let client = ClientCredentials::new(
        args.issuer.clone(),
        args.client_id.clone(),
        SecretString::new(args.secret.clone()),
    )?
    .with_scope(args.scope.clone());

    let response = client.fetch().await?;
    let access_token = if args.reveal {
        response.access_token
    } else {
        mask(&response.access_token)
    };

    Ok(TokenReport {
        token_endpoint: client.token_endpoint(),
        access_token,
        masked: !args.reveal,
        token_type: response.token_type,
        expires_in: response.expires_in,
        scope: response.scope,
    })
}

fn verify_with_secret(
    token: &str,
    secret: &str,
    policy: VerificationPolicy,
) -> CliResult<VerifiedToken> {
    let header = TokenHeader::parse(token)?;
    let Some(algorithm) = policy.algorithm() else {
        return Err(CliError::InvalidArguments(
            "an algorithm is required with --secret".to_string(),
        ));
    };
    let kid = header.kid.clone().unwrap_or_else(|| SECRET_KEY_ID.to_string());
    let key = SigningKey::from_secret(kid, algorithm, secret.as_bytes())?;

    let validator = JwtValidator::new(Arc::new(policy));
    let claims = validator.validate(&header, token, &key, SystemClock.now())?;

    Ok(VerifiedToken {
        claims,
        key_id: header.kid,
        algorithm: Some(header.alg),
        source: VerificationSource::LocalKey,
    })
}

fn report(verified: VerifiedToken) -> CliResult<VerifyReport> {
    let expires_at = verified
        .claims
        .exp()?
        .and_then(|exp| chrono::DateTime::from_timestamp(exp, 0))
        .map(|at| at.to_rfc3339());

    Ok(VerifyReport {
        source: match verified.source {
            VerificationSource::LocalKey => "local_key",
            VerificationSource::Introspection => "introspection",
        },
        key_id: verified.key_id,
        algorithm: verified.algorithm.map(|alg| format!("{alg:?}")),
        claims: serde_json::to_value(&verified.claims)?,
        expires_at,
    })
}
