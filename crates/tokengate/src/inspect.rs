//! Untrusted token decoding for diagnostics
//!
//! Nothing returned here has been verified. Use it to look at a token, never
//! to decide whether to accept one.

use base64::Engine;
use base64::alphabet::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::Value;

use crate::error::{Result, VerifyError};

// base64url, with or without trailing '='
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The three segments of a compact JWS, decoded but not verified
#[derive(Debug, Clone, PartialEq)]
pub struct UnverifiedToken {
    /// Header JSON
    pub header: Value,
    /// Payload JSON
    pub payload: Value,
    /// Raw signature bytes
    pub signature: Vec<u8>,
}

impl UnverifiedToken {
    /// Signature as lowercase hex
    pub fn signature_hex(&self) -> String {
        hex::encode(&self.signature)
    }
}

/// Split and decode a token without checking its signature
///
/// # Errors
///
/// [`VerifyError::MalformedToken`] unless the token is three dot-separated
/// base64url segments whose first two are JSON.
pub fn decode_unverified(token: &str) -> Result<UnverifiedToken> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    let [header, payload, signature] = segments.as_slice() else {
        return Err(VerifyError::malformed(
            "token must have three parts separated by '.'",
        ));
    };

    Ok(UnverifiedToken {
        header: decode_json(header, "header")?,
        payload: decode_json(payload, "payload")?,
        signature: decode_segment(signature, "signature")?,
    })
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>> {
    URL_SAFE_LENIENT
        .decode(segment)
        .map_err(|e| VerifyError::malformed(format!("{name} is not base64url: {e}")))
}

fn decode_json(segment: &str, name: &str) -> Result<Value> {
    let bytes = decode_segment(segment, name)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| VerifyError::malformed(format!("{name} is not JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // {"alg":"HS256","typ":"JWT"} . {"sub":"1234567890"} . 0xdeadbeef
    const TOKEN: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiIxMjM0NTY3ODkwIn0.3q2-7w";

    #[test]
    fn test_decode_segments() {
        let decoded = decode_unverified(TOKEN).unwrap();
        assert_eq!(decoded.header, json!({"alg": "HS256", "typ": "JWT"}));
        assert_eq!(decoded.payload, json!({"sub": "1234567890"}));
        assert_eq!(decoded.signature_hex(), "deadbeef");
    }

    #[test]
    fn test_padded_segments_are_accepted() {
        let padded = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiIxMjM0NTY3ODkwIn0=.3q2-7w==";
        assert_eq!(
            decode_unverified(padded).unwrap(),
            decode_unverified(TOKEN).unwrap()
        );
    }

    #[test]
    fn test_malformed_inputs() {
        for token in ["", "a.b", "a.b.c.d", "!!!.e30.", "e30.bm90IGpzb24.", "e30.e30.***"] {
            assert!(
                matches!(decode_unverified(token), Err(VerifyError::MalformedToken { .. })),
                "{token:?}"
            );
        }
    }

    #[test]
    fn test_empty_signature_segment() {
        let decoded = decode_unverified("e30.e30.").unwrap();
        assert!(decoded.signature.is_empty());
        assert_eq!(decoded.signature_hex(), "");
    }
}
