//! `Authorization: Bearer` credential extraction

use http::HeaderMap;
use http::header::AUTHORIZATION;

use crate::error::{Result, VerifyError};

/// Pull the token out of an `Authorization` header value
///
/// The scheme is matched case-insensitively. An absent header, another scheme,
/// or an empty credential are all [`VerifyError::MissingCredential`].
///
/// ```rust
/// use tokengate::bearer::extract_bearer;
///
/// assert_eq!(extract_bearer(Some("bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
/// assert!(extract_bearer(Some("Basic dXNlcjpwYXNz")).is_err());
/// assert!(extract_bearer(None).is_err());
/// ```
pub fn extract_bearer(authorization: Option<&str>) -> Result<&str> {
    let value = authorization.ok_or(VerifyError::MissingCredential)?.trim();
    let (scheme, credential) = value
        .split_once(char::is_whitespace)
        .ok_or(VerifyError::MissingCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(VerifyError::MissingCredential);
    }
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(VerifyError::MissingCredential);
    }
    Ok(credential)
}

/// [`extract_bearer`] over a header map; non-UTF-8 values count as absent
pub fn bearer_from_headers(headers: &HeaderMap) -> Result<&str> {
    extract_bearer(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_scheme_is_case_insensitive() {
        for header in ["Bearer t", "bearer t", "BEARER t", "  Bearer   t  "] {
            assert_eq!(extract_bearer(Some(header)).unwrap(), "t");
        }
    }

    #[test]
    fn test_rejections_are_missing_credential() {
        for header in ["", "Bearer", "Bearer    ", "Token t", "Bearert"] {
            assert_eq!(
                extract_bearer(Some(header)).unwrap_err(),
                VerifyError::MissingCredential,
                "{header:?}"
            );
        }
    }

    #[test]
    fn test_header_map() {
        let mut headers = HeaderMap::new();
        assert!(bearer_from_headers(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer a.b.c"));
        assert_eq!(bearer_from_headers(&headers).unwrap(), "a.b.c");

        headers.insert(AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xff").unwrap());
        assert_eq!(
            bearer_from_headers(&headers).unwrap_err(),
            VerifyError::MissingCredential
        );
    }
}
