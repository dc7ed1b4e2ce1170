//! Key set loading, reload and snapshot consistency
//!
//! Covers:
//! - file sources rewritten between reloads (rotation)
//! - failed reloads keeping the previous set active
//! - URL sources served by a mock JWKS endpoint
//! - resolutions racing a reload never seeing a mixed set

mod common;

use common::*;
use std::io::{Seek, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokengate::{
    KeyResolver, KeySource, LocalVerifier, ManualClock, TokenVerifier, VerificationPolicy,
    VerifyError,
};

fn write_jwks(file: &mut tempfile::NamedTempFile, document: &str) {
    let f = file.as_file_mut();
    f.set_len(0).unwrap();
    f.rewind().unwrap();
    f.write_all(document.as_bytes()).unwrap();
    f.sync_all().unwrap();
}

/// Test: key rotation through a file source
#[tokio::test]
async fn test_file_reload_rotates_keys() {
    // GIVEN: a JWKS file with k1 only
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write_jwks(&mut file, &jwks(&[oct_jwk("k1", K1_SECRET, Some("HS256"))]));
    let keys = Arc::new(
        KeyResolver::load(KeySource::File(file.path().to_path_buf()))
            .await
            .unwrap(),
    );
    let verifier = LocalVerifier::new(VerificationPolicy::new(), keys.clone())
        .with_clock(Arc::new(ManualClock::new(NOW)));

    let k2_token = mint_hs(
        Some("k2"),
        tokengate::Algorithm::HS256,
        K2_SECRET,
        &demo_claims(NOW, None),
    );
    assert!(matches!(
        verifier.verify(&k2_token).await,
        Err(VerifyError::UnknownKey { .. })
    ));

    // WHEN: the file is rewritten with k2 and reloaded
    write_jwks(&mut file, &jwks(&[oct_jwk("k2", K2_SECRET, Some("HS256"))]));
    assert_eq!(keys.reload().await.unwrap(), 1);

    // THEN: k2 verifies and k1 is gone
    assert!(verifier.verify(&k2_token).await.is_ok());
    assert_eq!(
        verifier
            .verify(&mint_k1(&demo_claims(NOW, None)))
            .await
            .unwrap_err(),
        VerifyError::UnknownKey {
            kid: "k1".to_string()
        }
    );
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_set() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write_jwks(&mut file, &jwks(&[oct_jwk("k1", K1_SECRET, Some("HS256"))]));
    let keys = KeyResolver::load(KeySource::File(file.path().to_path_buf()))
        .await
        .unwrap();

    write_jwks(&mut file, "{ this is not json");
    assert!(matches!(
        keys.reload().await,
        Err(VerifyError::KeyLoad { .. })
    ));
    assert!(keys.resolve(Some("k1")).is_ok());

    // Removing the file entirely is also recoverable
    let path = file.path().to_path_buf();
    drop(file);
    assert!(!path.exists());
    assert!(keys.reload().await.is_err());
    assert_eq!(keys.snapshot().kids(), vec!["k1"]);
}

#[tokio::test]
async fn test_initial_load_failure_is_key_load() {
    let err = KeyResolver::load(KeySource::File("/nonexistent/jwks.json".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::KeyLoad { .. }));

    let err = KeyResolver::load(KeySource::Url("http://auth.example.com/jwks".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::KeyLoad { .. }));
}

#[tokio::test]
async fn test_inline_source() {
    let keys = KeyResolver::load(KeySource::Inline(jwks(&[
        oct_jwk("k1", K1_SECRET, Some("HS256")),
        oct_jwk("k2", K2_SECRET, Some("HS256")),
    ])))
    .await
    .unwrap();
    assert_eq!(keys.snapshot().kids(), vec!["k1", "k2"]);
}

#[tokio::test]
async fn test_url_source_and_endpoint_outage() {
    // GIVEN: a JWKS endpoint serving k1
    let mock = MockAuthServer::start().await;
    mock.mock_jwks(jwks(&[oct_jwk("k1", K1_SECRET, Some("HS256"))]))
        .await;
    let keys = KeyResolver::load(KeySource::Url(mock.jwks_endpoint.clone()))
        .await
        .unwrap();
    assert!(keys.resolve(Some("k1")).is_ok());

    // WHEN: the endpoint starts failing
    mock.reset().await;
    mock.mock_jwks_status(503).await;

    // THEN: reload fails but the cached set still serves
    assert!(matches!(
        keys.reload().await,
        Err(VerifyError::KeyLoad { .. })
    ));
    assert!(keys.resolve(Some("k1")).is_ok());

    // AND: once it recovers with a rotated set, reload swaps it in
    mock.reset().await;
    mock.mock_jwks(jwks(&[oct_jwk("k2", K2_SECRET, Some("HS256"))]))
        .await;
    assert_eq!(keys.reload().await.unwrap(), 1);
    assert_eq!(keys.snapshot().kids(), vec!["k2"]);
}

/// Test: resolutions during reloads see one whole set
///
/// The file alternates between {a1, a2} and {b1, b2}. Every snapshot taken
/// while reloads run must contain exactly one of those pairs.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_snapshots_are_never_mixed_during_reload() {
    let set_a = jwks(&[
        oct_jwk("a1", K1_SECRET, Some("HS256")),
        oct_jwk("a2", K2_SECRET, Some("HS256")),
    ]);
    let set_b = jwks(&[
        oct_jwk("b1", K1_SECRET, Some("HS256")),
        oct_jwk("b2", K2_SECRET, Some("HS256")),
    ]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jwks.json");
    std::fs::write(&path, &set_a).unwrap();
    let keys = Arc::new(KeyResolver::load(KeySource::File(path.clone())).await.unwrap());

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let keys = Arc::clone(&keys);
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let mut observed = 0usize;
                loop {
                    let snapshot = keys.snapshot();
                    let kids = snapshot.kids();
                    assert!(
                        kids == ["a1", "a2"] || kids == ["b1", "b2"],
                        "mixed key set observed: {kids:?}"
                    );
                    observed += 1;
                    if done.load(Ordering::Acquire) {
                        break observed;
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for round in 0..50 {
        // Write a sibling file and rename over, so the reader never sees a torn file
        let staging = dir.path().join("jwks.json.tmp");
        std::fs::write(&staging, if round % 2 == 0 { &set_b } else { &set_a }).unwrap();
        std::fs::rename(&staging, &path).unwrap();
        keys.reload().await.unwrap();
        tokio::task::yield_now().await;
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert!(reader.await.unwrap() > 0);
    }
}
