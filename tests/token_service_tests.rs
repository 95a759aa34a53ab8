//! Session lifecycle tests against the token service with an in-process store.
//!
//! Covers issuance, request authentication, refresh rotation and reuse,
//! logout and termination, and the classification of store faults.

mod common;

use chrono::Utc;
use common::*;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use sessiongate::application_impl::RealTokenService;
use sessiongate::application_port::*;
use sessiongate::domain_model::*;
use sessiongate::domain_port::*;
use sessiongate::infra_memory::*;
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn memory_service() -> (Arc<RealTokenService>, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    (Arc::new(token_service(store.clone())), store)
}

#[tokio::test]
async fn issued_access_token_authenticates_its_subject() {
    let (service, _) = memory_service();

    for subject in [SubjectId(1), SubjectId(2), SubjectId(42)] {
        let pair = service.issue_session(subject).await.unwrap();
        let metadata = service
            .authenticate_request(Some(&bearer(&pair)))
            .await
            .unwrap();

        assert_eq!(metadata.subject_id, subject);
        assert_eq!(metadata.session_id, pair.access_session_id);
        assert_eq!(metadata.refresh_session_id, pair.refresh_session_id);
        assert_eq!(metadata.token_expires_at, pair.access_token_expires_at);
    }
}

#[tokio::test]
async fn pair_has_independent_sessions_and_expiries() {
    let (service, store) = memory_service();
    let pair = service.issue_session(SubjectId(7)).await.unwrap();

    assert_ne!(pair.access_session_id, pair.refresh_session_id);
    assert!(pair.access_token_expires_at > Utc::now());
    assert!(pair.refresh_token_expires_at > pair.access_token_expires_at);
    assert_eq!(store.len(), 2);
    assert_eq!(store.get(pair.access_session_id).await.unwrap(), SubjectId(7));
    assert_eq!(store.get(pair.refresh_session_id).await.unwrap(), SubjectId(7));
}

#[tokio::test]
async fn missing_or_malformed_header_is_unauthenticated() {
    let (service, _) = memory_service();
    let pair = service.issue_session(SubjectId(7)).await.unwrap();

    for header in [
        None,
        Some(""),
        Some("Bearer"),
        Some("Basic dXNlcjpwYXNz"),
        Some("Bearer not-a-token"),
    ] {
        let result = service.authenticate_request(header).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)), "{header:?}");
    }

    let raw = pair.access_token.0.clone();
    let result = service.authenticate_request(Some(&raw)).await;
    assert!(matches!(result, Err(AuthError::Unauthenticated)));
}

#[tokio::test]
async fn tokens_are_only_accepted_for_their_purpose() {
    let (service, _) = memory_service();
    let pair = service.issue_session(SubjectId(7)).await.unwrap();

    let refresh_as_bearer = format!("Bearer {}", pair.refresh_token.0);
    assert!(matches!(
        service.authenticate_request(Some(&refresh_as_bearer)).await,
        Err(AuthError::Unauthenticated)
    ));
    assert!(matches!(
        service.refresh_session(&pair.access_token.0).await,
        Err(AuthError::Unauthenticated)
    ));

    // Neither misuse consumed anything.
    service.authenticate_request(Some(&bearer(&pair))).await.unwrap();
    service.refresh_session(&pair.refresh_token.0).await.unwrap();
}

#[tokio::test]
async fn tampered_access_token_is_unauthenticated() {
    let (service, _) = memory_service();
    let pair = service.issue_session(SubjectId(7)).await.unwrap();

    let mut parts: Vec<String> = pair.access_token.0.split('.').map(String::from).collect();
    parts[2] = parts[2].chars().rev().collect();
    let tampered = format!("Bearer {}", parts.join("."));

    assert!(matches!(
        service.authenticate_request(Some(&tampered)).await,
        Err(AuthError::Unauthenticated)
    ));
}

#[tokio::test]
async fn terminated_session_no_longer_authenticates() {
    let (service, store) = memory_service();
    let pair = service.issue_session(SubjectId(7)).await.unwrap();

    service
        .terminate_session(pair.access_session_id, pair.refresh_session_id)
        .await
        .unwrap();

    assert!(matches!(
        service.authenticate_request(Some(&bearer(&pair))).await,
        Err(AuthError::Unauthenticated)
    ));
    assert!(matches!(
        service.refresh_session(&pair.refresh_token.0).await,
        Err(AuthError::Unauthenticated)
    ));
    assert!(store.is_empty());
}

#[tokio::test]
async fn terminate_is_idempotent() {
    let (service, _) = memory_service();
    let pair = service.issue_session(SubjectId(7)).await.unwrap();

    for _ in 0..2 {
        service
            .terminate_session(pair.access_session_id, pair.refresh_session_id)
            .await
            .unwrap();
    }
    service
        .terminate_session(SessionId::new_random(), SessionId::new_random())
        .await
        .unwrap();
}

#[tokio::test]
async fn refresh_token_is_single_use() {
    let (service, _) = memory_service();
    let pair = service.issue_session(SubjectId(7)).await.unwrap();

    let rotated = service.refresh_session(&pair.refresh_token.0).await.unwrap();
    assert_ne!(rotated.refresh_session_id, pair.refresh_session_id);

    assert!(matches!(
        service.refresh_session(&pair.refresh_token.0).await,
        Err(AuthError::Unauthenticated)
    ));
}

#[tokio::test]
async fn login_refresh_replay_scenario() {
    let (service, _) = memory_service();

    let p1 = service.issue_session(SubjectId(42)).await.unwrap();
    let metadata = service.authenticate_request(Some(&bearer(&p1))).await.unwrap();
    assert_eq!(metadata.subject_id, SubjectId(42));

    let p2 = service.refresh_session(&p1.refresh_token.0).await.unwrap();
    assert_ne!(p2.access_session_id, p1.access_session_id);
    assert_ne!(p2.refresh_session_id, p1.refresh_session_id);

    assert!(matches!(
        service.refresh_session(&p1.refresh_token.0).await,
        Err(AuthError::Unauthenticated)
    ));

    let metadata = service.authenticate_request(Some(&bearer(&p2))).await.unwrap();
    assert_eq!(metadata.subject_id, SubjectId(42));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refreshes_rotate_exactly_once() {
    let (service, _) = memory_service();
    let pair = service.issue_session(SubjectId(42)).await.unwrap();
    let token = pair.refresh_token.0.clone();

    let (a, b) = tokio::join!(
        {
            let service = service.clone();
            let token = token.clone();
            tokio::spawn(async move { service.refresh_session(&token).await })
        },
        {
            let service = service.clone();
            let token = token.clone();
            tokio::spawn(async move { service.refresh_session(&token).await })
        }
    );
    let results = [a.unwrap(), b.unwrap()];

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(AuthError::Unauthenticated)))
        .count();
    assert_eq!((winners, losers), (1, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn refresh_storm_issues_a_single_pair() {
    let (service, store) = memory_service();
    let pair = service.issue_session(SubjectId(42)).await.unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            let token = pair.refresh_token.0.clone();
            tokio::spawn(async move { service.refresh_session(&token).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(AuthError::Unauthenticated) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(winners, 1);
    // Old access entry, plus one new pair.
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn refresh_for_a_vanished_subject_is_unauthenticated() {
    let (service, _) = memory_service();
    let pair = service.issue_session(SubjectId(999)).await.unwrap();

    assert!(matches!(
        service.refresh_session(&pair.refresh_token.0).await,
        Err(AuthError::Unauthenticated)
    ));
}

#[tokio::test]
async fn logout_retires_both_sessions() {
    let (service, store) = memory_service();
    let pair = service.issue_session(SubjectId(7)).await.unwrap();

    service.logout(Some(&bearer(&pair))).await.unwrap();
    service.logout(Some(&bearer(&pair))).await.unwrap();

    assert!(store.is_empty());
    assert!(matches!(
        service.authenticate_request(Some(&bearer(&pair))).await,
        Err(AuthError::Unauthenticated)
    ));
}

#[tokio::test]
async fn logout_without_a_usable_token_succeeds() {
    let (service, store) = memory_service();
    let pair = service.issue_session(SubjectId(7)).await.unwrap();

    service.logout(None).await.unwrap();
    service.logout(Some("Bearer garbage")).await.unwrap();
    let refresh_as_bearer = format!("Bearer {}", pair.refresh_token.0);
    service.logout(Some(&refresh_as_bearer)).await.unwrap();

    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn logout_with_expired_access_token_still_retires_refresh_session() {
    let (service, store) = memory_service();
    let pair = service.issue_session(SubjectId(7)).await.unwrap();

    let mut claims = codec()
        .inspect(&pair.access_token.0, Purpose::Access)
        .unwrap();
    claims.exp = Utc::now().timestamp() - 60;
    let expired = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(ACCESS_SECRET),
    )
    .unwrap();
    let header = format!("Bearer {expired}");

    assert!(matches!(
        service.authenticate_request(Some(&header)).await,
        Err(AuthError::Unauthenticated)
    ));
    service.logout(Some(&header)).await.unwrap();

    assert!(store.is_empty());
    assert!(matches!(
        service.refresh_session(&pair.refresh_token.0).await,
        Err(AuthError::Unauthenticated)
    ));
}

#[tokio::test]
async fn store_outage_is_a_backend_fault_not_an_auth_failure() {
    let store = Arc::new(FaultyStore::new());
    let service = token_service(store.clone());
    let pair = service.issue_session(SubjectId(7)).await.unwrap();

    store.fail_reads.store(true, Ordering::SeqCst);
    assert!(matches!(
        service.authenticate_request(Some(&bearer(&pair))).await,
        Err(AuthError::BackendUnavailable(_))
    ));
    assert!(matches!(
        service.refresh_session(&pair.refresh_token.0).await,
        Err(AuthError::BackendUnavailable(_))
    ));

    store.fail_deletes.store(true, Ordering::SeqCst);
    assert!(matches!(
        service
            .terminate_session(pair.access_session_id, pair.refresh_session_id)
            .await,
        Err(AuthError::BackendUnavailable(_))
    ));

    // Nothing was consumed during the outage.
    store.heal();
    service.authenticate_request(Some(&bearer(&pair))).await.unwrap();
    service.refresh_session(&pair.refresh_token.0).await.unwrap();
}

#[tokio::test]
async fn partial_issue_leaves_no_session_behind() {
    let store = Arc::new(FaultyStore::new());
    let service = token_service(store.clone());

    store.fail_writes_after(1);
    assert!(matches!(
        service.issue_session(SubjectId(7)).await,
        Err(AuthError::IssueFailed(_))
    ));
    assert!(store.inner.is_empty());

    store.fail_writes_after(0);
    assert!(matches!(
        service.issue_session(SubjectId(7)).await,
        Err(AuthError::IssueFailed(_))
    ));
    assert!(store.inner.is_empty());
}

#[tokio::test]
async fn failed_rotation_fails_closed() {
    let store = Arc::new(FaultyStore::new());
    let service = token_service(store.clone());
    let pair = service.issue_session(SubjectId(7)).await.unwrap();

    store.fail_writes_after(0);
    assert!(matches!(
        service.refresh_session(&pair.refresh_token.0).await,
        Err(AuthError::IssueFailed(_))
    ));

    store.heal();
    assert!(matches!(
        service.refresh_session(&pair.refresh_token.0).await,
        Err(AuthError::Unauthenticated)
    ));
}
