use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use tokenmill::auth::PasswordResetService;
use tokenmill::clock::ManualClock;
use tokenmill::error::AuthError;
use tokenmill::secret::RandomSecretSource;
use tokenmill::store::InMemoryTokenStore;

fn spawn_service() -> (PasswordResetService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::start_now());
    let service = PasswordResetService::new(
        Arc::new(InMemoryTokenStore::new()),
        clock.clone(),
        Arc::new(RandomSecretSource),
    );
    (service, clock)
}

#[tokio::test]
async fn reset_token_round_trip() {
    let (service, _) = spawn_service();
    let user_id = Uuid::new_v4();

    let (token, _expires_at) = service
        .create_token(user_id, Duration::minutes(30))
        .await
        .expect("Failed to create reset token");

    let consumed = service
        .validate_and_consume(&token)
        .await
        .expect("Fresh token should validate");
    assert_eq!(consumed, user_id);
}

#[tokio::test]
async fn requesting_again_invalidates_the_first_token() {
    let (service, _) = spawn_service();
    let user_id = Uuid::new_v4();

    let (first, _) = service
        .create_token(user_id, Duration::minutes(30))
        .await
        .unwrap();
    let (second, _) = service
        .create_token(user_id, Duration::minutes(30))
        .await
        .unwrap();

    // Only the most recently issued link is honorable, even though
    // the first has not expired.
    assert!(matches!(
        service.validate_and_consume(&first).await,
        Err(AuthError::InvalidOrExpired)
    ));
    assert_eq!(service.validate_and_consume(&second).await.unwrap(), user_id);
}

#[tokio::test]
async fn consumed_token_cannot_be_consumed_again() {
    let (service, _) = spawn_service();
    let user_id = Uuid::new_v4();

    let (token, _) = service
        .create_token(user_id, Duration::minutes(30))
        .await
        .unwrap();

    service.validate_and_consume(&token).await.unwrap();
    assert!(matches!(
        service.validate_and_consume(&token).await,
        Err(AuthError::InvalidOrExpired)
    ));
}

#[tokio::test]
async fn expired_token_is_rejected_with_the_same_error_as_unknown() {
    let (service, clock) = spawn_service();
    let user_id = Uuid::new_v4();

    let (token, _) = service
        .create_token(user_id, Duration::minutes(30))
        .await
        .unwrap();
    clock.advance(Duration::minutes(31));

    let expired = service.validate_and_consume(&token).await;
    let unknown = service.validate_and_consume("never-issued").await;

    // Deliberately indistinguishable.
    assert!(matches!(expired, Err(AuthError::InvalidOrExpired)));
    assert!(matches!(unknown, Err(AuthError::InvalidOrExpired)));
}

#[tokio::test]
async fn concurrent_consumption_has_one_winner() {
    let (service, _) = spawn_service();
    let service = Arc::new(service);
    let user_id = Uuid::new_v4();

    let (token, _) = service
        .create_token(user_id, Duration::minutes(30))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            service.validate_and_consume(&token).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.expect("Consumption task panicked") {
            Ok(consumed) => {
                assert_eq!(consumed, user_id);
                successes += 1;
            }
            Err(AuthError::InvalidOrExpired) => {}
            Err(other) => panic!("Unexpected failure under contention: {}", other),
        }
    }

    assert_eq!(successes, 1);
}
