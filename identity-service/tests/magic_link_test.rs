mod common;

use common::{create_user, setup, unique_email};
use identity_service::models::{LoginToken, TokenPurpose};
use identity_service::services::ServiceError;

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_issue_and_consume_login_link() {
    let (state, email) = setup().await;
    let address = unique_email("magic_login");
    create_user(&state, &address).await;

    let token = state
        .magic_links
        .issue(&address, TokenPurpose::Login, "http://localhost:3000")
        .await
        .unwrap();

    // The raw value went out by email, not in any response body
    assert_eq!(email.last_token().as_deref(), Some(token.as_str()));

    let (identifier, purpose) = state.magic_links.consume(&token).await.unwrap();
    assert_eq!(identifier, address);
    assert_eq!(purpose, TokenPurpose::Login);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_second_consume_fails_already_used() {
    let (state, _) = setup().await;
    let address = unique_email("magic_reuse");
    create_user(&state, &address).await;

    let token = state
        .magic_links
        .issue(&address, TokenPurpose::Login, "http://localhost:3000")
        .await
        .unwrap();

    state.magic_links.consume(&token).await.unwrap();

    let second = state.magic_links.consume(&token).await;
    assert!(matches!(second, Err(ServiceError::LinkAlreadyUsed)));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_concurrent_consumes_have_exactly_one_winner() {
    let (state, _) = setup().await;
    let address = unique_email("magic_race");
    create_user(&state, &address).await;

    let token = state
        .magic_links
        .issue(&address, TokenPurpose::Login, "http://localhost:3000")
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        state.magic_links.consume(&token),
        state.magic_links.consume(&token)
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one concurrent consume may win");

    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(ServiceError::LinkAlreadyUsed)));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_expired_link_rejected() {
    let (state, _) = setup().await;
    let address = unique_email("magic_expired");
    create_user(&state, &address).await;

    // TTL of zero seconds: expired the moment it lands
    let mut token = LoginToken::new(address.clone(), TokenPurpose::Login, 0);
    token.expires = chrono::Utc::now() - chrono::Duration::seconds(5);
    state.db.insert_login_token(&token).await.unwrap();

    let result = state.magic_links.consume(&token.token).await;
    assert!(matches!(result, Err(ServiceError::LinkExpired)));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_unknown_token_rejected() {
    let (state, _) = setup().await;

    let result = state.magic_links.consume("no-such-token").await;
    assert!(matches!(result, Err(ServiceError::LinkNotFound)));
}
