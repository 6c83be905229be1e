//! Test helper module for identity-service integration tests.
//!
//! Provides common setup utilities for PostgreSQL-backed tests.

#![allow(dead_code)]

use async_trait::async_trait;
use identity_service::{
    config::{
        AuthConfig, DatabaseConfig, Environment, JwtConfig, MagicLinkConfig, SecurityConfig,
        SessionConfig, SmtpConfig,
    },
    db,
    error::AppError,
    models::{DeviceInfo, TokenPurpose, User},
    services::EmailProvider,
    AppState,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A magic-link email captured instead of sent.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub token: String,
    pub purpose: TokenPurpose,
}

/// Email provider that records outgoing mail for assertions.
#[derive(Default)]
pub struct MockEmailProvider {
    sent: Mutex<Vec<SentEmail>>,
}

impl MockEmailProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_token(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|e| e.token.clone())
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send_magic_link_email(
        &self,
        to_email: &str,
        link_token: &str,
        purpose: TokenPurpose,
        _base_url: &str,
    ) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to_email.to_string(),
            token: link_token.to_string(),
            purpose,
        });
        Ok(())
    }
}

pub fn test_config() -> AuthConfig {
    AuthConfig {
        environment: Environment::Dev,
        service_name: "identity-service".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        port: 0,
        database: DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/identity_test".to_string()),
            max_connections: 5,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: "integration-test-signing-secret".to_string(),
            access_token_ttl_seconds: 86400,
            refresh_token_ttl_seconds: 2_592_000,
        },
        magic_link: MagicLinkConfig { ttl_seconds: 900 },
        sessions: SessionConfig { max_concurrent: 5 },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            user: String::new(),
            password: String::new(),
            from_email: "no-reply@localhost".to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        app_base_url: "http://localhost:3000".to_string(),
    }
}

/// Connect to the test database, apply migrations and wire the app state
/// with a recording email provider.
pub async fn setup() -> (AppState, Arc<MockEmailProvider>) {
    dotenvy::dotenv().ok();

    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .try_init();

    let config = test_config();
    let pool = db::create_pool(&config.database)
        .await
        .expect("Failed to connect to test database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let email = Arc::new(MockEmailProvider::new());
    let state = AppState::new(config, pool, email.clone());

    (state, email)
}

/// Unique address per test run so suites do not interfere.
pub fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, Uuid::new_v4().simple())
}

pub async fn create_user(state: &AppState, email: &str) -> User {
    let user = User::new(email.to_string(), Some("Test User".to_string()));
    state
        .db
        .insert_user(&user)
        .await
        .expect("Failed to insert test user");
    user
}

pub fn test_device() -> DeviceInfo {
    DeviceInfo {
        device_type: "desktop".to_string(),
        browser: "Firefox".to_string(),
        ip: "203.0.113.7".to_string(),
    }
}
