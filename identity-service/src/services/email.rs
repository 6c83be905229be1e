use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::time::Duration;

use crate::error::AppError;
use crate::models::TokenPurpose;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_magic_link_email(
        &self,
        to_email: &str,
        link_token: &str,
        purpose: TokenPurpose,
        base_url: &str,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
    link_ttl_minutes: i64,
}

impl EmailService {
    pub fn new(
        config: &crate::config::SmtpConfig,
        link_ttl_seconds: i64,
    ) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.from_email.clone(),
            link_ttl_minutes: (link_ttl_seconds / 60).max(1),
        })
    }

    /// Render the subject and both bodies for a magic-link mail. The expiry
    /// wording follows the configured link TTL.
    fn compose_link_email(&self, purpose: TokenPurpose, link: &str) -> (String, String, String) {
        let (subject, heading, action) = match purpose {
            TokenPurpose::Login => ("Your sign-in link", "Sign in to your account", "Sign in"),
            TokenPurpose::Signup => (
                "Finish creating your account",
                "Welcome! Confirm your email to get started",
                "Create account",
            ),
        };
        let expiry = if self.link_ttl_minutes == 1 {
            "1 minute".to_string()
        } else {
            format!("{} minutes", self.link_ttl_minutes)
        };

        let html_body = format!(
            r###"<html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>{heading}</h2>
                    <p>Click the button below to {action}. This link can be used once and expires in {expiry}.</p>
                    <p>
                        <a href="{link}" style="display: inline-block; padding: 12px 24px; background-color: #2563eb; color: #ffffff; text-decoration: none; border-radius: 4px;">{action}</a>
                    </p>
                    <p>If the button does not work, copy this URL into your browser:</p>
                    <p>{link}</p>
                    <p>If you did not request this email, you can safely ignore it.</p>
                </body>
            </html>"###,
        );

        let plain_body = format!(
            "{heading}\n\nOpen this link to {action} (single use, expires in {expiry}):\n{link}\n\nIf you did not request this email, you can safely ignore it.\n",
        );

        (subject.to_string(), plain_body, html_body)
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::InternalError(e.into()))?;

        // Send email in blocking thread pool to avoid blocking async runtime
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e.to_string(), to = %to_email, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_magic_link_email(
        &self,
        to_email: &str,
        link_token: &str,
        purpose: TokenPurpose,
        base_url: &str,
    ) -> Result<(), AppError> {
        let link = format!("{}/api/auth/verify?token={}", base_url, link_token);
        let (subject, plain_body, html_body) = self.compose_link_email(purpose, &link);

        self.send_email(to_email, &subject, &plain_body, &html_body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmtpConfig;

    fn smtp_config() -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            user: String::new(),
            password: String::new(),
            from_email: "no-reply@localhost".to_string(),
        }
    }

    #[test]
    fn test_expiry_wording_follows_configured_ttl() {
        let service = EmailService::new(&smtp_config(), 300).unwrap();
        let (_, plain, html) = service.compose_link_email(TokenPurpose::Login, "http://x/verify");
        assert!(plain.contains("expires in 5 minutes"));
        assert!(html.contains("expires in 5 minutes"));
    }

    #[test]
    fn test_sub_minute_ttl_rounds_up_to_one_minute() {
        let service = EmailService::new(&smtp_config(), 30).unwrap();
        let (_, plain, _) = service.compose_link_email(TokenPurpose::Signup, "http://x/verify");
        assert!(plain.contains("expires in 1 minute"));
    }

    #[test]
    fn test_link_appears_in_both_bodies() {
        let service = EmailService::new(&smtp_config(), 900).unwrap();
        let link = "http://app.example.com/api/auth/verify?token=abc";
        let (_, plain, html) = service.compose_link_email(TokenPurpose::Login, link);
        assert!(plain.contains(link));
        assert!(html.contains(link));
    }
}
