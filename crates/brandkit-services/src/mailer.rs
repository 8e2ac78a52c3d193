//! Invitation emails. SMTP when configured, otherwise the message is logged
//! so local setups can still follow the accept link.

use std::sync::Arc;

use async_trait::async_trait;
use brandkit_core::models::UserRole;
use brandkit_core::{AppError, Config};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

#[derive(Debug, Clone)]
pub struct InvitationEmail {
    pub to: String,
    pub inviter_name: String,
    pub role: UserRole,
    pub client_names: Vec<String>,
    pub accept_url: String,
}

impl InvitationEmail {
    pub fn accept_url(frontend_url: &str, token: &str) -> String {
        format!(
            "{}/signup?token={}",
            frontend_url.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }

    pub fn subject(&self) -> String {
        format!("{} invited you to the brand portal", self.inviter_name)
    }

    pub fn body(&self) -> String {
        let mut body = format!(
            "Hi,\n\n{} has invited you to join the brand portal as {}.\n",
            self.inviter_name,
            self.role.as_str().replace('_', " ")
        );
        if !self.client_names.is_empty() {
            body.push_str(&format!(
                "You will have access to: {}.\n",
                self.client_names.join(", ")
            ));
        }
        body.push_str(&format!(
            "\nAccept the invitation here:\n{}\n\nThis link expires in {} days.\n",
            self.accept_url,
            brandkit_core::models::INVITATION_TTL_DAYS
        ));
        body
    }
}

#[async_trait]
pub trait InvitationMailer: Send + Sync {
    async fn send_invitation(&self, email: &InvitationEmail) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        tls: bool,
        credentials: Option<(String, String)>,
        from: &str,
    ) -> Result<Self, AppError> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid SMTP_FROM: {}", e)))?;

        let mailer = if tls {
            let b = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| AppError::Internal(format!("Invalid SMTP relay: {}", e)))?
                .port(port);
            let b = match credentials {
                Some((user, password)) => b.credentials(Credentials::new(user, password)),
                None => b,
            };
            tracing::info!(host = %host, port = port, "Mailer initialized (SMTP with STARTTLS)");
            b.build()
        } else {
            let b = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let b = match credentials {
                Some((user, password)) => b.credentials(Credentials::new(user, password)),
                None => b,
            };
            tracing::info!(host = %host, port = port, "Mailer initialized (SMTP)");
            b.build()
        };

        Ok(Self {
            mailer: Arc::new(mailer),
            from,
        })
    }
}

#[async_trait]
impl InvitationMailer for SmtpMailer {
    #[tracing::instrument(skip(self, email), fields(role = email.role.as_str()))]
    async fn send_invitation(&self, email: &InvitationEmail) -> Result<(), AppError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|_| AppError::InvalidInput(format!("Invalid email address: {}", email.to)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.mailer.send(message).await.map_err(|e| AppError::Integration {
            service: "SMTP",
            message: e.to_string(),
        })?;
        tracing::info!("Invitation email sent");
        Ok(())
    }
}

/// Writes invitations to the log instead of sending them
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl InvitationMailer for LogMailer {
    async fn send_invitation(&self, email: &InvitationEmail) -> Result<(), AppError> {
        tracing::info!(
            to = %email.to,
            role = email.role.as_str(),
            accept_url = %email.accept_url,
            "SMTP not configured; invitation email not sent"
        );
        Ok(())
    }
}

pub fn mailer_from_config(config: &Config) -> Arc<dyn InvitationMailer> {
    let (Some(host), Some(from)) = (config.smtp_host(), config.smtp_from()) else {
        tracing::debug!("SMTP_HOST or SMTP_FROM not set, invitations will be logged");
        return Arc::new(LogMailer);
    };

    let credentials = match (config.smtp_user(), config.smtp_password()) {
        (Some(user), Some(password)) => Some((user.to_string(), password.to_string())),
        _ => None,
    };
    match SmtpMailer::new(
        host,
        config.smtp_port().unwrap_or(587),
        config.smtp_tls(),
        credentials,
        from,
    ) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            tracing::error!(error = %e, "Failed to set up SMTP, invitations will be logged");
            Arc::new(LogMailer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> InvitationEmail {
        InvitationEmail {
            to: "new@acme.test".to_string(),
            inviter_name: "Dana".to_string(),
            role: UserRole::SuperAdmin,
            client_names: vec!["Acme".to_string(), "Globex".to_string()],
            accept_url: InvitationEmail::accept_url("https://brand.example.com/", "tok+1"),
        }
    }

    #[test]
    fn accept_url_points_at_signup() {
        assert_eq!(
            email().accept_url,
            "https://brand.example.com/signup?token=tok%2B1"
        );
    }

    #[test]
    fn body_lists_role_clients_and_link() {
        let body = email().body();
        assert!(body.contains("Dana has invited you"));
        assert!(body.contains("as super admin"));
        assert!(body.contains("Acme, Globex"));
        assert!(body.contains("signup?token=tok%2B1"));
        assert_eq!(email().subject(), "Dana invited you to the brand portal");
    }

    #[test]
    fn smtp_mailer_rejects_bad_sender() {
        assert!(SmtpMailer::new("localhost", 25, false, None, "not an address").is_err());
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        LogMailer.send_invitation(&email()).await.unwrap();
    }
}
