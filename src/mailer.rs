use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::Settings;
use crate::error::ApiError;

pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ApiError>;
}

pub struct SmtpMailer {
    from: String,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn from_settings(settings: &Settings) -> Result<SmtpMailer, ApiError> {
        let transport = SmtpTransport::relay(&settings.smtp_server)
            .map_err(|e| ApiError::Delivery(e.to_string()))?
            .credentials(Credentials::new(
                settings.smtp_user.clone(),
                settings.smtp_pass.clone(),
            ))
            .build();
        Ok(SmtpMailer {
            from: settings.from_email.clone(),
            transport,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ApiError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|_| ApiError::Delivery("invalid sender address".to_string()))?,
            )
            .to(to
                .parse()
                .map_err(|_| ApiError::Delivery("invalid recipient address".to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| ApiError::Delivery(e.to_string()))?;

        tracing::debug!("sending mail to {}", to);
        self.transport.send(&message).map_err(|e| {
            tracing::error!("smtp send failed: {e}");
            ApiError::Delivery("Failed to send email. Please try again later.".to_string())
        })?;
        Ok(())
    }
}
