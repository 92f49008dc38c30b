//! Transactional email: verification links, reset codes and change notices.

use anyhow::Result;
use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{error, info, warn};

use crate::AppState;

const SIGNATURE: &str = "Regards, <br>The Holochat team. <br>";

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivery backend. Implementations block, so callers go through [`deliver`].
pub trait Mailer: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Sends through an authenticated SMTP relay.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, username: &str, password: &str, from: &str) -> Result<Self> {
        let transport = SmtpTransport::relay(host)?
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self {
            transport,
            from: from.parse()?,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mail.to.parse()?)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(mail.html.clone())?;

        self.transport.send(&message)?;
        Ok(())
    }
}

/// Used when no SMTP relay is configured: the mail is only logged.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        info!("SMTP not configured, dropping mail to {}: {}", mail.to, mail.subject);
        Ok(())
    }
}

/// Send on the blocking pool. Failures are logged and never reach the client.
pub async fn deliver(state: &AppState, mail: OutgoingMail) {
    let mailer = state.mailer.clone();
    let to = mail.to.clone();

    match tokio::task::spawn_blocking(move || mailer.send(&mail)).await {
        Ok(Ok(())) => info!("Email sent to {}", to),
        Ok(Err(e)) => warn!("Failed to send email to {}: {:#}", to, e),
        Err(e) => error!("spawn_blocking join error: {}", e),
    }
}

pub fn verification_mail(to: &str, link: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Holochat : Email Verification".into(),
        html: format!(
            "<h1>You are almost there...</h1> <br><body>Click on the link to verify your account:<br>\
             <a href=\"{link}\">Click here!</a> <br><br><br>{SIGNATURE}</body>"
        ),
    }
}

pub fn reset_code_mail(to: &str, code: i64) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Holochat : Password Change".into(),
        html: format!(
            "<h1>We heard you needed help.</h1> <br><body>Here is your verification code:<br>\
             {code}<br>Please ignore this email if it was not you.<br><br>{SIGNATURE}</body>"
        ),
    }
}

pub fn password_changed_mail(to: &str) -> OutgoingMail {
    change_notice(to, "Password change", "Your password has been updated.")
}

pub fn nickname_changed_mail(to: &str) -> OutgoingMail {
    change_notice(to, "Nickname change", "Your Nickname has been updated.")
}

fn change_notice(to: &str, subject: &str, line: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: subject.to_string(),
        html: format!("<h1>We heard you made a change...</h1> <br><body>{line}<br><br>{SIGNATURE}</body>"),
    }
}
