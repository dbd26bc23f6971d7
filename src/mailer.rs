use log::info;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail seam. Delivery itself lives outside this service.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: OutgoingMail) -> Result<(), AppError>;
}

/// Writes mails to the application log instead of delivering them.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        info!("mail to={} subject={:?}\n{}", mail.to, mail.subject, mail.body);
        Ok(())
    }
}

pub fn activation_mail(to: &str, link: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Activate your user account.".to_string(),
        body: format!(
            "Hi {},\n\nPlease click on the link below to confirm your registration:\n\n{}\n",
            to, link
        ),
    }
}

pub fn password_reset_mail(to: &str, link: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Password Reset".to_string(),
        body: format!(
            "You're receiving this email because you requested a password reset for your account.\n\n\
             Please go to the following page and choose a new password:\n\n{}\n",
            link
        ),
    }
}
