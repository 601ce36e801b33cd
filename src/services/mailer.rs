//! Outbound email.
//!
//! Delivery failures never abort the workflow that triggered them: callers use
//! [`deliver`] which logs and reports the outcome instead of returning an error.

use async_trait::async_trait;
use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

impl EmailMessage {
    pub fn text(to: Vec<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to,
            subject: subject.into(),
            text_body: body.into(),
            html_body: None,
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), ServiceError>;
}

/// Sends through an SMTP relay with STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        from: &str,
    ) -> Result<Self, ServiceError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| ServiceError::EmailError(format!("Failed to create SMTP transport: {}", e)))?
            .port(port)
            .timeout(Some(Duration::from_secs(15)));

        if let (Some(username), Some(password)) = (username, password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        let from = from
            .parse()
            .map_err(|e| ServiceError::EmailError(format!("Invalid from address: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, msg: &EmailMessage) -> Result<Message, ServiceError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(msg.subject.clone());
        for recipient in &msg.to {
            let mailbox: Mailbox = recipient
                .parse()
                .map_err(|e| ServiceError::EmailError(format!("Invalid to address: {}", e)))?;
            builder = builder.to(mailbox);
        }

        let plain = SinglePart::builder()
            .header(header::ContentType::TEXT_PLAIN)
            .body(msg.text_body.clone());

        let result = match &msg.html_body {
            Some(html) => builder.multipart(
                MultiPart::alternative().singlepart(plain).singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_HTML)
                        .body(html.clone()),
                ),
            ),
            None => builder.singlepart(plain),
        };

        result.map_err(|e| ServiceError::EmailError(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), ServiceError> {
        let email = self.build_message(&message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| ServiceError::EmailError(format!("Failed to send email: {}", e)))?;
        info!(to = ?message.to, subject = %message.subject, "email sent");
        Ok(())
    }
}

/// Used when no SMTP host is configured; messages are only logged.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), ServiceError> {
        info!(
            to = ?message.to,
            subject = %message.subject,
            "SMTP not configured, email not delivered"
        );
        debug!(body = %message.text_body);
        Ok(())
    }
}

pub fn mailer_from_config(cfg: &AppConfig) -> Result<Arc<dyn Mailer>, ServiceError> {
    match cfg.smtp_host.as_deref().filter(|h| !h.is_empty()) {
        Some(host) => Ok(Arc::new(SmtpMailer::new(
            host,
            cfg.smtp_port,
            cfg.smtp_username.clone(),
            cfg.smtp_password.clone(),
            &cfg.mail_from,
        )?)),
        None => Ok(Arc::new(LogMailer)),
    }
}

/// Sends a message, logging failures. Returns whether delivery succeeded.
pub async fn deliver(mailer: &dyn Mailer, message: EmailMessage) -> bool {
    if message.to.is_empty() {
        debug!(subject = %message.subject, "email skipped, no recipients");
        return false;
    }
    let subject = message.subject.clone();
    match mailer.send(message).await {
        Ok(()) => true,
        Err(e) => {
            warn!(subject = %subject, error = %e, "email delivery failed");
            false
        }
    }
}

/// Message bodies for the workflow emails.
pub mod templates {
    use super::EmailMessage;

    pub fn vendor_registration_to_admins(
        admins: Vec<String>,
        company_name: &str,
        contact_person: &str,
        email: &str,
        phone: &str,
        username: &str,
        reference: &str,
    ) -> EmailMessage {
        EmailMessage::text(
            admins,
            format!("New Vendor Registration: {}", company_name),
            format!(
                "A new vendor has registered and is awaiting approval.\n\n\
                 Vendor Details:\n\
                 - Company: {company_name}\n\
                 - Contact Person: {contact_person}\n\
                 - Email: {email}\n\
                 - Phone: {phone}\n\
                 - Username: {username}\n\
                 - Temporary ID: {reference}\n\n\
                 Please review and approve/reject this vendor in the admin dashboard.\n\
                 Once approved, a permanent vendor code will be assigned and the vendor can login.\n"
            ),
        )
    }

    pub fn vendor_registration_received(
        to: &str,
        contact_person: &str,
        company_name: &str,
        username: &str,
        reference: &str,
    ) -> EmailMessage {
        EmailMessage::text(
            vec![to.to_string()],
            "Vendor Registration Received",
            format!(
                "Dear {contact_person},\n\n\
                 Thank you for registering with our procurement system.\n\n\
                 Your vendor registration has been received and is currently under review.\n\
                 You will receive an email notification once your account has been approved.\n\n\
                 Company: {company_name}\n\
                 Username: {username}\n\
                 Reference ID: {reference}\n\n\
                 Please save your username. You can use it to login once your account is approved.\n\n\
                 Best regards,\nProcurement Team\n"
            ),
        )
    }

    pub fn employee_credentials(
        to: &str,
        employee_name: &str,
        email: &str,
        department: &str,
        position: &str,
        username: &str,
        password: &str,
    ) -> EmailMessage {
        let html = format!(
            "<html><body style=\"font-family: Arial, sans-serif; color: #333;\">\
             <h2>New Employee Account Created</h2>\
             <p>A new employee account has been created.</p>\
             <h3>Employee Details</h3>\
             <p><strong>Name:</strong> {employee_name}</p>\
             <p><strong>Email:</strong> {email}</p>\
             <p><strong>Department:</strong> {department}</p>\
             <p><strong>Position:</strong> {position}</p>\
             <h3>Login Credentials</h3>\
             <p><strong>Username:</strong> <code>{username}</code></p>\
             <p><strong>Password:</strong> <code>{password}</code></p>\
             <p><strong>Important:</strong> Share these credentials securely with the employee.</p>\
             </body></html>"
        );
        EmailMessage::text(
            vec![to.to_string()],
            format!("New Employee: {} - Login Credentials", employee_name),
            format!("Employee: {employee_name}\nUsername: {username}\nPassword: {password}"),
        )
        .with_html(html)
    }

    pub fn vendor_approved(
        to: &str,
        contact_person: &str,
        company_name: &str,
        vendor_code: &str,
        username: Option<&str>,
    ) -> EmailMessage {
        EmailMessage::text(
            vec![to.to_string()],
            format!("Vendor Account Approved - {}", company_name),
            format!(
                "Dear {contact_person},\n\n\
                 Congratulations! Your vendor account has been approved.\n\n\
                 Company: {company_name}\n\
                 Vendor Code: {vendor_code}\n\
                 Username: {}\n\n\
                 You can now login to the vendor portal using the username and password you created during registration.\n\n\
                 Best regards,\nProcurement Team\n",
                username.unwrap_or("N/A")
            ),
        )
    }

    pub fn vendor_rejected(
        to: &str,
        contact_person: &str,
        company_name: &str,
        vendor_code: &str,
        reason: &str,
    ) -> EmailMessage {
        EmailMessage::text(
            vec![to.to_string()],
            format!("Vendor Registration Update - {}", company_name),
            format!(
                "Dear {contact_person},\n\n\
                 We regret to inform you that your vendor registration has not been approved.\n\n\
                 Company: {company_name}\n\
                 Vendor Code: {vendor_code}\n\n\
                 Reason: {reason}\n\n\
                 If you have any questions or would like to reapply, please contact our procurement team.\n\n\
                 Best regards,\nProcurement Team\n"
            ),
        )
    }

    pub fn invoice_submitted(
        admins: Vec<String>,
        invoice_number: &str,
        company_name: &str,
        po_number: &str,
        amount: &str,
        due_date: &str,
    ) -> EmailMessage {
        EmailMessage::text(
            admins,
            format!("New Invoice Received - {}", invoice_number),
            format!(
                "A new invoice has been submitted:\n\n\
                 Invoice Number: {invoice_number}\n\
                 Vendor: {company_name}\n\
                 PO Number: {po_number}\n\
                 Amount: \u{20b9}{amount}\n\
                 Due Date: {due_date}\n\n\
                 Please review in the admin dashboard.\n"
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for Recording {
        async fn send(&self, message: EmailMessage) -> Result<(), ServiceError> {
            self.sent.lock().await.push(message);
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Mailer for Broken {
        async fn send(&self, _message: EmailMessage) -> Result<(), ServiceError> {
            Err(ServiceError::EmailError("relay down".into()))
        }
    }

    #[tokio::test]
    async fn deliver_swallows_failures() {
        let msg = EmailMessage::text(vec!["a@example.com".into()], "s", "b");
        assert!(!deliver(&Broken, msg.clone()).await);

        let rec = Recording::default();
        assert!(deliver(&rec, msg.clone()).await);
        assert_eq!(rec.sent.lock().await.as_slice(), &[msg]);
    }

    #[tokio::test]
    async fn deliver_skips_empty_recipient_list() {
        let rec = Recording::default();
        assert!(!deliver(&rec, EmailMessage::text(vec![], "s", "b")).await);
        assert!(rec.sent.lock().await.is_empty());
    }

    #[test]
    fn approval_mail_names_code() {
        let msg = templates::vendor_approved("v@example.com", "Ann", "Acme", "VEND-1001", None);
        assert_eq!(msg.subject, "Vendor Account Approved - Acme");
        assert!(msg.text_body.contains("Vendor Code: VEND-1001"));
        assert!(msg.text_body.contains("Username: N/A"));
    }

    #[test]
    fn smtp_message_requires_valid_recipient() {
        let mailer = SmtpMailer::new("localhost", 2525, None, None, "Procurement <noreply@example.com>")
            .unwrap();
        let bad = EmailMessage::text(vec!["not an address".into()], "s", "b");
        assert!(mailer.build_message(&bad).is_err());

        let good = EmailMessage::text(vec!["a@example.com".into()], "s", "b").with_html("<p>b</p>");
        assert!(mailer.build_message(&good).is_ok());
    }
}
