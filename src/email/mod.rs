//! Delivery of one-time codes.

pub mod console;
pub mod smtp;

use async_trait::async_trait;

use crate::store::OtpPurpose;

pub use console::ConsoleMailer;
pub use smtp::SmtpMailer;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Subject and plain-text body for a code sent for `purpose`.
pub fn otp_message(code: &str, purpose: OtpPurpose) -> (&'static str, String) {
    match purpose {
        OtpPurpose::Registration => (
            "Swasthya AI - Email Verification",
            format!(
                "Hello,\n\nYour verification code for Swasthya AI is: {code}\n\n\
                 This code expires in 10 minutes."
            ),
        ),
        OtpPurpose::PasswordReset => (
            "Swasthya AI - Password Reset",
            format!(
                "Hello,\n\nYour password reset code for Swasthya AI is: {code}\n\n\
                 This code expires in 10 minutes. If you did not ask for it, ignore this email."
            ),
        ),
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every message instead of sending it.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String, String)>>,
    }

    impl RecordingMailer {
        /// Last six-digit code mailed to `to`.
        pub fn last_code(&self, to: &str) -> Option<String> {
            let sent = self.sent.lock().unwrap();
            sent.iter().rev().find(|(t, _, _)| t == to).and_then(|(_, _, body)| {
                body.split(|c: char| !c.is_ascii_digit())
                    .find(|w| w.len() == 6)
                    .map(str::to_string)
            })
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_contains_code() {
        let (subject, body) = otp_message("123456", OtpPurpose::Registration);
        assert!(subject.contains("Verification"));
        assert!(body.contains("123456"));

        let (subject, body) = otp_message("654321", OtpPurpose::PasswordReset);
        assert!(subject.contains("Password Reset"));
        assert!(body.contains("654321"));
    }

    #[tokio::test]
    async fn recording_mailer_finds_last_code() {
        let mailer = testing::RecordingMailer::default();
        let (s, b) = otp_message("111111", OtpPurpose::Registration);
        mailer.send("a@gmail.com", s, &b).await.unwrap();
        let (s, b) = otp_message("222222", OtpPurpose::PasswordReset);
        mailer.send("a@gmail.com", s, &b).await.unwrap();
        assert_eq!(mailer.last_code("a@gmail.com").as_deref(), Some("222222"));
        assert_eq!(mailer.last_code("b@gmail.com"), None);
    }
}
