use askama::Template;
use chrono::{Datelike, Utc};

use super::OutgoingMail;
use crate::errors::AppError;

/// The OTP verification email, rendered as HTML with a plain-text fallback.
#[derive(Template)]
#[template(path = "email/otp.html")]
pub struct OtpEmail<'a> {
    pub user_name: &'a str,
    pub otp_code: &'a str,
    pub expiry_minutes: i64,
    pub site_name: &'a str,
    pub year: i32,
}

impl<'a> OtpEmail<'a> {
    pub fn new(user_name: &'a str, otp_code: &'a str, expiry_minutes: i64, site_name: &'a str) -> Self {
        OtpEmail {
            user_name,
            otp_code,
            expiry_minutes,
            site_name,
            year: Utc::now().year(),
        }
    }

    pub fn text_body(&self) -> String {
        format!(
            "Hello {},\n\nYour OTP code is {}. It will expire in {} minutes.\n\nThank you,\n{} Team",
            self.user_name, self.otp_code, self.expiry_minutes, self.site_name
        )
    }

    pub fn to_mail(&self, to_email: &str) -> Result<OutgoingMail, AppError> {
        Ok(OutgoingMail {
            to_name: self.user_name.to_string(),
            to_email: to_email.to_string(),
            subject: "Your OTP Verification Code".to_string(),
            text_body: self.text_body(),
            html_body: Some(self.render()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_email_contains_code_and_expiry() {
        let email = OtpEmail::new("Ravi", "482913", 10, "Omeiat Jobs");
        let html = email.render().unwrap();
        assert!(html.contains("482913"));
        assert!(html.contains("10 minutes"));
        assert!(email.text_body().starts_with("Hello Ravi,"));

        let mail = email.to_mail("ravi@example.com").unwrap();
        assert_eq!(mail.to_email, "ravi@example.com");
        assert_eq!(mail.subject, "Your OTP Verification Code");
        assert!(mail.html_body.is_some());
    }

    #[test]
    fn test_markup_in_names_is_escaped() {
        let email = OtpEmail::new("<script>alert(1)</script>", "482913", 10, "<b>Jobs</b>");
        let html = email.render().unwrap();
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>Jobs</b>"));
        assert!(html.contains("alert(1)"));
    }
}
