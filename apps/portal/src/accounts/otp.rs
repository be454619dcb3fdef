use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;

use crate::errors::AppError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("No verification code is pending for this account.")]
    NoPendingCode,

    #[error("The verification code has expired. Please request a new one.")]
    Expired,

    #[error("The verification code is incorrect.")]
    Mismatch,

    #[error("Too many incorrect attempts. Please request a new code.")]
    TooManyAttempts,
}

/// Wrong guesses allowed against one issued code before it is burned.
pub const MAX_OTP_ATTEMPTS: i32 = 5;

impl From<OtpError> for AppError {
    fn from(e: OtpError) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// A freshly issued code and the moment it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Six decimal digits, never starting with zero.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

pub fn issue_otp(now: DateTime<Utc>, ttl_minutes: i64) -> IssuedOtp {
    IssuedOtp {
        code: generate_otp(),
        expires_at: now + Duration::minutes(ttl_minutes),
    }
}

/// Accepts `submitted` only if a code is pending, unexpired, identical, and
/// fewer than `MAX_OTP_ATTEMPTS` wrong guesses have been made against it.
pub fn check_otp(
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    failed_attempts: i32,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<(), OtpError> {
    if failed_attempts >= MAX_OTP_ATTEMPTS {
        return Err(OtpError::TooManyAttempts);
    }
    let stored = stored.filter(|s| !s.is_empty()).ok_or(OtpError::NoPendingCode)?;
    match expires_at {
        Some(deadline) if now <= deadline => {}
        _ => return Err(OtpError::Expired),
    }
    if stored == submitted.trim() {
        Ok(())
    } else {
        Err(OtpError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_six_digits() {
        for _ in 0..200 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.chars().next(), Some('0'));
        }
    }

    #[test]
    fn test_issue_sets_expiry() {
        let now = Utc::now();
        let issued = issue_otp(now, 10);
        assert_eq!(issued.expires_at - now, Duration::minutes(10));
    }

    #[test]
    fn test_matching_code_accepted() {
        let now = Utc::now();
        let deadline = now + Duration::minutes(5);
        assert_eq!(check_otp(Some("123456"), Some(deadline), 0, " 123456 ", now), Ok(()));
    }

    #[test]
    fn test_wrong_code_rejected() {
        let now = Utc::now();
        let deadline = now + Duration::minutes(5);
        assert_eq!(
            check_otp(Some("123456"), Some(deadline), 0, "654321", now),
            Err(OtpError::Mismatch)
        );
    }

    #[test]
    fn test_expired_code_rejected_even_if_matching() {
        let now = Utc::now();
        let deadline = now - Duration::seconds(1);
        assert_eq!(
            check_otp(Some("123456"), Some(deadline), 0, "123456", now),
            Err(OtpError::Expired)
        );
    }

    #[test]
    fn test_no_pending_code() {
        let now = Utc::now();
        assert_eq!(check_otp(None, None, 0, "123456", now), Err(OtpError::NoPendingCode));
        assert_eq!(
            check_otp(Some(""), Some(now), 0, "", now),
            Err(OtpError::NoPendingCode)
        );
    }

    #[test]
    fn test_locked_after_too_many_wrong_guesses() {
        let now = Utc::now();
        let deadline = now + Duration::minutes(5);
        assert_eq!(
            check_otp(Some("123456"), Some(deadline), MAX_OTP_ATTEMPTS - 1, "123456", now),
            Ok(())
        );
        assert_eq!(
            check_otp(Some("123456"), Some(deadline), MAX_OTP_ATTEMPTS, "123456", now),
            Err(OtpError::TooManyAttempts)
        );
    }
}
