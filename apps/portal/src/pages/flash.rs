use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const FLASH_COOKIE: &str = "omeiat_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Error,
    Info,
}

impl FlashLevel {
    fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Error => "error",
            FlashLevel::Info => "info",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(FlashLevel::Success),
            "error" => Some(FlashLevel::Error),
            "info" => Some(FlashLevel::Info),
            _ => None,
        }
    }

    /// Bootstrap alert class.
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashLevel::Success => "alert-success",
            FlashLevel::Error => "alert-danger",
            FlashLevel::Info => "alert-info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    /// `level|message`, percent-encoded so any message is a legal cookie value.
    fn encode(&self) -> String {
        urlencoding::encode(&format!("{}|{}", self.level.as_str(), self.message)).into_owned()
    }

    fn decode(raw: &str) -> Option<Self> {
        let raw = urlencoding::decode(raw).ok()?;
        let (level, message) = raw.split_once('|')?;
        Some(Flash {
            level: FlashLevel::parse(level)?,
            message: message.to_string(),
        })
    }
}

pub fn set_flash(jar: CookieJar, level: FlashLevel, message: impl Into<String>) -> CookieJar {
    let flash = Flash {
        level,
        message: message.into(),
    };
    jar.add(
        Cookie::build((FLASH_COOKIE, flash.encode()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    )
}

/// Reads the pending message and removes the cookie so it shows once.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let flash = jar.get(FLASH_COOKIE).and_then(|c| Flash::decode(c.value()));
    if flash.is_some() {
        (jar.remove(Cookie::build(FLASH_COOKIE).path("/").build()), flash)
    } else {
        (jar, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_shown_once() {
        let jar = set_flash(CookieJar::new(), FlashLevel::Success, "Application submitted | thanks");
        let (jar, flash) = take_flash(jar);
        let flash = flash.unwrap();
        assert_eq!(flash.level, FlashLevel::Success);
        assert_eq!(flash.message, "Application submitted | thanks");
        assert!(jar.get(FLASH_COOKIE).is_none());
    }

    #[test]
    fn test_special_characters_survive_the_cookie() {
        let message = "Welcome back, ravi;k=\"1\" ₹ 100%!";
        let jar = set_flash(CookieJar::new(), FlashLevel::Info, message);
        let raw = jar.get(FLASH_COOKIE).unwrap().value().to_string();
        assert!(!raw.contains(';') && !raw.contains('"') && !raw.contains(' '));

        let (_, flash) = take_flash(jar);
        assert_eq!(flash.unwrap().message, message);
    }

    #[test]
    fn test_garbage_cookie_ignored() {
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE, "nonsense"));
        let (_, flash) = take_flash(jar);
        assert_eq!(flash, None);
    }
}
