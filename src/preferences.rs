//! Client-side preference storage
//!
//! Preferences live in a small cookie jar with browser `document.cookie`
//! semantics: a cookie has a value, a path and an optional expiry, and
//! expired cookies read as absent. The jar can be backed by a file holding
//! one `Set-Cookie` style line per cookie.

use crate::errors::Result;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DARK_MODE_COOKIE: &str = "darkMode";

/// Lifetime of the dark mode cookie
pub const PREFERENCE_DAYS: i64 = 365;

const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Clone, Debug, PartialEq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
}

impl Cookie {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// `name=value; expires=...; path=/`
    pub fn to_set_cookie(&self) -> String {
        let mut line = format!("{}={}", self.name, self.value);
        if let Some(expires) = self.expires {
            line.push_str("; expires=");
            line.push_str(&expires.format(EXPIRES_FORMAT).to_string());
        }
        line.push_str("; path=");
        line.push_str(&self.path);
        line
    }

    /// Parse a `Set-Cookie` style line; unknown attributes are ignored
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split(';').map(str::trim);
        let (name, value) = parts.next()?.split_once('=')?;
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie {
            name: name.to_string(),
            value: value.to_string(),
            path: "/".to_string(),
            expires: None,
        };

        for attribute in parts {
            let Some((key, val)) = attribute.split_once('=') else {
                continue;
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "path" => cookie.path = val.trim().to_string(),
                "expires" => {
                    cookie.expires = NaiveDateTime::parse_from_str(val.trim(), EXPIRES_FORMAT)
                        .ok()
                        .map(|naive| naive.and_utc());
                }
                _ => {}
            }
        }

        Some(cookie)
    }
}

#[derive(Clone, Debug, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
    file: Option<PathBuf>,
}

impl CookieJar {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed jar; a missing file yields an empty jar
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut jar = CookieJar {
            cookies: Vec::new(),
            file: Some(path.to_path_buf()),
        };

        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Cookie file {} does not exist yet", path.display());
                return Ok(jar);
            }
            Err(e) => return Err(e.into()),
        };

        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            match Cookie::parse(line) {
                Some(cookie) => jar.insert(cookie),
                None => warn!("Skipping malformed cookie line in {}", path.display()),
            }
        }

        Ok(jar)
    }

    /// Set a cookie on path `/`, expiring `days` from `now` when given
    pub fn set_cookie(&mut self, name: &str, value: &str, days: Option<i64>, now: DateTime<Utc>) {
        self.insert(Cookie {
            name: name.to_string(),
            value: value.to_string(),
            path: "/".to_string(),
            expires: days.map(|d| now + Duration::days(d)),
        });
    }

    /// Value of a live cookie
    pub fn get_cookie(&self, name: &str, now: DateTime<Utc>) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name && !c.is_expired(now))
            .map(|c| c.value.as_str())
    }

    /// Write the jar back to its file, if it has one
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };

        let mut contents = String::new();
        for cookie in &self.cookies {
            contents.push_str(&cookie.to_set_cookie());
            contents.push('\n');
        }

        tokio::fs::write(path, contents).await?;
        debug!("Saved {} cookies to {}", self.cookies.len(), path.display());
        Ok(())
    }

    fn insert(&mut self, cookie: Cookie) {
        self.cookies
            .retain(|c| !(c.name == cookie.name && c.path == cookie.path));
        self.cookies.push(cookie);
    }
}

/// Dark mode flag stored in the `darkMode` cookie
#[derive(Clone, Debug, Default)]
pub struct DarkModePreference {
    jar: CookieJar,
}

impl DarkModePreference {
    pub fn new(jar: CookieJar) -> Self {
        Self { jar }
    }

    /// Only a live `"true"` cookie means dark
    pub fn is_dark(&self, now: DateTime<Utc>) -> bool {
        self.jar.get_cookie(DARK_MODE_COOKIE, now) == Some("true")
    }

    pub async fn store(&mut self, dark: bool, now: DateTime<Utc>) -> Result<()> {
        self.jar.set_cookie(
            DARK_MODE_COOKIE,
            if dark { "true" } else { "false" },
            Some(PREFERENCE_DAYS),
            now,
        );
        self.jar.save().await
    }
}
