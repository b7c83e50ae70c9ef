//! Session cookie construction and `Set-Cookie` rendering.
//!
//! A session cookie is always `Path=/; Secure; HttpOnly`. A freshly set
//! cookie carries no expiry and lives for the browser session. A cleared
//! cookie carries `Max-Age=-1` and an `Expires` at the Unix epoch so that
//! clients delete it regardless of clock skew.

use std::fmt;

use axum::response::{IntoResponseParts, ResponseParts};
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderValue, header};

use crate::auth::error::AuthError;
use crate::types::{AuthToken, CookieName};

/// Path attribute of every session cookie.
pub const COOKIE_PATH: &str = "/";

/// `Expires` attribute format (IMF-fixdate).
const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// A session cookie ready to be attached to a response.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    name: CookieName,
    value: String,
    path: &'static str,
    secure: bool,
    http_only: bool,
    expires: Option<DateTime<Utc>>,
    max_age: Option<i64>,
}

/// Build the cookie that carries a freshly minted session token.
pub fn build_session_cookie(name: &CookieName, token: &AuthToken) -> SessionCookie {
    SessionCookie {
        name: name.clone(),
        value: token.as_str().to_string(),
        path: COOKIE_PATH,
        secure: true,
        http_only: true,
        expires: None,
        max_age: None,
    }
}

/// Build the cookie that deletes the session cookie `name` on the client.
pub fn build_cleared_cookie(name: &CookieName) -> SessionCookie {
    SessionCookie {
        name: name.clone(),
        value: String::new(),
        path: COOKIE_PATH,
        secure: true,
        http_only: true,
        expires: Some(DateTime::UNIX_EPOCH),
        max_age: Some(-1),
    }
}

impl SessionCookie {
    pub fn name(&self) -> &CookieName {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn path(&self) -> &str {
        self.path
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn is_http_only(&self) -> bool {
        self.http_only
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    /// Whether this cookie instructs the client to delete the session.
    pub fn is_cleared(&self) -> bool {
        self.max_age.is_some_and(|age| age < 0)
    }

    /// Render the `Set-Cookie` header line.
    pub fn to_header_string(&self) -> String {
        let mut out = format!("{}={}; Path={}", self.name, self.value, self.path);
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", max_age));
        }
        if let Some(expires) = self.expires {
            out.push_str(&format!("; Expires={}", expires.format(EXPIRES_FORMAT)));
        }
        out
    }

    /// Render the cookie as a `Set-Cookie` header value.
    ///
    /// Fails when the name or token contains bytes not allowed in a header.
    pub fn to_header_value(&self) -> Result<HeaderValue, AuthError> {
        HeaderValue::from_str(&self.to_header_string())
            .map_err(|e| AuthError::InvalidCookie(format!("{} ({})", e, self.name)))
    }

    /// Append the cookie to `headers` without replacing other `Set-Cookie` lines.
    pub fn append_to(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        headers.append(header::SET_COOKIE, self.to_header_value()?);
        Ok(())
    }
}

/// Put `value` first among the `Set-Cookie` lines of `headers`.
///
/// Clients apply `Set-Cookie` lines in order, so a later line for the same
/// name and path overrides this one.
pub(crate) fn prepend_set_cookie(headers: &mut HeaderMap, value: HeaderValue) {
    let existing: Vec<HeaderValue> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .cloned()
        .collect();
    headers.remove(header::SET_COOKIE);
    headers.append(header::SET_COOKIE, value);
    for line in existing {
        headers.append(header::SET_COOKIE, line);
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.value.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &value)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("expires", &self.expires)
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl IntoResponseParts for SessionCookie {
    type Error = AuthError;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.append_to(res.headers_mut())?;
        Ok(res)
    }
}

/// Find the value of cookie `name` across all `Cookie` request headers.
///
/// Returns the first match. Surrounding double quotes are stripped.
pub fn find_cookie<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| {
            let value = value.trim();
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value)
        })
}
