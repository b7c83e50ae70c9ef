//! Cookie-based identity resolution.
//!
//! Resolution is fail-open: a missing cookie or a token the store rejects
//! both continue the request anonymously. A rejected token additionally
//! clears the cookie on the response. The only enforcement point is the
//! access authorizer.
//!
//! ## Usage
//!
//! ```ignore
//! let state = SessionState::new(store, CookieName::new("pb_auth"));
//! let app = Router::new()
//!     .route("/posts/{id}", get(show_post))
//!     .layer(axum::middleware::from_fn_with_state(state, session_middleware));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::HeaderMap;
use tracing::{debug, warn};

use crate::auth::context::RequestContext;
use crate::auth::cookie::{SessionCookie, build_cleared_cookie, find_cookie, prepend_set_cookie};
use crate::auth::error::AuthError;
use crate::auth::state::SessionState;
use crate::auth::store::IdentityStore;
use crate::record::Record;
use crate::types::{AuthToken, CookieName};

/// Outcome of resolving the session cookie of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The token resolved to this record
    Identity(Record),
    /// No session cookie, or an empty one
    Anonymous,
    /// The token was rejected; `clear` deletes it on the client
    Invalid { clear: SessionCookie },
}

impl Resolution {
    pub fn identity(&self) -> Option<&Record> {
        match self {
            Self::Identity(record) => Some(record),
            _ => None,
        }
    }

    pub fn cookie_to_clear(&self) -> Option<&SessionCookie> {
        match self {
            Self::Invalid { clear } => Some(clear),
            _ => None,
        }
    }

    /// Split into the request context and the optional cookie to clear.
    pub fn into_parts(self) -> (RequestContext, Option<SessionCookie>) {
        match self {
            Self::Identity(record) => (RequestContext::authenticated(record), None),
            Self::Anonymous => (RequestContext::anonymous(), None),
            Self::Invalid { clear } => (RequestContext::anonymous(), Some(clear)),
        }
    }
}

/// Resolve the session cookie `cookie_name` found in `headers`.
///
/// Never fails. The record returned by the store is passed through as is.
pub async fn resolve(
    store: &dyn IdentityStore,
    cookie_name: &CookieName,
    headers: &HeaderMap,
) -> Resolution {
    let Some(value) = find_cookie(headers, cookie_name.as_str()).filter(|v| !v.is_empty()) else {
        return Resolution::Anonymous;
    };

    let token = AuthToken::new(value);
    match store.resolve_token(&token).await {
        Ok(record) => {
            debug!(
                "Session token {} resolved to {}",
                token.fingerprint(),
                record.id()
            );
            Resolution::Identity(record)
        }
        Err(e) => {
            debug!(
                "Clearing session cookie {} ({}): {}",
                cookie_name,
                token.fingerprint(),
                AuthError::TokenInvalid(e)
            );
            Resolution::Invalid {
                clear: build_cleared_cookie(cookie_name),
            }
        }
    }
}

/// Axum middleware that attaches a [`RequestContext`] to every request.
///
/// Always runs the rest of the pipeline. When the token was rejected the
/// response gets exactly one cleared session cookie, placed before any
/// `Set-Cookie` line the handler produced.
pub async fn session_middleware(
    State(state): State<SessionState>,
    mut req: Request,
    next: Next,
) -> Response {
    let resolution = resolve(state.store().as_ref(), state.cookie_name(), req.headers()).await;
    let (context, clear) = resolution.into_parts();
    req.extensions_mut().insert(context);

    // Rendered before the handler runs; any cookie the handler sets lands after it.
    let clear = clear.and_then(|cookie| match cookie.to_header_value() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to clear session cookie: {}", e);
            None
        }
    });

    let mut response = next.run(req).await;

    if let Some(value) = clear {
        prepend_set_cookie(response.headers_mut(), value);
    }

    response
}
