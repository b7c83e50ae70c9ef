//! Request-scoped identity.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::record::Record;

/// Identity resolved for the current request.
///
/// Inserted into the request extensions by the session middleware and
/// extracted by handlers. It lives for exactly one request and is never
/// shared between requests. `auth` is `None` for anonymous requests, which
/// are valid; access decisions are made by the authorizer, not here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    auth: Option<Record>,
}

impl RequestContext {
    /// Context for a request without a usable session.
    pub fn anonymous() -> Self {
        Self { auth: None }
    }

    /// Context for a request whose session resolved to `record`.
    pub fn authenticated(record: Record) -> Self {
        Self { auth: Some(record) }
    }

    /// The resolved identity, if any.
    pub fn auth(&self) -> Option<&Record> {
        self.auth.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    pub fn into_auth(self) -> Option<Record> {
        self.auth
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    // Without the session middleware every request is anonymous.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}
