//! Shared configuration handed to the session middleware and handlers.

use std::sync::Arc;

use crate::auth::cookie::SessionCookie;
use crate::auth::error::AuthError;
use crate::auth::session::{end_session, issue_session};
use crate::auth::store::IdentityStore;
use crate::record::Record;
use crate::types::CookieName;

/// Identity store plus the cookie name it is reached through.
///
/// Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct SessionState {
    store: Arc<dyn IdentityStore>,
    cookie_name: CookieName,
}

impl SessionState {
    pub fn new(store: Arc<dyn IdentityStore>, cookie_name: CookieName) -> Self {
        Self { store, cookie_name }
    }

    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    pub fn cookie_name(&self) -> &CookieName {
        &self.cookie_name
    }

    /// Mint a session for `identity` and return the cookie to attach.
    pub async fn issue_session(&self, identity: &Record) -> Result<SessionCookie, AuthError> {
        issue_session(self.store.as_ref(), &self.cookie_name, identity).await
    }

    /// Cookie that signs the client out.
    pub fn end_session(&self) -> SessionCookie {
        end_session(&self.cookie_name)
    }
}
