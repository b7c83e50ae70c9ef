//! Session issuance and revocation.

use tracing::{debug, warn};

use crate::auth::cookie::{SessionCookie, build_cleared_cookie, build_session_cookie};
use crate::auth::error::AuthError;
use crate::auth::store::IdentityStore;
use crate::record::Record;
use crate::types::CookieName;

/// Mint a new token for an already authenticated `identity`.
///
/// Returns the session cookie for the caller to attach to its response.
/// A minting failure is fatal to the request and is returned as
/// [`AuthError::TokenGeneration`] with the store's cause.
pub async fn issue_session(
    store: &dyn IdentityStore,
    cookie_name: &CookieName,
    identity: &Record,
) -> Result<SessionCookie, AuthError> {
    let token = store.mint_token(identity).await.map_err(|e| {
        warn!("Failed to mint session token for {}: {}", identity.id(), e);
        AuthError::TokenGeneration(e)
    })?;

    debug!(
        "Issued session token {} for {}",
        token.fingerprint(),
        identity.id()
    );

    Ok(build_session_cookie(cookie_name, &token))
}

/// Cookie that deletes the session on the client (logout).
pub fn end_session(cookie_name: &CookieName) -> SessionCookie {
    build_cleared_cookie(cookie_name)
}
