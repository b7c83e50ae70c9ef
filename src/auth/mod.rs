//! Cookie session boundary.
//!
//! This module resolves the identity of inbound requests from a session
//! cookie, issues and revokes session cookies, and authorizes access to
//! individual records. Token handling and rule evaluation are delegated to
//! the embedding application through [`IdentityStore`] and
//! [`AccessRuleEngine`].
//!
//! ## Security Model
//!
//! - Identity resolution is fail-open: a missing or rejected token makes the
//!   request anonymous, it never aborts it
//! - A rejected token is cleared on the client with an epoch-expired cookie
//! - [`authorize`] is the single enforcement point for record access
//! - The resolved identity travels in the request extensions, never in
//!   global state
//!
//! ## Usage
//!
//! ```ignore
//! async fn login(
//!     State(state): State<SessionState>,
//!     Json(creds): Json<Credentials>,
//! ) -> Result<impl IntoResponse, AuthError> {
//!     let user = check_credentials(&creds).await?;
//!     let cookie = state.issue_session(&user).await?;
//!     Ok((cookie, Json(user)))
//! }
//! ```

mod access;
mod context;
mod cookie;
mod error;
mod resolver;
mod session;
mod state;
mod store;

mod integration_tests;
pub(crate) mod testing;

pub use access::{RequestInfo, authorize, authorize_request};
pub use context::RequestContext;
pub use cookie::{
    COOKIE_PATH, SessionCookie, build_cleared_cookie, build_session_cookie, find_cookie,
};
pub use error::AuthError;
pub use resolver::{Resolution, resolve, session_middleware};
pub use session::{end_session, issue_session};
pub use state::SessionState;
pub use store::{AccessRuleEngine, IdentityStore, StoreError, StoreFuture};
