// Core modules
mod config;
mod record;
mod types;

pub mod auth;
pub mod email;

// Re-export key types and functions
pub use auth::{
    AccessRuleEngine, AuthError, IdentityStore, RequestContext, RequestInfo, Resolution,
    SessionCookie, SessionState, StoreError, authorize, authorize_request, build_cleared_cookie,
    build_session_cookie, end_session, issue_session, resolve, session_middleware,
};
pub use config::{DEFAULT_COOKIE_NAME, DEFAULT_IDENTITY_SERVICE_URL, SessionConfig};
pub use email::{EmailChallenger, EmailError, HttpEmailChallenger};
pub use record::Record;
pub use types::{AuthToken, CookieName, OtpId, RecordId};
