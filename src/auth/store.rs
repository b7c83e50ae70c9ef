//! Interfaces of the external identity store and access-rule engine.
//!
//! Both collaborators are owned by the embedding application. This crate only
//! consumes them: tokens are resolved and minted by the [`IdentityStore`],
//! access decisions are made by the [`AccessRuleEngine`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::auth::access::RequestInfo;
use crate::record::Record;
use crate::types::AuthToken;

/// Boxed future returned by collaborator calls.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Token lifecycle operations of the identity store.
pub trait IdentityStore: Send + Sync {
    /// Resolve a session token to the record it was minted for.
    ///
    /// Fails for invalid, expired or malformed tokens.
    fn resolve_token<'a>(&'a self, token: &'a AuthToken) -> StoreFuture<'a, Record>;

    /// Mint a new session token bound to `identity`.
    fn mint_token<'a>(&'a self, identity: &'a Record) -> StoreFuture<'a, AuthToken>;
}

/// Per-record access rule evaluation.
pub trait AccessRuleEngine: Send + Sync {
    /// Decide whether the identity in `info` may access `record`.
    ///
    /// `rule` of `None` selects the engine's default policy.
    fn can_access_record<'a>(
        &'a self,
        record: &'a Record,
        info: &'a RequestInfo,
        rule: Option<&'a str>,
    ) -> StoreFuture<'a, bool>;
}

/// Errors reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Token is invalid, expired or malformed
    InvalidToken(String),
    /// Referenced record does not exist
    NotFound(String),
    /// Access rule could not be parsed or evaluated
    InvalidRule(String),
    /// Storage or other backend failure
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            Self::NotFound(what) => write!(f, "Not found: {}", what),
            Self::InvalidRule(msg) => write!(f, "Invalid access rule: {}", msg),
            Self::Backend(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}
