//! In-memory collaborators used by the tests.

#![cfg(test)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::auth::access::RequestInfo;
use crate::auth::store::{AccessRuleEngine, IdentityStore, StoreError, StoreFuture};
use crate::record::Record;
use crate::types::{AuthToken, RecordId};

/// Identity store backed by a token map. Minted tokens become resolvable.
#[derive(Clone, Default)]
pub struct StubIdentityStore {
    tokens: Arc<Mutex<HashMap<String, Record>>>,
    resolve_error: Option<StoreError>,
    mint_error: Option<StoreError>,
    resolve_calls: Arc<AtomicUsize>,
    minted_for: Arc<Mutex<Vec<RecordId>>>,
}

impl StubIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, token: &str, record: Record) -> Self {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), record);
        self
    }

    pub fn failing_resolve(mut self, error: StoreError) -> Self {
        self.resolve_error = Some(error);
        self
    }

    pub fn failing_mint(mut self, error: StoreError) -> Self {
        self.mint_error = Some(error);
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn minted_for(&self) -> Vec<RecordId> {
        self.minted_for.lock().unwrap().clone()
    }
}

impl IdentityStore for StubIdentityStore {
    fn resolve_token<'a>(&'a self, token: &'a AuthToken) -> StoreFuture<'a, Record> {
        Box::pin(async move {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.resolve_error {
                return Err(err.clone());
            }
            self.tokens
                .lock()
                .unwrap()
                .get(token.as_str())
                .cloned()
                .ok_or_else(|| StoreError::InvalidToken("unknown token".to_string()))
        })
    }

    fn mint_token<'a>(&'a self, identity: &'a Record) -> StoreFuture<'a, AuthToken> {
        Box::pin(async move {
            if let Some(err) = &self.mint_error {
                return Err(err.clone());
            }
            let token = uuid::Uuid::new_v4().simple().to_string();
            self.tokens
                .lock()
                .unwrap()
                .insert(token.clone(), identity.clone());
            self.minted_for.lock().unwrap().push(identity.id().clone());
            Ok(AuthToken::new(token))
        })
    }
}

/// Arguments of the last rule evaluation.
#[derive(Debug, Clone)]
pub struct RuleCall {
    pub record: Record,
    pub rule: Option<String>,
    pub auth: Option<Record>,
}

/// Rule engine with a fixed answer that records what it was asked.
#[derive(Clone)]
pub struct StaticRuleEngine {
    outcome: Result<bool, StoreError>,
    last_call: Arc<Mutex<Option<RuleCall>>>,
}

impl StaticRuleEngine {
    pub fn allowing() -> Self {
        Self::with_outcome(Ok(true))
    }

    pub fn denying() -> Self {
        Self::with_outcome(Ok(false))
    }

    pub fn failing(error: StoreError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<bool, StoreError>) -> Self {
        Self {
            outcome,
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    pub fn last_call(&self) -> Option<RuleCall> {
        self.last_call.lock().unwrap().clone()
    }
}

impl AccessRuleEngine for StaticRuleEngine {
    fn can_access_record<'a>(
        &'a self,
        record: &'a Record,
        info: &'a RequestInfo,
        rule: Option<&'a str>,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            *self.last_call.lock().unwrap() = Some(RuleCall {
                record: record.clone(),
                rule: rule.map(str::to_string),
                auth: info.auth.clone(),
            });
            self.outcome.clone()
        })
    }
}
