//! Per-record access authorization.
//!
//! The rule engine decides; this module only snapshots the request and maps
//! a negative decision to [`AuthError::Forbidden`].

use std::collections::BTreeMap;

use http::{header, request::Parts};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::auth::context::RequestContext;
use crate::auth::error::AuthError;
use crate::auth::store::AccessRuleEngine;
use crate::record::Record;

/// Snapshot of the request handed to the rule engine.
///
/// Header names are lower-case; repeated headers are joined with ", ".
/// Headers whose values are not valid UTF-8 are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    /// JSON or form body; `Null` when the request had none.
    pub body: Value,
    /// Identity resolved for the request, `None` when anonymous.
    pub auth: Option<Record>,
}

impl RequestInfo {
    /// Build the snapshot from request parts and the raw body.
    ///
    /// The identity is taken from the [`RequestContext`] in the extensions.
    pub fn from_parts(parts: &Parts, body: &[u8]) -> Result<Self, AuthError> {
        let query = parts
            .uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in parts.headers.iter() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        let auth = parts
            .extensions
            .get::<RequestContext>()
            .and_then(|ctx| ctx.auth().cloned());

        Ok(Self {
            method: parts.method.as_str().to_string(),
            path: parts.uri.path().to_string(),
            query,
            headers,
            body: parse_body(parts, body)?,
            auth,
        })
    }

    /// Replace the identity carried by the snapshot.
    pub fn with_auth(mut self, auth: Option<Record>) -> Self {
        self.auth = auth;
        self
    }
}

fn parse_body(parts: &Parts, body: &[u8]) -> Result<Value, AuthError> {
    if body.is_empty() {
        return Ok(Value::Null);
    }

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        return serde_json::from_slice(body)
            .map_err(|e| AuthError::RequestInfo(format!("body is not valid JSON: {}", e)));
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let form: Map<String, Value> = url::form_urlencoded::parse(body)
            .into_owned()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        return Ok(Value::Object(form));
    }

    // Other bodies are opaque to rule evaluation.
    Ok(Value::Null)
}

/// Check whether the identity in `info` may access `record` under `rule`.
///
/// Returns [`AuthError::Forbidden`] when the engine says no and
/// [`AuthError::Store`] with the engine's error unchanged when evaluation
/// itself fails.
pub async fn authorize(
    engine: &dyn AccessRuleEngine,
    info: &RequestInfo,
    record: &Record,
    rule: Option<&str>,
) -> Result<(), AuthError> {
    let allowed = engine
        .can_access_record(record, info, rule)
        .await
        .map_err(AuthError::Store)?;

    if !allowed {
        debug!(
            "Access to {}/{} denied for {}",
            record.collection(),
            record.id(),
            info.auth
                .as_ref()
                .map(|r| r.id().to_string())
                .unwrap_or_else(|| "anonymous".to_string())
        );
        return Err(AuthError::Forbidden);
    }

    Ok(())
}

/// Snapshot the request and authorize access to `record`.
pub async fn authorize_request(
    engine: &dyn AccessRuleEngine,
    parts: &Parts,
    body: &[u8],
    record: &Record,
    rule: Option<&str>,
) -> Result<(), AuthError> {
    let info = RequestInfo::from_parts(parts, body)?;
    authorize(engine, &info, record, rule).await
}
