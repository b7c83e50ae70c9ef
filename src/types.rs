//! NewType wrappers for the string identifiers that cross the session boundary.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing a cookie name where a session token is expected).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Name of the cookie that carries the session token (e.g., "pb_auth").
    ///
    /// Supplied by the embedding application. The same name is used to read
    /// the incoming cookie, to set a fresh session and to clear a stale one.
    CookieName
);

newtype_string!(
    /// Store identifier of a record (e.g., "u_4k2x9q").
    ///
    /// Opaque to this crate; only used for logging and equality.
    RecordId
);

newtype_string!(
    /// Correlation id returned by the identity service for an OTP challenge.
    ///
    /// The client later exchanges it, together with the emailed passcode,
    /// for a completed sign-in.
    OtpId
);

/// Number of hex characters kept in a token fingerprint.
const FINGERPRINT_LEN: usize = 12;

/// Opaque session credential minted and verified by the identity store.
///
/// The value is never decoded here. `Debug` is redacted and there is no
/// `Display` impl so that tokens do not leak into logs; use
/// [`AuthToken::fingerprint`] when a log line needs to correlate tokens.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    /// Create a new token from its raw value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the raw token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the raw token value.
    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short SHA-256 prefix of the token, safe to log.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..FINGERPRINT_LEN].to_string()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken(<redacted:{}>)", self.fingerprint())
    }
}

impl From<String> for AuthToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AuthToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
