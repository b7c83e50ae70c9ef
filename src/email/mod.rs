//! Out-of-band email challenges.
//!
//! Passwordless and verification flows start by asking the identity service
//! to email the user. Two challenges are supported:
//!
//! - **Verification**: a link with a token that verifies (and signs in) the user
//! - **OTP**: a one-time passcode; the service answers with an `otpId` that the
//!   client later submits together with the passcode
//!
//! Each call makes at most one delivery attempt and can be aborted through a
//! [`CancellationToken`].

mod client;
mod error;

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::types::OtpId;

pub use client::{HttpEmailChallenger, REQUEST_OTP_PATH, REQUEST_VERIFICATION_PATH};
pub use error::EmailError;

/// Boxed future returned by [`EmailChallenger`] calls.
pub type EmailFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, EmailError>> + Send + 'a>>;

/// Dispatches email challenges to the identity service.
pub trait EmailChallenger: Send + Sync {
    /// Email a verification link to `email`.
    ///
    /// The address must already belong to a registered user.
    fn request_verification<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        email: &'a str,
    ) -> EmailFuture<'a, ()>;

    /// Email a one-time passcode to `email` and return its correlation id.
    ///
    /// The address must already belong to a registered user.
    fn request_otp<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        email: &'a str,
    ) -> EmailFuture<'a, OtpId>;
}

/// Domain part of an address, for logging without the local part.
pub(crate) fn email_domain(email: &str) -> &str {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .unwrap_or("<invalid>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_domain() {
        assert_eq!(email_domain("user@example.com"), "example.com");
        assert_eq!(email_domain("a@b@c.org"), "c.org");
        assert_eq!(email_domain("not-an-email"), "<invalid>");
    }
}
