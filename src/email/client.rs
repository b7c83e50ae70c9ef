//! HTTP implementation of [`EmailChallenger`].

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::email::{EmailChallenger, EmailError, EmailFuture, email_domain};
use crate::types::OtpId;

/// Endpoint that emails a verification link.
pub const REQUEST_VERIFICATION_PATH: &str = "/api/collections/users/request-verification";

/// Endpoint that emails a one-time passcode.
pub const REQUEST_OTP_PATH: &str = "/api/collections/users/request-otp";

#[derive(Debug, Serialize)]
struct EmailChallengeRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct OtpResponse {
    #[serde(rename = "otpId")]
    otp_id: String,
}

/// Sends email challenges to the identity service over HTTP.
///
/// Cloning is cheap; clones share the connection pool of the underlying
/// `reqwest::Client`, which is safe for concurrent use.
#[derive(Debug, Clone)]
pub struct HttpEmailChallenger {
    /// Address of the identity service (e.g., http://localhost:8090)
    base_url: String,
    client: reqwest::Client,
}

impl HttpEmailChallenger {
    /// Create a challenger using a default HTTP client (no timeout).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Use a caller-configured HTTP client (timeouts, proxies, TLS).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// POST `{"email": ..}` to `path`, racing the exchange against `cancel`.
    async fn post_challenge(
        &self,
        cancel: &CancellationToken,
        path: &str,
        email: &str,
    ) -> Result<reqwest::Response, EmailError> {
        let request = self
            .client
            .post(self.endpoint(path))
            .json(&EmailChallengeRequest { email })
            .build()
            .map_err(build_error)?;

        debug!(
            "Sending email challenge to {} for an address at {}",
            request.url(),
            email_domain(email)
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EmailError::Cancelled),
            result = self.client.execute(request) => {
                result.map_err(|e| EmailError::Transport(format!("failed to send POST request: {}", e)))
            }
        }
    }

    async fn send_verification(
        &self,
        cancel: &CancellationToken,
        email: &str,
    ) -> Result<(), EmailError> {
        let response = self
            .post_challenge(cancel, REQUEST_VERIFICATION_PATH, email)
            .await?;

        // Non-2xx statuses are logged, not returned.
        if !response.status().is_success() {
            warn!(
                "Identity service answered {} to a verification request for an address at {}",
                response.status(),
                email_domain(email)
            );
        }

        Ok(())
    }

    async fn send_otp(&self, cancel: &CancellationToken, email: &str) -> Result<OtpId, EmailError> {
        let response = self.post_challenge(cancel, REQUEST_OTP_PATH, email).await?;
        let status = response.status();

        // Reading the body can stall as long as sending did.
        let body: OtpResponse = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EmailError::Cancelled),
            result = response.json::<OtpResponse>() => result.map_err(|e| {
                if e.is_decode() {
                    if !status.is_success() {
                        warn!("Identity service answered {} to an OTP request", status);
                    }
                    EmailError::Decode(e.to_string())
                } else {
                    EmailError::Transport(format!("failed to read response body: {}", e))
                }
            })?,
        };

        debug!("OTP challenge {} issued", body.otp_id);
        Ok(OtpId::new(body.otp_id))
    }
}

/// A request that could not be built: its JSON body or its URL was rejected.
fn build_error(e: reqwest::Error) -> EmailError {
    let is_json = std::error::Error::source(&e).is_some_and(|s| s.is::<serde_json::Error>());
    if is_json {
        EmailError::Encode(e.to_string())
    } else {
        EmailError::Transport(format!("failed to create HTTP request: {}", e))
    }
}

impl EmailChallenger for HttpEmailChallenger {
    fn request_verification<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        email: &'a str,
    ) -> EmailFuture<'a, ()> {
        Box::pin(self.send_verification(cancel, email))
    }

    fn request_otp<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        email: &'a str,
    ) -> EmailFuture<'a, OtpId> {
        Box::pin(self.send_otp(cancel, email))
    }
}
