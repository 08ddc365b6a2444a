//! Google OAuth callback processing.
//!
//! After the provider redirects back, the URL carries a `session_id` (in the
//! fragment or the query string). It is exchanged with the backend in a
//! bounded retry loop; network-class failures are retried after a fixed
//! backoff, everything else ends the flow. Exactly one outcome is produced,
//! chosen in a fixed priority order.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{info, instrument, warn};
use url::Url;

use crate::api::ApiClient;
use crate::api::auth::{AuthResponse, User};
use crate::error::{ClientError, ValidationError};

use super::mfa::MfaChallenge;
use super::session_parts;

const SESSION_ID_PARAM: &str = "session_id";

/// Parameters extracted from the redirect URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub session_id: String,
}

impl CallbackParams {
    /// Extract `session_id`, preferring the fragment over the query string.
    ///
    /// # Errors
    ///
    /// Returns `MissingSessionId` if neither carries a non-empty value.
    pub fn from_url(url: &Url) -> Result<Self, ValidationError> {
        let from_fragment = url.fragment().and_then(|fragment| {
            // Fragments may be written as "#/path?session_id=..." by some routers
            let pairs = fragment.rsplit_once('?').map_or(fragment, |(_, q)| q);
            find_param(url::form_urlencoded::parse(pairs.as_bytes()))
        });

        from_fragment
            .or_else(|| find_param(url.query_pairs()))
            .map(|session_id| Self { session_id })
            .ok_or(ValidationError::MissingSessionId)
    }

    /// Parse a raw URL string.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Url` if the string is not a URL, or
    /// `MissingSessionId`.
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        let url = Url::parse(raw.trim())?;
        Ok(Self::from_url(&url)?)
    }
}

fn find_param(mut pairs: url::form_urlencoded::Parse<'_>) -> Option<String> {
    pairs
        .find(|(key, value)| key == SESSION_ID_PARAM && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
}

/// Retry limits for the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub backoff: Duration,
    /// Timeout for a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(15),
        }
    }
}

/// Cancellation signal shared between the flow and its owner.
///
/// Cancelling interrupts a backoff sleep or an in-flight request and
/// prevents any further attempt.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    /// A handle that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this only ends by observing `true`
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Lifecycle of one callback flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackState {
    Idle,
    Processing { attempt: u32 },
    Done,
    Failed,
    Cancelled,
}

/// Where the user goes next. Exactly one is produced per flow.
#[derive(Debug)]
pub enum CallbackOutcome {
    /// Second factor needed; nothing persisted.
    MfaRequired(MfaChallenge),
    /// Terms must be accepted first; the token is handed over unpersisted
    /// for [`AuthService::accept_terms`](super::AuthService::accept_terms).
    TermsRequired { token: SecretString, user: User },
    /// Creator must complete the profile; token persisted.
    ProfileIncomplete(User),
    /// Token persisted; fully logged in.
    LoggedIn(User),
}

/// One OAuth callback exchange.
#[derive(Debug)]
pub struct OAuthCallback {
    api: ApiClient,
    policy: RetryPolicy,
    cancel: CancelHandle,
    state: CallbackState,
}

impl OAuthCallback {
    /// A flow with the default retry policy.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self::with_policy(api, RetryPolicy::default())
    }

    /// A flow with a custom retry policy.
    #[must_use]
    pub fn with_policy(api: ApiClient, policy: RetryPolicy) -> Self {
        Self {
            api,
            policy,
            cancel: CancelHandle::new(),
            state: CallbackState::Idle,
        }
    }

    /// Handle for cancelling this flow from elsewhere.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> CallbackState {
        self.state
    }

    /// Exchange the session and resolve the outcome.
    ///
    /// Runs at most once per flow.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the flow already ran, `Cancelled` if the
    /// handle fired, the last network error once attempts are exhausted, or
    /// the first non-retryable error.
    #[instrument(skip(self, params))]
    pub async fn process(
        &mut self,
        params: &CallbackParams,
    ) -> Result<CallbackOutcome, ClientError> {
        if self.state != CallbackState::Idle {
            return Err(ClientError::InvalidState("callback already processed"));
        }

        let result = match self.exchange(params).await {
            Ok(response) => self.resolve(response),
            Err(e) => Err(e),
        };

        self.state = match &result {
            Ok(_) => CallbackState::Done,
            Err(ClientError::Cancelled) => CallbackState::Cancelled,
            Err(_) => CallbackState::Failed,
        };
        result
    }

    async fn exchange(&mut self, params: &CallbackParams) -> Result<AuthResponse, ClientError> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if self.cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            self.state = CallbackState::Processing { attempt };

            let attempt_timeout = self.policy.attempt_timeout;
            let result = tokio::select! {
                result = self.api.google_callback(&params.session_id, attempt_timeout) => result,
                () = self.cancel.cancelled() => return Err(ClientError::Cancelled),
            };

            match result {
                Ok(response) => {
                    info!(attempt, "OAuth session exchanged");
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(attempt, error = %e, "OAuth exchange failed, retrying");
                    tokio::select! {
                        () = tokio::time::sleep(self.policy.backoff) => {}
                        () = self.cancel.cancelled() => return Err(ClientError::Cancelled),
                    }
                }
                Err(e) => {
                    warn!(attempt, error = %e, "OAuth exchange failed");
                    return Err(e);
                }
            }
        }

        Err(ClientError::InvalidState("retry loop ended without a result"))
    }

    /// Pick the single outcome: MFA, then terms, then profile, then login.
    fn resolve(&self, response: AuthResponse) -> Result<CallbackOutcome, ClientError> {
        if response.mfa_required {
            return MfaChallenge::from_response(self.api.clone(), &response)
                .map(CallbackOutcome::MfaRequired);
        }

        let requires_terms = response.requires_terms;
        let (token, user) = session_parts(response.token, response.user)?;
        let token = SecretString::from(token);

        if requires_terms {
            return Ok(CallbackOutcome::TermsRequired { token, user });
        }

        self.api.store().set_auth_token(&token)?;

        if user.needs_profile_completion() {
            Ok(CallbackOutcome::ProfileIncomplete(user))
        } else {
            Ok(CallbackOutcome::LoggedIn(user))
        }
    }
}
