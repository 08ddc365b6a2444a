//! Authentication flows.
//!
//! Password login and registration live here; the Google OAuth callback and
//! the MFA sub-flows have their own modules. All of them end the same way:
//! the bearer token is written to the [`LocalStore`](crate::store::LocalStore)
//! and every later request picks it up from there.

pub mod callback;
pub mod mfa;

pub use callback::{
    CallbackOutcome, CallbackParams, CallbackState, CancelHandle, OAuthCallback, RetryPolicy,
};
pub use mfa::{MfaChallenge, MfaProof, MfaSecret, MfaSetup, SetupStep, VerifiedSession};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use avenue_core::Email;

use crate::api::ApiClient;
use crate::api::auth::{AuthResponse, MfaStatus, RegisterRequest, User, WelcomeCoupon};
use crate::error::{ClientError, ValidationError};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Login parked while the welcome coupon is shown.
#[derive(Clone, Serialize, Deserialize)]
pub struct PendingLogin {
    pub token: String,
    pub user: User,
}

impl std::fmt::Debug for PendingLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLogin")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// What happened after credentials were accepted.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Token persisted; the user is logged in.
    LoggedIn(User),
    /// A second factor is needed before a token is issued.
    MfaRequired(MfaChallenge),
    /// First login: show the coupon, then call
    /// [`AuthService::resume_pending_login`].
    WelcomeCoupon { coupon: WelcomeCoupon, user: User },
}

/// Password authentication and session management.
#[derive(Debug, Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    /// Create a service over `api`.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request if the email is
    /// malformed or the password empty, and the backend's rejection otherwise.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, ClientError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        let response = self.api.login(email.as_str(), password).await?;
        self.resolve(response)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request if a field is missing,
    /// the email is malformed, the password is too short or the terms were not
    /// accepted.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(
        &self,
        mut request: RegisterRequest,
    ) -> Result<LoginOutcome, ClientError> {
        request.email = validate_registration(&request)?.into_inner();

        let response = self.api.register(&request).await?;
        info!("Account registered");
        self.resolve(response)
    }

    /// Finish a login parked behind the welcome coupon.
    ///
    /// Returns `None` if nothing was parked.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    pub fn resume_pending_login(&self) -> Result<Option<User>, ClientError> {
        let Some(pending) = self.api.store().take_pending_login()? else {
            return Ok(None);
        };
        self.api
            .store()
            .set_auth_token(&SecretString::from(pending.token))?;
        Ok(Some(pending.user))
    }

    /// Current user.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the token is missing or expired.
    pub async fn me(&self) -> Result<User, ClientError> {
        self.api.me().await
    }

    /// Log out. The backend is told on a best-effort basis; the local token
    /// is always removed.
    ///
    /// Returns `true` if a token was removed.
    ///
    /// # Errors
    ///
    /// Returns an error only if local storage fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<bool, ClientError> {
        if self.api.store().has_auth_token()
            && let Err(e) = self.api.logout_request().await
        {
            warn!(error = %e, "Backend logout failed, clearing token anyway");
        }
        Ok(self.api.store().clear_auth_token()?)
    }

    /// Accept the terms with a token that is not yet persisted, then persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request; the token is not
    /// persisted in that case.
    #[instrument(skip_all)]
    pub async fn accept_terms(&self, token: &SecretString) -> Result<(), ClientError> {
        self.api.accept_terms_request(token).await?;
        self.api.store().set_auth_token(token)?;
        info!("Terms accepted");
        Ok(())
    }

    // =========================================================================
    // MFA Management
    // =========================================================================

    /// Start the enrollment wizard.
    #[must_use]
    pub fn mfa_setup(&self) -> MfaSetup {
        MfaSetup::new(self.api.clone())
    }

    /// MFA enrollment state of the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn mfa_status(&self) -> Result<MfaStatus, ClientError> {
        self.api.mfa_status().await
    }

    /// Replace the recovery codes, confirming with a current TOTP code.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the code is not six digits, or the
    /// backend's rejection.
    #[instrument(skip_all)]
    pub async fn regenerate_recovery_codes(&self, code: &str) -> Result<Vec<String>, ClientError> {
        let code = mfa::validate_totp(code)?;
        let response = self.api.mfa_regenerate_recovery(&code).await?;
        Ok(response.recovery_codes)
    }

    // =========================================================================
    // Response Handling
    // =========================================================================

    fn resolve(&self, response: AuthResponse) -> Result<LoginOutcome, ClientError> {
        if response.mfa_required {
            let challenge = MfaChallenge::from_response(self.api.clone(), &response)?;
            return Ok(LoginOutcome::MfaRequired(challenge));
        }

        let AuthResponse {
            token,
            user,
            welcome_coupon,
            ..
        } = response;
        let (token, user) = session_parts(token, user)?;

        if let Some(coupon) = welcome_coupon {
            self.api.store().set_pending_login(&PendingLogin {
                token,
                user: user.clone(),
            })?;
            return Ok(LoginOutcome::WelcomeCoupon { coupon, user });
        }

        self.api.store().set_auth_token(&SecretString::from(token))?;
        info!(user_id = %user.id, "Logged in");
        Ok(LoginOutcome::LoggedIn(user))
    }
}

/// Token and user from a response that must carry both.
pub(crate) fn session_parts(
    token: Option<String>,
    user: Option<User>,
) -> Result<(String, User), ClientError> {
    match (token.filter(|t| !t.is_empty()), user) {
        (Some(token), Some(user)) => Ok((token, user)),
        (None, _) => Err(ClientError::Parse("auth response has no token".to_string())),
        (_, None) => Err(ClientError::Parse("auth response has no user".to_string())),
    }
}

/// Check a registration form without touching the network.
///
/// # Errors
///
/// Returns the first failing check.
pub fn validate_registration(request: &RegisterRequest) -> Result<Email, ValidationError> {
    if request.name.trim().is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    let email = Email::parse(&request.email)?;
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if !request.accept_terms {
        return Err(ValidationError::TermsNotAccepted);
    }
    Ok(email)
}
