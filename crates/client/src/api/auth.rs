//! Authentication, MFA and terms endpoints.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use avenue_core::{UserId, UserRole};

use super::{Ack, ApiClient};
use crate::error::ClientError;

// =============================================================================
// Wire types
// =============================================================================

/// Authenticated user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_creator: bool,
    #[serde(default)]
    pub is_brand: bool,
    #[serde(default, alias = "profile_completed")]
    pub creator_profile_completed: bool,
    #[serde(default)]
    pub terms_accepted: bool,
    #[serde(default)]
    pub mfa_enabled: bool,
}

impl User {
    /// Creator accounts must finish their profile before using the app.
    #[must_use]
    pub const fn needs_profile_completion(&self) -> bool {
        self.is_creator && !self.creator_profile_completed
    }
}

/// Welcome coupon offered on first login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeCoupon {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Body returned by login, registration, the Google callback and MFA verification.
///
/// Which fields are set depends on what the backend still requires.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default, alias = "access_token")]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub mfa_required: bool,
    /// Partial token to present with the second factor.
    #[serde(default, alias = "partial_token")]
    pub mfa_token: Option<String>,
    #[serde(default, alias = "requires_terms_acceptance")]
    pub requires_terms: bool,
    #[serde(default)]
    pub welcome_coupon: Option<WelcomeCoupon>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// New account details.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub is_creator: bool,
    pub is_brand: bool,
    pub accept_terms: bool,
}

#[derive(Debug, Serialize)]
struct GoogleCallbackRequest<'a> {
    session_id: &'a str,
}

/// Freshly issued TOTP secret.
#[derive(Debug, Clone, Deserialize)]
pub struct MfaSetupResponse {
    pub secret: String,
    /// QR code as a data URI.
    #[serde(alias = "qr_code_url")]
    pub qr_code: String,
    #[serde(default)]
    pub otpauth_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct CodeRequest<'a> {
    code: &'a str,
}

/// Recovery codes issued when MFA is enabled or codes are regenerated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecoveryCodesResponse {
    #[serde(default)]
    pub recovery_codes: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
struct MfaVerifyRequest<'a> {
    mfa_token: &'a str,
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct MfaRecoveryRequest<'a> {
    mfa_token: &'a str,
    recovery_code: &'a str,
}

/// MFA enrollment state of the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct MfaStatus {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub recovery_codes_remaining: u32,
}

#[derive(Debug, Serialize)]
struct TermsAcceptRequest {
    accepted: bool,
}

// =============================================================================
// Endpoints
// =============================================================================

impl ApiClient {
    /// `POST /api/auth/login`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the credentials are rejected.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        self.post("/api/auth/login", &LoginRequest { email, password })
            .await
    }

    /// `POST /api/auth/register`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        self.post("/api/auth/register", request).await
    }

    /// `POST /api/auth/google/callback` with a per-attempt timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or times out.
    #[instrument(skip(self, session_id))]
    pub async fn google_callback(
        &self,
        session_id: &str,
        timeout: Duration,
    ) -> Result<AuthResponse, ClientError> {
        self.post_with_timeout(
            "/api/auth/google/callback",
            &GoogleCallbackRequest { session_id },
            timeout,
        )
        .await
    }

    /// `GET /api/auth/me`.
    ///
    /// # Errors
    ///
    /// Returns an error if not logged in or the request fails.
    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<User, ClientError> {
        self.get("/api/auth/me").await
    }

    /// `POST /api/auth/logout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn logout_request(&self) -> Result<Option<Ack>, ClientError> {
        self.post_empty("/api/auth/logout").await
    }

    /// `POST /api/terms/accept`, authorized with a token not yet persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn accept_terms_request(
        &self,
        token: &SecretString,
    ) -> Result<Option<Ack>, ClientError> {
        self.post_as("/api/terms/accept", &TermsAcceptRequest { accepted: true }, token)
            .await
    }

    /// `POST /api/auth/mfa/setup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn mfa_setup(&self) -> Result<MfaSetupResponse, ClientError> {
        self.post_empty("/api/auth/mfa/setup").await
    }

    /// `POST /api/auth/mfa/verify-setup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the code is rejected.
    #[instrument(skip(self, code))]
    pub async fn mfa_verify_setup(&self, code: &str) -> Result<RecoveryCodesResponse, ClientError> {
        self.post("/api/auth/mfa/verify-setup", &CodeRequest { code })
            .await
    }

    /// `POST /api/auth/mfa/verify`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the code is rejected.
    #[instrument(skip_all)]
    pub async fn mfa_verify(
        &self,
        mfa_token: &str,
        code: &str,
    ) -> Result<AuthResponse, ClientError> {
        self.post("/api/auth/mfa/verify", &MfaVerifyRequest { mfa_token, code })
            .await
    }

    /// `POST /api/auth/mfa/recovery`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the code is rejected.
    #[instrument(skip_all)]
    pub async fn mfa_recovery(
        &self,
        mfa_token: &str,
        recovery_code: &str,
    ) -> Result<AuthResponse, ClientError> {
        self.post(
            "/api/auth/mfa/recovery",
            &MfaRecoveryRequest {
                mfa_token,
                recovery_code,
            },
        )
        .await
    }

    /// `GET /api/auth/mfa/status`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn mfa_status(&self) -> Result<MfaStatus, ClientError> {
        self.get("/api/auth/mfa/status").await
    }

    /// `POST /api/auth/mfa/regenerate-recovery`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the code is rejected.
    #[instrument(skip(self, code))]
    pub async fn mfa_regenerate_recovery(
        &self,
        code: &str,
    ) -> Result<RecoveryCodesResponse, ClientError> {
        self.post("/api/auth/mfa/regenerate-recovery", &CodeRequest { code })
            .await
    }
}
