//! TOTP enrollment wizard and second-factor challenge.
//!
//! Secrets, QR codes and recovery codes exist only while the flow that issued
//! them is alive; nothing here touches persistent storage except the final
//! bearer token.

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use crate::api::ApiClient;
use crate::api::auth::{AuthResponse, User};
use crate::error::{ClientError, ValidationError};

const TOTP_DIGITS: usize = 6;
const RECOVERY_CODE_MIN: usize = 6;
const RECOVERY_CODE_MAX: usize = 32;

/// Normalize a TOTP code: surrounding and inner spaces are dropped, then it
/// must be exactly six ASCII digits.
///
/// # Errors
///
/// Returns `InvalidTotpCode` otherwise.
pub fn validate_totp(code: &str) -> Result<String, ValidationError> {
    let code: String = code.chars().filter(|c| !c.is_whitespace()).collect();
    if code.len() == TOTP_DIGITS && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(code)
    } else {
        Err(ValidationError::InvalidTotpCode)
    }
}

/// Normalize a recovery code: trimmed, upper-cased, alphanumeric plus dashes.
///
/// # Errors
///
/// Returns `InvalidRecoveryCode` otherwise.
pub fn validate_recovery_code(code: &str) -> Result<String, ValidationError> {
    let code = code.trim().to_ascii_uppercase();
    let valid_chars = code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid_chars && (RECOVERY_CODE_MIN..=RECOVERY_CODE_MAX).contains(&code.len()) {
        Ok(code)
    } else {
        Err(ValidationError::InvalidRecoveryCode)
    }
}

// =============================================================================
// Challenge
// =============================================================================

/// Proof offered for the second factor.
#[derive(Clone, PartialEq, Eq)]
pub enum MfaProof {
    /// Six-digit code from the authenticator app.
    Totp(String),
    /// One-time recovery code.
    Recovery(String),
}

impl std::fmt::Debug for MfaProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Totp(_) => f.write_str("Totp([REDACTED])"),
            Self::Recovery(_) => f.write_str("Recovery([REDACTED])"),
        }
    }
}

/// Result of a successful second factor, whichever proof was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSession {
    pub user: User,
}

/// A session waiting for its second factor.
pub struct MfaChallenge {
    api: ApiClient,
    mfa_token: SecretString,
}

impl std::fmt::Debug for MfaChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MfaChallenge")
            .field("mfa_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl MfaChallenge {
    /// Resume a challenge from a partial token kept by the caller.
    #[must_use]
    pub const fn new(api: ApiClient, mfa_token: SecretString) -> Self {
        Self { api, mfa_token }
    }

    /// Build a challenge from an auth response that requires MFA.
    ///
    /// Older backends send the partial token as `token`.
    pub(crate) fn from_response(
        api: ApiClient,
        response: &AuthResponse,
    ) -> Result<Self, ClientError> {
        let token = response
            .mfa_token
            .as_deref()
            .or(response.token.as_deref())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Parse("MFA required without mfa_token".to_string()))?;

        Ok(Self::new(api, SecretString::from(token)))
    }

    /// Verify the second factor and persist the issued token.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request if the proof is
    /// malformed, and the backend's rejection otherwise.
    #[instrument(skip(self))]
    pub async fn verify(&self, proof: &MfaProof) -> Result<VerifiedSession, ClientError> {
        let partial = self.mfa_token.expose_secret();
        let response = match proof {
            MfaProof::Totp(code) => {
                let code = validate_totp(code)?;
                self.api.mfa_verify(partial, &code).await?
            }
            MfaProof::Recovery(code) => {
                let code = validate_recovery_code(code)?;
                self.api.mfa_recovery(partial, &code).await?
            }
        };

        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Parse("MFA verification returned no token".to_string()))?;
        self.api.store().set_auth_token(&SecretString::from(token))?;

        let user = match response.user {
            Some(user) => user,
            None => self.api.me().await?,
        };
        info!(user_id = %user.id, "Second factor verified");
        Ok(VerifiedSession { user })
    }
}

// =============================================================================
// Enrollment wizard
// =============================================================================

/// Enrollment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    /// Explanation screen; nothing issued yet.
    Intro,
    /// QR code and manual secret shown.
    Scan,
    /// Waiting for a code from the app.
    Confirm,
    /// MFA enabled; recovery codes shown once.
    RecoveryCodes,
    /// Wizard closed; everything transient discarded.
    Completed,
}

/// Secret issued by the backend for enrollment.
#[derive(Clone)]
pub struct MfaSecret {
    /// Base32 secret for manual entry.
    pub secret: SecretString,
    /// QR code data URI.
    pub qr_code: String,
    pub otpauth_url: Option<String>,
}

impl std::fmt::Debug for MfaSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MfaSecret")
            .field("secret", &"[REDACTED]")
            .field("qr_code_len", &self.qr_code.len())
            .finish_non_exhaustive()
    }
}

/// Linear TOTP enrollment: `Intro -> Scan -> Confirm -> RecoveryCodes`.
///
/// Going back never discards the issued secret; only [`MfaSetup::finish`]
/// does.
#[derive(Debug)]
pub struct MfaSetup {
    api: ApiClient,
    step: SetupStep,
    secret: Option<MfaSecret>,
    recovery_codes: Vec<String>,
}

impl MfaSetup {
    /// A wizard at `Intro`.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self {
            api,
            step: SetupStep::Intro,
            secret: None,
            recovery_codes: Vec::new(),
        }
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> SetupStep {
        self.step
    }

    /// Issued secret, once `begin` has succeeded.
    #[must_use]
    pub const fn secret(&self) -> Option<&MfaSecret> {
        self.secret.as_ref()
    }

    /// Recovery codes, shown at `RecoveryCodes`.
    #[must_use]
    pub fn recovery_codes(&self) -> &[String] {
        &self.recovery_codes
    }

    /// Leave `Intro`. The secret is requested only the first time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` outside `Intro`, or the request error.
    #[instrument(skip(self))]
    pub async fn begin(&mut self) -> Result<&MfaSecret, ClientError> {
        if self.step != SetupStep::Intro {
            return Err(ClientError::InvalidState("MFA setup already started"));
        }

        if self.secret.is_none() {
            let issued = self.api.mfa_setup().await?;
            self.secret = Some(MfaSecret {
                secret: SecretString::from(issued.secret),
                qr_code: issued.qr_code,
                otpauth_url: issued.otpauth_url,
            });
        }

        self.step = SetupStep::Scan;
        self.secret
            .as_ref()
            .ok_or(ClientError::InvalidState("MFA secret missing"))
    }

    /// `Scan -> Confirm`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` outside `Scan`.
    pub fn next(&mut self) -> Result<SetupStep, ClientError> {
        if self.step != SetupStep::Scan {
            return Err(ClientError::InvalidState("can only continue from the scan step"));
        }
        self.step = SetupStep::Confirm;
        Ok(self.step)
    }

    /// `Confirm -> Scan` or `Scan -> Intro`, keeping the issued secret.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` from any other step.
    pub fn back(&mut self) -> Result<SetupStep, ClientError> {
        self.step = match self.step {
            SetupStep::Confirm => SetupStep::Scan,
            SetupStep::Scan => SetupStep::Intro,
            _ => return Err(ClientError::InvalidState("cannot go back from this step")),
        };
        Ok(self.step)
    }

    /// Confirm enrollment with a code from the app.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request if the code is not six
    /// digits; the step stays at `Confirm` on any failure.
    #[instrument(skip_all)]
    pub async fn confirm(&mut self, code: &str) -> Result<&[String], ClientError> {
        if self.step != SetupStep::Confirm {
            return Err(ClientError::InvalidState("not at the confirmation step"));
        }
        let code = validate_totp(code)?;

        let response = self.api.mfa_verify_setup(&code).await?;
        self.recovery_codes = response.recovery_codes;
        self.step = SetupStep::RecoveryCodes;
        info!(codes = self.recovery_codes.len(), "MFA enabled");
        Ok(&self.recovery_codes)
    }

    /// Close the wizard and discard the secret and recovery codes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless at `RecoveryCodes`.
    pub fn finish(&mut self) -> Result<(), ClientError> {
        if self.step != SetupStep::RecoveryCodes {
            return Err(ClientError::InvalidState("recovery codes not shown yet"));
        }
        self.secret = None;
        self.recovery_codes.clear();
        self.step = SetupStep::Completed;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::store::LocalStore;

    fn offline_api() -> ApiClient {
        ApiClient::with_http_client(
            &Url::parse("http://127.0.0.1:9").unwrap(),
            reqwest::Client::new(),
            LocalStore::in_memory(),
        )
    }

    fn wizard_at_scan() -> MfaSetup {
        let mut setup = MfaSetup::new(offline_api());
        setup.secret = Some(MfaSecret {
            secret: SecretString::from("JBSWY3DPEHPK3PXP"),
            qr_code: "data:image/png;base64,AAAA".to_string(),
            otpauth_url: None,
        });
        setup.step = SetupStep::Scan;
        setup
    }

    #[test]
    fn test_validate_totp() {
        assert_eq!(validate_totp("123456").unwrap(), "123456");
        assert_eq!(validate_totp(" 123 456 ").unwrap(), "123456");
        assert!(validate_totp("12345").is_err());
        assert!(validate_totp("1234567").is_err());
        assert!(validate_totp("12a456").is_err());
        assert!(validate_totp("١٢٣٤٥٦").is_err());
    }

    #[test]
    fn test_validate_recovery_code() {
        assert_eq!(validate_recovery_code(" ab12-cd34 ").unwrap(), "AB12-CD34");
        assert!(validate_recovery_code("abc").is_err());
        assert!(validate_recovery_code("ab12 cd34").is_err());
    }

    #[test]
    fn test_back_keeps_secret() {
        let mut setup = wizard_at_scan();
        assert_eq!(setup.next().unwrap(), SetupStep::Confirm);
        assert_eq!(setup.back().unwrap(), SetupStep::Scan);
        assert_eq!(
            setup.secret().unwrap().secret.expose_secret(),
            "JBSWY3DPEHPK3PXP"
        );
        assert_eq!(setup.back().unwrap(), SetupStep::Intro);
        assert!(setup.secret().is_some());
        assert!(setup.back().is_err());
    }

    #[tokio::test]
    async fn test_begin_reuses_issued_secret() {
        let mut setup = wizard_at_scan();
        setup.back().unwrap();
        // No backend is reachable, so this only passes if no request is made
        let secret = setup.begin().await.unwrap();
        assert_eq!(secret.qr_code, "data:image/png;base64,AAAA");
        assert_eq!(setup.step(), SetupStep::Scan);
    }

    #[tokio::test]
    async fn test_confirm_rejects_bad_code_locally() {
        let mut setup = wizard_at_scan();
        setup.next().unwrap();
        let err = setup.confirm("12").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::InvalidTotpCode)
        ));
        assert_eq!(setup.step(), SetupStep::Confirm);
    }

    #[test]
    fn test_steps_out_of_order() {
        let mut setup = MfaSetup::new(offline_api());
        assert!(setup.next().is_err());
        assert!(setup.finish().is_err());
    }

    #[test]
    fn test_finish_discards_transient_state() {
        let mut setup = wizard_at_scan();
        setup.step = SetupStep::RecoveryCodes;
        setup.recovery_codes = vec!["AAAA-BBBB".to_string()];
        setup.finish().unwrap();
        assert_eq!(setup.step(), SetupStep::Completed);
        assert!(setup.secret().is_none());
        assert!(setup.recovery_codes().is_empty());
    }

    #[test]
    fn test_challenge_requires_partial_token() {
        let response = AuthResponse {
            mfa_required: true,
            ..AuthResponse::default()
        };
        assert!(matches!(
            MfaChallenge::from_response(offline_api(), &response),
            Err(ClientError::Parse(_))
        ));
    }

    #[test]
    fn test_proof_debug_redacts() {
        let proof = MfaProof::Totp("123456".to_string());
        assert_eq!(format!("{proof:?}"), "Totp([REDACTED])");
    }
}
