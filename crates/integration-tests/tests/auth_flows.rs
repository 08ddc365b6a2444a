//! Sign-in flows: password login, Google callback retries, MFA and terms.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use avenue_client::ClientError;
use avenue_client::auth::{
    AuthService, CallbackOutcome, CallbackParams, CallbackState, LoginOutcome, MfaChallenge,
    MfaProof, OAuthCallback, RetryPolicy,
};
use avenue_integration_tests::{TEST_TOKEN, TestContext, user_json};

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        backoff: Duration::from_millis(10),
        attempt_timeout: Duration::from_millis(100),
    }
}

fn params() -> CallbackParams {
    CallbackParams::parse("https://avenue.studio/auth/callback#session_id=sess-42").unwrap()
}

fn stored_token(ctx: &TestContext) -> Option<String> {
    ctx.store
        .auth_token()
        .unwrap()
        .map(|t| t.expose_secret().to_string())
}

// =============================================================================
// Password login
// =============================================================================

#[tokio::test]
async fn test_login_persists_token() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_partial_json(json!({"email": "ana@avenue.studio"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-1",
            "user": user_json("u1", "ana@avenue.studio")
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let auth = AuthService::new(ctx.api.clone());
    let outcome = auth.login("  Ana@Avenue.Studio ", "secreto").await.unwrap();

    assert!(matches!(outcome, LoginOutcome::LoggedIn(ref user) if user.id.as_str() == "u1"));
    assert_eq!(stored_token(&ctx).as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn test_login_rejected_keeps_backend_message() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Credenciales inválidas"})),
        )
        .mount(&ctx.server)
        .await;

    let err = AuthService::new(ctx.api.clone())
        .login("ana@avenue.studio", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Unauthorized { message: Some(ref m) } if m == "Credenciales inválidas"
    ));
    assert!(stored_token(&ctx).is_none());
}

#[tokio::test]
async fn test_welcome_coupon_parks_login_until_resumed() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-welcome",
            "user": user_json("u2", "leo@avenue.studio"),
            "welcome_coupon": {"code": "WELCOME10", "description": "10% en tu primera compra"}
        })))
        .mount(&ctx.server)
        .await;

    let auth = AuthService::new(ctx.api.clone());
    let outcome = auth.login("leo@avenue.studio", "secreto").await.unwrap();
    let LoginOutcome::WelcomeCoupon { coupon, .. } = outcome else {
        panic!("expected welcome coupon");
    };
    assert_eq!(coupon.code, "WELCOME10");
    assert!(stored_token(&ctx).is_none());

    let user = auth.resume_pending_login().unwrap().unwrap();
    assert_eq!(user.email, "leo@avenue.studio");
    assert_eq!(stored_token(&ctx).as_deref(), Some("tok-welcome"));
    assert!(auth.resume_pending_login().unwrap().is_none());
}

#[tokio::test]
async fn test_logout_clears_token_even_if_backend_fails() {
    let ctx = TestContext::logged_in().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let auth = AuthService::new(ctx.api.clone());
    assert!(auth.logout().await.unwrap());
    assert!(stored_token(&ctx).is_none());

    // Second logout has nothing to remove and makes no request
    assert!(!auth.logout().await.unwrap());
}

// =============================================================================
// Google callback
// =============================================================================

#[tokio::test]
async fn test_callback_retries_timeouts_then_succeeds() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/google/callback"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(json!({
                    "token": "late",
                    "user": user_json("u1", "ana@avenue.studio")
                })),
        )
        .up_to_n_times(4)
        .expect(4)
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/google/callback"))
        .and(body_partial_json(json!({"session_id": "sess-42"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-google",
            "user": user_json("u1", "ana@avenue.studio")
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let mut callback = OAuthCallback::with_policy(ctx.api.clone(), fast_policy());
    let outcome = callback.process(&params()).await.unwrap();

    assert!(matches!(outcome, CallbackOutcome::LoggedIn(_)));
    assert_eq!(callback.state(), CallbackState::Done);
    assert_eq!(stored_token(&ctx).as_deref(), Some("tok-google"));

    // A flow runs once
    assert!(matches!(
        callback.process(&params()).await,
        Err(ClientError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_callback_gives_up_after_max_attempts() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/google/callback"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(5)
        .mount(&ctx.server)
        .await;

    let mut callback = OAuthCallback::with_policy(ctx.api.clone(), fast_policy());
    let err = callback.process(&params()).await.unwrap_err();

    assert!(matches!(err, ClientError::Timeout), "got {err:?}");
    assert_eq!(callback.state(), CallbackState::Failed);
    assert!(stored_token(&ctx).is_none());
}

#[tokio::test]
async fn test_callback_does_not_retry_rejection() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/google/callback"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Sesión inválida"})),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let mut callback = OAuthCallback::with_policy(ctx.api.clone(), fast_policy());
    let err = callback.process(&params()).await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized { .. }));
    assert_eq!(callback.state(), CallbackState::Failed);
}

#[tokio::test]
async fn test_callback_cancel_during_backoff() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/google/callback"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&ctx.server)
        .await;

    // First attempt times out at 100ms, then the long backoff is interrupted
    let policy = RetryPolicy {
        backoff: Duration::from_secs(30),
        ..fast_policy()
    };
    let mut callback = OAuthCallback::with_policy(ctx.api.clone(), policy);
    let cancel = callback.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let err = callback.process(&params()).await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert_eq!(callback.state(), CallbackState::Cancelled);
}

#[tokio::test]
async fn test_callback_mfa_wins_over_terms() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/google/callback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mfa_required": true,
            "mfa_token": "partial",
            "requires_terms": true
        })))
        .mount(&ctx.server)
        .await;

    let mut callback = OAuthCallback::with_policy(ctx.api.clone(), fast_policy());
    let outcome = callback.process(&params()).await.unwrap();
    assert!(matches!(outcome, CallbackOutcome::MfaRequired(_)));
    assert!(stored_token(&ctx).is_none());
}

#[tokio::test]
async fn test_callback_terms_then_accept() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/google/callback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-terms",
            "user": user_json("u3", "sol@avenue.studio"),
            "requires_terms_acceptance": true
        })))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/terms/accept"))
        .and(header("authorization", "Bearer tok-terms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let mut callback = OAuthCallback::with_policy(ctx.api.clone(), fast_policy());
    let CallbackOutcome::TermsRequired { token, user } = callback.process(&params()).await.unwrap()
    else {
        panic!("expected terms outcome");
    };
    assert_eq!(user.id.as_str(), "u3");
    assert!(stored_token(&ctx).is_none());

    AuthService::new(ctx.api.clone())
        .accept_terms(&token)
        .await
        .unwrap();
    assert_eq!(stored_token(&ctx).as_deref(), Some("tok-terms"));
}

#[tokio::test]
async fn test_callback_incomplete_creator_profile() {
    let ctx = TestContext::new().await;

    let mut user = user_json("u4", "mia@avenue.studio");
    user["role"] = json!("creator");
    user["is_creator"] = json!(true);
    user["creator_profile_completed"] = json!(false);

    Mock::given(method("POST"))
        .and(path("/api/auth/google/callback"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token": "tok-c", "user": user})),
        )
        .mount(&ctx.server)
        .await;

    let mut callback = OAuthCallback::with_policy(ctx.api.clone(), fast_policy());
    let outcome = callback.process(&params()).await.unwrap();
    assert!(matches!(outcome, CallbackOutcome::ProfileIncomplete(_)));
    assert_eq!(stored_token(&ctx).as_deref(), Some("tok-c"));
}

// =============================================================================
// MFA
// =============================================================================

#[tokio::test]
async fn test_mfa_login_with_totp() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mfa_required": true,
            "mfa_token": "partial-1"
        })))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/mfa/verify"))
        .and(body_partial_json(json!({"mfa_token": "partial-1", "code": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-mfa",
            "user": user_json("u1", "ana@avenue.studio")
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let auth = AuthService::new(ctx.api.clone());
    let LoginOutcome::MfaRequired(challenge) =
        auth.login("ana@avenue.studio", "secreto").await.unwrap()
    else {
        panic!("expected MFA challenge");
    };
    assert!(stored_token(&ctx).is_none());

    // Malformed codes never reach the backend
    assert!(matches!(
        challenge.verify(&MfaProof::Totp("12345".to_string())).await,
        Err(ClientError::Validation(_))
    ));

    let session = challenge
        .verify(&MfaProof::Totp(" 123456 ".to_string()))
        .await
        .unwrap();
    assert_eq!(session.user.id.as_str(), "u1");
    assert_eq!(stored_token(&ctx).as_deref(), Some("tok-mfa"));
}

#[tokio::test]
async fn test_mfa_recovery_code() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/mfa/recovery"))
        .and(body_partial_json(json!({"mfa_token": "partial-2", "recovery_code": "ABCD-1234"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-recovered",
            "user": user_json("u1", "ana@avenue.studio")
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let challenge = MfaChallenge::new(ctx.api.clone(), SecretString::from("partial-2"));
    challenge
        .verify(&MfaProof::Recovery("ABCD-1234".to_string()))
        .await
        .unwrap();
    assert_eq!(stored_token(&ctx).as_deref(), Some("tok-recovered"));
}

#[tokio::test]
async fn test_mfa_setup_wizard() {
    let ctx = TestContext::logged_in().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/mfa/setup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secret": "JBSWY3DPEHPK3PXP",
            "qr_code": "data:image/png;base64,AAAA",
            "otpauth_url": "otpauth://totp/Avenue:ana?secret=JBSWY3DPEHPK3PXP"
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/mfa/verify-setup"))
        .and(body_partial_json(json!({"code": "000000"})))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Código inválido"})),
        )
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/mfa/verify-setup"))
        .and(body_partial_json(json!({"code": "654321"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "recovery_codes": ["AAAA-1111", "BBBB-2222"]
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let auth = AuthService::new(ctx.api.clone());
    let mut wizard = auth.mfa_setup();
    wizard.begin().await.unwrap();
    wizard.next().unwrap();

    assert!(wizard.confirm("000000").await.is_err());
    let codes = wizard.confirm("654321").await.unwrap().to_vec();
    assert_eq!(codes, vec!["AAAA-1111".to_string(), "BBBB-2222".to_string()]);
    wizard.finish().unwrap();
}
