//! Sign-in, registration, Google callback and MFA commands.

use clap::{Args, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use avenue_client::api::auth::{RegisterRequest, User};
use avenue_client::config::Language;
use avenue_client::auth::{
    AuthService, CallbackOutcome, CallbackParams, LoginOutcome, MfaChallenge, MfaProof,
    OAuthCallback, SetupStep,
};

use super::{CliError, Context, confirm, prompt};

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(short, long)]
    name: String,

    #[arg(short, long)]
    email: String,

    #[arg(long, env = "AVENUE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(short, long)]
    phone: Option<String>,

    /// Register as a UGC creator
    #[arg(long)]
    creator: bool,

    /// Register as a brand
    #[arg(long)]
    brand: bool,

    /// Accept the terms and conditions
    #[arg(long)]
    accept_terms: bool,
}

#[derive(Subcommand)]
pub enum MfaAction {
    /// Enroll an authenticator app
    Setup,
    /// Complete a sign-in that is waiting for a second factor
    Verify {
        /// Partial token returned by the sign-in
        #[arg(long, env = "AVENUE_MFA_TOKEN", hide_env_values = true)]
        mfa_token: String,

        /// Six-digit code, or a recovery code with `--recovery`
        code: String,

        #[arg(long)]
        recovery: bool,
    },
    /// Show enrollment status
    Status,
    /// Replace recovery codes
    RegenerateCodes {
        /// Current six-digit code
        code: String,
    },
}

pub async fn login(ctx: &Context, email: &str, password: Option<String>) -> Result<(), CliError> {
    let password = match password {
        Some(password) => password,
        None => prompt("Password").await?,
    };
    let auth = AuthService::new(ctx.api.clone());
    let outcome = auth.login(email, &password).await?;
    finish_login(&auth, outcome).await
}

pub async fn register(ctx: &Context, args: RegisterArgs) -> Result<(), CliError> {
    let password = match args.password {
        Some(password) => password,
        None => prompt("Password").await?,
    };
    let auth = AuthService::new(ctx.api.clone());
    let outcome = auth
        .register(RegisterRequest {
            name: args.name,
            email: args.email,
            password,
            phone: args.phone,
            is_creator: args.creator,
            is_brand: args.brand,
            accept_terms: args.accept_terms,
        })
        .await?;
    finish_login(&auth, outcome).await
}

async fn finish_login(auth: &AuthService, outcome: LoginOutcome) -> Result<(), CliError> {
    let user = match outcome {
        LoginOutcome::LoggedIn(user) => user,
        LoginOutcome::MfaRequired(challenge) => verify_interactively(&challenge).await?,
        LoginOutcome::WelcomeCoupon { coupon, user } => {
            println!("🎁 Welcome! Your coupon: {}", coupon.code);
            if let Some(description) = &coupon.description {
                println!("   {description}");
            }
            auth.resume_pending_login()?.unwrap_or(user)
        }
    };
    signed_in(&user);
    Ok(())
}

async fn verify_interactively(challenge: &MfaChallenge) -> Result<User, CliError> {
    let code = prompt("Verification code (or recovery code)").await?;
    let proof = if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        MfaProof::Totp(code)
    } else {
        MfaProof::Recovery(code)
    };
    Ok(challenge.verify(&proof).await?.user)
}

fn signed_in(user: &User) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            email: Some(user.email.clone()),
            ..Default::default()
        }));
    });
    info!(user_id = %user.id, "Signed in");
    println!("Signed in as {} <{}>", user.name, user.email);
}

pub async fn logout(ctx: &Context) -> Result<(), CliError> {
    let removed = AuthService::new(ctx.api.clone()).logout().await?;
    sentry::configure_scope(|scope| scope.set_user(None));
    if removed {
        println!("Signed out");
    } else {
        println!("Not signed in");
    }
    Ok(())
}

pub async fn me(ctx: &Context) -> Result<(), CliError> {
    let user = AuthService::new(ctx.api.clone()).me().await?;
    println!("{} <{}>", user.name, user.email);
    println!("  role:     {}", user.role);
    if let Some(phone) = &user.phone {
        println!("  phone:    {phone}");
    }
    println!("  creator:  {}", user.is_creator);
    println!("  brand:    {}", user.is_brand);
    println!("  mfa:      {}", user.mfa_enabled);
    if user.needs_profile_completion() {
        println!("  ⚠ creator profile incomplete");
    }
    Ok(())
}

pub async fn oauth_callback(ctx: &Context, url: &str) -> Result<(), CliError> {
    let params = CallbackParams::parse(url)?;
    let mut callback = OAuthCallback::new(ctx.api.clone());

    let cancel = callback.cancel_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
    let outcome = callback.process(&params).await;
    watcher.abort();

    let user = match outcome? {
        CallbackOutcome::LoggedIn(user) => user,
        CallbackOutcome::ProfileIncomplete(user) => {
            println!("Your creator profile is incomplete; finish it before applying to campaigns.");
            user
        }
        CallbackOutcome::MfaRequired(challenge) => verify_interactively(&challenge).await?,
        CallbackOutcome::TermsRequired { token, user } => {
            if !confirm("Do you accept the terms and conditions?").await? {
                return Err(CliError::Usage(
                    "Terms must be accepted to finish signing in".to_string(),
                ));
            }
            AuthService::new(ctx.api.clone()).accept_terms(&token).await?;
            user
        }
    };
    signed_in(&user);
    Ok(())
}

pub async fn mfa(ctx: &Context, action: MfaAction) -> Result<(), CliError> {
    let auth = AuthService::new(ctx.api.clone());
    match action {
        MfaAction::Setup => setup(&auth, ctx.config.language).await,
        MfaAction::Verify {
            mfa_token,
            code,
            recovery,
        } => {
            let challenge = MfaChallenge::new(ctx.api.clone(), SecretString::from(mfa_token));
            let proof = if recovery {
                MfaProof::Recovery(code)
            } else {
                MfaProof::Totp(code)
            };
            let session = challenge.verify(&proof).await?;
            signed_in(&session.user);
            Ok(())
        }
        MfaAction::Status => {
            let status = auth.mfa_status().await?;
            if status.enabled {
                println!(
                    "Two-factor authentication is on ({} recovery codes left)",
                    status.recovery_codes_remaining
                );
            } else {
                println!("Two-factor authentication is off");
            }
            Ok(())
        }
        MfaAction::RegenerateCodes { code } => {
            let codes = auth.regenerate_recovery_codes(&code).await?;
            print_codes(&codes);
            Ok(())
        }
    }
}

async fn setup(auth: &AuthService, language: Language) -> Result<(), CliError> {
    let mut wizard = auth.mfa_setup();

    let secret = wizard.begin().await?;
    println!("Add this key to your authenticator app:");
    println!("  {}", secret.secret.expose_secret());
    if let Some(url) = &secret.otpauth_url {
        println!("  {url}");
    }

    wizard.next()?;
    loop {
        let code = prompt("Code from the app").await?;
        let confirmed = wizard.confirm(&code).await.map(<[String]>::to_vec);
        match confirmed {
            Ok(codes) => {
                print_codes(&codes);
                break;
            }
            // A wrong code keeps the wizard on Confirm; let the user retry
            Err(e) if wizard.step() == SetupStep::Confirm => {
                println!("{}", e.user_message(language));
            }
            Err(e) => return Err(e.into()),
        }
    }

    wizard.finish()?;
    println!("Two-factor authentication enabled");
    Ok(())
}

fn print_codes(codes: &[String]) {
    println!("Recovery codes (store them somewhere safe, each works once):");
    for code in codes {
        println!("  {code}");
    }
}
