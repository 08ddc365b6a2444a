//! Avenue CLI - shop, studio bookings and UGC marketplace from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (prompts for a code when MFA is enabled)
//! avenue login -e ana@example.com
//!
//! # Finish a Google sign-in from the redirect URL
//! avenue oauth-callback 'https://avenue.studio/auth/callback#session_id=abc'
//!
//! # Book the studio for four hours from 10:00
//! avenue book reserve 2026-11-02 --start 10 --hours 4 -n Ana -e ana@example.com -p 3000000000
//!
//! # Check out with a coupon
//! avenue checkout --full-name "Ana Gómez" -e ana@example.com -p 3000000000 \
//!     --document-id 1020304050 --coupon WELCOME10 --accept-terms
//!
//! # Keep the session alive interactively
//! avenue session watch
//! ```
//!
//! Configuration comes from the environment (see `avenue_client::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avenue_client::{ApiClient, ClientConfig, LocalStore};

#[allow(clippy::print_stdout)]
mod commands;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "avenue")]
#[command(author, version, about = "Avenue shop, studio and UGC client")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "AVENUE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Register(commands::auth::RegisterArgs),
    /// Sign out and forget the stored token
    Logout,
    /// Show the signed-in user
    Me,
    /// Complete a Google sign-in from the callback URL
    OauthCallback {
        /// Full redirect URL containing `session_id`
        url: String,
    },
    /// Two-factor authentication
    Mfa {
        #[command(subcommand)]
        action: commands::auth::MfaAction,
    },
    /// Manage the local cart
    Cart {
        #[command(subcommand)]
        action: commands::shop::CartAction,
    },
    /// Photo studio bookings
    Book {
        #[command(subcommand)]
        action: commands::book::BookAction,
    },
    /// Place an order for the current cart
    Checkout(commands::shop::CheckoutArgs),
    /// In-app notifications
    Notifications {
        #[command(subcommand)]
        action: commands::notifications::NotificationsAction,
    },
    /// UGC marketplace
    Ugc {
        #[command(subcommand)]
        action: commands::ugc::UgcAction,
    },
    /// Inactivity tracking
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(json: bool) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "avenue_client=info,avenue=info".into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));

    // Logs go to stderr so command output stays pipeable
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configuration is needed before Sentry, so its errors go straight to stderr
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(cli.json_logs);

    let language = config.language;
    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("{}", e.user_message(language));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: ClientConfig) -> Result<(), CliError> {
    let store = LocalStore::open(&config.storage_dir)?;
    let api = ApiClient::new(&config, store)?;
    let ctx = Context { api, config };

    match command {
        Commands::Login { email, password } => commands::auth::login(&ctx, &email, password).await,
        Commands::Register(args) => commands::auth::register(&ctx, args).await,
        Commands::Logout => commands::auth::logout(&ctx).await,
        Commands::Me => commands::auth::me(&ctx).await,
        Commands::OauthCallback { url } => commands::auth::oauth_callback(&ctx, &url).await,
        Commands::Mfa { action } => commands::auth::mfa(&ctx, action).await,
        Commands::Cart { action } => commands::shop::cart(&ctx, action),
        Commands::Book { action } => commands::book::run(&ctx, action).await,
        Commands::Checkout(args) => commands::shop::checkout(&ctx, args).await,
        Commands::Notifications { action } => commands::notifications::run(&ctx, action).await,
        Commands::Ugc { action } => commands::ugc::run(&ctx, action).await,
        Commands::Session { action } => commands::session::run(&ctx, action).await,
    }
}
