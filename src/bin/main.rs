use anyhow::Result;
use clap::{Parser, Subcommand};
use session_gate::{
    AuthToken, CookieName, EmailChallenger, SessionConfig, build_cleared_cookie,
    build_session_cookie,
};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "session-gate")]
#[command(about = "Session cookie and email challenge tooling")]
struct Cli {
    /// JSON config file (defaults to SESSION_GATE_* environment variables)
    #[arg(long, global = true)]
    config: Option<String>,
    /// Base address of the identity service
    #[arg(long, global = true, env = "SESSION_GATE_IDENTITY_URL")]
    identity_url: Option<Url>,
    /// Timeout for identity service calls, in seconds
    #[arg(long, global = true)]
    timeout_seconds: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the identity service to email a one-time passcode
    RequestOtp {
        #[arg(long)]
        email: String,
    },
    /// Ask the identity service to email a verification link
    RequestVerification {
        #[arg(long)]
        email: String,
    },
    /// Print the Set-Cookie line for a session or for clearing one
    Cookie {
        /// Cookie name (defaults to the configured one)
        #[arg(long)]
        name: Option<String>,
        /// Session token to set
        #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
        token: Option<String>,
        /// Print the cookie that deletes the session instead
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("session_gate=info".parse()?))
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();
    let config = build_config(cli.config.as_deref(), cli.identity_url, cli.timeout_seconds)?;

    match cli.command {
        Commands::RequestOtp { email } => {
            info!(
                "Requesting OTP from {}",
                config.identity_service_url.as_str()
            );
            let challenger = config.email_challenger()?;
            let cancel = cancel_on_ctrl_c();

            let otp_id = challenger.request_otp(&cancel, &email).await?;
            println!("OTP requested.");
            println!("  otpId: {}", otp_id);
        }
        Commands::RequestVerification { email } => {
            info!(
                "Requesting verification email from {}",
                config.identity_service_url.as_str()
            );
            let challenger = config.email_challenger()?;
            let cancel = cancel_on_ctrl_c();

            challenger.request_verification(&cancel, &email).await?;
            println!("Verification email requested.");
        }
        Commands::Cookie { name, token, clear } => {
            let name = name
                .map(CookieName::new)
                .unwrap_or_else(|| config.cookie_name.clone());

            let cookie = match token {
                Some(token) if !clear => build_session_cookie(&name, &AuthToken::new(token)),
                _ => build_cleared_cookie(&name),
            };

            println!("Set-Cookie: {}", cookie.to_header_value()?.to_str()?);
        }
    }

    Ok(())
}

/// Build configuration from a file or the environment, then apply CLI flags.
fn build_config(
    path: Option<&str>,
    identity_url: Option<Url>,
    timeout_seconds: Option<u64>,
) -> Result<SessionConfig> {
    let mut config = match path {
        Some(path) => {
            info!("Loading config from {}", path);
            SessionConfig::load(path)?
        }
        None => SessionConfig::from_env()?,
    };

    if let Some(url) = identity_url {
        config.identity_service_url = url;
    }
    if let Some(secs) = timeout_seconds {
        config.request_timeout_seconds = Some(secs);
    }

    config.validate()?;
    Ok(config)
}

/// Token that fires when the user presses Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            trigger.cancel();
        }
    });
    cancel
}
