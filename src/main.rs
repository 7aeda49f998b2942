//! UserHub - user management REST backend
//! Mission: Serve registration, JWT sessions and role-gated account admin

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::Path;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, time::interval};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use userhub_backend::{
    auth::{password::PasswordHasher, AuthService, JwtHandler, SqliteTokenBlacklist, TokenBlacklist},
    config::{BootstrapAdmin, Config},
    create_router,
    users::{SqliteUserStore, UserService},
    AppState,
};

#[derive(Parser, Debug)]
#[command(name = "userhub")]
#[command(about = "User management REST backend with JWT authentication")]
struct Cli {
    /// Listen address
    #[arg(long = "bind", env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    bind_addr: SocketAddr,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "./userhub.db")]
    database_path: String,

    /// HMAC secret for signing tokens (at least 32 bytes)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    #[arg(long, env = "JWT_EXPIRATION_HOURS", default_value_t = 24)]
    jwt_expiration_hours: i64,

    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    bcrypt_cost: u32,

    /// Blacklist sweep period in seconds; 0 disables the sweeper
    #[arg(long = "cleanup-interval-secs", env = "BLACKLIST_CLEANUP_INTERVAL_SECS", default_value_t = 3600)]
    cleanup_interval_secs: u64,

    #[arg(long, env = "BOOTSTRAP_ADMIN_USERNAME")]
    bootstrap_admin_username: Option<String>,

    #[arg(long, env = "BOOTSTRAP_ADMIN_EMAIL")]
    bootstrap_admin_email: Option<String>,

    #[arg(long, env = "BOOTSTRAP_ADMIN_PHONE")]
    bootstrap_admin_phone: Option<String>,

    #[arg(long, env = "BOOTSTRAP_ADMIN_PASSWORD", hide_env_values = true)]
    bootstrap_admin_password: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let bootstrap_admin = match (
            self.bootstrap_admin_username,
            self.bootstrap_admin_email,
            self.bootstrap_admin_phone,
            self.bootstrap_admin_password,
        ) {
            (Some(username), Some(email), Some(phone), Some(password)) => Some(BootstrapAdmin {
                username,
                email,
                phone,
                password,
            }),
            (None, None, None, None) => None,
            _ => anyhow::bail!(
                "Bootstrap admin needs all of BOOTSTRAP_ADMIN_USERNAME, _EMAIL, _PHONE and _PASSWORD"
            ),
        };

        let config = Config {
            bind_addr: self.bind_addr,
            database_path: self.database_path,
            jwt_secret: self.jwt_secret,
            jwt_expiration_hours: self.jwt_expiration_hours,
            bcrypt_cost: self.bcrypt_cost,
            cleanup_interval: Duration::from_secs(self.cleanup_interval_secs),
            bootstrap_admin,
        };
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    let config = Cli::parse().into_config()?;

    info!("Starting UserHub backend");

    let user_store = Arc::new(
        SqliteUserStore::new(&config.database_path).context("Failed to open user store")?,
    );
    let blacklist = Arc::new(
        SqliteTokenBlacklist::new(&config.database_path)
            .context("Failed to open token blacklist")?,
    );
    let hasher = PasswordHasher::new(config.bcrypt_cost)?;
    let jwt_handler = JwtHandler::new(&config.jwt_secret, config.jwt_expiration_hours);

    info!("Database initialized at: {}", config.database_path);

    let auth = Arc::new(AuthService::new(
        user_store.clone(),
        blacklist.clone(),
        jwt_handler,
        hasher.clone(),
    ));
    let users = Arc::new(UserService::new(user_store, hasher));

    if let Some(admin) = config.bootstrap_admin.clone() {
        let users = users.clone();
        let seeded = tokio::task::spawn_blocking(move || users.bootstrap_admin(&admin))
            .await
            .context("Bootstrap task failed")??;
        if seeded.is_none() {
            debug!("Admin account already present; bootstrap skipped");
        }
    }

    if config.cleanup_interval.is_zero() {
        info!("Blacklist sweeper disabled");
    } else {
        tokio::spawn(blacklist_sweeper(blacklist, config.cleanup_interval));
    }

    let app = create_router(AppState { auth, users });

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Periodically purge blacklist entries whose tokens have expired anyway
async fn blacklist_sweeper(blacklist: Arc<SqliteTokenBlacklist>, period: Duration) {
    info!("Blacklist sweeper running every {}s", period.as_secs());

    let mut ticker = interval(period);
    loop {
        ticker.tick().await;

        let store = blacklist.clone();
        match tokio::task::spawn_blocking(move || store.cleanup()).await {
            Ok(Ok(0)) => debug!("Blacklist sweep: nothing expired"),
            Ok(Ok(purged)) => debug!("Blacklist sweep removed {} entries", purged),
            Ok(Err(e)) => warn!("Blacklist cleanup failed: {:#}", e),
            Err(e) => warn!("Blacklist cleanup task panicked: {}", e),
        }
    }
}

/// Initialize tracing with an env-overridable filter
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "userhub_backend=debug,userhub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate's own .env when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
