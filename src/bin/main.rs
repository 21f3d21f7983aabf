use anyhow::Result;
use clap::{Parser, Subcommand};
use forum_server::{create_app, AuthConfig, DatabaseConfig};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forum-server")]
#[command(about = "REST server for forums and comments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST server
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
        #[arg(short, long, default_value = "8080")]
        port: u16,
        #[arg(long, default_value = "memory", env = "FORUM_DB_URL")]
        db_url: String,
        /// Allow anonymous access (single local user)
        #[arg(long, default_value_t = true)]
        allow_anonymous: bool,
        /// Static API key for a service account
        #[arg(long, env = "FORUM_API_KEY")]
        api_key: Option<String>,
        /// JWKS endpoint URL for JWT RS256 signature verification
        #[arg(long, env = "FORUM_JWKS_URL")]
        jwks_url: Option<String>,
        /// JWT issuer for validation (required when using JWKS)
        #[arg(long, env = "FORUM_JWT_ISSUER")]
        jwt_issuer: Option<String>,
        /// JWT audience for validation
        #[arg(long, env = "FORUM_JWT_AUDIENCE")]
        jwt_audience: Option<String>,
    },
    /// Initialize the database schema
    Init {
        #[arg(long, default_value = "memory", env = "FORUM_DB_URL")]
        db_url: String,
    },
    /// Populate the database with demo data
    Seed {
        #[arg(long, default_value = "memory", env = "FORUM_DB_URL")]
        db_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("forum_server=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            port,
            db_url,
            allow_anonymous,
            api_key,
            jwks_url,
            jwt_issuer,
            jwt_audience,
        } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url: {}", db_config.url);

            let auth_config = build_auth_config(
                allow_anonymous,
                api_key,
                jwks_url,
                jwt_issuer,
                jwt_audience,
            );

            let app = create_app(db_config, auth_config).await?;
            let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind, port)).await?;
            info!("Listening on http://{}:{}", bind, port);

            axum::serve(listener, app).await?;
        }
        Commands::Init { db_url } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url: {}", db_config.url);

            info!("Initializing database...");
            let db = forum_server::create_connection(db_config).await?;
            forum_server::ensure_schema(&db).await?;
            info!("Database initialized successfully");
        }
        Commands::Seed { db_url } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url: {}", db_config.url);

            let db = forum_server::create_connection(db_config).await?;
            forum_server::ensure_schema(&db).await?;
            forum_server::seed::seed_demo_data(&db).await?;
            info!("Demo data seeded");
        }
    }

    Ok(())
}

/// Build authentication configuration from CLI arguments.
fn build_auth_config(
    allow_anonymous: bool,
    api_key: Option<String>,
    jwks_url: Option<String>,
    jwt_issuer: Option<String>,
    jwt_audience: Option<String>,
) -> AuthConfig {
    let mut config = AuthConfig {
        allow_anonymous,
        ..Default::default()
    };

    if let Some(key) = api_key {
        info!("Static API key authentication enabled");
        config.api_key = Some(key);
    }

    // JWT needs both the key set and an issuer to validate against.
    if let (Some(url), Some(issuer)) = (jwks_url, jwt_issuer) {
        info!("JWT authentication enabled (RS256 with JWKS)");
        config.jwt_enabled = true;
        config.jwks_url = Some(url);
        config.jwt_issuer = Some(issuer);
        config.jwt_audience = jwt_audience;
    }

    if !allow_anonymous && config.api_key.is_none() && !config.jwt_enabled {
        tracing::warn!(
            "No authentication method configured and anonymous access disabled - all requests will be rejected"
        );
    }

    config
}
