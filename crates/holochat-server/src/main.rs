mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use holochat_api::mail::{LogMailer, Mailer, SmtpMailer};
use holochat_api::weather::WeatherClient;
use holochat_api::{AppState, AppStateInner};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "holochat=debug,holochat_api=debug,holochat_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = holochat_db::Database::open(&config.db_path)?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(
            &smtp.host,
            &smtp.username,
            &smtp.password,
            &config.mail_from,
        )?),
        None => {
            warn!("SMTP_HOST/SMTP_USERNAME/SMTP_PASSWORD not set, outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        mailer,
        weather: WeatherClient::new(config.weather.clone()),
    });

    let app = holochat_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Holochat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
