use std::sync::Arc;

use letitout::api::router;
use letitout::classifier::{Classifier, ClassifierConfig, HttpClassifier, NoopClassifier};
use letitout::config::AppConfig;
use letitout::db;
use letitout::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "letitout=debug,tower_http=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pool = db::connect(&config.database_url, 5).await?;

    let classifier: Arc<dyn Classifier> = match ClassifierConfig::new_from_env() {
        Ok(classifier_config) => {
            info!("using classifier model {}", classifier_config.model);
            Arc::new(HttpClassifier::new(classifier_config)?)
        }
        Err(err) => {
            warn!("{}; all content will be stored as notes", err);
            Arc::new(NoopClassifier)
        }
    };

    let state = AppState {
        db: pool.clone(),
        classifier,
        horizon_days: config.horizon_days,
    };

    let app = router(state).layer(config.cors.layer());

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
