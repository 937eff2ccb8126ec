pub mod config;
pub mod console; // stdin/stdout transport
pub mod core_state; // Transport-agnostic state
pub mod models;
pub mod db;
pub mod pipeline;
pub mod review; // Human review of extracted deals

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::core_state::{CoreError, CoreState};

/// Run the console application for the local user until stdin closes.
pub async fn run() -> Result<(), CoreError> {
    // Initialize tracing; stdout belongs to the console
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = config::Settings::from_env();
    let core = Arc::new(CoreState::from_settings(&settings)?);
    core.restore_sessions()?;

    let sweeper = {
        let core = Arc::clone(&core);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config::SESSION_SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                if let Err(e) = core.expire_idle_sessions() {
                    tracing::warn!(error = %e, "Session sweep failed");
                }
            }
        })
    };

    let user_id = whoami();
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let result = console::run(&core, &user_id, stdin, tokio::io::stdout()).await;
    sweeper.abort();

    tracing::info!("{} stopped", config::APP_NAME);
    Ok(result?)
}

/// Console sessions are keyed by the local account name.
fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "console".to_string())
}
