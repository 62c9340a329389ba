//! Terminal chat client entry point
//!
//! Run with:
//! ```bash
//! CHAT_USER_ID=u1 CHAT_USER_EMAIL=ann@example.com cargo run -p chat-cli
//! ```
//!
//! Configuration is loaded from environment variables.

use chat_common::{try_init_tracing_with_config, AppConfig, AppError, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Configuration decides the log format, so it loads first
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(AppError::from(e).exit_code());
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(app = %config.app.name, env = ?config.app.env, "Starting chat client");

    if let Err(e) = chat_cli::run(config).await {
        error!(error = %e, code = e.error_code(), "Chat client failed");
        std::process::exit(e.exit_code());
    }
}
