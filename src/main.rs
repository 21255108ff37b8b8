use std::process::ExitCode;

use aarogya_portal::config::PortalConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match PortalConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    aarogya_portal::init_tracing(&config.log_filter);

    match aarogya_portal::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Portal stopped: {e}");
            ExitCode::FAILURE
        }
    }
}
