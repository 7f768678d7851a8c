//! Log relay and static file server
//!
//! Configuration comes from the environment, see [`ServerSettings::from_env`].

use std::process::ExitCode;

use blowaway::ServerSettings;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .try_init();

    let settings = match ServerSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match blowaway::server::run(&settings).await {
        Ok(()) => {
            log::info!("Server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
