//! metered-demo HTTP server
//!
//! Starts an Axum web server exposing the demo endpoints and their metrics.

use clap::Parser;
use metered_demo::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    server, telemetry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        let template = generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(&path, template)?;
                eprintln!("Configuration template written to {}", path);
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        config = cli.config.as_deref().unwrap_or("<defaults>"),
        "Starting metered-demo server on {}:{}",
        config.server.host,
        config.server.port
    );

    server::serve(config).await?;

    Ok(())
}
