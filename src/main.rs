use clap::Parser;
use techne_ai::{AiError, Config, Orchestrator};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod app;
mod cli;
mod commands;
mod display;
mod input;
mod utils;

use crate::app::Application;
use crate::cli::Args;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

fn load_config(args: &Args) -> Result<Config, AiError> {
    let mut config = match &args.config {
        Some(path) => Config::load_with(path, |key| std::env::var(key).ok())?,
        None => Config::load()?,
    };
    if let Some(url) = &args.local_url {
        config.set_local_url(url);
    }
    config.verbose |= args.verbose;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            display::display_error(&e);
            std::process::exit(1);
        }
    };

    let orchestrator = Orchestrator::new(config);
    let mut app = Application::new(args, orchestrator);
    if let Err(e) = app.run().await {
        display::display_error(&e);
        std::process::exit(1);
    }
}
