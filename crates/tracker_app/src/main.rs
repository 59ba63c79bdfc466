use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use tracker_app::app::{run, AppConfig, Cli};

fn main() {
    // stdout carries command output, logs go to stderr
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(%err, "ignoring invalid environment configuration");
            AppConfig::default()
        }
    };
    if let Err(err) = run(config, cli) {
        eprintln!("tracker: {err:#}");
        std::process::exit(1);
    }
}
