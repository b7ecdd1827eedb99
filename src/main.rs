use autoswitch_lib::DaemonOptions;
use clap::Parser;
use std::path::PathBuf;

/// Switch the Twitch category to whatever game is running.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration directory (defaults to the per-user config dir)
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let options = DaemonOptions {
        config_dir: cli.config_dir,
    };

    if let Err(e) = autoswitch_lib::run(options).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}
