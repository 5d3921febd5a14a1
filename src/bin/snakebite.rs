use clap::Parser;
use snakebite::config::{AppConfig, ConfigOverrides};
use snakebite::{logger, server};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "snakebite", version, about = "Restaurant REST API server", long_about = None)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long, help = "Path to a config file (TOML). Defaults to ./snakebite.toml when present.")]
    config: Option<PathBuf>,
    #[arg(long, help = "Address to listen on, e.g. 0.0.0.0:8000")]
    listen: Option<String>,
    #[arg(long, help = "Directory for the write-ahead log. Omit to keep data in memory.")]
    data_dir: Option<PathBuf>,
    #[arg(long, help = "error|warn|info|debug|trace")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        config: cli.config,
        listen: cli.listen,
        data_dir: cli.data_dir,
        log_level: cli.log_level,
    };
    let cfg = match AppConfig::load(&overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };
    if let Err(e) = logger::init(&cfg.log_level, cfg.log_dir.as_deref()) {
        eprintln!("error: failed to initialize logging: {e}");
        std::process::exit(1);
    }
    if let Err(e) = server::serve(cfg).await {
        log::error!("server error: {e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
