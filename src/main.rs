use clap::Parser;
use tracing::debug;

use seqlink::cli::Cli;
use seqlink::config::StaticConfig;
use seqlink::interfaces::cli::run_cli_command;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match StaticConfig::load_from(&cli.config) {
        Ok(config) => seqlink::config::set_config(config),
        Err(e) => {
            eprintln!("{}", e.format_colored());
            std::process::exit(1);
        }
    };

    // 保持 guard 存活直到进程退出
    let _log_guard = match seqlink::system::logging::init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            std::process::exit(1);
        }
    };
    debug!("Configuration loaded from {}", cli.config);

    if let Err(e) = run_cli_command(cli.command, &config).await {
        eprintln!("{}", e.format_colored());
        std::process::exit(e.exit_code());
    }
}
