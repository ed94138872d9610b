use clap::Parser;

use ticketdesk::cli::CliHandler;
use ticketdesk::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(format!("ticketdesk={}", log_level))
        .with_writer(std::io::stderr);
    subscriber.init();

    let mut handler = CliHandler::with_config_path(cli.config);
    if cli.no_store {
        handler = handler.without_session_storage();
    }

    if let Err(e) = handler.execute(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
