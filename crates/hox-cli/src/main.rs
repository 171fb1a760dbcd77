use clap::Parser;
use tracing_subscriber::EnvFilter;

use hox_client::{ClientConfig, Credentials};

mod client;
mod commands;
mod printer;

#[derive(Parser)]
#[command(name = "hox")]
#[command(about = "Play xiangqi on a HOX game server from the console", long_about = None)]
struct Cli {
    /// Server host (defaults to HOX_SERVER_HOST or games.playxiangqi.com)
    #[arg(long)]
    host: Option<String>,

    /// Server port (defaults to HOX_SERVER_PORT or 80)
    #[arg(short, long)]
    port: Option<u16>,

    /// Player id; a guest id is generated when omitted
    #[arg(long, default_value = "")]
    pid: String,

    /// Password (empty for guests)
    #[arg(long, default_value = "")]
    password: String,

    /// Print notifications as JSON lines
    #[arg(long)]
    json: bool,

    /// Log in immediately instead of waiting for `login`
    #[arg(short, long)]
    login: bool,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries notifications.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    let credentials = Credentials::new(cli.pid, cli.password);

    println!(
        "Connecting to {} as '{}' (type `help` for commands)",
        config.address(),
        credentials.pid
    );

    if let Err(e) = client::start_client(config, credentials, cli.json, cli.login).await {
        eprintln!("Error: {}", e);
    }
}
