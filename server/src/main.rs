use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerResult};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of games held at once
    #[arg(short, long, default_value = "1024")]
    max_sessions: usize,
}

#[tokio::main]
async fn main() -> ServerResult<()> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    info!("Starting server...");
    info!("Capacity: {} games", args.max_sessions);

    let mut server = Server::new(&address, args.max_sessions).await?;
    let handle = server.handle();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
        handle.shutdown();
    });

    server.run().await?;

    Ok(())
}
