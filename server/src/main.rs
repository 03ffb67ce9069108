use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerConfig};
use std::net::{IpAddr, SocketAddr};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = shared::SERVER_PORT)]
    port: u16,

    /// Simulation ticks per second
    #[arg(short, long, default_value_t = shared::SERVER_FPS)]
    tick_rate: u32,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "64")]
    max_clients: usize,

    /// Outbound messages buffered per connection before it is dropped
    #[arg(short, long, default_value = "256")]
    queue_capacity: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = ServerConfig {
        bind_addr: SocketAddr::new(args.host, args.port),
        tick_rate: args.tick_rate.max(1),
        max_clients: args.max_clients,
        queue_capacity: args.queue_capacity.max(1),
    };

    info!(
        "Starting server: tick rate {} Hz, max {} clients",
        config.tick_rate, config.max_clients
    );

    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
