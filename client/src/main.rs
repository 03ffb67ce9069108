use clap::Parser;
use client::input::{InputEvent, Wanderer};
use client::network::{Client, ClientConfig};
use log::info;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server WebSocket URL
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:6970")]
    server: String,

    /// Minimum time between latency pings in milliseconds
    #[arg(long, default_value = "1000")]
    ping_cooldown_ms: u64,

    /// Local simulation frame length in milliseconds
    #[arg(short = 'f', long, default_value = "16")]
    frame_ms: u64,

    /// Press random directions instead of standing still
    #[arg(short = 'w', long)]
    wander: bool,

    /// Time between wander direction changes in milliseconds
    #[arg(long, default_value = "750")]
    wander_ms: u64,

    /// Time between status reports in milliseconds
    #[arg(short = 'r', long, default_value = "2000")]
    report_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = ClientConfig {
        ping_cooldown: Duration::from_millis(args.ping_cooldown_ms),
        frame_interval: Duration::from_millis(args.frame_ms.max(1)),
    };

    info!("Connecting to: {}", args.server);
    let mut client = Client::connect(&args.server, config).await?;

    // Held for the whole session; dropping every sender disconnects.
    let (input_tx, input_rx) = mpsc::channel::<InputEvent>(32);

    if args.wander {
        let input_tx = input_tx.clone();
        let period = Duration::from_millis(args.wander_ms.max(1));
        tokio::spawn(async move {
            let mut wanderer = Wanderer::new();
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                for event in wanderer.next_events() {
                    if input_tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
        });
    }

    let view_rx = client.subscribe();
    let report_period = Duration::from_millis(args.report_ms.max(1));
    tokio::spawn(async move {
        let mut ticker = interval(report_period);
        loop {
            ticker.tick().await;
            let view = view_rx.borrow().clone();
            let position = view
                .me
                .and_then(|id| view.players.iter().find(|p| p.id == id))
                .map(|p| format!("({:.0}, {:.0})", p.x, p.y))
                .unwrap_or_else(|| "-".to_string());
            match view.latency_ms {
                Some(ms) => info!(
                    "{} players, me {:?} at {}, latency {:.1} ms",
                    view.players.len(),
                    view.me,
                    position,
                    ms
                ),
                None => info!(
                    "{} players, me {:?} at {}, latency unknown",
                    view.players.len(),
                    view.me,
                    position
                ),
            }
        }
    });

    tokio::select! {
        result = client.run(input_rx) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, disconnecting");
        }
    }

    drop(input_tx);
    Ok(())
}
