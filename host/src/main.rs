use clap::Parser;
use host::game::{CoinLedger, TetherGame};
use host::network::HostSession;
use log::info;
use shared::NeutralInput;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to open the room on
    #[arg(short = 'H', long, default_value = "127.0.0.1:7777")]
    bind: String,

    /// Tick rate (simulation updates per second)
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Trait id for the host player
    #[arg(long, default_value = "balanced")]
    trait_p1: String,

    /// Trait id for the joining player
    #[arg(long, default_value = "balanced")]
    trait_p2: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut session = HostSession::bind(&args.bind).await?;
    info!("Role: {:?}", session.role());
    info!("Share this room identifier with the other player: {}", session.room_id());

    let mut game = TetherGame::new(Some(&args.trait_p1), Some(&args.trait_p2));
    let mut ledger = CoinLedger::new();
    // Headless binary: an embedding frontend would supply a real input
    // device here.
    let mut input = NeutralInput;

    tokio::select! {
        _ = session.run(&mut game, &mut input, &mut ledger, args.tick_rate) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    info!("Session over, {} coins banked", ledger.total());
    Ok(())
}
