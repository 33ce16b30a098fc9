use clap::Parser;
use client::game::ClientView;
use client::network::ClientSession;
use log::info;
use shared::NeutralInput;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Room identifier shared by the hosting player
    #[arg(short, long)]
    room: String,

    /// Tick rate (input sends and render updates per second)
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut session = ClientSession::connect(&args.room).await?;
    info!("Role: {:?}", session.role());

    let mut view = ClientView::new();
    // Headless binary: an embedding frontend would supply a real input
    // device here.
    let mut input = NeutralInput;

    tokio::select! {
        _ = session.run(&mut view, &mut input, args.tick_rate) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
