use clap::Parser;
use client::game::WorldView;
use client::network::{register_world, ClientError, WorldClient};
use log::{info, warn};
use rand::Rng;
use shared::{Position, WORLD_HEIGHT, WORLD_WIDTH};
use std::time::Duration;

const DIRECTIONS: [&str; 4] = ["up", "down", "left", "right"];

#[derive(Parser, Debug)]
#[command(author, version, about = "Wandering bot for the world server", long_about = None)]
struct Args {
    /// Server base URL, http:// or ws://
    #[arg(short = 's', long, default_value = "http://127.0.0.1:3000")]
    server: String,

    /// World name to join
    #[arg(short = 'w', long, default_value = "meadow")]
    world: String,

    /// Number of moves before disconnecting
    #[arg(short = 'm', long, default_value = "50")]
    moves: u32,

    /// Distance covered by a single move
    #[arg(long, default_value = "25.0")]
    step: f64,

    /// Milliseconds between moves
    #[arg(long, default_value = "100")]
    interval_ms: u64,

    /// Viewport size reported to the server
    #[arg(long, default_value = "1280.0")]
    viewport: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    if args.server.starts_with("http") {
        register_world(&args.server, &args.world).await?;
    }

    let mut socket = WorldClient::connect(&args.server, &args.world).await?;
    let mut view = WorldView::new();
    view.apply(&socket.next_message().await?);

    info!(
        "Joined world '{}' as player {:?} with {} other players",
        args.world,
        view.player_id,
        view.players().len().saturating_sub(1)
    );

    let mut rng = rand::thread_rng();
    let (width, height) = (f64::from(WORLD_WIDTH), f64::from(WORLD_HEIGHT));
    let mut position = view
        .own_position()
        .unwrap_or_else(|| Position::new(width / 2.0, height / 2.0));
    let interval = Duration::from_millis(args.interval_ms);

    for _ in 0..args.moves {
        let direction = DIRECTIONS[rng.gen_range(0..DIRECTIONS.len())];
        let (dx, dy) = match direction {
            "up" => (0.0, -args.step),
            "down" => (0.0, args.step),
            "left" => (-args.step, 0.0),
            _ => (args.step, 0.0),
        };
        position = Position::new(position.x + dx, position.y + dy)
            .clamped(width, height);

        view.set_own_position(position);
        socket
            .send_move(position.x, position.y, Some(direction.to_string()))
            .await?;
        socket
            .send_viewport(position.x, position.y, args.viewport, args.viewport)
            .await?;

        // Drain whatever arrived since the last move.
        loop {
            match socket.next_message_within(interval).await {
                Ok(message) => view.apply(&message),
                Err(ClientError::Timeout) => break,
                Err(e) => {
                    warn!("Connection lost: {}", e);
                    return Ok(());
                }
            }
        }
    }

    info!(
        "Finished at ({:.1}, {:.1}); {} players and {} objects in view",
        position.x,
        position.y,
        view.players().len(),
        view.environment().len()
    );

    socket.close().await?;
    Ok(())
}
