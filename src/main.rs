use clap::Parser;
use std::sync::Arc;
use tripleset::config::{Config, SeatConfig};
use tripleset::oracle::ClassicOracle;
use tripleset::session::Session;
use tripleset::ui::LogUi;

/// Headless demo table: synthetic players racing for sets, rendered as
/// log lines. Ctrl+C or "Q" + Enter ends the game early.
#[derive(Parser, Debug)]
#[command(about = "real-time set-claiming table")]
struct Args {
    /// Number of synthetic players at the table.
    #[arg(long, default_value_t = 2)]
    players: usize,

    /// Board size in slots.
    #[arg(long, default_value_t = 12)]
    board: usize,

    /// Pool size in items (81 is the classic deck).
    #[arg(long, default_value_t = 81)]
    pool: usize,

    /// Round length in seconds.
    #[arg(long, default_value_t = 60)]
    round: u64,

    /// Point freeze in milliseconds.
    #[arg(long, default_value_t = 3_000)]
    point_freeze: u64,

    /// Penalty freeze in milliseconds.
    #[arg(long, default_value_t = 1_000)]
    penalty_freeze: u64,
}

fn main() -> anyhow::Result<()> {
    tripleset::log();
    let args = Args::parse();
    let config = Config {
        board_size: args.board,
        pool_size: args.pool,
        round_millis: args.round * 1_000,
        point_freeze_millis: args.point_freeze,
        penalty_freeze_millis: args.penalty_freeze,
        seats: vec![SeatConfig { human: false }; args.players],
        ..Config::default()
    };

    let session = Session::start(config, Arc::new(ClassicOracle), Arc::new(LogUi));

    let interrupt = session.handle();
    ctrlc::set_handler(move || {
        log::warn!("interrupt received, winding the table down");
        interrupt.request_termination();
    })?;

    let quit = session.handle();
    std::thread::spawn(move || {
        loop {
            let ref mut buffer = String::new();
            if let Ok(_) = std::io::stdin().read_line(buffer) {
                if buffer.trim().to_uppercase() == "Q" {
                    log::warn!("graceful quit requested");
                    quit.request_termination();
                    break;
                }
            }
        }
    });

    let scores = session.join();
    for (id, score) in scores.iter().enumerate() {
        log::info!("P{} finished with {} points", id, score);
    }
    Ok(())
}
