use crate::board::Board;
use crate::config::Config;
use crate::dealer::Dealer;
use crate::gate::{PauseGate, Quiescence};
use crate::oracle::Oracle;
use crate::player::{Claim, Player, Seat};
use crate::ui::Ui;
use crate::{PlayerId, Slot};
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A live table: one dealer thread, one thread per seat, one extra per
/// synthetic seat. The only inbound surface is `submit_action` plus
/// `request_termination`; everything else flows out through the Ui.
pub struct Session {
    board: Arc<Board>,
    gate: Arc<PauseGate>,
    seats: Vec<Arc<Seat>>,
    terminated: Arc<AtomicBool>,
    dealer: Option<JoinHandle<()>>,
}

/// Cheap clonable handle for signal handlers and input layers that
/// outlive the borrow of the session itself.
#[derive(Clone)]
pub struct SessionHandle {
    terminated: Arc<AtomicBool>,
    gate: Arc<PauseGate>,
}

impl SessionHandle {
    pub fn request_termination(&self) {
        self.terminated.store(true, Ordering::SeqCst);
        self.gate.interrupt();
    }
}

impl Session {
    /// Spawns the whole table. Panics on a nonsensical configuration;
    /// that is a caller bug, not a runtime condition.
    pub fn start(config: Config, oracle: Arc<dyn Oracle>, ui: Arc<dyn Ui>) -> Self {
        assert!(config.board_size >= 3, "board cannot host a triple");
        assert!(config.pool_size >= 3, "pool cannot host a triple");
        assert!(!config.seats.is_empty(), "table needs at least one seat");

        let board = Arc::new(Board::new(
            config.board_size,
            config.pool_size,
            config.seats.len(),
            ui.clone(),
        ));
        let gate = Arc::new(PauseGate::default());
        let quiescence = Arc::new(Quiescence::default());
        let terminated = Arc::new(AtomicBool::new(false));
        // each seat has at most one claim in flight, so this never blocks
        let (claims_tx, claims_rx) = bounded::<Claim>(config.seats.len());

        let seats: Vec<Arc<Seat>> = config
            .seats
            .iter()
            .enumerate()
            .map(|(id, seat)| Arc::new(Seat::new(id, seat.human)))
            .collect();

        let handles: Vec<JoinHandle<()>> = seats
            .iter()
            .map(|seat| {
                let player = Player::new(
                    seat.clone(),
                    board.clone(),
                    gate.clone(),
                    quiescence.clone(),
                    ui.clone(),
                    claims_tx.clone(),
                    terminated.clone(),
                    &config,
                );
                std::thread::Builder::new()
                    .name(format!("player-{}", seat.id))
                    .spawn(move || player.run())
                    .expect("spawn player thread")
            })
            .collect();

        let dealer = Dealer::new(
            board.clone(),
            oracle,
            ui,
            gate.clone(),
            quiescence,
            seats.clone(),
            claims_rx,
            handles,
            terminated.clone(),
            config,
        );
        let dealer = std::thread::Builder::new()
            .name("dealer".into())
            .spawn(move || dealer.run())
            .expect("spawn dealer thread");

        Self {
            board,
            gate,
            seats,
            terminated,
            dealer: Some(dealer),
        }
    }

    /// Entry point for the input layer: an action for `player` naming
    /// `slot`. Dropped silently whenever the protocol says so.
    pub fn submit_action(&self, player: PlayerId, slot: Slot) -> bool {
        match self.seats.get(player) {
            Some(seat) if slot < self.board.size() => seat.offer(slot, &self.gate, &self.board),
            _ => false,
        }
    }

    pub fn request_termination(&self) {
        self.handle().request_termination();
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            terminated: self.terminated.clone(),
            gate: self.gate.clone(),
        }
    }

    /// Read access for input layers and renderers that want to poll
    /// rather than mirror Ui events.
    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    pub fn scores(&self) -> Vec<u32> {
        self.seats.iter().map(|seat| seat.score()).collect()
    }

    pub fn is_finished(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Blocks until the dealer thread exits (game over or termination)
    /// and returns the final scores.
    pub fn join(mut self) -> Vec<u32> {
        if let Some(dealer) = self.dealer.take() {
            if dealer.join().is_err() {
                log::warn!("[session] dealer thread panicked before exit");
            }
        }
        self.scores()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.request_termination();
        if let Some(dealer) = self.dealer.take() {
            let _ = dealer.join();
        }
    }
}
