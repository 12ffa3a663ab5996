use crate::board::{Board, Placement, MARKERS_PER_PLAYER};
use crate::config::Config;
use crate::gate::{PauseGate, Quiescence};
use crate::ui::Ui;
use crate::{Item, PlayerId, Slot};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use rand::seq::IndexedRandom;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Inbound actions beyond this are dropped, not queued.
const ACTION_BUFFER: usize = 3;

/// Arbitration result delivered back to a claimant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The triple was legal: score, then point-freeze.
    Point,
    /// The triple was illegal: penalty-freeze, no score.
    Penalty,
    /// The claimed slots changed under the claim (another player's
    /// valid claim, or a reshuffle). No freeze, resume immediately.
    Invalidated,
}

/// A completed triple awaiting validation, snapshotted at the moment
/// the third marker lands so later board churn cannot corrupt it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub player: PlayerId,
    pub slots: [Slot; 3],
    pub items: [Item; 3],
}

/// State shared between a player's thread, its synthetic input loop,
/// the dealer, and the session surface. One per seat for the whole
/// session.
pub struct Seat {
    pub id: PlayerId,
    pub human: bool,
    score: AtomicU32,
    frozen: AtomicBool,
    claim_pending: AtomicBool,
    working: AtomicBool,
    ai_working: AtomicBool,
    // raised by the synthetic loop around an injection, cleared by the
    // player loop once the action has fully resolved
    injected: AtomicBool,
    actions_tx: Sender<Slot>,
    actions_rx: Receiver<Slot>,
    verdict_tx: Sender<Verdict>,
    verdict_rx: Receiver<Verdict>,
}

impl Seat {
    pub fn new(id: PlayerId, human: bool) -> Self {
        let (actions_tx, actions_rx) = bounded(ACTION_BUFFER);
        let (verdict_tx, verdict_rx) = bounded(1);
        Self {
            id,
            human,
            score: AtomicU32::new(0),
            frozen: AtomicBool::new(false),
            claim_pending: AtomicBool::new(false),
            working: AtomicBool::new(false),
            ai_working: AtomicBool::new(false),
            injected: AtomicBool::new(false),
            actions_tx,
            actions_rx,
            verdict_tx,
            verdict_rx,
        }
    }

    pub fn score(&self) -> u32 {
        self.score.load(Ordering::SeqCst)
    }

    pub fn add_point(&self) -> u32 {
        self.score.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    pub fn claim_pending(&self) -> bool {
        self.claim_pending.load(Ordering::SeqCst)
    }

    /// Quiescent from the dealer's point of view: neither the player
    /// loop nor the synthetic loop is mid-action.
    pub fn idle(&self) -> bool {
        !self.working.load(Ordering::SeqCst) && !self.ai_working.load(Ordering::SeqCst)
    }

    /// Offers an action from the input layer. Dropped silently while
    /// the session is paused, the seat is frozen or mid-claim, the slot
    /// is empty, or the buffer is full. All of those are normal races.
    pub fn offer(&self, slot: Slot, gate: &PauseGate, board: &Board) -> bool {
        if gate.is_paused() || self.is_frozen() || self.claim_pending() {
            return false;
        }
        if board.item_at(slot).is_none() {
            return false;
        }
        self.actions_tx.try_send(slot).is_ok()
    }

    /// Hands a verdict to the seat's (possibly blocked) claim wait.
    /// Never blocks the dealer; at most one claim is ever outstanding.
    pub fn deliver(&self, verdict: Verdict) {
        if self.verdict_tx.try_send(verdict).is_err() {
            log::debug!("[seat {}] verdict {:?} had nowhere to go", self.id, verdict);
        }
    }

    /// Test hook: reads the verdict the dealer parked on this seat.
    #[cfg(test)]
    pub(crate) fn take_verdict(&self) -> Option<Verdict> {
        self.verdict_rx.try_recv().ok()
    }

    fn rest(&self, quiescence: &Quiescence) {
        self.working.store(false, Ordering::SeqCst);
        quiescence.knock();
    }

    fn ai_rest(&self, quiescence: &Quiescence) {
        self.ai_working.store(false, Ordering::SeqCst);
        quiescence.knock();
    }

    /// Marks the current action as fully resolved: dequeued, applied,
    /// any resulting claim answered and freeze served.
    fn settle(&self) {
        self.injected.store(false, Ordering::SeqCst);
    }

    /// True while an injected action has not fully resolved yet. The
    /// `injected` flag carries the handshake across the gap where the
    /// buffer has drained but the player loop has not settled yet.
    fn busy(&self) -> bool {
        self.injected.load(Ordering::SeqCst)
            || self.working.load(Ordering::SeqCst)
            || self.claim_pending()
            || self.is_frozen()
            || !self.actions_tx.is_empty()
    }
}

/// One player thread: applies actions in submission order, hands off
/// claims, sits out freezes. Synthetic seats get a second thread that
/// feeds random occupied slots through the same entry point a human
/// would use.
pub struct Player {
    seat: Arc<Seat>,
    board: Arc<Board>,
    gate: Arc<PauseGate>,
    quiescence: Arc<Quiescence>,
    ui: Arc<dyn Ui>,
    claims: Sender<Claim>,
    terminated: Arc<AtomicBool>,
    point_freeze: Duration,
    penalty_freeze: Duration,
    tick: Duration,
}

impl Player {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seat: Arc<Seat>,
        board: Arc<Board>,
        gate: Arc<PauseGate>,
        quiescence: Arc<Quiescence>,
        ui: Arc<dyn Ui>,
        claims: Sender<Claim>,
        terminated: Arc<AtomicBool>,
        config: &Config,
    ) -> Self {
        Self {
            seat,
            board,
            gate,
            quiescence,
            ui,
            claims,
            terminated,
            point_freeze: config.point_freeze(),
            penalty_freeze: config.penalty_freeze(),
            tick: config.tick(),
        }
    }

    pub fn run(self) {
        log::info!("[player {}] thread starting", self.seat.id);
        let synthetic = if self.seat.human {
            None
        } else {
            Some(self.spawn_synthetic())
        };
        loop {
            if self.done() {
                break;
            }
            self.gate.wait_while_paused(&self.terminated, self.tick);
            if self.done() {
                break;
            }
            match self.seat.actions_rx.recv_timeout(self.tick) {
                Ok(slot) => {
                    if !self.enter() {
                        break;
                    }
                    self.apply(slot);
                    self.seat.settle();
                    self.seat.rest(&self.quiescence);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        if let Some(handle) = synthetic {
            let _ = handle.join();
        }
        self.seat.rest(&self.quiescence);
        log::info!("[player {}] thread terminated", self.seat.id);
    }

    fn done(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Raises the working flag, then re-checks the pause gate. The
    /// order matters: once the dealer has paused and seen this seat
    /// idle, any later wake lands here and backs off before touching
    /// the board.
    fn enter(&self) -> bool {
        loop {
            if self.done() {
                self.seat.rest(&self.quiescence);
                return false;
            }
            self.seat.working.store(true, Ordering::SeqCst);
            if !self.gate.is_paused() {
                return true;
            }
            self.seat.rest(&self.quiescence);
            self.gate.wait_while_paused(&self.terminated, self.tick);
        }
    }

    /// Toggle semantics: a slot already bearing this seat's marker is
    /// retracted, anything else is a placement attempt. Rejections are
    /// benign races and vanish without effect.
    fn apply(&self, slot: Slot) {
        if self.board.has_marker(self.seat.id, slot) {
            self.board.remove_marker(self.seat.id, slot);
            return;
        }
        match self.board.place_marker(self.seat.id, slot) {
            Placement::AlreadyFull | Placement::SlotEmpty => {}
            Placement::Placed => {
                let marked = self.board.markers_of(self.seat.id);
                if marked.len() == MARKERS_PER_PLAYER {
                    self.claim([marked[0], marked[1], marked[2]]);
                }
            }
        }
    }

    /// Third marker: snapshot, hand off, block for the verdict. The
    /// snapshot cannot race the dealer because board mutation only
    /// happens behind the join-barrier, which this working seat holds
    /// open until it goes idle below.
    fn claim(&self, slots: [Slot; 3]) {
        // intake closes the instant the third marker completes a triple
        self.seat.claim_pending.store(true, Ordering::SeqCst);
        let items = match self.board.items_at(slots) {
            Some(items) => items,
            None => {
                self.seat.claim_pending.store(false, Ordering::SeqCst);
                return;
            }
        };
        while self.seat.verdict_rx.try_recv().is_ok() {}
        let claim = Claim {
            player: self.seat.id,
            slots,
            items,
        };
        if self.claims.send(claim).is_err() {
            self.seat.claim_pending.store(false, Ordering::SeqCst);
            return;
        }
        log::debug!("[player {}] claim submitted: {:?}", self.seat.id, slots);
        match self.await_verdict() {
            Some(Verdict::Point) => self.freeze(self.point_freeze),
            Some(Verdict::Penalty) => self.freeze(self.penalty_freeze),
            Some(Verdict::Invalidated) | None => {
                self.seat.claim_pending.store(false, Ordering::SeqCst);
            }
        }
    }

    fn await_verdict(&self) -> Option<Verdict> {
        // idle while blocked, or the dealer's barrier would never close
        self.seat.rest(&self.quiescence);
        loop {
            match self.seat.verdict_rx.recv_timeout(self.tick) {
                Ok(verdict) => return Some(verdict),
                Err(RecvTimeoutError::Timeout) if !self.done() => continue,
                Err(_) => return None,
            }
        }
    }

    /// Freeze is the seat's own thread sleeping in tick-sized slices,
    /// surfacing a live countdown and staying interruptible.
    fn freeze(&self, total: Duration) {
        self.seat.frozen.store(true, Ordering::SeqCst);
        self.seat.claim_pending.store(false, Ordering::SeqCst);
        let mut remaining = total;
        while !remaining.is_zero() && !self.done() {
            self.ui.set_freeze_countdown(self.seat.id, remaining);
            let step = remaining.min(self.tick);
            std::thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
        self.ui.set_freeze_countdown(self.seat.id, Duration::ZERO);
        self.seat.frozen.store(false, Ordering::SeqCst);
    }

    fn spawn_synthetic(&self) -> JoinHandle<()> {
        let seat = self.seat.clone();
        let board = self.board.clone();
        let gate = self.gate.clone();
        let quiescence = self.quiescence.clone();
        let terminated = self.terminated.clone();
        let tick = self.tick;
        std::thread::Builder::new()
            .name(format!("synthetic-{}", self.seat.id))
            .spawn(move || synthetic_loop(seat, board, gate, quiescence, terminated, tick))
            .expect("spawn synthetic thread")
    }
}

/// Autonomous input loop for a synthetic seat: pick a random occupied
/// slot, inject it through the same entry point human input uses, wait
/// for it to resolve, repeat. Shares nothing with the player loop but
/// the seat and the session signals.
fn synthetic_loop(
    seat: Arc<Seat>,
    board: Arc<Board>,
    gate: Arc<PauseGate>,
    quiescence: Arc<Quiescence>,
    terminated: Arc<AtomicBool>,
    tick: Duration,
) {
    log::info!("[synthetic {}] thread starting", seat.id);
    let mut rng = rand::rng();
    while !terminated.load(Ordering::SeqCst) {
        gate.wait_while_paused(&terminated, tick);
        if terminated.load(Ordering::SeqCst) {
            break;
        }
        seat.ai_working.store(true, Ordering::SeqCst);
        if gate.is_paused() {
            seat.ai_rest(&quiescence);
            continue;
        }
        let occupied = board.occupied_slots();
        if let Some(&slot) = occupied.choose(&mut rng) {
            // raise before offering, or the player loop could settle a
            // fast action in between
            seat.injected.store(true, Ordering::SeqCst);
            if !seat.offer(slot, &gate, &board) {
                seat.injected.store(false, Ordering::SeqCst);
            }
        }
        seat.ai_rest(&quiescence);
        while seat.busy() && !terminated.load(Ordering::SeqCst) {
            std::thread::sleep(tick);
        }
    }
    seat.ai_rest(&quiescence);
    log::info!("[synthetic {}] thread terminated", seat.id);
}
