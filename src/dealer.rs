use crate::board::Board;
use crate::config::Config;
use crate::gate::{PauseGate, Quiescence};
use crate::oracle::Oracle;
use crate::player::{Claim, Seat, Verdict};
use crate::ui::Ui;
use crate::{Item, Slot};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Countdown refresh granularity outside the urgent window.
const COARSE_TICK: Duration = Duration::from_secs(1);

/// The single arbitration authority. Owns the undealt pool, drives the
/// deal/validate/reshuffle lifecycle, and is the only entity that adds
/// or removes items on the board. Sole consumer of the claim channel;
/// claims are serviced strictly in arrival order, one at a time.
pub struct Dealer {
    board: Arc<Board>,
    oracle: Arc<dyn Oracle>,
    ui: Arc<dyn Ui>,
    gate: Arc<PauseGate>,
    quiescence: Arc<Quiescence>,
    seats: Vec<Arc<Seat>>,
    claims: Receiver<Claim>,
    pending: VecDeque<Claim>,
    pool: Vec<Item>,
    deadline: Instant,
    handles: Vec<JoinHandle<()>>,
    terminated: Arc<AtomicBool>,
    config: Config,
}

impl Dealer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        board: Arc<Board>,
        oracle: Arc<dyn Oracle>,
        ui: Arc<dyn Ui>,
        gate: Arc<PauseGate>,
        quiescence: Arc<Quiescence>,
        seats: Vec<Arc<Seat>>,
        claims: Receiver<Claim>,
        handles: Vec<JoinHandle<()>>,
        terminated: Arc<AtomicBool>,
        config: Config,
    ) -> Self {
        Self {
            board,
            oracle,
            ui,
            gate,
            quiescence,
            seats,
            claims,
            pending: VecDeque::new(),
            pool: (0..config.pool_size).collect(),
            deadline: Instant::now(),
            handles,
            terminated,
            config,
        }
    }

    /// Main loop for the dealer thread: deal, run the round until the
    /// deadline, reshuffle, repeat until termination or the pool can no
    /// longer host a legal triple. Then stop everyone and settle up.
    pub fn run(mut self) {
        log::info!("[dealer] thread starting");
        while !self.should_finish() {
            self.deal();
            self.round();
            self.barrier();
            self.drain_claims();
            self.flush_pending();
            let returned = self.board.clear();
            log::debug!("[dealer] reshuffle: {} items back to the pool", returned.len());
            self.pool.extend(returned);
        }
        self.shutdown();
        self.announce();
        log::info!("[dealer] thread terminated");
    }

    fn done(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// The board is empty whenever this is asked, so the pool alone
    /// decides playability.
    fn should_finish(&self) -> bool {
        self.done() || !self.oracle.exists_legal_triple(&self.pool)
    }

    /// Shuffles the pool and redraws the candidate batch until it can
    /// host a legal triple on its own, guarding against an unplayable
    /// deal. Then places it onto a random permutation of the empty
    /// slots and opens the round.
    fn deal(&mut self) {
        let mut rng = rand::rng();
        let mut slots = self.board.empty_slots();
        slots.shuffle(&mut rng);
        let count = slots.len().min(self.pool.len());
        if count >= 3 {
            loop {
                self.pool.shuffle(&mut rng);
                if self.oracle.exists_legal_triple(&self.pool[..count]) {
                    break;
                }
            }
        }
        let batch: Vec<Item> = self.pool.drain(..count).collect();
        for (item, slot) in batch.into_iter().zip(slots) {
            self.nap(self.config.deal_delay());
            self.board.place(item, slot);
        }
        log::debug!("[dealer] dealt {} items, {} left in pool", count, self.pool.len());
    }

    /// The round proper: wait for the earlier of a claim or the
    /// deadline, refreshing the countdown on every wake, finer-grained
    /// in the last stretch. Claims are arbitrated FIFO, one at a time.
    fn round(&mut self) {
        self.deadline = Instant::now() + self.config.round();
        self.ui.set_countdown(self.config.round(), false);
        self.gate.resume();
        while !self.done() {
            let now = Instant::now();
            if now >= self.deadline {
                break;
            }
            let remaining = self.deadline - now;
            let urgent = remaining <= self.config.urgent();
            let granularity = if urgent { self.config.tick() } else { COARSE_TICK };
            match self.claims.recv_timeout(remaining.min(granularity)) {
                Ok(claim) => self.pending.push_back(claim),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.refresh_countdown();
            self.drain_claims();
            if let Some(claim) = self.pending.pop_front() {
                self.arbitrate(claim);
            }
        }
    }

    fn refresh_countdown(&self) {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        self.ui.set_countdown(remaining, remaining <= self.config.urgent());
    }

    /// One claim, start to finish. Validation is the system's only
    /// mutual exclusion on board mutation: nothing else removes items.
    fn arbitrate(&mut self, claim: Claim) {
        let seat = self.seats[claim.player].clone();
        // the board may have churned between hand-off and dequeue
        if self.board.items_at(claim.slots) != Some(claim.items) {
            log::debug!("[dealer] P{} claim went stale in the queue", claim.player);
            seat.deliver(Verdict::Invalidated);
            return;
        }
        if !self.oracle.is_legal_triple(claim.items) {
            log::info!("[dealer] P{} claimed {:?}: penalty", claim.player, claim.items);
            seat.deliver(Verdict::Penalty);
            return;
        }
        // quiesce the table before touching it
        self.barrier();
        let affected = self.board.holders_of(&claim.slots);
        log::info!(
            "[dealer] P{} claimed {:?}: point (markers affected: {:?})",
            claim.player,
            claim.items,
            affected
        );
        let score = seat.add_point();
        self.ui.set_score(claim.player, score);
        seat.deliver(Verdict::Point);
        self.drain_claims();
        self.purge_overlapping(claim.slots);
        for &slot in &claim.slots {
            match self.board.remove(slot) {
                Ok(item) => log::debug!("[dealer] item {} retired from slot {}", item, slot),
                Err(e) => unreachable!("claimed slot vanished under the barrier: {}", e),
            }
        }
        self.replace(claim.slots);
        self.gate.resume();
    }

    /// Deals replacement items onto freed slots while the pool lasts.
    /// No playability guard here: a starved partial board is ended by
    /// the round deadline, not by the dealer spinning.
    fn replace(&mut self, slots: [Slot; 3]) {
        for slot in slots {
            if let Some(item) = self.pool.pop() {
                self.nap(self.config.deal_delay());
                self.board.place(item, slot);
            }
        }
    }

    /// Pending claims that reference any of the given slots can no
    /// longer succeed; answer them now rather than letting them fail
    /// validation later.
    fn purge_overlapping(&mut self, removed: [Slot; 3]) {
        let seats = &self.seats;
        self.pending.retain(|claim| {
            let overlaps = claim.slots.iter().any(|s| removed.contains(s));
            if overlaps {
                log::debug!("[dealer] P{} queued claim invalidated by overlap", claim.player);
                seats[claim.player].deliver(Verdict::Invalidated);
            }
            !overlaps
        });
    }

    /// The join-barrier: flip the pause gate, then wait until every
    /// seat reports idle. After this returns no player is mid-mutation
    /// and none can start until the gate reopens.
    fn barrier(&self) {
        self.gate.pause();
        let seats = &self.seats;
        self.quiescence
            .wait_until(|| seats.iter().all(|seat| seat.idle()), self.config.tick());
    }

    /// Pulls everything sitting in the channel into the FIFO queue.
    fn drain_claims(&mut self) {
        while let Ok(claim) = self.claims.try_recv() {
            self.pending.push_back(claim);
        }
    }

    /// Answers every queued claim with an invalidation, unblocking any
    /// claimant still waiting. Used at reshuffle and at shutdown.
    fn flush_pending(&mut self) {
        while let Some(claim) = self.pending.pop_front() {
            self.seats[claim.player].deliver(Verdict::Invalidated);
        }
    }

    /// Stops all player threads and waits for them (each joins its own
    /// synthetic thread before exiting). Scores freeze here.
    fn shutdown(&mut self) {
        self.barrier();
        self.drain_claims();
        self.flush_pending();
        self.terminated.store(true, Ordering::SeqCst);
        self.gate.resume();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::warn!("[dealer] a player thread panicked before exit");
            }
        }
    }

    /// Maximal score wins; ties are reported together, not broken.
    fn announce(&self) {
        let best = self.seats.iter().map(|seat| seat.score()).max().unwrap_or(0);
        let winners: Vec<_> = self
            .seats
            .iter()
            .filter(|seat| seat.score() == best)
            .map(|seat| seat.id)
            .collect();
        log::info!("[dealer] game over, winners {:?} with {} points", winners, best);
        self.ui.announce_winners(&winners);
    }

    /// Interruptible sleep used for the optional dealing delay.
    fn nap(&self, total: Duration) {
        let mut remaining = total;
        while !remaining.is_zero() && !self.done() {
            let step = remaining.min(self.config.tick());
            std::thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
    }
}
