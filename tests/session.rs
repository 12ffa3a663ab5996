use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tripleset::config::{Config, SeatConfig};
use tripleset::oracle::Oracle;
use tripleset::session::Session;
use tripleset::ui::Ui;
use tripleset::{Item, PlayerId, Slot};

/// A triple is legal iff it contains item 0. Gives every test a
/// deterministic legal triple (the slot holding 0 plus any two) and a
/// deterministic illegal one (any three slots without it).
struct ZeroOracle;

impl Oracle for ZeroOracle {
    fn is_legal_triple(&self, items: [Item; 3]) -> bool {
        items.contains(&0)
    }
}

/// The zero rule again, instrumented: tracks how many validations are
/// in flight at once and the high-water mark. The sleep widens each
/// validation so any overlap would actually register, not just be
/// possible.
#[derive(Default)]
struct MeteredOracle {
    depth: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl Oracle for MeteredOracle {
    fn is_legal_triple(&self, items: [Item; 3]) -> bool {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(depth, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        self.depth.fetch_sub(1, Ordering::SeqCst);
        items.contains(&0)
    }

    // keep dealing cheap so only claim validation is metered
    fn exists_legal_triple(&self, items: &[Item]) -> bool {
        items.len() >= 3 && items.contains(&0)
    }
}

/// Ui sink that records what the core pushed at it.
#[derive(Default)]
struct RecordingUi {
    freezes: Mutex<Vec<(PlayerId, Duration)>>,
    countdowns: Mutex<Vec<(Duration, bool)>>,
    hidden: Mutex<Vec<Slot>>,
    winners: Mutex<Vec<Vec<PlayerId>>>,
}

impl RecordingUi {
    fn first_freeze_of(&self, player: PlayerId) -> Option<Duration> {
        self.freezes
            .lock()
            .iter()
            .find(|(p, _)| *p == player)
            .map(|(_, d)| *d)
    }
}

impl Ui for RecordingUi {
    fn show_item(&self, _: Item, _: Slot) {}
    fn hide_slot(&self, slot: Slot) {
        self.hidden.lock().push(slot);
    }
    fn show_marker(&self, _: PlayerId, _: Slot) {}
    fn hide_marker(&self, _: PlayerId, _: Slot) {}
    fn set_countdown(&self, remaining: Duration, urgent: bool) {
        self.countdowns.lock().push((remaining, urgent));
    }
    fn set_freeze_countdown(&self, player: PlayerId, remaining: Duration) {
        self.freezes.lock().push((player, remaining));
    }
    fn set_score(&self, _: PlayerId, _: u32) {}
    fn announce_winners(&self, players: &[PlayerId]) {
        self.winners.lock().push(players.to_vec());
    }
}

fn config(humans: usize) -> Config {
    Config {
        board_size: 4,
        pool_size: 12,
        round_millis: 10_000,
        urgent_millis: 1_000,
        point_freeze_millis: 200,
        penalty_freeze_millis: 100,
        deal_delay_millis: 0,
        tick_millis: 5,
        seats: vec![SeatConfig { human: true }; humans],
    }
}

/// Spins until `probe` returns Some, or panics after `patience`.
fn poll<T>(patience: Duration, what: &str, probe: impl Fn() -> Option<T>) -> T {
    let deadline = Instant::now() + patience;
    loop {
        if let Some(value) = probe() {
            return value;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Retries until the action gets past the drop rules (the session may
/// still be paused mid-deal when the test starts pushing).
fn push(session: &Session, player: PlayerId, slot: Slot) {
    poll(Duration::from_secs(3), "action to be accepted", || {
        session.submit_action(player, slot).then_some(())
    });
}

/// The slot currently holding item 0, once dealt.
fn zero_slot(session: &Session) -> Slot {
    poll(Duration::from_secs(3), "item 0 on the board", || {
        session
            .board()
            .occupied_slots()
            .into_iter()
            .find(|&s| session.board().item_at(s) == Some(0))
    })
}

#[test]
fn legal_claim_scores_freezes_and_refills() {
    let ui = Arc::new(RecordingUi::default());
    let session = Session::start(config(1), Arc::new(ZeroOracle), ui.clone());
    let z = zero_slot(&session);
    let others: Vec<Slot> = (0..4).filter(|&s| s != z).take(2).collect();

    push(&session, 0, z);
    push(&session, 0, others[0]);
    push(&session, 0, others[1]);

    poll(Duration::from_secs(3), "the point to land", || {
        (session.scores()[0] == 1).then_some(())
    });
    // claimed slots are cleared and refilled from the non-empty pool
    poll(Duration::from_secs(3), "the board to refill", || {
        (session.board().count_items() == 4).then_some(())
    });
    assert!(session.board().markers_of(0).is_empty());
    assert_eq!(ui.first_freeze_of(0), Some(Duration::from_millis(200)));

    session.request_termination();
    assert_eq!(session.join(), vec![1]);
}

#[test]
fn illegal_claim_draws_penalty_and_leaves_the_board() {
    let ui = Arc::new(RecordingUi::default());
    let session = Session::start(config(1), Arc::new(ZeroOracle), ui.clone());
    let z = zero_slot(&session);
    let others: Vec<Slot> = (0..4).filter(|&s| s != z).collect();
    let before: Vec<Option<Item>> = (0..4).map(|s| session.board().item_at(s)).collect();

    for &slot in &others {
        push(&session, 0, slot);
    }

    poll(Duration::from_secs(3), "the penalty freeze", || {
        ui.first_freeze_of(0)
    });
    assert_eq!(ui.first_freeze_of(0), Some(Duration::from_millis(100)));
    assert_eq!(session.scores()[0], 0);
    let after: Vec<Option<Item>> = (0..4).map(|s| session.board().item_at(s)).collect();
    assert_eq!(before, after);

    session.request_termination();
    session.join();
}

#[test]
fn valid_claim_sweeps_other_players_markers() {
    let ui = Arc::new(RecordingUi::default());
    let session = Session::start(config(3), Arc::new(ZeroOracle), ui);
    let z = zero_slot(&session);
    let others: Vec<Slot> = (0..4).filter(|&s| s != z).take(2).collect();

    // P1 and P2 each park a marker on the slot P0 is about to claim
    push(&session, 1, z);
    push(&session, 2, z);
    poll(Duration::from_secs(3), "bystander markers", || {
        (session.board().has_marker(1, z) && session.board().has_marker(2, z)).then_some(())
    });

    push(&session, 0, z);
    push(&session, 0, others[0]);
    push(&session, 0, others[1]);

    poll(Duration::from_secs(3), "the point to land", || {
        (session.scores()[0] == 1).then_some(())
    });
    poll(Duration::from_secs(3), "marker cascade", || {
        (session.board().markers_of(1).is_empty() && session.board().markers_of(2).is_empty())
            .then_some(())
    });
    assert_eq!(session.scores()[1], 0);
    assert_eq!(session.scores()[2], 0);

    session.request_termination();
    session.join();
}

#[test]
fn claims_are_validated_one_at_a_time() {
    let ui = Arc::new(RecordingUi::default());
    let oracle = Arc::new(MeteredOracle::default());
    let session = Session::start(config(3), oracle.clone(), ui.clone());
    let z = zero_slot(&session);
    let others: Vec<Slot> = (0..4).filter(|&s| s != z).collect();

    // three seats complete rival triples on the same zero-free slots,
    // so every claim draws a penalty and the board never changes
    for player in 0..3 {
        for &slot in &others {
            push(&session, player, slot);
        }
    }
    for player in 0..3 {
        poll(Duration::from_secs(5), "every claim to resolve", || {
            ui.first_freeze_of(player)
        });
    }
    assert!(oracle.calls.load(Ordering::SeqCst) >= 3);
    assert_eq!(oracle.peak.load(Ordering::SeqCst), 1);
    assert_eq!(oracle.depth.load(Ordering::SeqCst), 0);

    session.request_termination();
    session.join();
}

#[test]
fn quiet_deadline_clears_and_redeals() {
    let ui = Arc::new(RecordingUi::default());
    let mut config = config(1);
    config.round_millis = 150;
    let session = Session::start(config, Arc::new(ZeroOracle), ui.clone());

    // let at least two rounds elapse with no claims at all
    std::thread::sleep(Duration::from_millis(600));
    poll(Duration::from_secs(3), "a redealt board", || {
        (session.board().count_items() == 4).then_some(())
    });
    let resets = ui
        .countdowns
        .lock()
        .iter()
        .filter(|(remaining, _)| *remaining == Duration::from_millis(150))
        .count();
    assert!(resets >= 2, "countdown reset {} times", resets);
    assert!(ui.hidden.lock().len() >= 4, "reshuffle cleared the board");

    session.request_termination();
    session.join();
}

#[test]
fn termination_mid_freeze_exits_promptly_with_frozen_scores() {
    let ui = Arc::new(RecordingUi::default());
    let mut config = config(1);
    config.point_freeze_millis = 10_000;
    config.tick_millis = 10;
    let session = Session::start(config, Arc::new(ZeroOracle), ui.clone());
    let z = zero_slot(&session);
    let others: Vec<Slot> = (0..4).filter(|&s| s != z).take(2).collect();

    push(&session, 0, z);
    push(&session, 0, others[0]);
    push(&session, 0, others[1]);
    poll(Duration::from_secs(3), "the point to land", || {
        (session.scores()[0] == 1).then_some(())
    });

    // the seat is now sitting out a 10s freeze; shutdown must not wait it out
    let start = Instant::now();
    session.request_termination();
    let scores = session.join();
    assert!(start.elapsed() < Duration::from_secs(3), "join dragged on");
    assert_eq!(scores, vec![1]);
    assert_eq!(*ui.winners.lock(), vec![vec![0]]);
}

#[test]
fn synthetic_table_plays_itself_to_termination() {
    let mut config = config(0);
    config.seats = vec![SeatConfig { human: false }; 2];
    let session = Session::start(config, Arc::new(ZeroOracle), Arc::new(tripleset::ui::NullUi));
    std::thread::sleep(Duration::from_millis(300));
    session.request_termination();
    let scores = session.join();
    assert_eq!(scores.len(), 2);
}
