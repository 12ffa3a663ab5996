use crate::{Item, PlayerId, Slot};
use std::time::Duration;

/// Fire-and-forget rendering sink. The core never reads anything back,
/// so implementations are free to drop, batch, or repaint as they like.
pub trait Ui: Send + Sync {
    fn show_item(&self, item: Item, slot: Slot);
    fn hide_slot(&self, slot: Slot);
    fn show_marker(&self, player: PlayerId, slot: Slot);
    fn hide_marker(&self, player: PlayerId, slot: Slot);
    fn set_countdown(&self, remaining: Duration, urgent: bool);
    fn set_freeze_countdown(&self, player: PlayerId, remaining: Duration);
    fn set_score(&self, player: PlayerId, score: u32);
    fn announce_winners(&self, players: &[PlayerId]);
}

/// Renders the table as log lines. Countdown refreshes go to debug so
/// the terminal is not flooded at tick granularity.
pub struct LogUi;

impl Ui for LogUi {
    fn show_item(&self, item: Item, slot: Slot) {
        log::info!("[ui] item {} placed on slot {}", item, slot);
    }
    fn hide_slot(&self, slot: Slot) {
        log::info!("[ui] slot {} cleared", slot);
    }
    fn show_marker(&self, player: PlayerId, slot: Slot) {
        log::info!("[ui] P{} marks slot {}", player, slot);
    }
    fn hide_marker(&self, player: PlayerId, slot: Slot) {
        log::info!("[ui] P{} unmarks slot {}", player, slot);
    }
    fn set_countdown(&self, remaining: Duration, urgent: bool) {
        log::debug!("[ui] {}ms left{}", remaining.as_millis(), if urgent { " !" } else { "" });
    }
    fn set_freeze_countdown(&self, player: PlayerId, remaining: Duration) {
        log::debug!("[ui] P{} frozen for {}ms", player, remaining.as_millis());
    }
    fn set_score(&self, player: PlayerId, score: u32) {
        log::info!("[ui] P{} score {}", player, score);
    }
    fn announce_winners(&self, players: &[PlayerId]) {
        log::info!("[ui] winners: {:?}", players);
    }
}

/// Discards everything. Useful for tests and headless sessions.
pub struct NullUi;

impl Ui for NullUi {
    fn show_item(&self, _: Item, _: Slot) {}
    fn hide_slot(&self, _: Slot) {}
    fn show_marker(&self, _: PlayerId, _: Slot) {}
    fn hide_marker(&self, _: PlayerId, _: Slot) {}
    fn set_countdown(&self, _: Duration, _: bool) {}
    fn set_freeze_countdown(&self, _: PlayerId, _: Duration) {}
    fn set_score(&self, _: PlayerId, _: u32) {}
    fn announce_winners(&self, _: &[PlayerId]) {}
}
