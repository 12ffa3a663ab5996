use crate::ui::Ui;
use crate::{Item, PlayerId, Slot};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// A player may hold at most this many markers at once; placing the
/// last one is what turns their marked slots into a claim.
pub const MARKERS_PER_PLAYER: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("slot {0} is not occupied")]
    NotOccupied(Slot),
}

/// Outcome of a marker placement attempt. `AlreadyFull` and `SlotEmpty`
/// are benign races, dropped without effect at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Placed,
    AlreadyFull,
    SlotEmpty,
}

/// Everything more than one thread can see lives behind this one lock:
/// the slot/item bijection, the per-slot marker matrix, and every
/// player's ordered marker list. Keeping both marker views under the
/// same lock is what makes their agreement atomic to observers.
struct State {
    slot_to_item: Vec<Option<Item>>,
    item_to_slot: Vec<Option<Slot>>,
    markers: Vec<Vec<bool>>,
    placed: Vec<Vec<Slot>>,
}

impl State {
    fn unmark(&mut self, player: PlayerId, slot: Slot) {
        self.markers[slot][player] = false;
        self.placed[player].retain(|&s| s != slot);
    }
}

/// The shared table. All operations are observably atomic with respect
/// to concurrent readers and writers; Ui notifications fire after the
/// lock is released so no thread ever renders while holding it.
pub struct Board {
    state: Mutex<State>,
    ui: Arc<dyn Ui>,
}

impl Board {
    pub fn new(board_size: usize, pool_size: usize, players: usize, ui: Arc<dyn Ui>) -> Self {
        Self {
            state: Mutex::new(State {
                slot_to_item: vec![None; board_size],
                item_to_slot: vec![None; pool_size],
                markers: vec![vec![false; players]; board_size],
                placed: vec![Vec::with_capacity(MARKERS_PER_PLAYER); players],
            }),
            ui,
        }
    }

    pub fn size(&self) -> usize {
        self.state.lock().slot_to_item.len()
    }

    /// Puts an item on an empty slot. The dealer is the only caller and
    /// the protocol guarantees the slot is free; anything else is a
    /// synchronization bug, not a runtime condition.
    pub fn place(&self, item: Item, slot: Slot) {
        {
            let mut state = self.state.lock();
            assert!(state.slot_to_item[slot].is_none(), "slot {} occupied", slot);
            assert!(state.item_to_slot[item].is_none(), "item {} already dealt", item);
            state.slot_to_item[slot] = Some(item);
            state.item_to_slot[item] = Some(slot);
        }
        self.ui.show_item(item, slot);
    }

    /// Clears a slot, cascading: every marker on it disappears from the
    /// matrix and from its owner's list in the same critical section.
    pub fn remove(&self, slot: Slot) -> Result<Item, BoardError> {
        let (item, holders) = {
            let mut state = self.state.lock();
            let item = state.slot_to_item[slot].ok_or(BoardError::NotOccupied(slot))?;
            state.slot_to_item[slot] = None;
            state.item_to_slot[item] = None;
            let holders: Vec<PlayerId> = (0..state.markers[slot].len())
                .filter(|&p| state.markers[slot][p])
                .collect();
            for &player in &holders {
                state.unmark(player, slot);
            }
            (item, holders)
        };
        for player in holders {
            self.ui.hide_marker(player, slot);
        }
        self.ui.hide_slot(slot);
        Ok(item)
    }

    /// Records a marker in both views, or reports why it cannot.
    pub fn place_marker(&self, player: PlayerId, slot: Slot) -> Placement {
        {
            let mut state = self.state.lock();
            if state.placed[player].len() >= MARKERS_PER_PLAYER {
                return Placement::AlreadyFull;
            }
            if state.slot_to_item[slot].is_none() {
                return Placement::SlotEmpty;
            }
            state.markers[slot][player] = true;
            state.placed[player].push(slot);
        }
        self.ui.show_marker(player, slot);
        Placement::Placed
    }

    /// Idempotent: removing an absent marker is a no-op.
    pub fn remove_marker(&self, player: PlayerId, slot: Slot) {
        let present = {
            let mut state = self.state.lock();
            let present = state.markers[slot][player];
            if present {
                state.unmark(player, slot);
            }
            present
        };
        if present {
            self.ui.hide_marker(player, slot);
        }
    }

    pub fn has_marker(&self, player: PlayerId, slot: Slot) -> bool {
        self.state.lock().markers[slot][player]
    }

    /// Ordered snapshot of one player's marker list.
    pub fn markers_of(&self, player: PlayerId) -> Vec<Slot> {
        self.state.lock().placed[player].clone()
    }

    /// Union of all players holding a marker on any of the given slots,
    /// ascending by id. These are the players affected when the slots
    /// are cleared.
    pub fn holders_of(&self, slots: &[Slot]) -> Vec<PlayerId> {
        let state = self.state.lock();
        (0..state.placed.len())
            .filter(|&p| slots.iter().any(|&s| state.markers[s][p]))
            .collect()
    }

    pub fn item_at(&self, slot: Slot) -> Option<Item> {
        self.state.lock().slot_to_item[slot]
    }

    /// Atomic snapshot of the items on three slots; None if any is
    /// empty. Claim snapshots and staleness checks both go through
    /// here so neither can observe a half-updated board.
    pub fn items_at(&self, slots: [Slot; 3]) -> Option<[Item; 3]> {
        let state = self.state.lock();
        Some([
            state.slot_to_item[slots[0]]?,
            state.slot_to_item[slots[1]]?,
            state.slot_to_item[slots[2]]?,
        ])
    }

    pub fn empty_slots(&self) -> Vec<Slot> {
        let state = self.state.lock();
        (0..state.slot_to_item.len())
            .filter(|&s| state.slot_to_item[s].is_none())
            .collect()
    }

    pub fn occupied_slots(&self) -> Vec<Slot> {
        let state = self.state.lock();
        (0..state.slot_to_item.len())
            .filter(|&s| state.slot_to_item[s].is_some())
            .collect()
    }

    pub fn count_items(&self) -> usize {
        self.state.lock().slot_to_item.iter().flatten().count()
    }

    /// Clears every occupied slot, cascading marker cleanup, and hands
    /// the items back to the caller (the dealer returns them to the
    /// pool between rounds).
    pub fn clear(&self) -> Vec<Item> {
        self.occupied_slots()
            .into_iter()
            .filter_map(|slot| self.remove(slot).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::NullUi;

    fn board() -> Board {
        Board::new(4, 12, 3, Arc::new(NullUi))
    }

    /// slot->item and item->slot must agree after every mutation.
    fn consistent(board: &Board) -> bool {
        let state = board.state.lock();
        let forward = state
            .slot_to_item
            .iter()
            .enumerate()
            .filter_map(|(s, i)| i.map(|i| (s, i)))
            .all(|(s, i)| state.item_to_slot[i] == Some(s));
        let backward = state
            .item_to_slot
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|s| (i, s)))
            .all(|(i, s)| state.slot_to_item[s] == Some(i));
        forward && backward
    }

    /// markers[slot][player] must agree with placed[player].
    fn marker_views_agree(board: &Board) -> bool {
        let state = board.state.lock();
        (0..state.placed.len()).all(|p| {
            (0..state.markers.len())
                .all(|s| state.markers[s][p] == state.placed[p].contains(&s))
        })
    }

    #[test]
    fn bijection_holds_through_mutations() {
        let board = board();
        board.place(5, 0);
        board.place(7, 2);
        assert!(consistent(&board));
        assert_eq!(board.remove(0), Ok(5));
        assert!(consistent(&board));
        assert_eq!(board.item_at(2), Some(7));
        assert_eq!(board.item_at(0), None);
    }

    #[test]
    fn remove_unoccupied_is_contract_error() {
        let board = board();
        assert_eq!(board.remove(1), Err(BoardError::NotOccupied(1)));
    }

    #[test]
    fn marker_cap_and_empty_slot_rejections() {
        let board = board();
        for slot in 0..4 {
            board.place(slot, slot);
        }
        assert_eq!(board.place_marker(0, 0), Placement::Placed);
        assert_eq!(board.place_marker(0, 1), Placement::Placed);
        assert_eq!(board.place_marker(0, 2), Placement::Placed);
        assert_eq!(board.place_marker(0, 3), Placement::AlreadyFull);
        assert_eq!(board.markers_of(0).len(), MARKERS_PER_PLAYER);
        let board = self::board();
        assert_eq!(board.place_marker(1, 3), Placement::SlotEmpty);
    }

    #[test]
    fn marker_removal_is_idempotent() {
        let board = board();
        board.place(0, 1);
        board.place_marker(2, 1);
        board.remove_marker(2, 1);
        assert!(marker_views_agree(&board));
        board.remove_marker(2, 1);
        assert!(marker_views_agree(&board));
        assert!(board.markers_of(2).is_empty());
    }

    #[test]
    fn removal_cascades_to_every_holder() {
        let board = board();
        board.place(3, 1);
        board.place_marker(0, 1);
        board.place_marker(1, 1);
        board.place_marker(2, 1);
        assert_eq!(board.holders_of(&[1]), vec![0, 1, 2]);
        assert_eq!(board.remove(1), Ok(3));
        assert!(board.markers_of(0).is_empty());
        assert!(board.markers_of(1).is_empty());
        assert!(board.markers_of(2).is_empty());
        assert!(marker_views_agree(&board));
        assert!(board.holders_of(&[1]).is_empty());
    }

    #[test]
    fn deal_then_clear_round_trips() {
        let board = board();
        for (slot, item) in [(0, 9), (1, 4), (2, 11), (3, 0)] {
            board.place(item, slot);
        }
        assert_eq!(board.count_items(), 4);
        let mut returned = board.clear();
        returned.sort_unstable();
        assert_eq!(returned, vec![0, 4, 9, 11]);
        assert_eq!(board.count_items(), 0);
        assert_eq!(board.empty_slots(), vec![0, 1, 2, 3]);
        assert!(consistent(&board));
    }

    #[test]
    fn snapshot_is_all_or_nothing() {
        let board = board();
        board.place(1, 0);
        board.place(2, 1);
        assert_eq!(board.items_at([0, 1, 2]), None);
        board.place(3, 2);
        assert_eq!(board.items_at([0, 1, 2]), Some([1, 2, 3]));
    }
}
