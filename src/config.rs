use serde::Deserialize;
use std::time::Duration;

/// Static session configuration, consumed (not owned) by the core.
/// Defaults match the classic tabletop game: 12 slots, 81 items, 60s rounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of slots on the board.
    pub board_size: usize,
    /// Number of items in the undealt pool at session start.
    pub pool_size: usize,
    /// Round length before a forced reshuffle.
    pub round_millis: u64,
    /// Window before the deadline in which the countdown turns urgent
    /// and the dealer refreshes it at tick granularity.
    pub urgent_millis: u64,
    /// Freeze applied to a player after a valid claim.
    pub point_freeze_millis: u64,
    /// Freeze applied to a player after an invalid claim. Shorter than
    /// the point freeze: the point freeze is the reward cooldown.
    pub penalty_freeze_millis: u64,
    /// Optional pause between individual item placements while dealing.
    pub deal_delay_millis: u64,
    /// Granularity of every cancellable wait (freeze slices, pause
    /// polls, verdict waits). Bounds termination latency.
    pub tick_millis: u64,
    /// One entry per seat at the table.
    pub seats: Vec<SeatConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeatConfig {
    /// Human seats receive actions from the input layer; synthetic
    /// seats generate their own on a dedicated thread.
    pub human: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            board_size: 12,
            pool_size: 81,
            round_millis: 60_000,
            urgent_millis: 10_000,
            point_freeze_millis: 3_000,
            penalty_freeze_millis: 1_000,
            deal_delay_millis: 0,
            tick_millis: 50,
            seats: vec![SeatConfig { human: false }; 2],
        }
    }
}

impl Config {
    pub fn round(&self) -> Duration {
        Duration::from_millis(self.round_millis)
    }
    pub fn urgent(&self) -> Duration {
        Duration::from_millis(self.urgent_millis)
    }
    pub fn point_freeze(&self) -> Duration {
        Duration::from_millis(self.point_freeze_millis)
    }
    pub fn penalty_freeze(&self) -> Duration {
        Duration::from_millis(self.penalty_freeze_millis)
    }
    pub fn deal_delay(&self) -> Duration {
        Duration::from_millis(self.deal_delay_millis)
    }
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }
}
