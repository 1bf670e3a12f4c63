use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::models::{Game, MatchStatus};

pub const DEFAULT_LEAD_MINUTES: i64 = 10;

/// What the UI may do with a game's prediction inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Before the lead window; inputs are editable.
    Open,
    /// Inside the lead window or already kicked off.
    Locked,
    /// Match concluded. Terminal.
    Finished,
}

impl GamePhase {
    pub fn is_editable(self) -> bool {
        self == GamePhase::Open
    }
}

pub fn game_phase(
    game: &Game,
    now: DateTime<Utc>,
    lead: Duration,
    offset: FixedOffset,
) -> GamePhase {
    match game.kind() {
        MatchStatus::Finished => GamePhase::Finished,
        MatchStatus::InProgress => GamePhase::Locked,
        MatchStatus::NotStarted => match game.kickoff(offset) {
            Some(kickoff) if now >= kickoff - lead => GamePhase::Locked,
            _ => GamePhase::Open,
        },
    }
}

pub fn phase_label(phase: GamePhase) -> &'static str {
    match phase {
        GamePhase::Open => "OPEN",
        GamePhase::Locked => "LOCKED",
        GamePhase::Finished => "FINAL",
    }
}
