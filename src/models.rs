use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Payload of `GET /promiedos/<competition>/current`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchdayRoot {
    #[serde(default)]
    pub round: i64,
    #[serde(rename = "roundName", default)]
    pub round_name: String,
    #[serde(rename = "totalGames", default)]
    pub total_games: i64,
    #[serde(rename = "gamesByDate", default)]
    pub games_by_date: Vec<MatchesByDate>,
    #[serde(rename = "externalIdPattern", default)]
    pub external_id_pattern: String,
    #[serde(rename = "databaseStatus", default)]
    pub database_status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchesByDate {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub matches: Vec<Game>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    #[serde(default)]
    pub stage_round_name: String,
    #[serde(default)]
    pub winner: i64,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub url_name: String,
    #[serde(default)]
    pub scores: Option<Vec<i64>>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub game_time: i64,
    #[serde(default)]
    pub game_time_to_display: String,
    #[serde(default)]
    pub game_time_status_to_display: String,
    #[serde(default)]
    pub pronostics: Vec<Pronostic>,
    #[serde(rename = "totalPronostics", default)]
    pub total_pronostics: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub url_name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub country_id: String,
    #[serde(default)]
    pub red_cards: i64,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Goal {
    #[serde(default)]
    pub player_name: String,
    #[serde(default)]
    pub time_to_display: String,
    #[serde(default)]
    pub goal_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    #[serde(rename = "enum", default)]
    pub code: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub symbol_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    NotStarted,
    InProgress,
    Finished,
}

impl Status {
    pub fn kind(&self) -> MatchStatus {
        match self.code {
            1 => MatchStatus::NotStarted,
            3 => MatchStatus::Finished,
            _ => MatchStatus::InProgress,
        }
    }
}

/// One player's prediction as embedded in match data or returned by
/// `my-pronostics`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pronostic {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "externalId", default)]
    pub external_id: String,
    #[serde(rename = "userId", default)]
    pub user_id: i64,
    #[serde(default)]
    pub prediction: PredictionScores,
    #[serde(default)]
    pub processed: bool,
    #[serde(rename = "livePoints", default)]
    pub live_points: i64,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub user: Option<PronosticUser>,
}

impl Pronostic {
    pub fn score_pair(&self) -> [u32; 2] {
        score_pair(&self.prediction.scores)
    }

    /// Owner id, preferring the flat `userId` and falling back to the nested user.
    pub fn owner_id(&self) -> Option<i64> {
        if self.user_id != 0 {
            return Some(self.user_id);
        }
        self.user.as_ref().map(|u| u.id)
    }

    pub fn owner_name(&self) -> &str {
        self.user.as_ref().map(|u| u.name.as_str()).unwrap_or("?")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionScores {
    #[serde(default)]
    pub scores: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PronosticUser {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Side::Home => 0,
            Side::Away => 1,
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

/// Normalizes a wire score array into a pair; missing or negative entries become 0.
pub fn score_pair(scores: &[i64]) -> [u32; 2] {
    let pick = |idx: usize| {
        scores
            .get(idx)
            .copied()
            .unwrap_or(0)
            .clamp(0, i64::from(u32::MAX)) as u32
    };
    [pick(0), pick(1)]
}

impl Game {
    pub fn kind(&self) -> MatchStatus {
        self.status.kind()
    }

    pub fn home_name(&self) -> &str {
        self.teams.first().map(|t| t.name.as_str()).unwrap_or("TBD")
    }

    pub fn away_name(&self) -> &str {
        self.teams.get(1).map(|t| t.name.as_str()).unwrap_or("TBD")
    }

    /// Live or final score; `None` before kickoff.
    pub fn live_score(&self) -> Option<[u32; 2]> {
        if self.kind() == MatchStatus::NotStarted {
            return None;
        }
        Some(score_pair(self.scores.as_deref().unwrap_or(&[])))
    }

    pub fn kickoff(&self, offset: FixedOffset) -> Option<DateTime<Utc>> {
        parse_kickoff(&self.start_time, offset)
    }
}

impl MatchdayRoot {
    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games_by_date.iter().flat_map(|d| d.matches.iter())
    }

    pub fn game(&self, id: &str) -> Option<&Game> {
        self.games().find(|g| g.id == id)
    }
}

const NAIVE_KICKOFF_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parses a kickoff timestamp. Naive times are read in the competition's offset.
pub fn parse_kickoff(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_KICKOFF_FORMATS.iter().find_map(|fmt| {
        let naive = NaiveDateTime::parse_from_str(raw, fmt).ok()?;
        offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// Heading for a date group, e.g. "Sunday, August 24, 2025". Falls back to the raw string.
pub fn format_date_heading(raw: &str) -> String {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    let parsed = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok());
    match parsed {
        Some(date) => date.format("%A, %B %-d, %Y").to_string(),
        None => trimmed.to_string(),
    }
}

/// Short status cell for a match row.
pub fn match_status_label(game: &Game, offset: FixedOffset) -> String {
    match game.kind() {
        MatchStatus::NotStarted => game
            .kickoff(offset)
            .map(|k| k.with_timezone(&offset).format("%H:%M").to_string())
            .unwrap_or_else(|| game.status.short_name.clone()),
        MatchStatus::InProgress => {
            if !game.game_time_to_display.is_empty() {
                game.game_time_to_display.clone()
            } else if !game.status.short_name.is_empty() {
                game.status.short_name.clone()
            } else {
                "LIVE".to_string()
            }
        }
        MatchStatus::Finished => {
            if game.status.name.is_empty() {
                "Final".to_string()
            } else {
                game.status.name.clone()
            }
        }
    }
}
