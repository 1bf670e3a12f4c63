use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::phase::DEFAULT_LEAD_MINUTES;

pub const DEFAULT_API_URL: &str = "https://prode-api-b502f110a3d0.herokuapp.com";
const DEFAULT_COMPETITION: &str = "lpf";
const DEFAULT_LEADERBOARD_PATH: &str = "/pronostics/leaderboard";
const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub competition: String,
    pub leaderboard_path: String,
    pub lead_window: chrono::Duration,
    pub utc_offset: FixedOffset,
    pub matches_poll: Duration,
    pub google_credential: Option<String>,
    pub state_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            competition: DEFAULT_COMPETITION.to_string(),
            leaderboard_path: DEFAULT_LEADERBOARD_PATH.to_string(),
            lead_window: chrono::Duration::minutes(DEFAULT_LEAD_MINUTES),
            utc_offset: offset_from_hours(DEFAULT_UTC_OFFSET_HOURS),
            matches_poll: Duration::from_secs(60),
            google_credential: None,
            state_file: None,
        }
    }
}

impl Config {
    /// Reads `.env.local`, `.env`, then the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let defaults = Self::default();
        let lead_minutes = env::var("PRODE_LEAD_MINUTES")
            .ok()
            .and_then(|val| val.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_LEAD_MINUTES)
            .max(0);
        let offset_hours = env::var("PRODE_UTC_OFFSET_HOURS")
            .ok()
            .and_then(|val| val.trim().parse::<i32>().ok())
            .unwrap_or(DEFAULT_UTC_OFFSET_HOURS)
            .clamp(-12, 14);
        let poll_secs = env::var("MATCHES_POLL_SECS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(60)
            .max(15);

        Self {
            api_url: non_empty_env("PRODE_API_URL").unwrap_or(defaults.api_url),
            competition: non_empty_env("PRODE_COMPETITION").unwrap_or(defaults.competition),
            leaderboard_path: non_empty_env("PRODE_LEADERBOARD_PATH")
                .unwrap_or(defaults.leaderboard_path),
            lead_window: chrono::Duration::minutes(lead_minutes),
            utc_offset: offset_from_hours(offset_hours),
            matches_poll: Duration::from_secs(poll_secs),
            google_credential: non_empty_env("PRODE_GOOGLE_CREDENTIAL"),
            state_file: non_empty_env("PRODE_STATE_FILE").map(PathBuf::from),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn offset_from_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}
