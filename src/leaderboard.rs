use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardUser {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub user: LeaderboardUser,
    #[serde(rename = "globalPoints", default)]
    pub global_points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRow {
    pub rank: usize,
    pub name: String,
    pub points: i64,
    pub is_me: bool,
}

/// Rank is the position in server order, starting at 1.
pub fn ranked(entries: &[LeaderboardEntry], me: Option<i64>) -> Vec<RankedRow> {
    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| RankedRow {
            rank: idx + 1,
            name: if entry.user.name.is_empty() {
                entry.user.email.clone().unwrap_or_default()
            } else {
                entry.user.name.clone()
            },
            points: entry.global_points,
            is_me: me == Some(entry.user.id),
        })
        .collect()
}

pub fn ordinal(rank: usize) -> String {
    let suffix = match (rank % 10, rank % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{rank}{suffix}")
}
