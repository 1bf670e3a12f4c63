//! Local prediction state for the signed-in player.
//!
//! The store keeps at most one prediction per game. Entries start out pending
//! (edited locally, not yet acknowledged by the backend) and become submitted
//! either after a successful bulk send or when a refresh shows the server holds
//! a prediction from this player for that game. Submitted entries are never
//! changed by local edits.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MatchesByDate, Pronostic, Side};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrediction {
    #[serde(rename = "gameId")]
    pub game_id: String,
    pub scores: [u32; 2],
    pub submitted: bool,
    #[serde(rename = "submittedAt", default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl UserPrediction {
    pub fn pending(game_id: &str, scores: [u32; 2]) -> Self {
        Self {
            game_id: game_id.to_string(),
            scores,
            submitted: false,
            submitted_at: None,
        }
    }

    /// A server-held prediction, treated as already submitted.
    pub fn confirmed(pronostic: &Pronostic) -> Self {
        let stamp = pronostic
            .updated_at
            .as_deref()
            .or(pronostic.created_at.as_deref())
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Self {
            game_id: pronostic.external_id.clone(),
            scores: pronostic.score_pair(),
            submitted: true,
            submitted_at: stamp,
        }
    }
}

/// Body element of `POST /pronostics/bulk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundPrediction {
    #[serde(rename = "externalId")]
    pub external_id: String,
    pub prediction: OutboundScores,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundScores {
    pub scores: [u32; 2],
}

#[derive(Debug, Clone, Default)]
pub struct PredictionStore {
    local: Vec<UserPrediction>,
    all: Vec<Pronostic>,
}

/// Non-numeric or empty input reads as 0; negative input clamps to 0.
pub fn parse_score_input(raw: &str) -> u32 {
    raw.trim()
        .parse::<i64>()
        .map(|v| v.clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

impl PredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_local(local: Vec<UserPrediction>) -> Self {
        let mut store = Self::new();
        for entry in local {
            match store.position(&entry.game_id) {
                Some(idx) => store.local[idx] = entry,
                None => store.local.push(entry),
            }
        }
        store
    }

    fn position(&self, game_id: &str) -> Option<usize> {
        self.local.iter().position(|p| p.game_id == game_id)
    }

    pub fn update_score(&mut self, game_id: &str, side: Side, raw: &str) {
        let value = parse_score_input(raw);
        match self.position(game_id) {
            Some(idx) => {
                let entry = &mut self.local[idx];
                if entry.submitted {
                    return;
                }
                entry.scores[side.index()] = value;
            }
            None => {
                let mut scores = [0, 0];
                scores[side.index()] = value;
                self.local.push(UserPrediction::pending(game_id, scores));
            }
        }
    }

    pub fn remove_prediction(&mut self, game_id: &str) {
        self.local
            .retain(|p| p.game_id != game_id || p.submitted);
    }

    pub fn get_score(&self, game_id: &str, side: Side) -> String {
        self.prediction(game_id)
            .map(|p| p.scores[side.index()].to_string())
            .unwrap_or_default()
    }

    pub fn has_prediction(&self, game_id: &str) -> bool {
        self.position(game_id).is_some()
    }

    pub fn is_submitted(&self, game_id: &str) -> bool {
        self.prediction(game_id).is_some_and(|p| p.submitted)
    }

    pub fn prediction(&self, game_id: &str) -> Option<&UserPrediction> {
        self.local.iter().find(|p| p.game_id == game_id)
    }

    pub fn count_pending(&self) -> usize {
        self.local.iter().filter(|p| !p.submitted).count()
    }

    /// Pending predictions shaped for the bulk endpoint, optionally limited to `game_ids`.
    pub fn build_batch(&self, game_ids: Option<&[&str]>) -> Vec<OutboundPrediction> {
        self.local
            .iter()
            .filter(|p| !p.submitted)
            .filter(|p| game_ids.is_none_or(|ids| ids.contains(&p.game_id.as_str())))
            .map(|p| OutboundPrediction {
                external_id: p.game_id.clone(),
                prediction: OutboundScores { scores: p.scores },
            })
            .collect()
    }

    pub fn mark_submitted(&mut self, game_id: &str) {
        self.mark_submitted_at(game_id, Utc::now());
    }

    pub fn mark_submitted_at(&mut self, game_id: &str, at: DateTime<Utc>) {
        if let Some(idx) = self.position(game_id) {
            let entry = &mut self.local[idx];
            entry.submitted = true;
            entry.submitted_at = Some(at);
        }
    }

    /// Marks the entries whose scores still match what was posted. Entries edited
    /// after the batch went out stay pending. Returns how many were marked.
    pub fn mark_sent(&mut self, sent: &[OutboundPrediction]) -> usize {
        self.mark_sent_at(sent, Utc::now())
    }

    pub fn mark_sent_at(&mut self, sent: &[OutboundPrediction], at: DateTime<Utc>) -> usize {
        let mut marked = 0;
        for out in sent {
            let Some(idx) = self.position(&out.external_id) else {
                continue;
            };
            let entry = &mut self.local[idx];
            if entry.submitted || entry.scores != out.prediction.scores {
                continue;
            }
            entry.submitted = true;
            entry.submitted_at = Some(at);
            marked += 1;
        }
        marked
    }

    /// Reconciles freshly fetched match data with the local set.
    ///
    /// Every game's embedded predictions become the "all predictions" set. The
    /// ones owned by `user_id` are authoritative and count as submitted. Local
    /// pending edits survive unless the server now holds a prediction for the
    /// same game, in which case the server wins. Submitted local entries that the
    /// server no longer reports are dropped.
    pub fn ingest_server_matches(&mut self, matches: &[MatchesByDate], user_id: Option<i64>) {
        let all: Vec<Pronostic> = matches
            .iter()
            .flat_map(|d| d.matches.iter())
            .flat_map(|g| g.pronostics.iter().cloned())
            .collect();

        let confirmed: Vec<UserPrediction> = match user_id {
            Some(uid) => all
                .iter()
                .filter(|p| p.owner_id() == Some(uid))
                .map(UserPrediction::confirmed)
                .collect(),
            None => Vec::new(),
        };

        self.all = all;
        self.ingest_confirmed(confirmed);
    }

    /// Replaces the local set with `confirmed` plus the pending edits it does not cover.
    pub fn ingest_confirmed(&mut self, confirmed: Vec<UserPrediction>) {
        let mut merged: Vec<UserPrediction> = Vec::with_capacity(confirmed.len());
        for entry in confirmed {
            match merged.iter().position(|p| p.game_id == entry.game_id) {
                Some(idx) => merged[idx] = entry,
                None => merged.push(entry),
            }
        }

        let confirmed_ids: HashSet<&str> = merged.iter().map(|p| p.game_id.as_str()).collect();
        let surviving: Vec<UserPrediction> = self
            .local
            .iter()
            .filter(|p| !p.submitted)
            .filter(|p| !confirmed_ids.contains(p.game_id.as_str()))
            .cloned()
            .collect();

        merged.extend(surviving);
        self.local = merged;
    }

    /// Everyone's predictions for one game, from the last match refresh.
    pub fn predictions_for_game(&self, game_id: &str) -> Vec<&Pronostic> {
        self.all
            .iter()
            .filter(|p| p.external_id == game_id)
            .collect()
    }

    pub fn snapshot(&self) -> Vec<UserPrediction> {
        self.local.clone()
    }

    pub fn clear(&mut self) {
        self.local.clear();
        self.all.clear();
    }
}
