use std::collections::VecDeque;

use chrono::{DateTime, FixedOffset, Utc};

use crate::config::Config;
use crate::leaderboard::LeaderboardEntry;
use crate::models::{Game, MatchdayRoot, Pronostic, Side};
use crate::persist::PersistedStore;
use crate::phase::{GamePhase, game_phase};
use crate::predictions::{OutboundPrediction, PredictionStore, UserPrediction};
use crate::session::{AuthenticatedUser, Session};

const LOG_CAPACITY: usize = 200;
const MAX_SCORE_DIGITS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Matches,
    Leaderboard,
}

#[derive(Debug, Clone, Default)]
pub struct LoginDialog {
    pub open: bool,
    pub input: String,
    pub pending: bool,
    pub error: Option<String>,
}

/// Everything the UI reads. Owned by the application root; network results only
/// land here through [`apply_delta`].
#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub session: Session,
    pub predictions: PredictionStore,
    pub matchday: Option<MatchdayRoot>,
    pub matches_loading: bool,
    pub matches_error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub leaderboard_loading: bool,
    pub leaderboard_error: Option<String>,
    pub saving_predictions: bool,
    pub selected: usize,
    pub focus_side: Side,
    pub leaderboard_scroll: u16,
    pub show_others: bool,
    pub help_overlay: bool,
    pub login: LoginDialog,
    pub logs: VecDeque<String>,
    pub lead_window: chrono::Duration,
    pub utc_offset: FixedOffset,
    /// Bumped on every login/logout. Results requested under an older epoch are dropped.
    pub session_epoch: u64,
    /// Account that owned the drafts kept after a forced sign out.
    draft_owner: Option<i64>,
    dirty: bool,
    outbox: Vec<ProviderCommand>,
}

#[derive(Debug, Clone)]
pub enum Delta {
    MatchesLoaded {
        epoch: u64,
        matchday: MatchdayRoot,
    },
    MatchesFailed {
        epoch: u64,
        error: String,
    },
    PredictionsSent {
        epoch: u64,
        sent: Vec<OutboundPrediction>,
    },
    SaveFailed {
        epoch: u64,
        error: String,
    },
    MyPredictionsLoaded {
        epoch: u64,
        predictions: Vec<Pronostic>,
    },
    LeaderboardLoaded(Vec<LeaderboardEntry>),
    LeaderboardFailed(String),
    LoginSucceeded(AuthenticatedUser),
    LoginFailed(String),
    SessionExpired,
    Log(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCommand {
    SetBearer(Option<String>),
    FetchMatches { epoch: u64 },
    SendPredictions {
        epoch: u64,
        batch: Vec<OutboundPrediction>,
    },
    FetchMyPredictions { epoch: u64 },
    FetchLeaderboard,
    VerifyCredential { credential: String },
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            screen: Screen::Matches,
            session: Session::new(),
            predictions: PredictionStore::new(),
            matchday: None,
            matches_loading: false,
            matches_error: None,
            last_updated: None,
            leaderboard: Vec::new(),
            leaderboard_loading: false,
            leaderboard_error: None,
            saving_predictions: false,
            selected: 0,
            focus_side: Side::Home,
            leaderboard_scroll: 0,
            show_others: false,
            help_overlay: false,
            login: LoginDialog::default(),
            logs: VecDeque::with_capacity(LOG_CAPACITY),
            lead_window: config.lead_window,
            utc_offset: config.utc_offset,
            session_epoch: 0,
            draft_owner: None,
            dirty: false,
            outbox: Vec::new(),
        }
    }

    pub fn from_persisted(config: &Config, stored: PersistedStore) -> Self {
        let mut state = Self::new(config);
        state.session = Session::restore(stored.session, stored.is_authenticated);
        state.predictions = PredictionStore::from_local(stored.predictions);
        state.draft_owner = stored.draft_owner;
        if state.session.is_authenticated() {
            let token = state.session.bearer_token().map(str::to_string);
            state.outbox.push(ProviderCommand::SetBearer(token));
            state.outbox.push(ProviderCommand::FetchMyPredictions {
                epoch: state.session_epoch,
            });
        }
        state
    }

    pub fn persisted(&self) -> PersistedStore {
        PersistedStore {
            version: 0,
            session: self.session.user().cloned(),
            is_authenticated: self.session.is_authenticated(),
            predictions: self.predictions.snapshot(),
            draft_owner: self.draft_owner,
        }
    }

    /// True once per change since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn take_commands(&mut self) -> Vec<ProviderCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(target: "prode_terminal::ui", "{line}");
        if self.logs.len() == LOG_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    pub fn games(&self) -> Vec<&Game> {
        self.matchday
            .as_ref()
            .map(|m| m.games().collect())
            .unwrap_or_default()
    }

    pub fn selected_game(&self) -> Option<&Game> {
        self.games().get(self.selected).copied()
    }

    pub fn phase_of(&self, game: &Game, now: DateTime<Utc>) -> GamePhase {
        game_phase(game, now, self.lead_window, self.utc_offset)
    }

    pub fn select_next(&mut self) {
        let len = self.games().len();
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn toggle_side(&mut self) {
        self.focus_side = self.focus_side.other();
    }

    /// Game id of the selection if its prediction can still be edited right now.
    fn editable_selection(&mut self, now: DateTime<Utc>) -> Option<String> {
        if !self.session.is_authenticated() {
            self.push_log("[INFO] Sign in (a) to enter predictions");
            return None;
        }
        let (id, phase) = {
            let game = self.selected_game()?;
            (game.id.clone(), self.phase_of(game, now))
        };
        if !phase.is_editable() {
            self.push_log("[INFO] Predictions are closed for this match");
            return None;
        }
        if self.predictions.is_submitted(&id) {
            self.push_log("[INFO] Prediction already submitted");
            return None;
        }
        Some(id)
    }

    pub fn type_digit(&mut self, digit: char, now: DateTime<Utc>) {
        if !digit.is_ascii_digit() {
            return;
        }
        let Some(id) = self.editable_selection(now) else {
            return;
        };
        let side = self.focus_side;
        let current = self.predictions.get_score(&id, side);
        let raw = if current.is_empty() || current == "0" || current.len() >= MAX_SCORE_DIGITS {
            digit.to_string()
        } else {
            format!("{current}{digit}")
        };
        self.predictions.update_score(&id, side, &raw);
        self.dirty = true;
    }

    pub fn backspace(&mut self, now: DateTime<Utc>) {
        let Some(id) = self.editable_selection(now) else {
            return;
        };
        if !self.predictions.has_prediction(&id) {
            return;
        }
        let side = self.focus_side;
        let mut current = self.predictions.get_score(&id, side);
        current.pop();
        self.predictions.update_score(&id, side, &current);
        self.dirty = true;
    }

    pub fn remove_selected(&mut self, now: DateTime<Utc>) {
        let Some(id) = self.editable_selection(now) else {
            return;
        };
        if self.predictions.has_prediction(&id) {
            self.predictions.remove_prediction(&id);
            self.dirty = true;
        }
    }

    pub fn request_refresh(&mut self) {
        self.matches_loading = true;
        self.outbox.push(ProviderCommand::FetchMatches {
            epoch: self.session_epoch,
        });
    }

    pub fn request_leaderboard(&mut self) {
        self.leaderboard_loading = true;
        self.outbox.push(ProviderCommand::FetchLeaderboard);
    }

    /// Sends every pending prediction whose game is still open.
    pub fn request_save(&mut self, now: DateTime<Utc>) {
        if !self.session.is_authenticated() || self.saving_predictions {
            return;
        }
        let open_ids: Vec<String> = self
            .games()
            .into_iter()
            .filter(|g| self.phase_of(g, now).is_editable())
            .map(|g| g.id.clone())
            .collect();
        let ids: Vec<&str> = open_ids.iter().map(String::as_str).collect();
        let batch = self.predictions.build_batch(Some(ids.as_slice()));
        let skipped = self.predictions.count_pending().saturating_sub(batch.len());
        if skipped > 0 {
            self.push_log(format!(
                "[WARN] {skipped} pending prediction(s) belong to closed matches"
            ));
        }
        if batch.is_empty() {
            return;
        }
        self.saving_predictions = true;
        self.push_log(format!("[INFO] Saving {} prediction(s)", batch.len()));
        self.outbox.push(ProviderCommand::SendPredictions {
            epoch: self.session_epoch,
            batch,
        });
    }

    pub fn open_login(&mut self) {
        if self.session.is_authenticated() {
            return;
        }
        self.login = LoginDialog {
            open: true,
            ..LoginDialog::default()
        };
    }

    pub fn close_login(&mut self) {
        self.login.open = false;
        self.login.pending = false;
    }

    pub fn submit_login(&mut self) {
        let credential = self.login.input.trim().to_string();
        if credential.is_empty() || self.login.pending {
            return;
        }
        self.login.pending = true;
        self.login.error = None;
        self.outbox
            .push(ProviderCommand::VerifyCredential { credential });
    }

    pub fn login_with(&mut self, credential: String) {
        self.login.pending = true;
        self.outbox
            .push(ProviderCommand::VerifyCredential { credential });
    }

    fn sign_in(&mut self, user: AuthenticatedUser) {
        let token = user.access_token.clone().filter(|t| !t.is_empty());
        self.push_log(format!("[INFO] Signed in as {}", user.display_name()));
        if self
            .draft_owner
            .take()
            .is_some_and(|owner| owner != user.user.id)
        {
            self.predictions.clear();
            self.push_log("[INFO] Discarded drafts left by another account");
        }
        self.session.login(user);
        self.session_epoch += 1;
        self.login = LoginDialog::default();
        self.dirty = true;
        self.outbox.push(ProviderCommand::SetBearer(token));
        self.request_refresh();
    }

    /// User-initiated sign out; local predictions go with the session.
    pub fn logout(&mut self) {
        if !self.session.is_authenticated() {
            return;
        }
        self.session.logout();
        self.session_epoch += 1;
        self.draft_owner = None;
        self.predictions.clear();
        self.saving_predictions = false;
        self.dirty = true;
        self.outbox.push(ProviderCommand::SetBearer(None));
        self.push_log("[INFO] Signed out");
        self.request_refresh();
    }

    /// Forced sign out after a 401. Pending edits are kept so they can be saved after
    /// signing in again.
    fn expire_session(&mut self) {
        if !self.session.is_authenticated() {
            return;
        }
        self.draft_owner = self.session.user_id();
        self.session.logout();
        self.session_epoch += 1;
        self.predictions.ingest_confirmed(Vec::new());
        self.saving_predictions = false;
        self.dirty = true;
        self.outbox.push(ProviderCommand::SetBearer(None));
        self.push_log("[WARN] Session expired, please sign in again");
        self.request_refresh();
    }

    fn clamp_selection(&mut self) {
        let len = self.games().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::MatchesLoaded { epoch, matchday } => {
            if epoch != state.session_epoch {
                return;
            }
            let user_id = state.session.user_id();
            state
                .predictions
                .ingest_server_matches(&matchday.games_by_date, user_id);
            state.matchday = Some(matchday);
            state.matches_loading = false;
            state.matches_error = None;
            state.last_updated = Some(Utc::now());
            state.clamp_selection();
            state.dirty = true;
        }
        Delta::MatchesFailed { epoch, error } => {
            if epoch != state.session_epoch {
                return;
            }
            state.matches_loading = false;
            state.push_log(format!("[WARN] Matches fetch error: {error}"));
            state.matches_error = Some(error);
        }
        Delta::PredictionsSent { epoch, sent } => {
            if epoch != state.session_epoch {
                return;
            }
            let marked = state.predictions.mark_sent(&sent);
            state.saving_predictions = false;
            state.dirty = true;
            state.push_log(format!("[INFO] Saved {} prediction(s)", sent.len()));
            let edited = sent.len() - marked;
            if edited > 0 {
                state.push_log(format!(
                    "[INFO] {edited} prediction(s) changed while saving, still pending"
                ));
            }
        }
        Delta::SaveFailed { epoch, error } => {
            if epoch != state.session_epoch {
                return;
            }
            state.saving_predictions = false;
            state.push_log(format!("[WARN] Save failed: {error}"));
        }
        Delta::MyPredictionsLoaded { epoch, predictions } => {
            if epoch != state.session_epoch {
                return;
            }
            let Some(uid) = state.session.user_id() else {
                return;
            };
            let confirmed: Vec<UserPrediction> = predictions
                .iter()
                .filter(|p| p.owner_id().is_none_or(|owner| owner == uid))
                .map(UserPrediction::confirmed)
                .collect();
            state.predictions.ingest_confirmed(confirmed);
            state.dirty = true;
        }
        Delta::LeaderboardLoaded(entries) => {
            state.leaderboard = entries;
            state.leaderboard_loading = false;
            state.leaderboard_error = None;
        }
        Delta::LeaderboardFailed(error) => {
            state.leaderboard_loading = false;
            state.push_log(format!("[WARN] Leaderboard fetch error: {error}"));
            state.leaderboard_error = Some(error);
        }
        Delta::LoginSucceeded(user) => state.sign_in(user),
        Delta::LoginFailed(error) => {
            state.login.pending = false;
            if !state.login.open {
                state.push_log(format!("[WARN] {error}"));
            }
            state.login.error = Some(error);
        }
        Delta::SessionExpired => state.expire_session(),
        Delta::Log(line) => state.push_log(line),
    }
}
