use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::api::{ApiError, PredictionApi};
use crate::state::{Delta, ProviderCommand};

/// Runs backend calls off the UI thread, one command at a time.
pub fn spawn_provider<A>(api: A, tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) -> JoinHandle<()>
where
    A: PredictionApi + Send + 'static,
{
    thread::spawn(move || run_provider(api, &tx, cmd_rx))
}

pub fn run_provider<A: PredictionApi>(
    mut api: A,
    tx: &Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) {
    while let Ok(cmd) = cmd_rx.recv() {
        handle_command(&mut api, tx, cmd);
    }
    info!("provider channel closed, exiting");
}

pub fn handle_command<A: PredictionApi>(api: &mut A, tx: &Sender<Delta>, cmd: ProviderCommand) {
    match cmd {
        ProviderCommand::SetBearer(token) => api.set_bearer(token),
        ProviderCommand::FetchMatches { epoch } => fetch_matches(api, tx, epoch),
        ProviderCommand::SendPredictions { epoch, batch } => {
            match api.send_predictions(&batch) {
                Ok(_) => {
                    info!(count = batch.len(), "predictions accepted");
                    let _ = tx.send(Delta::PredictionsSent { epoch, sent: batch });
                    fetch_matches(api, tx, epoch);
                }
                Err(err) => {
                    warn!(error = %err, "bulk send failed");
                    let _ = tx.send(Delta::SaveFailed {
                        epoch,
                        error: err.to_string(),
                    });
                }
            }
        }
        ProviderCommand::FetchMyPredictions { epoch } => match api.fetch_my_predictions() {
            Ok(predictions) => {
                let _ = tx.send(Delta::MyPredictionsLoaded { epoch, predictions });
            }
            Err(err) => {
                warn!(error = %err, "my-pronostics fetch failed");
                let _ = tx.send(Delta::Log(format!("[WARN] My predictions fetch error: {err}")));
            }
        },
        ProviderCommand::FetchLeaderboard => match api.fetch_leaderboard() {
            Ok(entries) => {
                let _ = tx.send(Delta::LeaderboardLoaded(entries));
            }
            Err(err) => {
                warn!(error = %err, "leaderboard fetch failed");
                let _ = tx.send(Delta::LeaderboardFailed(err.to_string()));
            }
        },
        ProviderCommand::VerifyCredential { credential } => {
            match api.verify_credential(&credential) {
                Ok(user) => {
                    info!(user_id = user.user.id, "credential verified");
                    let _ = tx.send(Delta::LoginSucceeded(user));
                }
                Err(err) => {
                    warn!(error = %err, "credential rejected");
                    let _ = tx.send(Delta::LoginFailed(login_error_message(&err)));
                }
            }
        }
    }
}

fn fetch_matches<A: PredictionApi>(api: &mut A, tx: &Sender<Delta>, epoch: u64) {
    match api.fetch_matches() {
        Ok(matchday) => {
            let _ = tx.send(Delta::MatchesLoaded { epoch, matchday });
        }
        Err(err) => {
            warn!(error = %err, "matches fetch failed");
            let _ = tx.send(Delta::MatchesFailed {
                epoch,
                error: err.to_string(),
            });
        }
    }
}

pub fn login_error_message(err: &ApiError) -> String {
    match err {
        ApiError::Unauthorized => "Sign-in rejected: credential not accepted".to_string(),
        ApiError::Status { status, .. } => format!("Sign-in failed (HTTP {status})"),
        ApiError::Request(_) => "Sign-in failed: backend unreachable".to_string(),
        ApiError::Decode(_) => "Sign-in failed: unexpected response".to_string(),
    }
}
