use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::http_client::http_client;
use crate::leaderboard::LeaderboardEntry;
use crate::models::{MatchdayRoot, Pronostic};
use crate::predictions::OutboundPrediction;
use crate::session::AuthenticatedUser;

const BODY_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("session expired (401)")]
    Unauthorized,

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Request(err) => err.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }
}

/// Server reply to a bulk send. The body shape is not relied upon.
#[derive(Debug, Clone, Default)]
pub struct BulkAck {
    pub body: Value,
}

/// The backend operations the client needs.
pub trait PredictionApi {
    fn set_bearer(&mut self, token: Option<String>);
    fn fetch_matches(&mut self) -> Result<MatchdayRoot, ApiError>;
    fn send_predictions(&mut self, batch: &[OutboundPrediction]) -> Result<BulkAck, ApiError>;
    fn fetch_my_predictions(&mut self) -> Result<Vec<Pronostic>, ApiError>;
    fn fetch_leaderboard(&mut self) -> Result<Vec<LeaderboardEntry>, ApiError>;
    fn verify_credential(&mut self, credential: &str) -> Result<AuthenticatedUser, ApiError>;
}

type UnauthorizedHook = Box<dyn Fn() + Send>;

pub struct ApiClient {
    client: &'static Client,
    base_url: String,
    competition: String,
    leaderboard_path: String,
    bearer: Option<String>,
    on_unauthorized: Option<UnauthorizedHook>,
}

#[derive(Serialize)]
struct CredentialBody<'a> {
    credential: &'a str,
}

impl ApiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            competition: config.competition.trim_matches('/').to_string(),
            leaderboard_path: config.leaderboard_path.clone(),
            bearer: None,
            on_unauthorized: None,
        })
    }

    /// Called whenever any request comes back 401, before the error is returned.
    pub fn on_unauthorized(mut self, hook: impl Fn() + Send + 'static) -> Self {
        self.on_unauthorized = Some(Box::new(hook));
        self
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn execute(&mut self, req: RequestBuilder) -> Result<String, ApiError> {
        let req = match self.bearer.as_deref() {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {token}")),
            None => req,
        };
        let resp = req.send()?;
        let status = resp.status();
        debug!(%status, url = %resp.url(), "api response");

        if status == StatusCode::UNAUTHORIZED {
            warn!("api returned 401, dropping session");
            self.bearer = None;
            if let Some(hook) = &self.on_unauthorized {
                hook();
            }
            return Err(ApiError::Unauthorized);
        }

        let body = resp.text()?;
        if !status.is_success() {
            let snippet: String = body.chars().take(BODY_SNIPPET_CHARS).collect();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: snippet,
            });
        }
        Ok(body)
    }

    fn get_json<T: DeserializeOwned + Default>(&mut self, path: &str) -> Result<T, ApiError> {
        let req = self.client.get(self.url(path));
        let body = self.execute(req)?;
        parse_or_default(&body)
    }
}

/// Empty and `null` bodies decode to the type's default.
pub fn parse_or_default<T: DeserializeOwned + Default>(raw: &str) -> Result<T, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(trimmed)?)
}

pub fn parse_matchday_json(raw: &str) -> Result<MatchdayRoot, ApiError> {
    parse_or_default(raw)
}

impl PredictionApi for ApiClient {
    fn set_bearer(&mut self, token: Option<String>) {
        self.bearer = token.filter(|t| !t.is_empty());
    }

    fn fetch_matches(&mut self) -> Result<MatchdayRoot, ApiError> {
        let path = format!("/promiedos/{}/current", self.competition);
        self.get_json(&path)
    }

    fn send_predictions(&mut self, batch: &[OutboundPrediction]) -> Result<BulkAck, ApiError> {
        let req = self.client.post(self.url("/pronostics/bulk")).json(batch);
        let body = self.execute(req)?;
        Ok(BulkAck {
            body: parse_or_default(&body)?,
        })
    }

    fn fetch_my_predictions(&mut self) -> Result<Vec<Pronostic>, ApiError> {
        self.get_json("/pronostics/my-pronostics")
    }

    fn fetch_leaderboard(&mut self) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let path = self.leaderboard_path.clone();
        self.get_json(&path)
    }

    fn verify_credential(&mut self, credential: &str) -> Result<AuthenticatedUser, ApiError> {
        let req = self
            .client
            .post(self.url("/auth/google/verify"))
            .json(&CredentialBody { credential });
        let body = self.execute(req)?;
        Ok(serde_json::from_str(body.trim())?)
    }
}
