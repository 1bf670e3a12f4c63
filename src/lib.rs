pub mod api;
pub mod config;
pub mod http_client;
pub mod leaderboard;
pub mod models;
pub mod persist;
pub mod phase;
pub mod predictions;
pub mod provider;
pub mod session;
pub mod state;
