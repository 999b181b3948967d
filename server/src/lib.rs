//! # Dog Walking Game Server Library
//!
//! The application side of the game server. The simulation itself lives in
//! the `shared` crate; this crate wraps it with everything a deployment
//! needs:
//!
//! - `app`: player registry, bearer tokens and the game use cases
//! - `api`: the `/api/v1` HTTP endpoints and their error mapping
//! - `config`: the JSON config file loader building the game model
//! - `db`: the Postgres-backed retirement sink and leaderboard
//! - `serialization`: the crash-consistent snapshot codec and the
//!   periodic save observer
//!
//! All game-state mutation funnels through one mutex held in `api::AppState`,
//! so joins, actions, reads and ticks are serialized with respect to each
//! other. Ticks come either from the auto-ticker task or from the tick
//! endpoint, never both.

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod serialization;
