pub mod league_service;
pub mod match_service;
pub mod match_simulator;
pub mod predictor;
pub mod schedule;
pub mod standings;
pub mod team_service;
pub mod week_runner;

pub use league_service::{LeagueLocks, LeagueService};
pub use match_service::MatchService;
pub use predictor::Predictor;
pub use team_service::TeamService;
