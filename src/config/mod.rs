use anyhow::{anyhow, Context, Result};
use std::env;

use crate::services::predictor::{DEFAULT_MIN_PREDICTION_WEEK, DEFAULT_SIMULATION_RUNS};

const DEFAULT_DATABASE_URL: &str = "sqlite:data/league.db";
const DEFAULT_SERVER_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    /// Monte-Carlo draws per confidence-scored prediction
    pub simulation_runs: usize,
    pub min_prediction_week: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            simulation_runs: DEFAULT_SIMULATION_RUNS,
            min_prediction_week: DEFAULT_MIN_PREDICTION_WEEK,
        }
    }
}

impl Config {
    /// Load configuration from the process environment (after `.env` has been read).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.database_url);

        let server_port = match lookup("SERVER_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid SERVER_PORT: {}", raw))?,
            None => defaults.server_port,
        };

        let simulation_runs = match lookup("SIMULATION_RUNS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid SIMULATION_RUNS: {}", raw))?,
            None => defaults.simulation_runs,
        };
        if simulation_runs == 0 {
            return Err(anyhow!("SIMULATION_RUNS must be at least 1"));
        }

        let min_prediction_week = match lookup("MIN_PREDICTION_WEEK") {
            Some(raw) => raw
                .trim()
                .parse::<i32>()
                .with_context(|| format!("invalid MIN_PREDICTION_WEEK: {}", raw))?,
            None => defaults.min_prediction_week,
        };

        Ok(Self {
            database_url,
            server_port,
            simulation_runs,
            min_prediction_week,
        })
    }
}
