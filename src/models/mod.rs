use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::error::{LeagueError, LeagueResult};
use crate::utils::validate_team_name;

pub const MIN_STRENGTH: i32 = 1;
pub const MAX_STRENGTH: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub strength: i32, // 1-100
}

impl Team {
    pub fn validate(&self) -> LeagueResult<()> {
        validate_team_fields(&self.name, self.strength)
    }
}

fn validate_team_fields(name: &str, strength: i32) -> LeagueResult<()> {
    if name.trim().is_empty() {
        return Err(LeagueError::validation("team name cannot be empty"));
    }
    if !validate_team_name(name) {
        return Err(LeagueError::validation("team name must be at most 100 characters"));
    }
    if !(MIN_STRENGTH..=MAX_STRENGTH).contains(&strength) {
        return Err(LeagueError::validation(format!(
            "team strength must be between {} and {}",
            MIN_STRENGTH, MAX_STRENGTH
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRequest {
    pub name: String,
    pub strength: i32,
}

impl TeamRequest {
    pub fn validate(&self) -> LeagueResult<()> {
        validate_team_fields(&self.name, self.strength)
    }
}

/// A scheduled pairing before it has been persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fixture {
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub week: i32,
}

impl Fixture {
    pub fn new(home_team_id: i64, away_team_id: i64, week: i32) -> LeagueResult<Self> {
        validate_pairing(home_team_id, away_team_id, week)?;
        Ok(Self {
            home_team_id,
            away_team_id,
            week,
        })
    }
}

fn validate_pairing(home_team_id: i64, away_team_id: i64, week: i32) -> LeagueResult<()> {
    if home_team_id == away_team_id {
        return Err(LeagueError::validation(
            "home team and away team cannot be the same",
        ));
    }
    if week < 1 {
        return Err(LeagueError::validation("week must be a positive number"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Match {
    pub id: i64,
    pub league_id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub week: i32,
    pub played: bool,
    pub home_score: i32,
    pub away_score: i32,
    pub played_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn from_fixture(id: i64, league_id: i64, fixture: Fixture) -> Self {
        Self {
            id,
            league_id,
            home_team_id: fixture.home_team_id,
            away_team_id: fixture.away_team_id,
            week: fixture.week,
            played: false,
            home_score: 0,
            away_score: 0,
            played_at: None,
        }
    }

    pub fn validate(&self) -> LeagueResult<()> {
        validate_pairing(self.home_team_id, self.away_team_id, self.week)?;
        if self.played && (self.home_score < 0 || self.away_score < 0) {
            return Err(LeagueError::validation("scores cannot be negative"));
        }
        Ok(())
    }

    /// Marks the match played. Only the simulator and the result editor call this.
    pub fn record_result(&mut self, home_score: i32, away_score: i32, played_at: DateTime<Utc>) {
        self.home_score = home_score;
        self.away_score = away_score;
        self.played = true;
        self.played_at = Some(played_at);
    }

    /// Result from the home side's perspective
    pub fn outcome(&self) -> MatchOutcome {
        if !self.played {
            return MatchOutcome::NotPlayed;
        }
        match self.home_score.cmp(&self.away_score) {
            std::cmp::Ordering::Greater => MatchOutcome::Win,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
            std::cmp::Ordering::Less => MatchOutcome::Loss,
        }
    }

    pub fn involves(&self, team_id: i64) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Win,
    Draw,
    Loss,
    #[serde(rename = "Not Played")]
    NotPlayed,
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchOutcome::Win => "Win",
            MatchOutcome::Draw => "Draw",
            MatchOutcome::Loss => "Loss",
            MatchOutcome::NotPlayed => "Not Played",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMatchRequest {
    pub league_id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub week: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditMatchRequest {
    pub home_score: i32,
    pub away_score: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TeamStanding {
    pub team_id: i64,
    pub team_name: String,
    pub points: i32,
    pub played: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_difference: i32,
}

impl TeamStanding {
    pub fn new(team: &Team) -> Self {
        Self {
            team_id: team.id,
            team_name: team.name.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    pub week: i32,
    pub teams: Vec<TeamStanding>,
}

impl Standings {
    /// Zeroed table for a roster, in roster order.
    pub fn empty(teams: &[Team]) -> Self {
        Self {
            week: 0,
            teams: teams.iter().map(TeamStanding::new).collect(),
        }
    }

    pub fn get(&self, team_id: i64) -> Option<&TeamStanding> {
        self.teams.iter().find(|s| s.team_id == team_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeagueRecord {
    pub id: i64,
    pub name: String,
    pub current_week: i32,
    pub total_weeks: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct League {
    pub id: i64,
    pub name: String,
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
    pub standings: Standings,
    pub current_week: i32,
    pub total_weeks: i32,
}

impl League {
    pub fn team(&self, team_id: i64) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }

    pub fn is_finished(&self) -> bool {
        self.current_week >= self.total_weeks
    }

    pub fn remaining_matches(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(|m| !m.played)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeagueRequest {
    pub name: String,
}

// Simulation log types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    pub result: MatchOutcome,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyResult {
    pub week: i32,
    pub matches: Vec<MatchResult>,
    pub standings_before: Standings,
    pub standings_after: Standings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueSimulationResult {
    pub league_id: i64,
    pub starting_week: i32,
    pub ending_week: i32,
    pub weekly_results: Vec<WeeklyResult>,
    pub final_standings: Standings,
}

// Prediction types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamPrediction {
    pub team_id: i64,
    pub team_name: String,
    pub current_points: i32,
    pub predicted_points: i32,
    pub most_likely_position: usize, // 1-indexed
    pub championship_probability: f64,
    pub top_three_probability: f64,
    pub relegation_probability: f64,
    pub position_counts: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub current_week: i32,
    pub total_weeks: i32,
    pub prediction_type: String,
    #[serde(rename = "predicted_standings")]
    pub standings: Standings,
    pub team_predictions: Vec<TeamPrediction>,
    #[serde(rename = "confidence_percentage")]
    pub confidence: f64,
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}
