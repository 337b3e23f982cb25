use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::HashMap;
use std::time::Instant;

use crate::error::{LeagueError, LeagueResult};
use crate::models::{League, PredictionResult, Standings, TeamPrediction};
use crate::services::match_simulator::simulate_score;

pub const DEFAULT_SIMULATION_RUNS: usize = 100;
pub const DEFAULT_MIN_PREDICTION_WEEK: i32 = 4;
pub const STATISTICAL_PREDICTION: &str = "Statistical Prediction";
pub const FINAL_RESULTS: &str = "Final Results";

/// One plausible final table: every unplayed fixture is simulated once with
/// the current roster strengths and folded into a copy of the current
/// standings. `league` is never modified.
pub fn project_final_standings<R: Rng + ?Sized>(league: &League, rng: &mut R) -> Standings {
    let mut projected = league.standings.clone();
    projected.week = league.total_weeks;

    for fixture in league.remaining_matches() {
        let (Some(home), Some(away)) =
            (league.team(fixture.home_team_id), league.team(fixture.away_team_id))
        else {
            continue;
        };

        let (home_score, away_score) = simulate_score(rng, home, away);
        let mut simulated = fixture.clone();
        simulated.home_score = home_score;
        simulated.away_score = away_score;
        simulated.played = true;
        projected.apply_match(&simulated);
    }

    projected.sort_by_rank();
    projected
}

/// Finishing positions and point totals accumulated over some number of runs,
/// indexed by roster position.
#[derive(Debug, Clone, PartialEq)]
struct RunTally {
    position_counts: Vec<Vec<u32>>,
    points: Vec<i64>,
}

impl RunTally {
    fn new(team_count: usize) -> Self {
        Self {
            position_counts: vec![vec![0; team_count]; team_count],
            points: vec![0; team_count],
        }
    }

    fn record(&mut self, standings: &Standings, roster_index: &HashMap<i64, usize>) {
        let team_count = self.points.len();
        for (position, row) in standings.teams.iter().enumerate().take(team_count) {
            if let Some(&index) = roster_index.get(&row.team_id) {
                self.position_counts[index][position] += 1;
                self.points[index] += row.points as i64;
            }
        }
    }

    /// Element-wise sum; associative and commutative.
    fn merge(mut self, other: RunTally) -> RunTally {
        for (mine, theirs) in self.position_counts.iter_mut().zip(other.position_counts) {
            for (a, b) in mine.iter_mut().zip(theirs) {
                *a += b;
            }
        }
        for (a, b) in self.points.iter_mut().zip(other.points) {
            *a += b;
        }
        self
    }
}

/// First position holding the highest count, 1-indexed (lowest position wins ties).
fn most_likely_position(counts: &[u32]) -> usize {
    let mut best = 0;
    let mut best_count = 0;
    for (position, &count) in counts.iter().enumerate() {
        if count > best_count {
            best_count = count;
            best = position + 1;
        }
    }
    best
}

fn percentage(count: u32, runs: usize) -> f64 {
    count as f64 / runs as f64 * 100.0
}

#[derive(Debug, Clone)]
pub struct Predictor {
    runs: usize,
    min_week: i32,
    seed: Option<u64>,
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATION_RUNS, DEFAULT_MIN_PREDICTION_WEEK)
    }
}

impl Predictor {
    pub fn new(runs: usize, min_week: i32) -> Self {
        Self {
            runs: runs.max(1),
            min_week,
            seed: None,
        }
    }

    /// Derive every run's generator from `seed` instead of OS entropy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Generator for one simulation path; never shared between runs.
    fn run_rng(&self, run: usize) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(run as u64)),
            None => rand::make_rng(),
        }
    }

    pub fn project(&self, league: &League) -> Standings {
        let mut rng = self.run_rng(self.runs);
        project_final_standings(league, &mut rng)
    }

    /// Monte-Carlo projection of the final table with per-team probabilities.
    pub fn predict(&self, league: &League) -> LeagueResult<PredictionResult> {
        if league.current_week < self.min_week {
            return Err(LeagueError::precondition(format!(
                "predictions are only available after week {}",
                self.min_week
            )));
        }

        if league.is_finished() {
            return Ok(final_results(league));
        }

        let started = Instant::now();
        let team_count = league.teams.len();
        let roster_index: HashMap<i64, usize> = league
            .teams
            .iter()
            .enumerate()
            .map(|(index, team)| (team.id, index))
            .collect();

        let tally = (0..self.runs)
            .into_par_iter()
            .map(|run| {
                let mut rng = self.run_rng(run);
                let projected = project_final_standings(league, &mut rng);
                let mut tally = RunTally::new(team_count);
                tally.record(&projected, &roster_index);
                tally
            })
            .reduce(|| RunTally::new(team_count), RunTally::merge);

        let mut team_predictions: Vec<TeamPrediction> = league
            .teams
            .iter()
            .enumerate()
            .map(|(index, team)| {
                let counts = tally.position_counts[index].clone();
                let top_three: u32 = counts.iter().take(3).sum();
                let last = counts.last().copied().unwrap_or(0);
                TeamPrediction {
                    team_id: team.id,
                    team_name: team.name.clone(),
                    current_points: league.standings.get(team.id).map_or(0, |s| s.points),
                    predicted_points: (tally.points[index] / self.runs as i64) as i32,
                    most_likely_position: most_likely_position(&counts),
                    championship_probability: percentage(counts.first().copied().unwrap_or(0), self.runs),
                    top_three_probability: percentage(top_three, self.runs),
                    relegation_probability: percentage(last, self.runs),
                    position_counts: counts,
                }
            })
            .collect();

        sort_predictions(&mut team_predictions);

        tracing::info!(
            "Predicted league {} from week {}/{} with {} runs in {:?}",
            league.id,
            league.current_week,
            league.total_weeks,
            self.runs,
            started.elapsed()
        );

        Ok(PredictionResult {
            current_week: league.current_week,
            total_weeks: league.total_weeks,
            prediction_type: STATISTICAL_PREDICTION.to_string(),
            standings: self.project(league),
            team_predictions,
            confidence: season_confidence(league),
        })
    }
}

/// Share of the season already played, as a percentage.
pub fn season_confidence(league: &League) -> f64 {
    if league.total_weeks <= 0 {
        return 100.0;
    }
    league.current_week as f64 / league.total_weeks as f64 * 100.0
}

/// Highest average first; equal averages go to the better most-likely
/// position, then to the team name.
fn sort_predictions(predictions: &mut [TeamPrediction]) {
    predictions.sort_by(|a, b| {
        b.predicted_points
            .cmp(&a.predicted_points)
            .then_with(|| a.most_likely_position.cmp(&b.most_likely_position))
            .then_with(|| a.team_name.cmp(&b.team_name))
    });
}

/// Season over: the actual table, certain outcomes, full confidence.
fn final_results(league: &League) -> PredictionResult {
    let standings = league.standings.sorted();
    let team_count = standings.teams.len();

    let team_predictions = standings
        .teams
        .iter()
        .enumerate()
        .map(|(position, row)| {
            let mut position_counts = vec![0; team_count];
            position_counts[position] = 1;
            let certain = |hit: bool| if hit { 100.0 } else { 0.0 };
            TeamPrediction {
                team_id: row.team_id,
                team_name: row.team_name.clone(),
                current_points: row.points,
                predicted_points: row.points,
                most_likely_position: position + 1,
                championship_probability: certain(position == 0),
                top_three_probability: certain(position < 3),
                relegation_probability: certain(position + 1 == team_count),
                position_counts,
            }
        })
        .collect();

    PredictionResult {
        current_week: league.current_week,
        total_weeks: league.total_weeks,
        prediction_type: FINAL_RESULTS.to_string(),
        standings,
        team_predictions,
        confidence: 100.0,
    }
}
