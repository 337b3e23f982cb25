use rand::rngs::StdRng;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::db;
use crate::error::{LeagueError, LeagueResult};
use crate::models::{
    CreateLeagueRequest, League, LeagueSimulationResult, Match, PredictionResult, Standings,
};
use crate::services::predictor::Predictor;
use crate::services::schedule::{generate_schedule, total_weeks};
use crate::services::week_runner;

/// One async mutex per league id. Anything that rewrites a league's fixtures
/// or standings holds its guard for the whole read-modify-write.
///
/// Entries only live while someone holds or waits on them: a mutex whose
/// sole owner is the map is dropped on the next `acquire`.
#[derive(Debug, Clone, Default)]
pub struct LeagueLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>,
}

impl LeagueLocks {
    pub async fn acquire(&self, league_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|id, lock| *id == league_id || Arc::strong_count(lock) > 1);
            locks.entry(league_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

pub(crate) async fn load_league(conn: &mut SqliteConnection, league_id: i64) -> LeagueResult<League> {
    db::get_league(conn, league_id)
        .await?
        .ok_or_else(|| LeagueError::not_found(format!("league {}", league_id)))
}

#[derive(Debug, Clone)]
pub struct LeagueService {
    pool: SqlitePool,
    locks: LeagueLocks,
    predictor: Predictor,
}

impl LeagueService {
    pub fn new(pool: SqlitePool, locks: LeagueLocks, predictor: Predictor) -> Self {
        Self {
            pool,
            locks,
            predictor,
        }
    }

    /// New league over every stored team, in id order. League row, roster,
    /// fixtures and the week-0 table are written together.
    pub async fn create_league(&self, request: CreateLeagueRequest) -> LeagueResult<League> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(LeagueError::validation("league name cannot be empty"));
        }

        let teams = db::get_all_teams(&self.pool).await?;
        if teams.len() < 2 {
            return Err(LeagueError::precondition(
                "at least 2 teams are required to create a league",
            ));
        }
        for team in &teams {
            team.validate()?;
        }

        let matches = generate_schedule(&teams)?
            .into_iter()
            .map(|fixture| Match::from_fixture(0, 0, fixture))
            .collect();

        let mut league = League {
            id: 0,
            name: name.to_string(),
            standings: Standings::empty(&teams),
            total_weeks: total_weeks(teams.len()),
            current_week: 0,
            teams,
            matches,
        };

        let mut tx = self.pool.begin().await?;
        db::insert_league(&mut tx, &mut league).await?;
        tx.commit().await?;

        tracing::info!(
            "Created league {} '{}': {} teams, {} weeks, {} matches",
            league.id,
            league.name,
            league.teams.len(),
            league.total_weeks,
            league.matches.len()
        );
        Ok(league)
    }

    pub async fn get_league(&self, league_id: i64) -> LeagueResult<League> {
        let mut conn = self.pool.acquire().await?;
        load_league(&mut conn, league_id).await
    }

    /// Play the next week and return the table after it.
    pub async fn simulate_week(&self, league_id: i64) -> LeagueResult<Standings> {
        let _guard = self.locks.acquire(league_id).await;
        let mut tx = self.pool.begin().await?;

        let mut league = load_league(&mut tx, league_id).await?;
        let expected_week = league.current_week;

        let weekly = {
            let mut rng: StdRng = rand::make_rng();
            week_runner::simulate_week(&mut league, &mut rng)?
        };

        let played: Vec<i64> = weekly.matches.iter().map(|m| m.match_id).collect();
        persist_progress(&mut tx, &league, expected_week, &played, &[&league.standings]).await?;
        tx.commit().await?;

        Ok(league.standings)
    }

    /// Play every remaining week. All weeks are committed together.
    pub async fn simulate_all_weeks(&self, league_id: i64) -> LeagueResult<LeagueSimulationResult> {
        let _guard = self.locks.acquire(league_id).await;
        let mut tx = self.pool.begin().await?;

        let mut league = load_league(&mut tx, league_id).await?;
        let expected_week = league.current_week;

        let result = {
            let mut rng: StdRng = rand::make_rng();
            week_runner::simulate_remaining(&mut league, &mut rng)?
        };

        let played: Vec<i64> = result
            .weekly_results
            .iter()
            .flat_map(|weekly| weekly.matches.iter().map(|m| m.match_id))
            .collect();
        let snapshots: Vec<&Standings> = result
            .weekly_results
            .iter()
            .map(|weekly| &weekly.standings_after)
            .collect();
        persist_progress(&mut tx, &league, expected_week, &played, &snapshots).await?;
        tx.commit().await?;

        tracing::info!(
            "League {} simulated from week {} to week {}",
            league_id,
            result.starting_week,
            result.ending_week
        );
        Ok(result)
    }

    pub async fn current_standings(&self, league_id: i64) -> LeagueResult<Standings> {
        let mut conn = self.pool.acquire().await?;
        if db::get_league_record(&mut *conn, league_id).await?.is_none() {
            return Err(LeagueError::not_found(format!("league {}", league_id)));
        }
        Ok(db::get_current_standings(&mut conn, league_id).await?)
    }

    pub async fn weekly_matches(&self, league_id: i64, week: i32) -> LeagueResult<Vec<Match>> {
        if week < 1 {
            return Err(LeagueError::validation("week must be a positive number"));
        }
        let record = db::get_league_record(&self.pool, league_id)
            .await?
            .ok_or_else(|| LeagueError::not_found(format!("league {}", league_id)))?;
        if week > record.total_weeks {
            return Err(LeagueError::precondition(format!(
                "league {} only has {} weeks",
                league_id, record.total_weeks
            )));
        }
        Ok(db::get_league_matches_by_week(&self.pool, league_id, week).await?)
    }

    /// A single simulated final table. Nothing is written.
    pub async fn predict_final_standings(&self, league_id: i64) -> LeagueResult<Standings> {
        let league = self.get_league(league_id).await?;
        if league.is_finished() {
            return Ok(league.standings.sorted());
        }
        Ok(self.predictor.project(&league))
    }

    pub async fn prediction_with_confidence(&self, league_id: i64) -> LeagueResult<PredictionResult> {
        let league = self.get_league(league_id).await?;
        self.predictor.predict(&league)
    }
}

/// Write the simulated matches, move the week counter from `expected_week`
/// and store the given standings snapshots.
async fn persist_progress(
    conn: &mut SqliteConnection,
    league: &League,
    expected_week: i32,
    played: &[i64],
    snapshots: &[&Standings],
) -> LeagueResult<()> {
    for match_id in played {
        if let Some(match_data) = league.matches.iter().find(|m| m.id == *match_id) {
            db::update_match_result(&mut *conn, match_data).await?;
        }
    }

    let advanced =
        db::advance_league_week(&mut *conn, league.id, expected_week, league.current_week).await?;
    if !advanced {
        return Err(LeagueError::precondition(format!(
            "league {} was advanced by another request",
            league.id
        )));
    }

    for standings in snapshots {
        db::upsert_standings(&mut *conn, league.id, standings).await?;
    }
    Ok(())
}
