use sqlx::SqlitePool;
use strsim::jaro_winkler;

use crate::db;
use crate::error::{LeagueError, LeagueResult};
use crate::models::{Team, TeamRequest};

/// Below this similarity a name lookup reports no match.
pub const NAME_MATCH_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct TeamService {
    pool: SqlitePool,
}

impl TeamService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> LeagueResult<Vec<Team>> {
        Ok(db::get_all_teams(&self.pool).await?)
    }

    pub async fn get(&self, team_id: i64) -> LeagueResult<Team> {
        db::get_team_by_id(&self.pool, team_id)
            .await?
            .ok_or_else(|| LeagueError::not_found(format!("team {}", team_id)))
    }

    pub async fn create(&self, request: TeamRequest) -> LeagueResult<Team> {
        request.validate()?;
        let team = db::insert_team(&self.pool, &request).await?;
        tracing::info!("Created team {} ({}) with strength {}", team.id, team.name, team.strength);
        Ok(team)
    }

    pub async fn update(&self, team_id: i64, request: TeamRequest) -> LeagueResult<Team> {
        request.validate()?;
        let team = Team {
            id: team_id,
            name: request.name.trim().to_string(),
            strength: request.strength,
        };
        if !db::update_team(&self.pool, &team).await? {
            return Err(LeagueError::not_found(format!("team {}", team_id)));
        }
        Ok(team)
    }

    /// Teams on a league roster are referenced by its fixtures and standings,
    /// so they cannot be removed.
    pub async fn delete(&self, team_id: i64) -> LeagueResult<()> {
        self.get(team_id).await?;
        if db::team_in_any_league(&self.pool, team_id).await? {
            return Err(LeagueError::precondition(format!(
                "team {} belongs to a league and cannot be deleted",
                team_id
            )));
        }
        db::delete_team(&self.pool, team_id).await?;
        tracing::info!("Deleted team {}", team_id);
        Ok(())
    }

    pub async fn create_initial_teams(&self) -> LeagueResult<Vec<Team>> {
        Ok(db::seed_initial_teams(&self.pool).await?)
    }

    /// Closest team by Jaro-Winkler similarity (case-insensitive), with its score.
    pub async fn find_by_name(&self, name: &str) -> LeagueResult<Option<(Team, f64)>> {
        let teams = self.list().await?;
        Ok(best_name_match(teams, name))
    }
}

fn best_name_match(teams: Vec<Team>, name: &str) -> Option<(Team, f64)> {
    let needle = name.trim().to_lowercase();
    teams
        .into_iter()
        .map(|team| {
            let score = jaro_winkler(&needle, &team.name.to_lowercase());
            (team, score)
        })
        .filter(|(_, score)| *score >= NAME_MATCH_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
}
