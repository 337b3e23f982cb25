use sqlx::SqlitePool;

use crate::db;
use crate::error::{LeagueError, LeagueResult};
use crate::models::{CreateMatchRequest, EditMatchRequest, Fixture, Match, Standings};
use crate::services::league_service::{load_league, LeagueLocks};

#[derive(Debug, Clone)]
pub struct MatchService {
    pool: SqlitePool,
    locks: LeagueLocks,
}

impl MatchService {
    pub fn new(pool: SqlitePool, locks: LeagueLocks) -> Self {
        Self { pool, locks }
    }

    /// All matches, or only those of `week` across every league.
    pub async fn list(&self, week: Option<i32>) -> LeagueResult<Vec<Match>> {
        match week {
            Some(week) if week < 1 => Err(LeagueError::validation("week must be a positive number")),
            Some(week) => Ok(db::get_matches_by_week(&self.pool, week).await?),
            None => Ok(db::get_all_matches(&self.pool).await?),
        }
    }

    pub async fn get(&self, match_id: i64) -> LeagueResult<Match> {
        db::get_match_by_id(&self.pool, match_id)
            .await?
            .ok_or_else(|| LeagueError::not_found(format!("match {}", match_id)))
    }

    /// Add an unplayed fixture to a week the league has not reached yet.
    pub async fn create(&self, request: CreateMatchRequest) -> LeagueResult<Match> {
        let fixture = Fixture::new(request.home_team_id, request.away_team_id, request.week)?;

        let _guard = self.locks.acquire(request.league_id).await;
        let record = db::get_league_record(&self.pool, request.league_id)
            .await?
            .ok_or_else(|| LeagueError::not_found(format!("league {}", request.league_id)))?;

        if fixture.week > record.total_weeks {
            return Err(LeagueError::validation(format!(
                "week {} is beyond the league's {} weeks",
                fixture.week, record.total_weeks
            )));
        }
        if fixture.week <= record.current_week {
            return Err(LeagueError::precondition(format!(
                "week {} has already been played",
                fixture.week
            )));
        }

        let roster = db::get_league_roster(&self.pool, record.id).await?;
        for team_id in [fixture.home_team_id, fixture.away_team_id] {
            if !roster.iter().any(|t| t.id == team_id) {
                return Err(LeagueError::not_found(format!(
                    "team {} in league {}",
                    team_id, record.id
                )));
            }
        }

        let created = db::insert_match(&self.pool, record.id, &fixture).await?;
        tracing::info!("Created match {} for league {} week {}", created.id, record.id, created.week);
        Ok(created)
    }

    /// Correct the score of a played match. Every stored table from the
    /// match's week up to the league's current week is rebuilt from the
    /// played matches.
    pub async fn edit_result(&self, match_id: i64, request: EditMatchRequest) -> LeagueResult<Match> {
        if request.home_score < 0 || request.away_score < 0 {
            return Err(LeagueError::validation("scores cannot be negative"));
        }

        let league_id = self.get(match_id).await?.league_id;
        let _guard = self.locks.acquire(league_id).await;
        let mut tx = self.pool.begin().await?;

        let mut match_data = db::get_match_by_id(&mut *tx, match_id)
            .await?
            .ok_or_else(|| LeagueError::not_found(format!("match {}", match_id)))?;
        if !match_data.played {
            return Err(LeagueError::precondition(format!(
                "match {} has not been played yet",
                match_id
            )));
        }

        match_data.home_score = request.home_score;
        match_data.away_score = request.away_score;
        match_data.validate()?;
        db::update_match_result(&mut *tx, &match_data).await?;

        let league = load_league(&mut tx, league_id).await?;
        for week in match_data.week..=league.current_week {
            let rebuilt = Standings::from_matches(&league.teams, &league.matches, week);
            db::upsert_standings(&mut tx, league_id, &rebuilt).await?;
        }
        tx.commit().await?;

        tracing::info!(
            "Match {} result edited to {}-{}",
            match_id,
            match_data.home_score,
            match_data.away_score
        );
        Ok(match_data)
    }

    /// Removes an unplayed match. The played check and the delete run under
    /// the league lock in one transaction.
    pub async fn delete(&self, match_id: i64) -> LeagueResult<()> {
        let league_id = self.get(match_id).await?.league_id;
        let _guard = self.locks.acquire(league_id).await;
        let mut tx = self.pool.begin().await?;

        let match_data = db::get_match_by_id(&mut *tx, match_id)
            .await?
            .ok_or_else(|| LeagueError::not_found(format!("match {}", match_id)))?;
        if match_data.played {
            return Err(LeagueError::precondition("played matches cannot be deleted"));
        }
        if !db::delete_unplayed_match(&mut *tx, match_id).await? {
            return Err(LeagueError::precondition("played matches cannot be deleted"));
        }
        tx.commit().await?;

        tracing::info!("Deleted match {} of league {}", match_id, league_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::CreateLeagueRequest;
    use crate::services::league_service::LeagueService;
    use crate::services::predictor::Predictor;

    async fn services() -> (LeagueService, MatchService, i64) {
        services_on(db::test_pool().await).await
    }

    async fn services_on(pool: sqlx::SqlitePool) -> (LeagueService, MatchService, i64) {
        db::seed_initial_teams(&pool).await.unwrap();
        let locks = LeagueLocks::default();
        let leagues = LeagueService::new(pool.clone(), locks.clone(), Predictor::default());
        let matches = MatchService::new(pool, locks);
        let league = leagues
            .create_league(CreateLeagueRequest {
                name: "Edits".into(),
            })
            .await
            .unwrap();
        (leagues, matches, league.id)
    }

    #[tokio::test]
    async fn test_list_by_week() {
        let (_, matches, _) = services().await;
        assert_eq!(matches.list(None).await.unwrap().len(), 6);
        assert_eq!(matches.list(Some(3)).await.unwrap().len(), 2);

        let err = matches.list(Some(0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = matches.get(1234).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_edit_result_rebuilds_standings() {
        let (leagues, matches, league_id) = services().await;

        let unplayed = matches.list(Some(1)).await.unwrap()[0].clone();
        let err = matches
            .edit_result(unplayed.id, EditMatchRequest { home_score: 1, away_score: 0 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        leagues.simulate_week(league_id).await.unwrap();
        leagues.simulate_week(league_id).await.unwrap();

        let err = matches
            .edit_result(unplayed.id, EditMatchRequest { home_score: -1, away_score: 0 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let edited = matches
            .edit_result(unplayed.id, EditMatchRequest { home_score: 5, away_score: 0 })
            .await
            .unwrap();
        assert_eq!((edited.home_score, edited.away_score), (5, 0));
        assert!(edited.played);

        let league = leagues.get_league(league_id).await.unwrap();
        let folded = Standings::from_matches(&league.teams, &league.matches, league.current_week);
        assert_eq!(league.standings, folded);

        let home = league.standings.get(edited.home_team_id).unwrap();
        assert!(home.wins >= 1);
        assert!(home.goals_for >= 5);
    }

    #[tokio::test]
    async fn test_create_and_delete() {
        let (leagues, matches, league_id) = services().await;
        let league = leagues.get_league(league_id).await.unwrap();
        let (home, away) = (league.teams[0].id, league.teams[1].id);

        let extra = matches
            .create(CreateMatchRequest {
                league_id,
                home_team_id: home,
                away_team_id: away,
                week: 3,
            })
            .await
            .unwrap();
        assert!(!extra.played);
        assert_eq!(matches.list(Some(3)).await.unwrap().len(), 3);

        let err = matches
            .create(CreateMatchRequest {
                league_id,
                home_team_id: home,
                away_team_id: home,
                week: 3,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = matches
            .create(CreateMatchRequest {
                league_id,
                home_team_id: home,
                away_team_id: 999,
                week: 2,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = matches
            .create(CreateMatchRequest {
                league_id,
                home_team_id: home,
                away_team_id: away,
                week: 4,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        matches.delete(extra.id).await.unwrap();
        assert_eq!(matches.list(Some(3)).await.unwrap().len(), 2);

        leagues.simulate_week(league_id).await.unwrap();
        let played = matches.list(Some(1)).await.unwrap()[0].clone();
        let err = matches.delete(played.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        let err = matches
            .create(CreateMatchRequest {
                league_id,
                home_team_id: home,
                away_team_id: away,
                week: 1,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[tokio::test]
    async fn test_delete_racing_simulation_keeps_standings_consistent() {
        let (leagues, matches, league_id) = services_on(db::shared_test_pool().await).await;
        let target = matches.list(Some(1)).await.unwrap()[0].clone();

        let (deleted, simulated) =
            tokio::join!(matches.delete(target.id), leagues.simulate_week(league_id));
        simulated.unwrap();

        let league = leagues.get_league(league_id).await.unwrap();
        let remaining = league.matches.iter().find(|m| m.id == target.id);
        match deleted {
            Ok(()) => assert!(remaining.is_none()),
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::Precondition);
                assert!(remaining.unwrap().played);
            }
        }

        let folded = Standings::from_matches(&league.teams, &league.matches, league.current_week);
        assert_eq!(league.standings, folded);
        let played: i32 = league.standings.teams.iter().map(|s| s.played).sum();
        assert_eq!(played as usize, 2 * league.matches.iter().filter(|m| m.played).count());
    }
}
