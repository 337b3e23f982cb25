pub mod seed;
pub use seed::seed_initial_teams;

use anyhow::Result;
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, Executor, Sqlite, SqliteConnection, SqlitePool};
use std::str::FromStr;

use crate::models::*;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if let Some(parent) = std::path::Path::new(file_path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database(database_url: &str) -> Result<()> {
    let pool = create_pool(database_url).await?;
    init_database_with_pool(&pool).await
}

/// Called from the server so schema creation shares the main pool.
pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            strength INTEGER NOT NULL CHECK (strength BETWEEN 1 AND 100),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leagues (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            current_week INTEGER NOT NULL DEFAULT 0,
            total_weeks INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            CHECK (current_week BETWEEN 0 AND total_weeks)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Ordered roster per league
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS league_teams (
            league_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (league_id, team_id),
            FOREIGN KEY (league_id) REFERENCES leagues (id),
            FOREIGN KEY (team_id) REFERENCES teams (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            league_id INTEGER NOT NULL,
            home_team_id INTEGER NOT NULL,
            away_team_id INTEGER NOT NULL,
            week INTEGER NOT NULL CHECK (week >= 1),
            played BOOLEAN NOT NULL DEFAULT 0,
            home_score INTEGER NOT NULL DEFAULT 0,
            away_score INTEGER NOT NULL DEFAULT 0,
            played_at TEXT,
            CHECK (home_team_id <> away_team_id),
            FOREIGN KEY (league_id) REFERENCES leagues (id),
            FOREIGN KEY (home_team_id) REFERENCES teams (id),
            FOREIGN KEY (away_team_id) REFERENCES teams (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS standings_history (
            league_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            week INTEGER NOT NULL,
            points INTEGER NOT NULL DEFAULT 0,
            played INTEGER NOT NULL DEFAULT 0,
            wins INTEGER NOT NULL DEFAULT 0,
            draws INTEGER NOT NULL DEFAULT 0,
            losses INTEGER NOT NULL DEFAULT 0,
            goals_for INTEGER NOT NULL DEFAULT 0,
            goals_against INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (league_id, team_id, week),
            FOREIGN KEY (league_id) REFERENCES leagues (id),
            FOREIGN KEY (team_id) REFERENCES teams (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_league_week ON matches(league_id, week)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_week ON matches(week)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    // one connection: every handle must see the same in-memory database
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    init_database_with_pool(&pool).await.expect("schema");
    pool
}

/// File-backed database with several connections, so concurrent
/// transactions really overlap. Each call gets a fresh file.
#[cfg(test)]
pub async fn shared_test_pool() -> SqlitePool {
    use sqlx::sqlite::{SqliteJournalMode, SqlitePoolOptions};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_DB: AtomicUsize = AtomicUsize::new(0);
    let path = std::env::temp_dir().join(format!(
        "league-simulator-test-{}-{}.db",
        std::process::id(),
        NEXT_DB.fetch_add(1, Ordering::Relaxed)
    ));
    for suffix in ["", "-wal", "-shm"] {
        let mut stale = path.clone().into_os_string();
        stale.push(suffix);
        std::fs::remove_file(stale).ok();
    }

    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .expect("file-backed sqlite");
    init_database_with_pool(&pool).await.expect("schema");
    pool
}

// Team operations

pub async fn insert_team<'e, E>(executor: E, request: &TeamRequest) -> sqlx::Result<Team>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    let id = sqlx::query(
        "INSERT INTO teams (name, strength, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(request.name.trim())
    .bind(request.strength)
    .bind(&now)
    .bind(&now)
    .execute(executor)
    .await?
    .last_insert_rowid();

    Ok(Team {
        id,
        name: request.name.trim().to_string(),
        strength: request.strength,
    })
}

pub async fn get_team_by_id<'e, E>(executor: E, team_id: i64) -> sqlx::Result<Option<Team>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Team>("SELECT id, name, strength FROM teams WHERE id = ?")
        .bind(team_id)
        .fetch_optional(executor)
        .await
}

pub async fn get_all_teams<'e, E>(executor: E) -> sqlx::Result<Vec<Team>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Team>("SELECT id, name, strength FROM teams ORDER BY id")
        .fetch_all(executor)
        .await
}

/// Returns false when no team has that id.
pub async fn update_team<'e, E>(executor: E, team: &Team) -> sqlx::Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE teams SET name = ?, strength = ?, updated_at = ? WHERE id = ?")
        .bind(team.name.trim())
        .bind(team.strength)
        .bind(Utc::now().to_rfc3339())
        .bind(team.id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_team<'e, E>(executor: E, team_id: i64) -> sqlx::Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM teams WHERE id = ?")
        .bind(team_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn team_in_any_league<'e, E>(executor: E, team_id: i64) -> sqlx::Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM league_teams WHERE team_id = ?")
        .bind(team_id)
        .fetch_one(executor)
        .await?;
    Ok(count > 0)
}

// Match operations

const MATCH_COLUMNS: &str =
    "id, league_id, home_team_id, away_team_id, week, played, home_score, away_score, played_at";

pub async fn insert_match<'e, E>(executor: E, league_id: i64, fixture: &Fixture) -> sqlx::Result<Match>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = sqlx::query(
        "INSERT INTO matches (league_id, home_team_id, away_team_id, week, played) VALUES (?, ?, ?, ?, 0)",
    )
    .bind(league_id)
    .bind(fixture.home_team_id)
    .bind(fixture.away_team_id)
    .bind(fixture.week)
    .execute(executor)
    .await?
    .last_insert_rowid();

    Ok(Match::from_fixture(id, league_id, *fixture))
}

pub async fn get_match_by_id<'e, E>(executor: E, match_id: i64) -> sqlx::Result<Option<Match>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Match>(&format!("SELECT {} FROM matches WHERE id = ?", MATCH_COLUMNS))
        .bind(match_id)
        .fetch_optional(executor)
        .await
}

pub async fn get_all_matches<'e, E>(executor: E) -> sqlx::Result<Vec<Match>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Match>(&format!(
        "SELECT {} FROM matches ORDER BY league_id, week, id",
        MATCH_COLUMNS
    ))
    .fetch_all(executor)
    .await
}

pub async fn get_matches_by_week<'e, E>(executor: E, week: i32) -> sqlx::Result<Vec<Match>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Match>(&format!(
        "SELECT {} FROM matches WHERE week = ? ORDER BY league_id, id",
        MATCH_COLUMNS
    ))
    .bind(week)
    .fetch_all(executor)
    .await
}

pub async fn get_league_matches<'e, E>(executor: E, league_id: i64) -> sqlx::Result<Vec<Match>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Match>(&format!(
        "SELECT {} FROM matches WHERE league_id = ? ORDER BY week, id",
        MATCH_COLUMNS
    ))
    .bind(league_id)
    .fetch_all(executor)
    .await
}

pub async fn get_league_matches_by_week<'e, E>(
    executor: E,
    league_id: i64,
    week: i32,
) -> sqlx::Result<Vec<Match>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Match>(&format!(
        "SELECT {} FROM matches WHERE league_id = ? AND week = ? ORDER BY id",
        MATCH_COLUMNS
    ))
    .bind(league_id)
    .bind(week)
    .fetch_all(executor)
    .await
}

/// Writes result fields only; pairing and week are fixed at schedule time.
pub async fn update_match_result<'e, E>(executor: E, match_data: &Match) -> sqlx::Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE matches SET played = ?, home_score = ?, away_score = ?, played_at = ? WHERE id = ?",
    )
    .bind(match_data.played)
    .bind(match_data.home_score)
    .bind(match_data.away_score)
    .bind(match_data.played_at)
    .bind(match_data.id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Played matches are part of the standings and are never removed.
pub async fn delete_unplayed_match<'e, E>(executor: E, match_id: i64) -> sqlx::Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM matches WHERE id = ? AND played = 0")
        .bind(match_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

// Standings operations

pub async fn get_standings_at_week<'e, E>(
    executor: E,
    league_id: i64,
    week: i32,
) -> sqlx::Result<Vec<TeamStanding>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, TeamStanding>(
        r#"
        SELECT s.team_id, t.name AS team_name, s.points, s.played, s.wins, s.draws, s.losses,
               s.goals_for, s.goals_against, s.goals_for - s.goals_against AS goal_difference
        FROM standings_history s
        JOIN teams t ON s.team_id = t.id
        WHERE s.league_id = ? AND s.week = ?
        ORDER BY s.points DESC, goal_difference DESC, s.goals_for DESC, t.name, s.team_id
        "#,
    )
    .bind(league_id)
    .bind(week)
    .fetch_all(executor)
    .await
}

/// Latest recorded week for the league; week 0 when nothing was written yet.
pub async fn get_current_standings(conn: &mut SqliteConnection, league_id: i64) -> sqlx::Result<Standings> {
    let week: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(week), 0) FROM standings_history WHERE league_id = ?",
    )
    .bind(league_id)
    .fetch_one(&mut *conn)
    .await?;

    let teams = get_standings_at_week(&mut *conn, league_id, week).await?;
    Ok(Standings { week, teams })
}

pub async fn upsert_standings(
    conn: &mut SqliteConnection,
    league_id: i64,
    standings: &Standings,
) -> sqlx::Result<()> {
    for row in &standings.teams {
        sqlx::query(
            r#"
            INSERT INTO standings_history
                (league_id, team_id, week, points, played, wins, draws, losses, goals_for, goals_against)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (league_id, team_id, week) DO UPDATE SET
                points = excluded.points,
                played = excluded.played,
                wins = excluded.wins,
                draws = excluded.draws,
                losses = excluded.losses,
                goals_for = excluded.goals_for,
                goals_against = excluded.goals_against
            "#,
        )
        .bind(league_id)
        .bind(row.team_id)
        .bind(standings.week)
        .bind(row.points)
        .bind(row.played)
        .bind(row.wins)
        .bind(row.draws)
        .bind(row.losses)
        .bind(row.goals_for)
        .bind(row.goals_against)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

// League operations

/// Insert the league, its roster, its fixtures and the week-0 table.
/// Ids are written back into `league`. Run inside a transaction.
pub async fn insert_league(conn: &mut SqliteConnection, league: &mut League) -> sqlx::Result<()> {
    let league_id = sqlx::query(
        "INSERT INTO leagues (name, current_week, total_weeks, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&league.name)
    .bind(league.current_week)
    .bind(league.total_weeks)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    league.id = league_id;

    for (position, team) in league.teams.iter().enumerate() {
        sqlx::query("INSERT INTO league_teams (league_id, team_id, position) VALUES (?, ?, ?)")
            .bind(league_id)
            .bind(team.id)
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
    }

    for match_data in league.matches.iter_mut() {
        let fixture = Fixture {
            home_team_id: match_data.home_team_id,
            away_team_id: match_data.away_team_id,
            week: match_data.week,
        };
        *match_data = insert_match(&mut *conn, league_id, &fixture).await?;
    }

    upsert_standings(conn, league_id, &league.standings).await
}

pub async fn get_league_record<'e, E>(executor: E, league_id: i64) -> sqlx::Result<Option<LeagueRecord>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, LeagueRecord>(
        "SELECT id, name, current_week, total_weeks FROM leagues WHERE id = ?",
    )
    .bind(league_id)
    .fetch_optional(executor)
    .await
}

pub async fn get_league_roster<'e, E>(executor: E, league_id: i64) -> sqlx::Result<Vec<Team>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Team>(
        r#"
        SELECT t.id, t.name, t.strength
        FROM league_teams lt
        JOIN teams t ON t.id = lt.team_id
        WHERE lt.league_id = ?
        ORDER BY lt.position
        "#,
    )
    .bind(league_id)
    .fetch_all(executor)
    .await
}

/// League with roster, fixtures and the standings at its current week.
pub async fn get_league(conn: &mut SqliteConnection, league_id: i64) -> sqlx::Result<Option<League>> {
    let Some(record) = get_league_record(&mut *conn, league_id).await? else {
        return Ok(None);
    };

    let teams = get_league_roster(&mut *conn, league_id).await?;
    let matches = get_league_matches(&mut *conn, league_id).await?;
    let rows = get_standings_at_week(&mut *conn, league_id, record.current_week).await?;

    let standings = if rows.is_empty() {
        Standings::from_matches(&teams, &matches, record.current_week)
    } else {
        Standings {
            week: record.current_week,
            teams: rows,
        }
    };

    Ok(Some(League {
        id: record.id,
        name: record.name,
        teams,
        matches,
        standings,
        current_week: record.current_week,
        total_weeks: record.total_weeks,
    }))
}

/// Moves the week counter only if it still reads `expected_week`.
pub async fn advance_league_week<'e, E>(
    executor: E,
    league_id: i64,
    expected_week: i32,
    new_week: i32,
) -> sqlx::Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE leagues SET current_week = ? WHERE id = ? AND current_week = ?")
        .bind(new_week)
        .bind(league_id)
        .bind(expected_week)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
