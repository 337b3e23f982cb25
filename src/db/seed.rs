use sqlx::{Result, SqlitePool};

use crate::models::{Team, TeamRequest};

/// (name, strength) of the roster created on first start.
pub const DEFAULT_TEAMS: [(&str, i32); 4] = [
    ("Manchester United", 85),
    ("Liverpool", 88),
    ("Chelsea", 82),
    ("Arsenal", 80),
];

/// Insert the default teams when the teams table is empty. Returns the teams
/// present afterwards either way.
pub async fn seed_initial_teams(pool: &SqlitePool) -> Result<Vec<Team>> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        tracing::info!("Database already seeded ({} teams found), skipping.", count);
        return super::get_all_teams(pool).await;
    }

    tracing::info!("Seeding database with the default teams...");

    let mut tx = pool.begin().await?;
    let mut teams = Vec::with_capacity(DEFAULT_TEAMS.len());
    for (name, strength) in DEFAULT_TEAMS {
        let request = TeamRequest {
            name: name.to_string(),
            strength,
        };
        teams.push(super::insert_team(&mut *tx, &request).await?);
    }
    tx.commit().await?;

    tracing::info!("Database seeded successfully: {} teams", teams.len());
    Ok(teams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_seeds_once() {
        let pool = test_pool().await;

        let first = seed_initial_teams(&pool).await.unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(first[1].name, "Liverpool");
        assert_eq!(first[1].strength, 88);

        let second = seed_initial_teams(&pool).await.unwrap();
        assert_eq!(second, first);
    }
}
