use rand::Rng;

use crate::error::{LeagueError, LeagueResult};
use crate::models::{League, LeagueSimulationResult, MatchResult, WeeklyResult};
use crate::services::match_simulator::play_match;

/// Advance `league` by one week: every unplayed fixture of the next week is
/// simulated against the current roster and folded into the standings.
///
/// Fails without touching the league when every week has been played or a
/// fixture refers to a team outside the roster.
pub fn simulate_week<R: Rng + ?Sized>(league: &mut League, rng: &mut R) -> LeagueResult<WeeklyResult> {
    if league.is_finished() {
        return Err(LeagueError::precondition("all weeks have been played"));
    }

    let week = league.current_week + 1;
    let League {
        teams,
        matches,
        standings,
        ..
    } = league;

    let mut pending = Vec::new();
    for (index, fixture) in matches.iter().enumerate() {
        if fixture.week != week || fixture.played {
            continue;
        }
        let home = teams.iter().position(|t| t.id == fixture.home_team_id);
        let away = teams.iter().position(|t| t.id == fixture.away_team_id);
        match (home, away) {
            (Some(home), Some(away)) => pending.push((index, home, away)),
            _ => {
                return Err(LeagueError::not_found(format!(
                    "team for match {} in the league roster",
                    fixture.id
                )))
            }
        }
    }

    let standings_before = standings.clone();
    let mut results = Vec::with_capacity(pending.len());

    for (index, home, away) in pending {
        let (home_team, away_team) = (&teams[home], &teams[away]);
        let fixture = &mut matches[index];
        play_match(rng, fixture, home_team, away_team);
        standings.apply_match(fixture);

        results.push(MatchResult {
            match_id: fixture.id,
            home_team: home_team.name.clone(),
            away_team: away_team.name.clone(),
            home_score: fixture.home_score,
            away_score: fixture.away_score,
            result: fixture.outcome(),
            played_at: fixture.played_at.unwrap_or_else(chrono::Utc::now),
        });
    }

    standings.week = week;
    standings.sort_by_rank();
    league.current_week = week;

    tracing::info!(
        "League {} week {}/{} simulated ({} matches)",
        league.id,
        week,
        league.total_weeks,
        results.len()
    );

    Ok(WeeklyResult {
        week,
        matches: results,
        standings_before,
        standings_after: league.standings.clone(),
    })
}

/// Run `simulate_week` until the season is complete, keeping a per-week log.
pub fn simulate_remaining<R: Rng + ?Sized>(
    league: &mut League,
    rng: &mut R,
) -> LeagueResult<LeagueSimulationResult> {
    if league.is_finished() {
        return Err(LeagueError::precondition("all weeks have been played"));
    }

    let starting_week = league.current_week;
    let mut weekly_results = Vec::with_capacity((league.total_weeks - starting_week) as usize);
    while !league.is_finished() {
        weekly_results.push(simulate_week(league, rng)?);
    }

    Ok(LeagueSimulationResult {
        league_id: league.id,
        starting_week,
        ending_week: league.current_week,
        weekly_results,
        final_standings: league.standings.clone(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Match, MatchOutcome, Standings, Team};
    use crate::services::schedule::{generate_schedule, total_weeks};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// In-memory league with the given (name, strength) roster, ids from 1.
    pub(crate) fn league_with(roster: &[(&str, i32)]) -> League {
        let teams: Vec<Team> = roster
            .iter()
            .enumerate()
            .map(|(i, (name, strength))| Team {
                id: i as i64 + 1,
                name: name.to_string(),
                strength: *strength,
            })
            .collect();
        let matches = generate_schedule(&teams)
            .unwrap()
            .into_iter()
            .enumerate()
            .map(|(i, fixture)| Match::from_fixture(i as i64 + 1, 1, fixture))
            .collect();
        League {
            id: 1,
            name: "Test League".into(),
            standings: Standings::empty(&teams),
            total_weeks: total_weeks(teams.len()),
            current_week: 0,
            teams,
            matches,
        }
    }

    pub(crate) fn four_team_league() -> League {
        league_with(&[("A", 85), ("B", 88), ("C", 82), ("D", 80)])
    }

    #[test]
    fn test_simulate_week_plays_only_that_week() {
        let mut league = four_team_league();
        let mut rng = StdRng::seed_from_u64(1);

        let weekly = simulate_week(&mut league, &mut rng).unwrap();
        assert_eq!(weekly.week, 1);
        assert_eq!(league.current_week, 1);
        assert_eq!(league.standings.week, 1);
        assert_eq!(weekly.matches.len(), 2);

        for m in &league.matches {
            assert_eq!(m.played, m.week == 1);
        }
        assert!(weekly.standings_before.teams.iter().all(|s| s.played == 0));
        assert!(weekly.standings_after.teams.iter().all(|s| s.played == 1));
        assert!(weekly.matches.iter().all(|r| r.result != MatchOutcome::NotPlayed));
    }

    #[test]
    fn test_cannot_simulate_past_final_week() {
        let mut league = four_team_league();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..3 {
            simulate_week(&mut league, &mut rng).unwrap();
        }
        let snapshot = league.matches.clone();

        let err = simulate_week(&mut league, &mut rng).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(err.to_string(), "all weeks have been played");
        assert_eq!(league.current_week, 3);
        assert_eq!(league.matches, snapshot);
    }

    #[test]
    fn test_already_played_fixtures_are_not_replayed() {
        let mut league = four_team_league();
        let mut rng = StdRng::seed_from_u64(3);
        let first = league.matches.iter().position(|m| m.week == 1).unwrap();
        league.matches[first].record_result(4, 4, chrono::Utc::now());

        let weekly = simulate_week(&mut league, &mut rng).unwrap();
        assert_eq!(weekly.matches.len(), 1);
        assert_eq!(league.matches[first].home_score, 4);
    }

    #[test]
    fn test_unknown_team_fails_without_mutation() {
        let mut league = four_team_league();
        let week_one = league.matches.iter().position(|m| m.week == 1).unwrap();
        league.matches[week_one].away_team_id = 99;
        let mut rng = StdRng::seed_from_u64(4);

        let err = simulate_week(&mut league, &mut rng).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(league.current_week, 0);
        assert!(league.matches.iter().all(|m| !m.played));
    }

    #[test]
    fn test_simulate_remaining_end_to_end() {
        let mut league = four_team_league();
        let mut rng = StdRng::seed_from_u64(5);

        let result = simulate_remaining(&mut league, &mut rng).unwrap();
        assert_eq!(result.starting_week, 0);
        assert_eq!(result.ending_week, 3);
        assert_eq!(result.weekly_results.len(), 3);
        assert_eq!(league.current_week, league.total_weeks);
        assert!(league.matches.iter().all(|m| m.played));

        let standings = &result.final_standings;
        assert!(standings.teams.iter().all(|s| s.played == 3));

        // each decisive match is worth 3 points in total, each draw 2
        let expected_points: i32 = league
            .matches
            .iter()
            .map(|m| if m.home_score == m.away_score { 2 } else { 3 })
            .sum();
        let total_points: i32 = standings.teams.iter().map(|s| s.points).sum();
        assert_eq!(total_points, expected_points);

        for pair in standings.teams.windows(2) {
            assert_ne!(
                crate::services::standings::rank_order(&pair[0], &pair[1]),
                std::cmp::Ordering::Greater
            );
            assert_ne!(pair[0].team_name, pair[1].team_name);
        }

        // before/after snapshots are independent copies
        for (i, weekly) in result.weekly_results.iter().enumerate() {
            let expected = i as i32;
            assert!(weekly.standings_before.teams.iter().all(|s| s.played == expected));
            assert!(weekly.standings_after.teams.iter().all(|s| s.played == expected + 1));
        }

        let err = simulate_remaining(&mut league, &mut rng).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn test_odd_roster_runs_to_completion() {
        let mut league = league_with(&[("A", 60), ("B", 70), ("C", 80)]);
        let mut rng = StdRng::seed_from_u64(6);
        let result = simulate_remaining(&mut league, &mut rng).unwrap();
        assert_eq!(result.ending_week, 3);
        assert!(result.final_standings.teams.iter().all(|s| s.played == 2));
    }
}
