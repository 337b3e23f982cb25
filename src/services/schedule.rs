use crate::error::{LeagueError, LeagueResult};
use crate::models::{Fixture, Team};

/// Number of slots in the rotation: odd rosters get a virtual bye slot.
fn slot_count(team_count: usize) -> usize {
    if team_count % 2 == 0 {
        team_count
    } else {
        team_count + 1
    }
}

/// Weeks needed for a single round-robin over `team_count` teams.
pub fn total_weeks(team_count: usize) -> i32 {
    if team_count < 2 {
        return 0;
    }
    (slot_count(team_count) - 1) as i32
}

/// Round-robin circle schedule.
///
/// The last slot is the fixed anchor; every other slot rotates one step per
/// week. In week `w` the anchor meets slot `w mod (n-1)` and slot `w+i` meets
/// slot `w-i`. When the roster is odd the anchor is the bye slot, so its
/// pairing is dropped and that week's partner rests.
///
/// Output is ordered by week, then by pairing index, and depends only on the
/// roster order.
pub fn generate_schedule(teams: &[Team]) -> LeagueResult<Vec<Fixture>> {
    if teams.len() < 2 {
        return Err(LeagueError::precondition(
            "league must have at least 2 teams",
        ));
    }
    for (i, team) in teams.iter().enumerate() {
        if teams[..i].iter().any(|other| other.id == team.id) {
            return Err(LeagueError::validation(format!(
                "team {} appears more than once in the roster",
                team.id
            )));
        }
    }

    let slots = slot_count(teams.len());
    let rotating = slots - 1;
    let weeks = total_weeks(teams.len());
    let mut fixtures = Vec::with_capacity(weeks as usize * slots / 2);

    for week in 1..=weeks {
        let w = week as usize;
        for i in 0..slots / 2 {
            let home = (w + i) % rotating;
            let away = if i == 0 {
                slots - 1
            } else {
                (rotating - i + w) % rotating
            };

            // one side is the bye slot
            if home >= teams.len() || away >= teams.len() {
                continue;
            }

            fixtures.push(Fixture::new(teams[home].id, teams[away].id, week)?);
        }
    }

    tracing::debug!(
        "Generated {} fixtures over {} weeks for {} teams",
        fixtures.len(),
        weeks,
        teams.len()
    );

    Ok(fixtures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::{HashMap, HashSet};

    fn roster(size: usize) -> Vec<Team> {
        (1..=size as i64)
            .map(|id| Team {
                id,
                name: format!("Team {}", id),
                strength: 50,
            })
            .collect()
    }

    fn pair(f: &Fixture) -> (i64, i64) {
        (
            f.home_team_id.min(f.away_team_id),
            f.home_team_id.max(f.away_team_id),
        )
    }

    #[test]
    fn test_rejects_fewer_than_two_teams() {
        assert_eq!(
            generate_schedule(&[]).unwrap_err().kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            generate_schedule(&roster(1)).unwrap_err().kind(),
            ErrorKind::Precondition
        );
    }

    #[test]
    fn test_rejects_duplicate_roster_entries() {
        let mut teams = roster(3);
        teams[2].id = 1;
        assert_eq!(
            generate_schedule(&teams).unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_four_team_schedule() {
        let fixtures = generate_schedule(&roster(4)).unwrap();
        assert_eq!(total_weeks(4), 3);
        assert_eq!(fixtures.len(), 6);

        let weeks: Vec<i32> = fixtures.iter().map(|f| f.week).collect();
        assert_eq!(weeks, vec![1, 1, 2, 2, 3, 3]);

        let pairs: HashSet<(i64, i64)> = fixtures.iter().map(pair).collect();
        assert_eq!(pairs.len(), 6);
    }

    #[test]
    fn test_even_rosters_play_everyone_once() {
        for size in (2..=20).step_by(2) {
            let teams = roster(size);
            let fixtures = generate_schedule(&teams).unwrap();
            assert_eq!(total_weeks(size), size as i32 - 1);
            assert_eq!(fixtures.len(), size * (size - 1) / 2);

            for week in 1..=total_weeks(size) {
                let mut seen = HashSet::new();
                for f in fixtures.iter().filter(|f| f.week == week) {
                    assert_ne!(f.home_team_id, f.away_team_id);
                    assert!(seen.insert(f.home_team_id), "size {} week {}", size, week);
                    assert!(seen.insert(f.away_team_id), "size {} week {}", size, week);
                }
                assert_eq!(seen.len(), size);
            }

            let pairs: HashSet<(i64, i64)> = fixtures.iter().map(pair).collect();
            assert_eq!(pairs.len(), fixtures.len(), "duplicate pairing for size {}", size);
        }
    }

    #[test]
    fn test_odd_rosters_give_each_team_one_bye() {
        for size in (3..=19).step_by(2) {
            let teams = roster(size);
            let fixtures = generate_schedule(&teams).unwrap();
            let weeks = total_weeks(size);
            assert_eq!(weeks, size as i32);
            assert_eq!(fixtures.len(), size * (size - 1) / 2);

            let mut byes: HashMap<i64, usize> = HashMap::new();
            for week in 1..=weeks {
                let playing: HashSet<i64> = fixtures
                    .iter()
                    .filter(|f| f.week == week)
                    .flat_map(|f| [f.home_team_id, f.away_team_id])
                    .collect();
                assert_eq!(playing.len(), size - 1);
                for team in &teams {
                    if !playing.contains(&team.id) {
                        *byes.entry(team.id).or_default() += 1;
                    }
                }
            }
            assert_eq!(byes.len(), size);
            assert!(byes.values().all(|&count| count == 1));

            let pairs: HashSet<(i64, i64)> = fixtures.iter().map(pair).collect();
            assert_eq!(pairs.len(), fixtures.len());
        }
    }

    #[test]
    fn test_schedule_is_deterministic() {
        let teams = roster(6);
        assert_eq!(
            generate_schedule(&teams).unwrap(),
            generate_schedule(&teams).unwrap()
        );
    }
}
