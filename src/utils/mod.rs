use crate::models::{Match, MatchOutcome};

/// Validate team name format
pub fn validate_team_name(name: &str) -> bool {
    !name.trim().is_empty() && name.chars().count() <= 100
}

/// Share of available points collected, as a percentage (3 per win, 1 per draw)
pub fn calculate_points_percentage(wins: i32, draws: i32, losses: i32) -> f64 {
    let total_games = wins + draws + losses;
    if total_games <= 0 {
        return 0.0;
    }

    let points = wins * 3 + draws;
    (points as f64) / ((total_games * 3) as f64) * 100.0
}

/// Last five results for a team as a form string (e.g., "WDLWW"), most recent first
pub fn team_form(matches: &[Match], team_id: i64) -> String {
    let mut played: Vec<&Match> = matches
        .iter()
        .filter(|m| m.played && m.involves(team_id))
        .collect();
    played.sort_by(|a, b| b.week.cmp(&a.week).then(b.id.cmp(&a.id)));

    played
        .iter()
        .take(5)
        .map(|m| {
            let outcome = m.outcome();
            let from_team_side = if m.home_team_id == team_id {
                outcome
            } else {
                match outcome {
                    MatchOutcome::Win => MatchOutcome::Loss,
                    MatchOutcome::Loss => MatchOutcome::Win,
                    other => other,
                }
            };
            match from_team_side {
                MatchOutcome::Win => 'W',
                MatchOutcome::Draw => 'D',
                MatchOutcome::Loss => 'L',
                MatchOutcome::NotPlayed => '-',
            }
        })
        .collect()
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn played(id: i64, week: i32, home: i64, away: i64, hs: i32, as_: i32) -> Match {
        let mut m = Match {
            id,
            league_id: 1,
            home_team_id: home,
            away_team_id: away,
            week,
            played: false,
            home_score: 0,
            away_score: 0,
            played_at: None,
        };
        m.record_result(hs, as_, Utc::now());
        m
    }

    #[test]
    fn test_validate_team_name() {
        assert!(validate_team_name("Liverpool"));
        assert!(!validate_team_name(""));
        assert!(!validate_team_name("  "));
        assert!(!validate_team_name(&"a".repeat(101)));
    }

    #[test]
    fn test_calculate_points_percentage() {
        assert!((calculate_points_percentage(3, 1, 1) - 66.667).abs() < 0.01);
        assert_eq!(calculate_points_percentage(0, 0, 0), 0.0);
        assert_eq!(calculate_points_percentage(2, 0, 0), 100.0);
    }

    #[test]
    fn test_team_form_reads_from_team_perspective() {
        let matches = vec![
            played(1, 1, 1, 2, 2, 0), // team 1 home win
            played(2, 2, 3, 1, 1, 1), // draw
            played(3, 3, 4, 1, 3, 0), // team 1 away loss
        ];
        assert_eq!(team_form(&matches, 1), "LDW");
        assert_eq!(team_form(&matches, 2), "L");
        assert_eq!(team_form(&matches, 9), "");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(40.0), "40.0%");
        assert_eq!(format_percentage(33.333), "33.3%");
    }
}
