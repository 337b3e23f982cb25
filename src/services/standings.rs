use std::cmp::Ordering;

use crate::models::{Match, Standings, Team, TeamStanding};

impl TeamStanding {
    /// Fold one result for this team. Points: 3 win, 1 draw, 0 loss.
    fn record(&mut self, goals_for: i32, goals_against: i32) {
        self.played += 1;
        self.goals_for += goals_for;
        self.goals_against += goals_against;
        self.goal_difference = self.goals_for - self.goals_against;

        match goals_for.cmp(&goals_against) {
            Ordering::Greater => {
                self.wins += 1;
                self.points += 3;
            }
            Ordering::Equal => {
                self.draws += 1;
                self.points += 1;
            }
            Ordering::Less => self.losses += 1,
        }
    }
}

/// Table order: points, goal difference, goals for (all descending), then name.
pub fn rank_order(a: &TeamStanding, b: &TeamStanding) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.goal_difference.cmp(&a.goal_difference))
        .then_with(|| b.goals_for.cmp(&a.goals_for))
        .then_with(|| a.team_name.cmp(&b.team_name))
        .then_with(|| a.team_id.cmp(&b.team_id))
}

impl Standings {
    /// Apply one played match to both teams' rows. Unplayed matches are ignored.
    ///
    /// Not idempotent: callers apply each match at most once per standings lineage.
    pub fn apply_match(&mut self, match_data: &Match) {
        if !match_data.played {
            return;
        }

        if let Some(home) = self
            .teams
            .iter_mut()
            .find(|s| s.team_id == match_data.home_team_id)
        {
            home.record(match_data.home_score, match_data.away_score);
        }
        if let Some(away) = self
            .teams
            .iter_mut()
            .find(|s| s.team_id == match_data.away_team_id)
        {
            away.record(match_data.away_score, match_data.home_score);
        }
    }

    pub fn sort_by_rank(&mut self) {
        self.teams.sort_by(rank_order);
    }

    pub fn sorted(&self) -> Standings {
        let mut copy = self.clone();
        copy.sort_by_rank();
        copy
    }

    /// Rebuild a table from scratch by folding every played match up to `week`.
    pub fn from_matches(teams: &[Team], matches: &[Match], week: i32) -> Standings {
        let mut standings = Standings::empty(teams);
        standings.week = week;
        for match_data in matches.iter().filter(|m| m.played && m.week <= week) {
            standings.apply_match(match_data);
        }
        standings.sort_by_rank();
        standings
    }
}
