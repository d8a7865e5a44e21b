use std::collections::HashSet;

use crate::db::models::MatchSnapshot;

/// Narrows a raw match list to the matches worth watching.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    /// Team names of interest; empty means every team in the competition
    teams: HashSet<String>,
}

impl Classifier {
    pub fn new<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Classifier {
            teams: teams
                .into_iter()
                .map(Into::into)
                .map(|t: String| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn is_relevant(&self, m: &MatchSnapshot) -> bool {
        (self.teams.is_empty() || m.involves_any(&self.teams)) && m.status.is_monitorable()
    }

    /// Keep relevant matches in provider order; everything else is dropped silently.
    pub fn classify(&self, matches: Vec<MatchSnapshot>) -> Vec<MatchSnapshot> {
        matches.into_iter().filter(|m| self.is_relevant(m)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::fixtures::snapshot;
    use crate::db::models::{MatchStatus, Score};

    fn fixture(id: u64, home: &str, away: &str, status: MatchStatus) -> MatchSnapshot {
        let mut m = snapshot(id, status, Score::Tbd, Score::Tbd);
        m.home_team = home.into();
        m.away_team = away.into();
        m
    }

    #[test]
    fn test_keeps_matches_involving_teams_in_order() {
        let c = Classifier::new(["Arsenal FC", "Everton FC"]);
        let raw = vec![
            fixture(1, "Everton FC", "Fulham FC", MatchStatus::Timed),
            fixture(2, "Chelsea FC", "Fulham FC", MatchStatus::Timed),
            fixture(3, "Brentford FC", "Arsenal FC", MatchStatus::InPlay),
        ];
        let ids: Vec<u64> = c.classify(raw).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_drops_unmonitorable_status() {
        let c = Classifier::new(["Arsenal FC"]);
        let raw = vec![
            fixture(1, "Arsenal FC", "Fulham FC", MatchStatus::Postponed),
            fixture(2, "Arsenal FC", "Fulham FC", MatchStatus::Cancelled),
            fixture(3, "Arsenal FC", "Fulham FC", MatchStatus::Finished),
        ];
        let ids: Vec<u64> = c.classify(raw).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_empty_team_set_accepts_every_team() {
        let c = Classifier::new(Vec::<String>::new());
        let raw = vec![
            fixture(1, "Everton FC", "Fulham FC", MatchStatus::Scheduled),
            fixture(2, "Chelsea FC", "Fulham FC", MatchStatus::Suspended),
        ];
        let ids: Vec<u64> = c.classify(raw).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_blank_team_names_are_ignored() {
        let c = Classifier::new([" ", ""]);
        assert!(c.is_relevant(&fixture(1, "Everton FC", "Fulham FC", MatchStatus::Timed)));
    }
}
