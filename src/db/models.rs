use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Match status as reported by the football data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Scheduled,
    Timed,
    InPlay,
    Paused,
    Live,
    Finished,
    Postponed,
    Suspended,
    Cancelled,
    Awarded,
}

impl MatchStatus {
    /// Not yet kicked off.
    pub fn is_pre_kickoff(self) -> bool {
        matches!(self, MatchStatus::Scheduled | MatchStatus::Timed)
    }

    /// Ball in play (half time counts).
    pub fn is_in_play(self) -> bool {
        matches!(
            self,
            MatchStatus::InPlay | MatchStatus::Paused | MatchStatus::Live
        )
    }

    /// Still needs polling: either waiting for kick-off or being played.
    pub fn is_in_progress(self) -> bool {
        self.is_pre_kickoff() || self.is_in_play()
    }

    /// Worth keeping in a batch. Finished stays in so the full-time
    /// transition can be observed on the poll that sees it.
    pub fn is_monitorable(self) -> bool {
        self.is_in_progress() || self == MatchStatus::Finished
    }

    pub fn is_terminal(self) -> bool {
        !self.is_in_progress()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "SCHEDULED",
            MatchStatus::Timed => "TIMED",
            MatchStatus::InPlay => "IN_PLAY",
            MatchStatus::Paused => "PAUSED",
            MatchStatus::Live => "LIVE",
            MatchStatus::Finished => "FINISHED",
            MatchStatus::Postponed => "POSTPONED",
            MatchStatus::Suspended => "SUSPENDED",
            MatchStatus::Cancelled => "CANCELLED",
            MatchStatus::Awarded => "AWARDED",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side's score. `Tbd` is only legal before kick-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Tbd,
    Goals(u32),
}

impl From<Option<u32>> for Score {
    fn from(v: Option<u32>) -> Self {
        v.map(Score::Goals).unwrap_or(Score::Tbd)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Tbd => f.write_str("TBD"),
            Score::Goals(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Score::Tbd => serializer.serialize_str("TBD"),
            Score::Goals(n) => serializer.serialize_u32(*n),
        }
    }
}

/// A single goal from the provider's goal-event list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Goal {
    /// Name of the team credited with the goal
    pub team: String,
    pub minute: Option<u32>,
    pub scorer: Option<String>,
}

/// Full observed state of one match from a single fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSnapshot {
    /// Provider match ID, stable across polls
    pub id: u64,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
    pub competition: String,
    pub stage: Option<String>,
    pub group: Option<String>,
    pub status: MatchStatus,
    pub attendance: Option<u32>,
    pub home_score: Score,
    pub away_score: Score,
    /// Present only when the provider sent a goal-event list
    pub goals: Option<Vec<Goal>>,
}

impl MatchSnapshot {
    /// Total goals for change detection. `Tbd` counts as nil only before
    /// kick-off; afterwards the total is unknown, as is a total that does
    /// not fit in a `u32`.
    pub fn goal_total(&self) -> Option<u32> {
        let side = |s: Score| match s {
            Score::Goals(n) => Some(n),
            Score::Tbd if self.status.is_pre_kickoff() => Some(0),
            Score::Tbd => None,
        };
        side(self.home_score)?.checked_add(side(self.away_score)?)
    }

    pub fn involves_any(&self, teams: &std::collections::HashSet<String>) -> bool {
        teams.contains(&self.home_team) || teams.contains(&self.away_team)
    }
}

/// Transitions detected between two snapshots of the same match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchChangeSet {
    pub kicked_off: bool,
    pub goal_scored: bool,
    pub full_time: bool,
}

impl MatchChangeSet {
    /// The single event worth reporting this cycle:
    /// full time beats kick-off beats goal.
    pub fn headline(&self) -> Option<MatchEvent> {
        if self.full_time {
            Some(MatchEvent::FullTime)
        } else if self.kicked_off {
            Some(MatchEvent::KickOff)
        } else if self.goal_scored {
            Some(MatchEvent::Goal)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.kicked_off || self.goal_scored || self.full_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchEvent {
    KickOff,
    Goal,
    FullTime,
}

impl MatchEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchEvent::KickOff => "kick_off",
            MatchEvent::Goal => "goal",
            MatchEvent::FullTime => "full_time",
        }
    }
}

impl fmt::Display for MatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message derived from one match in one poll cycle, ready for fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub match_id: u64,
    pub event: MatchEvent,
    pub text: String,
}

/// A dispatched notification as stored in the journal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Option<i64>,
    pub match_id: i64,
    /// "kick_off" | "goal" | "full_time"
    pub event: String,
    pub message: String,
    /// Recipients the message reached
    pub delivered: i64,
    /// Recipients whose send failed
    pub failed: i64,
    pub sent_at: DateTime<Utc>,
}

/// Snapshot builders shared by tests across the crate.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn snapshot(
        id: u64,
        status: MatchStatus,
        home: Score,
        away: Score,
    ) -> MatchSnapshot {
        MatchSnapshot {
            id,
            home_team: "Arsenal FC".into(),
            away_team: "Chelsea FC".into(),
            kickoff: Utc.with_ymd_and_hms(2024, 3, 2, 15, 0, 0).unwrap(),
            competition: "Premier League".into(),
            stage: Some("REGULAR_SEASON".into()),
            group: None,
            status,
            attendance: None,
            home_score: home,
            away_score: away,
            goals: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::snapshot as fixture;
    use super::*;

    fn snapshot(status: MatchStatus, home: Score, away: Score) -> MatchSnapshot {
        fixture(1, status, home, away)
    }

    #[test]
    fn test_status_groups() {
        assert!(MatchStatus::Timed.is_pre_kickoff());
        assert!(MatchStatus::Paused.is_in_play());
        assert!(MatchStatus::Scheduled.is_in_progress());
        assert!(MatchStatus::Finished.is_monitorable());
        assert!(MatchStatus::Finished.is_terminal());
        assert!(!MatchStatus::Postponed.is_monitorable());
        assert!(MatchStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_goal_total_tbd_before_kickoff_is_nil() {
        let s = snapshot(MatchStatus::Timed, Score::Tbd, Score::Tbd);
        assert_eq!(s.goal_total(), Some(0));
    }

    #[test]
    fn test_goal_total_tbd_after_kickoff_is_unknown() {
        let s = snapshot(MatchStatus::InPlay, Score::Goals(1), Score::Tbd);
        assert_eq!(s.goal_total(), None);
    }

    #[test]
    fn test_goal_total_overflow_is_unknown() {
        let s = snapshot(MatchStatus::InPlay, Score::Goals(u32::MAX), Score::Goals(1));
        assert_eq!(s.goal_total(), None);
        let s = snapshot(MatchStatus::InPlay, Score::Goals(u32::MAX), Score::Goals(0));
        assert_eq!(s.goal_total(), Some(u32::MAX));
    }

    #[test]
    fn test_headline_priority() {
        let all = MatchChangeSet {
            kicked_off: true,
            goal_scored: true,
            full_time: true,
        };
        assert_eq!(all.headline(), Some(MatchEvent::FullTime));

        let kick_and_goal = MatchChangeSet {
            kicked_off: true,
            goal_scored: true,
            full_time: false,
        };
        assert_eq!(kick_and_goal.headline(), Some(MatchEvent::KickOff));
        assert_eq!(MatchChangeSet::default().headline(), None);
    }

    #[test]
    fn test_score_serializes_tbd_as_string() {
        let s = snapshot(MatchStatus::Scheduled, Score::Tbd, Score::Goals(2));
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["home_score"], "TBD");
        assert_eq!(v["away_score"], 2);
        assert_eq!(v["status"], "SCHEDULED");
    }
}
