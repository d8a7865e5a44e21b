use crate::db::models::{MatchEvent, MatchSnapshot};

/// Two-line description: fixture details, then the scoreline.
pub fn describe(m: &MatchSnapshot) -> String {
    let details = format!(
        "{} - {} - Stage: {} - Group: {}",
        m.kickoff.format("%a %d %b %Y %H:%M UTC"),
        m.competition,
        m.stage.as_deref().unwrap_or("-"),
        m.group.as_deref().unwrap_or("-"),
    );
    let attendance = m
        .attendance
        .map(|a| a.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let scoreline = format!(
        "{} {} - {} {} - {} - Attendance {}",
        m.home_team, m.home_score, m.away_score, m.away_team, m.status, attendance
    );
    format!("{}\n{}", details, scoreline)
}

pub fn render(event: MatchEvent, m: &MatchSnapshot) -> String {
    let header = match event {
        MatchEvent::KickOff => "Kick Off",
        MatchEvent::Goal => "Goal",
        MatchEvent::FullTime => "Full Time",
    };
    format!("{}\n{}", header, describe(m))
}
