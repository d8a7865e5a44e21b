use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::provider::{FetchError, MatchProvider};
use crate::db::models::{Goal, MatchSnapshot, MatchStatus, Score};

/// Match provider backed by the football-data.org REST API.
/// Docs: <https://docs.football-data.org/general/v4/index.html>
pub struct FootballData {
    http: Client,
    /// Always ends with '/' so endpoint paths join beneath it
    base_url: Url,
    api_token: Option<String>,
    /// Competition code used for the daily fetch, e.g. "PL"
    competition: String,
}

impl FootballData {
    pub fn new(base_url: &str, api_token: Option<String>, competition: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base)
            .with_context(|| format!("Invalid football API URL: {}", base_url))?;
        Ok(FootballData {
            http,
            base_url,
            api_token,
            competition: competition.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::Malformed(format!("bad endpoint '{}': {}", path, e)))
    }

    async fn get(&self, url: Url) -> Result<String, FetchError> {
        debug!("GET {}", url);
        let mut req = self.http.get(url.as_str());
        if let Some(token) = &self.api_token {
            req = req.header("X-Auth-Token", token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            warn!("football-data error {}: {}", status, body);
            return Err(FetchError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl MatchProvider for FootballData {
    fn name(&self) -> &str {
        "football-data.org"
    }

    async fn matches_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MatchSnapshot>, FetchError> {
        let to = to.max(from);
        let mut url = self.endpoint(&format!("competitions/{}/matches", self.competition))?;
        url.query_pairs_mut()
            .append_pair("dateFrom", &from.to_string())
            .append_pair("dateTo", &to.to_string());
        parse_match_list(&self.get(url).await?)
    }

    async fn matches_by_id(&self, ids: &[u64]) -> Result<Vec<MatchSnapshot>, FetchError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut url = self.endpoint("matches")?;
        url.query_pairs_mut().append_pair("ids", &joined);
        parse_match_list(&self.get(url).await?)
    }

    async fn match_by_id(&self, id: u64) -> Result<MatchSnapshot, FetchError> {
        let url = self.endpoint(&format!("matches/{}", id))?;
        parse_single_match(&self.get(url).await?)
    }
}

// ── Wire format ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiMatchList {
    competition: Option<ApiNamed>,
    matches: Vec<ApiMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMatch {
    id: u64,
    utc_date: DateTime<Utc>,
    status: MatchStatus,
    stage: Option<String>,
    group: Option<String>,
    attendance: Option<u32>,
    competition: Option<ApiNamed>,
    home_team: ApiNamed,
    away_team: ApiNamed,
    score: Option<ApiScore>,
    goals: Option<Vec<ApiGoal>>,
}

#[derive(Debug, Deserialize)]
struct ApiNamed {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiScore {
    full_time: Option<ApiScoreLine>,
}

/// v4 uses `home`/`away`, v2 used `homeTeam`/`awayTeam`.
#[derive(Debug, Deserialize)]
struct ApiScoreLine {
    #[serde(alias = "homeTeam")]
    home: Option<u32>,
    #[serde(alias = "awayTeam")]
    away: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiGoal {
    minute: Option<u32>,
    team: ApiNamed,
    scorer: Option<ApiNamed>,
}

/// The two shapes a provider may use to report the score.
enum ScorePayload {
    GoalEvents(Vec<ApiGoal>),
    FullTime(ApiScoreLine),
}

impl ApiMatch {
    fn score_payload(&mut self) -> Result<ScorePayload, FetchError> {
        if let Some(goals) = self.goals.take() {
            return Ok(ScorePayload::GoalEvents(goals));
        }
        match self.score.take().and_then(|s| s.full_time) {
            Some(line) => Ok(ScorePayload::FullTime(line)),
            None => Err(FetchError::Malformed(format!(
                "match {} has neither goals nor score.fullTime",
                self.id
            ))),
        }
    }

    fn into_snapshot(
        mut self,
        fallback_competition: Option<&str>,
    ) -> Result<MatchSnapshot, FetchError> {
        let payload = self.score_payload()?;
        let home_team = team_name(self.home_team);
        let away_team = team_name(self.away_team);

        let (home_score, away_score, goals) = match payload {
            ScorePayload::GoalEvents(events) => {
                let goals: Vec<Goal> = events
                    .into_iter()
                    .map(|g| Goal {
                        team: team_name(g.team),
                        minute: g.minute,
                        scorer: g.scorer.and_then(|s| s.name),
                    })
                    .collect();
                let home = goals.iter().filter(|g| g.team == home_team).count() as u32;
                let away = goals.len() as u32 - home;
                (Score::Goals(home), Score::Goals(away), Some(goals))
            }
            ScorePayload::FullTime(line) => (Score::from(line.home), Score::from(line.away), None),
        };

        let competition = self
            .competition
            .and_then(|c| c.name)
            .or_else(|| fallback_competition.map(str::to_string))
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(MatchSnapshot {
            id: self.id,
            home_team,
            away_team,
            kickoff: self.utc_date,
            competition,
            stage: self.stage,
            group: self.group,
            status: self.status,
            attendance: self.attendance,
            home_score,
            away_score,
            goals,
        })
    }
}

fn team_name(team: ApiNamed) -> String {
    team.name.unwrap_or_else(|| "TBD".to_string())
}

/// Parse a `{ competition, matches: [...] }` response, preserving provider order.
pub fn parse_match_list(body: &str) -> Result<Vec<MatchSnapshot>, FetchError> {
    let list: ApiMatchList = serde_json::from_str(body)?;
    let fallback = list.competition.and_then(|c| c.name);
    list.matches
        .into_iter()
        .map(|m| m.into_snapshot(fallback.as_deref()))
        .collect()
}

/// Parse a single-match response, either bare or wrapped as `{ "match": {...} }`.
pub fn parse_single_match(body: &str) -> Result<MatchSnapshot, FetchError> {
    let mut raw: serde_json::Value = serde_json::from_str(body)?;
    let inner = match raw.get_mut("match") {
        Some(m) => m.take(),
        None => raw,
    };
    let m: ApiMatch = serde_json::from_value(inner)?;
    m.into_snapshot(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RANGE_BODY: &str = r#"{
        "competition": { "id": 2021, "name": "Premier League" },
        "matches": [
            {
                "id": 436010,
                "utcDate": "2024-03-02T15:00:00Z",
                "status": "TIMED",
                "stage": "REGULAR_SEASON",
                "group": null,
                "homeTeam": { "id": 57, "name": "Arsenal FC" },
                "awayTeam": { "id": 61, "name": "Chelsea FC" },
                "score": { "winner": null, "fullTime": { "home": null, "away": null } }
            },
            {
                "id": 436011,
                "utcDate": "2024-03-02T12:30:00Z",
                "status": "IN_PLAY",
                "stage": "REGULAR_SEASON",
                "group": null,
                "attendance": 52000,
                "competition": { "name": "Premier League 2023/24" },
                "homeTeam": { "name": "Everton FC" },
                "awayTeam": { "name": "Liverpool FC" },
                "score": { "fullTime": { "homeTeam": 1, "awayTeam": 2 } }
            }
        ]
    }"#;

    #[test]
    fn test_parse_match_list_full_time_shape() {
        let matches = parse_match_list(RANGE_BODY).unwrap();
        assert_eq!(matches.len(), 2);

        let first = &matches[0];
        assert_eq!(first.id, 436010);
        assert_eq!(first.status, MatchStatus::Timed);
        assert_eq!(first.home_score, Score::Tbd);
        assert_eq!(first.away_score, Score::Tbd);
        assert_eq!(first.competition, "Premier League");
        assert_eq!(first.kickoff, Utc.with_ymd_and_hms(2024, 3, 2, 15, 0, 0).unwrap());
        assert!(first.goals.is_none());

        let second = &matches[1];
        assert_eq!(second.home_score, Score::Goals(1));
        assert_eq!(second.away_score, Score::Goals(2));
        assert_eq!(second.attendance, Some(52000));
        assert_eq!(second.competition, "Premier League 2023/24");
    }

    #[test]
    fn test_parse_goal_event_shape_counts_by_team() {
        let body = r#"{
            "match": {
                "id": 7,
                "utcDate": "2024-03-02T15:00:00Z",
                "status": "IN_PLAY",
                "stage": "GROUP_STAGE",
                "group": "GROUP_A",
                "competition": { "name": "Champions League" },
                "homeTeam": { "name": "Arsenal FC" },
                "awayTeam": { "name": "FC Porto" },
                "score": { "fullTime": { "home": 0, "away": 0 } },
                "goals": [
                    { "minute": 12, "team": { "name": "Arsenal FC" }, "scorer": { "name": "Saka" } },
                    { "minute": 40, "team": { "name": "FC Porto" }, "scorer": null },
                    { "minute": 77, "team": { "name": "Arsenal FC" } }
                ]
            }
        }"#;
        let m = parse_single_match(body).unwrap();
        assert_eq!(m.home_score, Score::Goals(2));
        assert_eq!(m.away_score, Score::Goals(1));
        assert_eq!(m.group.as_deref(), Some("GROUP_A"));
        let goals = m.goals.unwrap();
        assert_eq!(goals.len(), 3);
        assert_eq!(goals[0].scorer.as_deref(), Some("Saka"));
        assert_eq!(goals[1].scorer, None);
    }

    #[test]
    fn test_parse_bare_single_match() {
        let body = r#"{
            "id": 9,
            "utcDate": "2024-03-02T17:30:00Z",
            "status": "FINISHED",
            "homeTeam": { "name": "Fulham FC" },
            "awayTeam": { "name": "Brighton & Hove Albion FC" },
            "score": { "fullTime": { "home": 3, "away": 0 } }
        }"#;
        let m = parse_single_match(body).unwrap();
        assert_eq!(m.id, 9);
        assert_eq!(m.status, MatchStatus::Finished);
        assert_eq!(m.competition, "Unknown");
        assert_eq!(m.stage, None);
    }

    #[test]
    fn test_missing_score_is_malformed() {
        let body = r#"{
            "id": 9,
            "utcDate": "2024-03-02T17:30:00Z",
            "status": "TIMED",
            "homeTeam": { "name": "Fulham FC" },
            "awayTeam": { "name": "Brighton & Hove Albion FC" }
        }"#;
        let err = parse_single_match(body).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unknown_status_is_malformed() {
        let body = r#"{ "matches": [ {
            "id": 1,
            "utcDate": "2024-03-02T17:30:00Z",
            "status": "ABANDONED_BY_ALIENS",
            "homeTeam": { "name": "A" },
            "awayTeam": { "name": "B" },
            "score": { "fullTime": { "home": null, "away": null } }
        } ] }"#;
        assert!(matches!(parse_match_list(body), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn test_not_json_is_malformed() {
        assert!(matches!(parse_match_list("<html>"), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn test_provider_error_is_retryable() {
        let err = FetchError::Provider {
            status: 429,
            body: "Too many requests".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_only_404_counts_as_not_found() {
        let gone = FetchError::Provider {
            status: 404,
            body: "The resource you are looking for does not exist.".into(),
        };
        assert!(gone.is_not_found());
        let busy = FetchError::Provider {
            status: 429,
            body: "Too many requests".into(),
        };
        assert!(!busy.is_not_found());
        assert!(!FetchError::Malformed("x".into()).is_not_found());
    }

    #[test]
    fn test_endpoint_joins_under_versioned_base() {
        let fd = FootballData::new("https://api.football-data.org/v4", None, "PL").unwrap();
        let url = fd.endpoint("matches/42").unwrap();
        assert_eq!(url.as_str(), "https://api.football-data.org/v4/matches/42");
    }
}
