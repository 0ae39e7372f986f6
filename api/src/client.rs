use crate::ncaa::{ContestsResponse, WireContest, WireTeam};
use crate::{Contest, ContestBatch, GameState, TeamRef};
use chrono::{Datelike, Local, NaiveDate, Utc};
use log::{debug, warn};
use reqwest::{Client, Url};
use serde_json::json;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

const NCAA_SDATA: &str = "https://sdataprod.ncaa.com/";
const CONTESTS_QUERY: &str = "GetContests_web";
const CONTESTS_QUERY_HASH: &str =
    "7287cda610a9326931931080cb3a604828febe6fe3c9016a7e4a36db99efdb7c";

/// NCAA scoreboard client backed by the public `sdataprod` GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct NcaaApi {
    client: Client,
    timeout: Duration,
    base_url: String,
}

impl Default for NcaaApi {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .user_agent("ncaa-translator/0.2 (scoreboard relay)")
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_secs(10),
            base_url: NCAA_SDATA.to_owned(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    NotFound(String),
    MalformedContest { id: String, reason: String },
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::MalformedContest { id, reason } => {
                write!(f, "Malformed contest '{id}': {reason}")
            }
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Network(e, _) | ApiError::Api(e, _) | ApiError::Parsing(e, _) => Some(e),
            _ => None,
        }
    }
}

/// Which slice of a sport's schedule to ask the feed for.
///
/// Week-based sports (football) pass `week` and no date; everything else asks
/// for a single contest date. The two are never sent together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestQuery {
    pub sport_code: String,
    pub division: u8,
    pub season_year: i32,
    pub week: Option<u32>,
    pub contest_date: Option<NaiveDate>,
}

impl ContestQuery {
    pub fn for_today(sport_code: &str, division: u8, week: Option<u32>) -> Self {
        Self::on(sport_code, division, week, Local::now().date_naive())
    }

    pub fn on(sport_code: &str, division: u8, week: Option<u32>, today: NaiveDate) -> Self {
        Self {
            sport_code: sport_code.to_owned(),
            division,
            season_year: today.year(),
            week,
            contest_date: if week.is_some() { None } else { Some(today) },
        }
    }

    pub fn variables(&self) -> serde_json::Value {
        json!({
            "sportCode": self.sport_code,
            "division": self.division,
            "seasonYear": self.season_year,
            "week": self.week,
            "contestDate": self.contest_date.map(|d| d.format("%m/%d/%Y").to_string()),
        })
    }
}

impl NcaaApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at another host (test servers, mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch one sport's contests and adapt them to the domain model.
    ///
    /// Records that cannot be adapted are collected in `ContestBatch::malformed`
    /// instead of failing the whole batch.
    pub async fn fetch_contests(&self, query: &ContestQuery) -> ApiResult<ContestBatch> {
        let url = self.contests_url(query)?;
        let raw: ContestsResponse = self.get(url.as_str()).await?;
        let data = raw.data.ok_or_else(|| {
            ApiError::NotFound(format!("no contest data for {}", query.sport_code))
        })?;
        debug!("{} contests received for {}", data.contests.len(), query.sport_code);
        Ok(map_batch(data.contests))
    }

    fn contests_url(&self, query: &ContestQuery) -> ApiResult<Url> {
        let extensions = json!({
            "persistedQuery": { "version": 1, "sha256Hash": CONTESTS_QUERY_HASH }
        });
        Url::parse_with_params(
            &self.base_url,
            &[
                ("meta", CONTESTS_QUERY.to_owned()),
                ("extensions", extensions.to_string()),
                ("variables", query.variables().to_string()),
            ],
        )
        .map_err(|e| ApiError::Other(format!("bad feed url {}: {e}", self.base_url)))
    }

    async fn get<T: Default + serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned())),
            Err(e) => {
                if e.status().map(|s| s.is_client_error()).unwrap_or(false) {
                    Ok(T::default())
                } else {
                    Err(ApiError::Api(e, url.to_owned()))
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping: NCAA wire types → clean domain types
// ---------------------------------------------------------------------------

fn map_batch(raw: Vec<WireContest>) -> ContestBatch {
    let mut batch = ContestBatch { updated_at: Some(Utc::now()), ..Default::default() };
    for wire in raw {
        match map_contest(wire) {
            Ok(contest) => batch.contests.push(contest),
            Err(e) => {
                warn!("{e}");
                batch.malformed.push(e);
            }
        }
    }
    batch
}

fn map_contest(wire: WireContest) -> ApiResult<Contest> {
    let id = wire.contest_id.map(|v| v.into_string()).unwrap_or_default();
    let malformed = |reason: &str| ApiError::MalformedContest {
        id: id.clone(),
        reason: reason.to_owned(),
    };

    if id.trim().is_empty() {
        return Err(malformed("missing contest id"));
    }
    let start_epoch = wire
        .start_time_epoch
        .as_ref()
        .and_then(|v| v.as_i64())
        .ok_or_else(|| malformed("missing or unparseable start epoch"))?;

    let home = wire.teams.iter().find(|t| t.is_home).ok_or_else(|| malformed("no home team"))?;
    let away = wire.teams.iter().find(|t| !t.is_home).ok_or_else(|| malformed("no away team"))?;

    let start_time = wire.start_time.unwrap_or_default();
    let tba = start_time.eq_ignore_ascii_case("TBA") || wire.has_start_time == Some(false);

    let mut contest = Contest {
        start_epoch,
        tba,
        start_time,
        state: wire.game_state.as_deref().map(parse_state).unwrap_or_default(),
        current_period: wire.current_period.unwrap_or_default(),
        clock: wire.contest_clock.unwrap_or_default(),
        final_message: wire.final_message.unwrap_or_default(),
        home: map_team(home),
        away: map_team(away),
        id,
        ..Default::default()
    };
    contest.display_clock = contest.display_clock();
    Ok(contest)
}

fn map_team(t: &WireTeam) -> TeamRef {
    let text = |s: &Option<String>| s.as_deref().unwrap_or_default().trim().to_owned();
    TeamRef {
        is_home: t.is_home,
        code: text(&t.name_6_char),
        short_name: text(&t.name_short),
        seo_name: text(&t.seo_name),
        conference_id: text(&t.conference_seo),
        rank: t
            .team_rank
            .as_ref()
            .and_then(|r| r.as_i64())
            .and_then(|r| u8::try_from(r).ok()),
        score: t.score.as_ref().and_then(|s| s.as_i64()).and_then(|s| u16::try_from(s).ok()),
        winner: t.is_winner.unwrap_or(false),
        ..Default::default()
    }
}

fn parse_state(s: &str) -> GameState {
    match s.trim().to_ascii_lowercase().as_str() {
        "i" | "in" | "live" | "in-progress" => GameState::InProgress,
        "f" | "final" => GameState::Final,
        "p" | "pre" => GameState::Pre,
        other => {
            debug!("unknown game state '{other}', treating as pre-game");
            GameState::Pre
        }
    }
}
