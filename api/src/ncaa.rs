//! NCAA scoreboard raw wire types: serde shapes for the `GetContests_web` query.
//! These map to the clean domain types in client.rs. Field aliases cover the
//! older feed shape (`char6` / `short` / `seo`) alongside the current one.
use serde::Deserialize;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ContestsResponse {
    pub data: Option<ContestsData>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ContestsData {
    #[serde(default)]
    pub contests: Vec<WireContest>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireContest {
    #[serde(alias = "gameID")]
    pub contest_id: Option<NumOrStr>,
    pub start_time_epoch: Option<NumOrStr>,
    pub start_time: Option<String>,
    pub has_start_time: Option<bool>,
    pub game_state: Option<String>, // "P" | "I" | "F" (older feeds: "pre" | "live" | "final")
    pub current_period: Option<String>,
    pub contest_clock: Option<String>,
    pub final_message: Option<String>,
    #[serde(default)]
    pub teams: Vec<WireTeam>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireTeam {
    #[serde(default)]
    pub is_home: bool,
    #[serde(rename = "name6Char", alias = "char6")]
    pub name_6_char: Option<String>,
    #[serde(alias = "short")]
    pub name_short: Option<String>,
    #[serde(rename = "seoname", alias = "seo")]
    pub seo_name: Option<String>,
    pub conference_seo: Option<String>,
    pub team_rank: Option<NumOrStr>,
    pub score: Option<NumOrStr>,
    #[serde(alias = "winner")]
    pub is_winner: Option<bool>,
}

/// The feed is inconsistent about quoting numbers.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum NumOrStr {
    Num(i64),
    Str(String),
}

impl NumOrStr {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NumOrStr::Num(n) => Some(*n),
            NumOrStr::Str(s) => s.trim().parse().ok(),
        }
    }

    pub fn into_string(self) -> String {
        match self {
            NumOrStr::Num(n) => n.to_string(),
            NumOrStr::Str(s) => s,
        }
    }
}
