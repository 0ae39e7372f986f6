use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SETTINGS_FILE: &str = "Settings.json";

/// Operator-maintained configuration. Reloaded in full at the start of every cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Seconds between cycles.
    pub timer: u64,
    /// Raw short code of the station's own team.
    #[serde(default)]
    pub home_team: String,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub sports: Vec<Sport>,
    /// Non-conference teams that should always make the on-air rotation.
    #[serde(default)]
    pub display_teams: Vec<DisplayTeam>,
    #[serde(default)]
    pub xml_to_json: XmlToJson,
}

/// XML documents re-published as `{path}.json` at the start of every cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XmlToJson {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub file_paths: Vec<FilePath>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePath {
    #[serde(alias = "Path")]
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTeam {
    pub ncaa_team_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sport {
    pub sport_name: String,
    #[serde(default)]
    pub sport_short_name: String,
    pub sport_code: String,
    #[serde(default = "default_division")]
    pub division: u8,
    /// Week-based sports ask the feed by week instead of by date.
    #[serde(default)]
    pub week: Option<u32>,
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Raw conference identifier that makes a game "in conference" for this sport.
    /// This is the feed's conference slug (`nchc`, `big-ten`), compared exactly,
    /// not the display label from the name table.
    #[serde(default)]
    pub conference_name: String,
    /// Overrides the global home team for this sport.
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub game_display_mode: GameDisplayMode,
    #[serde(default)]
    pub oos_updater: OosUpdater,
    #[serde(default)]
    pub lists_needed: ListsNeeded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameDisplayMode {
    /// Only in-progress contests.
    Live,
    #[default]
    All,
    /// Exactly the display bucket.
    Display,
}

/// On-air graphics ("out of town scores") writer settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OosUpdater {
    #[serde(default)]
    pub enabled: bool,
    /// Directory holding the graphics device's `{fileName}{n}.tmp` templates.
    /// Empty means only the JSON pages are written.
    #[serde(default)]
    pub oos_file_path: String,
    #[serde(default, alias = "oosFileName")]
    pub file_name: String,
    #[serde(default)]
    pub number_of_out_scores: usize,
    #[serde(default)]
    pub number_of_teams_per: usize,
}

/// Which buckets survive into the emitted scoreboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListsNeeded {
    #[serde(default = "enabled")]
    pub home_games: bool,
    #[serde(default = "enabled")]
    pub conference_games: bool,
    #[serde(default = "enabled")]
    pub non_conference_games: bool,
    #[serde(default = "enabled")]
    pub non_conference_sorted: bool,
    #[serde(default = "enabled")]
    pub filtered_games: bool,
    #[serde(default = "enabled")]
    pub top25_games: bool,
}

impl Default for ListsNeeded {
    fn default() -> Self {
        Self {
            home_games: true,
            conference_games: true,
            non_conference_games: true,
            non_conference_sorted: true,
            filtered_games: true,
            top25_games: true,
        }
    }
}

fn enabled() -> bool {
    true
}

fn default_division() -> u8 {
    1
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_output_dir() -> String {
    ".".into()
}

#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error, String),
    Parse(serde_json::Error, String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(e, path) => write!(f, "could not read {path}: {e}"),
            ConfigError::Parse(e, path) => write!(f, "invalid settings in {path}: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid settings: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e, shown.clone()))?;
        Self::parse(&raw).map_err(|e| match e {
            ConfigError::Parse(e, _) => ConfigError::Parse(e, shown),
            other => other,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e, "<settings>".into()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timer == 0 {
            return Err(ConfigError::Invalid("timer must be at least one second".into()));
        }
        let mut names = HashSet::new();
        for sport in &self.sports {
            if sport.sport_name.trim().is_empty() {
                return Err(ConfigError::Invalid("sport with an empty sportName".into()));
            }
            if sport.sport_code.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "sport '{}' has no sportCode",
                    sport.sport_name
                )));
            }
            if !names.insert(sport.sport_name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "sport '{}' is listed twice",
                    sport.sport_name
                )));
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.timer)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    /// Names from the always-display list, for membership checks.
    pub fn display_names(&self) -> HashSet<&str> {
        self.display_teams.iter().map(|t| t.ncaa_team_name.as_str()).collect()
    }
}

impl Sport {
    /// Home team for this sport: the per-sport override, else the global one.
    pub fn home_team<'a>(&'a self, global: &'a str) -> &'a str {
        self.home_team.as_deref().filter(|h| !h.is_empty()).unwrap_or(global)
    }

    /// Label used for contests that don't share a conference.
    pub fn short_name(&self) -> &str {
        if self.sport_short_name.is_empty() { &self.sport_name } else { &self.sport_short_name }
    }

    /// Whether the display bucket is being filled for this sport.
    pub fn display_enabled(&self) -> bool {
        self.oos_updater.enabled || self.game_display_mode == GameDisplayMode::Display
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn hockey() -> Sport {
        Sport {
            sport_name: "Hockey".into(),
            sport_short_name: "NCAA".into(),
            sport_code: "MIH".into(),
            division: 1,
            week: None,
            enabled: true,
            conference_name: "NCHC".into(),
            home_team: None,
            game_display_mode: GameDisplayMode::All,
            oos_updater: OosUpdater::default(),
            lists_needed: ListsNeeded::default(),
        }
    }

    const SAMPLE: &str = r#"{
        "timer": 20,
        "homeTeam": "NDAK",
        "sports": [
            { "sportName": "Hockey", "sportShortName": "NCAA", "sportCode": "MIH", "conferenceName": "nchc",
              "gameDisplayMode": "Display",
              "oosUpdater": { "enabled": true, "oosFilePath": "C:\\Gfx", "oosFileName": "OutScore",
                              "numberOfOutScores": 8, "numberOfTeamsPer": 2 },
              "listsNeeded": { "top25Games": false } },
            { "sportName": "Football", "sportCode": "MFB", "division": 11, "week": 6, "enabled": false }
        ],
        "displayTeams": [ { "ncaaTeamName": "MINN" } ],
        "xmlToJson": { "enabled": true, "filePaths": [ { "path": "stats.xml" } ] }
    }"#;

    #[test]
    fn parses_sample_with_defaults() {
        let s = Settings::parse(SAMPLE).expect("sample parses");
        assert_eq!(s.interval(), Duration::from_secs(20));
        assert_eq!(s.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(s.output_dir, ".");

        let hockey = &s.sports[0];
        assert_eq!(hockey.division, 1);
        assert!(hockey.enabled);
        assert!(hockey.display_enabled());
        assert!(!hockey.lists_needed.top25_games);
        assert!(hockey.lists_needed.filtered_games);
        assert_eq!(hockey.oos_updater.number_of_out_scores, 8);
        assert_eq!(hockey.oos_updater.oos_file_path, "C:\\Gfx");
        assert_eq!(hockey.oos_updater.file_name, "OutScore");

        let football = &s.sports[1];
        assert!(!football.enabled);
        assert_eq!(football.week, Some(6));
        assert_eq!(football.short_name(), "Football");
        assert_eq!(football.game_display_mode, GameDisplayMode::All);

        assert!(s.display_names().contains("MINN"));
        assert!(s.xml_to_json.enabled);
        assert_eq!(s.xml_to_json.file_paths, [FilePath { path: "stats.xml".into() }]);
    }

    #[test]
    fn xml_conversion_is_off_unless_configured() {
        let s = Settings::parse(r#"{ "timer": 5 }"#).unwrap();
        assert_eq!(s.xml_to_json, XmlToJson::default());
        assert!(!s.xml_to_json.enabled);
    }

    #[test]
    fn demo_settings_file_is_valid() {
        let s = Settings::parse(include_str!("../../demos/Settings.json")).unwrap();
        assert_eq!(s.sports.len(), 3);
        assert_eq!(s.sports[2].home_team(&s.home_team), "MINN");
        assert!(!s.sports[2].enabled);
    }

    #[test]
    fn per_sport_home_team_overrides_global() {
        let mut sport = hockey();
        assert_eq!(sport.home_team("NDAK"), "NDAK");
        sport.home_team = Some("SDAKST".into());
        assert_eq!(sport.home_team("NDAK"), "SDAKST");
        sport.home_team = Some(String::new());
        assert_eq!(sport.home_team("NDAK"), "NDAK");
    }

    #[test]
    fn rejects_duplicate_sport_names() {
        let raw = r#"{ "timer": 5, "sports": [
            { "sportName": "MBB", "sportCode": "MBB" },
            { "sportName": "MBB", "sportCode": "WBB" } ] }"#;
        assert!(matches!(Settings::parse(raw), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_timer_and_bad_json() {
        assert!(matches!(Settings::parse(r#"{ "timer": 0 }"#), Err(ConfigError::Invalid(_))));
        assert!(matches!(Settings::parse("{ timer: 5 "), Err(ConfigError::Parse(..))));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read(..)));
    }
}
