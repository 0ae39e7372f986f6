pub mod client;
pub mod ncaa;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Domain types: clean model, independent of the NCAA wire format
// ---------------------------------------------------------------------------

/// One fetch of a sport's scoreboard, already adapted to the domain model.
#[derive(Debug, Default)]
pub struct ContestBatch {
    /// Freshness stamp for the whole batch (time the feed was read).
    pub updated_at: Option<DateTime<Utc>>,
    pub contests: Vec<Contest>,
    /// Records the adapter refused; the rest of the batch is still usable.
    pub malformed: Vec<client::ApiError>,
}

impl ContestBatch {
    /// Stable sort by start epoch. Ties keep feed order.
    pub fn sort_by_start(&mut self) {
        self.contests.sort_by_key(|c| c.start_epoch);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub id: String,
    pub start_epoch: i64,
    /// Feed's human start string ("7:07 PM", "TBA", ...).
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub tba: bool,
    pub state: GameState,
    #[serde(default)]
    pub current_period: String,
    #[serde(default)]
    pub clock: String,
    #[serde(default)]
    pub final_message: String,
    pub home: TeamRef,
    pub away: TeamRef,
    /// Grouping label: the shared custom conference name, or the sport's short name.
    #[serde(default)]
    pub conference_display_name: String,
    #[serde(default)]
    pub display_clock: String,
}

impl Contest {
    pub fn is_live(&self) -> bool {
        self.state == GameState::InProgress
    }

    pub fn teams(&self) -> [&TeamRef; 2] {
        [&self.home, &self.away]
    }

    pub fn teams_mut(&mut self) -> [&mut TeamRef; 2] {
        [&mut self.home, &mut self.away]
    }

    /// Either participant carries this raw short code.
    pub fn involves(&self, code: &str) -> bool {
        !code.is_empty() && self.teams().iter().any(|t| t.code == code)
    }

    /// Scoreboard clock with overtime shootouts shown as "SO".
    pub fn display_clock(&self) -> String {
        match self.state {
            GameState::Pre => self.start_label(),
            GameState::Final => self.final_message.replace("2OT", "SO"),
            GameState::InProgress => format!(
                "{}     {}",
                self.current_period.replace("2OT", "SO"),
                self.clock
            ),
        }
    }

    /// Clock text exactly as the feed reports it; used for on-air graphics.
    pub fn broadcast_clock(&self) -> String {
        match self.state {
            GameState::Pre => self.start_label(),
            GameState::Final => self.final_message.clone(),
            GameState::InProgress => format!("{}     {}", self.current_period, self.clock),
        }
    }

    fn start_label(&self) -> String {
        if self.tba {
            return "TBA".to_owned();
        }
        DateTime::from_timestamp(self.start_epoch, 0)
            .map(|dt| dt.with_timezone(&Local).format("%-I:%M %p").to_string())
            .unwrap_or_else(|| self.start_time.clone())
    }
}

/// A participant, as seen by the feed plus the locally resolved names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRef {
    pub is_home: bool,
    /// Feed's six-character code. Primary join key; never replaced by a custom name.
    pub code: String,
    pub short_name: String,
    #[serde(default)]
    pub seo_name: String,
    #[serde(default)]
    pub conference_id: String,
    pub rank: Option<u8>,
    pub score: Option<u16>,
    #[serde(default)]
    pub winner: bool,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub custom_conference_name: String,
}

impl TeamRef {
    pub fn is_ranked(&self) -> bool {
        matches!(self.rank, Some(1..=25))
    }

    /// Name to put on screen: the custom name once resolved, else the feed's.
    pub fn label(&self) -> &str {
        if self.custom_name.is_empty() { &self.short_name } else { &self.custom_name }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameState {
    #[default]
    Pre,
    InProgress,
    Final,
}
