use crate::state::settings::{GameDisplayMode, ListsNeeded};
use chrono::{DateTime, Utc};
use ncaa_api::Contest;
use serde::{Deserialize, Serialize};

/// Key of the pre-seeded group that collects contests without a shared conference.
pub const NON_CONFERENCE_GROUP: &str = "nonConf";

/// One classified sport. Every bucket is filled by a single classifier pass;
/// afterwards only retention pruning may empty a bucket. The raw batch itself
/// is not kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scoreboard {
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub home_games: Vec<Contest>,
    #[serde(default)]
    pub conference_games: Vec<Contest>,
    #[serde(default)]
    pub non_conference_games: Vec<Contest>,
    #[serde(default)]
    pub non_conference_sorted: Vec<Contest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display_games: Vec<Contest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top25_games: Vec<Contest>,
    #[serde(default)]
    pub filtered_games: Vec<ConferenceGroup>,
    /// Bucket sizes as classified, before pruning.
    #[serde(skip)]
    pub counts: BucketCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceGroup {
    pub conference_id: String,
    pub conference_name: String,
    #[serde(default)]
    pub games: Vec<Contest>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketCounts {
    pub total: usize,
    pub home: usize,
    pub conference: usize,
    pub non_conference: usize,
    pub display: usize,
    pub top25: usize,
}

/// The flat contest lists of a board. The conference groups are not a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Home,
    Conference,
    NonConference,
    NonConferenceSorted,
    Display,
    Top25,
}

impl Scoreboard {
    /// Empty buckets plus the seeded non-conference group.
    pub fn new(updated_at: Option<DateTime<Utc>>, non_conference_label: &str) -> Self {
        Self {
            updated_at,
            filtered_games: vec![ConferenceGroup {
                conference_id: NON_CONFERENCE_GROUP.to_owned(),
                conference_name: non_conference_label.to_owned(),
                games: Vec::new(),
            }],
            ..Default::default()
        }
    }

    /// Group for `conference_id`, created at the end with `label` on first use.
    pub fn group_entry(&mut self, conference_id: &str, label: &str) -> &mut ConferenceGroup {
        let idx = match self.filtered_games.iter().position(|g| g.conference_id == conference_id) {
            Some(idx) => idx,
            None => {
                self.filtered_games.push(ConferenceGroup {
                    conference_id: conference_id.to_owned(),
                    conference_name: label.to_owned(),
                    games: Vec::new(),
                });
                self.filtered_games.len() - 1
            }
        };
        &mut self.filtered_games[idx]
    }

    pub fn group(&self, conference_id: &str) -> Option<&ConferenceGroup> {
        self.filtered_games.iter().find(|g| g.conference_id == conference_id)
    }

    pub fn bucket(&self, bucket: Bucket) -> &[Contest] {
        match bucket {
            Bucket::Home => &self.home_games,
            Bucket::Conference => &self.conference_games,
            Bucket::NonConference => &self.non_conference_games,
            Bucket::NonConferenceSorted => &self.non_conference_sorted,
            Bucket::Display => &self.display_games,
            Bucket::Top25 => &self.top25_games,
        }
    }

    pub fn clear(&mut self, bucket: Bucket) {
        match bucket {
            Bucket::Home => self.home_games.clear(),
            Bucket::Conference => self.conference_games.clear(),
            Bucket::NonConference => self.non_conference_games.clear(),
            Bucket::NonConferenceSorted => self.non_conference_sorted.clear(),
            Bucket::Display => self.display_games.clear(),
            Bucket::Top25 => self.top25_games.clear(),
        }
    }

    /// Drop every bucket the sport doesn't ask for.
    pub fn prune(&mut self, lists: &ListsNeeded) {
        let wanted = [
            (Bucket::Home, lists.home_games),
            (Bucket::Conference, lists.conference_games),
            (Bucket::NonConference, lists.non_conference_games),
            (Bucket::NonConferenceSorted, lists.non_conference_sorted),
            (Bucket::Top25, lists.top25_games),
        ];
        for (bucket, keep) in wanted {
            if !keep {
                self.clear(bucket);
            }
        }
        if !lists.filtered_games {
            self.filtered_games.clear();
        }
    }

    pub fn count_buckets(&self) -> BucketCounts {
        let len = |bucket| self.bucket(bucket).len();
        BucketCounts {
            total: len(Bucket::Home) + len(Bucket::Conference) + len(Bucket::NonConference),
            home: len(Bucket::Home),
            conference: len(Bucket::Conference),
            non_conference: len(Bucket::NonConference),
            display: len(Bucket::Display),
            top25: len(Bucket::Top25),
        }
    }

    /// Contests a front end should show for `mode`, in start order.
    pub fn surfaced(&self, mode: GameDisplayMode) -> Vec<&Contest> {
        if mode == GameDisplayMode::Display {
            return self.display_games.iter().collect();
        }
        let mut games: Vec<&Contest> = self
            .home_games
            .iter()
            .chain(&self.conference_games)
            .chain(&self.non_conference_games)
            .filter(|c| mode == GameDisplayMode::All || c.is_live())
            .collect();
        games.sort_by_key(|c| c.start_epoch);
        games
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncaa_api::GameState;

    fn game(id: &str, epoch: i64, state: GameState) -> Contest {
        Contest { id: id.into(), start_epoch: epoch, state, ..Default::default() }
    }

    #[test]
    fn new_board_seeds_non_conference_group_first() {
        let mut board = Scoreboard::new(None, "NCAA");
        board.group_entry("big-ten", "Big Ten");
        assert_eq!(board.filtered_games[0].conference_id, NON_CONFERENCE_GROUP);
        assert_eq!(board.filtered_games[0].conference_name, "NCAA");
        assert_eq!(board.filtered_games[1].conference_name, "Big Ten");
    }

    #[test]
    fn group_entry_reuses_existing_group() {
        let mut board = Scoreboard::new(None, "NCAA");
        board.group_entry("wcha", "WCHA").games.push(game("1", 1, GameState::Pre));
        board.group_entry("wcha", "ignored").games.push(game("2", 2, GameState::Pre));
        assert_eq!(board.filtered_games.len(), 2);
        let group = board.group("wcha").unwrap();
        assert_eq!(group.conference_name, "WCHA");
        assert_eq!(group.games.len(), 2);
    }

    #[test]
    fn prune_only_touches_unwanted_buckets() {
        let mut board = Scoreboard::new(None, "NCAA");
        board.top25_games.push(game("1", 1, GameState::Pre));
        board.conference_games.push(game("1", 1, GameState::Pre));
        let lists = ListsNeeded { top25_games: false, filtered_games: false, ..Default::default() };
        board.prune(&lists);
        assert!(board.bucket(Bucket::Top25).is_empty());
        assert!(board.filtered_games.is_empty());
        assert_eq!(board.bucket(Bucket::Conference).len(), 1);
    }

    #[test]
    fn counts_cover_flat_buckets_only() {
        let mut board = Scoreboard::new(None, "NCAA");
        board.home_games.push(game("1", 1, GameState::Pre));
        board.non_conference_games.push(game("2", 2, GameState::Pre));
        board.display_games.push(game("2", 2, GameState::Pre));
        board.group_entry(NON_CONFERENCE_GROUP, "NCAA").games.push(game("2", 2, GameState::Pre));

        let counts = board.count_buckets();
        assert_eq!(counts.total, 2);
        assert_eq!((counts.home, counts.non_conference, counts.display), (1, 1, 1));
        assert_eq!(counts.conference, 0);
    }

    #[test]
    fn surfaced_live_mode_keeps_in_progress_only() {
        let mut board = Scoreboard::new(None, "NCAA");
        board.non_conference_games.push(game("late", 300, GameState::InProgress));
        board.conference_games.push(game("done", 100, GameState::Final));
        board.home_games.push(game("early", 200, GameState::InProgress));
        board.display_games.push(game("done", 100, GameState::Final));

        let ids = |games: Vec<&Contest>| games.iter().map(|c| c.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(board.surfaced(GameDisplayMode::Live)), ["early", "late"]);
        assert_eq!(ids(board.surfaced(GameDisplayMode::All)), ["done", "early", "late"]);
        assert_eq!(ids(board.surfaced(GameDisplayMode::Display)), ["done"]);
    }

    #[test]
    fn empty_display_and_top25_lists_are_omitted_from_json() {
        let board = Scoreboard::new(None, "NCAA");
        let json = serde_json::to_value(&board).unwrap();
        assert!(json.get("displayGames").is_none());
        assert!(json.get("top25Games").is_none());
        assert!(json.get("conferenceGames").is_some());
    }
}
