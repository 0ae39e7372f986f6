use crate::scoreboard::{NON_CONFERENCE_GROUP, Scoreboard};
use crate::state::settings::Sport;
use chrono::{DateTime, Utc};
use log::debug;
use ncaa_api::Contest;
use std::collections::HashSet;

/// Conference identifier that never forms its own group.
pub const DI_INDEPENDENT: &str = "DI Independent";
/// Conference identifier the feed uses for its poll pseudo-conference.
pub const TOP_25: &str = "Top 25";

/// Per-sport matching inputs for one pass.
#[derive(Debug, Clone, Copy)]
pub struct MatchRules<'a> {
    pub sport: &'a Sport,
    /// Home team code in effect for this sport.
    pub home_team: &'a str,
    /// Names that put a non-conference game on the display list.
    pub display_teams: &'a HashSet<&'a str>,
}

/// Partition a name-resolved batch into the scoreboard buckets.
///
/// `contests` must already be in start order (`ContestBatch::sort_by_start`);
/// every bucket keeps the order it receives. Each contest is placed
/// independently, so it may land in several buckets. Retention pruning runs
/// last.
pub fn classify(
    contests: Vec<Contest>,
    updated_at: Option<DateTime<Utc>>,
    rules: MatchRules<'_>,
) -> Scoreboard {
    let sport = rules.sport;
    let display_on = sport.display_enabled();
    let mut board = Scoreboard::new(updated_at, sport.short_name());

    for mut contest in contests {
        let top25 = is_top25(&contest);

        if is_conference_match(&contest, &sport.conference_name) {
            if contest.involves(rules.home_team) {
                board.home_games.push(contest.clone());
            } else {
                if display_on {
                    board.display_games.push(contest.clone());
                }
                board.conference_games.push(contest.clone());
            }
        } else {
            let shared = shared_conference(&contest).map(|(id, label)| (id.to_owned(), label));
            if shared.is_none() {
                contest.conference_display_name = sport.short_name().to_owned();
            }

            board.non_conference_games.push(contest.clone());
            if display_on && on_display_list(&contest, rules.display_teams) {
                board.display_games.push(contest.clone());
            }
            match shared {
                Some((id, label)) => board.group_entry(&id, &label).games.push(contest.clone()),
                None => board
                    .group_entry(NON_CONFERENCE_GROUP, sport.short_name())
                    .games
                    .push(contest.clone()),
            }
        }

        if top25 {
            board.top25_games.push(contest);
        }
    }

    board.non_conference_sorted =
        board.filtered_games.iter().flat_map(|g| g.games.iter().cloned()).collect();

    board.counts = board.count_buckets();
    debug!("{} classified: {:?}", sport.sport_name, board.counts);

    board.prune(&sport.lists_needed);
    board
}

/// Either side belonging to the tracked conference is enough. Slugs compare
/// exactly, so `conference_id` must be spelled the way the feed spells it.
pub fn is_conference_match(contest: &Contest, conference_id: &str) -> bool {
    !conference_id.is_empty() && contest.teams().iter().any(|t| t.conference_id == conference_id)
}

/// Conference both teams play in, with its resolved label, when it can form a group.
fn shared_conference(contest: &Contest) -> Option<(&str, String)> {
    let (home, away) = (&contest.home, &contest.away);
    let id = home.conference_id.as_str();
    if id.is_empty() || id != away.conference_id || id.eq_ignore_ascii_case(DI_INDEPENDENT) {
        return None;
    }
    let label = if home.custom_conference_name.is_empty() {
        id.to_owned()
    } else {
        home.custom_conference_name.clone()
    };
    Some((id, label))
}

fn on_display_list(contest: &Contest, names: &HashSet<&str>) -> bool {
    contest.teams().iter().any(|t| {
        [t.code.as_str(), t.short_name.as_str(), t.custom_name.as_str()]
            .iter()
            .any(|name| !name.is_empty() && names.contains(name))
    })
}

fn is_top25(contest: &Contest) -> bool {
    contest.teams().iter().any(|t| {
        t.is_ranked() || t.conference_id == TOP_25 || t.custom_conference_name == TOP_25
    })
}
