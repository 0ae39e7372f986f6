use crate::state::lookup_store::{LookupStore, NameStorage, StoreError};
use log::trace;
use ncaa_api::Contest;

/// Fill a contest's custom team and conference names from the lookup store.
///
/// Unknown codes are added to the store as a side effect. Running this twice on
/// the same contest gives the same result; the second run just costs lookups.
/// Raw codes and conference identifiers are left untouched.
pub fn resolve<S: NameStorage>(
    contest: &mut Contest,
    store: &mut LookupStore<S>,
    sport_short_name: &str,
) -> Result<(), StoreError> {
    for team in contest.teams_mut() {
        team.custom_name = store.lookup_team(&team.code, &team.short_name, &team.seo_name)?;
        team.custom_conference_name = store.lookup_conference(&team.conference_id, sport_short_name)?;
    }

    let (home, away) = (&contest.home.custom_conference_name, &contest.away.custom_conference_name);
    contest.conference_display_name = if !home.is_empty() && home.eq_ignore_ascii_case(away) {
        home.clone()
    } else {
        sport_short_name.to_owned()
    };
    contest.display_clock = contest.display_clock();

    trace!(
        "{} resolved: {} vs {} [{}]",
        contest.id,
        contest.away.label(),
        contest.home.label(),
        contest.conference_display_name
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::lookup_store::{ConferenceOverride, MemoryStorage, NameTable, TeamOverride};
    use ncaa_api::TeamRef;

    fn team(is_home: bool, code: &str, short: &str, conf: &str) -> TeamRef {
        TeamRef {
            is_home,
            code: code.into(),
            short_name: short.into(),
            conference_id: conf.into(),
            ..Default::default()
        }
    }

    fn store() -> LookupStore<MemoryStorage> {
        let table = NameTable {
            teams: vec![TeamOverride {
                code: "NDAK".into(),
                custom_name: "UND".into(),
                ..Default::default()
            }],
            conferences: vec![
                ConferenceOverride {
                    conference_id: "nchc".into(),
                    custom_conference_name: "NCHC".into(),
                },
                ConferenceOverride {
                    conference_id: "nchc-alt".into(),
                    custom_conference_name: "nchc".into(),
                },
            ],
        };
        LookupStore::open(MemoryStorage::new(&table)).unwrap()
    }

    #[test]
    fn fills_custom_names_and_keeps_raw_codes() {
        let mut store = store();
        let mut c = Contest {
            home: team(true, "NDAK", "North Dakota", "nchc"),
            away: team(false, "DENVER", "Denver", "nchc"),
            ..Default::default()
        };
        resolve(&mut c, &mut store, "NCAA").unwrap();

        assert_eq!(c.home.custom_name, "UND");
        assert_eq!(c.home.code, "NDAK");
        assert_eq!(c.away.custom_name, "Denver");
        assert_eq!(c.home.custom_conference_name, "NCHC");
        assert_eq!(c.conference_display_name, "NCHC");
        assert_eq!(store.team_count(), 2);
    }

    #[test]
    fn shared_label_compares_case_insensitively() {
        let mut store = store();
        let mut c = Contest {
            home: team(true, "NDAK", "North Dakota", "nchc"),
            away: team(false, "OMAHA", "Omaha", "nchc-alt"),
            ..Default::default()
        };
        resolve(&mut c, &mut store, "NCAA").unwrap();
        assert_eq!(c.conference_display_name, "NCHC");
    }

    #[test]
    fn mixed_conferences_are_labelled_by_sport() {
        let mut store = store();
        let mut c = Contest {
            home: team(true, "NDAK", "North Dakota", "nchc"),
            away: team(false, "MINN", "Minnesota", "big-ten"),
            ..Default::default()
        };
        resolve(&mut c, &mut store, "NCAA").unwrap();
        assert_eq!(c.conference_display_name, "NCAA");
        assert_eq!(c.away.custom_conference_name, "big-ten");
    }

    #[test]
    fn teams_without_a_conference_get_the_sport_label() {
        let mut store = store();
        let mut c = Contest {
            home: team(true, "LIU", "LIU", ""),
            away: team(false, "MINN", "Minnesota", "big-ten"),
            ..Default::default()
        };
        resolve(&mut c, &mut store, "NCAA").unwrap();
        assert_eq!(c.home.custom_conference_name, "NCAA");
        assert_eq!(c.home.conference_id, "");
        assert_eq!(c.conference_display_name, "NCAA");
        assert_eq!(store.conference_count(), 3);
    }

    #[test]
    fn resolving_twice_is_stable() {
        let mut store = store();
        let mut c = Contest {
            home: team(true, "BEMIDJ", "Bemidji St.", "ccha"),
            away: team(false, "MINN", "Minnesota", "big-ten"),
            ..Default::default()
        };
        resolve(&mut c, &mut store, "NCAA").unwrap();
        let once = c.clone();
        let saves = store.storage().saves;
        resolve(&mut c, &mut store, "NCAA").unwrap();
        assert_eq!(c, once);
        assert_eq!(store.storage().saves, saves);
    }
}
