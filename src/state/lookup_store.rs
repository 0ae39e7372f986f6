use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_NAMES_FILE: &str = "NcaaNameConverter.json";

/// The persisted override document: two collections, each ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameTable {
    #[serde(default)]
    pub teams: Vec<TeamOverride>,
    #[serde(default)]
    pub conferences: Vec<ConferenceOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamOverride {
    pub code: String,
    pub custom_name: String,
    /// Feed short name at first sighting, kept for the editor's reference.
    #[serde(default)]
    pub short_original: String,
    #[serde(default)]
    pub seo_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceOverride {
    pub conference_id: String,
    pub custom_conference_name: String,
}

#[derive(Debug)]
pub enum StoreError {
    /// Backing document missing or unreadable at load.
    Unavailable(String),
    Write(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "name table unavailable: {msg}"),
            StoreError::Write(msg) => write!(f, "name table write failed: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Where the name table lives between cycles.
pub trait NameStorage {
    fn load(&self) -> Result<NameTable, StoreError>;
    fn save(&mut self, table: &NameTable) -> Result<(), StoreError>;
}

/// Pretty-printed JSON file, hand-editable by the operator.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl NameStorage for FileStorage {
    fn load(&self) -> Result<NameTable, StoreError> {
        let shown = self.path.display();
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| StoreError::Unavailable(format!("{shown}: {e}")))?;
        serde_json::from_str(&raw).map_err(|e| StoreError::Unavailable(format!("{shown}: {e}")))
    }

    fn save(&mut self, table: &NameTable) -> Result<(), StoreError> {
        let shown = self.path.display();
        let body = serde_json::to_string_pretty(table)
            .map_err(|e| StoreError::Write(format!("{shown}: {e}")))?;
        std::fs::write(&self.path, body).map_err(|e| StoreError::Write(format!("{shown}: {e}")))
    }
}

/// Keeps the serialized document in memory; `None` behaves like a missing file.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    document: Option<String>,
    pub saves: usize,
    /// Make every save fail, as a read-only disk would.
    pub fail_writes: bool,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new(table: &NameTable) -> Self {
        Self { document: serde_json::to_string(table).ok(), ..Default::default() }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn from_document(raw: &str) -> Self {
        Self { document: Some(raw.to_owned()), ..Default::default() }
    }
}

#[cfg(test)]
impl NameStorage for MemoryStorage {
    fn load(&self) -> Result<NameTable, StoreError> {
        let raw = self
            .document
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("no document".into()))?;
        serde_json::from_str(raw).map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn save(&mut self, table: &NameTable) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Write("storage is read-only".into()));
        }
        let body = serde_json::to_string(table).map_err(|e| StoreError::Write(e.to_string()))?;
        self.document = Some(body);
        self.saves += 1;
        Ok(())
    }
}

/// Durable raw-identifier → display-name overrides.
///
/// Unknown identifiers are inserted with a default on first sight and the whole
/// table is written back and re-read before the lookup returns. Existing
/// overrides are never changed here; only a person editing the file does that.
#[derive(Debug)]
pub struct LookupStore<S: NameStorage> {
    storage: S,
    teams: BTreeMap<String, TeamOverride>,
    conferences: BTreeMap<String, ConferenceOverride>,
}

impl<S: NameStorage> LookupStore<S> {
    pub fn open(storage: S) -> Result<Self, StoreError> {
        let mut store = Self { storage, teams: BTreeMap::new(), conferences: BTreeMap::new() };
        store.reload()?;
        Ok(store)
    }

    /// Custom display name for a team, creating the override on first sight.
    pub fn lookup_team(
        &mut self,
        code: &str,
        short_name: &str,
        seo_name: &str,
    ) -> Result<String, StoreError> {
        if code.is_empty() {
            return Ok(short_name.to_owned());
        }
        if let Some(entry) = self.teams.get(code) {
            return Ok(non_empty_or(&entry.custom_name, short_name));
        }

        info!("new team '{code}' ({short_name}) added to name table");
        self.teams.insert(
            code.to_owned(),
            TeamOverride {
                code: code.to_owned(),
                custom_name: short_name.to_owned(),
                short_original: short_name.to_owned(),
                seo_name: seo_name.to_owned(),
            },
        );
        self.persist()?;
        Ok(short_name.to_owned())
    }

    /// Custom label for a conference, creating the override on first sight.
    ///
    /// A team without a conference gets `fallback` (the sport's short name) and
    /// no entry is created, so the label is never empty.
    pub fn lookup_conference(
        &mut self,
        conference_id: &str,
        fallback: &str,
    ) -> Result<String, StoreError> {
        if conference_id.is_empty() {
            return Ok(fallback.to_owned());
        }
        if let Some(entry) = self.conferences.get(conference_id) {
            return Ok(non_empty_or(&entry.custom_conference_name, conference_id));
        }

        info!("new conference '{conference_id}' added to name table");
        self.conferences.insert(
            conference_id.to_owned(),
            ConferenceOverride {
                conference_id: conference_id.to_owned(),
                custom_conference_name: conference_id.to_owned(),
            },
        );
        self.persist()?;
        Ok(conference_id.to_owned())
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn conference_count(&self) -> usize {
        self.conferences.len()
    }

    pub fn table(&self) -> NameTable {
        NameTable {
            teams: self.teams.values().cloned().collect(),
            conferences: self.conferences.values().cloned().collect(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let table = self.table();
        self.storage.save(&table)?;
        // Pick up anything edited on disk in the meantime.
        self.reload()
    }

    fn reload(&mut self) -> Result<(), StoreError> {
        let table = self.storage.load()?;
        let mut teams = BTreeMap::new();
        for team in table.teams {
            if let Some(dup) = teams.insert(team.code.clone(), team) {
                return Err(StoreError::Unavailable(format!("team '{}' listed twice", dup.code)));
            }
        }
        let mut conferences = BTreeMap::new();
        for conf in table.conferences {
            if let Some(dup) = conferences.insert(conf.conference_id.clone(), conf) {
                return Err(StoreError::Unavailable(format!(
                    "conference '{}' listed twice",
                    dup.conference_id
                )));
            }
        }
        debug!("name table loaded: {} teams, {} conferences", teams.len(), conferences.len());
        self.teams = teams;
        self.conferences = conferences;
        Ok(())
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() { fallback.to_owned() } else { value.to_owned() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> NameTable {
        NameTable {
            teams: vec![TeamOverride {
                code: "NDAK".into(),
                custom_name: "UND".into(),
                short_original: "North Dakota".into(),
                seo_name: "north-dakota".into(),
            }],
            conferences: vec![ConferenceOverride {
                conference_id: "nchc".into(),
                custom_conference_name: "NCHC".into(),
            }],
        }
    }

    #[test]
    fn existing_override_wins_over_feed_name() {
        let mut store = LookupStore::open(MemoryStorage::new(&seeded())).unwrap();
        assert_eq!(store.lookup_team("NDAK", "North Dakota", "north-dakota").unwrap(), "UND");
        assert_eq!(store.lookup_conference("nchc", "NCAA").unwrap(), "NCHC");
        assert_eq!(store.storage().saves, 0);
    }

    #[test]
    fn unseen_team_is_created_once_with_feed_short_name() {
        let mut store = LookupStore::open(MemoryStorage::new(&seeded())).unwrap();
        let first = store.lookup_team("DENVER", "Denver", "denver").unwrap();
        let second = store.lookup_team("DENVER", "Denver", "denver").unwrap();
        assert_eq!(first, "Denver");
        assert_eq!(second, first);
        assert_eq!(store.team_count(), 2);
        assert_eq!(store.storage().saves, 1);

        let saved = store.storage().load().unwrap();
        let denver = saved.teams.iter().find(|t| t.code == "DENVER").unwrap();
        assert_eq!(denver.short_original, "Denver");
        assert_eq!(denver.seo_name, "denver");
    }

    #[test]
    fn unseen_conference_defaults_to_raw_identifier() {
        let mut store = LookupStore::open(MemoryStorage::new(&NameTable::default())).unwrap();
        assert_eq!(store.lookup_conference("big-ten", "NCAA").unwrap(), "big-ten");
        assert_eq!(store.lookup_conference("big-ten", "NCAA").unwrap(), "big-ten");
        assert_eq!(store.conference_count(), 1);
        assert_eq!(store.storage().saves, 1);
    }

    #[test]
    fn persisted_table_is_ordered_by_key() {
        let mut store = LookupStore::open(MemoryStorage::new(&seeded())).unwrap();
        store.lookup_team("ZZTOP", "Zz", "zz").unwrap();
        store.lookup_team("AFORCE", "Air Force", "air-force").unwrap();
        let codes: Vec<_> =
            store.storage().load().unwrap().teams.into_iter().map(|t| t.code).collect();
        assert_eq!(codes, ["AFORCE", "NDAK", "ZZTOP"]);
    }

    #[test]
    fn empty_keys_fall_back_without_creating_entries() {
        let mut store = LookupStore::open(MemoryStorage::new(&NameTable::default())).unwrap();
        assert_eq!(store.lookup_team("", "Mystery", "").unwrap(), "Mystery");
        assert_eq!(store.lookup_conference("", "NCAA").unwrap(), "NCAA");
        assert_eq!(store.conference_count(), 0);
        assert_eq!(store.team_count(), 0);
        assert_eq!(store.storage().saves, 0);
    }

    #[test]
    fn blank_override_falls_back_to_default() {
        let mut table = seeded();
        table.teams[0].custom_name.clear();
        let mut store = LookupStore::open(MemoryStorage::new(&table)).unwrap();
        assert_eq!(store.lookup_team("NDAK", "North Dakota", "").unwrap(), "North Dakota");
    }

    #[test]
    fn missing_or_corrupt_backing_store_is_fatal() {
        assert!(matches!(
            LookupStore::open(MemoryStorage::missing()),
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            LookupStore::open(MemoryStorage::from_document("{\"teams\": [")),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let mut table = seeded();
        table.teams.push(table.teams[0].clone());
        assert!(matches!(
            LookupStore::open(MemoryStorage::new(&table)),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn file_storage_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_NAMES_FILE);
        std::fs::write(&path, serde_json::to_string(&seeded()).unwrap()).unwrap();

        let mut store = LookupStore::open(FileStorage::new(&path)).unwrap();
        store.lookup_team("MINN", "Minnesota", "minnesota").unwrap();

        let reopened = LookupStore::open(FileStorage::new(&path)).unwrap();
        assert_eq!(reopened.team_count(), 2);
        assert!(std::fs::read_to_string(&path).unwrap().contains("\n  "), "file is pretty-printed");
    }

    #[test]
    fn file_storage_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = LookupStore::open(FileStorage::new(dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
