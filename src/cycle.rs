use crate::classifier::{MatchRules, classify};
use crate::gfx::convert_xml_file;
use crate::resolver::resolve;
use crate::scoreboard::BucketCounts;
use crate::sink::{FileSink, ScoreboardSink, SinkError};
use crate::state::lookup_store::{DEFAULT_NAMES_FILE, FileStorage, LookupStore, NameStorage, StoreError};
use crate::state::settings::{ConfigError, DEFAULT_SETTINGS_FILE, Settings, Sport, XmlToJson};
use chrono::{Local, NaiveDate};
use futures_util::future::join_all;
use log::{debug, info, warn};
use ncaa_api::ContestBatch;
use ncaa_api::client::{ApiError, ContestQuery, NcaaApi};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_ENV: &str = "NCAA_TRANSLATOR_SETTINGS";
pub const NAMES_ENV: &str = "NCAA_TRANSLATOR_NAMES";

#[derive(Debug)]
pub enum CycleError {
    /// Name table missing, corrupt or unwritable. Aborts the cycle.
    StoreUnavailable(StoreError),
    /// Settings unreadable or invalid. Aborts the cycle.
    ConfigInvalid(ConfigError),
    FetchFailure { sport: String, reason: String },
    MalformedContest(ApiError),
    Emit { sport: String, source: SinkError },
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleError::StoreUnavailable(e) => write!(f, "{e}"),
            CycleError::ConfigInvalid(e) => write!(f, "{e}"),
            CycleError::FetchFailure { sport, reason } => write!(f, "{sport}: fetch failed: {reason}"),
            CycleError::MalformedContest(e) => write!(f, "{e}"),
            CycleError::Emit { sport, source } => write!(f, "{sport}: {source}"),
        }
    }
}

impl std::error::Error for CycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CycleError::StoreUnavailable(e) => Some(e),
            CycleError::ConfigInvalid(e) => Some(e),
            CycleError::MalformedContest(e) => Some(e),
            CycleError::Emit { source, .. } => Some(source),
            CycleError::FetchFailure { .. } => None,
        }
    }
}

/// Files a cycle reads. Both are re-read every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePaths {
    pub settings: PathBuf,
    pub names: PathBuf,
}

impl CyclePaths {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve both paths through `lookup`; unset or blank values take the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };
        Self {
            settings: path(SETTINGS_ENV, DEFAULT_SETTINGS_FILE),
            names: path(NAMES_ENV, DEFAULT_NAMES_FILE),
        }
    }
}

/// What the feed gave back for one configured sport.
#[derive(Debug)]
pub enum Fetched {
    Disabled,
    Batch(ContestBatch),
    Failed(CycleError),
}

#[derive(Debug)]
pub enum SportOutcome {
    Emitted { counts: BucketCounts, shown: usize, malformed: usize },
    Disabled,
    Failed(CycleError),
}

#[derive(Debug)]
pub struct SportSummary {
    pub sport: String,
    pub outcome: SportOutcome,
}

#[derive(Debug)]
pub struct CycleReport {
    /// Interval from the settings this cycle ran with.
    pub interval: Duration,
    pub sports: Vec<SportSummary>,
}

impl CycleReport {
    pub fn emitted(&self) -> usize {
        self.sports.iter().filter(|s| matches!(s.outcome, SportOutcome::Emitted { .. })).count()
    }

    /// One row per sport, for the operator.
    pub fn log(&self) {
        info!(
            "{:<16} {:>5} {:>5} {:>7} {:>7} {:>4} {:>5} {:>5}",
            "Sport", "Total", "Conf", "NonConf", "Display", "Home", "Top25", "Shown"
        );
        for row in &self.sports {
            match &row.outcome {
                SportOutcome::Emitted { counts, shown, malformed } => {
                    info!(
                        "{:<16} {:>5} {:>5} {:>7} {:>7} {:>4} {:>5} {:>5}{}",
                        row.sport,
                        counts.total,
                        counts.conference,
                        counts.non_conference,
                        counts.display,
                        counts.home,
                        counts.top25,
                        shown,
                        if *malformed > 0 { format!("  ({malformed} malformed dropped)") } else { String::new() }
                    );
                }
                SportOutcome::Disabled => info!("{:<16} disabled", row.sport),
                SportOutcome::Failed(e) => info!("{:<16} skipped: {e}", row.sport),
            }
        }
    }
}

/// Run one full cycle: reload settings and names, fetch every enabled sport,
/// then resolve, classify and emit each sport in configuration order.
pub async fn run_cycle(api: &NcaaApi, paths: &CyclePaths) -> Result<CycleReport, CycleError> {
    let settings = Settings::load(&paths.settings).map_err(CycleError::ConfigInvalid)?;
    let mut store =
        LookupStore::open(FileStorage::new(&paths.names)).map_err(CycleError::StoreUnavailable)?;
    let mut sink = FileSink::new(&settings.output_dir);
    let converted = convert_xml_files(&settings.xml_to_json);
    if converted > 0 {
        info!("{converted} XML file(s) republished as JSON");
    }

    let fetched = fetch_all(api, &settings, Local::now().date_naive()).await;
    process(&settings, fetched, &mut store, &mut sink)
}

/// Re-publish the configured XML documents as JSON. A file that fails is
/// logged and skipped. Returns how many were written.
pub fn convert_xml_files(config: &XmlToJson) -> usize {
    if !config.enabled {
        return 0;
    }
    let mut converted = 0;
    for file in &config.file_paths {
        match convert_xml_file(Path::new(&file.path)) {
            Ok(out) => {
                debug!("wrote {}", out.display());
                converted += 1;
            }
            Err(e) => warn!("XML to JSON: {e}"),
        }
    }
    converted
}

/// Fetch every sport concurrently. Results line up with `settings.sports`.
pub async fn fetch_all(api: &NcaaApi, settings: &Settings, today: NaiveDate) -> Vec<Fetched> {
    let limit = settings.fetch_timeout();
    // The request itself must outlive `limit` so the cycle's own timeout decides.
    let api = api.clone().with_timeout(limit + Duration::from_secs(1));
    join_all(settings.sports.iter().map(|sport| fetch_sport(&api, sport, today, limit))).await
}

async fn fetch_sport(api: &NcaaApi, sport: &Sport, today: NaiveDate, limit: Duration) -> Fetched {
    if !sport.enabled {
        return Fetched::Disabled;
    }
    let query = ContestQuery::on(&sport.sport_code, sport.division, sport.week, today);
    let failed = |reason: String| {
        Fetched::Failed(CycleError::FetchFailure { sport: sport.sport_name.clone(), reason })
    };
    match tokio::time::timeout(limit, api.fetch_contests(&query)).await {
        Ok(Ok(batch)) => Fetched::Batch(batch),
        Ok(Err(e)) => failed(e.to_string()),
        Err(_) => failed(format!("timed out after {}s", limit.as_secs())),
    }
}

/// Everything after the fetch. Sequential, in configuration order.
///
/// Per-sport failures end up in the report; a lookup store failure aborts
/// the remaining sports.
pub fn process<S: NameStorage, K: ScoreboardSink>(
    settings: &Settings,
    fetched: Vec<Fetched>,
    store: &mut LookupStore<S>,
    sink: &mut K,
) -> Result<CycleReport, CycleError> {
    let display = settings.display_names();
    let mut report = CycleReport { interval: settings.interval(), sports: Vec::new() };

    for (sport, fetched) in settings.sports.iter().zip(fetched) {
        let outcome = match fetched {
            Fetched::Disabled => SportOutcome::Disabled,
            Fetched::Failed(e) => {
                warn!("{e}");
                SportOutcome::Failed(e)
            }
            Fetched::Batch(batch) => process_sport(settings, sport, batch, &display, store, sink)?,
        };
        report.sports.push(SportSummary { sport: sport.sport_name.clone(), outcome });
    }

    Ok(report)
}

fn process_sport<S: NameStorage, K: ScoreboardSink>(
    settings: &Settings,
    sport: &Sport,
    mut batch: ContestBatch,
    display: &HashSet<&str>,
    store: &mut LookupStore<S>,
    sink: &mut K,
) -> Result<SportOutcome, CycleError> {
    batch.sort_by_start();
    let ContestBatch { updated_at, mut contests, malformed } = batch;
    let malformed: Vec<CycleError> = malformed.into_iter().map(CycleError::MalformedContest).collect();
    for e in &malformed {
        warn!("{}: dropped {e}", sport.sport_name);
    }

    for contest in contests.iter_mut() {
        resolve(contest, store, sport.short_name()).map_err(CycleError::StoreUnavailable)?;
    }
    debug!("{}: {} contests resolved", sport.sport_name, contests.len());

    let rules = MatchRules {
        sport,
        home_team: sport.home_team(&settings.home_team),
        display_teams: display,
    };
    let board = classify(contests, updated_at, rules);

    match sink.emit(sport, &board) {
        Ok(_) => Ok(SportOutcome::Emitted {
            counts: board.counts,
            shown: board.surfaced(sport.game_display_mode).len(),
            malformed: malformed.len(),
        }),
        Err(source) => {
            let e = CycleError::Emit { sport: sport.sport_name.clone(), source };
            warn!("{e}");
            Ok(SportOutcome::Failed(e))
        }
    }
}
