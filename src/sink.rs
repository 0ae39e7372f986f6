use crate::gfx::{self, GfxError};
use crate::scoreboard::Scoreboard;
use crate::state::settings::{OosUpdater, Sport};
use log::{debug, info};
use ncaa_api::{Contest, GameState};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Where finished scoreboards go.
pub trait ScoreboardSink {
    /// Publish one sport's scoreboard and return the files that were written.
    fn emit(&mut self, sport: &Sport, board: &Scoreboard) -> Result<Vec<PathBuf>, SinkError>;
}

#[derive(Debug)]
pub enum SinkError {
    Io(std::io::Error, PathBuf),
    Serialize(serde_json::Error),
    Template(GfxError),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Io(e, path) => write!(f, "could not write {}: {e}", path.display()),
            SinkError::Serialize(e) => write!(f, "could not serialize scoreboard: {e}"),
            SinkError::Template(e) => write!(f, "could not update graphics template {e}"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Writes `{SportName}-Games.json` plus the graphics pages when the sport has them enabled.
/// Pages go out as `{fileName}{n}.json`, and into the device's `{fileName}{n}.tmp`
/// templates when `oosFilePath` is set.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn scoreboard_path(&self, sport: &Sport) -> PathBuf {
        self.dir.join(format!("{}-Games.json", sport.sport_name))
    }
}

impl ScoreboardSink for FileSink {
    fn emit(&mut self, sport: &Sport, board: &Scoreboard) -> Result<Vec<PathBuf>, SinkError> {
        fs::create_dir_all(&self.dir).map_err(|e| SinkError::Io(e, self.dir.clone()))?;

        let path = self.scoreboard_path(sport);
        let body = serde_json::to_vec_pretty(board).map_err(SinkError::Serialize)?;
        write_file(&path, &body)?;
        let mut written = vec![path];

        let updater = &sport.oos_updater;
        if updater.enabled {
            for (i, page) in out_score_pages(board, updater).into_iter().enumerate() {
                let path = self.dir.join(format!("{}{}.json", updater.file_name, i + 1));
                let body = serde_json::to_vec_pretty(&page).map_err(SinkError::Serialize)?;
                write_file(&path, &body)?;
                written.push(path);

                if !updater.oos_file_path.is_empty() {
                    let template =
                        Path::new(&updater.oos_file_path).join(format!("{}{}.tmp", updater.file_name, i + 1));
                    gfx::update_template(&template, &page).map_err(SinkError::Template)?;
                    written.push(template);
                }
            }
            info!("{}: {} graphics file(s) updated", sport.sport_name, written.len() - 1);
        }

        Ok(written)
    }
}

fn write_file(path: &Path, body: &[u8]) -> Result<(), SinkError> {
    fs::write(path, body).map_err(|e| SinkError::Io(e, path.to_path_buf()))?;
    debug!("wrote {}", path.display());
    Ok(())
}

/// Named text fields for one graphics page.
pub type OutScorePage = BTreeMap<String, String>;

/// Lay the display games into `number_of_out_scores` pages of
/// `number_of_teams_per` slots each, starting over at the first game when
/// the list runs out. No display games means no pages.
pub fn out_score_pages(board: &Scoreboard, updater: &OosUpdater) -> Vec<OutScorePage> {
    let games = &board.display_games;
    if games.is_empty() {
        return Vec::new();
    }

    let mut next = games.iter().cycle();
    (0..updater.number_of_out_scores)
        .map(|_| {
            let mut page = OutScorePage::new();
            for slot in 1..=updater.number_of_teams_per {
                if let Some(game) = next.next() {
                    fill_slot(&mut page, slot, game);
                }
            }
            page
        })
        .collect()
}

fn fill_slot(page: &mut OutScorePage, slot: usize, game: &Contest) {
    let score = |s: Option<u16>| s.map(|s| s.to_string()).unwrap_or_default();
    let clock = game.broadcast_clock();
    let (time, quarter) = match game.state {
        GameState::InProgress => (game.clock.clone(), game.current_period.clone()),
        GameState::Pre | GameState::Final => (String::new(), clock),
    };

    let mut set = |field: &str, text: String| {
        page.insert(format!("G{slot} - {field}"), text);
    };
    set("V Team", game.away.label().to_owned());
    set("V Score", score(game.away.score));
    set("H Team", game.home.label().to_owned());
    set("H Score", score(game.home.score));
    set("Time", time);
    set("Quarter", quarter);
}
