mod classifier;
mod cycle;
mod gfx;
mod resolver;
mod scoreboard;
mod sink;
mod state;

use crate::cycle::{CyclePaths, run_cycle};
use crate::state::messages::{CycleRequest, CycleResponse};
use crate::state::refresher::{DEFAULT_INTERVAL, PeriodicRefresher};
use crate::state::settings::Settings;
use crate::state::worker::CycleWorker;
use log::{error, info, warn};
use ncaa_api::client::NcaaApi;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Forever,
    Once,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(mode) = handle_cli_args() else {
        return Ok(());
    };

    better_panic::install();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let paths = CyclePaths::from_env();
    let api = NcaaApi::new();
    info!(
        "ncaa-translator {} (settings {}, names {})",
        env!("CARGO_PKG_VERSION"),
        paths.settings.display(),
        paths.names.display()
    );

    if mode == RunMode::Once {
        let report = run_cycle(&api, &paths).await?;
        report.log();
        return Ok(());
    }

    let initial = match Settings::load(&paths.settings) {
        Ok(settings) => settings.interval(),
        Err(e) => {
            warn!("{e}; using a {}s interval until it loads", DEFAULT_INTERVAL.as_secs());
            DEFAULT_INTERVAL
        }
    };

    let (cycle_req_tx, cycle_req_rx) = mpsc::channel::<CycleRequest>(1);
    let (cycle_resp_tx, cycle_resp_rx) = mpsc::channel::<CycleResponse>(8);
    let (interval_tx, interval_rx) = watch::channel(initial);

    // Cycle thread
    let worker = CycleWorker::new(api, paths, cycle_req_rx, cycle_resp_tx);
    let worker_task = tokio::spawn(worker.run());

    // Timer thread
    let refresher = PeriodicRefresher::new(cycle_req_tx.clone(), interval_rx);
    let refresher_task = tokio::spawn(refresher.run());

    let _ = cycle_req_tx.send(CycleRequest::Startup).await;

    main_loop(cycle_resp_rx, interval_tx).await;

    refresher_task.abort();
    worker_task.abort();

    Ok(())
}

fn handle_cli_args() -> Option<RunMode> {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return Some(RunMode::Forever);
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            None
        }
        "-V" | "--version" => {
            println!("ncaa-translator {}", env!("CARGO_PKG_VERSION"));
            None
        }
        "--once" => Some(RunMode::Once),
        _ => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn usage_text() -> &'static str {
    "ncaa-translator - NCAA scoreboard relay for on-air graphics

Usage:
  ncaa-translator           poll on the configured timer until Ctrl-C
  ncaa-translator --once    run a single cycle and exit
  ncaa-translator --help
  ncaa-translator --version

Environment:
  NCAA_TRANSLATOR_SETTINGS  Settings file (default Settings.json)
  NCAA_TRANSLATOR_NAMES     Team/conference name table (default NcaaNameConverter.json)
  RUST_LOG                  Log filter (default info)"
}

async fn main_loop(
    mut cycle_responses: mpsc::Receiver<CycleResponse>,
    interval: watch::Sender<Duration>,
) {
    loop {
        tokio::select! {
            response = cycle_responses.recv() => {
                let Some(response) = response else {
                    error!("cycle worker stopped");
                    break;
                };
                handle_cycle_response(response, &interval);
            }

            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }
}

fn handle_cycle_response(response: CycleResponse, interval: &watch::Sender<Duration>) {
    match response {
        CycleResponse::Completed { report, elapsed } => {
            report.log();
            info!(
                "cycle finished in {} ms, {} sport(s) written",
                elapsed.as_millis(),
                report.emitted()
            );
            interval.send_if_modified(|current| {
                if *current == report.interval {
                    return false;
                }
                *current = report.interval;
                true
            });
        }
        CycleResponse::Aborted { error } => {
            error!("cycle aborted: {error}");
        }
    }
}
