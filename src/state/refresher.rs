use crate::state::messages::CycleRequest;
use log::{debug, info};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Used until a settings file has been read successfully.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Ticks on the configured interval and asks the worker for a cycle.
///
/// Requests go through a capacity-1 channel with `try_send`, so a tick that
/// finds a cycle already queued is dropped instead of stacking up behind a
/// slow one. The interval is re-armed whenever the watched value changes.
pub struct PeriodicRefresher {
    cycle_requests: mpsc::Sender<CycleRequest>,
    interval: watch::Receiver<Duration>,
}

impl PeriodicRefresher {
    pub fn new(
        cycle_requests: mpsc::Sender<CycleRequest>,
        interval: watch::Receiver<Duration>,
    ) -> Self {
        Self { cycle_requests, interval }
    }

    pub async fn run(mut self) {
        let mut period = *self.interval.borrow_and_update();
        // First tick one period out; the startup cycle is requested separately.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.cycle_requests.try_send(CycleRequest::Scheduled) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => debug!("cycle still pending, tick skipped"),
                        Err(TrySendError::Closed(_)) => break,
                    }
                }
                changed = self.interval.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next = *self.interval.borrow_and_update();
                    if next != period {
                        info!("cycle interval changed to {}s", next.as_secs());
                        period = next;
                        ticker = interval_at(Instant::now() + period, period);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    }
                }
            }
        }
        debug!("refresher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout};

    #[tokio::test]
    async fn ticks_do_not_pile_up_behind_a_pending_cycle() {
        let (tx, mut rx) = mpsc::channel(1);
        let (_interval_tx, interval_rx) = watch::channel(Duration::from_millis(10));
        let task = tokio::spawn(PeriodicRefresher::new(tx, interval_rx).run());

        sleep(Duration::from_millis(80)).await;
        assert_eq!(rx.try_recv(), Ok(CycleRequest::Scheduled));
        assert!(rx.try_recv().is_err());
        task.abort();
    }

    #[tokio::test]
    async fn interval_change_re_arms_the_timer() {
        let (tx, mut rx) = mpsc::channel(1);
        let (interval_tx, interval_rx) = watch::channel(Duration::from_secs(3600));
        let task = tokio::spawn(PeriodicRefresher::new(tx, interval_rx).run());

        interval_tx.send(Duration::from_millis(10)).unwrap();
        let got = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert_eq!(got, Some(CycleRequest::Scheduled));
        task.abort();
    }

    #[tokio::test]
    async fn stops_when_the_worker_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        let (_interval_tx, interval_rx) = watch::channel(Duration::from_millis(5));
        drop(rx);
        timeout(Duration::from_secs(2), PeriodicRefresher::new(tx, interval_rx).run())
            .await
            .expect("refresher should exit once the channel closes");
    }
}
