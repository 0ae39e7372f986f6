use crate::cycle::{CyclePaths, run_cycle};
use crate::state::messages::{CycleRequest, CycleResponse};
use log::{debug, error};
use ncaa_api::client::NcaaApi;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Runs cycles one at a time, in the order they were requested.
pub struct CycleWorker {
    client: NcaaApi,
    paths: CyclePaths,
    requests: mpsc::Receiver<CycleRequest>,
    responses: mpsc::Sender<CycleResponse>,
}

impl CycleWorker {
    pub fn new(
        client: NcaaApi,
        paths: CyclePaths,
        requests: mpsc::Receiver<CycleRequest>,
        responses: mpsc::Sender<CycleResponse>,
    ) -> Self {
        Self { client, paths, requests, responses }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            debug!("cycle requested ({request:?})");
            let started = Instant::now();

            let response = match run_cycle(&self.client, &self.paths).await {
                Ok(report) => CycleResponse::Completed { report, elapsed: started.elapsed() },
                Err(error) => CycleResponse::Aborted { error },
            };

            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send cycle response: {e}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::CycleError;

    #[tokio::test]
    async fn missing_settings_abort_each_cycle_without_stopping_the_worker() {
        let dir = tempfile::tempdir().unwrap();
        let paths = CyclePaths {
            settings: dir.path().join("Settings.json"),
            names: dir.path().join("Names.json"),
        };
        let (req_tx, req_rx) = mpsc::channel(1);
        let (resp_tx, mut resp_rx) = mpsc::channel(4);
        let task = tokio::spawn(CycleWorker::new(NcaaApi::new(), paths, req_rx, resp_tx).run());

        for request in [CycleRequest::Startup, CycleRequest::Scheduled] {
            req_tx.send(request).await.unwrap();
            let response = resp_rx.recv().await.unwrap();
            assert!(matches!(
                response,
                CycleResponse::Aborted { error: CycleError::ConfigInvalid(_) }
            ));
        }

        drop(req_tx);
        task.await.unwrap();
    }
}
