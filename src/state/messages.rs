use crate::cycle::{CycleError, CycleReport};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleRequest {
    /// First cycle, run as soon as the process is up.
    Startup,
    /// Timer tick.
    Scheduled,
}

#[derive(Debug)]
pub enum CycleResponse {
    Completed { report: CycleReport, elapsed: Duration },
    /// Settings or name table unusable; the next tick retries from scratch.
    Aborted { error: CycleError },
}
