// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::pipeline::Pipeline;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval_secs: u64,
}

/// One scheduled cycle: every category board, then the overall board.
/// Returns how many category runs succeeded.
pub async fn run_cycle(pipeline: &Pipeline) -> usize {
    let results = pipeline.run_all().await;
    let mut ok = 0usize;
    for (category, res) in &results {
        match res {
            Ok(_) => ok += 1,
            Err(e) if e.is_hard_failure() => {
                tracing::error!(target: "scheduler", category = %category, error = %e, "category run failed");
            }
            Err(e) => {
                tracing::warn!(target: "scheduler", category = %category, error = %e, "category run skipped");
            }
        }
    }
    if let Err(e) = pipeline.run_overall().await {
        tracing::error!(target: "scheduler", error = %e, "overall run failed");
    }
    counter!("trends_scheduler_runs_total").increment(1);
    ok
}

/// Spawn the periodic refresh. The first cycle runs immediately.
pub fn spawn_scheduler(cfg: SchedulerCfg, pipeline: Arc<Pipeline>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let ok = run_cycle(&pipeline).await;
            tracing::info!(target: "scheduler", ok, "scheduled refresh tick");
        }
    })
}
