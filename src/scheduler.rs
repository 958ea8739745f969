// src/scheduler.rs
//! Fixed-interval driver for the pipeline, plus delivery of the results.
//!
//! The pipeline never overlaps itself: a tick that lands while a cycle is
//! still in flight is skipped, not queued.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::notify::RoomNotifier;
use crate::pipeline::Pipeline;

/// Announced to the room when a whole cycle fails, so the channel doesn't go
/// silently stale.
const FAILURE_NOTICE: &str =
    "Could not fetch sovereignty notifications this cycle; will retry next interval.";

#[derive(Clone, Copy, Debug)]
pub struct PollerCfg {
    pub interval_secs: u64,
}

pub fn spawn_poller(
    pipeline: Arc<Pipeline>,
    notifier: Arc<dyn RoomNotifier>,
    cfg: PollerCfg,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(cfg.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(outcome) = pipeline.try_run_cycle().await else {
                warn!("previous cycle still in flight, skipping tick");
                continue;
            };
            match outcome {
                Ok(messages) => {
                    for message in &messages {
                        if let Err(e) = notifier.post(message).await {
                            warn!(error = ?e, "failed to deliver announcement");
                        }
                    }
                    info!(delivered = messages.len(), "poll tick done");
                }
                Err(e) => {
                    warn!(stage = %e.stage, error = ?e, "cycle failed");
                    if let Err(e) = notifier.post(FAILURE_NOTICE).await {
                        warn!(error = ?e, "failed to deliver failure notice");
                    }
                }
            }
        }
    })
}
