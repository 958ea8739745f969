// src/pipeline.rs
//! The per-invocation pipeline: fetch, merge, resolve, filter, render.
//!
//! Strictly sequential; each stage depends on the previous stage's full
//! output. A stage failure aborts the cycle wholesale — nothing rendered so
//! far is delivered, and retry means the scheduler invoking the next cycle.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::dedup::{SeenRecord, SeenStore};
use crate::directory::{collect_actor_ids, Directory, NameDirectory};
use crate::feed::NotificationFeed;
use crate::merge::{merge, NotificationKind};
use crate::render::Renderer;
use crate::sde::ReferenceData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchHeaders,
    FetchBodies,
    Merge,
    ResolveDirectory,
    FilterAndRender,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::FetchHeaders => "fetch-headers",
            Stage::FetchBodies => "fetch-bodies",
            Stage::Merge => "merge",
            Stage::ResolveDirectory => "resolve-directory",
            Stage::FilterAndRender => "filter-and-render",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("pipeline failed at {stage}: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: anyhow::Error,
}

impl PipelineError {
    fn at(stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

pub struct Pipeline {
    feed: Arc<dyn NotificationFeed>,
    directory: Arc<dyn NameDirectory>,
    seen: SeenStore,
    sde: Arc<dyn ReferenceData>,
    supported: HashSet<NotificationKind>,
    // One cycle in flight at a time; concurrent cycles would double-fetch
    // bodies and race on dedup writes.
    busy: tokio::sync::Mutex<()>,
}

impl Pipeline {
    pub fn new(
        feed: Arc<dyn NotificationFeed>,
        directory: Arc<dyn NameDirectory>,
        seen: SeenStore,
        sde: Arc<dyn ReferenceData>,
        supported: HashSet<NotificationKind>,
    ) -> Self {
        Self {
            feed,
            directory,
            seen,
            sde,
            supported,
            busy: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one cycle, waiting for any in-flight cycle to finish first.
    pub async fn run_cycle(&self) -> Result<Vec<String>, PipelineError> {
        let _guard = self.busy.lock().await;
        self.run_cycle_locked().await
    }

    /// Run one cycle unless another is already in flight, in which case
    /// `None` is returned and nothing happens.
    pub async fn try_run_cycle(&self) -> Option<Result<Vec<String>, PipelineError>> {
        let _guard = self.busy.try_lock().ok()?;
        Some(self.run_cycle_locked().await)
    }

    async fn run_cycle_locked(&self) -> Result<Vec<String>, PipelineError> {
        let headers = self
            .feed
            .fetch_headers()
            .await
            .map_err(|e| PipelineError::at(Stage::FetchHeaders, e))?;
        debug!(count = headers.len(), "fetched headers");

        // Bodies are only requested for ids we would actually announce.
        let wanted: BTreeSet<u64> = headers
            .iter()
            .filter(|h| {
                NotificationKind::from_type_id(h.type_id)
                    .is_some_and(|k| self.supported.contains(&k))
            })
            .map(|h| h.id)
            .collect();
        let bodies = self
            .feed
            .fetch_bodies(&wanted)
            .await
            .map_err(|e| PipelineError::at(Stage::FetchBodies, e))?;
        debug!(count = bodies.len(), "fetched bodies");

        let notifications = merge(headers, bodies, &self.supported);

        let actor_ids = collect_actor_ids(&notifications);
        let names = self
            .directory
            .resolve(&actor_ids)
            .await
            .map_err(|e| PipelineError::at(Stage::ResolveDirectory, e))?;
        let directory = Directory::new(names);

        let renderer = Renderer::new(self.sde.as_ref(), &directory);
        let mut messages = Vec::new();
        for n in &notifications {
            let is_new = self
                .seen
                .is_new(n.id)
                .await
                .map_err(|e| PipelineError::at(Stage::FilterAndRender, e))?;
            if !is_new {
                debug!(id = n.id, "skipping repeat notification");
                continue;
            }
            let message = renderer.render(n);
            // Record only after a message exists: a crash in between costs
            // at most a duplicate announcement, never a lost one.
            self.seen
                .record_seen(SeenRecord::from(n))
                .await
                .map_err(|e| PipelineError::at(Stage::FilterAndRender, e))?;
            messages.push(message);
        }

        info!(
            merged = notifications.len(),
            announced = messages.len(),
            "cycle complete"
        );
        Ok(messages)
    }
}
