//! Pipeline orchestrator: the full two-stage tracking run.
//!
//! # Processing steps per run
//! 1. Validate the configuration (exactly once, before any computation)
//! 2. Frame-to-frame linking, parallel over frame pairs (barrier at the end)
//! 3. Segment linking — gap closing / merging / splitting — if enabled
//!
//! Both stages run on a single run-scoped worker pool; nothing in the core
//! spawns its own threads per call.

use crate::config::TrackerConfig;
use crate::error::TrackingError;
use crate::graph::LinkGraph;
use crate::types::ObjectCollection;
use crate::{frame_tracker, segment_tracker};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// The two-stage sparse LAP tracker. Holds the validated configuration and
/// the worker pool for the run.
pub struct SparseLapTracker {
    config: TrackerConfig,
    pool: rayon::ThreadPool,
    cancel: Arc<AtomicBool>,
}

impl SparseLapTracker {
    /// Create a tracker, validating the configuration and building the
    /// worker pool (`num_threads` of 0 means the host CPU count).
    pub fn new(config: TrackerConfig) -> Result<Self, TrackingError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build()
            .map_err(|e| TrackingError::Configuration {
                field: "num_threads",
                message: format!("could not build the worker pool: {e}"),
            })?;
        Ok(Self {
            config,
            pool,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Cooperative cancellation flag: raise it from another thread to
    /// abandon the run between frame pairs and between solver phases.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run both tracking stages and return the link graph.
    ///
    /// On failure the graph is discarded: a partially linked result is
    /// never reported as success.
    pub fn track(&self, collection: &ObjectCollection) -> Result<LinkGraph, TrackingError> {
        if collection.is_empty() {
            warn!("object collection is empty: returning an empty link graph");
            return Ok(LinkGraph::new(0));
        }

        let graph = Mutex::new(LinkGraph::new(collection.len()));
        self.pool.install(|| {
            frame_tracker::process(collection, &self.config, &graph, &self.cancel)
        })?;

        let mut graph = graph.into_inner().expect("link graph lock");

        if self.config.segment_stage_enabled() {
            self.pool.install(|| {
                segment_tracker::process(collection, &self.config, &mut graph, &self.cancel)
            })?;
        } else {
            debug!("segment stage disabled");
        }

        Ok(graph)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
