//! `sparselap` — Sparse linear-assignment (LAP) tracking core.
//!
//! Links detected objects into trajectories in two stages: frame-to-frame
//! linking, then segment-level gap closing, merging and splitting. Both
//! stages reduce to large, mostly-empty linear assignment problems solved
//! exactly with a Jonker–Volgenant algorithm that operates directly on a
//! sparse cost matrix.
//!
//! # Module layout
//! - [`types`]           — Object ids, trackable objects, per-frame collection
//! - [`error`]           — Error taxonomy
//! - [`config`]          — Validated tracker configuration
//! - [`matrix`]          — Compressed row-sparse cost matrix
//! - [`cost`]            — Square-distance / feature-penalty cost functions
//! - [`builder`]         — Candidate buffers and cost-matrix builders
//! - [`graph`]           — Weighted undirected link graph
//! - [`segments`]        — Track-segment decomposition (union-find)
//! - [`solver`]          — Sparse Jonker–Volgenant LAP solver
//! - [`linker`]          — Four-quadrant assembly and no-link semantics
//! - [`frame_tracker`]   — Stage 1: parallel frame-to-frame linking
//! - [`segment_tracker`] — Stage 2: gap closing / merging / splitting
//! - [`tracker`]         — Full two-stage pipeline orchestrator

pub mod builder;
pub mod config;
pub mod cost;
pub mod error;
pub mod frame_tracker;
pub mod graph;
pub mod linker;
pub mod matrix;
pub mod segment_tracker;
pub mod segments;
pub mod solver;
pub mod tracker;
pub mod types;

pub use config::TrackerConfig;
pub use error::TrackingError;
pub use graph::{LinkEdge, LinkGraph};
pub use matrix::SparseCostMatrix;
pub use solver::SparseLapSolver;
pub use tracker::SparseLapTracker;
pub use types::{ObjectCollection, ObjectId, TrackObject};
