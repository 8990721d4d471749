//! Error taxonomy of the tracking core.
//!
//! Builder- and solver-level failures are deterministic, so nothing here is
//! retried: configuration problems abort before any computation, internal
//! invariant violations abort the run, and the frame-to-frame stage wraps
//! failures with the frame pair they occurred in.

use thiserror::Error;

/// All failure modes of the tracking core.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// Invalid or missing configuration value. Surfaced before any
    /// computation starts.
    #[error("invalid configuration: {field}: {message}")]
    Configuration { field: &'static str, message: String },

    /// Internal sparse-matrix invariant violation (unsorted columns,
    /// mismatched array lengths, out-of-range column index). Always a
    /// programming error in a builder; never recoverable.
    #[error("malformed cost matrix: {0}")]
    MalformedMatrix(String),

    /// The same (source, target) pair was observed twice while building a
    /// cost matrix; indicates an upstream logic bug such as an object
    /// appearing twice in an input list.
    #[error("duplicate assignment for source {source_id} and target {target}")]
    DuplicateAssignment { source_id: String, target: String },

    /// A NaN or negative cost was observed. Detected at the point of
    /// production so it can never corrupt the solver's dual variables.
    #[error("numeric error: {0}")]
    Numeric(String),

    /// A failure in one frame pair of the frame-to-frame stage.
    #[error("linking frame {frame0} to frame {frame1}: {source}")]
    FramePair {
        frame0: i64,
        frame1: i64,
        #[source]
        source: Box<TrackingError>,
    },

    /// The run was abandoned through the cooperative cancellation flag.
    #[error("tracking cancelled")]
    Cancelled,
}

impl TrackingError {
    /// Wrap this error with the frame pair it occurred in.
    pub fn in_frame_pair(self, frame0: i64, frame1: i64) -> TrackingError {
        TrackingError::FramePair {
            frame0,
            frame1,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_pair_context_is_rendered() {
        let err = TrackingError::Numeric("cost is NaN".to_string()).in_frame_pair(3, 5);
        let msg = err.to_string();
        assert!(msg.contains("frame 3"), "missing frame context: {msg}");
        assert!(msg.contains("NaN"), "missing inner message: {msg}");
    }
}
