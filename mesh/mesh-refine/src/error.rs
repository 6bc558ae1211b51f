//! Error types for quality refinement.

use mesh_cdt::InsertStatus;
use thiserror::Error;

/// Errors that abort a refinement run.
///
/// Recoverable conditions (stale queue entries, rolled-back insertions,
/// duplicate split points on segments that were already split) are
/// handled inside the engine and never surface here.
#[derive(Debug, Error)]
pub enum RefineError {
    /// A computed split point coincides with an existing vertex: the
    /// requested refinement is finer than floating-point coordinates can
    /// represent. The mesh is left in its last consistent state.
    #[error(
        "new vertex ({x:.12e}, {y:.12e}) falls on an existing vertex; \
         the requested refinement exceeds the available precision"
    )]
    PrecisionExhausted {
        /// x coordinate of the rejected vertex.
        x: f64,
        /// y coordinate of the rejected vertex.
        y: f64,
    },

    /// A segment split insertion reported a status the splitter cannot
    /// accept.
    #[error("segment split insertion unexpectedly returned {status:?}")]
    UnexpectedInsertion {
        /// The offending status.
        status: InsertStatus,
    },
}

/// Result type for refinement operations.
pub type RefineResult<T> = std::result::Result<T, RefineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RefineError::PrecisionExhausted { x: 0.5, y: 0.25 };
        let text = format!("{err}");
        assert!(text.contains("precision"));

        let err = RefineError::UnexpectedInsertion {
            status: InsertStatus::Duplicate,
        };
        assert!(format!("{err}").contains("Duplicate"));
    }
}
