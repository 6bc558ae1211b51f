//! Error types for triangulation construction.

use thiserror::Error;

/// Errors that can occur while building a triangulation from a PSLG.
#[derive(Debug, Error)]
pub enum CdtError {
    /// Fewer than three distinct input points.
    #[error("triangulation needs at least 3 distinct points, found {0}")]
    TooFewPoints(usize),

    /// A segment references a point index that does not exist.
    #[error("segment {segment} references out-of-range point index {index}")]
    SegmentIndexOutOfRange {
        /// Position of the offending segment in the input list.
        segment: usize,
        /// The out-of-range point index.
        index: usize,
    },

    /// A segment joins a point to itself.
    #[error("segment {0} joins a point to itself")]
    DegenerateSegment(usize),

    /// An attribute vector has the wrong length.
    #[error("point {point} carries {found} attributes, expected {expected}")]
    AttributeLengthMismatch {
        /// Index of the offending point.
        point: usize,
        /// Number of attributes found.
        found: usize,
        /// Number of attributes on the first point.
        expected: usize,
    },

    /// A constraint segment could not be recovered by edge flips,
    /// which means it crosses another constraint.
    #[error("segment {0} crosses a previously inserted segment")]
    SegmentsCross(usize),
}

/// Result type for triangulation construction.
pub type CdtResult<T> = std::result::Result<T, CdtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CdtError::TooFewPoints(2);
        assert!(format!("{err}").contains('2'));

        let err = CdtError::SegmentIndexOutOfRange {
            segment: 4,
            index: 17,
        };
        assert!(format!("{err}").contains("17"));
    }
}
