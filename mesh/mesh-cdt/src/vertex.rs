//! Vertex records.

use nalgebra::Point2;

/// Classification of a vertex within the triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    /// A vertex supplied in the input point set.
    Input,
    /// A vertex lying on a constrained subsegment (an input vertex
    /// incident to a segment, or a Steiner point produced by a segment
    /// split).
    Segment,
    /// A free Steiner point inserted in the interior.
    Free,
    /// A vertex that has been deleted; the slot is kept so identifiers
    /// stay stable.
    Removed,
}

/// A vertex of the triangulation.
///
/// Vertices carry a position, a uniform-length attribute vector that is
/// interpolated whenever the mesher manufactures a new vertex, and an
/// integer boundary mark.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// Position in the plane.
    pub position: Point2<f64>,
    /// Attribute values; length equals [`crate::Mesh::attr_count`].
    pub attrs: Vec<f64>,
    /// Boundary mark (0 = interior, input marks otherwise).
    pub mark: i32,
    /// Classification.
    pub kind: VertexKind,
}

impl Vertex {
    /// Create a vertex with no attributes.
    #[must_use]
    pub fn new(position: Point2<f64>, kind: VertexKind) -> Self {
        Self {
            position,
            attrs: Vec::new(),
            mark: 0,
            kind,
        }
    }

    /// Create a vertex from raw coordinates with no attributes.
    #[must_use]
    pub fn from_coords(x: f64, y: f64, kind: VertexKind) -> Self {
        Self::new(Point2::new(x, y), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_coords_sets_position() {
        let v = Vertex::from_coords(1.5, -2.0, VertexKind::Input);
        assert!((v.position.x - 1.5).abs() < f64::EPSILON);
        assert!((v.position.y + 2.0).abs() < f64::EPSILON);
        assert!(v.attrs.is_empty());
        assert_eq!(v.mark, 0);
    }
}
