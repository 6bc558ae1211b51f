//! Consistency checkers: mesh topology and local Delaunay-ness.
//!
//! Both checkers force exact arithmetic on for their predicates and
//! restore the previous setting on every exit path via a drop guard.
//! They are diagnostics: violations are counted and logged, never
//! returned as errors.

use mesh_cdt::Mesh;
use tracing::warn;

/// Report from [`check_mesh`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshCheck {
    /// Neighbor links that do not point back, or whose shared vertices
    /// disagree.
    pub topology_violations: usize,
    /// Domain triangles whose corners are not in counterclockwise order.
    pub orientation_violations: usize,
}

impl MeshCheck {
    /// Whether the triangulation is consistent.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.topology_violations == 0 && self.orientation_violations == 0
    }
}

impl std::fmt::Display for MeshCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_consistent() {
            return write!(f, "mesh topology is consistent");
        }
        let t = self.topology_violations;
        let o = self.orientation_violations;
        if t == 1 {
            write!(f, "1 inconsistent neighbor link")?;
        } else {
            write!(f, "{t} inconsistent neighbor links")?;
        }
        if o == 1 {
            write!(f, " and 1 misoriented triangle")
        } else {
            write!(f, " and {o} misoriented triangles")
        }
    }
}

/// Report from [`check_delaunay`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DelaunayCheck {
    /// Unconstrained interior edges whose opposite apexes fail the
    /// in-circle test.
    pub non_delaunay_edges: usize,
}

impl DelaunayCheck {
    /// Whether every unconstrained interior edge is locally Delaunay.
    #[must_use]
    pub fn is_delaunay(&self) -> bool {
        self.non_delaunay_edges == 0
    }
}

impl std::fmt::Display for DelaunayCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.non_delaunay_edges {
            0 => write!(f, "mesh is constrained Delaunay"),
            1 => write!(f, "1 edge is not locally Delaunay"),
            n => write!(f, "{n} edges are not locally Delaunay"),
        }
    }
}

/// Restores the mesh's exact-arithmetic flag on drop.
struct ExactGuard<'a> {
    mesh: &'a mut Mesh,
    previous: bool,
}

impl<'a> ExactGuard<'a> {
    fn new(mesh: &'a mut Mesh) -> Self {
        let previous = mesh.set_exact_arithmetic(true);
        Self { mesh, previous }
    }
}

impl Drop for ExactGuard<'_> {
    fn drop(&mut self) {
        self.mesh.set_exact_arithmetic(self.previous);
    }
}

/// Verify the triangulation's topology: every neighbor link must point
/// back, shared vertices must agree, and every domain triangle must be
/// counterclockwise.
pub fn check_mesh(mesh: &mut Mesh) -> MeshCheck {
    let guard = ExactGuard::new(mesh);
    let mesh = &*guard.mesh;

    let mut report = MeshCheck::default();
    for ot in mesh.live_triangles() {
        for edge in [ot, ot.lnext(), ot.lprev()] {
            let s = mesh.sym(edge);
            if s.is_boundary() {
                continue;
            }
            if mesh.tri_is_dead(s) {
                warn!(?edge, "neighbor link points at a dead triangle");
                report.topology_violations += 1;
                continue;
            }
            if mesh.sym(s) != edge {
                warn!(?edge, "asymmetric neighbor link");
                report.topology_violations += 1;
            }
            if mesh.org(s) != mesh.dest(edge) || mesh.dest(s) != mesh.org(edge) {
                warn!(?edge, "neighbor disagrees on the shared edge");
                report.topology_violations += 1;
            }
        }
        if mesh.tri_is_finite(ot)
            && mesh.counterclockwise(mesh.org(ot), mesh.dest(ot), mesh.apex(ot)) <= 0.0
        {
            warn!(?ot, "triangle is not counterclockwise");
            report.orientation_violations += 1;
        }
    }
    if report.is_consistent() {
        tracing::debug!("{report}");
    } else {
        warn!("{report}");
    }
    report
}

/// Verify that every unconstrained interior edge is locally Delaunay.
/// Edges bounded by the infinite vertices and edges carrying a
/// constrained subsegment are excluded.
pub fn check_delaunay(mesh: &mut Mesh) -> DelaunayCheck {
    let guard = ExactGuard::new(mesh);
    let mesh = &*guard.mesh;

    let mut report = DelaunayCheck::default();
    for ot in mesh.live_triangles() {
        for edge in [ot, ot.lnext(), ot.lprev()] {
            let s = mesh.sym(edge);
            if s.is_boundary() || mesh.tri_is_dead(s) {
                continue;
            }
            // Visit each interior edge once.
            if s.id() < edge.id() {
                continue;
            }
            if !mesh.seg_pivot(edge).is_none() {
                continue;
            }
            let (org, dest, apex) = (mesh.org(edge), mesh.dest(edge), mesh.apex(edge));
            let far = mesh.apex(s);
            if [org, dest, apex, far]
                .into_iter()
                .any(|v| mesh.is_infinite(v))
            {
                continue;
            }
            if mesh.non_regular(org, dest, apex, far) > 0.0 {
                warn!(?edge, "edge is not locally Delaunay");
                report.non_delaunay_edges += 1;
            }
        }
    }
    if report.is_delaunay() {
        tracing::debug!("{report}");
    } else {
        warn!("{report}");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_cdt::{Point2, Pslg};

    fn build(points: Vec<Point2<f64>>, segments: Vec<[usize; 2]>) -> Mesh {
        Mesh::triangulate(&Pslg::from_points(points).with_segments(segments)).unwrap()
    }

    #[test]
    fn fresh_triangulation_is_consistent() {
        let mut mesh = build(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(2.0, 1.0),
                Point2::new(0.0, 1.0),
                Point2::new(1.0, 0.5),
            ],
            vec![[0, 1], [1, 2], [2, 3], [3, 0]],
        );
        assert!(check_mesh(&mut mesh).is_consistent());
        assert!(check_delaunay(&mut mesh).is_delaunay());
    }

    #[test]
    fn exact_setting_restored() {
        let mut mesh = build(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
            ],
            vec![],
        );
        mesh.set_exact_arithmetic(false);
        let _ = check_mesh(&mut mesh);
        assert!(!mesh.exact_arithmetic());
        mesh.set_exact_arithmetic(true);
        let _ = check_delaunay(&mut mesh);
        assert!(mesh.exact_arithmetic());
    }

    #[test]
    fn reports_read_naturally() {
        let one = MeshCheck {
            topology_violations: 1,
            orientation_violations: 0,
        };
        assert!(format!("{one}").contains("1 inconsistent neighbor link and"));
        let many = DelaunayCheck {
            non_delaunay_edges: 3,
        };
        assert!(format!("{many}").contains("3 edges"));
    }
}
