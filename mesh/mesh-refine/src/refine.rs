//! The refinement driver and its two splitters.
//!
//! Encroached subsegments are always repaired before any triangle is
//! touched. Each triangle split inserts a circumcenter (or off-center)
//! and is rolled back if the new vertex would encroach upon a
//! subsegment; the encroachments it exposed are then repaired before the
//! triangle is retried.

// Geometry code uses the conventional short names for coordinates.
#![allow(clippy::many_single_char_names)]

use mesh_cdt::{
    predicates, FlawObserver, InsertStatus, Mesh, Osub, Otri, Point2, Vertex, VertexKind,
};
use tracing::{debug, info, warn};

use crate::error::{RefineError, RefineResult};
use crate::params::{Derived, RefineParams};
use crate::quality::{check_subseg_encroach, enqueue_broken_subseg, test_triangle};
use crate::queues::{BadSubsegQueue, BadTriangle, BadTriangleQueue};
use crate::result::RefineReport;

/// Refine `mesh` until every triangle satisfies `params`, or the Steiner
/// budget runs out.
///
/// On success the mesh is consistent, no subsegment is encroached
/// (unless the budget ran out first), and the report carries the run's
/// statistics.
///
/// # Errors
///
/// [`RefineError::PrecisionExhausted`] when a required split point
/// coincides with an existing vertex, and
/// [`RefineError::UnexpectedInsertion`] when the mesh rejects a segment
/// split. The mesh is left in its last consistent state.
pub fn enforce_quality(mesh: &mut Mesh, params: &RefineParams) -> RefineResult<RefineReport> {
    let mut refiner = Refiner::new(params);
    let result = refiner.run(mesh);
    result.map(|()| {
        let mut report = refiner.report;
        report.steiner_remaining = refiner.steiner_left;
        info!(
            steiner = report.steiner_points,
            segment_splits = report.segment_splits,
            triangle_splits = report.triangle_splits,
            "refinement finished"
        );
        report
    })
}

struct Refiner<'p> {
    params: &'p RefineParams,
    derived: Derived,
    bad_subsegs: BadSubsegQueue,
    bad_tris: BadTriangleQueue,
    steiner_left: Option<usize>,
    report: RefineReport,
}

/// Observer handed to `Mesh::insert_vertex`: it runs the encroachment
/// and quality tests and feeds the refiner's queues.
struct FlawMonitor<'a, 'p> {
    params: &'p RefineParams,
    derived: &'a Derived,
    bad_subsegs: &'a mut BadSubsegQueue,
    bad_tris: &'a mut BadTriangleQueue,
}

impl FlawObserver for FlawMonitor<'_, '_> {
    fn subsegment_suspect(&mut self, mesh: &Mesh, os: Osub) -> bool {
        check_subseg_encroach(mesh, self.params, self.derived, self.bad_subsegs, os) != 0
    }

    fn subsegment_broken(&mut self, mesh: &Mesh, os: Osub) {
        enqueue_broken_subseg(mesh, self.params, self.bad_subsegs, os);
    }

    fn triangle_suspect(&mut self, mesh: &Mesh, ot: Otri) {
        test_triangle(mesh, self.params, self.derived, self.bad_tris, ot);
    }
}

impl<'p> Refiner<'p> {
    fn new(params: &'p RefineParams) -> Self {
        Self {
            params,
            derived: Derived::from_params(params),
            bad_subsegs: BadSubsegQueue::default(),
            bad_tris: BadTriangleQueue::default(),
            steiner_left: params.steiner_limit,
            report: RefineReport::default(),
        }
    }

    fn run(&mut self, mesh: &mut Mesh) -> RefineResult<()> {
        self.tally_encroached(mesh);
        self.split_encroached_segments(mesh, false)?;

        if self.params.wants_triangle_quality() {
            self.tally_faces(mesh);
            while self.steiner_left != Some(0) {
                let Some(bad) = self.bad_tris.pop() else {
                    break;
                };
                self.split_triangle(mesh, &bad)?;
                if !self.bad_subsegs.is_empty() {
                    // The split exposed encroachments: retry the triangle
                    // after they are repaired.
                    self.bad_tris.push(bad);
                    self.split_encroached_segments(mesh, true)?;
                }
            }
        }

        if self.params.ruppert && self.steiner_left == Some(0) && !self.bad_subsegs.is_empty() {
            warn!(
                "Steiner budget exhausted with encroached subsegments remaining; \
                 the triangulation is not conforming Delaunay"
            );
        }
        self.bad_subsegs.clear();
        self.bad_tris.clear();
        Ok(())
    }

    /// Seed the subsegment queue from every live subsegment.
    fn tally_encroached(&mut self, mesh: &Mesh) {
        for os in mesh.subsegments() {
            check_subseg_encroach(
                mesh,
                self.params,
                &self.derived,
                &mut self.bad_subsegs,
                os,
            );
        }
    }

    /// Seed the triangle queue from every domain triangle.
    fn tally_faces(&mut self, mesh: &Mesh) {
        for ot in mesh.triangles() {
            test_triangle(mesh, self.params, &self.derived, &mut self.bad_tris, ot);
        }
    }

    fn consume_steiner(&mut self) {
        self.report.steiner_points += 1;
        if let Some(left) = &mut self.steiner_left {
            *left = left.saturating_sub(1);
        }
    }

    /// Drain the encroached-subsegment queue (component E).
    fn split_encroached_segments(
        &mut self,
        mesh: &mut Mesh,
        tri_flaws: bool,
    ) -> RefineResult<()> {
        while self.steiner_left != Some(0) {
            let Some(bad) = self.bad_subsegs.pop() else {
                break;
            };
            let os = bad.handle;
            if mesh.subseg_is_dead(os)
                || mesh.sub_org(os) != bad.org
                || mesh.sub_dest(os) != bad.dest
            {
                self.report.stale_entries += 1;
                continue;
            }
            self.split_segment(mesh, os, tri_flaws)?;
        }
        Ok(())
    }

    fn split_segment(&mut self, mesh: &mut Mesh, os: Osub, tri_flaws: bool) -> RefineResult<()> {
        let e0 = mesh.sub_org(os);
        let e1 = mesh.sub_dest(os);
        let p0 = mesh.position(e0);
        let p1 = mesh.position(e1);

        let (acute_org, acute_dest) = self.endpoint_acuteness(mesh, os);

        // Chew's variant deletes free vertices inside the diametral
        // circle before splitting, so the new vertex keeps its clearance.
        if !self.params.ruppert && !acute_org && !acute_dest {
            self.clear_diametral_circle(mesh, os, p0, p1, tri_flaws);
        }

        let t = split_parameter(p0, p1, acute_org, acute_dest);

        let mut position = Point2::new(p0.x + t * (p1.x - p0.x), p0.y + t * (p1.y - p0.y));
        if !self.params.no_exact_split {
            // One step of collinearity refinement: project the rounding
            // error out along the segment normal, using the exact signed
            // area.
            let ccw = predicates::orient2d(p0, p1, position, mesh.exact_arithmetic());
            let divisor =
                (p0.x - p1.x) * (p0.x - p1.x) + (p0.y - p1.y) * (p0.y - p1.y);
            if ccw != 0.0 && divisor != 0.0 {
                let multiplier = ccw / divisor;
                if multiplier.is_finite() {
                    position.x += multiplier * (p1.y - p0.y);
                    position.y += multiplier * (p0.x - p1.x);
                }
            }
        }

        if position == p0 || position == p1 {
            warn!(
                x = position.x,
                y = position.y,
                "segment split point coincides with an endpoint"
            );
            return Err(RefineError::PrecisionExhausted {
                x: position.x,
                y: position.y,
            });
        }

        let v0 = mesh.vertex(e0);
        let v1 = mesh.vertex(e1);
        let attrs = v0
            .attrs
            .iter()
            .zip(&v1.attrs)
            .map(|(a0, a1)| a0 + t * (a1 - a0))
            .collect();
        let vertex = Vertex {
            position,
            attrs,
            mark: mesh.sub_mark(os),
            kind: VertexKind::Segment,
        };

        let mut seg = os;
        let start = mesh.tri_pivot(os);
        let mut monitor = FlawMonitor {
            params: self.params,
            derived: &self.derived,
            bad_subsegs: &mut self.bad_subsegs,
            bad_tris: &mut self.bad_tris,
        };
        let status = mesh.insert_vertex(vertex, start, Some(&mut seg), true, tri_flaws, &mut monitor);
        match status {
            InsertStatus::Successful | InsertStatus::Encroaching => {}
            status => return Err(RefineError::UnexpectedInsertion { status }),
        }
        self.consume_steiner();
        self.report.segment_splits += 1;
        debug!(t, "subsegment split");

        // Re-examine the two halves.
        check_subseg_encroach(mesh, self.params, &self.derived, &mut self.bad_subsegs, seg);
        let second = mesh.next_subseg(seg);
        if !second.is_none() {
            check_subseg_encroach(
                mesh,
                self.params,
                &self.derived,
                &mut self.bad_subsegs,
                second,
            );
        }
        Ok(())
    }

    /// An endpoint is acute when another subsegment meets the split
    /// subsegment there, detected by pivoting to the flanking edges of
    /// both adjoining triangles.
    fn endpoint_acuteness(&self, mesh: &Mesh, os: Osub) -> (bool, bool) {
        let mut acute_org = false;
        let mut acute_dest = false;
        for (side, swapped) in [(os, false), (os.sym(), true)] {
            let t = mesh.tri_pivot(side);
            if t.is_boundary() || mesh.tri_is_dead(t) || mesh.is_infinite(mesh.apex(t)) {
                continue;
            }
            let at_org = !mesh.seg_pivot(t.lprev()).is_none();
            let at_dest = !mesh.seg_pivot(t.lnext()).is_none();
            if swapped {
                acute_org |= at_dest;
                acute_dest |= at_org;
            } else {
                acute_org |= at_org;
                acute_dest |= at_dest;
            }
        }
        (acute_org, acute_dest)
    }

    /// Delete free vertices strictly inside the subsegment's diametral
    /// circle, on both sides. With `tri_flaws`, the triangles filling
    /// each cavity are re-tested.
    fn clear_diametral_circle(
        &mut self,
        mesh: &mut Mesh,
        os: Osub,
        p0: Point2<f64>,
        p1: Point2<f64>,
        tri_flaws: bool,
    ) {
        for side in [os, os.sym()] {
            loop {
                let t = mesh.tri_pivot(side);
                if t.is_boundary() || mesh.tri_is_dead(t) {
                    break;
                }
                let apex = mesh.apex(t);
                if mesh.is_infinite(apex) || mesh.vertex(apex).kind != VertexKind::Free {
                    break;
                }
                let pa = mesh.position(apex);
                let dot = (p0.x - pa.x) * (p1.x - pa.x) + (p0.y - pa.y) * (p1.y - pa.y);
                if dot >= 0.0 {
                    break;
                }
                if tri_flaws {
                    let mut monitor = FlawMonitor {
                        params: self.params,
                        derived: &self.derived,
                        bad_subsegs: &mut self.bad_subsegs,
                        bad_tris: &mut self.bad_tris,
                    };
                    mesh.delete_vertex(t.lprev(), &mut monitor);
                } else {
                    mesh.delete_vertex(t.lprev(), &mut mesh_cdt::NoopObserver);
                }
                self.report.cleared_vertices += 1;
            }
        }
    }

    /// Split one flawed triangle (component F).
    fn split_triangle(&mut self, mesh: &mut Mesh, bad: &BadTriangle) -> RefineResult<()> {
        let ot = bad.handle;
        if mesh.tri_is_dead(ot)
            || mesh.org(ot) != bad.org
            || mesh.dest(ot) != bad.dest
            || mesh.apex(ot) != bad.apex
        {
            self.report.stale_entries += 1;
            return Ok(());
        }

        let po = mesh.position(bad.org);
        let pd = mesh.position(bad.dest);
        let pa = mesh.position(bad.apex);

        // The off-center relocation misbehaves under area constraints;
        // fall back to the plain circumcenter there.
        let area_constrained = self.params.max_area.is_some() || self.params.var_area;
        let off_constant = if area_constrained {
            0.0
        } else {
            self.derived.off_constant
        };
        let (position, xi, eta) =
            predicates::find_circumcenter(po, pd, pa, off_constant, mesh.exact_arithmetic());

        if position == po || position == pd || position == pa {
            warn!(
                x = position.x,
                y = position.y,
                "new vertex falls on an existing vertex"
            );
            return Err(RefineError::PrecisionExhausted {
                x: position.x,
                y: position.y,
            });
        }

        let vo = mesh.vertex(bad.org);
        let vd = mesh.vertex(bad.dest);
        let va = mesh.vertex(bad.apex);
        let attrs = vo
            .attrs
            .iter()
            .zip(&vd.attrs)
            .zip(&va.attrs)
            .map(|((o, d), a)| o + xi * (d - o) + eta * (a - o))
            .collect();
        let vertex = Vertex {
            position,
            attrs,
            mark: 0,
            kind: VertexKind::Free,
        };

        // Start the search on an edge the new point lies left of.
        let start = if eta < xi { ot.lprev() } else { ot };

        let mut monitor = FlawMonitor {
            params: self.params,
            derived: &self.derived,
            bad_subsegs: &mut self.bad_subsegs,
            bad_tris: &mut self.bad_tris,
        };
        match mesh.insert_vertex(vertex, start, None, true, true, &mut monitor) {
            InsertStatus::Successful => {
                self.consume_steiner();
                self.report.triangle_splits += 1;
            }
            InsertStatus::Encroaching => {
                // The subsegments it encroached stay queued; the vertex
                // goes away.
                mesh.undo_vertex();
                self.report.rolled_back += 1;
            }
            InsertStatus::Violating => {}
            InsertStatus::Duplicate => {
                warn!(
                    x = position.x,
                    y = position.y,
                    "new vertex falls on an existing vertex"
                );
                return Err(RefineError::PrecisionExhausted {
                    x: position.x,
                    y: position.y,
                });
            }
        }
        Ok(())
    }
}

/// Choose the split parameter along the segment: the midpoint normally,
/// or a power-of-two distance from an acute endpoint so successive
/// splits land on concentric shells and eventually coincide.
fn split_parameter(
    p0: Point2<f64>,
    p1: Point2<f64>,
    acute_org: bool,
    acute_dest: bool,
) -> f64 {
    if !acute_org && !acute_dest {
        return 0.5;
    }
    let length = (p1 - p0).norm();
    let mut shell = 1.0f64;
    while length > 3.0 * shell {
        shell *= 2.0;
    }
    while length < 1.5 * shell {
        shell *= 0.5;
    }
    let split = shell / length;
    if acute_dest && !acute_org {
        1.0 - split
    } else {
        split
    }
}
