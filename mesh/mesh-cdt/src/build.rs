//! Building a constrained Delaunay triangulation from a planar
//! straight-line graph.
//!
//! Construction is incremental: every input point is inserted into an
//! enclosing super-triangle whose corners stay in the mesh as the three
//! infinite vertices, then each constraint segment is recovered by
//! flipping the edges that cross it. Finally the convex hull edges are
//! promoted to boundary subsegments so the domain is fenced off from the
//! exterior padding triangles.

// Geometry code uses the conventional short names for coordinates.
#![allow(clippy::many_single_char_names)]

use hashbrown::HashMap;
use nalgebra::Point2;
use tracing::{debug, warn};

use crate::error::{CdtError, CdtResult};
use crate::handles::{Otri, SubsegId, VertexId};
use crate::insert::{InsertStatus, NoopObserver};
use crate::mesh::Mesh;
use crate::predicates::orient2d;
use crate::vertex::{Vertex, VertexKind};

/// A planar straight-line graph: points plus non-crossing constraint
/// segments between them.
#[derive(Debug, Clone, Default)]
pub struct Pslg {
    /// Input points.
    pub points: Vec<Point2<f64>>,
    /// Optional per-point attribute vectors (all the same length, one per
    /// point, or empty).
    pub point_attrs: Vec<Vec<f64>>,
    /// Optional per-point boundary marks (one per point, or empty).
    pub point_marks: Vec<i32>,
    /// Constraint segments as index pairs into `points`.
    pub segments: Vec<[usize; 2]>,
    /// Optional per-segment boundary marks (one per segment, or empty;
    /// unmarked segments get mark 1).
    pub segment_marks: Vec<i32>,
}

impl Pslg {
    /// A PSLG with the given points and no segments.
    #[must_use]
    pub fn from_points(points: Vec<Point2<f64>>) -> Self {
        Self {
            points,
            ..Self::default()
        }
    }

    /// Attach constraint segments.
    #[must_use]
    pub fn with_segments(mut self, segments: Vec<[usize; 2]>) -> Self {
        self.segments = segments;
        self
    }
}

const SUPER_SCALE: f64 = 1_048_576.0; // 2^20: far enough to keep hull edges Delaunay

impl Mesh {
    /// Build a constrained Delaunay triangulation of a PSLG.
    ///
    /// # Errors
    ///
    /// Fails on fewer than three distinct points, malformed segment
    /// indices, inconsistent attribute lengths, or constraint segments
    /// that cross each other.
    pub fn triangulate(pslg: &Pslg) -> CdtResult<Self> {
        let attr_count = validate(pslg)?;
        let mut mesh = Self::empty(attr_count);
        mesh.make_super_triangle(&pslg.points);

        // Insert the input points, welding exact duplicates.
        let mut ids: Vec<VertexId> = Vec::with_capacity(pslg.points.len());
        let mut seen: HashMap<(u64, u64), VertexId> = HashMap::with_capacity(pslg.points.len());
        let mut distinct = 0usize;
        for (i, &p) in pslg.points.iter().enumerate() {
            let key = point_key(p);
            if let Some(&existing) = seen.get(&key) {
                warn!(point = i, "duplicate input point welded");
                ids.push(existing);
                continue;
            }
            let mut vertex = Vertex::new(p, VertexKind::Input);
            if let Some(attrs) = pslg.point_attrs.get(i) {
                vertex.attrs.clone_from(attrs);
            }
            vertex.mark = pslg.point_marks.get(i).copied().unwrap_or(0);
            let start = mesh.live_start();
            let status =
                mesh.insert_vertex(vertex, start, None, false, false, &mut NoopObserver);
            debug_assert_eq!(status, InsertStatus::Successful);
            let id = VertexId((mesh.vertices.len() - 1) as u32);
            seen.insert(key, id);
            ids.push(id);
            distinct += 1;
        }
        if distinct < 3 {
            return Err(CdtError::TooFewPoints(distinct));
        }

        // Recover the constraint segments.
        for (si, seg) in pslg.segments.iter().enumerate() {
            let a = ids[seg[0]];
            let b = ids[seg[1]];
            if a == b {
                return Err(CdtError::DegenerateSegment(si));
            }
            let mark = pslg.segment_marks.get(si).copied().unwrap_or(1);
            mesh.insert_segment(a, b, mark, si)?;
        }
        // Constraint recovery leaves the pipe regions un-legalized; one
        // Lawson sweep restores the constrained Delaunay property.
        mesh.legalize_all();

        mesh.mark_hull();
        mesh.classify_segment_vertices();
        debug!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            subsegments = mesh.subsegment_count(),
            "triangulation built"
        );
        Ok(mesh)
    }

    fn make_super_triangle(&mut self, points: &[Point2<f64>]) {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let cx = 0.5 * (min_x + max_x);
        let cy = 0.5 * (min_y + max_y);
        let span = (max_x - min_x).max(max_y - min_y).max(1.0);
        let r = span * SUPER_SCALE;

        let corners = [
            Point2::new(cx, cy + 2.0 * r),
            Point2::new(cx - 2.0 * r, cy - r),
            Point2::new(cx + 2.0 * r, cy - r),
        ];
        let ids: Vec<VertexId> = corners
            .iter()
            .map(|&p| self.add_vertex(Vertex::new(p, VertexKind::Input)))
            .collect();
        let tri = self.alloc_tri([ids[0], ids[1], ids[2]]);
        self.recent = Otri::new(tri, 0);
    }

    /// Recover the edge `a`→`b` by flipping the edges crossing it, then
    /// record it (and any collinear sub-pieces) as subsegments.
    fn insert_segment(
        &mut self,
        a: VertexId,
        b: VertexId,
        mark: i32,
        si: usize,
    ) -> CdtResult<()> {
        let mut pieces: Vec<(SubsegId, VertexId)> = Vec::new();
        let mut from = a;
        let mut guard = 0usize;
        while from != b {
            guard += 1;
            if guard > self.vertices.len() + 8 {
                return Err(CdtError::SegmentsCross(si));
            }
            let stop = self.recover_piece(from, b, si)?;
            pieces.push((self.make_subseg(from, stop, mark, si)?, stop));
            from = stop;
        }
        // Link collinear pieces of the same original segment at their
        // shared vertices.
        for pair in pieces.windows(2) {
            let (s0, shared) = pair[0];
            let (s1, _) = pair[1];
            let side0 = usize::from(self.sub(s0).ends[0] != shared);
            self.sub_mut(s0).links[side0] = s1;
            let side1 = usize::from(self.sub(s1).ends[0] != shared);
            self.sub_mut(s1).links[side1] = s0;
        }
        Ok(())
    }

    /// Make the straight edge from `from` toward `b` exist up to the first
    /// collinear vertex; returns that vertex (`b` if none intervenes).
    fn recover_piece(&mut self, from: VertexId, b: VertexId, si: usize) -> CdtResult<VertexId> {
        let pa = self.position(from);
        let pb = self.position(b);

        let mut rounds = 0usize;
        loop {
            rounds += 1;
            if rounds > 64 * (self.tris.len() + 8) {
                return Err(CdtError::SegmentsCross(si));
            }

            // Already an edge (or cut short by a collinear vertex)?
            if let Some(start) = self.handle_with_org(from) {
                if let Some(h) = self.find_edge_around(start, b) {
                    let _ = h;
                    return Ok(b);
                }
            }

            // Find the wedge at `from` containing the ray toward `b`: the
            // spoke pair (u, w) with b strictly left of from→u and
            // strictly right of from→w.
            let spokes = self.star_spokes(from);
            let mut crossing: Option<(VertexId, VertexId)> = None;
            let mut collinear: Option<VertexId> = None;
            for &spoke in &spokes {
                let u = self.dest(spoke);
                let w = self.apex(spoke);
                let pu = self.position(u);
                let toward_u = orient2d(pa, pu, pb, self.exact);
                if toward_u == 0.0 && ahead(pa, pb, pu) {
                    collinear = Some(u);
                    break;
                }
                let pw = self.position(w);
                let toward_w = orient2d(pa, pw, pb, self.exact);
                if toward_u > 0.0 && toward_w < 0.0 {
                    crossing = Some((u, w));
                }
            }
            if let Some(u) = collinear {
                return Ok(u);
            }
            let Some((mut u, mut w)) = crossing else {
                return Err(CdtError::SegmentsCross(si));
            };

            // March the pipe of crossing edges, flipping as we go.
            let mut pipe: Vec<(VertexId, VertexId)> = Vec::new();
            loop {
                let h = self
                    .edge_handle(u, w)
                    .ok_or(CdtError::SegmentsCross(si))?;
                if !self.seg_pivot(h).is_none() {
                    return Err(CdtError::SegmentsCross(si));
                }
                pipe.push((u, w));
                let x = self.apex(self.sym(h));
                if x == b {
                    break;
                }
                let det_x = orient2d(pa, pb, self.position(x), self.exact);
                if det_x == 0.0 {
                    // A vertex sits exactly on the segment; stop the pipe
                    // there and let the outer loop continue past it.
                    break;
                }
                if det_x > 0.0 {
                    w = x;
                } else {
                    u = x;
                }
            }

            // Flip the pipe away (Sloan's method): flip whatever is
            // currently flippable, requeue the rest.
            let mut queue = pipe;
            let mut stall = 0usize;
            while let Some((cu, cw)) = queue.pop() {
                let Some(h) = self.edge_handle(cu, cw) else {
                    continue; // edge vanished in an earlier flip
                };
                {
                    // Earlier flips may have pulled this edge off the
                    // segment; leave it alone if it no longer crosses.
                    let su = orient2d(pa, pb, self.position(cu), self.exact);
                    let sw = orient2d(pa, pb, self.position(cw), self.exact);
                    if !(su < 0.0 && sw > 0.0) {
                        continue;
                    }
                }
                let c = self.apex(h);
                let d = self.apex(self.sym(h));
                let pc = self.position(c);
                let pd = self.position(d);
                let pu = self.position(cu);
                let pw = self.position(cw);
                let convex = orient2d(pd, pw, pc, self.exact) > 0.0
                    && orient2d(pc, pu, pd, self.exact) > 0.0;
                if convex {
                    stall = 0;
                    self.flip(h);
                    let cd_crosses = {
                        let sc = orient2d(pa, pb, pc, self.exact);
                        let sd = orient2d(pa, pb, pd, self.exact);
                        (sc > 0.0 && sd < 0.0) || (sc < 0.0 && sd > 0.0)
                    };
                    if cd_crosses && c != from && d != from && c != b && d != b {
                        queue.insert(0, ordered_crossing(pa, pb, self, c, d));
                    }
                } else {
                    stall += 1;
                    if stall > queue.len() + 4 {
                        return Err(CdtError::SegmentsCross(si));
                    }
                    queue.insert(0, (cu, cw));
                }
            }
            // Loop back: either the edge now exists or a collinear vertex
            // emerged; both are handled at the top.
        }
    }

    /// Flip every unconstrained edge that is not locally Delaunay until
    /// none remain.
    fn legalize_all(&mut self) {
        let mut stack: Vec<Otri> = self
            .live_triangles()
            .flat_map(|ot| [ot, ot.lnext(), ot.lprev()])
            .collect();
        let mut rounds = 0usize;
        while let Some(h) = stack.pop() {
            rounds += 1;
            if rounds > 200 * (self.tris.len() + 8) {
                warn!("global legalization did not settle");
                break;
            }
            if h.is_boundary() || self.tri_is_dead(h) || !self.seg_pivot(h).is_none() {
                continue;
            }
            let s = self.sym(h);
            if s.is_boundary() {
                continue;
            }
            let (a, b, c) = (self.org(h), self.dest(h), self.apex(h));
            let d = self.apex(s);
            if self.non_regular(a, b, c, d) > 0.0 {
                let diag = self.flip(h);
                let sym_diag = self.sym(diag);
                stack.push(diag.lnext());
                stack.push(diag.lprev());
                stack.push(sym_diag.lnext());
                stack.push(sym_diag.lprev());
            }
        }
    }

    fn edge_handle(&self, org: VertexId, dest: VertexId) -> Option<Otri> {
        let start = self.handle_with_org(org)?;
        self.find_edge_around(start, dest)
    }

    /// Record the existing edge `a`→`b` as a subsegment (idempotent).
    fn make_subseg(&mut self, a: VertexId, b: VertexId, mark: i32, si: usize) -> CdtResult<SubsegId> {
        let h = self.edge_handle(a, b).ok_or(CdtError::SegmentsCross(si))?;
        let existing = self.seg_pivot(h);
        if !existing.is_none() {
            return Ok(existing.id());
        }
        let sid = self.alloc_subseg([a, b], mark);
        self.bond_sub(h, sid);
        let s = self.sym(h);
        if !s.is_boundary() {
            self.bond_sub(s, sid);
        }
        Ok(sid)
    }

    /// Promote every convex hull edge (finite triangle against exterior
    /// padding) to a boundary subsegment with mark 1.
    fn mark_hull(&mut self) {
        let hull_edges: Vec<Otri> = self
            .triangles()
            .flat_map(|ot| (0..3u8).map(move |o| Otri::new(ot.tri, o)))
            .filter(|&e| {
                let s = self.sym(e);
                !s.is_boundary()
                    && !self.tri_is_finite(s)
                    && self.seg_pivot(e).is_none()
            })
            .collect();
        for e in hull_edges {
            if !self.seg_pivot(e).is_none() {
                continue; // bonded while handling an earlier edge
            }
            let sid = self.alloc_subseg([self.org(e), self.dest(e)], 1);
            self.bond_sub(e, sid);
            let s = self.sym(e);
            self.bond_sub(s, sid);
        }
    }

    /// Input vertices that ended up on a subsegment become segment
    /// vertices, so the shell exemption treats input corners uniformly.
    fn classify_segment_vertices(&mut self) {
        let ends: Vec<VertexId> = self
            .subsegments()
            .flat_map(|os| [self.sub_org(os), self.sub_dest(os)])
            .collect();
        for v in ends {
            if self.vertex(v).kind == VertexKind::Input {
                self.set_vertex_kind(v, VertexKind::Segment);
            }
        }
    }
}

/// Whether `p` lies strictly ahead of `a` along the direction `a`→`b`.
fn ahead(a: Point2<f64>, b: Point2<f64>, p: Point2<f64>) -> bool {
    (b.x - a.x) * (p.x - a.x) + (b.y - a.y) * (p.y - a.y) > 0.0
}

fn ordered_crossing(
    pa: Point2<f64>,
    pb: Point2<f64>,
    mesh: &Mesh,
    c: VertexId,
    d: VertexId,
) -> (VertexId, VertexId) {
    // Keep (right-of-segment, left-of-segment) ordering for the queue.
    if orient2d(pa, pb, mesh.position(c), mesh.exact_arithmetic()) < 0.0 {
        (c, d)
    } else {
        (d, c)
    }
}

fn point_key(p: Point2<f64>) -> (u64, u64) {
    let norm = |v: f64| if v == 0.0 { 0.0f64 } else { v };
    (norm(p.x).to_bits(), norm(p.y).to_bits())
}

fn validate(pslg: &Pslg) -> CdtResult<usize> {
    if pslg.points.len() < 3 {
        return Err(CdtError::TooFewPoints(pslg.points.len()));
    }
    let attr_count = if pslg.point_attrs.is_empty() {
        0
    } else {
        let expected = pslg.point_attrs[0].len();
        for (i, attrs) in pslg.point_attrs.iter().enumerate() {
            if attrs.len() != expected {
                return Err(CdtError::AttributeLengthMismatch {
                    point: i,
                    found: attrs.len(),
                    expected,
                });
            }
        }
        expected
    };
    for (si, seg) in pslg.segments.iter().enumerate() {
        for &index in seg {
            if index >= pslg.points.len() {
                return Err(CdtError::SegmentIndexOutOfRange { segment: si, index });
            }
        }
        if seg[0] == seg[1] {
            return Err(CdtError::DegenerateSegment(si));
        }
    }
    Ok(attr_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_with_diagonal() -> Pslg {
        Pslg::from_points(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ])
        .with_segments(vec![[0, 1], [1, 2], [2, 3], [3, 0], [0, 2]])
    }

    #[test]
    fn square_produces_two_domain_triangles() {
        let mesh = Mesh::triangulate(&square_with_diagonal()).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
        // Four sides plus the diagonal.
        assert_eq!(mesh.subsegment_count(), 5);
    }

    #[test]
    fn diagonal_is_recovered() {
        // The four square corners are cocircular, so the unconstrained
        // Delaunay picks one diagonal arbitrarily; both must be
        // recoverable as constraints.
        for diagonal in [[0usize, 2usize], [1, 3]] {
            let pslg = Pslg::from_points(vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
            ])
            .with_segments(vec![[0, 1], [1, 2], [2, 3], [3, 0], diagonal]);
            let mesh = Mesh::triangulate(&pslg).unwrap();
            assert_eq!(mesh.triangle_count(), 2);
            let found = mesh.subsegments().any(|os| {
                let ends = [mesh.sub_org(os).index(), mesh.sub_dest(os).index()];
                let verts: Vec<usize> = mesh.domain_vertices().map(VertexId::index).collect();
                ends.contains(&verts[diagonal[0]]) && ends.contains(&verts[diagonal[1]])
            });
            assert!(found, "diagonal {diagonal:?} missing");
        }
    }

    #[test]
    fn hull_marked_without_segments() {
        let pslg = Pslg::from_points(vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(1.0, 1.5),
            Point2::new(1.0, 0.5),
        ]);
        let mesh = Mesh::triangulate(&pslg).unwrap();
        // Hull of the three outer points; the interior point splits the
        // triangle into three.
        assert_eq!(mesh.triangle_count(), 3);
        assert_eq!(mesh.subsegment_count(), 3);
        for os in mesh.subsegments() {
            assert_eq!(mesh.sub_mark(os), 1);
        }
    }

    #[test]
    fn duplicate_points_are_welded() {
        let pslg = Pslg::from_points(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 1.0),
            Point2::new(1.0, 0.0),
        ]);
        let mesh = Mesh::triangulate(&pslg).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn too_few_points_rejected() {
        let pslg = Pslg::from_points(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]);
        assert!(matches!(
            Mesh::triangulate(&pslg),
            Err(CdtError::TooFewPoints(2))
        ));
    }

    #[test]
    fn crossing_segments_rejected() {
        let pslg = Pslg::from_points(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ])
        .with_segments(vec![[0, 2], [1, 3]]);
        assert!(matches!(
            Mesh::triangulate(&pslg),
            Err(CdtError::SegmentsCross(_))
        ));
    }
}
