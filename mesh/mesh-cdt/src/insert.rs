//! Vertex insertion, deletion, and the undo journal.
//!
//! Insertion follows the classic incremental scheme: locate the point,
//! split the containing triangle (or edge, or constrained subsegment),
//! then restore the Delaunay property with Lawson flips that never cross
//! a constrained subsegment. Every arena mutation performed by one
//! insertion is journaled so [`Mesh::undo_vertex`] can roll the whole
//! operation back exactly.

// Geometry code uses the conventional short names for coordinates.
#![allow(clippy::many_single_char_names)]

use nalgebra::Point2;
use smallvec::SmallVec;
use tracing::warn;

use crate::handles::{Osub, Otri, SubsegId, TriId, VertexId};
use crate::mesh::{Mesh, SubsegData, TriData};
use crate::vertex::{Vertex, VertexKind};

/// Result of a vertex insertion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertStatus {
    /// The vertex is in the mesh and no constrained subsegment is
    /// encroached by it.
    Successful,
    /// The vertex is in the mesh but encroaches upon at least one
    /// constrained subsegment (reported to the observer); the caller
    /// decides whether to keep it or roll back with
    /// [`Mesh::undo_vertex`].
    Encroaching,
    /// The vertex fell on (or behind) a constrained subsegment and was
    /// not inserted; the blocking subsegment was reported.
    Violating,
    /// The vertex coincides with an existing vertex and was not inserted.
    Duplicate,
}

/// Callbacks through which an insertion reports entities whose quality
/// should be re-examined. The refinement engine's implementation runs its
/// encroachment and triangle tests and feeds its queues.
pub trait FlawObserver {
    /// A constrained subsegment that blocked a flip next to the new
    /// vertex. Returns whether the subsegment is encroached.
    fn subsegment_suspect(&mut self, mesh: &Mesh, os: Osub) -> bool;

    /// A constrained subsegment the vertex landed on (or that blocked
    /// the insertion outright): the insertion was abandoned and this
    /// subsegment must be split before the vertex can go in.
    fn subsegment_broken(&mut self, mesh: &Mesh, os: Osub);

    /// A triangle of the new vertex's star, reported only when triangle
    /// flaw checks were requested.
    fn triangle_suspect(&mut self, mesh: &Mesh, ot: Otri);
}

/// Observer that ignores every report (used while building).
#[derive(Debug, Default)]
pub struct NoopObserver;

impl FlawObserver for NoopObserver {
    fn subsegment_suspect(&mut self, _mesh: &Mesh, _os: Osub) -> bool {
        false
    }

    fn subsegment_broken(&mut self, _mesh: &Mesh, _os: Osub) {}

    fn triangle_suspect(&mut self, _mesh: &Mesh, _ot: Otri) {}
}

/// One reversible arena mutation.
#[derive(Debug, Clone)]
pub(crate) enum UndoOp {
    TriSaved(TriId, TriData),
    SubSaved(SubsegId, SubsegData),
    TriCreated(TriId),
    SubCreated(SubsegId),
    VertexAdded(VertexId),
}

/// Where a located point lies relative to the triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Location {
    OnVertex(VertexId),
    OnEdge,
    InTriangle,
    /// The walk was stopped by a constrained subsegment (or ran off the
    /// outermost boundary); the handle is the blocking edge.
    Blocked,
}

impl Mesh {
    // ----- point location -------------------------------------------------

    /// Walk from `start` toward `p`.
    ///
    /// With `stop_at_subseg` the walk refuses to cross constrained
    /// subsegments and reports the blocking edge instead, so a search
    /// launched inside the domain can never leave it.
    pub(crate) fn locate(&self, p: Point2<f64>, start: Otri, stop_at_subseg: bool) -> (Location, Otri) {
        let mut cur = if start.is_boundary() || self.tri_is_dead(start) {
            self.live_start()
        } else {
            start
        };
        debug_assert!(!cur.is_boundary(), "locate in an empty mesh");

        let mut prev = TriId::NONE;
        let max_steps = 4 * self.tris.len() + 64;
        for _ in 0..max_steps {
            match self.classify(p, cur.tri) {
                Ok(found) => return found,
                Err(crossing) => {
                    let mut exit = crossing[0];
                    // Avoid stepping straight back where we came from.
                    for &e in &crossing {
                        if !e.is_boundary() && self.sym(e).tri != prev {
                            exit = e;
                            break;
                        }
                    }
                    let exit = exit;
                    if stop_at_subseg && !self.seg_pivot(exit).is_none() {
                        return (Location::Blocked, exit);
                    }
                    let s = self.sym(exit);
                    if s.is_boundary() {
                        return (Location::Blocked, exit);
                    }
                    prev = cur.tri;
                    cur = Otri::new(s.tri, 0);
                }
            }
        }

        // The walk failed to settle (possible only on a triangulation that
        // is far from Delaunay); fall back to scanning the arena.
        for ot in self.live_triangles() {
            if let Ok(found) = self.classify(p, ot.tri) {
                return found;
            }
        }
        (Location::Blocked, cur)
    }

    /// Classify `p` against one triangle: `Ok` when inside/on it, `Err`
    /// with the crossed edges otherwise.
    #[allow(clippy::type_complexity)]
    fn classify(&self, p: Point2<f64>, tri: TriId) -> Result<(Location, Otri), SmallVec<[Otri; 2]>> {
        let mut det = [0.0f64; 3];
        for o in 0..3u8 {
            let e = Otri::new(tri, o);
            det[o as usize] = crate::predicates::orient2d(
                self.position(self.org(e)),
                self.position(self.dest(e)),
                p,
                self.exact,
            );
        }
        if det.iter().all(|&d| d >= 0.0) {
            let zeros: SmallVec<[u8; 3]> = (0..3u8).filter(|&o| det[o as usize] == 0.0).collect();
            return Ok(match zeros.len() {
                0 => (Location::InTriangle, Otri::new(tri, 0)),
                1 => (Location::OnEdge, Otri::new(tri, zeros[0])),
                _ => {
                    // Two zero edges meet at the corner not on either.
                    let k = 3 - zeros[0] - zeros[1];
                    (
                        Location::OnVertex(self.tri(tri).corners[k as usize]),
                        Otri::new(tri, zeros[0]),
                    )
                }
            });
        }
        Err((0..3u8)
            .filter(|&o| det[o as usize] < 0.0)
            .map(|o| Otri::new(tri, o))
            .collect())
    }

    // ----- insertion ------------------------------------------------------

    /// Insert a vertex into the triangulation.
    ///
    /// `start` seeds the point-location walk. With `splitseg` the vertex
    /// is known to lie on that subsegment, which is split in two (the
    /// handle is rewritten to the half on its origin side). With
    /// `segment_flaws`, constrained subsegments encountered by the
    /// operation are reported to the observer; with `tri_flaws`, so is
    /// every triangle of the new vertex's star.
    pub fn insert_vertex<O: FlawObserver>(
        &mut self,
        vertex: Vertex,
        start: Otri,
        splitseg: Option<&mut Osub>,
        segment_flaws: bool,
        tri_flaws: bool,
        observer: &mut O,
    ) -> InsertStatus {
        self.journal.clear();
        self.journaling = true;
        let status =
            self.insert_vertex_inner(vertex, start, splitseg, segment_flaws, tri_flaws, observer);
        self.journaling = false;
        status
    }

    fn insert_vertex_inner<O: FlawObserver>(
        &mut self,
        mut vertex: Vertex,
        start: Otri,
        splitseg: Option<&mut Osub>,
        segment_flaws: bool,
        tri_flaws: bool,
        observer: &mut O,
    ) -> InsertStatus {
        let p = vertex.position;

        let (loc, horiz) = match &splitseg {
            Some(os) => {
                debug_assert!(!self.subseg_is_dead(**os));
                (Location::OnEdge, self.tri_pivot(**os))
            }
            None => self.locate(p, start, true),
        };

        match loc {
            Location::OnVertex(v) => {
                let _ = v;
                return InsertStatus::Duplicate;
            }
            Location::Blocked => {
                let os = self.seg_pivot(horiz);
                if os.is_none() {
                    warn!("insertion point lies outside the triangulated region");
                } else if segment_flaws {
                    observer.subsegment_broken(&*self, os);
                }
                return InsertStatus::Violating;
            }
            Location::OnEdge if splitseg.is_none() => {
                let os = self.seg_pivot(horiz);
                if !os.is_none() {
                    if segment_flaws {
                        observer.subsegment_broken(&*self, os);
                    }
                    return InsertStatus::Violating;
                }
            }
            _ => {}
        }

        vertex.attrs.resize(self.attr_count, 0.0);
        let v = self.add_vertex(vertex);

        let (suspects, home) = match loc {
            Location::InTriangle => self.split_triangle_interior(horiz, v),
            Location::OnEdge => self.split_edge(horiz, v, splitseg),
            _ => unreachable!("handled above"),
        };

        let encroached = self.legalize(v, suspects, segment_flaws, observer);

        if tri_flaws {
            self.report_star(v, home, observer);
        }

        self.recent = Otri::new(home, 0);
        if encroached {
            InsertStatus::Encroaching
        } else {
            InsertStatus::Successful
        }
    }

    /// 1→3 split of the triangle containing `v`.
    fn split_triangle_interior(&mut self, horiz: Otri, v: VertexId) -> (SmallVec<[Otri; 4]>, TriId) {
        let t = horiz.tri;
        let corners = self.tri(t).corners;
        let area = self.tri(t).area_target;
        let mut outer = [(Otri::BOUNDARY, SubsegId::NONE); 3];
        for (i, slot) in outer.iter_mut().enumerate() {
            let o = (i + 2) % 3; // edge corners[i] -> corners[i+1]
            *slot = (self.tri(t).neighbors[o], self.tri(t).subsegs[o]);
        }

        let slots = [
            t,
            self.alloc_tri([v, corners[1], corners[2]]),
            self.alloc_tri([v, corners[2], corners[0]]),
        ];
        {
            let first = self.tri_mut(t);
            first.corners = [v, corners[0], corners[1]];
            first.subsegs = [SubsegId::NONE; 3];
        }
        for (i, &slot) in slots.iter().enumerate() {
            self.tri_mut(slot).area_target = area;
            let (nb, sid) = outer[i];
            self.rebond(Otri::new(slot, 0), nb, sid);
        }
        for i in 0..3 {
            self.bond(
                Otri::new(slots[i], 1),
                Otri::new(slots[(i + 1) % 3], 2),
            );
        }

        (slots.iter().map(|&s| Otri::new(s, 0)).collect(), t)
    }

    /// 2→4 (or 1→2 at the outermost boundary) split of the edge under
    /// `horiz`, optionally dividing the subsegment riding on it.
    fn split_edge(
        &mut self,
        horiz: Otri,
        v: VertexId,
        splitseg: Option<&mut Osub>,
    ) -> (SmallVec<[Otri; 4]>, TriId) {
        let sot = self.sym(horiz);
        let a = self.org(horiz);
        let b = self.dest(horiz);
        let c = self.apex(horiz);

        // Capture the outer bonds of the front triangle.
        let e_bc = horiz.lnext();
        let e_ca = horiz.lprev();
        let n_bc = self.sym(e_bc);
        let s_bc = self.tri(horiz.tri).subsegs[e_bc.orient as usize];
        let n_ca = self.sym(e_ca);
        let s_ca = self.tri(horiz.tri).subsegs[e_ca.orient as usize];
        let area_t = self.tri(horiz.tri).area_target;

        let ta = horiz.tri;
        {
            let front = self.tri_mut(ta);
            front.corners = [a, v, c];
            front.subsegs = [SubsegId::NONE; 3];
        }
        let tb = self.alloc_tri([v, b, c]);
        self.tri_mut(tb).area_target = area_t;

        // Front half: Ta = (a, v, c), Tb = (v, b, c).
        self.bond(Otri::new(ta, 0), Otri::new(tb, 1)); // v→c ↔ c→v
        self.rebond(Otri::new(ta, 1), n_ca, s_ca); // c→a
        self.rebond(Otri::new(tb, 0), n_bc, s_bc); // b→c

        let mut suspects: SmallVec<[Otri; 4]> = SmallVec::new();
        suspects.push(Otri::new(ta, 1));
        suspects.push(Otri::new(tb, 0));

        let back = if sot.is_boundary() {
            self.tri_mut(ta).neighbors[2] = Otri::BOUNDARY;
            self.tri_mut(tb).neighbors[2] = Otri::BOUNDARY;
            None
        } else {
            let d = self.apex(sot);
            let e_ad = sot.lnext();
            let e_db = sot.lprev();
            let n_ad = self.sym(e_ad);
            let s_ad = self.tri(sot.tri).subsegs[e_ad.orient as usize];
            let n_db = self.sym(e_db);
            let s_db = self.tri(sot.tri).subsegs[e_db.orient as usize];
            let area_u = self.tri(sot.tri).area_target;

            let uc = sot.tri;
            {
                let rear = self.tri_mut(uc);
                rear.corners = [b, v, d];
                rear.subsegs = [SubsegId::NONE; 3];
            }
            let ud = self.alloc_tri([v, a, d]);
            self.tri_mut(ud).area_target = area_u;

            // Rear half: Uc = (b, v, d), Ud = (v, a, d).
            self.bond(Otri::new(uc, 0), Otri::new(ud, 1)); // v→d ↔ d→v
            self.rebond(Otri::new(uc, 1), n_db, s_db); // d→b
            self.rebond(Otri::new(ud, 0), n_ad, s_ad); // a→d
            // Halves of the split edge.
            self.bond(Otri::new(ta, 2), Otri::new(ud, 2)); // a→v ↔ v→a
            self.bond(Otri::new(tb, 2), Otri::new(uc, 2)); // v→b ↔ b→v

            suspects.push(Otri::new(uc, 1));
            suspects.push(Otri::new(ud, 0));
            Some((uc, ud))
        };

        if let Some(os) = splitseg {
            let old = os.sub;
            let mark = self.sub(old).mark;
            let side_a = usize::from(self.sub(old).ends[0] != a);
            let link_a = self.sub(old).links[side_a];
            let link_b = self.sub(old).links[1 - side_a];

            let s2 = self.alloc_subseg([v, b], mark);
            {
                let first = self.sub_mut(old);
                first.ends = [a, v];
                first.links = [link_a, s2];
            }
            self.sub_mut(s2).links = [old, link_b];
            if link_b != SubsegId::NONE {
                let side = usize::from(self.sub(link_b).ends[0] != b);
                self.sub_mut(link_b).links[side] = s2;
            }

            self.bond_sub(Otri::new(ta, 2), old); // a→v
            self.bond_sub(Otri::new(tb, 2), s2); // v→b
            if let Some((uc, ud)) = back {
                self.bond_sub(Otri::new(uc, 2), s2); // b→v
                self.bond_sub(Otri::new(ud, 2), old); // v→a
            }
            *os = Osub::new(old, 0);
        }

        (suspects, ta)
    }

    /// Lawson legalization of the edges opposite `v`. Returns whether any
    /// constrained subsegment blocking a flip turned out encroached.
    fn legalize<O: FlawObserver>(
        &mut self,
        v: VertexId,
        suspects: SmallVec<[Otri; 4]>,
        segment_flaws: bool,
        observer: &mut O,
    ) -> bool {
        let mut encroached = false;
        let mut stack: Vec<Otri> = suspects.into_vec();
        while let Some(h) = stack.pop() {
            debug_assert_eq!(self.apex(h), v);
            let os = self.seg_pivot(h);
            if !os.is_none() {
                if segment_flaws && observer.subsegment_suspect(&*self, os) {
                    encroached = true;
                }
                continue;
            }
            let s = self.sym(h);
            if s.is_boundary() {
                continue;
            }
            let w = self.apex(s);
            if self.non_regular(self.org(h), self.dest(h), v, w) > 0.0 {
                let diag = self.flip(h);
                stack.push(diag.lnext());
                stack.push(self.sym(diag).lprev());
            }
        }
        encroached
    }

    /// Report every finite triangle of `v`'s star to the observer.
    fn report_star<O: FlawObserver>(&mut self, v: VertexId, home: TriId, observer: &mut O) {
        let Some(o) = self.orient_with_apex(home, v) else {
            return;
        };
        let h0 = Otri::new(home, o).lprev();
        debug_assert_eq!(self.org(h0), v);
        let mut h = h0;
        loop {
            if self.tri_is_finite(h) {
                observer.triangle_suspect(&*self, Otri::new(h.tri, 0));
            }
            h = self.onext(h);
            if h == h0 || h.is_boundary() {
                break;
            }
        }
    }

    /// Roll back the most recent [`Mesh::insert_vertex`].
    ///
    /// Only the last insertion can be undone, and only if no other
    /// mutating operation ran since.
    pub fn undo_vertex(&mut self) {
        let ops: Vec<UndoOp> = self.journal.drain(..).collect();
        for op in ops.into_iter().rev() {
            match op {
                UndoOp::TriSaved(id, data) => self.tris[id.index()] = data,
                UndoOp::SubSaved(id, data) => self.subsegs[id.index()] = data,
                UndoOp::TriCreated(id) => {
                    self.tris[id.index()].alive = false;
                    self.free_tris.push(id);
                }
                UndoOp::SubCreated(id) => {
                    self.subsegs[id.index()].alive = false;
                    self.free_subsegs.push(id);
                }
                UndoOp::VertexAdded(id) => {
                    debug_assert_eq!(id.index(), self.vertices.len() - 1);
                    self.vertices.pop();
                }
            }
        }
        self.recent = Otri::BOUNDARY;
    }

    // ----- flips ----------------------------------------------------------

    /// Replace the edge under `ot` with the opposite diagonal of its
    /// quadrilateral. Returns the handle of the new diagonal, oriented
    /// apex(ot) → apex(sym(ot)) in `ot`'s slot.
    pub(crate) fn flip(&mut self, ot: Otri) -> Otri {
        debug_assert!(self.seg_pivot(ot).is_none(), "cannot flip a subsegment");
        let sot = self.sym(ot);
        debug_assert!(!sot.is_boundary());
        let t1 = ot.tri;
        let t2 = sot.tri;
        let a = self.org(ot);
        let b = self.dest(ot);
        let c = self.apex(ot);
        let d = self.apex(sot);

        let e_bc = ot.lnext();
        let e_ca = ot.lprev();
        let e_ad = sot.lnext();
        let e_db = sot.lprev();
        let n_bc = self.sym(e_bc);
        let s_bc = self.tri(t1).subsegs[e_bc.orient as usize];
        let n_ca = self.sym(e_ca);
        let s_ca = self.tri(t1).subsegs[e_ca.orient as usize];
        let n_ad = self.sym(e_ad);
        let s_ad = self.tri(t2).subsegs[e_ad.orient as usize];
        let n_db = self.sym(e_db);
        let s_db = self.tri(t2).subsegs[e_db.orient as usize];

        {
            let first = self.tri_mut(t1);
            first.corners = [b, c, d];
            first.subsegs = [SubsegId::NONE; 3];
        }
        {
            let second = self.tri_mut(t2);
            second.corners = [a, d, c];
            second.subsegs = [SubsegId::NONE; 3];
        }

        let diag = Otri::new(t1, 0); // c→d
        self.bond(diag, Otri::new(t2, 0)); // d→c
        self.rebond(Otri::new(t1, 1), n_db, s_db); // d→b
        self.rebond(Otri::new(t1, 2), n_bc, s_bc); // b→c
        self.rebond(Otri::new(t2, 1), n_ca, s_ca); // c→a
        self.rebond(Otri::new(t2, 2), n_ad, s_ad); // a→d
        diag
    }

    // ----- deletion -------------------------------------------------------

    /// Delete the origin vertex of `ot` (which must be a free interior
    /// vertex) and retriangulate its star. The triangles filling the
    /// cavity are reported to the observer. Invalidates any pending undo.
    pub fn delete_vertex(&mut self, ot: Otri, observer: &mut dyn FlawObserver) {
        self.journal.clear();
        let v = self.org(ot);
        debug_assert_eq!(self.vertex(v).kind, VertexKind::Free);
        let mut touched: Vec<TriId> = Vec::new();

        // Flip spokes until only three remain.
        let mut guard = 0usize;
        loop {
            let spokes = self.star_spokes(v);
            if spokes.len() <= 3 {
                break;
            }
            guard += 1;
            debug_assert!(guard < 10_000, "vertex deletion failed to converge");
            let mut flipped = false;
            for &e in &spokes {
                // Spoke e: v→u with star neighbors c (ccw of u) and d (cw).
                let u = self.dest(e);
                let c = self.apex(e);
                let d = self.apex(self.sym(e));
                let pu = self.position(u);
                let pc = self.position(c);
                let pd = self.position(d);
                let pv = self.position(v);
                let ear_convex =
                    crate::predicates::orient2d(pd, pu, pc, self.exact) > 0.0;
                let diagonal_separates =
                    crate::predicates::orient2d(pc, pv, pd, self.exact) > 0.0;
                if ear_convex && diagonal_separates {
                    let diag = self.flip(e);
                    touched.push(diag.tri);
                    touched.push(self.sym(diag).tri);
                    flipped = true;
                    break;
                }
            }
            debug_assert!(flipped, "star polygon without a flippable spoke");
            if !flipped {
                return;
            }
        }

        // Merge the remaining fan of three triangles into one.
        let spokes = self.star_spokes(v);
        if spokes.len() != 3 {
            warn!("star of deleted vertex did not reduce to a fan of three");
            return;
        }
        let ring: Vec<VertexId> = spokes.iter().map(|&e| self.dest(e)).collect();
        let mut outer = Vec::with_capacity(3);
        for &e in &spokes {
            // Outer edge of this star triangle: dest→apex, opposite v.
            let oe = e.lnext();
            outer.push((
                self.org(oe),
                self.sym(oe),
                self.tri(oe.tri).subsegs[oe.orient as usize],
            ));
        }
        let keep = spokes[0].tri;
        touched.push(keep);
        for &e in &spokes[1..] {
            if e.tri != keep {
                self.kill_tri(e.tri);
            }
        }
        self.tri_mut(keep).corners = [ring[2], ring[0], ring[1]];
        self.tri_mut(keep).subsegs = [SubsegId::NONE; 3];
        let mut relegalize: Vec<Otri> = Vec::new();
        for (org, nb, sid) in outer {
            let o = self
                .orient_of(keep, org, self.ring_next(&ring, org))
                .unwrap_or(0);
            let edge = Otri::new(keep, o);
            self.rebond(edge, nb, sid);
            relegalize.push(edge);
        }
        self.set_vertex_kind(v, VertexKind::Removed);
        self.recent = Otri::new(keep, 0);

        // Restore the Delaunay property around the cavity.
        let mut guard = 0usize;
        while let Some(h) = relegalize.pop() {
            guard += 1;
            if guard > 10_000 {
                warn!("cavity legalization did not settle");
                break;
            }
            if h.is_boundary() || self.tri_is_dead(h) {
                continue;
            }
            if !self.seg_pivot(h).is_none() {
                continue;
            }
            let s = self.sym(h);
            if s.is_boundary() {
                continue;
            }
            let (a, b, c, d) = (self.org(h), self.dest(h), self.apex(h), self.apex(s));
            if self.non_regular(a, b, c, d) > 0.0 {
                let diag = self.flip(h);
                let sym_diag = self.sym(diag);
                touched.push(diag.tri);
                touched.push(sym_diag.tri);
                relegalize.push(diag.lnext());
                relegalize.push(diag.lprev());
                relegalize.push(sym_diag.lnext());
                relegalize.push(sym_diag.lprev());
            }
        }

        // Hand the cavity's triangles to the observer for re-testing.
        touched.sort_unstable();
        touched.dedup();
        for id in touched {
            let h = Otri::new(id, 0);
            if !self.tri_is_dead(h) && self.tri_is_finite(h) {
                observer.triangle_suspect(&*self, h);
            }
        }
    }

    fn ring_next(&self, ring: &[VertexId], org: VertexId) -> VertexId {
        let i = ring.iter().position(|&r| r == org).unwrap_or(0);
        ring[(i + 1) % ring.len()]
    }

    /// All spokes v→u in counterclockwise order. `v` must be interior.
    pub(crate) fn star_spokes(&self, v: VertexId) -> SmallVec<[Otri; 8]> {
        let mut spokes: SmallVec<[Otri; 8]> = SmallVec::new();
        let Some(start) = self.handle_with_org_near(v) else {
            return spokes;
        };
        let mut h = start;
        loop {
            spokes.push(h);
            h = self.onext(h);
            if h == start || h.is_boundary() {
                break;
            }
        }
        spokes
    }

    fn handle_with_org_near(&self, v: VertexId) -> Option<Otri> {
        if !self.recent.is_boundary() && !self.tri_is_dead(self.recent) {
            if let Some(o) = self.orient_with_apex(self.recent.tri, v) {
                return Some(Otri::new(self.recent.tri, o).lprev());
            }
        }
        self.handle_with_org(v)
    }
}
