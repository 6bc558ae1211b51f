//! The triangulation arena: vertex, triangle, and subsegment storage plus
//! the topology queries the refinement engine drives.
//!
//! Triangles with a corner on one of the three reserved super-triangle
//! vertices are *exterior*; they pad the convex hull out to the enclosing
//! super-triangle so that every constrained subsegment has a triangle on
//! both sides. Domain iteration and quality work skip them.

// Geometry code uses the conventional short names for coordinates.
#![allow(clippy::many_single_char_names)]

use nalgebra::Point2;

use crate::handles::{Osub, Otri, SubsegId, TriId, VertexId};
use crate::insert::UndoOp;
use crate::predicates;
use crate::vertex::{Vertex, VertexKind};

#[derive(Debug, Clone)]
pub(crate) struct TriData {
    /// Corner `k` is the apex of orientation `k`.
    pub corners: [VertexId; 3],
    /// Neighbor across the edge opposite corner `k`, as the handle whose
    /// directed edge runs dest→org relative to ours.
    pub neighbors: [Otri; 3],
    /// Subsegment on the edge opposite corner `k`, if constrained.
    pub subsegs: [SubsegId; 3],
    /// Per-triangle area bound; non-positive means unconstrained.
    pub area_target: f64,
    pub alive: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct SubsegData {
    pub ends: [VertexId; 2],
    /// `tris[k]` is the adjoining triangle whose directed edge equals
    /// `ends[k]` → `ends[1-k]`.
    pub tris: [Otri; 2],
    /// Adjacent subsegment of the same original segment at `ends[k]`,
    /// or `SubsegId::NONE` where the segment ends.
    pub links: [SubsegId; 2],
    pub mark: i32,
    pub alive: bool,
}

/// A 2D constrained Delaunay triangulation.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) tris: Vec<TriData>,
    pub(crate) subsegs: Vec<SubsegData>,
    pub(crate) free_tris: Vec<TriId>,
    pub(crate) free_subsegs: Vec<SubsegId>,
    pub(crate) attr_count: usize,
    pub(crate) exact: bool,
    /// Point-location start hint; the most recently touched triangle.
    pub(crate) recent: Otri,
    pub(crate) journal: Vec<UndoOp>,
    pub(crate) journaling: bool,
}

impl Mesh {
    pub(crate) fn empty(attr_count: usize) -> Self {
        Self {
            vertices: Vec::new(),
            tris: Vec::new(),
            subsegs: Vec::new(),
            free_tris: Vec::new(),
            free_subsegs: Vec::new(),
            attr_count,
            exact: true,
            recent: Otri::BOUNDARY,
            journal: Vec::new(),
            journaling: false,
        }
    }

    // ----- vertices ------------------------------------------------------

    /// Number of attributes every vertex carries.
    #[must_use]
    pub fn attr_count(&self) -> usize {
        self.attr_count
    }

    /// Whether `v` is a corner of the enclosing super-triangle.
    #[must_use]
    pub fn is_infinite(&self, v: VertexId) -> bool {
        v.0 < 3
    }

    /// Read a vertex record.
    ///
    /// # Panics
    ///
    /// Panics if `v` is out of range.
    #[must_use]
    pub fn vertex(&self, v: VertexId) -> &Vertex {
        &self.vertices[v.index()]
    }

    /// Position of a vertex.
    #[must_use]
    pub fn position(&self, v: VertexId) -> Point2<f64> {
        self.vertices[v.index()].position
    }

    /// All finite vertices that are present in the triangulation.
    pub fn domain_vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .skip(3)
            .filter(|(_, v)| v.kind != VertexKind::Removed)
            .map(|(i, _)| VertexId(i as u32))
    }

    /// Number of finite vertices present in the triangulation.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.domain_vertices().count()
    }

    pub(crate) fn add_vertex(&mut self, vertex: Vertex) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(vertex);
        if self.journaling {
            self.journal.push(UndoOp::VertexAdded(id));
        }
        id
    }

    pub(crate) fn set_vertex_kind(&mut self, v: VertexId, kind: VertexKind) {
        self.vertices[v.index()].kind = kind;
    }

    // ----- triangle handles ----------------------------------------------

    pub(crate) fn tri(&self, id: TriId) -> &TriData {
        &self.tris[id.index()]
    }

    pub(crate) fn tri_mut(&mut self, id: TriId) -> &mut TriData {
        if self.journaling {
            self.journal
                .push(UndoOp::TriSaved(id, self.tris[id.index()].clone()));
        }
        &mut self.tris[id.index()]
    }

    /// Origin of the directed edge.
    #[must_use]
    pub fn org(&self, ot: Otri) -> VertexId {
        self.tri(ot.tri).corners[(ot.orient as usize + 1) % 3]
    }

    /// Destination of the directed edge.
    #[must_use]
    pub fn dest(&self, ot: Otri) -> VertexId {
        self.tri(ot.tri).corners[(ot.orient as usize + 2) % 3]
    }

    /// Apex opposite the directed edge.
    #[must_use]
    pub fn apex(&self, ot: Otri) -> VertexId {
        self.tri(ot.tri).corners[ot.orient as usize]
    }

    /// Neighbor across the directed edge ([`Otri::BOUNDARY`] outside).
    #[must_use]
    pub fn sym(&self, ot: Otri) -> Otri {
        self.tri(ot.tri).neighbors[ot.orient as usize]
    }

    /// Next edge counterclockwise around the origin.
    #[must_use]
    pub fn onext(&self, ot: Otri) -> Otri {
        self.sym(ot.lprev())
    }

    /// Next edge clockwise around the origin.
    #[must_use]
    pub fn oprev(&self, ot: Otri) -> Otri {
        let s = self.sym(ot);
        if s.is_boundary() {
            Otri::BOUNDARY
        } else {
            s.lnext()
        }
    }

    /// Next edge counterclockwise around the destination.
    #[must_use]
    pub fn dnext(&self, ot: Otri) -> Otri {
        self.sym(ot.lnext())
    }

    /// Subsegment on the directed edge, aligned with it, or [`Osub::NONE`].
    #[must_use]
    pub fn seg_pivot(&self, ot: Otri) -> Osub {
        let sid = self.tri(ot.tri).subsegs[ot.orient as usize];
        if sid == SubsegId::NONE {
            return Osub::NONE;
        }
        let orient = u8::from(self.subsegs[sid.index()].ends[0] != self.org(ot));
        Osub::new(sid, orient)
    }

    /// Whether the handle's triangle slot has been deallocated.
    #[must_use]
    pub fn tri_is_dead(&self, ot: Otri) -> bool {
        ot.is_boundary() || !self.tri(ot.tri).alive
    }

    /// Whether all three corners are finite input/Steiner vertices.
    #[must_use]
    pub fn tri_is_finite(&self, ot: Otri) -> bool {
        self.tri(ot.tri).corners.iter().all(|&c| !self.is_infinite(c))
    }

    /// Per-triangle area bound; non-positive means unconstrained.
    #[must_use]
    pub fn area_target(&self, ot: Otri) -> f64 {
        self.tri(ot.tri).area_target
    }

    /// Set the per-triangle area bound.
    pub fn set_area_target(&mut self, ot: Otri, target: f64) {
        self.tri_mut(ot.tri).area_target = target;
    }

    // ----- subsegment handles --------------------------------------------

    pub(crate) fn sub(&self, id: SubsegId) -> &SubsegData {
        &self.subsegs[id.index()]
    }

    pub(crate) fn sub_mut(&mut self, id: SubsegId) -> &mut SubsegData {
        if self.journaling {
            self.journal
                .push(UndoOp::SubSaved(id, self.subsegs[id.index()].clone()));
        }
        &mut self.subsegs[id.index()]
    }

    /// Origin endpoint of the directed subsegment.
    #[must_use]
    pub fn sub_org(&self, os: Osub) -> VertexId {
        self.sub(os.sub).ends[os.orient as usize]
    }

    /// Destination endpoint of the directed subsegment.
    #[must_use]
    pub fn sub_dest(&self, os: Osub) -> VertexId {
        self.sub(os.sub).ends[1 - os.orient as usize]
    }

    /// Boundary mark carried by the subsegment.
    #[must_use]
    pub fn sub_mark(&self, os: Osub) -> i32 {
        self.sub(os.sub).mark
    }

    /// Adjoining triangle on the left of the directed subsegment, aligned
    /// with it ([`Otri::BOUNDARY`] if that side is outside the mesh).
    #[must_use]
    pub fn tri_pivot(&self, os: Osub) -> Otri {
        self.sub(os.sub).tris[os.orient as usize]
    }

    /// Whether the handle's subsegment slot has been deallocated.
    #[must_use]
    pub fn subseg_is_dead(&self, os: Osub) -> bool {
        os.is_none() || !self.sub(os.sub).alive
    }

    /// The subsegment continuing past the destination along the same
    /// original segment, aligned away from this one, or [`Osub::NONE`].
    #[must_use]
    pub fn next_subseg(&self, os: Osub) -> Osub {
        let link = self.sub(os.sub).links[1 - os.orient as usize];
        if link == SubsegId::NONE {
            return Osub::NONE;
        }
        let dest = self.sub_dest(os);
        let orient = u8::from(self.subsegs[link.index()].ends[0] != dest);
        Osub::new(link, orient)
    }

    // ----- iteration ------------------------------------------------------

    /// Handles of all live triangles, exterior ones included.
    pub fn live_triangles(&self) -> impl Iterator<Item = Otri> + '_ {
        self.tris
            .iter()
            .enumerate()
            .filter(|(_, t)| t.alive)
            .map(|(i, _)| Otri::new(TriId(i as u32), 0))
    }

    /// Handles of the domain triangles (live, no infinite corner).
    pub fn triangles(&self) -> impl Iterator<Item = Otri> + '_ {
        self.live_triangles().filter(|&ot| self.tri_is_finite(ot))
    }

    /// Number of domain triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles().count()
    }

    /// Handles of all live subsegments.
    pub fn subsegments(&self) -> impl Iterator<Item = Osub> + '_ {
        self.subsegs
            .iter()
            .enumerate()
            .filter(|(_, s)| s.alive)
            .map(|(i, _)| Osub::new(SubsegId(i as u32), 0))
    }

    /// Number of live subsegments.
    #[must_use]
    pub fn subsegment_count(&self) -> usize {
        self.subsegments().count()
    }

    // ----- exact arithmetic ----------------------------------------------

    /// Whether predicates currently run with the exact fallback.
    #[must_use]
    pub fn exact_arithmetic(&self) -> bool {
        self.exact
    }

    /// Toggle exact arithmetic; returns the previous setting.
    pub fn set_exact_arithmetic(&mut self, exact: bool) -> bool {
        std::mem::replace(&mut self.exact, exact)
    }

    /// Signed doubled area of `(a, b, c)` under the current arithmetic
    /// setting.
    #[must_use]
    pub fn counterclockwise(&self, a: VertexId, b: VertexId, c: VertexId) -> f64 {
        predicates::orient2d(
            self.position(a),
            self.position(b),
            self.position(c),
            self.exact,
        )
    }

    /// In-circle test of `d` against the circumcircle of counterclockwise
    /// `(a, b, c)` under the current arithmetic setting.
    #[must_use]
    pub fn non_regular(&self, a: VertexId, b: VertexId, c: VertexId, d: VertexId) -> f64 {
        predicates::incircle(
            self.position(a),
            self.position(b),
            self.position(c),
            self.position(d),
            self.exact,
        )
    }

    // ----- allocation and bonding ----------------------------------------

    pub(crate) fn alloc_tri(&mut self, corners: [VertexId; 3]) -> TriId {
        let data = TriData {
            corners,
            neighbors: [Otri::BOUNDARY; 3],
            subsegs: [SubsegId::NONE; 3],
            area_target: 0.0,
            alive: true,
        };
        let id = if let Some(id) = self.free_tris.pop() {
            self.tris[id.index()] = data;
            id
        } else {
            let id = TriId(self.tris.len() as u32);
            self.tris.push(data);
            id
        };
        if self.journaling {
            self.journal.push(UndoOp::TriCreated(id));
        }
        id
    }

    pub(crate) fn kill_tri(&mut self, id: TriId) {
        debug_assert!(!self.journaling, "triangles are never killed mid-insertion");
        self.tris[id.index()].alive = false;
        self.free_tris.push(id);
    }

    pub(crate) fn alloc_subseg(&mut self, ends: [VertexId; 2], mark: i32) -> SubsegId {
        let data = SubsegData {
            ends,
            tris: [Otri::BOUNDARY; 2],
            links: [SubsegId::NONE; 2],
            mark,
            alive: true,
        };
        let id = if let Some(id) = self.free_subsegs.pop() {
            self.subsegs[id.index()] = data;
            id
        } else {
            let id = SubsegId(self.subsegs.len() as u32);
            self.subsegs.push(data);
            id
        };
        if self.journaling {
            self.journal.push(UndoOp::SubCreated(id));
        }
        id
    }

    /// Make `a` and `b` mutual neighbors across their directed edges.
    pub(crate) fn bond(&mut self, a: Otri, b: Otri) {
        debug_assert!(!a.is_boundary() && !b.is_boundary());
        self.tri_mut(a.tri).neighbors[a.orient as usize] = b;
        self.tri_mut(b.tri).neighbors[b.orient as usize] = a;
    }

    /// Rebond one side of an edge: neighbor (possibly the boundary
    /// sentinel) and subsegment. The subsegment's back-pointer for the
    /// matching direction is updated as well.
    pub(crate) fn rebond(&mut self, edge: Otri, neighbor: Otri, sid: SubsegId) {
        if neighbor.is_boundary() {
            self.tri_mut(edge.tri).neighbors[edge.orient as usize] = Otri::BOUNDARY;
        } else {
            self.bond(edge, neighbor);
        }
        self.bond_sub(edge, sid);
    }

    /// Attach subsegment `sid` to the directed edge (or clear with
    /// [`SubsegId::NONE`]).
    pub(crate) fn bond_sub(&mut self, edge: Otri, sid: SubsegId) {
        self.tri_mut(edge.tri).subsegs[edge.orient as usize] = sid;
        if sid != SubsegId::NONE {
            let org = self.org(edge);
            debug_assert!(
                self.sub(sid).ends.contains(&org),
                "subsegment endpoints must match the edge"
            );
            let side = usize::from(self.sub(sid).ends[0] != org);
            self.sub_mut(sid).tris[side] = edge;
        }
    }

    /// Orientation of the directed edge `org`→`dest` within a triangle.
    pub(crate) fn orient_of(&self, id: TriId, org: VertexId, dest: VertexId) -> Option<u8> {
        let c = &self.tri(id).corners;
        (0..3u8).find(|&o| c[(o as usize + 1) % 3] == org && c[(o as usize + 2) % 3] == dest)
    }

    /// Orientation whose apex is `v`, if `v` is a corner.
    pub(crate) fn orient_with_apex(&self, id: TriId, v: VertexId) -> Option<u8> {
        let c = &self.tri(id).corners;
        (0..3u8).find(|&o| c[o as usize] == v)
    }

    /// Find the directed edge `org`→`dest` by rotating around `org`,
    /// starting from any live handle whose origin is `org`.
    pub(crate) fn find_edge_around(&self, start: Otri, dest: VertexId) -> Option<Otri> {
        debug_assert!(!start.is_boundary());
        // Counterclockwise sweep, then clockwise if the boundary cut it short.
        let mut cur = start;
        loop {
            if self.dest(cur) == dest {
                return Some(cur);
            }
            let next = self.onext(cur);
            if next.is_boundary() {
                break;
            }
            cur = next;
            if cur == start {
                return None;
            }
        }
        let mut cur = start;
        loop {
            let prev = self.oprev(cur);
            if prev.is_boundary() {
                return None;
            }
            cur = prev;
            if self.dest(cur) == dest {
                return Some(cur);
            }
            if cur == start {
                return None;
            }
        }
    }

    /// Any live handle whose origin is `v`, found by scanning the arena.
    pub(crate) fn handle_with_org(&self, v: VertexId) -> Option<Otri> {
        for ot in self.live_triangles() {
            if let Some(o) = self.orient_with_apex(ot.tri, v) {
                return Some(Otri::new(ot.tri, o).lprev());
            }
        }
        None
    }

    pub(crate) fn live_start(&self) -> Otri {
        if !self.recent.is_boundary() && !self.tri_is_dead(self.recent) {
            return self.recent;
        }
        self.live_triangles()
            .next()
            .unwrap_or(Otri::BOUNDARY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Build a two-triangle mesh by hand: the unit square split by the
    // diagonal (1,0)-(0,1). Vertex slots 0..3 stand in for the infinite
    // corners and are unused.
    fn two_tri_mesh() -> (Mesh, TriId, TriId) {
        let mut m = Mesh::empty(0);
        for _ in 0..3 {
            m.add_vertex(Vertex::from_coords(0.0, 0.0, VertexKind::Removed));
        }
        let a = m.add_vertex(Vertex::from_coords(0.0, 0.0, VertexKind::Input));
        let b = m.add_vertex(Vertex::from_coords(1.0, 0.0, VertexKind::Input));
        let c = m.add_vertex(Vertex::from_coords(1.0, 1.0, VertexKind::Input));
        let d = m.add_vertex(Vertex::from_coords(0.0, 1.0, VertexKind::Input));
        let t1 = m.alloc_tri([a, b, d]);
        let t2 = m.alloc_tri([c, d, b]);
        // Shared edge b->d in t1 (opposite a), d->b in t2 (opposite c).
        let e1 = Otri::new(t1, m.orient_of(t1, b, d).unwrap());
        let e2 = Otri::new(t2, m.orient_of(t2, d, b).unwrap());
        m.bond(e1, e2);
        (m, t1, t2)
    }

    #[test]
    fn org_dest_apex_roundtrip() {
        let (m, t1, _) = two_tri_mesh();
        let ot = Otri::new(t1, 0);
        let (org, dest, apex) = (m.org(ot), m.dest(ot), m.apex(ot));
        assert_eq!(m.org(ot.lnext()), dest);
        assert_eq!(m.dest(ot.lnext()), apex);
        assert_eq!(m.apex(ot.lprev()), dest);
        assert_eq!(m.org(ot.lprev()), apex);
        assert_eq!(m.dest(ot.lprev()), org);
    }

    #[test]
    fn sym_is_involutive_on_bonded_edge() {
        let (m, t1, _) = two_tri_mesh();
        let shared = (0..3u8)
            .map(|o| Otri::new(t1, o))
            .find(|&ot| !m.sym(ot).is_boundary())
            .unwrap();
        let back = m.sym(m.sym(shared));
        assert_eq!(back, shared);
        assert_eq!(m.org(m.sym(shared)), m.dest(shared));
        assert_eq!(m.dest(m.sym(shared)), m.org(shared));
    }

    #[test]
    fn seg_pivot_alignment() {
        let (mut m, t1, t2) = two_tri_mesh();
        let e1 = Otri::new(t1, m.orient_of(t1, VertexId(4), VertexId(6)).unwrap());
        let sid = m.alloc_subseg([VertexId(4), VertexId(6)], 7);
        m.bond_sub(e1, sid);
        m.bond_sub(m.sym(e1), sid);
        let os = m.seg_pivot(e1);
        assert_eq!(m.sub_org(os), m.org(e1));
        assert_eq!(m.sub_dest(os), m.dest(e1));
        assert_eq!(m.sub_mark(os), 7);
        let flipped = m.seg_pivot(m.sym(e1));
        assert_eq!(flipped, os.sym());
        assert_eq!(m.tri_pivot(os), e1);
        let _ = t2;
    }

    #[test]
    fn area_target_roundtrip() {
        let (mut m, t1, _) = two_tri_mesh();
        let ot = Otri::new(t1, 0);
        assert!(m.area_target(ot) <= 0.0);
        m.set_area_target(ot, 0.25);
        assert!((m.area_target(ot) - 0.25).abs() < f64::EPSILON);
    }
}
