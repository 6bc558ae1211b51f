//! Encroachment and triangle-quality tests.
//!
//! The encroachment test examines the apex angle subtended by a
//! subsegment: an apex sees the segment under more than 90 degrees when
//! it lies inside the diametral circle (Ruppert), and under more than
//! `180 - 2*min_angle` degrees when it lies inside the diametral lens
//! (Chew). The triangle test checks size bounds first, then the angle
//! bounds, sparing triangles whose shortest edge spans two concentric
//! shells around a small input angle (Miller-Pav-Walkington).

// Geometry code uses the conventional short names for coordinates.
#![allow(clippy::many_single_char_names)]

use mesh_cdt::{Mesh, Osub, Otri, VertexId, VertexKind};
use tracing::debug;

use crate::params::{Derived, RefineParams, SegmentSplitPolicy};
use crate::queues::{BadSubseg, BadSubsegQueue, BadTriangle, BadTriangleQueue};

/// Relative tolerance of the shell equidistance test.
const SHELL_TOLERANCE: f64 = 0.001;

/// Test one subsegment for encroachment and enqueue it if the split
/// policy allows. Returns a bitmask: bit 0 for the handle's own side,
/// bit 1 for the opposite side.
pub(crate) fn check_subseg_encroach(
    mesh: &Mesh,
    params: &RefineParams,
    derived: &Derived,
    queue: &mut BadSubsegQueue,
    os: Osub,
) -> u8 {
    let e0 = mesh.sub_org(os);
    let e1 = mesh.sub_dest(os);
    let p0 = mesh.position(e0);
    let p1 = mesh.position(e1);

    let mut encroached = 0u8;
    let mut sides = 0u8;
    for (bit, side) in [(1u8, os), (2u8, os.sym())] {
        let t = mesh.tri_pivot(side);
        if t.is_boundary() || mesh.tri_is_dead(t) {
            continue;
        }
        let apex = mesh.apex(t);
        if mesh.is_infinite(apex) {
            continue;
        }
        sides += 1;
        let pa = mesh.position(apex);
        let v0 = (p0.x - pa.x, p0.y - pa.y);
        let v1 = (p1.x - pa.x, p1.y - pa.y);
        let dot = v0.0 * v1.0 + v0.1 * v1.1;
        if dot < 0.0 {
            let inside_lens = params.ruppert
                || dot * dot
                    >= derived.lens_factor
                        * (v0.0 * v0.0 + v0.1 * v0.1)
                        * (v1.0 * v1.0 + v1.1 * v1.1);
            if inside_lens {
                encroached |= bit;
            }
        }
    }

    if encroached != 0 {
        let allowed = match params.segment_split {
            SegmentSplitPolicy::Always => true,
            SegmentSplitPolicy::InteriorOnly => sides == 2,
            SegmentSplitPolicy::Never => false,
        };
        if allowed {
            // Queue the handle of the first encroaching side; swap the
            // snapshot when only the far side is encroached.
            let bad = if encroached & 1 != 0 {
                BadSubseg {
                    handle: os,
                    org: e0,
                    dest: e1,
                }
            } else {
                BadSubseg {
                    handle: os.sym(),
                    org: e1,
                    dest: e0,
                }
            };
            debug!(?encroached, "subsegment encroached");
            queue.push(bad);
        }
    }
    encroached
}

/// Queue a subsegment that a rejected insertion landed on, subject to
/// the split policy. No encroachment test: the insertion cannot proceed
/// until this subsegment is split.
pub(crate) fn enqueue_broken_subseg(
    mesh: &Mesh,
    params: &RefineParams,
    queue: &mut BadSubsegQueue,
    os: Osub,
) {
    let allowed = match params.segment_split {
        SegmentSplitPolicy::Always => true,
        SegmentSplitPolicy::InteriorOnly => {
            [os, os.sym()].into_iter().all(|side| {
                let t = mesh.tri_pivot(side);
                !t.is_boundary() && !mesh.tri_is_dead(t) && !mesh.is_infinite(mesh.apex(t))
            })
        }
        SegmentSplitPolicy::Never => false,
    };
    if allowed {
        debug!("subsegment blocks an insertion and will be split");
        queue.push(BadSubseg {
            handle: os,
            org: mesh.sub_org(os),
            dest: mesh.sub_dest(os),
        });
    }
}

/// Test one triangle against the size and angle bounds and enqueue it if
/// it fails any of them.
pub(crate) fn test_triangle(
    mesh: &Mesh,
    params: &RefineParams,
    derived: &Derived,
    queue: &mut BadTriangleQueue,
    ot: Otri,
) {
    let org = mesh.org(ot);
    let dest = mesh.dest(ot);
    let apex = mesh.apex(ot);
    let po = mesh.position(org);
    let pd = mesh.position(dest);
    let pa = mesh.position(apex);

    let odx = pd.x - po.x;
    let ody = pd.y - po.y;
    let dax = pa.x - pd.x;
    let day = pa.y - pd.y;
    let aox = po.x - pa.x;
    let aoy = po.y - pa.y;
    let sq_od = odx * odx + ody * ody;
    let sq_da = dax * dax + day * day;
    let sq_ao = aox * aox + aoy * aoy;

    // Shortest edge, ties resolved in the fixed order OD, DA, AO.
    let mut min_sq = sq_od;
    let mut tri1 = ot;
    if sq_da < min_sq {
        min_sq = sq_da;
        tri1 = ot.lnext();
    }
    if sq_ao < min_sq {
        min_sq = sq_ao;
        tri1 = ot.lprev();
    }

    let enqueue = |queue: &mut BadTriangleQueue, mesh: &Mesh, tri1: Otri, key: f64| {
        queue.push(BadTriangle {
            handle: tri1,
            key,
            org: mesh.org(tri1),
            dest: mesh.dest(tri1),
            apex: mesh.apex(tri1),
        });
    };

    // Size bounds come first and are exempt from the shell rule.
    if params.max_area.is_some() || params.var_area || params.user_test.is_some() {
        let doubled = odx * day - ody * dax;
        let area = 0.5 * doubled.abs();
        if let Some(max_area) = params.max_area {
            if area > max_area {
                enqueue(queue, mesh, tri1, min_sq);
                return;
            }
        }
        if params.var_area {
            let target = mesh.area_target(ot);
            if target > 0.0 && area > target {
                enqueue(queue, mesh, tri1, min_sq);
                return;
            }
        }
        if let Some(user_test) = params.user_test {
            if user_test(po, pd, pa, area) {
                enqueue(queue, mesh, tri1, min_sq);
                return;
            }
        }
    }

    // Squared cosine at the vertex opposite the shortest edge (the
    // triangle's smallest angle).
    let base1 = mesh.org(tri1);
    let base2 = mesh.dest(tri1);
    let small = mesh.apex(tri1);
    let ps = mesh.position(small);
    let w0 = (mesh.position(base1).x - ps.x, mesh.position(base1).y - ps.y);
    let w1 = (mesh.position(base2).x - ps.x, mesh.position(base2).y - ps.y);
    let dot = w0.0 * w1.0 + w0.1 * w1.1;
    let cos_sq =
        dot * dot / ((w0.0 * w0.0 + w0.1 * w0.1) * (w1.0 * w1.0 + w1.1 * w1.1));

    let mut angle_bad = cos_sq > derived.good_angle;

    if !angle_bad && params.max_angle != 0.0 {
        // Signed cosine at the vertex opposite the longest edge (the
        // largest angle), same identification pattern with max.
        let mut max_sq = sq_od;
        let mut tri_max = ot;
        if sq_da > max_sq {
            max_sq = sq_da;
            tri_max = ot.lnext();
        }
        if sq_ao > max_sq {
            tri_max = ot.lprev();
        }
        let wide = mesh.apex(tri_max);
        let pw = mesh.position(wide);
        let u0 = (
            mesh.position(mesh.org(tri_max)).x - pw.x,
            mesh.position(mesh.org(tri_max)).y - pw.y,
        );
        let u1 = (
            mesh.position(mesh.dest(tri_max)).x - pw.x,
            mesh.position(mesh.dest(tri_max)).y - pw.y,
        );
        let dot_wide = u0.0 * u1.0 + u0.1 * u1.1;
        let cos_wide = dot_wide
            / ((u0.0 * u0.0 + u0.1 * u0.1).sqrt() * (u1.0 * u1.0 + u1.1 * u1.1).sqrt());
        if cos_wide < derived.max_good_angle {
            angle_bad = true;
        }
    }

    if angle_bad {
        if shell_exempt(mesh, tri1, base1, base2) {
            debug!("skinny triangle exempted by the concentric-shell rule");
            return;
        }
        enqueue(queue, mesh, tri1, min_sq);
    }
}

/// Miller-Pav-Walkington rule: a skinny triangle whose shortest edge
/// spans two segments meeting at a common endpoint, at matching
/// distances, sits between concentric shells around a small input angle
/// and cannot be improved. Splitting it would cascade forever.
fn shell_exempt(mesh: &Mesh, tri1: Otri, base1: VertexId, base2: VertexId) -> bool {
    if mesh.vertex(base1).kind != VertexKind::Segment
        || mesh.vertex(base2).kind != VertexKind::Segment
    {
        return false;
    }
    let segs1 = incident_subsegments(mesh, tri1);
    let segs2 = incident_subsegments(mesh, tri1.lnext());
    let p1 = mesh.position(base1);
    let p2 = mesh.position(base2);
    for &s1 in &segs1 {
        let ends1 = [mesh.sub_org(s1), mesh.sub_dest(s1)];
        for &s2 in &segs2 {
            let ends2 = [mesh.sub_org(s2), mesh.sub_dest(s2)];
            for &join in ends1.iter().filter(|e| ends2.contains(e)) {
                let pj = mesh.position(join);
                let d1 = (p1 - pj).norm();
                let d2 = (p2 - pj).norm();
                if d1 < (1.0 + SHELL_TOLERANCE) * d2 && d1 > (1.0 - SHELL_TOLERANCE) * d2 {
                    return true;
                }
            }
        }
    }
    false
}

/// Walk the mesh around the origin of `start` and collect the constrained
/// subsegments incident to it.
fn incident_subsegments(mesh: &Mesh, start: Otri) -> Vec<Osub> {
    let mut found = Vec::new();
    let mut h = start;
    loop {
        let seg = mesh.seg_pivot(h);
        if !seg.is_none() {
            found.push(seg);
        }
        h = mesh.onext(h);
        if h == start || h.is_boundary() {
            break;
        }
    }
    found
}
