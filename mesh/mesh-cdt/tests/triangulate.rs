//! Integration tests for triangulation construction and incremental
//! updates, driven entirely through the public API.

use mesh_cdt::{InsertStatus, Mesh, NoopObserver, Osub, Otri, Point2, Pslg, Vertex, VertexKind};

fn square_with_diagonal() -> Mesh {
    let pslg = Pslg::from_points(vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ])
    .with_segments(vec![[0, 1], [1, 2], [2, 3], [3, 0], [0, 2]]);
    Mesh::triangulate(&pslg).unwrap()
}

/// Every directed edge of every live triangle must agree with its
/// neighbor about the shared edge, and domain triangles must be
/// counterclockwise.
fn assert_consistent(mesh: &Mesh) {
    for ot in mesh.live_triangles() {
        for edge in [ot, ot.lnext(), ot.lprev()] {
            let s = mesh.sym(edge);
            if s.is_boundary() {
                continue;
            }
            assert!(!mesh.tri_is_dead(s), "neighbor link to dead triangle");
            assert_eq!(mesh.sym(s), edge, "asymmetric neighbor link");
            assert_eq!(mesh.org(s), mesh.dest(edge));
            assert_eq!(mesh.dest(s), mesh.org(edge));
            let seg = mesh.seg_pivot(edge);
            if !seg.is_none() {
                assert_eq!(mesh.seg_pivot(s), seg.sym(), "subsegment bond mismatch");
            }
        }
        if mesh.tri_is_finite(ot) {
            assert!(
                mesh.counterclockwise(mesh.org(ot), mesh.dest(ot), mesh.apex(ot)) > 0.0,
                "domain triangle is not counterclockwise"
            );
        }
    }
    for os in mesh.subsegments() {
        for side in [os, os.sym()] {
            let t = mesh.tri_pivot(side);
            if t.is_boundary() {
                continue;
            }
            assert_eq!(mesh.org(t), mesh.sub_org(side), "subsegment side misaligned");
            assert_eq!(mesh.dest(t), mesh.sub_dest(side));
        }
    }
}

fn edge_with_org(mesh: &Mesh, position: Point2<f64>) -> Otri {
    mesh.live_triangles()
        .flat_map(|ot| [ot, ot.lnext(), ot.lprev()])
        .find(|&e| mesh.position(mesh.org(e)) == position)
        .expect("no edge with requested origin")
}

#[test]
fn construction_is_consistent() {
    let mesh = square_with_diagonal();
    assert_consistent(&mesh);
    assert_eq!(mesh.triangle_count(), 2);
    assert_eq!(mesh.subsegment_count(), 5);
}

#[test]
fn interior_insertion_grows_the_star() {
    let mut mesh = square_with_diagonal();
    let start = mesh.triangles().next().unwrap();
    let status = mesh.insert_vertex(
        Vertex::from_coords(0.25, 0.5, VertexKind::Free),
        start,
        None,
        false,
        false,
        &mut NoopObserver,
    );
    assert_eq!(status, InsertStatus::Successful);
    assert_eq!(mesh.vertex_count(), 5);
    // One triangle became three (the point is interior to the upper or
    // lower half, strictly off the diagonal).
    assert_eq!(mesh.triangle_count(), 4);
    assert_consistent(&mesh);
}

#[test]
fn duplicate_insertion_is_reported() {
    let mut mesh = square_with_diagonal();
    let start = mesh.triangles().next().unwrap();
    let status = mesh.insert_vertex(
        Vertex::from_coords(1.0, 1.0, VertexKind::Free),
        start,
        None,
        false,
        false,
        &mut NoopObserver,
    );
    assert_eq!(status, InsertStatus::Duplicate);
    assert_eq!(mesh.vertex_count(), 4);
    assert_consistent(&mesh);
}

#[test]
fn landing_on_a_subsegment_is_violating() {
    let mut mesh = square_with_diagonal();
    let start = mesh.triangles().next().unwrap();
    // The diagonal midpoint lies exactly on a constrained subsegment.
    let status = mesh.insert_vertex(
        Vertex::from_coords(0.5, 0.5, VertexKind::Free),
        start,
        None,
        false,
        false,
        &mut NoopObserver,
    );
    assert_eq!(status, InsertStatus::Violating);
    assert_eq!(mesh.vertex_count(), 4);
    assert_consistent(&mesh);
}

#[test]
fn undo_restores_the_previous_mesh() {
    let mut mesh = square_with_diagonal();
    let tris_before = mesh.triangle_count();
    let verts_before = mesh.vertex_count();

    let start = mesh.triangles().next().unwrap();
    let status = mesh.insert_vertex(
        Vertex::from_coords(0.3, 0.21, VertexKind::Free),
        start,
        None,
        false,
        false,
        &mut NoopObserver,
    );
    assert_eq!(status, InsertStatus::Successful);
    assert_ne!(mesh.triangle_count(), tris_before);

    mesh.undo_vertex();
    assert_eq!(mesh.triangle_count(), tris_before);
    assert_eq!(mesh.vertex_count(), verts_before);
    assert_consistent(&mesh);
}

#[test]
fn splitting_a_subsegment_yields_linked_halves() {
    let mut mesh = square_with_diagonal();
    // The bottom side (0,0)->(1,0).
    let os = mesh
        .subsegments()
        .find(|&os| {
            mesh.position(mesh.sub_org(os)).y == 0.0 && mesh.position(mesh.sub_dest(os)).y == 0.0
        })
        .unwrap();
    let os = if mesh.position(mesh.sub_org(os)).x == 0.0 {
        os
    } else {
        os.sym()
    };
    let subsegs_before = mesh.subsegment_count();

    let mut seg = os;
    let status = mesh.insert_vertex(
        Vertex::from_coords(0.5, 0.0, VertexKind::Segment),
        mesh.tri_pivot(os),
        Some(&mut seg),
        false,
        false,
        &mut NoopObserver,
    );
    assert_eq!(status, InsertStatus::Successful);
    assert_eq!(mesh.subsegment_count(), subsegs_before + 1);
    assert_consistent(&mesh);

    // The rewritten handle covers the origin half; its continuation
    // covers the rest.
    assert_eq!(mesh.position(mesh.sub_org(seg)), Point2::new(0.0, 0.0));
    assert_eq!(mesh.position(mesh.sub_dest(seg)), Point2::new(0.5, 0.0));
    let second = mesh.next_subseg(seg);
    assert!(!second.is_none());
    assert_eq!(mesh.position(mesh.sub_org(second)), Point2::new(0.5, 0.0));
    assert_eq!(mesh.position(mesh.sub_dest(second)), Point2::new(1.0, 0.0));
    assert_eq!(mesh.sub_mark(second), mesh.sub_mark(seg));
    // The chain ends at the input corners.
    assert!(mesh.next_subseg(second).is_none());
    assert!(mesh.next_subseg(seg.sym()).is_none());
}

#[test]
fn deleting_a_free_vertex_restores_the_cavity() {
    let mut mesh = square_with_diagonal();
    let start = mesh.triangles().next().unwrap();
    let inserted = Point2::new(0.27, 0.65);
    let status = mesh.insert_vertex(
        Vertex::new(inserted, VertexKind::Free),
        start,
        None,
        false,
        false,
        &mut NoopObserver,
    );
    assert_eq!(status, InsertStatus::Successful);
    let tris_with_vertex = mesh.triangle_count();

    let spoke = edge_with_org(&mesh, inserted);
    mesh.delete_vertex(spoke, &mut NoopObserver);
    assert_eq!(mesh.triangle_count(), tris_with_vertex - 2);
    assert_eq!(mesh.vertex_count(), 4);
    assert_consistent(&mesh);
}

#[test]
fn attribute_interpolation_on_construction() {
    let mut pslg = Pslg::from_points(vec![
        Point2::new(0.0, 0.0),
        Point2::new(4.0, 0.0),
        Point2::new(0.0, 4.0),
    ]);
    pslg.point_attrs = vec![vec![10.0], vec![20.0], vec![30.0]];
    let mesh = Mesh::triangulate(&pslg).unwrap();
    assert_eq!(mesh.attr_count(), 1);
    for v in mesh.domain_vertices() {
        assert_eq!(mesh.vertex(v).attrs.len(), 1);
    }
}

#[test]
fn death_tests_track_slot_reuse() {
    let mut mesh = square_with_diagonal();
    let start = mesh.triangles().next().unwrap();
    mesh.insert_vertex(
        Vertex::from_coords(0.6, 0.2, VertexKind::Free),
        start,
        None,
        false,
        false,
        &mut NoopObserver,
    );
    let all_alive: Vec<Otri> = mesh.live_triangles().collect();
    for ot in all_alive {
        assert!(!mesh.tri_is_dead(ot));
    }
    let os: Vec<Osub> = mesh.subsegments().collect();
    for s in os {
        assert!(!mesh.subseg_is_dead(s));
    }
}
