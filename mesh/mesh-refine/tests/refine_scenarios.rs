//! End-to-end refinement scenarios: the classical seed cases plus the
//! engine's observable laws (Steiner accounting, no encroachment on
//! success, consistency preservation, attribute linearity).

use mesh_cdt::{Mesh, Osub, Otri, Point2, Pslg, VertexKind};
use mesh_refine::{check_delaunay, check_mesh, enforce_quality, RefineParams};

// ----- helpers -------------------------------------------------------------

fn unit_square(with_diagonal: bool) -> Mesh {
    let mut segments = vec![[0, 1], [1, 2], [2, 3], [3, 0]];
    if with_diagonal {
        segments.push([0, 2]);
    }
    let pslg = Pslg::from_points(vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ])
    .with_segments(segments);
    Mesh::triangulate(&pslg).unwrap()
}

fn corner_angles(mesh: &Mesh, ot: Otri) -> [f64; 3] {
    let p = [
        mesh.position(mesh.org(ot)),
        mesh.position(mesh.dest(ot)),
        mesh.position(mesh.apex(ot)),
    ];
    let mut angles = [0.0f64; 3];
    for i in 0..3 {
        let u = p[(i + 1) % 3] - p[i];
        let v = p[(i + 2) % 3] - p[i];
        let cos = u.dot(&v) / (u.norm() * v.norm());
        angles[i] = cos.clamp(-1.0, 1.0).acos().to_degrees();
    }
    angles
}

fn min_angle_deg(mesh: &Mesh) -> f64 {
    mesh.triangles()
        .flat_map(|ot| corner_angles(mesh, ot))
        .fold(f64::INFINITY, f64::min)
}

fn triangle_area(mesh: &Mesh, ot: Otri) -> f64 {
    let o = mesh.position(mesh.org(ot));
    let d = mesh.position(mesh.dest(ot));
    let a = mesh.position(mesh.apex(ot));
    0.5 * ((d.x - o.x) * (a.y - o.y) - (d.y - o.y) * (a.x - o.x)).abs()
}

/// Re-derive encroachment from its definition, independent of the
/// engine's own tester.
fn subseg_encroached(mesh: &Mesh, os: Osub, ruppert: bool, min_angle: f64) -> bool {
    let good = min_angle.to_radians().cos().powi(2);
    let lens = (2.0 * good - 1.0).powi(2);
    let p0 = mesh.position(mesh.sub_org(os));
    let p1 = mesh.position(mesh.sub_dest(os));
    for side in [os, os.sym()] {
        let t = mesh.tri_pivot(side);
        if t.is_boundary() || mesh.tri_is_dead(t) {
            continue;
        }
        let apex = mesh.apex(t);
        if mesh.is_infinite(apex) {
            continue;
        }
        let pa = mesh.position(apex);
        let v0 = p0 - pa;
        let v1 = p1 - pa;
        let dot = v0.dot(&v1);
        if dot < 0.0 && (ruppert || dot * dot >= lens * v0.norm_squared() * v1.norm_squared()) {
            return true;
        }
    }
    false
}

fn encroached_count(mesh: &Mesh, ruppert: bool, min_angle: f64) -> usize {
    mesh.subsegments()
        .filter(|&os| subseg_encroached(mesh, os, ruppert, min_angle))
        .count()
}

// ----- seed scenarios ------------------------------------------------------

/// S1: the square with a diagonal already meets a 20 degree bound; the
/// engine must not touch it.
#[test]
fn square_with_diagonal_needs_no_work() {
    let mut mesh = unit_square(true);
    let params = RefineParams::with_min_angle(20.0);
    let report = enforce_quality(&mut mesh, &params).unwrap();

    assert_eq!(report.steiner_points, 0);
    assert_eq!(mesh.triangle_count(), 2);
    assert!((min_angle_deg(&mesh) - 45.0).abs() < 1e-9);
    assert!(check_mesh(&mut mesh).is_consistent());
}

/// S2: an area cap forces real refinement; quality and consistency must
/// survive it.
#[test]
fn area_cap_refines_the_square() {
    let mut mesh = unit_square(false);
    let params = RefineParams::with_min_angle(20.0)
        .and_max_area(0.1)
        .and_steiner_limit(5000);
    let report = enforce_quality(&mut mesh, &params).unwrap();

    assert!(report.steiner_remaining.unwrap() > 0, "refinement should settle");
    assert!(report.steiner_points > 0);
    assert!(mesh.triangle_count() >= 10);
    for ot in mesh.triangles() {
        assert!(triangle_area(&mesh, ot) <= 0.1 + 1e-12);
    }
    assert!(min_angle_deg(&mesh) >= 20.0 - 1e-9);
    assert!(check_mesh(&mut mesh).is_consistent());
    assert!(check_delaunay(&mut mesh).is_delaunay());
    // Law 3: on success nothing remains encroached.
    assert_eq!(encroached_count(&mesh, false, 20.0), 0);
}

/// S3: the needle triangle has two tiny input angles; the shell
/// machinery must bring the run to an end well within the budget.
#[test]
fn needle_terminates() {
    let pslg = Pslg::from_points(vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(0.5, 0.001),
    ])
    .with_segments(vec![[0, 1], [1, 2], [2, 0]]);
    let mut mesh = Mesh::triangulate(&pslg).unwrap();

    let params = RefineParams::with_min_angle(20.0).and_steiner_limit(2000);
    let report = enforce_quality(&mut mesh, &params).unwrap();

    assert!(
        report.steiner_remaining.unwrap() > 0,
        "refinement of the needle should stop before the budget does"
    );
    assert!(check_mesh(&mut mesh).is_consistent());
}

/// S4: two segments meeting at 10 degrees. Splits near the shared
/// endpoint must land on power-of-two shells.
#[test]
fn small_angle_splits_on_shells() {
    let (c, s) = (10.0f64.to_radians().cos(), 10.0f64.to_radians().sin());
    let pslg = Pslg::from_points(vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(c, s),
    ])
    .with_segments(vec![[0, 1], [0, 2]]);
    let mut mesh = Mesh::triangulate(&pslg).unwrap();

    let params = RefineParams::with_min_angle(20.0).and_steiner_limit(2000);
    let report = enforce_quality(&mut mesh, &params).unwrap();
    assert!(report.steiner_remaining.unwrap() > 0);
    assert!(check_mesh(&mut mesh).is_consistent());

    // Innermost Steiner vertex on each ray sits at a power-of-two radius.
    for ray_end in [Point2::new(1.0, 0.0), Point2::new(c, s)] {
        let innermost = mesh
            .domain_vertices()
            .filter(|&v| {
                mesh.vertex(v).kind == VertexKind::Segment
                    && mesh.position(v) != Point2::new(0.0, 0.0)
                    && mesh.position(v) != ray_end
                    && on_ray(mesh.position(v), ray_end)
            })
            .map(|v| mesh.position(v).coords.norm())
            .fold(f64::INFINITY, f64::min);
        if innermost.is_finite() {
            let log = innermost.log2();
            assert!(
                (log - log.round()).abs() < 1e-12,
                "innermost shell radius {innermost} is not a power of two"
            );
        }
    }
}

fn on_ray(p: Point2<f64>, ray_end: Point2<f64>) -> bool {
    (p.x * ray_end.y - p.y * ray_end.x).abs() < 1e-9 && p.coords.dot(&ray_end.coords) > 0.0
}

/// S5: a zero Steiner budget returns immediately even with encroachments
/// present, leaving the mesh untouched and consistent.
#[test]
fn zero_budget_returns_immediately() {
    let pslg = Pslg::from_points(vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(0.5, 0.05),
    ])
    .with_segments(vec![[0, 1], [1, 2], [2, 0]]);
    let mut mesh = Mesh::triangulate(&pslg).unwrap();
    assert!(encroached_count(&mesh, true, 20.0) > 0);

    let verts_before = mesh.vertex_count();
    let params = RefineParams::with_min_angle(20.0)
        .and_ruppert()
        .and_steiner_limit(0);
    let report = enforce_quality(&mut mesh, &params).unwrap();

    assert_eq!(report.steiner_points, 0);
    assert_eq!(mesh.vertex_count(), verts_before);
    assert_eq!(report.steiner_remaining, Some(0));
    assert!(check_mesh(&mut mesh).is_consistent());
}

/// S6: a user veto on triangles strictly containing the square's center.
/// The diagonal passes through the center, so no triangle ever does, and
/// the property must hold on return.
#[test]
fn user_test_keeps_point_uncovered() {
    fn contains_center(
        o: Point2<f64>,
        d: Point2<f64>,
        a: Point2<f64>,
        _area: f64,
    ) -> bool {
        let p = Point2::new(0.5, 0.5);
        let side = |u: Point2<f64>, v: Point2<f64>| (v.x - u.x) * (p.y - u.y) - (v.y - u.y) * (p.x - u.x);
        side(o, d) > 0.0 && side(d, a) > 0.0 && side(a, o) > 0.0
    }

    let mut mesh = unit_square(true);
    let params = RefineParams::default()
        .and_user_test(contains_center)
        .and_steiner_limit(100);
    enforce_quality(&mut mesh, &params).unwrap();

    for ot in mesh.triangles() {
        let o = mesh.position(mesh.org(ot));
        let d = mesh.position(mesh.dest(ot));
        let a = mesh.position(mesh.apex(ot));
        assert!(
            !contains_center(o, d, a, 0.0),
            "a triangle still strictly contains the center"
        );
    }
    assert!(check_mesh(&mut mesh).is_consistent());
}

/// Per-triangle area targets: on return, every triangle carrying a
/// positive target satisfies it.
#[test]
fn variable_area_targets_are_honored() {
    let mut mesh = unit_square(true);
    let handles: Vec<Otri> = mesh.triangles().collect();
    for ot in handles {
        let o = mesh.position(mesh.org(ot));
        let d = mesh.position(mesh.dest(ot));
        let a = mesh.position(mesh.apex(ot));
        let centroid = Point2::new((o.x + d.x + a.x) / 3.0, (o.y + d.y + a.y) / 3.0);
        // Constrain only the half below the diagonal.
        if centroid.y < centroid.x {
            mesh.set_area_target(ot, 0.04);
        }
    }

    let params = RefineParams::with_min_angle(20.0)
        .and_var_area()
        .and_steiner_limit(3000);
    let report = enforce_quality(&mut mesh, &params).unwrap();

    assert!(report.steiner_remaining.unwrap() > 0, "refinement should settle");
    assert!(report.steiner_points > 0);
    for ot in mesh.triangles() {
        let target = mesh.area_target(ot);
        if target > 0.0 {
            assert!(triangle_area(&mesh, ot) <= target + 1e-12);
        }
    }
    assert!(check_mesh(&mut mesh).is_consistent());
}

// ----- laws ----------------------------------------------------------------

/// Law 1: the number of vertices added equals the Steiner budget
/// consumed.
#[test]
fn steiner_accounting_is_exact() {
    let mut mesh = unit_square(false);
    let verts_before = mesh.vertex_count();

    let limit = 10;
    let params = RefineParams::with_min_angle(20.0)
        .and_max_area(0.01)
        .and_ruppert()
        .and_steiner_limit(limit);
    let report = enforce_quality(&mut mesh, &params).unwrap();

    let added = mesh.vertex_count() - verts_before;
    assert_eq!(added, report.steiner_points);
    assert_eq!(
        report.steiner_points,
        limit - report.steiner_remaining.unwrap()
    );
    // The cap genuinely bit: the budget is fully consumed.
    assert_eq!(report.steiner_remaining, Some(0));
    assert!(check_mesh(&mut mesh).is_consistent());
}

/// Ruppert mode on a clean square: conforming Delaunay output with the
/// angle bound met everywhere.
#[test]
fn ruppert_square_meets_angle_bound() {
    let mut mesh = unit_square(false);
    let params = RefineParams::with_min_angle(25.0)
        .and_max_area(0.05)
        .and_ruppert()
        .and_steiner_limit(5000);
    let report = enforce_quality(&mut mesh, &params).unwrap();

    assert!(report.steiner_remaining.unwrap() > 0, "refinement should settle");
    assert!(min_angle_deg(&mesh) >= 25.0 - 1e-9);
    assert_eq!(encroached_count(&mesh, true, 25.0), 0);
    assert!(check_mesh(&mut mesh).is_consistent());
    assert!(check_delaunay(&mut mesh).is_delaunay());
}

/// Law 7: attributes of segment-split vertices are linear in the split
/// parameter.
#[test]
fn split_attributes_are_linear() {
    let mut pslg = Pslg::from_points(vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(0.5, 0.05),
    ])
    .with_segments(vec![[0, 1], [1, 2], [2, 0]]);
    pslg.point_attrs = vec![vec![0.0, 5.0], vec![100.0, 5.0], vec![40.0, 5.0]];
    let mut mesh = Mesh::triangulate(&pslg).unwrap();

    let params = RefineParams::with_min_angle(5.0)
        .and_ruppert()
        .and_steiner_limit(200);
    enforce_quality(&mut mesh, &params).unwrap();

    // Vertices created on the bottom segment interpolate the corner
    // attributes along x.
    let mut checked = 0;
    for v in mesh.domain_vertices() {
        let vertex = mesh.vertex(v);
        let p = vertex.position;
        if vertex.kind == VertexKind::Segment && p.y.abs() < 1e-9 && p.x > 0.0 && p.x < 1.0 {
            let expected = 100.0 * p.x;
            assert!(
                (vertex.attrs[0] - expected).abs() < 1e-6,
                "attr {} at x={} (expected {expected})",
                vertex.attrs[0],
                p.x
            );
            assert!((vertex.attrs[1] - 5.0).abs() < 1e-9);
            checked += 1;
        }
    }
    assert!(checked > 0, "the bottom segment should have been split");
}
