//! Robust geometric predicates and Steiner-point construction.
//!
//! `orient2d` and `incircle` evaluate a floating-point determinant first
//! and fall back to exact expansion arithmetic (error-free transforms)
//! only when the rounded value is too close to zero to trust. The exact
//! path represents every intermediate value as a nonoverlapping expansion
//! of `f64` components, so the returned sign is the true sign.
//!
//! When the caller disables exact arithmetic the raw floating-point value
//! is returned unconditionally.

// Geometry code uses the conventional short names for coordinates.
#![allow(clippy::many_single_char_names)]
#![allow(clippy::similar_names)]

use nalgebra::Point2;

const SPLITTER: f64 = 134_217_729.0; // 2^27 + 1
const EPSILON: f64 = f64::EPSILON / 2.0; // 2^-53

// Filter bounds from Shewchuk's analysis.
const CCW_ERRBOUND_A: f64 = (3.0 + 16.0 * EPSILON) * EPSILON;
const ICC_ERRBOUND_A: f64 = (10.0 + 96.0 * EPSILON) * EPSILON;

#[inline]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let x = a + b;
    let bvirt = x - a;
    let avirt = x - bvirt;
    let bround = b - bvirt;
    let around = a - avirt;
    (x, around + bround)
}

#[inline]
fn two_diff(a: f64, b: f64) -> (f64, f64) {
    let x = a - b;
    let bvirt = a - x;
    let avirt = x + bvirt;
    let bround = bvirt - b;
    let around = a - avirt;
    (x, around + bround)
}

#[inline]
fn split(a: f64) -> (f64, f64) {
    let c = SPLITTER * a;
    let abig = c - a;
    let ahi = c - abig;
    (ahi, a - ahi)
}

#[inline]
fn two_product(a: f64, b: f64) -> (f64, f64) {
    let x = a * b;
    let (ahi, alo) = split(a);
    let (bhi, blo) = split(b);
    let err1 = x - ahi * bhi;
    let err2 = err1 - alo * bhi;
    let err3 = err2 - ahi * blo;
    (x, alo * blo - err3)
}

/// Sum two nonoverlapping expansions, eliminating zero components.
///
/// Components are ordered by increasing magnitude, as produced by the
/// error-free transforms above.
fn expansion_sum(e: &[f64], f: &[f64]) -> Vec<f64> {
    if e.is_empty() {
        return f.to_vec();
    }
    if f.is_empty() {
        return e.to_vec();
    }

    let mut h = Vec::with_capacity(e.len() + f.len());
    let mut eindex = 0;
    let mut findex = 0;
    let mut enow = e[0];
    let mut fnow = f[0];

    let mut q;
    if (fnow > enow) == (fnow > -enow) {
        q = enow;
        eindex += 1;
    } else {
        q = fnow;
        findex += 1;
    }

    let mut hh;
    while eindex < e.len() && findex < f.len() {
        enow = e[eindex];
        fnow = f[findex];
        let (qnew, err) = if (fnow > enow) == (fnow > -enow) {
            eindex += 1;
            two_sum(q, enow)
        } else {
            findex += 1;
            two_sum(q, fnow)
        };
        q = qnew;
        hh = err;
        if hh != 0.0 {
            h.push(hh);
        }
    }
    while eindex < e.len() {
        let (qnew, err) = two_sum(q, e[eindex]);
        eindex += 1;
        q = qnew;
        if err != 0.0 {
            h.push(err);
        }
    }
    while findex < f.len() {
        let (qnew, err) = two_sum(q, f[findex]);
        findex += 1;
        q = qnew;
        if err != 0.0 {
            h.push(err);
        }
    }
    if q != 0.0 || h.is_empty() {
        h.push(q);
    }
    h
}

/// Multiply an expansion by a single `f64`, eliminating zero components.
fn scale_expansion(e: &[f64], b: f64) -> Vec<f64> {
    if e.is_empty() || b == 0.0 {
        return vec![0.0];
    }

    let mut h = Vec::with_capacity(2 * e.len());
    let (mut q, hh) = two_product(e[0], b);
    if hh != 0.0 {
        h.push(hh);
    }
    for &enow in &e[1..] {
        let (product1, product0) = two_product(enow, b);
        let (sum, err) = two_sum(q, product0);
        if err != 0.0 {
            h.push(err);
        }
        let (qnew, err) = two_sum(product1, sum);
        q = qnew;
        if err != 0.0 {
            h.push(err);
        }
    }
    if q != 0.0 || h.is_empty() {
        h.push(q);
    }
    h
}

/// Exact product of two expansions.
fn expansion_product(e: &[f64], f: &[f64]) -> Vec<f64> {
    let mut result = vec![0.0];
    for &fi in f {
        if fi != 0.0 {
            let partial = scale_expansion(e, fi);
            result = expansion_sum(&result, &partial);
        }
    }
    result
}

fn expansion_neg(e: &[f64]) -> Vec<f64> {
    e.iter().map(|x| -x).collect()
}

/// The largest-magnitude component carries the sign of the expansion.
fn expansion_sign_value(e: &[f64]) -> f64 {
    *e.last().unwrap_or(&0.0)
}

fn diff_expansion(a: f64, b: f64) -> Vec<f64> {
    let (x, y) = two_diff(a, b);
    if y == 0.0 {
        vec![x]
    } else {
        vec![y, x]
    }
}

fn orient2d_exact(pa: Point2<f64>, pb: Point2<f64>, pc: Point2<f64>) -> f64 {
    let acx = diff_expansion(pa.x, pc.x);
    let acy = diff_expansion(pa.y, pc.y);
    let bcx = diff_expansion(pb.x, pc.x);
    let bcy = diff_expansion(pb.y, pc.y);

    let left = expansion_product(&acx, &bcy);
    let right = expansion_product(&acy, &bcx);
    let det = expansion_sum(&left, &expansion_neg(&right));
    expansion_sign_value(&det)
}

/// Signed doubled area of triangle `(pa, pb, pc)`.
///
/// Positive when the points occur in counterclockwise order, negative for
/// clockwise, zero for collinear. With `exact` set the sign is reliable
/// for any input; otherwise the raw floating-point determinant is
/// returned.
#[must_use]
pub fn orient2d(pa: Point2<f64>, pb: Point2<f64>, pc: Point2<f64>, exact: bool) -> f64 {
    let detleft = (pa.x - pc.x) * (pb.y - pc.y);
    let detright = (pa.y - pc.y) * (pb.x - pc.x);
    let det = detleft - detright;
    if !exact {
        return det;
    }

    let detsum = if detleft > 0.0 {
        if detright <= 0.0 {
            return det;
        }
        detleft + detright
    } else if detleft < 0.0 {
        if detright >= 0.0 {
            return det;
        }
        -detleft - detright
    } else {
        return orient2d_exact(pa, pb, pc);
    };

    let errbound = CCW_ERRBOUND_A * detsum;
    if det >= errbound || -det >= errbound {
        return det;
    }
    orient2d_exact(pa, pb, pc)
}

fn incircle_exact(pa: Point2<f64>, pb: Point2<f64>, pc: Point2<f64>, pd: Point2<f64>) -> f64 {
    let adx = diff_expansion(pa.x, pd.x);
    let ady = diff_expansion(pa.y, pd.y);
    let bdx = diff_expansion(pb.x, pd.x);
    let bdy = diff_expansion(pb.y, pd.y);
    let cdx = diff_expansion(pc.x, pd.x);
    let cdy = diff_expansion(pc.y, pd.y);

    let alift = expansion_sum(
        &expansion_product(&adx, &adx),
        &expansion_product(&ady, &ady),
    );
    let blift = expansion_sum(
        &expansion_product(&bdx, &bdx),
        &expansion_product(&bdy, &bdy),
    );
    let clift = expansion_sum(
        &expansion_product(&cdx, &cdx),
        &expansion_product(&cdy, &cdy),
    );

    let bxcy = expansion_product(&bdx, &cdy);
    let cxby = expansion_product(&cdx, &bdy);
    let bc = expansion_sum(&bxcy, &expansion_neg(&cxby));

    let cxay = expansion_product(&cdx, &ady);
    let axcy = expansion_product(&adx, &cdy);
    let ca = expansion_sum(&cxay, &expansion_neg(&axcy));

    let axby = expansion_product(&adx, &bdy);
    let bxay = expansion_product(&bdx, &ady);
    let ab = expansion_sum(&axby, &expansion_neg(&bxay));

    let term_a = expansion_product(&alift, &bc);
    let term_b = expansion_product(&blift, &ca);
    let term_c = expansion_product(&clift, &ab);

    let det = expansion_sum(&expansion_sum(&term_a, &term_b), &term_c);
    expansion_sign_value(&det)
}

/// In-circle test for the circumcircle of counterclockwise `(pa, pb, pc)`.
///
/// Positive when `pd` lies strictly inside the circle, negative outside,
/// zero on it. With `exact` set the sign is reliable for any input.
#[must_use]
pub fn incircle(
    pa: Point2<f64>,
    pb: Point2<f64>,
    pc: Point2<f64>,
    pd: Point2<f64>,
    exact: bool,
) -> f64 {
    let adx = pa.x - pd.x;
    let bdx = pb.x - pd.x;
    let cdx = pc.x - pd.x;
    let ady = pa.y - pd.y;
    let bdy = pb.y - pd.y;
    let cdy = pc.y - pd.y;

    let bdxcdy = bdx * cdy;
    let cdxbdy = cdx * bdy;
    let alift = adx * adx + ady * ady;

    let cdxady = cdx * ady;
    let adxcdy = adx * cdy;
    let blift = bdx * bdx + bdy * bdy;

    let adxbdy = adx * bdy;
    let bdxady = bdx * ady;
    let clift = cdx * cdx + cdy * cdy;

    let det = alift * (bdxcdy - cdxbdy) + blift * (cdxady - adxcdy) + clift * (adxbdy - bdxady);
    if !exact {
        return det;
    }

    let permanent = (bdxcdy.abs() + cdxbdy.abs()) * alift
        + (cdxady.abs() + adxcdy.abs()) * blift
        + (adxbdy.abs() + bdxady.abs()) * clift;
    let errbound = ICC_ERRBOUND_A * permanent;
    if det > errbound || -det > errbound {
        return det;
    }
    incircle_exact(pa, pb, pc, pd)
}

/// Circumcenter of `(org, dest, apex)`, optionally relocated to the
/// off-center.
///
/// Returns the chosen point together with its coordinates `(xi, eta)` in
/// the frame spanned by org→dest and org→apex. With a positive
/// `off_constant`, the off-center on the bisector of the shortest edge is
/// used whenever it is closer to that edge than the circumcenter is; an
/// `off_constant` of zero yields the plain circumcenter.
#[must_use]
pub fn find_circumcenter(
    org: Point2<f64>,
    dest: Point2<f64>,
    apex: Point2<f64>,
    off_constant: f64,
    exact: bool,
) -> (Point2<f64>, f64, f64) {
    let xdo = dest.x - org.x;
    let ydo = dest.y - org.y;
    let xao = apex.x - org.x;
    let yao = apex.y - org.y;
    let dodist = xdo * xdo + ydo * ydo;
    let aodist = xao * xao + yao * yao;
    let dadist = (dest.x - apex.x) * (dest.x - apex.x) + (dest.y - apex.y) * (dest.y - apex.y);

    let denominator = if exact {
        0.5 / orient2d(dest, apex, org, true)
    } else {
        0.5 / (xdo * yao - xao * ydo)
    };

    let mut dx = (yao * dodist - ydo * aodist) * denominator;
    let mut dy = (xdo * aodist - xao * dodist) * denominator;

    // Alper Ungor's off-center: a point on the bisector of the shortest
    // edge, capped so the new triangle at that edge just meets the angle
    // bound. Taking the nearer of off-center and circumcenter keeps all
    // insertions inside the circumcircle.
    if off_constant > 0.0 {
        if dodist < aodist && dodist < dadist {
            let dxoff = 0.5 * xdo - off_constant * ydo;
            let dyoff = 0.5 * ydo + off_constant * xdo;
            if dxoff * dxoff + dyoff * dyoff < dx * dx + dy * dy {
                dx = dxoff;
                dy = dyoff;
            }
        } else if aodist < dadist {
            let dxoff = 0.5 * xao + off_constant * yao;
            let dyoff = 0.5 * yao - off_constant * xao;
            if dxoff * dxoff + dyoff * dyoff < dx * dx + dy * dy {
                dx = dxoff;
                dy = dyoff;
            }
        } else {
            let dxoff = 0.5 * (apex.x - dest.x) - off_constant * (apex.y - dest.y);
            let dyoff = 0.5 * (apex.y - dest.y) + off_constant * (apex.x - dest.x);
            if dxoff * dxoff + dyoff * dyoff < (dx - xdo) * (dx - xdo) + (dy - ydo) * (dy - ydo) {
                dx = xdo + dxoff;
                dy = ydo + dyoff;
            }
        }
    }

    let xi = (yao * dx - xao * dy) * (2.0 * denominator);
    let eta = (xdo * dy - ydo * dx) * (2.0 * denominator);
    (Point2::new(org.x + dx, org.y + dy), xi, eta)
}
