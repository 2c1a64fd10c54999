//! Generic bezier curves of arbitrary degree
//!
//! Curves are parameterized over the control point element type, anything
//! with a vector space algebra works: scalars, 2D points, 3D vectors. The
//! fixed degree `Line`/`Quad`/`Cubic` types stay the fast path for path
//! segments, this module provides the machinery that needs arbitrary degree:
//! degree elevation, the Bernstein to power basis change, curve fitting and
//! resultant based intersections.

use crate::{
    curve::power_basis, BBox, Cubic, Curve, Line, Point, Polynomial, Quad, Scalar, Segment,
    EPSILON, EPSILON_SQRT,
};
use std::ops::{Add, Mul, Sub};

/// Algebra required of a bezier control point element.
///
/// Blanket-implemented for anything that is copyable and supports addition,
/// subtraction and scalar multiplication, in particular `Scalar`, `Point`
/// and `Vector3`.
pub trait BezierElement:
    Copy + Add<Output = Self> + Sub<Output = Self> + Mul<Scalar, Output = Self>
{
    /// Linear interpolation between two elements
    fn lerp(self, other: Self, t: Scalar) -> Self {
        self * (1.0 - t) + other * t
    }
}

impl<E> BezierElement for E where
    E: Copy + Add<Output = E> + Sub<Output = E> + Mul<Scalar, Output = E>
{
}

/// Binomial coefficient `C(n, k)`
pub(crate) fn binomial(n: usize, k: usize) -> Scalar {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 0..k {
        result = result * (n - i) as Scalar / (i + 1) as Scalar;
    }
    result
}

/// Bezier curve of arbitrary degree over element type `E`.
///
/// A curve with `N` control points has degree `N - 1`, constructing one with
/// fewer than two points is a programmer error and panics. All transforms
/// (split, elevation, derivative) return new curves.
#[derive(Debug, Clone, PartialEq)]
pub struct Bezier<E> {
    points: Vec<E>,
}

impl<E: BezierElement> Bezier<E> {
    pub fn new(points: Vec<E>) -> Self {
        assert!(points.len() >= 2, "bezier curve requires at least two points");
        Self { points }
    }

    pub fn points(&self) -> &[E] {
        &self.points
    }

    pub fn degree(&self) -> usize {
        self.points.len() - 1
    }

    pub fn start(&self) -> E {
        self.points[0]
    }

    pub fn end(&self) -> E {
        self.points[self.points.len() - 1]
    }

    /// Evaluate the curve at the parameter value.
    ///
    /// Degrees up to three use the expanded Bernstein closed forms, higher
    /// degrees fall back to the generic Bernstein binomial sum. The
    /// parameter is not clamped, values outside `0..=1` extrapolate.
    pub fn eval(&self, t: Scalar) -> E {
        let t_1 = 1.0 - t;
        match self.points.as_slice() {
            [p0, p1] => *p0 * t_1 + *p1 * t,
            [p0, p1, p2] => *p0 * (t_1 * t_1) + *p1 * (2.0 * t * t_1) + *p2 * (t * t),
            [p0, p1, p2, p3] => {
                let (t2, t_2) = (t * t, t_1 * t_1);
                *p0 * (t_2 * t_1) + *p1 * (3.0 * t * t_2) + *p2 * (3.0 * t2 * t_1) + *p3 * (t2 * t)
            }
            points => {
                let n = points.len() - 1;
                let mut result = points[0] * t_1.powi(n as i32);
                for (k, point) in points.iter().enumerate().skip(1) {
                    let weight = binomial(n, k) * t.powi(k as i32) * t_1.powi((n - k) as i32);
                    result = result + *point * weight;
                }
                result
            }
        }
    }

    /// Split the curve at the parameter value (de Casteljau subdivision).
    ///
    /// Parameters within tolerance of the range ends produce a degenerate
    /// constant curve on the short side instead of amplifying division
    /// error.
    pub fn split_at(&self, t: Scalar) -> (Self, Self) {
        if t < EPSILON_SQRT {
            let constant = Self {
                points: vec![self.start(); self.points.len()],
            };
            return (constant, self.clone());
        }
        if t > 1.0 - EPSILON_SQRT {
            let constant = Self {
                points: vec![self.end(); self.points.len()],
            };
            return (self.clone(), constant);
        }
        let mut level = self.points.clone();
        let mut left = Vec::with_capacity(level.len());
        let mut right = Vec::with_capacity(level.len());
        left.push(level[0]);
        right.push(level[level.len() - 1]);
        while level.len() > 1 {
            for i in 0..level.len() - 1 {
                level[i] = level[i].lerp(level[i + 1], t);
            }
            level.pop();
            left.push(level[0]);
            right.push(level[level.len() - 1]);
        }
        right.reverse();
        (Self { points: left }, Self { points: right })
    }

    /// Split the curve at multiple parameter values.
    ///
    /// Parameters are sorted ascending, each subsequent one is renormalized
    /// into the remaining curve by `(t - last) / (1 - last)`.
    pub fn split_many(&self, params: impl IntoIterator<Item = Scalar>) -> Vec<Self> {
        let mut params: Vec<_> = params.into_iter().collect();
        params.sort_by(|a, b| a.partial_cmp(b).expect("split parameter is NaN"));
        let mut result = Vec::with_capacity(params.len() + 1);
        let mut tail = self.clone();
        let mut last = 0.0;
        for t in params {
            if 1.0 - last < EPSILON {
                break;
            }
            let local = (t - last) / (1.0 - last);
            let (head, rest) = tail.split_at(local);
            result.push(head);
            tail = rest;
            last = t;
        }
        result.push(tail);
        result
    }

    /// Derivative curve, one degree lower.
    ///
    /// Control points are `n * (p[i + 1] - p[i])`. The derivative of a
    /// linear curve is a constant, encoded as two identical points.
    pub fn derivative(&self) -> Self {
        let n = self.degree() as Scalar;
        let points: Vec<E> = self
            .points
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) * n)
            .collect();
        if points.len() < 2 {
            let p = points[0];
            Self { points: vec![p, p] }
        } else {
            Self { points }
        }
    }

    /// Raise the degree by one without changing the curve.
    ///
    /// This is exact for the control points, not an approximation:
    /// `q[i] = p[i - 1] * i / (n + 1) + p[i] * (1 - i / (n + 1))`.
    pub fn elevated(&self) -> Self {
        let n = self.points.len();
        let mut points = Vec::with_capacity(n + 1);
        points.push(self.points[0]);
        for i in 1..n {
            let ratio = i as Scalar / n as Scalar;
            points.push(self.points[i - 1] * ratio + self.points[i] * (1.0 - ratio));
        }
        points.push(self.points[n - 1]);
        Self { points }
    }

    /// Identical curve directed from end to start
    pub fn reverse(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self { points }
    }
}

// -----------------------------------------------------------------------------
// Scalar curves: power basis conversion and stationary points
// -----------------------------------------------------------------------------

impl Bezier<Scalar> {
    /// Change of basis from Bernstein to power form:
    /// `c[j] = C(n, j) * sum (-1)^(j - i) * C(j, i) * p[i]`
    pub fn polynomial(&self) -> Polynomial {
        let n = self.degree();
        let mut coeffs = Vec::with_capacity(n + 1);
        for j in 0..=n {
            let mut sum = 0.0;
            for (i, point) in self.points.iter().enumerate().take(j + 1) {
                let sign = if (j - i) % 2 == 0 { 1.0 } else { -1.0 };
                sum += sign * binomial(j, i) * point;
            }
            coeffs.push(binomial(n, j) * sum);
        }
        Polynomial::new(coeffs)
    }

    /// Interior extrema of the scalar curve, the roots of its derivative
    pub fn stationary(&self) -> Vec<Scalar> {
        let mut roots = self.derivative().polynomial().trimmed().roots();
        roots.retain(|t| (0.0..=1.0).contains(t));
        roots
    }
}

impl From<Polynomial> for Bezier<Scalar> {
    /// Change of basis from power to Bernstein form:
    /// `p[i] = sum C(i, j) / C(n, j) * c[j]`
    fn from(poly: Polynomial) -> Self {
        let coeffs = poly.coeffs();
        let n = coeffs.len().max(2) - 1;
        let mut points = Vec::with_capacity(n + 1);
        for i in 0..=n {
            let mut sum = 0.0;
            for (j, coeff) in coeffs.iter().enumerate().take(i + 1) {
                sum += binomial(i, j) / binomial(n, j) * coeff;
            }
            points.push(sum);
        }
        Self::new(points)
    }
}

// -----------------------------------------------------------------------------
// Point curves: geometry queries and quadratic fitting
// -----------------------------------------------------------------------------

/// Recursion ceiling used by `to_quads` is `point_count + QUAD_FIT_EXTRA_DEPTH`.
/// Tunable, bounds termination rather than deriving from an error bound.
const QUAD_FIT_EXTRA_DEPTH: usize = 4;

impl Bezier<Point> {
    /// Scalar component curves `(x(t), y(t))`
    pub fn components(&self) -> (Bezier<Scalar>, Bezier<Scalar>) {
        let xs = self.points.iter().map(|p| p.x()).collect();
        let ys = self.points.iter().map(|p| p.y()).collect();
        (Bezier::new(xs), Bezier::new(ys))
    }

    /// Convert to a path segment if the degree is at most three
    pub fn to_segment(&self) -> Option<Segment> {
        match self.points.as_slice() {
            [p0, p1] => Some(Line::new(*p0, *p1).into()),
            [p0, p1, p2] => Some(Quad::new(*p0, *p1, *p2).into()),
            [p0, p1, p2, p3] => Some(Cubic::new(*p0, *p1, *p2, *p3).into()),
            _ => None,
        }
    }

    /// Signed area between the curve and the lines connecting its ends to
    /// the origin, `0.5 * int(x * y' - y * x')` (Green's theorem).
    ///
    /// Segments with degree up to three use the expanded closed forms,
    /// higher degrees integrate the polynomial form exactly.
    pub fn area(&self) -> Scalar {
        if let Some(segment) = self.to_segment() {
            return segment.area();
        }
        let (x, y) = self.components();
        let x = x.polynomial();
        let y = y.polynomial();
        let integrand = x.clone() * y.derivative() - y * x.derivative();
        0.5 * integrand.integral().eval(1.0)
    }

    /// Bounding box of the curve.
    ///
    /// Sampled at the ends of the parameter range and at every stationary
    /// point of the component curves clamped to `0..=1`.
    pub fn bbox(&self, init: Option<BBox>) -> BBox {
        let (x, y) = self.components();
        let mut bbox = BBox::new(self.eval(0.0), self.eval(1.0)).union_opt(init);
        for t in x.stationary().into_iter().chain(y.stationary()) {
            bbox = bbox.extend(self.eval(t.clamp(0.0, 1.0)));
        }
        bbox
    }

    /// Parameters closest to the point, sorted by actual distance ascending
    pub fn closest(&self, point: Point) -> Vec<Scalar> {
        let (x, y) = self.components();
        let x = x.polynomial() - Polynomial::new(vec![point.x()]);
        let y = y.polynomial() - Polynomial::new(vec![point.y()]);
        let half_dist2_deriv = x.clone() * x.derivative() + y.clone() * y.derivative();
        let mut candidates: Vec<Scalar> = half_dist2_deriv
            .trimmed()
            .roots()
            .into_iter()
            .filter(|t| (0.0..=1.0).contains(t))
            .chain([0.0, 1.0])
            .collect();
        let dist = |t: Scalar| point.dist(self.eval(t));
        candidates.sort_by(|t0, t1| dist(*t0).partial_cmp(&dist(*t1)).expect("distance is NaN"));
        candidates.dedup_by(|t0, t1| (*t0 - *t1).abs() < EPSILON_SQRT);
        candidates
    }

    /// Interior parameters where the curvature changes sign, the roots of
    /// `cross(curve', curve'')`. Translation and rotation of the curve do
    /// not change the result.
    pub fn inflections(&self) -> Vec<Scalar> {
        let (x, y) = self.components();
        let x = x.polynomial();
        let y = y.polynomial();
        let cross = x.derivative() * y.derivative().derivative()
            - y.derivative() * x.derivative().derivative();
        let mut roots = cross.trimmed().roots();
        roots.retain(|t| *t > EPSILON_SQRT && *t < 1.0 - EPSILON_SQRT);
        roots.sort_by(|a, b| a.partial_cmp(b).expect("inflection is NaN"));
        roots.dedup_by(|t0, t1| (*t0 - *t1).abs() < EPSILON_SQRT);
        roots
    }

    /// Arc length of the curve.
    ///
    /// Subdivision bounded estimate: for every piece the length is between
    /// the chord and the control polygon, recursion stops once they agree
    /// within the tolerance and the piece contributes `(2 * chord + polygon) / 3`.
    pub fn arc_length(&self, tolerance: Scalar) -> Scalar {
        fn polygon_length(points: &[Point]) -> Scalar {
            points.windows(2).map(|p| p[0].dist(p[1])).sum()
        }
        fn rec(curve: &Bezier<Point>, tolerance: Scalar, depth: usize) -> Scalar {
            let chord = curve.start().dist(curve.end());
            let polygon = polygon_length(curve.points());
            if polygon - chord < tolerance || depth >= 16 {
                (2.0 * chord + polygon) / 3.0
            } else {
                let (left, right) = curve.split_at(0.5);
                rec(&left, tolerance / 2.0, depth + 1) + rec(&right, tolerance / 2.0, depth + 1)
            }
        }
        rec(self, tolerance.max(EPSILON), 0)
    }

    /// Reduce the curve to a sequence of quadratic segments.
    ///
    /// The curve is split at its inflection points first, then every piece
    /// is approximated by the quadratic through its endpoints and midpoint,
    /// recursively bisecting while the piece is too curved for a single
    /// quadratic (chord shorter than three sagittas). Recursion depth is
    /// bounded by `point_count + 4`.
    pub fn to_quads(&self) -> Vec<Quad> {
        let max_depth = self.points.len() + QUAD_FIT_EXTRA_DEPTH;
        let mut quads = Vec::new();
        for piece in self.split_many(self.inflections()) {
            quad_fit_rec(&piece, 0, max_depth, &mut quads);
        }
        quads
    }
}

fn quad_fit_rec(curve: &Bezier<Point>, depth: usize, max_depth: usize, out: &mut Vec<Quad>) {
    let start = curve.start();
    let end = curve.end();
    let mid = curve.eval(0.5);
    let chord = end - start;
    let sagitta = match chord.normalize() {
        Some(dir) => dir.cross(mid - start).abs(),
        None => (mid - start).length(),
    };
    if depth < max_depth && chord.length() < 3.0 * sagitta {
        let (left, right) = curve.split_at(0.5);
        quad_fit_rec(&left, depth + 1, max_depth, out);
        quad_fit_rec(&right, depth + 1, max_depth, out);
        return;
    }
    // quadratic through both endpoints and the midpoint:
    // q(0.5) = (start + 2 * control + end) / 4 = mid
    let control = 2.0 * mid - 0.5 * (start + end);
    out.push(Quad::new(start, control, end));
}

// -----------------------------------------------------------------------------
// Resultant based intersections
// -----------------------------------------------------------------------------

/// Candidate parameters on `curve` where it meets the infinite line.
///
/// The curve parametrization is substituted into the implicit line equation
/// `cross(direction, p - line_start) = 0`. `None` signals that every
/// coefficient vanished: the curve lies on the line (coincident), which this
/// representation cannot distinguish from "no expressible answer", so the
/// caller must special-case it.
pub fn curve_line_intersect(curve: impl Into<Segment>, line: Line) -> Option<Vec<Scalar>> {
    let dir = line.direction();
    let origin = line.start();
    let [d, c, b, a] = power_basis(curve.into());
    let implicit = |p: Point| dir.cross(p - origin);
    // cross is linear, so it maps the power coefficients directly; the
    // constant term alone carries the translation
    let poly = Polynomial::new(vec![
        implicit(d),
        dir.cross(c),
        dir.cross(b),
        dir.cross(a),
    ])
    .trimmed();
    if poly.is_zero() {
        return None;
    }
    let mut roots = poly.roots();
    roots.retain(|t| (-EPSILON_SQRT..=1.0 + EPSILON_SQRT).contains(t));
    Some(roots)
}

/// Candidate parameters on `curve` where it meets `other`.
///
/// `other` is implicitized through its Bezout resultant matrix (entries
/// `[p, q] = f_p * g_q - f_q * g_p` over the power coefficients of
/// `f = x(s) - X`, `g = y(s) - Y`), then `curve`'s parametrization is
/// substituted for `(X, Y)` and the determinant becomes a polynomial in the
/// parameter of `curve`. `None` signals a vanishing resultant: the curves
/// are coincident (or the construction cannot express the answer), the
/// caller must special-case this, typically with an upstream colinearity
/// check.
pub fn curve_intersect(curve: impl Into<Segment>, other: impl Into<Segment>) -> Option<Vec<Scalar>> {
    let curve = curve.into();
    let other = other.into();
    if let Segment::Line(line) = other {
        return curve_line_intersect(curve, line);
    }

    // parametric polynomials of the probing curve
    let [d0, c0, b0, a0] = power_basis(curve);
    let x = Polynomial::new(vec![d0.x(), c0.x(), b0.x(), a0.x()]).trimmed();
    let y = Polynomial::new(vec![d0.y(), c0.y(), b0.y(), a0.y()]).trimmed();

    // power coefficients of the implicitized curve
    let [d1, c1, b1, a1] = power_basis(other);
    let fs = [d1.x(), c1.x(), b1.x(), a1.x()];
    let gs = [d1.y(), c1.y(), b1.y(), a1.y()];

    // entry [p, q] = f_p * g_q - f_q * g_p, where f_0 and g_0 carry the
    // substituted parametrization
    let entry = |p: usize, q: usize| -> Polynomial {
        let f = |i: usize| -> Polynomial {
            if i == 0 {
                Polynomial::new(vec![fs[0]]) - x.clone()
            } else {
                Polynomial::new(vec![fs[i]])
            }
        };
        let g = |i: usize| -> Polynomial {
            if i == 0 {
                Polynomial::new(vec![gs[0]]) - y.clone()
            } else {
                Polynomial::new(vec![gs[i]])
            }
        };
        f(p) * g(q) - f(q) * g(p)
    };

    let resultant = match other {
        Segment::Quad(_) => {
            // | [1,0] [2,0] |
            // | [2,0] [2,1] |
            entry(1, 0) * entry(2, 1) - entry(2, 0) * entry(2, 0)
        }
        _ => {
            // | [1,0]        [2,0]        [3,0] |
            // | [2,0] [2,1]+[3,0]        [3,1] |
            // | [3,0]        [3,1]        [3,2] |
            let m00 = entry(1, 0);
            let m01 = entry(2, 0);
            let m02 = entry(3, 0);
            let m11 = entry(2, 1) + entry(3, 0);
            let m12 = entry(3, 1);
            let m22 = entry(3, 2);
            m00.clone() * (m11.clone() * m22.clone() - m12.clone() * m12.clone())
                - m01.clone() * (m01.clone() * m22 - m12.clone() * m02.clone())
                + m02.clone() * (m01 * m12 - m11 * m02)
        }
    };
    let resultant = resultant.trimmed();
    if resultant.is_zero() {
        return None;
    }
    let mut roots = resultant.roots();
    roots.retain(|t| (-EPSILON_SQRT..=1.0 + EPSILON_SQRT).contains(t));
    roots.sort_by(|a, b| a.partial_cmp(b).expect("intersection parameter is NaN"));
    roots.dedup_by(|t0, t1| (*t0 - *t1).abs() < EPSILON_SQRT);
    Some(roots)
}

impl From<Segment> for Bezier<Point> {
    fn from(segment: Segment) -> Self {
        match segment {
            Segment::Line(Line(ps)) => Self::new(ps.to_vec()),
            Segment::Quad(Quad(ps)) => Self::new(ps.to_vec()),
            Segment::Cubic(Cubic(ps)) => Self::new(ps.to_vec()),
        }
    }
}
