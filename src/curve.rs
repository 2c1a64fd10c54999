//! All the things you need to handle bezier curves

use crate::{
    cubic_solve, quadratic_solve, ArrayIter, BBox, EllipArc, Error, LineCap, LineJoin, Point,
    Polynomial, Scalar, Shape, StrokeStyle, Transform, EPSILON, EPSILON_SQRT, M3x3, M4x4, PI,
};
use std::{fmt, str::FromStr};

pub type CurveRoots = ArrayIter<[Option<Scalar>; 3]>;
pub type CurveExtremities = ArrayIter<[Option<Scalar>; 6]>;

/// Control point distance producing a circle quadrant from a cubic segment
/// `(4/3) * tan(pi/8)`
pub(crate) const BEZIER_CIRCLE_RATIO: Scalar = 0.5522847498307935;

/// Recursion bounds for offsetting. Tunable, they trade worst case geometric
/// fidelity for guaranteed termination.
const QUAD_OFFSET_DEPTH: usize = 4;
const CUBIC_OFFSET_DEPTH: usize = 8;

/// Set of operations common to all bezier curves.
pub trait Curve: Sized + Copy + Into<Segment> {
    /// Convert curve to an iterator over line segments with desired flatness
    fn flatten(&self, tr: Transform, flatness: Scalar) -> CurveFlattenIter {
        CurveFlattenIter::new(self.transform(tr), flatness)
    }

    /// Correspond to maximum deviation of the curve from the straight line
    /// `f = max |curve(t) - line(curve_start, curve_end)(t)|`. This function
    /// actually returns `16.0 * f^2` to avoid unneeded division and square root.
    fn flatness(&self) -> Scalar;

    /// Apply affine transformation to the curve
    fn transform(&self, tr: Transform) -> Self;

    /// Point at which curve starts
    fn start(&self) -> Point;

    /// Point at which curve ends
    fn end(&self) -> Point;

    /// Evaluate curve at parameter value `t` in (0.0..=1.0)
    ///
    /// The parameter is not clamped, values outside of the range extrapolate
    /// the curve.
    fn at(&self, t: Scalar) -> Point;

    /// Optimized version of `Curve::split_at(0.5)`
    fn split(&self) -> (Self, Self) {
        self.split_at(0.5)
    }

    /// Split the curve at parameter value `t`
    fn split_at(&self, t: Scalar) -> (Self, Self);

    /// Create subcurve specified starting at parameter value `a` and ending at value `b`
    fn cut(&self, a: Scalar, b: Scalar) -> Self;

    /// Extend provided `init` bounding box with the bounding box of the curve
    fn bbox(&self, init: Option<BBox>) -> BBox;

    /// Offset the curve by distance `dist`, result is inserted into `out` container
    fn offset(&self, dist: Scalar, out: &mut impl Extend<Segment>);

    /// Derivative with respect to t, `deriv(t) = [curve'(t)_x, curve'(t)_y]`
    fn deriv(&self) -> Segment;

    /// Identical curve but directed from end to start, instead of start to end.
    fn reverse(&self) -> Self;

    /// Find roots of the equation `curve(t)_y = 0`. Values of the parameter at which curve
    /// crosses y axis.
    fn roots(&self) -> CurveRoots;

    /// Find all extremities of the curve `curve'(t)_x = 0 || curve'(t)_y = 0`
    fn extremities(&self) -> CurveExtremities;

    /// Signed area of the region between the curve and the two lines
    /// connecting its ends to the origin, `0.5 * int(x * y' - y * x')` over
    /// the parameter range (Green's theorem). Summed over a closed contour
    /// this gives the contour area, positive for counter-clockwise winding.
    fn area(&self) -> Scalar;

    /// Arc length of the curve.
    ///
    /// Computed as the total length of the flattened curve, `tolerance`
    /// bounds the deviation of the line approximation.
    fn arc_length(&self, tolerance: Scalar) -> Scalar {
        self.flatten(Transform::identity(), tolerance)
            .map(|line| line.length())
            .sum()
    }

    /// Parameters of the curve closest to the point, sorted by actual
    /// distance ascending.
    ///
    /// Candidates are the interior roots of the derivative of the squared
    /// distance polynomial plus both ends of the parameter range.
    fn closest(&self, point: Point) -> Vec<Scalar> {
        let [d, c, b, a] = power_basis(*self);
        let x = Polynomial::new(vec![d.x() - point.x(), c.x(), b.x(), a.x()]).trimmed();
        let y = Polynomial::new(vec![d.y() - point.y(), c.y(), b.y(), a.y()]).trimmed();
        // 0.5 * dist^2' = (x - px) * x' + (y - py) * y'
        let half_dist2_deriv =
            x.clone() * x.derivative() + y.clone() * y.derivative();
        let mut candidates: Vec<Scalar> = half_dist2_deriv
            .roots()
            .into_iter()
            .filter(|t| (0.0..=1.0).contains(t))
            .chain([0.0, 1.0])
            .collect();
        let dist = |t: Scalar| {
            let p = self.at(t);
            point.dist(p)
        };
        candidates.sort_by(|t0, t1| {
            dist(*t0)
                .partial_cmp(&dist(*t1))
                .expect("distance is NaN")
        });
        candidates.dedup_by(|t0, t1| (*t0 - *t1).abs() < EPSILON_SQRT);
        candidates
    }
}

/// Power basis coefficients of the curve `curve(t) = a * t^3 + b * t^2 + c * t + d`,
/// unused higher coefficients are zero.
pub(crate) fn power_basis(curve: impl Into<Segment>) -> [Point; 4] {
    let zero = Point::new(0.0, 0.0);
    match curve.into() {
        Segment::Line(Line([p0, p1])) => [p0, p1 - p0, zero, zero],
        Segment::Quad(Quad([p0, p1, p2])) => {
            [p0, 2.0 * (p1 - p0), p0 - 2.0 * p1 + p2, zero]
        }
        Segment::Cubic(Cubic([p0, p1, p2, p3])) => [
            p0,
            3.0 * (p1 - p0),
            3.0 * p0 - 6.0 * p1 + 3.0 * p2,
            -1.0 * p0 + 3.0 * p1 - 3.0 * p2 + p3,
        ],
    }
}

pub struct CurveFlattenIter {
    flatness: Scalar,
    stack: Vec<Segment>,
}

impl CurveFlattenIter {
    pub fn new(segment: impl Into<Segment>, flatness: Scalar) -> Self {
        Self {
            flatness: 16.0 * flatness * flatness,
            stack: vec![segment.into()],
        }
    }
}

impl Iterator for CurveFlattenIter {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop() {
                None => {
                    return None;
                }
                Some(segment) => {
                    if segment.flatness() < self.flatness {
                        return Some(Line([segment.start(), segment.end()]));
                    }
                    let (s0, s1) = segment.split();
                    self.stack.push(s1);
                    self.stack.push(s0);
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Line
// -----------------------------------------------------------------------------

/// Line segment curve
#[derive(Clone, Copy, PartialEq)]
pub struct Line(pub [Point; 2]);

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Line([p0, p1]) = self;
        write!(f, "Line {:?} {:?}", p0, p1)
    }
}

impl Line {
    pub fn new(p0: impl Into<Point>, p1: impl Into<Point>) -> Self {
        Self([p0.into(), p1.into()])
    }

    /// Length of the line
    pub fn length(&self) -> Scalar {
        let Self([p0, p1]) = self;
        p0.dist(*p1)
    }

    /// Start and end points of the line
    pub fn points(&self) -> [Point; 2] {
        self.0
    }

    pub fn ends(&self) -> (Line, Line) {
        (*self, *self)
    }

    /// Find intersection of two lines
    ///
    /// Returns pair of `t` parameters for this line and the other line.
    /// Found by solving `self.at(t0) == other.at(t1)`. Actual intersection of
    /// line segments can be found by making sure that `0.0 <= t0 <= 1.0 && 0.0 <= t1 <= 1.0`
    pub fn intersect(&self, other: Line) -> Option<(Scalar, Scalar)> {
        let Line([Point([x1, y1]), Point([x2, y2])]) = *self;
        let Line([Point([x3, y3]), Point([x4, y4])]) = other;
        let det = (x4 - x3) * (y1 - y2) - (x1 - x2) * (y4 - y3);
        if det.abs() < EPSILON {
            return None;
        }
        let t0 = ((y3 - y4) * (x1 - x3) + (x4 - x3) * (y1 - y3)) / det;
        let t1 = ((y1 - y2) * (x1 - x3) + (x2 - x1) * (y1 - y3)) / det;
        Some((t0, t1))
    }

    /// Find intersection point between two line segments
    pub fn intersect_point(&self, other: Line) -> Option<Point> {
        let (t0, t1) = self.intersect(other)?;
        if (0.0..=1.0).contains(&t0) && (0.0..=1.0).contains(&t1) {
            Some(self.at(t0))
        } else {
            None
        }
    }

    /// Direction vector associated with the line segment
    pub fn direction(&self) -> Point {
        self.end() - self.start()
    }
}

impl Curve for Line {
    fn flatness(&self) -> Scalar {
        0.0
    }

    fn transform(&self, tr: Transform) -> Self {
        let Line([p0, p1]) = self;
        Self([tr.apply(*p0), tr.apply(*p1)])
    }

    fn start(&self) -> Point {
        self.0[0]
    }

    fn end(&self) -> Point {
        self.0[1]
    }

    fn at(&self, t: Scalar) -> Point {
        let Self([p0, p1]) = self;
        (1.0 - t) * p0 + t * p1
    }

    fn deriv(&self) -> Segment {
        let deriv = self.end() - self.start();
        Line::new(deriv, deriv).into()
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        let Self([p0, p1]) = self;
        let mid = self.at(t);
        (Self([*p0, mid]), Self([mid, *p1]))
    }

    fn cut(&self, a: Scalar, b: Scalar) -> Self {
        Self([self.at(a), self.at(b)])
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        let Self([p0, p1]) = *self;
        BBox::new(p0, p1).union_opt(init)
    }

    fn offset(&self, dist: Scalar, out: &mut impl Extend<Segment>) {
        out.extend(line_offset(*self, dist).map(Segment::from));
    }

    fn reverse(&self) -> Self {
        let Self([p0, p1]) = *self;
        Self([p1, p0])
    }

    fn roots(&self) -> CurveRoots {
        let mut result = CurveRoots::new();
        let Self([Point([_, y0]), Point([_, y1])]) = self;
        if (y0 - y1).abs() > EPSILON {
            let t = y0 / (y0 - y1);
            if (0.0..=1.0).contains(&t) {
                result.push(t);
            }
        }
        result
    }

    fn extremities(&self) -> CurveExtremities {
        CurveExtremities::new()
    }

    fn area(&self) -> Scalar {
        let Self([p0, p1]) = *self;
        0.5 * p0.cross(p1)
    }

    fn arc_length(&self, _tolerance: Scalar) -> Scalar {
        self.length()
    }
}

impl FromStr for Line {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let segment = Segment::from_str(text)?;
        segment.to_line().ok_or_else(|| Error::ConversionError {
            reason: "first element of the path is not a line".to_string(),
        })
    }
}

// -----------------------------------------------------------------------------
// Quadratic bezier curve
// -----------------------------------------------------------------------------

// Matrix form for quadratic bezier curve
#[rustfmt::skip]
const Q: M3x3 = M3x3([
    1.0,  0.0, 0.0,
   -2.0,  2.0, 0.0,
    1.0, -2.0, 1.0,
]);

// Inverted matrix form for quadratic bezier curve
#[rustfmt::skip]
const QI: M3x3 = M3x3([
    1.0, 0.0, 0.0,
    1.0, 0.5, 0.0,
    1.0, 1.0, 1.0,
]);

/// Quadratic bezier curve
///
/// Polynomial form:
/// `(1 - t) ^ 2 * p0 + 2 * (1 - t) * t * p1 + t ^ 2 * p2`
/// Matrix from:
///             ┌          ┐ ┌    ┐
/// ┌         ┐ │  1  0  0 │ │ p0 │
/// │ 1 t t^2 │ │ -2  2  0 │ │ p1 │
/// └         ┘ │  1 -2  1 │ │ p2 │
///             └          ┘ └    ┘
#[derive(Clone, Copy, PartialEq)]
pub struct Quad(pub [Point; 3]);

impl fmt::Debug for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Quad([p0, p1, p2]) = self;
        write!(f, "Quad {:?} {:?} {:?}", p0, p1, p2)
    }
}

impl Quad {
    pub fn new(p0: impl Into<Point>, p1: impl Into<Point>, p2: impl Into<Point>) -> Self {
        Self([p0.into(), p1.into(), p2.into()])
    }

    pub fn points(&self) -> [Point; 3] {
        self.0
    }

    pub fn ends(&self) -> (Line, Line) {
        let Self([p0, p1, p2]) = *self;
        let start = Line::new(p0, p1);
        let end = Line::new(p1, p2);
        if p0.is_close_to(p1) {
            (end, end)
        } else if p1.is_close_to(p2) {
            (start, start)
        } else {
            (start, end)
        }
    }

    /// Find smooth point used by SVG parser
    pub fn smooth(&self) -> Point {
        let Quad([_p0, p1, p2]) = self;
        2.0 * p2 - *p1
    }
}

impl Curve for Quad {
    /// Flatness criteria for the quadratic curve
    ///
    /// It is equal to `f = max d(t) where d(t) = |q(t) - l(t)|, l(t) = (1 - t) * p0 + t * p2`
    /// for q(t) bezier2 curve with p{0..2} control points, in other words maximum distance
    /// from parametric line to bezier2 curve for the same parameter t.
    ///
    /// Line can be represented as bezier2 curve, if `p1 = (p0 + p2) / 2.0`.
    /// Grouping polynomial coefficients:
    ///     q(t) = t^2 p2 + 2 (1 - t) t p1 + (1 - t)^2 p0
    ///     l(t) = t^2 p2 + (1 - t) t (p0 + p2) + (1 - t)^2 p0
    ///     d(t) = |q(t) - l(t)| = (1 - t) t |2 * p1 - p0 - p2|
    ///     f    = 1 / 4 * | 2 p1 - p0 - p2 |
    ///     f^2  = 1/16 |2 * p1 - p0 - p2|^2
    ///
    fn flatness(&self) -> Scalar {
        let Self([p0, p1, p2]) = *self;
        let Point([x, y]) = 2.0 * p1 - p0 - p2;
        x * x + y * y
    }

    fn transform(&self, tr: Transform) -> Self {
        let Quad([p0, p1, p2]) = self;
        Self([tr.apply(*p0), tr.apply(*p1), tr.apply(*p2)])
    }

    fn start(&self) -> Point {
        self.0[0]
    }

    fn end(&self) -> Point {
        self.0[2]
    }

    fn at(&self, t: Scalar) -> Point {
        // at(t) =
        //   (1 - t) ^ 2 * p0 +
        //   2 * (1 - t) * t * p1 +
        //   t ^ 2 * p2
        let Self([p0, p1, p2]) = self;
        let (t1, t_1) = (t, 1.0 - t);
        let (t2, t_2) = (t1 * t1, t_1 * t_1);
        t_2 * p0 + 2.0 * t1 * t_1 * p1 + t2 * p2
    }

    fn deriv(&self) -> Segment {
        let Self([p0, p1, p2]) = *self;
        Line::new(2.0 * (p1 - p0), 2.0 * (p2 - p1)).into()
    }

    /// Optimized version of `split_at(0.5)`
    fn split(&self) -> (Self, Self) {
        let Self([p0, p1, p2]) = *self;
        let mid = 0.25 * (p0 + 2.0 * p1 + p2);
        (
            Self([p0, 0.5 * (p0 + p1), mid]),
            Self([mid, 0.5 * (p1 + p2), p2]),
        )
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        // https://pomax.github.io/bezierinfo/#matrixsplit
        let Self([p0, p1, p2]) = *self;
        let (t1, t_1) = (t, 1.0 - t);
        let (t2, t_2) = (t1 * t1, t_1 * t_1);
        let mid = t_2 * p0 + 2.0 * t1 * t_1 * p1 + t2 * p2;
        (
            Self([p0, t_1 * p0 + t * p1, mid]),
            Self([mid, t_1 * p1 + t * p2, p2]),
        )
    }

    fn cut(&self, a: Scalar, b: Scalar) -> Self {
        // Given curve as Q(t) = [1 t t^2] M Q
        // we can change parameter t -> a + (b - a) * t which will produced desired curve
        // it is possible to decompose it as
        //             ┌                         ┐
        // ┌         ┐ │  1  a       a^2         │
        // │ 1 t t^2 │ │  0  (b - a) 2*a*(b - a) │ = [1 t t^2] T
        // └         ┘ │  0  0       (b - a)^2   │
        //             └                         ┘
        // we can convert it back to desired curve by Q[a, b](t) = [1 t t^2] Q (QI T Q) P
        let Self([p0, p1, p2]) = self;
        let ba = b - a;
        #[rustfmt::skip]
        let t = M3x3([
            1.0, a  , a * a       ,
            0.0, ba , 2.0 * a * ba,
            0.0, 0.0, ba * ba     ,
        ]);
        #[rustfmt::skip]
        let M3x3([
            m00, m01, m02,
            m10, m11, m12,
            m20, m21, m22,
        ]) = QI * t * Q;
        let q0 = m00 * p0 + m01 * p1 + m02 * p2;
        let q1 = m10 * p0 + m11 * p1 + m12 * p2;
        let q2 = m20 * p0 + m21 * p1 + m22 * p2;
        Self([q0, q1, q2])
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        let Self([p0, p1, p2]) = self;
        let bbox = BBox::new(*p0, *p2).union_opt(init);
        if bbox.contains(*p1) {
            return bbox;
        }
        self.extremities()
            .fold(bbox, |bbox, t| bbox.extend(self.at(t)))
    }

    fn offset(&self, dist: Scalar, out: &mut impl Extend<Segment>) {
        segment_offset((*self).into(), dist, QUAD_OFFSET_DEPTH, out)
    }

    fn reverse(&self) -> Self {
        let Self([p0, p1, p2]) = *self;
        Self([p2, p1, p0])
    }

    fn roots(&self) -> CurveRoots {
        let mut result = CurveRoots::new();
        // curve(t)_y = 0
        let Self([Point([_, y0]), Point([_, y1]), Point([_, y2])]) = *self;
        let a = y0 - 2.0 * y1 + y2;
        let b = -2.0 * y0 + 2.0 * y1;
        let c = y0;
        result.extend(quadratic_solve(a, b, c).filter(|t| (0.0..=1.0).contains(t)));
        result
    }

    fn extremities(&self) -> CurveExtremities {
        let mut result = CurveExtremities::new();
        let Self([p0, p1, p2]) = self;
        let Point([a0, a1]) = *p2 - 2.0 * p1 + *p0;
        let Point([b0, b1]) = *p1 - *p0;
        // curve'(t)_x = 0
        if a0.abs() > EPSILON {
            let t0 = -b0 / a0;
            if (0.0..=1.0).contains(&t0) {
                result.push(t0)
            }
        }
        // curve'(t)_y = 0
        if a1.abs() > EPSILON {
            let t1 = -b1 / a1;
            if (0.0..=1.0).contains(&t1) {
                result.push(t1)
            }
        }
        result
    }

    fn area(&self) -> Scalar {
        // 0.5 * int(x * y' - y * x') with the curve in the power basis
        // `q(t) = b * t^2 + c * t + d`
        let [d, c, b, _] = power_basis(*self);
        0.5 * (d.cross(c) + d.cross(b) - b.cross(c) / 3.0)
    }
}

impl FromStr for Quad {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let segment = Segment::from_str(text)?;
        segment.to_quad().ok_or_else(|| Error::ConversionError {
            reason: "first element of the path is not a quad".to_string(),
        })
    }
}

// -----------------------------------------------------------------------------
// Cubic bezier curve
// -----------------------------------------------------------------------------

/// Matrix form for cubic bezier curve
#[rustfmt::skip]
const C: M4x4 = M4x4([
    1.0,  0.0,  0.0, 0.0,
   -3.0,  3.0,  0.0, 0.0,
    3.0, -6.0,  3.0, 0.0,
   -1.0,  3.0, -3.0, 1.0,
]);

/// Inverted matrix form for cubic bezier curve
#[rustfmt::skip]
const CI: M4x4 = M4x4([
    1.0, 0.0      , 0.0      , 0.0,
    1.0, 1.0 / 3.0, 0.0      , 0.0,
    1.0, 2.0 / 3.0, 1.0 / 3.0, 0.0,
    1.0, 1.0      , 1.0      , 1.0,
]);

/// Cubic bezier curve
///
/// Polynomial form:
/// `(1 - t) ^ 3 * p0 + 3 * (1 - t) ^ 2 * t * p1 + 3 * (1 - t) * t ^ 2 * p2 + t ^ 3 * p3`
/// Matrix from:
///                 ┌             ┐ ┌    ┐
/// ┌             ┐ │  1  0  0  0 │ │ p0 │
/// │ 1 t t^2 t^3 │ │ -3  3  0  0 │ │ p1 │
/// └             ┘ │  3 -6  3  0 │ │ p2 │
///                 │ -1  3 -3  1 │ │ p3 │
///                 └             ┘ └    ┘
#[derive(Clone, Copy, PartialEq)]
pub struct Cubic(pub [Point; 4]);

impl fmt::Debug for Cubic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Cubic([p0, p1, p2, p3]) = self;
        write!(f, "Cubic {:?} {:?} {:?} {:?}", p0, p1, p2, p3)
    }
}

impl Cubic {
    pub fn new(
        p0: impl Into<Point>,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        p3: impl Into<Point>,
    ) -> Self {
        Self([p0.into(), p1.into(), p2.into(), p3.into()])
    }

    pub fn points(&self) -> [Point; 4] {
        self.0
    }

    pub fn ends(&self) -> (Line, Line) {
        let ps = self.points();
        let mut start = 0;
        for i in 0..3 {
            if !ps[i].is_close_to(ps[i + 1]) {
                start = i;
                break;
            }
        }
        let mut end = 0;
        for i in (1..4).rev() {
            if !ps[i].is_close_to(ps[i - 1]) {
                end = i;
                break;
            }
        }
        (
            Line::new(ps[start], ps[start + 1]),
            Line::new(ps[end - 1], ps[end]),
        )
    }

    /// Find smooth point used by SVG parser
    pub fn smooth(&self) -> Point {
        let Cubic([_p0, _p1, p2, p3]) = self;
        2.0 * p3 - *p2
    }

    /// Inflection points of the curve.
    ///
    /// Inflections are the interior parameters where the cross product of the
    /// first and the second derivative vanishes. Translation and rotation
    /// drop out of the cross product, so the formula is evaluated on the
    /// power basis coefficients directly.
    pub fn inflections(&self) -> impl Iterator<Item = Scalar> {
        let [_, c, b, a] = power_basis(*self);
        // cross(curve', curve'') = -6 * cross(a, b) * t^2 + 6 * cross(c, a) * t + 2 * cross(c, b)
        quadratic_solve(
            -6.0 * a.cross(b),
            6.0 * c.cross(a),
            2.0 * c.cross(b),
        )
        .filter(|t| *t > EPSILON_SQRT && *t < 1.0 - EPSILON_SQRT)
    }

    /// Parameter pair at which the curve crosses itself, if it does.
    ///
    /// Solving `curve(t0) == curve(t1)` for `t0 != t1` reduces, after
    /// dividing out `t0 - t1`, to a symmetric system in `s = t0 + t1` and
    /// `p = t0 * t1`.
    pub fn self_intersect(&self) -> Option<(Scalar, Scalar)> {
        let [_, c, b, a] = power_basis(*self);
        let ab = a.cross(b);
        if ab.abs() < EPSILON {
            return None;
        }
        let s = -a.cross(c) / ab;
        let (num, den) = if a.x().abs() > a.y().abs() {
            (b.x() * s + c.x(), a.x())
        } else {
            (b.y() * s + c.y(), a.y())
        };
        if den.abs() < EPSILON {
            return None;
        }
        let p = s * s + num / den;
        // t0, t1 are the roots of z^2 - s * z + p
        let mut roots = quadratic_solve(1.0, -s, p);
        let t0 = roots.next()?;
        let t1 = roots.next()?;
        let (t0, t1) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        if t0 < 0.0 || t1 > 1.0 || (t1 - t0).abs() < EPSILON_SQRT {
            return None;
        }
        Some((t0, t1))
    }
}

impl Curve for Cubic {
    /// Flatness criteria for the cubic curve
    /// This function actually returns `16 * flatness^2`
    ///
    /// It is equal to `f = max d(t) where d(t) = |c(t) - l(t)|, l(t) = (1 - t) * c0 + t * c3`
    /// for c(t) bezier3 curve with c{0..3} control points, in other words maximum distance
    /// from parametric line to bezier3 curve for the same parameter t. It is shown in the article
    /// that:
    ///     f^2 <= 1/16 (max{u_x^2, v_x^2} + max{u_y^2, v_y^2})
    /// where:
    ///     u = 3 * b1 - 2 * b0 - b3
    ///     v = 3 * b2 - b0 - 2 * b3
    /// `f == 0` means completely flat so estimating upper bound is sufficient as splitting more
    /// than needed is not a problem for rendering.
    ///
    /// [Linear Approximation of Bezier Curve](https://hcklbrrfnn.files.wordpress.com/2012/08/bez.pdf)
    fn flatness(&self) -> Scalar {
        let Self([p0, p1, p2, p3]) = *self;
        let u = 3.0 * p1 - 2.0 * p0 - p3;
        let v = 3.0 * p2 - p0 - 2.0 * p3;
        (u.x() * u.x()).max(v.x() * v.x()) + (u.y() * u.y()).max(v.y() * v.y())
    }

    fn transform(&self, tr: Transform) -> Self {
        let Cubic([p0, p1, p2, p3]) = self;
        Self([tr.apply(*p0), tr.apply(*p1), tr.apply(*p2), tr.apply(*p3)])
    }

    fn start(&self) -> Point {
        self.0[0]
    }

    fn end(&self) -> Point {
        self.0[3]
    }

    fn at(&self, t: Scalar) -> Point {
        // at(t) =
        //   (1 - t) ^ 3 * p0 +
        //   3 * (1 - t) ^ 2 * t * p1 +
        //   3 * (1 - t) * t ^ 2 * p2 +
        //   t ^ 3 * p3
        let Self([p0, p1, p2, p3]) = self;
        let (t1, t_1) = (t, 1.0 - t);
        let (t2, t_2) = (t1 * t1, t_1 * t_1);
        let (t3, t_3) = (t2 * t1, t_2 * t_1);
        t_3 * p0 + 3.0 * t1 * t_2 * p1 + 3.0 * t2 * t_1 * p2 + t3 * p3
    }

    fn deriv(&self) -> Segment {
        let Self([p0, p1, p2, p3]) = *self;
        Quad::new(3.0 * (p1 - p0), 3.0 * (p2 - p1), 3.0 * (p3 - p2)).into()
    }

    /// Optimized version of `split_at(0.5)`
    fn split(&self) -> (Self, Self) {
        let Self([p0, p1, p2, p3]) = *self;
        let mid = 0.125 * p0 + 0.375 * p1 + 0.375 * p2 + 0.125 * p3;
        let c0 = Self([
            p0,
            0.5 * p0 + 0.5 * p1,
            0.25 * p0 + 0.5 * p1 + 0.25 * p2,
            mid,
        ]);
        let c1 = Self([
            mid,
            0.25 * p1 + 0.5 * p2 + 0.25 * p3,
            0.5 * p2 + 0.5 * p3,
            p3,
        ]);
        (c0, c1)
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        // https://pomax.github.io/bezierinfo/#matrixsplit
        let Self([p0, p1, p2, p3]) = self;
        let (t1, t_1) = (t, 1.0 - t);
        let (t2, t_2) = (t1 * t1, t_1 * t_1);
        let (t3, t_3) = (t2 * t1, t_2 * t_1);
        let mid = t_3 * p0 + 3.0 * t1 * t_2 * p1 + 3.0 * t2 * t_1 * p2 + t3 * p3;
        let c0 = Self([
            *p0,
            t_1 * p0 + t * p1,
            t_2 * p0 + 2.0 * t * t_1 * p1 + t2 * p2,
            mid,
        ]);
        let c1 = Self([
            mid,
            t_2 * p1 + 2.0 * t * t_1 * p2 + t2 * p3,
            t_1 * p2 + t * p3,
            *p3,
        ]);
        (c0, c1)
    }

    fn cut(&self, a: Scalar, b: Scalar) -> Self {
        // Given curve as C(t) = [1 t t^2 t^3] M C
        // we can change parameter t -> a + (b - a) * t which will produced desired curve
        // it is possible to decompose it as
        //                 ┌                                       ┐
        // ┌             ┐ │  1  a       a^2         a^3           │
        // │ 1 t t^2 t^3 │ │  0  (b - a) 2*a*(b - a) 3*a^2*(b - a) │ = [1 t t^2 t^3] T
        // └             ┘ │  0  0       (b - a)^2   3*a*(b - a)^2 │
        //                 │  0  0       0           (b - a)^3     │
        //                 └                                       ┘
        // we can convert it back to desired curve by C[a, b](t) = [1 t t^2 t^3] C (CI T C) P
        let Self([p0, p1, p2, p3]) = self;
        let ba = b - a;
        #[rustfmt::skip]
        let t = M4x4([
            1.0, a  , a * a       , a * a * a        ,
            0.0, ba , 2.0 * a * ba, 3.0 * a * a * ba ,
            0.0, 0.0, ba * ba     , 3.0 * a * ba * ba,
            0.0, 0.0, 0.0         , ba * ba * ba     ,
        ]);
        #[rustfmt::skip]
        let M4x4([
            m00, m01, m02, m03,
            m10, m11, m12, m13,
            m20, m21, m22, m23,
            m30, m31, m32, m33,
        ]) = CI * t * C;
        let c0 = m00 * p0 + m01 * p1 + m02 * p2 + m03 * p3;
        let c1 = m10 * p0 + m11 * p1 + m12 * p2 + m13 * p3;
        let c2 = m20 * p0 + m21 * p1 + m22 * p2 + m23 * p3;
        let c3 = m30 * p0 + m31 * p1 + m32 * p2 + m33 * p3;
        Self([c0, c1, c2, c3])
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        let Self([p0, p1, p2, p3]) = self;
        let bbox = BBox::new(*p0, *p3).union_opt(init);
        if bbox.contains(*p1) && bbox.contains(*p2) {
            return bbox;
        }
        self.extremities()
            .fold(bbox, |bbox, t| bbox.extend(self.at(t)))
    }

    fn offset(&self, dist: Scalar, out: &mut impl Extend<Segment>) {
        segment_offset((*self).into(), dist, CUBIC_OFFSET_DEPTH, out)
    }

    fn reverse(&self) -> Self {
        let Self([p0, p1, p2, p3]) = *self;
        Self([p3, p2, p1, p0])
    }

    fn roots(&self) -> CurveRoots {
        let mut result = CurveRoots::new();
        // curve(t)_y = 0
        let Self([Point([_, y0]), Point([_, y1]), Point([_, y2]), Point([_, y3])]) = *self;
        let a = -y0 + 3.0 * y1 - 3.0 * y2 + y3;
        let b = 3.0 * y0 - 6.0 * y1 + 3.0 * y2;
        let c = -3.0 * y0 + 3.0 * y1;
        let d = y0;
        result.extend(cubic_solve(a, b, c, d).filter(|t| (0.0..=1.0).contains(t)));
        result
    }

    fn extremities(&self) -> CurveExtremities {
        let Self([p0, p1, p2, p3]) = *self;
        let Point([a0, a1]) = -1.0 * p0 + 3.0 * p1 - 3.0 * p2 + 1.0 * p3;
        let Point([b0, b1]) = 2.0 * p0 - 4.0 * p1 + 2.0 * p2;
        let Point([c0, c1]) = -1.0 * p0 + p1;

        // Solve for `curve'(t)_x = 0 || curve'(t)_y = 0`
        quadratic_solve(a0, b0, c0)
            .chain(quadratic_solve(a1, b1, c1))
            .filter(|t| *t >= 0.0 && *t <= 1.0)
            .collect::<CurveExtremities>()
    }

    fn area(&self) -> Scalar {
        // 0.5 * int(x * y' - y * x') with the curve in the power basis
        // `c(t) = a * t^3 + b * t^2 + c * t + d`
        let [d, c, b, a] = power_basis(*self);
        0.5 * (-a.cross(b) / 5.0 - a.cross(c) / 2.0 - b.cross(c) / 3.0
            - a.cross(d)
            - b.cross(d)
            - c.cross(d))
    }
}

impl From<Quad> for Cubic {
    fn from(quad: Quad) -> Self {
        let Quad([p0, p1, p2]) = quad;
        Self([
            p0,
            (1.0 / 3.0) * p0 + (2.0 / 3.0) * p1,
            (2.0 / 3.0) * p1 + (1.0 / 3.0) * p2,
            p2,
        ])
    }
}

impl FromStr for Cubic {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let segment = Segment::from_str(text)?;
        segment.to_cubic().ok_or_else(|| Error::ConversionError {
            reason: "first element of the path is not a cubic".to_string(),
        })
    }
}

// -----------------------------------------------------------------------------
// Segment
// -----------------------------------------------------------------------------

/// `Segment` is an enum of either `Line`, `Quad` or `Cubic`
#[derive(Clone, Copy, PartialEq)]
pub enum Segment {
    Line(Line),
    Quad(Quad),
    Cubic(Cubic),
}

impl Segment {
    pub fn ends(&self) -> (Line, Line) {
        match self {
            Segment::Line(line) => line.ends(),
            Segment::Quad(quad) => quad.ends(),
            Segment::Cubic(cubic) => cubic.ends(),
        }
    }

    /// Find intersection between two segments
    ///
    /// This might not be the fastest method possible but works for any two curves.
    /// Divide curves as long as there is intersection between bounding boxes, if
    /// the intersection is smaller then tolerance we can treat it as an intersection point.
    pub fn intersect(self, other: impl Into<Segment>, tolerance: Scalar) -> Vec<Point> {
        let mut queue = vec![(self, other.into())];
        let mut result = Vec::new();
        while let Some((s0, s1)) = queue.pop() {
            let b0 = s0.bbox(None);
            let b1 = s1.bbox(None);
            match b0.intersect(b1) {
                None => continue,
                Some(b) => {
                    let b0_is_small = b0.width() < tolerance && b0.height() < tolerance;
                    let b1_is_small = b1.width() < tolerance && b1.height() < tolerance;
                    if b0_is_small && b1_is_small {
                        result.push(b.diag().at(0.5));
                    } else {
                        let (s00, s01) = s0.split_at(0.5);
                        let (s10, s11) = s1.split_at(0.5);
                        queue.push((s00, s10));
                        queue.push((s00, s11));
                        queue.push((s01, s10));
                        queue.push((s01, s11));
                    }
                }
            }
        }
        result
    }

    /// Convert to line if it is a line variant of the segment
    pub fn to_line(&self) -> Option<Line> {
        match self {
            Segment::Line(line) => Some(*line),
            _ => None,
        }
    }

    /// Convert to quad if it is a quad variant of the segment
    pub fn to_quad(&self) -> Option<Quad> {
        match self {
            Segment::Quad(quad) => Some(*quad),
            _ => None,
        }
    }

    /// Convert to cubic if it is a cubic variant of the segment
    pub fn to_cubic(&self) -> Option<Cubic> {
        match self {
            Segment::Cubic(cubic) => Some(*cubic),
            _ => None,
        }
    }

    /// Produce iterator over segments that join two segments with the specified method.
    pub fn line_join(
        self,
        other: Segment,
        stroke_style: StrokeStyle,
    ) -> impl Iterator<Item = Self> {
        let mut result = ArrayIter::<[Option<Segment>; 4]>::new();
        if self.end().is_close_to(other.start()) {
            return result;
        }
        let bevel = Line::new(self.end(), other.start());
        // https://www.w3.org/TR/SVG2/painting.html#LineJoin
        match stroke_style.line_join {
            LineJoin::Bevel => {
                result.push(bevel.into());
            }
            LineJoin::Miter(miter_limit) => {
                let (_, start) = self.ends();
                let (end, _) = other.ends();
                match start.intersect(end) {
                    Some((t0, t1)) if (0.0..=1.0).contains(&t0) && (0.0..=1.0).contains(&t1) => {
                        // ends intersect
                        result.push(bevel.into());
                    }
                    None => result.push(bevel.into()),
                    Some((t, _)) => {
                        let p0 = start.end() - start.start();
                        let p1 = end.start() - end.end();
                        // miter_length = stroke_width / sin(a / 2)
                        // sin(a / 2) = +/- ((1 - cos(a)) / 2).sqrt()
                        let miter_length = p0
                            .cos_between(p1)
                            .map(|c| stroke_style.width / ((1.0 - c) / 2.0).sqrt());
                        match miter_length {
                            Some(miter_length) if miter_length < miter_limit => {
                                let p = start.at(t);
                                result.push(Line::new(start.end(), p).into());
                                result.push(Line::new(p, end.start()).into());
                            }
                            _ => result.push(bevel.into()),
                        }
                    }
                }
            }
            LineJoin::Round => {
                let (_, start) = self.ends();
                let (end, _) = other.ends();
                match start.intersect_point(end) {
                    Some(_) => result.push(bevel.into()),
                    None => {
                        let sweep_flag = start.direction().cross(bevel.direction()) >= 0.0;
                        let radius = stroke_style.width / 2.0;
                        let arc = EllipArc::new_param(
                            start.end(),
                            end.start(),
                            radius,
                            radius,
                            0.0,
                            false,
                            sweep_flag,
                        );
                        match arc {
                            Some(arc) => result.extend(arc.to_cubics().map(Segment::from)),
                            None => result.push(bevel.into()),
                        }
                    }
                }
            }
        }
        result
    }

    /// Produce an iterator over segments that adds caps between two segments
    pub fn line_cap(self, other: Segment, stroke_style: StrokeStyle) -> impl Iterator<Item = Self> {
        let mut result = ArrayIter::<[Option<Segment>; 4]>::new();
        if self.end().is_close_to(other.start()) {
            return result;
        }
        let butt = Line::new(self.end(), other.start());
        match stroke_style.line_cap {
            LineCap::Butt => result.push(butt.into()),
            LineCap::Square => {
                let (_, from) = self.ends();
                if let Some(tang) = from.direction().normalize() {
                    let l0 = Line::new(self.end(), self.end() + stroke_style.width / 2.0 * tang);
                    result.push(l0.into());
                    let l1 = Line::new(l0.end(), l0.end() + butt.direction());
                    result.push(l1.into());
                    let l2 = Line::new(l1.end(), other.start());
                    result.push(l2.into());
                }
            }
            LineCap::Round => {
                let stroke_style = StrokeStyle {
                    line_join: LineJoin::Round,
                    ..stroke_style
                };
                result.extend(self.line_join(other, stroke_style));
            }
        }
        result
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Line(line) => line.fmt(f),
            Segment::Quad(quad) => quad.fmt(f),
            Segment::Cubic(cubic) => cubic.fmt(f),
        }
    }
}

impl FromStr for Segment {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let shape = Shape::from_str(text)?;
        shape
            .components()
            .first()
            .and_then(|component| component.segments().next())
            .ok_or_else(|| Error::ConversionError {
                reason: "Empty path can not be converted to a segment".to_string(),
            })
    }
}

impl Curve for Segment {
    fn flatness(&self) -> Scalar {
        match self {
            Segment::Line(line) => line.flatness(),
            Segment::Quad(quad) => quad.flatness(),
            Segment::Cubic(cubic) => cubic.flatness(),
        }
    }

    fn transform(&self, tr: Transform) -> Self {
        match self {
            Segment::Line(line) => line.transform(tr).into(),
            Segment::Quad(quad) => quad.transform(tr).into(),
            Segment::Cubic(cubic) => cubic.transform(tr).into(),
        }
    }

    fn start(&self) -> Point {
        match self {
            Segment::Line(line) => line.start(),
            Segment::Quad(quad) => quad.start(),
            Segment::Cubic(cubic) => cubic.start(),
        }
    }

    fn end(&self) -> Point {
        match self {
            Segment::Line(line) => line.end(),
            Segment::Quad(quad) => quad.end(),
            Segment::Cubic(cubic) => cubic.end(),
        }
    }

    fn at(&self, t: Scalar) -> Point {
        match self {
            Segment::Line(line) => line.at(t),
            Segment::Quad(quad) => quad.at(t),
            Segment::Cubic(cubic) => cubic.at(t),
        }
    }

    fn deriv(&self) -> Segment {
        match self {
            Segment::Line(line) => line.deriv(),
            Segment::Quad(quad) => quad.deriv(),
            Segment::Cubic(cubic) => cubic.deriv(),
        }
    }

    fn split_at(&self, t: Scalar) -> (Self, Self) {
        match self {
            Segment::Line(line) => {
                let (l0, l1) = line.split_at(t);
                (l0.into(), l1.into())
            }
            Segment::Quad(quad) => {
                let (q0, q1) = quad.split_at(t);
                (q0.into(), q1.into())
            }
            Segment::Cubic(cubic) => {
                let (c0, c1) = cubic.split_at(t);
                (c0.into(), c1.into())
            }
        }
    }

    fn cut(&self, a: Scalar, b: Scalar) -> Self {
        match self {
            Segment::Line(line) => line.cut(a, b).into(),
            Segment::Quad(quad) => quad.cut(a, b).into(),
            Segment::Cubic(cubic) => cubic.cut(a, b).into(),
        }
    }

    fn bbox(&self, init: Option<BBox>) -> BBox {
        match self {
            Segment::Line(line) => line.bbox(init),
            Segment::Quad(quad) => quad.bbox(init),
            Segment::Cubic(cubic) => cubic.bbox(init),
        }
    }

    fn offset(&self, dist: Scalar, out: &mut impl Extend<Segment>) {
        match self {
            Segment::Line(line) => line.offset(dist, out),
            Segment::Quad(quad) => quad.offset(dist, out),
            Segment::Cubic(cubic) => cubic.offset(dist, out),
        }
    }

    fn reverse(&self) -> Self {
        match self {
            Segment::Line(line) => line.reverse().into(),
            Segment::Quad(quad) => quad.reverse().into(),
            Segment::Cubic(cubic) => cubic.reverse().into(),
        }
    }

    fn roots(&self) -> CurveRoots {
        match self {
            Segment::Line(line) => line.roots(),
            Segment::Quad(quad) => quad.roots(),
            Segment::Cubic(cubic) => cubic.roots(),
        }
    }

    fn extremities(&self) -> CurveExtremities {
        match self {
            Segment::Line(line) => line.extremities(),
            Segment::Quad(quad) => quad.extremities(),
            Segment::Cubic(cubic) => cubic.extremities(),
        }
    }

    fn area(&self) -> Scalar {
        match self {
            Segment::Line(line) => line.area(),
            Segment::Quad(quad) => quad.area(),
            Segment::Cubic(cubic) => cubic.area(),
        }
    }
}

impl From<Line> for Segment {
    fn from(line: Line) -> Self {
        Self::Line(line)
    }
}

impl From<Quad> for Segment {
    fn from(quad: Quad) -> Self {
        Self::Quad(quad)
    }
}

impl From<Cubic> for Segment {
    fn from(cubic: Cubic) -> Self {
        Self::Cubic(cubic)
    }
}

// -----------------------------------------------------------------------------
// Bezier curve offsetting
// -----------------------------------------------------------------------------

/// Offset line to the distance.
pub(crate) fn line_offset(line: Line, dist: Scalar) -> Option<Line> {
    let Line([p0, p1]) = line;
    let offset = dist * (p1 - p0).normal().normalize()?;
    Some(Line::new(p0 + offset, p1 + offset))
}

/// Offset a curve to the distance.
///
/// The curve is first split at its extremities and inflections which bounds
/// tangent rotation of every piece. Each piece is then approximated with a
/// single quadratic through the offset endpoints and offset end tangents,
/// recursively bisecting while the fit is too curved (chord shorter than
/// three sagittas) and the depth bound permits. Where the offset is
/// discontinuous (cusp, tangent direction reversal) the gap is bridged with
/// a circular arc around the junction point.
fn segment_offset(
    segment: Segment,
    dist: Scalar,
    max_depth: usize,
    out: &mut impl Extend<Segment>,
) {
    let mut params: Vec<Scalar> = segment.extremities().collect();
    if let Segment::Cubic(cubic) = segment {
        params.extend(cubic.inflections());
    }
    params.retain(|t| *t > EPSILON_SQRT && *t < 1.0 - EPSILON_SQRT);
    params.sort_by(|a, b| a.partial_cmp(b).expect("offset split parameter is NaN"));
    params.dedup_by(|t0, t1| (*t0 - *t1).abs() < EPSILON_SQRT);
    params.push(1.0);

    let mut last_end: Option<Point> = None;
    let mut start = 0.0;
    for end in params {
        let piece = segment.cut(start, end);
        let junction = segment.at(start);
        start = end;
        let mut pieces = Vec::new();
        piece_offset(piece, dist, 0, max_depth, &mut pieces);
        let first_start = match pieces.first() {
            Some(first) => first.start(),
            None => continue,
        };
        // bridge offset discontinuity left by a cusp
        if let Some(last_end) = last_end {
            if !last_end.is_close_to(first_start) {
                arc_sweep(junction, last_end, first_start, out);
            }
        }
        last_end = pieces.last().map(|segment| segment.end());
        out.extend(pieces);
    }
}

fn piece_offset(
    piece: Segment,
    dist: Scalar,
    depth: usize,
    max_depth: usize,
    out: &mut Vec<Segment>,
) {
    if let Segment::Line(line) = piece {
        out.extend(line_offset(line, dist).map(Segment::from));
        return;
    }
    let (start_line, end_line) = piece.ends();
    let (tang_start, tang_end) = match (
        start_line.direction().normalize(),
        end_line.direction().normalize(),
    ) {
        (Some(ts), Some(te)) => (ts, te),
        // all control points coincide, there is nothing to offset
        _ => return,
    };
    let start_off = piece.start() + dist * tang_start.normal();
    let end_off = piece.end() + dist * tang_end.normal();

    let should_split = depth < max_depth && {
        if tang_start.dot(tang_end) < 0.0 {
            // tangents turn by more than 90 degrees
            true
        } else {
            // 3:1 chord to sagitta ratio, the single quadratic fit is only
            // adequate while the piece stays shallow
            let chord = Line::new(piece.start(), piece.end());
            let sagitta = match chord.direction().normalize() {
                Some(dir) => dir.cross(piece.at(0.5) - piece.start()).abs(),
                None => (piece.at(0.5) - piece.start()).length(),
            };
            chord.length() < 3.0 * sagitta
        }
    };
    if should_split {
        let (p0, p1) = piece.split_at(0.5);
        piece_offset(p0, dist, depth + 1, max_depth, out);
        piece_offset(p1, dist, depth + 1, max_depth, out);
        return;
    }

    // fit a quadratic through the offset endpoints and the offset tangents
    let start_ray = Line::new(start_off, start_off + tang_start);
    let end_ray = Line::new(end_off, end_off + tang_end);
    match start_ray.intersect(end_ray) {
        Some((t, _)) if t.is_finite() => {
            let control = start_ray.at(t);
            out.push(Quad::new(start_off, control, end_off).into());
        }
        _ => {
            // tangents are parallel, the offset degenerates to a line
            out.push(Line::new(start_off, end_off).into());
        }
    }
}

/// Emit a circular arc around `center` from point `from` to point `to`.
///
/// The arc is built from cubic segments of at most a quarter turn each using
/// the bezier circle control distance `(4/3) * tan(angle/4)`, which makes a
/// full circle out of four segments with a known error bound.
pub(crate) fn arc_sweep(center: Point, from: Point, to: Point, out: &mut impl Extend<Segment>) {
    let v_from = from - center;
    let v_to = to - center;
    let radius = v_from.length();
    if radius < EPSILON_SQRT {
        return;
    }
    let total = match v_from.angle_between(v_to) {
        Some(total) if total.abs() > EPSILON_SQRT => total,
        _ => {
            out.extend(Some(Line::new(from, to).into()));
            return;
        }
    };
    let count = (total.abs() / (PI / 2.0)).ceil().max(1.0);
    let delta = total / count;
    let ratio = (4.0 / 3.0) * (delta / 4.0).tan();
    let mut angle = v_from.y().atan2(v_from.x());
    for _ in 0..count as usize {
        let (sin0, cos0) = angle.sin_cos();
        let (sin1, cos1) = (angle + delta).sin_cos();
        let p0 = center + radius * Point::new(cos0, sin0);
        let p3 = center + radius * Point::new(cos1, sin1);
        let p1 = p0 + radius * ratio * Point::new(-sin0, cos0);
        let p2 = p3 - radius * ratio * Point::new(-sin1, cos1);
        out.extend(Some(Cubic([p0, p1, p2, p3]).into()));
        angle += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_roots() {
        let l = Line::new((0.0, -1.0), (2.0, 1.0));
        let roots: Vec<_> = l.roots().collect();
        assert_eq!(roots.len(), 1);
        assert_approx_eq!(roots[0], 0.5);

        let q = Quad::new((0.0, -2.0), (7.0, 6.0), (6.0, -4.0));
        let roots: Vec<_> = q.roots().collect();
        assert_eq!(roots.len(), 2);
        assert_approx_eq!(roots[0], 0.73841681234051, 1e-9);
        assert_approx_eq!(roots[1], 0.15047207654837882, 1e-9);

        let c = Cubic::new((0.0, -2.0), (2.0, 4.0), (4.0, -3.0), (9.0, 1.0));
        let roots: Vec<_> = c.roots().collect();
        assert_eq!(roots.len(), 3);
        for root in roots {
            assert_approx_eq!(c.at(root).y(), 0.0, 1e-9);
        }

        let c: Cubic = "M8,-1 C1,3 6,-3 9,1".parse().unwrap();
        let roots: Vec<_> = c.roots().collect();
        assert_eq!(roots.len(), 3);
        for root in roots {
            assert_approx_eq!(c.at(root).y(), 0.0, 1e-9);
        }
    }

    #[test]
    fn test_curve_matrices() {
        #[rustfmt::skip]
        let i3 = [
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            0.0, 0.0, 1.0
        ];
        let M3x3(q) = Q * QI;
        assert_eq!(i3.len(), q.len());
        for (v0, v1) in i3.iter().zip(q.iter()) {
            assert_approx_eq!(v0, v1);
        }

        #[rustfmt::skip]
        let i4 = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        let M4x4(c) = C * CI;
        assert_eq!(i4.len(), c.len());
        for (v0, v1) in i4.iter().zip(c.iter()) {
            assert_approx_eq!(v0, v1);
        }
    }

    #[test]
    fn test_ends() {
        let p0 = Point::new(1.0, 0.0);
        let p1 = Point::new(2.0, 1.0);
        let p2 = Point::new(3.0, 0.0);
        let p3 = Point::new(2.0, 0.0);

        let c = Cubic::new(p0, p1, p2, p3);
        let (start, end) = c.ends();
        assert_eq!(start, Line::new(p0, p1));
        assert_eq!(end, Line::new(p2, p3));

        let c = Cubic::new(p0, p0, p1, p2);
        let (start, end) = c.ends();
        assert_eq!(start, Line::new(p0, p1));
        assert_eq!(end, Line::new(p1, p2));

        let c = Cubic::new(p0, p1, p2, p2);
        let (start, end) = c.ends();
        assert_eq!(start, Line::new(p0, p1));
        assert_eq!(end, Line::new(p1, p2));

        let q = Quad::new(p0, p1, p2);
        let (start, end) = q.ends();
        assert_eq!(start, Line::new(p0, p1));
        assert_eq!(end, Line::new(p1, p2));
    }

    #[test]
    fn test_split() {
        let q = Quad::new((0.0, 0.0), (8.0, 5.0), (4.0, 0.0));
        let (ql, qr) = q.split();
        assert_eq!((ql, qr), q.split_at(0.5));
        assert_eq!(ql, q.cut(0.0, 0.5));
        assert_eq!(qr, q.cut(0.5, 1.0));

        let c = Cubic::new((3.0, 7.0), (2.0, 8.0), (0.0, 3.0), (6.0, 5.0));
        let (cl, cr) = c.split();
        assert_eq!((cl, cr), c.split_at(0.5));
        assert_eq!(cl, c.cut(0.0, 0.5));
        assert_eq!(cr, c.cut(0.5, 1.0));

        // concatenation of the halves reproduces the original curve
        for t in [0.1, 0.3, 0.5, 0.7, 0.9] {
            let p = c.at(t);
            let half = if t < 0.5 {
                cl.at(t * 2.0)
            } else {
                cr.at((t - 0.5) * 2.0)
            };
            assert!(p.is_close_to(half));
        }
    }

    #[test]
    fn test_bbox() {
        let cubic = Cubic::new((106.0, 0.0), (0.0, 100.0), (382.0, 216.0), (324.0, 14.0));
        let bbox = cubic.bbox(None);
        assert_approx_eq!(bbox.x(), 87.308, 0.001);
        assert_approx_eq!(bbox.y(), 0.0, 0.001);
        assert_approx_eq!(bbox.width(), 242.724, 0.001);
        assert_approx_eq!(bbox.height(), 125.140, 0.001);

        let quad = Quad::new((30.0, 90.0), (220.0, 200.0), (120.0, 50.0));
        let bbox = quad.bbox(None);
        assert_approx_eq!(bbox.x(), 30.0, 0.001);
        assert_approx_eq!(bbox.y(), 50.0, 0.001);
        assert_approx_eq!(bbox.width(), 124.483, 0.001);
        assert_approx_eq!(bbox.height(), 86.538, 0.001);
    }

    #[test]
    fn test_area() {
        // quarter-ish bulge from (1, 0) to (0, 1), checked against numeric
        // integration of x * y' - y * x'
        let quad = Quad::new((1.0, 0.0), (1.0, 1.0), (0.0, 1.0));
        assert_approx_eq!(quad.area(), 5.0 / 6.0, 1e-9);

        // the same curve elevated to a cubic keeps its area
        let cubic: Cubic = quad.into();
        assert_approx_eq!(cubic.area(), 5.0 / 6.0, 1e-9);

        // degenerate (collinear) curves sweep no area against their chord
        let line_area = Line::new((0.0, 0.0), (2.0, 0.0)).area();
        assert_approx_eq!(line_area, 0.0);
    }

    #[test]
    fn test_closest() {
        let cubic = Cubic::new((0.0, 0.0), (1.0, 2.0), (3.0, 2.0), (4.0, 0.0));
        let target = cubic.at(0.3);
        let ts = cubic.closest(target);
        assert!(!ts.is_empty());
        assert_approx_eq!(ts[0], 0.3, 1e-6);

        // point far below the curve projects to an endpoint
        let ts = Line::new((0.0, 0.0), (1.0, 0.0)).closest(Point::new(3.0, 1.0));
        assert_approx_eq!(ts[0], 1.0, 1e-6);
    }

    #[test]
    fn test_inflections() {
        // s-shaped cubic has a single inflection near the middle
        let cubic = Cubic::new((0.0, 0.0), (0.0, 1.0), (1.0, -1.0), (1.0, 0.0));
        let inflections: Vec<_> = cubic.inflections().collect();
        assert_eq!(inflections.len(), 1);
        assert_approx_eq!(inflections[0], 0.5, 1e-6);

        // convex arc has none
        let cubic = Cubic::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        assert_eq!(cubic.inflections().count(), 0);
    }

    #[test]
    fn test_self_intersect() {
        // loop: the curve comes back across itself
        let cubic = Cubic::new((0.0, 0.0), (10.0, 6.0), (-6.0, 6.0), (4.0, 0.0));
        let (t0, t1) = cubic.self_intersect().expect("loop not detected");
        assert!(t0 < t1);
        assert!(cubic.at(t0).is_close_to(cubic.at(t1)));

        // arch does not intersect itself
        let cubic = Cubic::new((0.0, 0.0), (1.0, 2.0), (3.0, 2.0), (4.0, 0.0));
        assert!(cubic.self_intersect().is_none());
    }

    #[test]
    fn test_segment_intersect() {
        // bbox subdivision intersection agrees with the analytic crossing
        let l0: Segment = Line::new((0.0, 0.0), (10.0, 10.0)).into();
        let l1 = Line::new((0.0, 10.0), (10.0, 0.0));
        let points = l0.intersect(l1, 1e-6);
        assert!(!points.is_empty());
        assert_approx_eq!(points[0].x(), 5.0, 1e-5);
        assert_approx_eq!(points[0].y(), 5.0, 1e-5);

        let quad = Quad::new((0.0, -2.0), (5.0, 8.0), (10.0, -2.0));
        let points = Segment::from(quad).intersect(Line::new((0.0, 0.0), (10.0, 0.0)), 1e-6);
        // both crossings are found (nearby boxes may report duplicates)
        assert!(points.len() >= 2);
        for p in points {
            assert_approx_eq!(p.y(), 0.0, 1e-5);
        }
    }

    #[test]
    fn test_arc_length() {
        let line = Line::new((0.0, 0.0), (3.0, 4.0));
        assert_approx_eq!(line.arc_length(1e-3), 5.0);

        // half of the unit circle approximated by a cubic
        let mut out: Vec<Segment> = Vec::new();
        arc_sweep(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(-1.0, 0.0),
            &mut out,
        );
        let length: Scalar = out.iter().map(|s| s.arc_length(1e-4)).sum();
        assert_approx_eq!(length, PI, 1e-3);
    }

    #[test]
    fn test_offset() {
        // offset of a straight line is parallel at the distance
        let mut out: Vec<Segment> = Vec::new();
        Line::new((0.0, 0.0), (10.0, 0.0)).offset(1.0, &mut out);
        assert_eq!(out.len(), 1);
        assert!(out[0].start().is_close_to(Point::new(0.0, -1.0)));
        assert!(out[0].end().is_close_to(Point::new(10.0, -1.0)));

        // every point of the offset approximation stays close to the true
        // distance from the source curve
        let cubic = Cubic::new((0.0, 0.0), (2.0, 4.0), (6.0, 4.0), (8.0, 0.0));
        let dist = 1.0;
        let mut out: Vec<Segment> = Vec::new();
        cubic.offset(dist, &mut out);
        assert!(!out.is_empty());
        for segment in out.iter() {
            for i in 0..=4 {
                let p = segment.at(i as Scalar / 4.0);
                let ts = cubic.closest(p);
                let d = p.dist(cubic.at(ts[0]));
                assert_approx_eq!(d, dist, 0.15);
            }
        }
    }
}
