//! Polynomials in the power basis and real root finding
use crate::{almost_zero, clamp, utils::ArrayIter, Scalar, EPSILON, PI};
use std::{
    fmt,
    ops::{Add, Mul, Sub},
};

/// Solve quadratic equation `a * t ^ 2 + b * t + c = 0` for `t`
pub(crate) fn quadratic_solve(a: Scalar, b: Scalar, c: Scalar) -> impl Iterator<Item = Scalar> {
    let mut result = ArrayIter::<[Option<Scalar>; 2]>::new();
    if almost_zero(a) {
        if !almost_zero(b) {
            result.push(-c / b);
        }
        return result;
    }
    let disc = b * b - 4.0 * a * c;
    if almost_zero(disc) {
        result.push(-b / (2.0 * a));
    } else if disc > 0.0 {
        let sq = disc.sqrt();
        // More stable solution than generic formula:
        // https://people.csail.mit.edu/bkph/articles/Quadratics.pdf
        if b >= 0.0 {
            let mul = -b - sq;
            result.push(mul / (2.0 * a));
            result.push(2.0 * c / mul);
        } else {
            let mul = -b + sq;
            result.push(2.0 * c / mul);
            result.push(mul / (2.0 * a));
        }
    }
    result
}

/// Solve cubic equation `a * t ^ 3 + b * t ^ 2 + c * t + d = 0` for `t`
/// Reference: https://www.trans4mind.com/personal_development/mathematics/polynomials/cubicAlgebra.htm
#[allow(clippy::many_single_char_names)]
pub(crate) fn cubic_solve(
    a: Scalar,
    b: Scalar,
    c: Scalar,
    d: Scalar,
) -> impl Iterator<Item = Scalar> {
    let mut results = ArrayIter::<[Option<Scalar>; 3]>::new();
    if a.abs() < 1.0 && a.abs().powi(2) < EPSILON {
        results.extend(quadratic_solve(b, c, d));
        return results;
    }
    if d.abs() < EPSILON {
        results.push(0.0);
        results.extend(quadratic_solve(a, b, c));
        return results;
    }

    // helper to calculate cubic root
    fn crt(value: Scalar) -> Scalar {
        if value < 0.0 {
            -(-value).powf(1.0 / 3.0)
        } else {
            value.powf(1.0 / 3.0)
        }
    }

    // convert to `t ^ 3 + a * t ^ 2 + b * t + c = 0`
    let (a, b, c) = (b / a, c / a, d / a);

    // convert to `t ^ 3 + p * t + q = 0`
    let p = (3.0 * b - a * a) / 3.0;
    let q = ((2.0 * a * a - 9.0 * b) * a + 27.0 * c) / 27.0;
    let p3 = p / 3.0;
    let q2 = q / 2.0;
    let disc = q2 * q2 + p3 * p3 * p3;

    if disc.abs() < EPSILON {
        // two roots
        let u1 = if q2 < 0.0 { crt(-q2) } else { -crt(q2) };
        results.push(2.0 * u1 - a / 3.0);
        results.push(-u1 - a / 3.0);
    } else if disc > 0.0 {
        // one root (Cardano)
        let sd = disc.sqrt();
        results.push(crt(sd - q2) - crt(sd + q2) - a / 3.0);
    } else {
        // three roots (trigonometric)
        let r = (-p3 * p3 * p3).sqrt();
        let phi = clamp(-q / (2.0 * r), -1.0, 1.0).acos();
        let c = 2.0 * crt(r);
        let a3 = a / 3.0;
        results.push(c * (phi / 3.0).cos() - a3);
        results.push(c * ((phi + 2.0 * PI) / 3.0).cos() - a3);
        results.push(c * ((phi + 4.0 * PI) / 3.0).cos() - a3);
    }

    results
}

/// Polynomial in the power basis.
///
/// Coefficient at index `i` is the coefficient of `t ^ i`, so
/// `degree = coeffs.len() - 1`. Scalar bezier curves convert to and from
/// this form through the Bernstein change of basis.
#[derive(Clone, PartialEq, Default)]
pub struct Polynomial {
    coeffs: Vec<Scalar>,
}

impl fmt::Debug for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Poly")?;
        for (power, coeff) in self.coeffs.iter().enumerate() {
            write!(f, " {}t^{}", coeff, power)?;
        }
        Ok(())
    }
}

impl Polynomial {
    pub fn new(coeffs: Vec<Scalar>) -> Self {
        Self { coeffs }
    }

    pub fn coeffs(&self) -> &[Scalar] {
        &self.coeffs
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Drop trailing near-zero coefficients
    pub fn trimmed(mut self) -> Self {
        while let Some(coeff) = self.coeffs.last() {
            if self.coeffs.len() > 1 && almost_zero(*coeff) {
                self.coeffs.pop();
            } else {
                break;
            }
        }
        self
    }

    /// Evaluate polynomial at `t` (Horner scheme)
    pub fn eval(&self, t: Scalar) -> Scalar {
        self.coeffs
            .iter()
            .rev()
            .fold(0.0, |acc, coeff| acc * t + coeff)
    }

    /// Derivative with respect to `t`, coefficient shift `c_i * i`
    pub fn derivative(&self) -> Polynomial {
        let coeffs = self
            .coeffs
            .iter()
            .enumerate()
            .skip(1)
            .map(|(power, coeff)| coeff * power as Scalar)
            .collect();
        Self { coeffs }
    }

    /// Antiderivative with zero constant term, coefficient shift `c_i / (i + 1)`
    pub fn integral(&self) -> Polynomial {
        let coeffs = Some(0.0)
            .into_iter()
            .chain(
                self.coeffs
                    .iter()
                    .enumerate()
                    .map(|(power, coeff)| coeff / (power + 1) as Scalar),
            )
            .collect();
        Self { coeffs }
    }

    /// All real roots of the polynomial.
    ///
    /// Closed forms are used up to degree 3. Higher degrees recurse through
    /// the roots of the derivative: between consecutive stationary points the
    /// polynomial is monotonic, a sign change there brackets exactly one root
    /// which bisection then pins down in a fixed number of steps.
    pub fn roots(&self) -> Vec<Scalar> {
        let poly = self.clone().trimmed();
        match poly.coeffs.as_slice() {
            [] | [_] => Vec::new(),
            [c0, c1] => {
                if almost_zero(*c1) {
                    Vec::new()
                } else {
                    vec![-c0 / c1]
                }
            }
            [c, b, a] => quadratic_solve(*a, *b, *c).collect(),
            [d, c, b, a] => cubic_solve(*a, *b, *c, *d).collect(),
            coeffs => {
                // bound on root magnitude (Cauchy): 1 + max |c_i / c_n|
                let lead = coeffs[coeffs.len() - 1];
                let bound = 1.0
                    + coeffs[..coeffs.len() - 1]
                        .iter()
                        .fold(0.0, |acc: Scalar, c| acc.max((c / lead).abs()));
                let mut stationary = poly.derivative().roots();
                stationary.retain(|t| t.abs() <= bound);
                stationary.sort_by(|a, b| a.partial_cmp(b).expect("stationary point is NaN"));
                let mut edges = Vec::with_capacity(stationary.len() + 2);
                edges.push(-bound);
                edges.extend(stationary);
                edges.push(bound);

                let mut roots = Vec::new();
                for window in edges.windows(2) {
                    let (mut lo, mut hi) = (window[0], window[1]);
                    let (v_lo, v_hi) = (poly.eval(lo), poly.eval(hi));
                    if almost_zero(v_lo) {
                        if roots.last().map_or(true, |r| !almost_equal_root(*r, lo)) {
                            roots.push(lo);
                        }
                        continue;
                    }
                    if v_lo * v_hi > 0.0 {
                        continue;
                    }
                    // bisection, monotonic interval so exactly one crossing
                    for _ in 0..64 {
                        let mid = 0.5 * (lo + hi);
                        let v_mid = poly.eval(mid);
                        if almost_zero(v_mid) {
                            lo = mid;
                            hi = mid;
                            break;
                        }
                        if v_lo * v_mid < 0.0 {
                            hi = mid;
                        } else {
                            lo = mid;
                        }
                    }
                    roots.push(0.5 * (lo + hi));
                }
                // right edge can be a root as well
                if almost_zero(poly.eval(bound))
                    && roots.last().map_or(true, |r| !almost_equal_root(*r, bound))
                {
                    roots.push(bound);
                }
                roots
            }
        }
    }

    /// Determine if every coefficient is close to zero.
    ///
    /// Resultant-based intersection uses this to detect the degenerate case
    /// where two curves are coincident and the parameter cannot be eliminated.
    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|coeff| almost_zero(*coeff))
    }
}

fn almost_equal_root(r0: Scalar, r1: Scalar) -> bool {
    (r0 - r1).abs() < 1e-9
}

impl From<Vec<Scalar>> for Polynomial {
    fn from(coeffs: Vec<Scalar>) -> Self {
        Self::new(coeffs)
    }
}

impl Add for Polynomial {
    type Output = Polynomial;

    fn add(self, other: Polynomial) -> Self::Output {
        let (mut long, short) = if self.coeffs.len() >= other.coeffs.len() {
            (self, other)
        } else {
            (other, self)
        };
        for (index, coeff) in short.coeffs.iter().enumerate() {
            long.coeffs[index] += coeff;
        }
        long
    }
}

impl Sub for Polynomial {
    type Output = Polynomial;

    fn sub(self, other: Polynomial) -> Self::Output {
        let mut coeffs = self.coeffs;
        if coeffs.len() < other.coeffs.len() {
            coeffs.resize(other.coeffs.len(), 0.0);
        }
        for (index, coeff) in other.coeffs.iter().enumerate() {
            coeffs[index] -= coeff;
        }
        Self { coeffs }
    }
}

impl Mul for Polynomial {
    type Output = Polynomial;

    fn mul(self, other: Polynomial) -> Self::Output {
        if self.coeffs.is_empty() || other.coeffs.is_empty() {
            return Self { coeffs: Vec::new() };
        }
        let mut coeffs = vec![0.0; self.coeffs.len() + other.coeffs.len() - 1];
        for (i, c0) in self.coeffs.iter().enumerate() {
            for (j, c1) in other.coeffs.iter().enumerate() {
                coeffs[i + j] += c0 * c1;
            }
        }
        Self { coeffs }
    }
}

impl Mul<Scalar> for Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: Scalar) -> Self::Output {
        let coeffs = self.coeffs.into_iter().map(|coeff| coeff * rhs).collect();
        Self { coeffs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_solve() {
        fn solve_check(a: Scalar, b: Scalar, c: Scalar, d: Scalar, roots: &[Scalar]) {
            const PREC: Scalar = 0.00001;
            let mut index = 0;
            for root in cubic_solve(a, b, c, d) {
                let value = a * root * root * root + b * root * root + c * root + d;
                if value.abs() > PREC {
                    panic!("f(x = {}) = {} != 0", root, value);
                }
                match roots.get(index) {
                    Some(root_ref) => assert_approx_eq!(root, *root_ref, PREC),
                    None => panic!("result is longer than expected: {:?}", roots),
                }
                index += 1;
            }
            if index != roots.len() {
                panic!("result is shorter than expected: {:?}", roots)
            }
        }

        // cubic
        solve_check(1.0, 0.0, -12.0, 16.0, &[-4.0, 2.0]);
        solve_check(1.0, -6.0, 11.0, -6.0, &[3.0, 1.0, 2.0]);
        solve_check(23.0, 17.0, -11.0, 13.0, &[-1.38148]);

        // quadratic
        solve_check(0.0, 1.0, -5.0, 6.0, &[2.0, 3.0]);
        solve_check(0.0, 1.0, -6.0, 9.0, &[3.0]);
        solve_check(0.0, 1.0, 3.0, 5.0, &[]);

        // linear
        solve_check(0.0, 0.0, 5.0, 10.0, &[-2.0]);
    }

    #[test]
    fn test_quadratic_round_trip() {
        // a * (t - r0) * (t - r1) expanded back to coefficients
        let (r0, r1) = (-1.5, 2.25);
        let a = 3.0;
        let roots: Vec<_> = quadratic_solve(a, -a * (r0 + r1), a * r0 * r1).collect();
        assert_eq!(roots.len(), 2);
        assert!(roots.iter().any(|r| (r - r0).abs() < 1e-9));
        assert!(roots.iter().any(|r| (r - r1).abs() < 1e-9));
    }

    #[test]
    fn test_eval_derivative_integral() {
        // 1 + 2t + 3t^2
        let poly = Polynomial::new(vec![1.0, 2.0, 3.0]);
        assert_approx_eq!(poly.eval(0.0), 1.0);
        assert_approx_eq!(poly.eval(2.0), 17.0);

        let deriv = poly.derivative();
        assert_eq!(deriv.coeffs(), &[2.0, 6.0]);

        let integral = poly.integral();
        assert_eq!(integral.coeffs(), &[0.0, 1.0, 1.0, 1.0]);
        // derivative of the integral is the original
        assert_eq!(integral.derivative().coeffs(), poly.coeffs());
    }

    #[test]
    fn test_roots_high_degree() {
        // (t - 1)(t - 2)(t - 3)(t - 4) = 24 - 50t + 35t^2 - 10t^3 + t^4
        let poly = Polynomial::new(vec![24.0, -50.0, 35.0, -10.0, 1.0]);
        let roots = poly.roots();
        assert_eq!(roots.len(), 4);
        for (root, expected) in roots.iter().zip([1.0, 2.0, 3.0, 4.0]) {
            assert_approx_eq!(root, expected, 1e-6);
        }

        // no real roots
        let poly = Polynomial::new(vec![1.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(poly.roots().is_empty());
    }

    #[test]
    fn test_poly_arithmetic() {
        let p0 = Polynomial::new(vec![1.0, 1.0]); // 1 + t
        let p1 = Polynomial::new(vec![-1.0, 1.0]); // -1 + t
        let prod = p0.clone() * p1.clone();
        assert_eq!(prod.coeffs(), &[-1.0, 0.0, 1.0]); // t^2 - 1
        let sum = p0.clone() + p1.clone();
        assert_eq!(sum.coeffs(), &[0.0, 2.0]);
        let diff = p0 - p1;
        assert_eq!(diff.coeffs(), &[2.0, 0.0]);
    }

    #[test]
    fn test_trimmed() {
        let poly = Polynomial::new(vec![1.0, 2.0, 1e-12, 0.0]).trimmed();
        assert_eq!(poly.coeffs(), &[1.0, 2.0]);
        let poly = Polynomial::new(vec![0.0]).trimmed();
        assert_eq!(poly.coeffs(), &[0.0]);
    }
}
