//! Scan-conversion rasterizer
//!
//! Coverage is accumulated per pixel as the signed difference introduced by
//! each path edge, one scanline at a time, then resolved to a winding mask.
use crate::{
    Color, FillRule, LinColor, Line, Paint, Point, Scalar, Shape, Surface, SurfaceMut,
    SurfaceMutRef, Transform, Units, EPSILON, DEFAULT_FLATNESS,
};
use std::{cmp::min, fmt};

/// Update provided surface with the signed difference of the line
///
/// Signed difference is a difference between adjacent pixels introduced by the line.
pub(crate) fn signed_difference_line(mut surf: impl SurfaceMut<Item = Scalar>, line: Line) {
    signed_difference_line_rec(surf.as_mut(), line)
}

fn signed_difference_line_rec(mut surf: SurfaceMutRef<'_, Scalar>, line: Line) {
    // y - is a row
    // x - is a column
    let Line([p0, p1]) = line;
    if surf.width() < 2 || surf.height() == 0 {
        return;
    }

    // handle lines that are intersecting `x == surf.width()`
    // - just throw away part that has x > surf.width for all points
    let width = surf.width() as Scalar - 1.0;
    let line = if p0.x() > width || p1.x() > width {
        if p0.x() > width && p1.x() > width {
            Line::new((width - 0.001, p0.y()), (width - 0.001, p1.y()))
        } else {
            let t = (p0.x() - width) / (p0.x() - p1.x());
            let mid = Point::new(width, (1.0 - t) * p0.y() + t * p1.y());
            if p0.x() < width {
                Line::new(p0, mid)
            } else {
                Line::new(mid, p1)
            }
        }
    } else {
        line
    };

    // handle lines that are intersecting `x == 0.0`
    // - line is split in left (for all points where x < 0.0) and the mid part
    // - left part is converted to a vertical line that spans same y's and x == 0.0
    // - left part is rasterized recursively, and mid part rasterized after this
    let Line([p0, p1]) = line;
    let line = if p0.x() < 0.0 || p1.x() < 0.0 {
        let (vertical, line) = if p1.x() > 0.0 || p0.x() > 0.0 {
            let t = p0.x() / (p0.x() - p1.x());
            let mid = Point::new(0.0, (1.0 - t) * p0.y() + t * p1.y());
            if p1.x() > 0.0 {
                let p = Point::new(0.0, p0.y());
                (Line::new(p, mid), Line::new(mid, p1))
            } else {
                let p = Point::new(0.0, p1.y());
                (Line::new(mid, p), Line::new(p0, mid))
            }
        } else {
            (
                Line::new((0.0, p0.y()), (0.0, p1.y())),
                Line::new((0.0, 0.0), (0.0, 0.0)),
            )
        };
        // signed difference by the line left of `x == 0.0`
        signed_difference_line_rec(surf.as_mut(), vertical);
        line
    } else {
        line
    };

    let Line([p0, p1]) = line;
    let layout = surf.layout();
    let data = surf.data_mut();
    let stride = layout.col_stride;

    if (p0.y() - p1.y()).abs() < EPSILON {
        // line does not introduce any signed coverage
        return;
    }
    // always iterate from the point with the smallest y coordinate
    let (dir, p0, p1) = if p0.y() < p1.y() {
        (1.0, p0, p1)
    } else {
        (-1.0, p1, p0)
    };
    let dxdy = (p1.x() - p0.x()) / (p1.y() - p0.y());
    // find first point to trace. since we are going to iterate over y's
    // we should pick min(y , p0.y) as a starting y point, and adjust x
    // accordingly
    let y = p0.y().max(0.0) as usize;
    let mut x = if p0.y() < 0.0 {
        p0.x() - p0.y() * dxdy
    } else {
        p0.x()
    };
    let mut x_next = x;
    for y in y..min(layout.height, p1.y().ceil().max(0.0) as usize) {
        x = x_next;
        let row_offset = layout.offset(y, 0); // current line offset in the data array
        let dy = ((y + 1) as Scalar).min(p1.y()) - (y as Scalar).max(p0.y());
        // signed y difference
        let d = dir * dy;
        // find next x position
        x_next = x + dxdy * dy;
        // order (x, x_next) from smaller value x0 to bigger x1
        let (x0, x1) = if x < x_next { (x, x_next) } else { (x_next, x) };
        // lower bound of effected x pixels
        let x0_floor = x0.floor().max(0.0);
        let x0i = x0_floor as i32;
        // upper bound of effected x pixels
        let x1_ceil = x1.ceil();
        let x1i = x1_ceil as i32;
        if x1i <= x0i + 1 {
            // only goes through one pixel (with the total coverage of `d` spread over two pixels)
            let xmf = 0.5 * (x + x_next) - x0_floor; // effective height
            data[row_offset + (x0i as usize) * stride] += d * (1.0 - xmf);
            data[row_offset + ((x0i + 1) as usize) * stride] += d * xmf;
        } else {
            let s = (x1 - x0).recip();
            let x0f = x0 - x0_floor; // fractional part of x0
            let x1f = x1 - x1_ceil + 1.0; // fractional part of x1
            let a0 = 0.5 * s * (1.0 - x0f) * (1.0 - x0f); // fractional area of the pixel with smallest x
            let am = 0.5 * s * x1f * x1f; // fractional area of the pixel with largest x
            data[row_offset + (x0i as usize) * stride] += d * a0;
            if x1i == x0i + 2 {
                // only two pixels are covered
                data[row_offset + ((x0i + 1) as usize) * stride] += d * (1.0 - a0 - am);
            } else {
                // second pixel
                let a1 = s * (1.5 - x0f);
                data[row_offset + ((x0i + 1) as usize) * stride] += d * (a1 - a0);
                // (second, last) pixels
                for xi in x0i + 2..x1i - 1 {
                    data[row_offset + (xi as usize) * stride] += d * s;
                }
                // last pixel
                let a2 = a1 + (x1i - x0i - 3) as Scalar * s;
                data[row_offset + ((x1i - 1) as usize) * stride] += d * (1.0 - a2 - am);
            }
            data[row_offset + (x1i as usize) * stride] += d * am
        }
    }
}

/// Resolve accumulated signed differences to a winding mask.
///
/// With antialiasing off the partial coverage at edges is snapped to fully
/// covered or fully empty at the 0.5 threshold, pixels whose center is
/// inside keep full coverage.
pub(crate) fn signed_difference_to_mask(
    mut surf: impl SurfaceMut<Item = Scalar>,
    fill_rule: FillRule,
    antialias: bool,
) {
    let layout = surf.layout();
    let data = surf.data_mut();
    for y in 0..layout.height {
        let mut acc = 0.0;
        for x in 0..layout.width {
            let offset = layout.offset(y, x);
            acc += data[offset];
            let value = match fill_rule {
                FillRule::NonZero => {
                    let value = acc.abs();
                    if value > 1.0 {
                        1.0
                    } else if value < 1e-6 {
                        0.0
                    } else {
                        value
                    }
                }
                FillRule::EvenOdd => ((acc + 1.0).rem_euclid(2.0) - 1.0).abs(),
            };
            data[offset] = if antialias {
                value
            } else if value < 0.5 {
                0.0
            } else {
                1.0
            };
        }
    }
}

/// Rasterizer converts a shape into a coverage mask
pub trait Rasterizer: fmt::Debug {
    /// Name of the rasterizer for diagnostics
    fn name(&self) -> &str;

    /// Rasterize the shape into the provided mask surface.
    ///
    /// Surface is assumed to contain zeros, everything outside of it is
    /// cropped.
    fn mask_to(
        &self,
        shape: &Shape,
        tr: Transform,
        fill_rule: FillRule,
        antialias: bool,
        surf: SurfaceMutRef<'_, Scalar>,
    );
}

/// Scanline rasterizer computing analytic pixel coverage from the signed
/// difference introduced by every flattened path edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignedDifferenceRasterizer;

impl Rasterizer for SignedDifferenceRasterizer {
    fn name(&self) -> &str {
        "signed-difference"
    }

    fn mask_to(
        &self,
        shape: &Shape,
        tr: Transform,
        fill_rule: FillRule,
        antialias: bool,
        mut surf: SurfaceMutRef<'_, Scalar>,
    ) {
        for line in shape.flatten(tr, DEFAULT_FLATNESS, true) {
            signed_difference_line_rec(surf.as_mut(), line);
        }
        signed_difference_to_mask(surf, fill_rule, antialias);
    }
}

/// Fill the shape into a color surface running the paint shader over every
/// covered pixel.
///
/// A coverage mask is rasterized first; each covered pixel invokes the paint
/// at the pixel center (mapped into paint coordinates) and blends the result
/// over the destination proportionally to the coverage.
pub fn fill(
    rasterizer: &dyn Rasterizer,
    shape: &Shape,
    tr: Transform,
    fill_rule: FillRule,
    paint: impl Paint,
    antialias: bool,
    mut img: impl SurfaceMut<Item = LinColor>,
) {
    let height = img.height();
    let width = img.width();
    if height == 0 || width == 0 {
        return;
    }
    let mut mask = crate::SurfaceOwned::<Scalar>::new(height, width);
    rasterizer.mask_to(shape, tr, fill_rule, antialias, mask.as_mut());

    // paint point mapping: pixel centers back into paint coordinates
    let units_tr = match paint.units() {
        // unit square of the paint maps onto the shape bounding box in
        // shape-local coordinates
        Some(Units::BoundingBox) => match shape.bbox() {
            Some(bbox) => tr * bbox.unit_transform(),
            None => return,
        },
        _ => tr,
    };
    let paint_tr = match (units_tr * paint.transform()).invert() {
        Some(tr) => tr,
        None => return,
    };

    for row in 0..height {
        for col in 0..width {
            let coverage = match mask.get(row, col) {
                Some(coverage) if *coverage > 1e-6 => *coverage as f32,
                _ => continue,
            };
            let point = paint_tr.apply(Point::new(col as Scalar + 0.5, row as Scalar + 0.5));
            let color = paint.at(point) * coverage;
            if let Some(dst) = img.get_mut(row, col) {
                *dst = dst.blend_over(color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_approx_eq, BBox, Surface, SurfaceOwned};

    #[test]
    fn test_signed_difference_line() {
        let mut surf = SurfaceOwned::new(2, 5);

        // line covers many columns but just one row
        signed_difference_line(&mut surf, Line::new((0.5, 1.0), (3.5, 0.0)));
        // covered areas per-pixel
        let a0 = (0.5 * (1.0 / 6.0)) / 2.0;
        let a1 = ((1.0 / 6.0) + (3.0 / 6.0)) / 2.0;
        let a2 = ((3.0 / 6.0) + (5.0 / 6.0)) / 2.0;
        assert_approx_eq!(*surf.get(0, 0).unwrap(), -a0, 1e-6);
        assert_approx_eq!(*surf.get(0, 1).unwrap(), a0 - a1, 1e-6);
        assert_approx_eq!(*surf.get(0, 2).unwrap(), a1 - a2, 1e-6);
        assert_approx_eq!(*surf.get(0, 3).unwrap(), a0 - a1, 1e-6);
        assert_approx_eq!(*surf.get(0, 4).unwrap(), -a0, 1e-6);
        // total difference
        let a: Scalar = surf.iter().sum();
        assert_approx_eq!(a, -1.0, 1e-6);
        surf.clear();

        // out of bound line (intersects x = 0.0)
        signed_difference_line(&mut surf, Line::new((-1.0, 0.0), (1.0, 1.0)));
        assert_approx_eq!(*surf.get(0, 0).unwrap(), 3.0 / 4.0, 1e-6);
        assert_approx_eq!(*surf.get(0, 1).unwrap(), 1.0 / 4.0, 1e-6);
        surf.clear();

        // single pixel covered
        signed_difference_line(&mut surf, Line::new((0.1, 0.1), (0.9, 0.9)));
        assert_approx_eq!(*surf.get(0, 0).unwrap(), 0.4, 1e-6);
        assert_approx_eq!(*surf.get(0, 1).unwrap(), 0.8 - 0.4, 1e-6);
        surf.clear();

        // multiple rows vertical
        signed_difference_line(&mut surf, Line::new((0.5, 0.5), (0.5, 1.75)));
        assert_approx_eq!(*surf.get(0, 0).unwrap(), 1.0 / 4.0, 1e-6);
        assert_approx_eq!(*surf.get(0, 1).unwrap(), 1.0 / 4.0, 1e-6);
        assert_approx_eq!(*surf.get(1, 0).unwrap(), 3.0 / 8.0, 1e-6);
        assert_approx_eq!(*surf.get(1, 1).unwrap(), 3.0 / 8.0, 1e-6);
        surf.clear();
    }

    #[test]
    fn test_rect_coverage() {
        // with antialiasing off every pixel whose center is inside the
        // rectangle is fully covered, every pixel outside is empty
        let shape = Shape::rect(BBox::new((0.0, 0.0), (10.0, 10.0)));
        let mut surf = SurfaceOwned::<Scalar>::new(12, 12);
        let rasterizer = SignedDifferenceRasterizer;
        rasterizer.mask_to(
            &shape,
            Transform::identity(),
            FillRule::NonZero,
            false,
            surf.as_mut(),
        );
        for row in 0..12 {
            for col in 0..12 {
                let expected = if row < 10 && col < 10 { 1.0 } else { 0.0 };
                assert_approx_eq!(*surf.get(row, col).unwrap(), expected, 1e-6);
            }
        }
    }

    #[test]
    fn test_figure_eight_winding() {
        // two overlapping squares traversed in the same direction: the
        // overlap winds twice
        let same: Shape = "M0,0 h10 v10 h-10 z M5,5 h10 v10 h-10 z".parse().unwrap();
        let surf = same.rasterize(Transform::identity(), FillRule::NonZero);
        // rasterize adds a one pixel border, lobe and overlap sample points
        let at = |x: usize, y: usize| *surf.get(y + 1, x + 1).unwrap();
        assert_approx_eq!(at(2, 2), 1.0, 1e-6); // first lobe
        assert_approx_eq!(at(12, 12), 1.0, 1e-6); // second lobe
        assert_approx_eq!(at(7, 7), 1.0, 1e-6); // overlap, winding 2

        // even-odd turns the double covered overlap into a hole
        let surf = same.rasterize(Transform::identity(), FillRule::EvenOdd);
        let at = |x: usize, y: usize| *surf.get(y + 1, x + 1).unwrap();
        assert_approx_eq!(at(2, 2), 1.0, 1e-6);
        assert_approx_eq!(at(7, 7), 0.0, 1e-6);

        // opposite directions cancel: winding 0 in the overlap under the
        // nonzero rule
        let opposite: Shape = "M0,0 h10 v10 h-10 z M5,5 v10 h10 v-10 z".parse().unwrap();
        let surf = opposite.rasterize(Transform::identity(), FillRule::NonZero);
        let at = |x: usize, y: usize| *surf.get(y + 1, x + 1).unwrap();
        assert_approx_eq!(at(2, 2), 1.0, 1e-6);
        assert_approx_eq!(at(12, 12), 1.0, 1e-6);
        assert_approx_eq!(at(7, 7), 0.0, 1e-6);
    }

    #[test]
    fn test_fill() {
        let shape = Shape::rect(BBox::new((2.0, 2.0), (8.0, 8.0)));
        let mut img = SurfaceOwned::<LinColor>::new(10, 10);
        let color = LinColor::new(0.0, 1.0, 0.0, 1.0);
        fill(
            &SignedDifferenceRasterizer,
            &shape,
            Transform::identity(),
            FillRule::NonZero,
            color,
            true,
            &mut img,
        );
        assert_eq!(*img.get(5, 5).unwrap(), color);
        assert_eq!(*img.get(0, 0).unwrap(), LinColor::default());
    }
}
