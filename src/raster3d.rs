//! Triangle pipeline
//!
//! Barycentric scanline rasterization over a generic vertex type with
//! optional depth testing, face culling and perspective-correct attribute
//! interpolation. This is the path the compositing context drives for
//! projected 3D content.
use crate::{Color, LinColor, Point, Scalar, Surface, SurfaceMut, EPSILON};
use std::ops::{Add, Mul};

/// Vertex attributes that can be interpolated across a triangle.
///
/// Anything supporting addition and scalar multiplication qualifies, the
/// same algebra bezier elements use.
pub trait Interpolate: Copy + Add<Output = Self> + Mul<Scalar, Output = Self> {}

impl<T> Interpolate for T where T: Copy + Add<Output = T> + Mul<Scalar, Output = T> {}

/// Which faces to discard before any per-fragment work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CullMode {
    None,
    /// Discard triangles whose projected area is positive (counter-clockwise)
    Front,
    /// Discard triangles whose projected area is negative (clockwise)
    Back,
}

impl Default for CullMode {
    fn default() -> Self {
        Self::None
    }
}

/// Depth comparison function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DepthCompare {
    Always,
    Never,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Default for DepthCompare {
    fn default() -> Self {
        Self::Always
    }
}

impl DepthCompare {
    /// Test a candidate fragment depth against the stored value
    pub fn test(self, fragment: Scalar, stored: Scalar) -> bool {
        match self {
            DepthCompare::Always => true,
            DepthCompare::Never => false,
            DepthCompare::Equal => (fragment - stored).abs() < EPSILON,
            DepthCompare::NotEqual => (fragment - stored).abs() >= EPSILON,
            DepthCompare::Less => fragment < stored,
            DepthCompare::LessEqual => fragment <= stored,
            DepthCompare::Greater => fragment > stored,
            DepthCompare::GreaterEqual => fragment >= stored,
        }
    }
}

/// Vertex entering the triangle pipeline.
///
/// `position` is the projected device-space position, `depth` the projected
/// depth (1.0 is far), `rcp_w` the reciprocal of the view-space `w` used for
/// perspective-correct interpolation (1.0 means no perspective).
#[derive(Debug, Clone, Copy)]
pub struct Vertex<V> {
    pub position: Point,
    pub depth: Scalar,
    pub rcp_w: Scalar,
    pub attr: V,
}

impl<V> Vertex<V> {
    pub fn new(position: impl Into<Point>, depth: Scalar, rcp_w: Scalar, attr: V) -> Self {
        Self {
            position: position.into(),
            depth,
            rcp_w,
            attr,
        }
    }

    /// Flat 2D vertex without perspective
    pub fn flat(position: impl Into<Point>, attr: V) -> Self {
        Self::new(position, 0.0, 1.0, attr)
    }
}

/// Rasterize one triangle into the color surface.
///
/// Fragments are produced for every pixel whose center lies inside the
/// triangle. For each one the depth is interpolated barycentrically and
/// tested against `depth` (when present) with the compare mode; on pass the
/// depth is written and the shader invoked, on fail the shader is skipped
/// entirely. Vertex attributes are pre-divided by `w` before barycentric
/// combination and un-divided after, which makes the interpolation
/// perspective-correct.
///
/// Degenerate triangles (zero projected area) are a no-op.
#[allow(clippy::too_many_arguments)]
pub fn rasterize_triangle<V, S>(
    mut img: impl SurfaceMut<Item = LinColor>,
    mut depth: Option<impl SurfaceMut<Item = Scalar>>,
    depth_compare: DepthCompare,
    cull: CullMode,
    clip: Option<&impl Surface<Item = Scalar>>,
    vertices: [Vertex<V>; 3],
    shader: &mut S,
) where
    V: Interpolate,
    S: FnMut(V) -> Option<LinColor>,
{
    let [v0, v1, v2] = &vertices;
    let (p0, p1, p2) = (v0.position, v1.position, v2.position);

    // signed projected area decides facing and detects degeneracy
    let area = (p1 - p0).cross(p2 - p0);
    if area.abs() < EPSILON {
        return;
    }
    match cull {
        CullMode::None => {}
        CullMode::Front if area > 0.0 => return,
        CullMode::Back if area < 0.0 => return,
        _ => {}
    }

    let width = img.width();
    let height = img.height();
    if width == 0 || height == 0 {
        return;
    }
    let x_min = p0.x().min(p1.x()).min(p2.x()).floor().max(0.0) as usize;
    let x_max = (p0.x().max(p1.x()).max(p2.x()).ceil().max(0.0) as usize).min(width);
    let y_min = p0.y().min(p1.y()).min(p2.y()).floor().max(0.0) as usize;
    let y_max = (p0.y().max(p1.y()).max(p2.y()).ceil().max(0.0) as usize).min(height);

    // attributes pre-divided by w for perspective-correct combination
    let a0 = v0.attr * v0.rcp_w;
    let a1 = v1.attr * v1.rcp_w;
    let a2 = v2.attr * v2.rcp_w;

    for row in y_min..y_max {
        for col in x_min..x_max {
            let p = Point::new(col as Scalar + 0.5, row as Scalar + 0.5);
            // barycentric coordinates as sub-area ratios
            let l0 = (p1 - p).cross(p2 - p) / area;
            let l1 = (p2 - p).cross(p0 - p) / area;
            let l2 = (p0 - p).cross(p1 - p) / area;
            if l0 < 0.0 || l1 < 0.0 || l2 < 0.0 {
                continue;
            }

            if let Some(depth) = depth.as_mut() {
                let fragment = l0 * v0.depth + l1 * v1.depth + l2 * v2.depth;
                let stored = match depth.get(row, col) {
                    Some(stored) => *stored,
                    None => continue,
                };
                if !depth_compare.test(fragment, stored) {
                    // shader must not run for rejected fragments
                    continue;
                }
                if let Some(stored) = depth.get_mut(row, col) {
                    *stored = fragment;
                }
            }

            let rcp_w = l0 * v0.rcp_w + l1 * v1.rcp_w + l2 * v2.rcp_w;
            if rcp_w.abs() < EPSILON {
                continue;
            }
            let attr = (a0 * l0 + a1 * l1 + a2 * l2) * rcp_w.recip();
            let color = match shader(attr) {
                Some(color) => color,
                None => continue,
            };
            let coverage = match clip {
                Some(clip) => clip.get(row, col).copied().unwrap_or(1.0),
                None => 1.0,
            };
            if coverage <= 0.0 {
                continue;
            }
            if let Some(dst) = img.get_mut(row, col) {
                *dst = dst.blend_over(color * coverage as f32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Surface, SurfaceOwned};

    fn red() -> LinColor {
        LinColor::new(1.0, 0.0, 0.0, 1.0)
    }

    fn blue() -> LinColor {
        LinColor::new(0.0, 0.0, 1.0, 1.0)
    }

    fn no_clip() -> Option<&'static SurfaceOwned<Scalar>> {
        None
    }

    fn triangle(depth: Scalar, attr: LinColor) -> [Vertex<LinColor>; 3] {
        [
            Vertex::new((0.0, 0.0), depth, 1.0, attr),
            Vertex::new((16.0, 0.0), depth, 1.0, attr),
            Vertex::new((0.0, 16.0), depth, 1.0, attr),
        ]
    }

    #[test]
    fn test_depth_order_independence() {
        // two overlapping opaque triangles at different depths must resolve
        // to the nearer one regardless of the draw order
        for order in [[0.25, 0.75], [0.75, 0.25]] {
            let mut img = SurfaceOwned::<LinColor>::new(8, 8);
            let mut depth = SurfaceOwned::<Scalar>::new_with(8, 8, |_, _| 1.0);
            for z in order {
                let color = if z < 0.5 { red() } else { blue() };
                rasterize_triangle(
                    &mut img,
                    Some(&mut depth),
                    DepthCompare::Less,
                    CullMode::None,
                    no_clip(),
                    triangle(z, color),
                    &mut Some,
                );
            }
            // overlap shows the z = 0.25 triangle only
            assert_eq!(*img.get(2, 2).unwrap(), red());
            assert_eq!(*depth.get(2, 2).unwrap(), 0.25);
        }
    }

    #[test]
    fn test_depth_fail_skips_shader() {
        let mut img = SurfaceOwned::<LinColor>::new(8, 8);
        let mut depth = SurfaceOwned::<Scalar>::new_with(8, 8, |_, _| 0.0);
        let mut invoked = 0usize;
        let mut shader = |attr: LinColor| {
            invoked += 1;
            Some(attr)
        };
        // everything is behind the cleared depth of 0.0 under `less`
        rasterize_triangle(
            &mut img,
            Some(&mut depth),
            DepthCompare::Less,
            CullMode::None,
            no_clip(),
            triangle(0.5, red()),
            &mut shader,
        );
        assert_eq!(invoked, 0);
        assert_eq!(*img.get(2, 2).unwrap(), LinColor::default());
    }

    #[test]
    fn test_culling() {
        let mut img = SurfaceOwned::<LinColor>::new(8, 8);
        // counter-clockwise triangle in y-down coordinates has negative area
        let vertices = triangle(0.0, red());
        let area = (vertices[1].position - vertices[0].position)
            .cross(vertices[2].position - vertices[0].position);
        assert!(area > 0.0);

        rasterize_triangle(
            &mut img,
            None::<&mut SurfaceOwned<Scalar>>,
            DepthCompare::Always,
            CullMode::Front,
            no_clip(),
            vertices,
            &mut Some,
        );
        assert_eq!(*img.get(2, 2).unwrap(), LinColor::default());

        rasterize_triangle(
            &mut img,
            None::<&mut SurfaceOwned<Scalar>>,
            DepthCompare::Always,
            CullMode::Back,
            no_clip(),
            vertices,
            &mut Some,
        );
        assert_eq!(*img.get(2, 2).unwrap(), red());
    }

    #[test]
    fn test_degenerate_triangle() {
        let mut img = SurfaceOwned::<LinColor>::new(8, 8);
        let vertices = [
            Vertex::flat((0.0, 0.0), red()),
            Vertex::flat((8.0, 8.0), red()),
            Vertex::flat((4.0, 4.0), red()),
        ];
        rasterize_triangle(
            &mut img,
            None::<&mut SurfaceOwned<Scalar>>,
            DepthCompare::Always,
            CullMode::None,
            no_clip(),
            vertices,
            &mut Some,
        );
        for pixel in img.iter() {
            assert_eq!(*pixel, LinColor::default());
        }
    }

    #[test]
    fn test_barycentric_interpolation() {
        // scalar attribute ramp along x
        let mut img = SurfaceOwned::<LinColor>::new(4, 16);
        let vertices = [
            Vertex::flat((0.0, 0.0), 0.0f64),
            Vertex::flat((16.0, 0.0), 16.0f64),
            Vertex::flat((0.0, 4.0), 0.0f64),
        ];
        let mut seen = Vec::new();
        let mut shader = |attr: Scalar| {
            seen.push(attr);
            Some(LinColor::new(0.0, 0.0, 0.0, 1.0))
        };
        rasterize_triangle(
            &mut img,
            None::<&mut SurfaceOwned<Scalar>>,
            DepthCompare::Always,
            CullMode::None,
            no_clip(),
            vertices,
            &mut shader,
        );
        // attribute equals the x coordinate of the pixel center
        assert!(!seen.is_empty());
        for attr in seen {
            assert!((attr.fract() - 0.5).abs() < 1e-6, "attr = {}", attr);
        }
    }

    #[test]
    fn test_perspective_correct() {
        // left edge at w = 1, right edge at w = 2 (rcp_w = 0.5): the
        // attribute midpoint shifts towards the near edge
        let mut img = SurfaceOwned::<LinColor>::new(1, 16);
        let vertices = [
            Vertex::new((0.0, -8.0), 0.0, 1.0, 0.0f64),
            Vertex::new((16.0, 0.5), 0.0, 0.5, 1.0f64),
            Vertex::new((0.0, 8.0), 0.0, 1.0, 0.0f64),
        ];
        let mut samples = Vec::new();
        let mut shader = |attr: Scalar| {
            samples.push(attr);
            Some(LinColor::new(0.0, 0.0, 0.0, 1.0))
        };
        rasterize_triangle(
            &mut img,
            None::<&mut SurfaceOwned<Scalar>>,
            DepthCompare::Always,
            CullMode::None,
            no_clip(),
            vertices,
            &mut shader,
        );
        // at the screen midpoint the perspective-correct value of a 0..1
        // ramp with w 1..2 is 1/3, not the screen-linear 1/2
        let mid = samples
            .iter()
            .fold(f64::INFINITY, |best: f64, attr| {
                if (attr - 1.0 / 3.0).abs() < (best - 1.0 / 3.0).abs() {
                    *attr
                } else {
                    best
                }
            });
        assert!((mid - 1.0 / 3.0).abs() < 0.1, "mid = {}", mid);
    }
}
