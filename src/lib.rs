//! 2D vector graphics and color compositing engine.
//!
//! Main features:
//!  - Bezier curve geometry of arbitrary degree: evaluation, splitting,
//!    degree elevation, offsetting, quadratic fitting and resultant based
//!    intersections
//!  - Shape/path model with memoized boundary, area and spatial index
//!  - Anti-aliased scanline rasterization with nonzero/even-odd winding
//!  - Depth-tested triangle pipeline with perspective-correct interpolation
//!  - Compositing context with graphics state stack, clipping and nested
//!    transparency layers
//!
mod bezier;
mod color;
mod context;
mod curve;
mod ellipse;
mod geometry;
mod grad;
mod poly;
mod raster3d;
mod rasterize;
mod shape;
mod surface;
mod utils;

pub use bezier::{curve_intersect, curve_line_intersect, Bezier, BezierElement};
pub use color::{
    linear_to_srgb, srgb_to_linear, BlendMode, ChromaticAdaptation, Color, ColorError, ColorSpace,
    ComposeOp, LinColor, Paint, RenderingIntent, Srgb, Units, RGBA,
};
pub use context::{Context, GraphicsState, Resampling, Shadow};
pub use curve::{
    Cubic, Curve, CurveExtremities, CurveFlattenIter, CurveRoots, Line, Quad, Segment,
};
pub use ellipse::EllipArc;
pub use geometry::{
    almost_equal, almost_zero, scalar_fmt, Align, BBox, Point, Scalar, Transform, Vector3,
    EPSILON, EPSILON_SQRT, PI,
};
pub use grad::{GradLinear, GradRadial, GradSpread, GradStop, GradStops};
pub use poly::Polynomial;
pub use raster3d::{rasterize_triangle, CullMode, DepthCompare, Interpolate, Vertex};
pub use rasterize::{fill, Rasterizer, SignedDifferenceRasterizer};
pub use shape::{
    Component, ComponentSegments, Error, FillRule, GlyphSource, LineCap, LineJoin, PathCmd, Shape,
    ShapeFlattenIter, StrokeStyle, DEFAULT_FLATNESS,
};
pub use surface::{
    Layout, Surface, SurfaceIter, SurfaceMut, SurfaceMutIter, SurfaceMutRef, SurfaceOwned,
    SurfaceRef,
};
use poly::{cubic_solve, quadratic_solve};
use utils::{clamp, ArrayIter, M3x3, M4x4};
