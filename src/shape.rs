//! Path model: shapes made of components made of segments
use crate::{
    curve::line_offset,
    rasterize::{signed_difference_line, signed_difference_to_mask},
    Align, BBox, Cubic, Curve, EllipArc, Line, Point, Quad, Scalar, Segment, Surface, SurfaceMut,
    SurfaceOwned, Transform, EPSILON,
};
use std::{
    fmt,
    io::Write,
    str::FromStr,
    sync::{Arc, Mutex},
};

/// flatness of 0.05px gives good accuracy tradeoff
pub const DEFAULT_FLATNESS: Scalar = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineJoin {
    Miter(Scalar),
    Bevel,
    Round,
}

impl Default for LineJoin {
    fn default() -> Self {
        Self::Miter(4.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineCap {
    Butt,
    Square,
    Round,
}

impl Default for LineCap {
    fn default() -> Self {
        Self::Butt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrokeStyle {
    pub width: Scalar,
    pub line_join: LineJoin,
    pub line_cap: LineCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

/// Path command, the part of a component after its starting point.
///
/// Commands store control and end points only, the start of each segment is
/// the end of the previous one (or the component start).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathCmd {
    Line(Point),
    Quad(Point, Point),
    Cubic(Point, Point, Point),
}

impl PathCmd {
    /// End point of the command
    pub fn end(&self) -> Point {
        match self {
            PathCmd::Line(p) => *p,
            PathCmd::Quad(_, p) => *p,
            PathCmd::Cubic(_, _, p) => *p,
        }
    }

    /// Materialize the command into a segment starting at `start`
    pub fn segment(&self, start: Point) -> Segment {
        match self {
            PathCmd::Line(p1) => Line::new(start, *p1).into(),
            PathCmd::Quad(p1, p2) => Quad::new(start, *p1, *p2).into(),
            PathCmd::Cubic(p1, p2, p3) => Cubic::new(start, *p1, *p2, *p3).into(),
        }
    }
}

impl From<Segment> for PathCmd {
    fn from(segment: Segment) -> Self {
        match segment {
            Segment::Line(Line([_, p1])) => PathCmd::Line(p1),
            Segment::Quad(Quad([_, p1, p2])) => PathCmd::Quad(p1, p2),
            Segment::Cubic(Cubic([_, p1, p2, p3])) => PathCmd::Cubic(p1, p2, p3),
        }
    }
}

/// Single connected piece of a shape.
///
/// The effective point sequence is `[start, cmd0.end(), cmd1.end(), ...]`.
/// A closed component implies a line back to `start` for area, boundary and
/// fill purposes, the line is never materialized as a command.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    start: Point,
    cmds: Vec<PathCmd>,
    closed: bool,
}

impl Component {
    pub fn new(start: impl Into<Point>) -> Self {
        Self {
            start: start.into(),
            cmds: Vec::new(),
            closed: false,
        }
    }

    /// Build a component from materialized segments
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>, closed: bool) -> Option<Self> {
        let mut segments = segments.into_iter();
        let first = segments.next()?;
        let mut component = Component::new(first.start());
        component.cmds.push(first.into());
        component.cmds.extend(segments.map(PathCmd::from));
        component.closed = closed;
        Some(component)
    }

    pub fn start(&self) -> Point {
        self.start
    }

    /// End of the last command (start for an empty component)
    pub fn end(&self) -> Point {
        self.cmds.last().map_or(self.start, |cmd| cmd.end())
    }

    pub fn closed(&self) -> bool {
        self.closed
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn cmds(&self) -> &[PathCmd] {
        &self.cmds
    }

    /// Iterator over materialized segments of the component.
    ///
    /// The implicit closing line of a closed component is not included.
    pub fn segments(&self) -> ComponentSegments<'_> {
        ComponentSegments {
            position: self.start,
            cmds: self.cmds.iter(),
        }
    }

    /// Implicit line that closes the component
    fn close_line(&self) -> Line {
        Line::new(self.end(), self.start)
    }

    fn reverse(&self) -> Self {
        let segments: Vec<_> = self
            .segments()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map(|segment| segment.reverse())
            .collect();
        Component::from_segments(segments, self.closed)
            .unwrap_or_else(|| Component::new(self.start))
    }
}

pub struct ComponentSegments<'a> {
    position: Point,
    cmds: std::slice::Iter<'a, PathCmd>,
}

impl<'a> Iterator for ComponentSegments<'a> {
    type Item = Segment;

    fn next(&mut self) -> Option<Self::Item> {
        let cmd = self.cmds.next()?;
        let segment = cmd.segment(self.position);
        self.position = cmd.end();
        Some(segment)
    }
}

/// Memoized per-shape queries, shared between copies of the shape until one
/// of them mutates (copy-on-write).
#[derive(Default)]
struct ShapeCache {
    bbox: Option<Option<BBox>>,
    area: Option<Scalar>,
    index: Option<Vec<Vec<BBox>>>,
}

/// Collection of components treated as a single unit.
///
/// Carries one affine transform applied lazily to all components: queries
/// and rendering see transformed geometry, the stored control points stay
/// untouched. Boundary, area and the per-segment spatial index are memoized
/// behind a mutex and invalidated (cleared, not recomputed) by any mutation.
pub struct Shape {
    components: Vec<Component>,
    transform: Transform,
    cache: Arc<Mutex<ShapeCache>>,
}

impl Clone for Shape {
    fn clone(&self) -> Self {
        // the cache is shared with the copy until either side mutates
        Self {
            components: self.components.clone(),
            transform: self.transform,
            cache: self.cache.clone(),
        }
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components && self.transform == other.transform
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.iter().all(|c| c.is_empty()) {
            write!(f, "Empty")?;
        }
        for component in self.components.iter().filter(|c| !c.is_empty()) {
            for segment in component.segments() {
                writeln!(f, "{:?}", segment)?;
            }
            if component.closed {
                writeln!(f, "Close")?;
            } else {
                writeln!(f, "End")?;
            }
        }
        Ok(())
    }
}

impl Shape {
    pub fn new(components: Vec<Component>) -> Self {
        Self {
            components,
            transform: Transform::identity(),
            cache: Default::default(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Axis-aligned rectangle, counter-clockwise winding (positive area)
    pub fn rect(bbox: BBox) -> Self {
        let Point([x0, y0]) = bbox.min();
        let Point([x1, y1]) = bbox.max();
        let mut shape = Self::empty();
        shape
            .move_to((x0, y0))
            .line_to((x1, y0))
            .line_to((x1, y1))
            .line_to((x0, y1))
            .close();
        shape
    }

    /// Circle with the provided center and radius
    pub fn circle(center: impl Into<Point>, radius: Scalar) -> Self {
        let center = center.into();
        let offset = crate::curve::BEZIER_CIRCLE_RATIO * radius;
        let x_offset = Point::new(offset, 0.0);
        let y_offset = Point::new(0.0, offset);
        let p0 = center - Point::new(radius, 0.0);
        let p1 = center - Point::new(0.0, radius);
        let p2 = center + Point::new(radius, 0.0);
        let p3 = center + Point::new(0.0, radius);
        let mut shape = Self::empty();
        shape
            .move_to(p0)
            .cubic_to(p0 - y_offset, p1 - x_offset, p1)
            .cubic_to(p1 + x_offset, p2 - y_offset, p2)
            .cubic_to(p2 + y_offset, p3 + x_offset, p3)
            .cubic_to(p3 - x_offset, p0 + y_offset, p0)
            .close();
        shape
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Lazily applied shape transform
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Replace the shape transform.
    ///
    /// Memoized queries are invalidated, not recomputed: the next read pays
    /// for the computation.
    pub fn set_transform(&mut self, tr: Transform) -> &mut Self {
        self.invalidate();
        self.transform = tr;
        self
    }

    /// Clear memoized queries.
    ///
    /// A uniquely referenced cache block is cleared in place; a cache shared
    /// with other copies of the shape is replaced with a fresh one so the
    /// other owners keep their memoized values.
    fn invalidate(&mut self) {
        match Arc::get_mut(&mut self.cache) {
            Some(cache) => {
                let cache = cache.get_mut().expect("shape cache lock poisoned");
                *cache = ShapeCache::default();
            }
            None => {
                self.cache = Default::default();
            }
        }
    }

    /// Current pen position of the append API
    pub fn position(&self) -> Point {
        self.components
            .last()
            .map_or(Point::new(0.0, 0.0), |component| {
                if component.closed {
                    component.start()
                } else {
                    component.end()
                }
            })
    }

    /// Make sure there is an open component to append to, opening one at the
    /// current position if the shape is empty or the last component closed.
    fn open_component(&mut self) -> &mut Component {
        let needs_open = match self.components.last() {
            None => true,
            Some(component) => component.closed,
        };
        if needs_open {
            let position = self.position();
            self.components.push(Component::new(position));
        }
        self.components.last_mut().expect("component just opened")
    }

    /// Start a new (open) component at the point
    pub fn move_to(&mut self, p: impl Into<Point>) -> &mut Self {
        self.invalidate();
        // an untouched open component is repositioned instead of leaked
        match self.components.last_mut() {
            Some(component) if component.is_empty() && !component.closed => {
                component.start = p.into();
            }
            _ => self.components.push(Component::new(p)),
        }
        self
    }

    /// Append a line from the current position
    pub fn line_to(&mut self, p: impl Into<Point>) -> &mut Self {
        let p = p.into();
        self.invalidate();
        let component = self.open_component();
        if !component.end().is_close_to(p) {
            component.cmds.push(PathCmd::Line(p));
        }
        self
    }

    /// Append a quadratic bezier curve
    pub fn quad_to(&mut self, p1: impl Into<Point>, p2: impl Into<Point>) -> &mut Self {
        self.invalidate();
        let component = self.open_component();
        component.cmds.push(PathCmd::Quad(p1.into(), p2.into()));
        self
    }

    /// Append a smooth quadratic bezier curve
    pub fn quad_smooth_to(&mut self, p2: impl Into<Point>) -> &mut Self {
        let p1 = match self.components.last().and_then(|c| c.cmds.last()) {
            Some(PathCmd::Quad(control, end)) => 2.0 * *end - *control,
            _ => self.position(),
        };
        self.quad_to(p1, p2)
    }

    /// Append a cubic bezier curve
    pub fn cubic_to(
        &mut self,
        p1: impl Into<Point>,
        p2: impl Into<Point>,
        p3: impl Into<Point>,
    ) -> &mut Self {
        self.invalidate();
        let component = self.open_component();
        component
            .cmds
            .push(PathCmd::Cubic(p1.into(), p2.into(), p3.into()));
        self
    }

    /// Append a smooth cubic bezier curve
    pub fn cubic_smooth_to(&mut self, p2: impl Into<Point>, p3: impl Into<Point>) -> &mut Self {
        let p1 = match self.components.last().and_then(|c| c.cmds.last()) {
            Some(PathCmd::Cubic(_, control, end)) => 2.0 * *end - *control,
            _ => self.position(),
        };
        self.cubic_to(p1, p2, p3)
    }

    /// Append an elliptic arc segment.
    ///
    /// The SVG arc grammar: the ellipse center(s) satisfying the radii are
    /// solved for (scaling under-sized radii up uniformly), the center
    /// matching the `large`/`sweep` flags is selected, and the arc is
    /// emitted as one cubic per quarter-turn wedge.
    pub fn arc_to(
        &mut self,
        radii: impl Into<Point>,
        x_axis_rot: Scalar,
        large: bool,
        sweep: bool,
        p: impl Into<Point>,
    ) -> &mut Self {
        let radii: Point = radii.into();
        let p = p.into();
        let arc = EllipArc::new_param(
            self.position(),
            p,
            radii.x(),
            radii.y(),
            x_axis_rot,
            large,
            sweep,
        );
        match arc {
            None => self.line_to(p),
            Some(arc) => {
                self.invalidate();
                let component = self.open_component();
                for cubic in arc.to_cubics() {
                    component.cmds.push(Segment::from(cubic).into());
                }
                self
            }
        }
    }

    /// Close the current component.
    ///
    /// Closing is terminal for the component: any further drawing command
    /// opens a new one, starting at the closed component's start point.
    pub fn close(&mut self) -> &mut Self {
        self.invalidate();
        if let Some(component) = self.components.last_mut() {
            if !component.closed && !component.is_empty() {
                component.closed = true;
            }
        }
        self
    }

    pub fn segments_count(&self) -> usize {
        self.components
            .iter()
            .fold(0usize, |acc, component| acc + component.cmds.len())
    }

    /// Signed area of the shape, counter-clockwise winding is positive.
    ///
    /// Every component contributes its Green's theorem integral plus the
    /// implicit closing line. Memoized.
    pub fn area(&self) -> Scalar {
        let mut cache = self.cache.lock().expect("shape cache lock poisoned");
        if let Some(area) = cache.area {
            return area;
        }
        let mut area = 0.0;
        for component in self.components.iter().filter(|c| !c.is_empty()) {
            for segment in component.segments() {
                area += segment.transform(self.transform).area();
            }
            area += component
                .close_line()
                .transform(self.transform)
                .area();
        }
        cache.area = Some(area);
        area
    }

    /// Bounding box of the shape with its lazy transform applied. Memoized.
    pub fn bbox(&self) -> Option<BBox> {
        let mut cache = self.cache.lock().expect("shape cache lock poisoned");
        if let Some(bbox) = cache.bbox {
            return bbox;
        }
        let bbox = self.bbox_with(Transform::identity());
        cache.bbox = Some(bbox);
        bbox
    }

    /// Bounding box after an additional transform, not memoized
    pub fn bbox_with(&self, tr: Transform) -> Option<BBox> {
        let tr = tr * self.transform;
        let mut bbox: Option<BBox> = None;
        for component in self.components.iter().filter(|c| !c.is_empty()) {
            for segment in component.segments() {
                bbox = Some(segment.transform(tr).bbox(bbox));
            }
        }
        bbox
    }

    /// Per-component collections of per-segment bounding boxes (with the
    /// lazy transform applied), the spatial index used by point queries.
    /// Memoized.
    pub fn segment_index(&self) -> Vec<Vec<BBox>> {
        let mut cache = self.cache.lock().expect("shape cache lock poisoned");
        if let Some(index) = &cache.index {
            return index.clone();
        }
        let index: Vec<Vec<BBox>> = self
            .components
            .iter()
            .map(|component| {
                component
                    .segments()
                    .map(|segment| segment.transform(self.transform).bbox(None))
                    .collect()
            })
            .collect();
        cache.index = Some(index.clone());
        index
    }

    /// Determine if the point is inside of the shape under the fill rule.
    ///
    /// Winding is accumulated by casting a horizontal ray towards positive
    /// `x`; the spatial index culls segments that cannot cross it.
    pub fn contains(&self, point: impl Into<Point>, fill_rule: FillRule) -> bool {
        let point = point.into();
        let index = self.segment_index();
        let shift = Transform::new_translate(-point.x(), -point.y()) * self.transform;
        let mut winding = 0i32;
        for (component, boxes) in self.components.iter().zip(index.iter()) {
            if component.is_empty() {
                continue;
            }
            let mut crossings = |segment: Segment| {
                let segment = segment.transform(shift);
                for t in segment.roots() {
                    if segment.at(t).x() <= 0.0 {
                        continue;
                    }
                    let dy = segment.deriv().at(t).y();
                    winding += if dy > 0.0 { 1 } else { -1 };
                }
            };
            for (segment, bbox) in component.segments().zip(boxes.iter()) {
                // ray towards +x from `point` misses this segment
                if bbox.min().y() > point.y()
                    || bbox.max().y() < point.y()
                    || bbox.max().x() < point.x()
                {
                    continue;
                }
                crossings(segment);
            }
            crossings(component.close_line().into());
        }
        match fill_rule {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding % 2 != 0,
        }
    }

    /// Reverse order and direction of all components
    pub fn reverse(&self) -> Self {
        Self::new(self.components.iter().map(|c| c.reverse()).collect())
    }

    /// Convert the shape to an iterator over line segments
    pub fn flatten(
        &self,
        tr: Transform,
        flatness: Scalar,
        close: bool,
    ) -> ShapeFlattenIter<'_> {
        ShapeFlattenIter::new(self, tr * self.transform, flatness, close)
    }

    /// Stroke the shape.
    ///
    /// The stroked outline is constructed from the original by offsetting
    /// every component by `width / 2` on both sides and joining the two
    /// offset runs with the configured joins and caps.
    pub fn stroke(&self, style: StrokeStyle) -> Shape {
        let _span = tracing::debug_span!("[stroke]", width = style.width).entered();
        let mut result = Vec::new();
        for component in self.components.iter().filter(|c| !c.is_empty()) {
            let forward: Vec<Segment> = component
                .segments()
                .map(|s| s.transform(self.transform))
                .collect();
            let mut segments = Vec::new();
            for segment in forward.iter() {
                stroke_segment(&mut segments, *segment, style, Segment::line_join);
            }
            let mut backward = forward.iter().rev().map(Segment::reverse);
            if component.closed() {
                let segments = stroke_close(component, self.transform, &mut segments, style, true);
                result.extend(Component::from_segments(segments, true));
            } else if let Some(segment) = backward.next() {
                // cap between the forward and the backward runs
                stroke_segment(&mut segments, segment, style, Segment::line_cap);
            }
            for segment in backward {
                stroke_segment(&mut segments, segment, style, Segment::line_join);
            }
            if component.closed() {
                let segments = stroke_close(component, self.transform, &mut segments, style, false);
                result.extend(Component::from_segments(segments, true));
            } else {
                let last = segments.last().copied();
                let first = segments.first().copied();
                if let (Some(last), Some(first)) = (last, first) {
                    segments.extend(last.line_cap(first, style));
                }
                result.extend(Component::from_segments(segments, true));
            }
        }
        Shape::new(result)
    }

    /// Rasterize mask for the shape into a provided surface.
    ///
    /// Everything that is outside of the surface will be cropped. Surface is
    /// assumed to contain zeros.
    pub fn rasterize_to<S: SurfaceMut<Item = Scalar>>(
        &self,
        tr: Transform,
        fill_rule: FillRule,
        mut surf: S,
    ) -> S {
        for line in self.flatten(tr, DEFAULT_FLATNESS, true) {
            signed_difference_line(&mut surf, line);
        }
        signed_difference_to_mask(&mut surf, fill_rule, true);
        surf
    }

    /// Rasterize fitted mask for the shape into a provided surface.
    ///
    /// Shape is rescaled and centered appropriately to fit into a provided surface.
    pub fn rasterize_fit<S: SurfaceMut<Item = Scalar>>(
        &self,
        tr: Transform,
        fill_rule: FillRule,
        align: Align,
        surf: S,
    ) -> S {
        if surf.height() < 3 || surf.width() < 3 {
            return surf;
        }
        let src_bbox = match self.bbox_with(tr) {
            Some(bbox) if bbox.width() > 0.0 && bbox.height() > 0.0 => bbox,
            _ => return surf,
        };
        let dst_bbox = BBox::new(
            Point::new(1.0, 1.0),
            Point::new((surf.width() - 1) as Scalar, (surf.height() - 1) as Scalar),
        );
        let tr = Transform::fit(src_bbox, dst_bbox, align) * tr;
        self.rasterize_to(tr, fill_rule, surf)
    }

    /// Rasterize mask for the shape into an allocated surface.
    ///
    /// Surface of required size will be allocated.
    pub fn rasterize(&self, tr: Transform, fill_rule: FillRule) -> SurfaceOwned<Scalar> {
        let bbox = match self.bbox_with(tr) {
            Some(bbox) => bbox,
            None => return SurfaceOwned::new(0, 0),
        };
        // one pixel border to account for anti-aliasing
        let width = (bbox.width() + 2.0).ceil() as usize;
        let height = (bbox.height() + 2.0).ceil() as usize;
        let surf = SurfaceOwned::new(height, width);
        let shift = Transform::default().translate(1.0 - bbox.x(), 1.0 - bbox.y());
        self.rasterize_to(shift * tr, fill_rule, surf)
    }

    /// Save shape in SVG path format.
    pub fn save(&self, mut out: impl Write) -> std::io::Result<()> {
        for component in self.components.iter().filter(|c| !c.is_empty()) {
            write!(&mut out, "M{:?} ", component.start())?;
            let mut cmd_type: Option<u8> = None;
            for cmd in component.cmds() {
                match cmd {
                    PathCmd::Line(p1) => {
                        if cmd_type.replace(b'L') != Some(b'L') {
                            out.write_all(b"L")?;
                        }
                        write!(&mut out, "{:?} ", p1)?;
                    }
                    PathCmd::Quad(p1, p2) => {
                        if cmd_type.replace(b'Q') != Some(b'Q') {
                            out.write_all(b"Q")?;
                        }
                        write!(&mut out, "{:?} {:?} ", p1, p2)?;
                    }
                    PathCmd::Cubic(p1, p2, p3) => {
                        if cmd_type.replace(b'C') != Some(b'C') {
                            out.write_all(b"C")?;
                        }
                        write!(&mut out, "{:?} {:?} {:?} ", p1, p2, p3)?;
                    }
                }
            }
            if component.closed() {
                out.write_all(b"Z")?;
            }
        }
        Ok(())
    }

    /// Convert shape to SVG path data representation
    pub fn to_svg_path(&self) -> String {
        let mut output = Vec::new();
        self.save(&mut output).expect("failed in memory write");
        String::from_utf8(output).expect("shape save internal error")
    }
}

impl Extend<Component> for Shape {
    fn extend<T: IntoIterator<Item = Component>>(&mut self, iter: T) {
        self.invalidate();
        self.components.extend(iter)
    }
}

/// Source of glyph outlines, implemented by the font collaborator.
///
/// The engine treats this purely as a shape producer keyed by glyph id and
/// has no knowledge of font file formats.
pub trait GlyphSource {
    fn shape(&self, glyph: u32) -> Shape;
    fn advance_width(&self, glyph: u32) -> Scalar;
}

/// Extend segments with the offset segment and join between those segments.
fn stroke_segment<F, S>(segments: &mut Vec<Segment>, segment: Segment, style: StrokeStyle, join: F)
where
    F: Fn(Segment, Segment, StrokeStyle) -> S,
    S: IntoIterator<Item = Segment>,
{
    let offset = segments.len();
    segment.offset(style.width / 2.0, segments);
    if offset != 0 {
        let src = segments.get(offset - 1).copied();
        let dst = segments.get(offset).copied();
        if let (Some(src), Some(dst)) = (src, dst) {
            segments.splice(offset..offset, join(src, dst, style));
        }
    }
}

fn stroke_close(
    component: &Component,
    tr: Transform,
    segments: &mut Vec<Segment>,
    style: StrokeStyle,
    forward: bool,
) -> Vec<Segment> {
    let (first, last) = match (segments.first(), segments.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Vec::new(),
    };
    let close = if forward {
        Line::new(component.end(), component.start()).transform(tr)
    } else {
        Line::new(component.start(), component.end()).transform(tr)
    };
    match line_offset(close, style.width / 2.0) {
        Some(close) if close.length() * 100.0 > style.width => {
            let close = Segment::from(close);
            segments.extend(last.line_join(close, style));
            segments.push(close);
            segments.extend(close.line_join(first, style));
        }
        _ => segments.extend(last.line_join(first, style)),
    }
    std::mem::take(segments)
}

pub struct ShapeFlattenIter<'a> {
    components: &'a [Component],
    transform: Transform,
    flatness: Scalar,
    close: bool,
    component: usize,
    segments: Option<ComponentSegments<'a>>,
    stack: Vec<Segment>,
}

impl<'a> ShapeFlattenIter<'a> {
    fn new(shape: &'a Shape, transform: Transform, flatness: Scalar, close: bool) -> Self {
        Self {
            components: &shape.components,
            transform,
            flatness: 16.0 * flatness * flatness,
            close,
            component: 0,
            segments: None,
            stack: Default::default(),
        }
    }
}

impl<'a> Iterator for ShapeFlattenIter<'a> {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(segment) = self.stack.pop() {
                if segment.flatness() < self.flatness {
                    return Some(Line::new(segment.start(), segment.end()));
                }
                let (s0, s1) = segment.split();
                self.stack.push(s1);
                self.stack.push(s0);
                continue;
            }
            match self.segments.as_mut().and_then(Iterator::next) {
                Some(segment) => match segment.transform(self.transform) {
                    Segment::Line(line) => return Some(line),
                    segment => self.stack.push(segment),
                },
                None => {
                    // finished a component, emit its closing line if needed
                    let finished = self.segments.is_some();
                    if finished {
                        let component = &self.components[self.component - 1];
                        self.segments = None;
                        if !component.is_empty() && (component.closed || self.close) {
                            let line = component.close_line().transform(self.transform);
                            if line.length() > EPSILON {
                                return Some(line);
                            }
                        }
                        continue;
                    }
                    let component = self.components.get(self.component)?;
                    self.component += 1;
                    self.segments = Some(component.segments());
                }
            }
        }
    }
}

impl FromStr for Shape {
    type Err = Error;

    fn from_str(text: &str) -> Result<Shape, Self::Err> {
        let mut shape = Shape::empty();
        let parser = PathParser::new(text.as_ref());
        parser.parse(&mut shape)?;
        Ok(shape)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Error {
    ParseError { reason: String, offset: usize },
    ConversionError { reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<Error> for std::io::Error {
    fn from(error: Error) -> Self {
        Self::new(std::io::ErrorKind::InvalidData, error)
    }
}

impl std::error::Error for Error {}

/// Parser for the SVG path data mini-language
#[derive(Debug)]
pub struct PathParser<'a> {
    // text containing unparsed path
    text: &'a [u8],
    // current offset in the text
    offset: usize,
    // previous command
    prev_cmd: Option<u8>,
    // current position from which next curve will start
    position: Point,
}

impl<'a> PathParser<'a> {
    fn new(text: &'a [u8]) -> PathParser<'a> {
        Self {
            text,
            offset: 0,
            prev_cmd: None,
            position: Point::new(0.0, 0.0),
        }
    }

    /// Error construction helper
    fn error<S: Into<String>>(&self, reason: S) -> Error {
        Error::ParseError {
            offset: self.offset,
            reason: reason.into(),
        }
    }

    /// Byte at the current position
    fn current(&self) -> Result<u8, Error> {
        match self.text.get(self.offset) {
            Some(byte) => Ok(*byte),
            None => Err(self.error("unexpected end of input")),
        }
    }

    /// Advance current position by `count` bytes
    fn advance(&mut self, count: usize) {
        self.offset += count;
    }

    /// Check if end of file is reached
    fn is_eof(&self) -> bool {
        self.offset >= self.text.len()
    }

    /// Consume insignificant separators
    fn parse_separators(&mut self) {
        while !self.is_eof() {
            match self.text[self.offset] {
                b' ' | b'\t' | b'\r' | b'\n' | b',' => {
                    self.offset += 1;
                }
                _ => break,
            }
        }
    }

    /// Check if byte under the cursor is a digit and advance
    fn parse_digits(&mut self) -> Result<bool, Error> {
        let mut found = false;
        loop {
            match self.current() {
                Ok(b'0'..=b'9') => {
                    self.advance(1);
                    found = true;
                }
                _ => return Ok(found),
            }
        }
    }

    /// Consume `+|-` sign
    fn parse_sign(&mut self) -> Result<(), Error> {
        match self.current()? {
            b'-' | b'+' => {
                self.advance(1);
            }
            _ => (),
        }
        Ok(())
    }

    /// Parse single scalar
    fn parse_scalar(&mut self) -> Result<Scalar, Error> {
        self.parse_separators();
        let start = self.offset;
        self.parse_sign()?;
        let whole = self.parse_digits()?;
        if !self.is_eof() {
            let fraction = match self.current()? {
                b'.' => {
                    self.advance(1);
                    self.parse_digits()?
                }
                _ => false,
            };
            if !whole && !fraction {
                return Err(self.error("failed to parse scalar"));
            }
            match self.current() {
                Ok(b'e') | Ok(b'E') => {
                    self.advance(1);
                    self.parse_sign()?;
                    if !self.parse_digits()? {
                        return Err(self.error("failed to parse scalar"));
                    }
                }
                _ => (),
            }
        }
        // unwrap is safe here since we have validated content
        let scalar_str = std::str::from_utf8(&self.text[start..self.offset]).unwrap();
        let scalar = Scalar::from_str(scalar_str).unwrap();
        Ok(scalar)
    }

    /// Parse pair of scalars and convert it to a point
    fn parse_point(&mut self) -> Result<Point, Error> {
        let x = self.parse_scalar()?;
        let y = self.parse_scalar()?;
        let is_relative = match self.prev_cmd {
            Some(cmd) => cmd.is_ascii_lowercase(),
            None => false,
        };
        if is_relative {
            Ok(Point([x, y]) + self.position)
        } else {
            Ok(Point([x, y]))
        }
    }

    /// Parse SVG flag `0|1` used by elliptic arc command
    fn parse_flag(&mut self) -> Result<bool, Error> {
        self.parse_separators();
        match self.current()? {
            b'0' => {
                self.advance(1);
                Ok(false)
            }
            b'1' => {
                self.advance(1);
                Ok(true)
            }
            _ => Err(self.error("failed to parse flag")),
        }
    }

    /// Parse SVG command
    fn parse_cmd(&mut self) -> Result<u8, Error> {
        let cmd = self.current()?;
        match cmd {
            b'M' | b'm' | b'L' | b'l' | b'V' | b'v' | b'H' | b'h' | b'C' | b'c' | b'S' | b's'
            | b'Q' | b'q' | b'T' | b't' | b'A' | b'a' | b'Z' | b'z' => {
                self.advance(1);
                self.prev_cmd = if cmd == b'm' {
                    Some(b'l')
                } else if cmd == b'M' {
                    Some(b'L')
                } else if cmd == b'Z' || cmd == b'z' {
                    None
                } else {
                    Some(cmd)
                };
                Ok(cmd)
            }
            _ => match self.prev_cmd {
                Some(cmd) => Ok(cmd),
                None => Err(self.error("failed to parse path cmd")),
            },
        }
    }

    /// Parse SVG path and apply changes to the shape.
    fn parse(mut self, shape: &mut Shape) -> Result<(), Error> {
        loop {
            self.parse_separators();
            if self.is_eof() {
                break;
            }
            self.position = shape.position();
            let cmd = self.parse_cmd()?;
            match cmd {
                b'M' | b'm' => {
                    shape.move_to(self.parse_point()?);
                }
                b'L' | b'l' => {
                    shape.line_to(self.parse_point()?);
                }
                b'V' | b'v' => {
                    let y = self.parse_scalar()?;
                    let p0 = shape.position();
                    let p1 = if cmd == b'v' {
                        Point::new(p0.x(), p0.y() + y)
                    } else {
                        Point::new(p0.x(), y)
                    };
                    shape.line_to(p1);
                }
                b'H' | b'h' => {
                    let x = self.parse_scalar()?;
                    let p0 = shape.position();
                    let p1 = if cmd == b'h' {
                        Point::new(p0.x() + x, p0.y())
                    } else {
                        Point::new(x, p0.y())
                    };
                    shape.line_to(p1);
                }
                b'Q' | b'q' => {
                    let p1 = self.parse_point()?;
                    let p2 = self.parse_point()?;
                    shape.quad_to(p1, p2);
                }
                b'T' | b't' => {
                    shape.quad_smooth_to(self.parse_point()?);
                }
                b'C' | b'c' => {
                    let p1 = self.parse_point()?;
                    let p2 = self.parse_point()?;
                    let p3 = self.parse_point()?;
                    shape.cubic_to(p1, p2, p3);
                }
                b'S' | b's' => {
                    let p2 = self.parse_point()?;
                    let p3 = self.parse_point()?;
                    shape.cubic_smooth_to(p2, p3);
                }
                b'A' | b'a' => {
                    let rx = self.parse_scalar()?;
                    let ry = self.parse_scalar()?;
                    let x_axis_rot = self.parse_scalar()?;
                    let large_flag = self.parse_flag()?;
                    let sweep_flag = self.parse_flag()?;
                    let dst = self.parse_point()?;
                    shape.arc_to((rx, ry), x_axis_rot, large_flag, sweep_flag, dst);
                }
                b'Z' | b'z' => {
                    shape.close();
                }
                _ => unreachable!(),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_approx_eq, Surface, PI};

    const SQUIRREL: &str = r#"
    M12 1C9.79 1 8 2.31 8 3.92c0 1.94.5 3.03 0 6.08 0-4.5-2.77-6.34-4-6.34.05-.5-.48
    -.66-.48-.66s-.22.11-.3.34c-.27-.31-.56-.27-.56-.27l-.13.58S.7 4.29 .68 6.87c.2.33
    1.53.6 2.47.43.89.05.67.79.47.99C2.78 9.13 2 8 1 8S0 9 1 9s1 1 3 1c-3.09 1.2 0 4 0 4
    H3c-1 0-1 1-1 1h6c3 0 5-1 5-3.47 0-.85-.43-1.79 -1-2.53-1.11-1.46.23-2.68 1-2
    .77.68 3 1 3-2 0-2.21-1.79-4-4-4zM2.5 6 c-.28 0-.5-.22-.5-.5s.22-.5.5-.5.5.22.5.5
    -.22.5-.5.5z
    "#;

    #[test]
    fn test_bbox() {
        let shape: Shape = SQUIRREL.parse().unwrap();
        let bbox = shape.bbox().unwrap();
        assert_approx_eq!(bbox.x(), 0.25);
        assert_approx_eq!(bbox.y(), 1.0);
        assert_approx_eq!(bbox.width(), 15.75);
        assert_approx_eq!(bbox.height(), 14.0);
    }

    #[test]
    fn test_parse() -> Result<(), Error> {
        let shape: Shape = " M0,0L1-1L1,0ZL0,1 L1,1Z ".parse()?;
        let mut reference = Shape::empty();
        reference
            .move_to((0.0, 0.0))
            .line_to((1.0, -1.0))
            .line_to((1.0, 0.0))
            .close()
            .line_to((0.0, 1.0))
            .line_to((1.0, 1.0))
            .close();
        assert_eq!(format!("{:?}", shape), format!("{:?}", reference));
        // drawing after close opened a fresh component at the close point
        assert_eq!(shape.components().len(), 2);
        Ok(())
    }

    #[test]
    fn test_save_load() -> std::io::Result<()> {
        let shape: Shape = SQUIRREL.parse()?;
        let save = shape.to_svg_path();
        let load: Shape = save.parse()?;
        assert_eq!(format!("{:?}", shape), format!("{:?}", load));
        Ok(())
    }

    #[test]
    fn test_builder_state_machine() {
        let mut shape = Shape::empty();
        // drawing into an empty shape auto-opens a component at the origin
        shape.line_to((2.0, 0.0));
        assert_eq!(shape.components().len(), 1);
        assert!(shape.components()[0].start().is_close_to(Point::new(0.0, 0.0)));

        // close is terminal, the next command opens a new component
        shape.close();
        shape.line_to((5.0, 5.0));
        assert_eq!(shape.components().len(), 2);
        assert!(!shape.components()[1].closed());
    }

    #[test]
    fn test_area() {
        let shape = Shape::rect(BBox::new((0.0, 0.0), (10.0, 10.0)));
        assert_approx_eq!(shape.area(), 100.0);

        // reversing the point order negates the sign
        assert_approx_eq!(shape.reverse().area(), -100.0);

        // transform scales the area by its determinant
        let mut scaled = shape.clone();
        scaled.set_transform(Transform::new_scale(2.0, 3.0));
        assert_approx_eq!(scaled.area(), 600.0);

        // open component is implicitly closed for area purposes
        let mut triangle = Shape::empty();
        triangle.move_to((0.0, 0.0)).line_to((4.0, 0.0)).line_to((4.0, 3.0));
        assert_approx_eq!(triangle.area(), 6.0);

        let circle = Shape::circle((0.0, 0.0), 1.0);
        assert_approx_eq!(circle.area(), PI, 1e-2);
    }

    #[test]
    fn test_cache_invalidation() {
        let mut shape = Shape::rect(BBox::new((0.0, 0.0), (10.0, 10.0)));
        assert_approx_eq!(shape.area(), 100.0);

        // copy shares the memoized cache until one side mutates
        let copy = shape.clone();
        shape.set_transform(Transform::new_scale(2.0, 2.0));
        assert_approx_eq!(shape.area(), 400.0);
        assert_approx_eq!(copy.area(), 100.0);

        // mutation through the append api invalidates as well
        let mut extended = copy.clone();
        extended.move_to((20.0, 0.0)).line_to((30.0, 0.0)).line_to((30.0, 10.0)).close();
        assert_approx_eq!(extended.area(), 150.0);
        assert_approx_eq!(copy.area(), 100.0);
    }

    #[test]
    fn test_contains() {
        let shape: Shape = r#"
            M50,0 21,90 98,35 2,35 79,90z
        "#
        .parse()
        .unwrap();
        // center of the star: nonzero winding fills it, even-odd leaves the hole
        assert!(shape.contains((50.0, 50.0), FillRule::NonZero));
        assert!(!shape.contains((50.0, 50.0), FillRule::EvenOdd));
        // points of the star are filled under both rules
        assert!(shape.contains((50.0, 10.0), FillRule::NonZero));
        assert!(shape.contains((50.0, 10.0), FillRule::EvenOdd));
        // outside
        assert!(!shape.contains((120.0, 50.0), FillRule::NonZero));
    }

    #[test]
    fn test_flatten() {
        let mut shape = Shape::empty();
        shape
            .move_to((0.0, 0.0))
            .quad_to((5.0, 10.0), (10.0, 0.0))
            .close();
        let tr = Transform::default()
            .rotate(PI / 3.0)
            .translate(-10.0, -20.0);
        let lines: Vec<_> = shape.flatten(tr, DEFAULT_FLATNESS, true).collect();
        assert!(lines.len() > 2);
        // flattened closed component forms a connected loop
        for ls in lines.windows(2) {
            assert!(ls[0].end().is_close_to(ls[1].start()));
        }
        assert!(lines[lines.len() - 1]
            .end()
            .is_close_to(lines[0].start()));
    }

    #[test]
    fn test_fill_rule_rasterize() -> Result<(), Error> {
        let tr = Transform::default();
        let shape: Shape = r#"
            M50,0 21,90 98,35 2,35 79,90z
            M110,0 h90 v90 h-90z
            M130,20 h50 v50 h-50 z
            M210,0  h90 v90 h-90 z
            M230,20 v50 h50 v-50 z
        "#
        .parse()?;
        let y = 50;
        let x0 = 50; // middle of the star
        let x1 = 150; // middle of the first box
        let x2 = 250; // middle of the second box

        let surf = shape.rasterize(tr, FillRule::EvenOdd);
        assert_approx_eq!(surf.get(y, x0).unwrap(), 0.0);
        assert_approx_eq!(surf.get(y, x1).unwrap(), 0.0);
        assert_approx_eq!(surf.get(y, x2).unwrap(), 0.0);

        let surf = shape.rasterize(tr, FillRule::NonZero);
        assert_approx_eq!(surf.get(y, x0).unwrap(), 1.0);
        assert_approx_eq!(surf.get(y, x1).unwrap(), 1.0);
        assert_approx_eq!(surf.get(y, x2).unwrap(), 0.0);

        Ok(())
    }

    #[test]
    fn test_stroke() {
        let mut shape = Shape::empty();
        shape.move_to((0.0, 0.0)).line_to((10.0, 0.0));
        let stroke = shape.stroke(StrokeStyle {
            width: 2.0,
            line_join: LineJoin::Bevel,
            line_cap: LineCap::Butt,
        });
        let bbox = stroke.bbox().unwrap();
        assert_approx_eq!(bbox.y(), -1.0, 1e-6);
        assert_approx_eq!(bbox.height(), 2.0, 1e-6);
        assert_approx_eq!(bbox.width(), 10.0, 1e-6);
        // stroked outline of a line is a closed rectangle of area ~ 20
        assert_approx_eq!(stroke.area().abs(), 20.0, 1e-3);
    }
}
