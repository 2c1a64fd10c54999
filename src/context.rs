//! Render/compositing context
//!
//! Owns the target pixel buffer together with a same-size clip buffer and an
//! optional depth buffer, exposes scoped graphics state save/restore and
//! nested transparency layers. All drawing targets the innermost open layer
//! when layers are active.
use crate::{
    raster3d::{rasterize_triangle, CullMode, DepthCompare, Vertex},
    rasterize::{Rasterizer, SignedDifferenceRasterizer},
    BlendMode, ChromaticAdaptation, Color, ComposeOp, FillRule, Interpolate, LinColor, Paint,
    Point, RenderingIntent, Scalar, Shape, Surface, SurfaceMut, SurfaceOwned, Transform, Units,
    RGBA,
};

/// Drop shadow styling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub offset: Point,
    pub blur: Scalar,
    pub color: LinColor,
}

/// Resampling algorithm used when sampling image paints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Resampling {
    None,
    Linear,
    Cosine,
    Cubic,
    Mitchell,
    Lanczos,
}

impl Default for Resampling {
    fn default() -> Self {
        Self::Linear
    }
}

/// Full graphics state carried by a context (and snapshotted by
/// save/restore)
#[derive(Debug, Clone, Copy)]
pub struct GraphicsState {
    pub transform: Transform,
    pub opacity: Scalar,
    pub antialias: bool,
    pub blend_mode: BlendMode,
    pub compose_op: ComposeOp,
    pub shadow: Option<Shadow>,
    pub resampling: Resampling,
    pub cull_mode: CullMode,
    pub depth_compare: DepthCompare,
    pub rendering_intent: RenderingIntent,
    pub chromatic_adaptation: ChromaticAdaptation,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            opacity: 1.0,
            antialias: true,
            blend_mode: BlendMode::default(),
            compose_op: ComposeOp::default(),
            shadow: None,
            resampling: Resampling::default(),
            cull_mode: CullMode::default(),
            depth_compare: DepthCompare::Always,
            rendering_intent: RenderingIntent::default(),
            chromatic_adaptation: ChromaticAdaptation::default(),
        }
    }
}

/// Snapshot taken by `save_graphic_state`
struct Saved {
    state: GraphicsState,
    clip: SurfaceOwned<Scalar>,
    depth: Option<SurfaceOwned<Scalar>>,
}

/// One drawing frame: the base context or an open transparency layer
struct Frame {
    image: SurfaceOwned<LinColor>,
    clip: SurfaceOwned<Scalar>,
    depth: Option<SurfaceOwned<Scalar>>,
    state: GraphicsState,
    stack: Vec<Saved>,
    /// whether anything was drawn into this frame
    drawn: bool,
    /// parent state captured when the layer was opened, used to composite
    begin_state: GraphicsState,
}

impl Frame {
    fn new(width: usize, height: usize, state: GraphicsState, begin_state: GraphicsState) -> Self {
        Self {
            image: SurfaceOwned::new(height, width),
            clip: SurfaceOwned::new_with(height, width, |_, _| 1.0),
            depth: None,
            state,
            stack: Vec::new(),
            drawn: false,
            begin_state,
        }
    }
}

/// Render target: pixel buffer, clip mask, optional depth buffer, a stack of
/// graphics states and a stack of transparency layers.
pub struct Context {
    width: usize,
    height: usize,
    /// base frame plus the chain of open transparency layers, the last
    /// entry is the innermost and receives all drawing
    frames: Vec<Frame>,
    rasterizer: SignedDifferenceRasterizer,
}

impl Context {
    pub fn new(width: usize, height: usize) -> Self {
        let state = GraphicsState::default();
        Self {
            width,
            height,
            frames: vec![Frame::new(width, height, state, state)],
            rasterizer: SignedDifferenceRasterizer,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn frame(&self) -> &Frame {
        self.frames.last().expect("context always has a base frame")
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames
            .last_mut()
            .expect("context always has a base frame")
    }

    /// State of the innermost active layer (or the base context)
    pub fn state(&self) -> &GraphicsState {
        &self.frame().state
    }

    pub fn state_mut(&mut self) -> &mut GraphicsState {
        &mut self.frame_mut().state
    }

    pub fn transform(&self) -> Transform {
        self.state().transform
    }

    pub fn set_transform(&mut self, tr: Transform) {
        self.state_mut().transform = tr;
    }

    /// Compose a transform before the current one
    pub fn concat_transform(&mut self, tr: Transform) {
        let state = self.state_mut();
        state.transform = state.transform * tr;
    }

    pub fn set_opacity(&mut self, opacity: Scalar) {
        self.state_mut().opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn set_shadow(&mut self, shadow: Option<Shadow>) {
        self.state_mut().shadow = shadow;
    }

    /// Push a snapshot of the current style, clip and depth buffers.
    ///
    /// The stack belongs to the innermost active transparency layer, not the
    /// top-level context.
    pub fn save_graphic_state(&mut self) {
        let frame = self.frame_mut();
        let saved = Saved {
            state: frame.state,
            clip: frame.clip.clone(),
            depth: frame.depth.clone(),
        };
        frame.stack.push(saved);
    }

    /// Pop the last saved snapshot, overwriting (not merging) the current
    /// style, clip and depth buffers. Does nothing without a matching save.
    pub fn restore_graphic_state(&mut self) {
        let frame = self.frame_mut();
        if let Some(saved) = frame.stack.pop() {
            frame.state = saved.state;
            frame.clip = saved.clip;
            frame.depth = saved.depth;
        }
    }

    /// Open a nested transparency layer.
    ///
    /// Subsequent drawing accumulates into a scratch buffer which is
    /// composited into the parent by `end_transparency_layer`. The layer
    /// starts from the parent style with opacity reset to 1 and the shadow
    /// cleared (they apply when the layer is composited, not per draw).
    pub fn begin_transparency_layer(&mut self) {
        let begin_state = self.frame().state;
        let mut state = begin_state;
        state.opacity = 1.0;
        state.shadow = None;
        let mut frame = Frame::new(self.width, self.height, state, begin_state);
        // drawing inside the layer still honors the active clip
        frame.clip = self.frame().clip.clone();
        self.frames.push(frame);
    }

    /// Close the innermost transparency layer and composite it into its
    /// parent. A layer that was never drawn into is silently discarded.
    pub fn end_transparency_layer(&mut self) {
        if self.frames.len() < 2 {
            return;
        }
        let layer = self.frames.pop().expect("layer present");
        if !layer.drawn {
            return;
        }
        let _span = tracing::debug_span!("[layer]").entered();
        let begin = layer.begin_state;

        // drop-shadow pass: offset, blurred, tinted duplicate of the layer
        // alpha drawn first
        if let Some(shadow) = begin.shadow {
            self.composite_shadow(&layer.image, shadow, begin.opacity);
        }

        let opacity = begin.opacity as f32;
        let parent = self.frame_mut();
        parent.drawn = true;
        for row in 0..parent.image.height() {
            for col in 0..parent.image.width() {
                let src = match layer.image.get(row, col) {
                    Some(src) => *src * opacity,
                    None => continue,
                };
                if src.alpha() <= f32::EPSILON {
                    continue;
                }
                if let Some(dst) = parent.image.get_mut(row, col) {
                    *dst = match begin.blend_mode {
                        BlendMode::Normal => dst.compose(src, begin.compose_op),
                        mode => dst.blend(src, mode),
                    };
                }
            }
        }
    }

    fn composite_shadow(&mut self, layer: &SurfaceOwned<LinColor>, shadow: Shadow, opacity: Scalar) {
        let _span = tracing::debug_span!("[shadow]", blur = shadow.blur).entered();
        let mask = SurfaceOwned::new_with(self.height, self.width, |row, col| {
            layer
                .get(row, col)
                .map_or(0.0, |pixel| pixel.alpha() as Scalar)
        });
        let mask = gaussian_blur(mask, shadow.blur);
        let offset = shadow.offset;
        let parent = self.frame_mut();
        parent.drawn = true;
        for row in 0..parent.image.height() {
            for col in 0..parent.image.width() {
                // sample the blurred alpha at the un-offset position
                let src_row = row as Scalar - offset.y();
                let src_col = col as Scalar - offset.x();
                if src_row < 0.0 || src_col < 0.0 {
                    continue;
                }
                let alpha = match mask.get(src_row as usize, src_col as usize) {
                    Some(alpha) => *alpha * opacity,
                    None => continue,
                };
                if alpha <= 0.0 {
                    continue;
                }
                let color = shadow.color * (alpha as f32);
                if let Some(dst) = parent.image.get_mut(row, col) {
                    *dst = dst.blend_over(color);
                }
            }
        }
    }

    /// Replace the clip buffer with the result of the drawing callback.
    ///
    /// The callback renders into a scratch gray context, the clip becomes
    /// `luminance * opacity` per pixel. The previous clip is replaced
    /// wholesale, composing multiple clips relies on the save/restore stack.
    pub fn draw_clip(&mut self, draw: impl FnOnce(&mut Context)) {
        let mut scratch = Context::new(self.width, self.height);
        scratch.set_transform(self.transform());
        draw(&mut scratch);
        let gray = scratch.into_image();
        let opacity = self.state().opacity;
        let frame = self.frame_mut();
        frame.clip = SurfaceOwned::new_with(gray.height(), gray.width(), |row, col| {
            let LinColor([r, g, b, _]) = gray.get(row, col).copied().unwrap_or_default();
            let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
            luma as Scalar * opacity
        });
    }

    /// Reset the clip buffer to fully visible
    pub fn reset_clip(&mut self) {
        let frame = self.frame_mut();
        frame.clip.fill(1.0);
    }

    /// Clear the depth buffer to the far plane (1.0), allocating it if the
    /// context had none.
    pub fn clear_depth(&mut self) {
        let (width, height) = (self.width, self.height);
        let frame = self.frame_mut();
        frame.depth = Some(SurfaceOwned::new_with(height, width, |_, _| 1.0));
    }

    /// Fill the whole target with the color (honors the clip, ignores the
    /// transform)
    pub fn clear(&mut self, color: LinColor) {
        let frame = self.frame_mut();
        frame.drawn = true;
        for row in 0..frame.image.height() {
            for col in 0..frame.image.width() {
                let coverage = frame.clip.get(row, col).copied().unwrap_or(1.0);
                if let Some(dst) = frame.image.get_mut(row, col) {
                    *dst = dst.blend_over(color * coverage as f32);
                }
            }
        }
    }

    /// Fill a shape with the paint under the current graphics state.
    pub fn draw_shape(&mut self, shape: &Shape, fill_rule: FillRule, paint: impl Paint) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let _span = tracing::debug_span!("[fill]").entered();
        let state = *self.state();
        let tr = state.transform;

        let mut mask = SurfaceOwned::<Scalar>::new(self.height, self.width);
        self.rasterizer
            .mask_to(shape, tr, fill_rule, state.antialias, mask.as_mut());

        if let Some(shadow) = state.shadow {
            let blurred = gaussian_blur(mask.clone(), shadow.blur);
            let shadow_src = SurfaceOwned::new_with(self.height, self.width, |row, col| {
                let alpha = blurred.get(row, col).copied().unwrap_or(0.0);
                shadow.color * (alpha as f32)
            });
            self.composite_offset(&shadow_src, shadow.offset, state);
        }

        // map pixel centers into paint coordinates
        let units_tr = match paint.units() {
            Some(Units::BoundingBox) => match shape.bbox() {
                Some(bbox) => tr * bbox.unit_transform(),
                None => return,
            },
            _ => tr,
        };
        let paint_tr = match (units_tr * paint.transform()).invert() {
            Some(paint_tr) => paint_tr,
            None => return,
        };

        let opacity = state.opacity as f32;
        let frame = self.frame_mut();
        frame.drawn = true;
        for row in 0..frame.image.height() {
            for col in 0..frame.image.width() {
                let coverage = match mask.get(row, col) {
                    Some(coverage) if *coverage > 1e-6 => *coverage,
                    _ => continue,
                };
                let clip = frame.clip.get(row, col).copied().unwrap_or(1.0);
                if clip <= 0.0 {
                    continue;
                }
                let point = paint_tr.apply(Point::new(col as Scalar + 0.5, row as Scalar + 0.5));
                let src = paint.at(point) * ((coverage * clip) as f32) * opacity;
                if let Some(dst) = frame.image.get_mut(row, col) {
                    *dst = match state.blend_mode {
                        BlendMode::Normal => dst.compose(src, state.compose_op),
                        mode => dst.blend(src, mode),
                    };
                }
            }
        }
    }

    /// Composite a prepared full-size source with an offset, used by the
    /// shadow pass
    fn composite_offset(
        &mut self,
        src: &SurfaceOwned<LinColor>,
        offset: Point,
        state: GraphicsState,
    ) {
        let opacity = state.opacity as f32;
        let frame = self.frame_mut();
        frame.drawn = true;
        for row in 0..frame.image.height() {
            for col in 0..frame.image.width() {
                let src_row = row as Scalar - offset.y();
                let src_col = col as Scalar - offset.x();
                if src_row < 0.0 || src_col < 0.0 {
                    continue;
                }
                let color = match src.get(src_row as usize, src_col as usize) {
                    Some(color) => *color * opacity,
                    None => continue,
                };
                if color.alpha() <= f32::EPSILON {
                    continue;
                }
                let clip = frame.clip.get(row, col).copied().unwrap_or(1.0);
                if clip <= 0.0 {
                    continue;
                }
                if let Some(dst) = frame.image.get_mut(row, col) {
                    *dst = dst.blend_over(color * clip as f32);
                }
            }
        }
    }

    /// Stroke a shape outline with the paint
    pub fn draw_stroke(&mut self, shape: &Shape, style: crate::StrokeStyle, paint: impl Paint) {
        let stroked = shape.stroke(style);
        self.draw_shape(&stroked, FillRule::NonZero, paint);
    }

    /// Rasterize a list of triangles through the depth-tested pipeline.
    ///
    /// Vertices come in groups of three, already projected. The active cull
    /// mode and depth compare function are taken from the graphics state;
    /// the depth buffer is allocated (cleared to far) on first use.
    pub fn draw_triangles<V, S>(&mut self, vertices: &[Vertex<V>], shader: &mut S)
    where
        V: Interpolate,
        S: FnMut(V) -> Option<LinColor>,
    {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let state = *self.state();
        if self.frame().depth.is_none() {
            self.clear_depth();
        }
        let opacity = state.opacity as f32;
        let frame = self.frame_mut();
        frame.drawn = true;
        let clip = frame.clip.clone();
        let depth = frame.depth.as_mut().expect("depth buffer just allocated");
        for triangle in vertices.chunks_exact(3) {
            let triangle: [Vertex<V>; 3] = [triangle[0], triangle[1], triangle[2]];
            let mut shade = |attr: V| shader(attr).map(|color| color * opacity);
            rasterize_triangle(
                &mut frame.image,
                Some(&mut *depth),
                state.depth_compare,
                state.cull_mode,
                Some(&clip),
                triangle,
                &mut shade,
            );
        }
    }

    /// Finished image of the base frame
    pub fn image(&self) -> &SurfaceOwned<LinColor> {
        &self.frames[0].image
    }

    /// Consume the context returning the base image
    pub fn into_image(mut self) -> SurfaceOwned<LinColor> {
        self.frames.swap_remove(0).image
    }

    /// Convert the base image to gamma-encoded 8-bit RGBA
    pub fn to_rgba(&self) -> SurfaceOwned<RGBA> {
        let image = self.image();
        SurfaceOwned::new_with(self.height, self.width, |row, col| {
            image.get(row, col).copied().unwrap_or_default().into()
        })
    }

    /// Write the context content as a PNG image
    #[cfg(feature = "png")]
    pub fn write_png(&self, out: impl std::io::Write) -> Result<(), png::EncodingError> {
        let rgba = self.to_rgba();
        let mut encoder = png::Encoder::new(out, self.width as u32, self.height as u32);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgba.as_bytes())?;
        Ok(())
    }
}

/// Approximate gaussian blur with three box blur passes.
///
/// Box sizes follow the standard variance matching construction, which
/// keeps the result within a fraction of a percent of a true gaussian.
fn gaussian_blur(mask: SurfaceOwned<Scalar>, sigma: Scalar) -> SurfaceOwned<Scalar> {
    if sigma <= 0.0 {
        return mask;
    }
    // ideal box width for three passes
    let w_ideal = (12.0 * sigma * sigma / 3.0 + 1.0).sqrt();
    let mut wl = w_ideal.floor() as i64;
    if wl % 2 == 0 {
        wl -= 1;
    }
    let wu = wl + 2;
    let m_ideal = (12.0 * sigma * sigma - (3 * wl * wl + 12 * wl + 9) as Scalar)
        / (-4 * wl - 4) as Scalar;
    let m = m_ideal.round() as i64;

    let mut mask = mask;
    for pass in 0..3i64 {
        let radius = if pass < m { (wl - 1) / 2 } else { (wu - 1) / 2 };
        if radius > 0 {
            mask = box_blur(&mask, radius as usize);
        }
    }
    mask
}

/// Single box blur pass (horizontal then vertical running sums)
fn box_blur(src: &SurfaceOwned<Scalar>, radius: usize) -> SurfaceOwned<Scalar> {
    let height = src.height();
    let width = src.width();
    let norm = 1.0 / (2 * radius + 1) as Scalar;
    let clamp_get = |surf: &SurfaceOwned<Scalar>, row: i64, col: i64| -> Scalar {
        let row = row.clamp(0, height.max(1) as i64 - 1) as usize;
        let col = col.clamp(0, width.max(1) as i64 - 1) as usize;
        surf.get(row, col).copied().unwrap_or(0.0)
    };
    let horizontal = SurfaceOwned::new_with(height, width, |row, col| {
        let mut acc = 0.0;
        for d in -(radius as i64)..=(radius as i64) {
            acc += clamp_get(src, row as i64, col as i64 + d);
        }
        acc * norm
    });
    SurfaceOwned::new_with(height, width, |row, col| {
        let mut acc = 0.0;
        for d in -(radius as i64)..=(radius as i64) {
            acc += clamp_get(&horizontal, row as i64 + d, col as i64);
        }
        acc * norm
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_approx_eq, BBox};

    fn red_half() -> LinColor {
        LinColor::new(0.5, 0.0, 0.0, 0.5)
    }

    #[test]
    fn test_save_restore() {
        let mut ctx = Context::new(16, 16);
        ctx.set_opacity(0.5);
        ctx.save_graphic_state();
        ctx.set_opacity(0.25);
        ctx.set_transform(Transform::new_scale(2.0, 2.0));
        ctx.restore_graphic_state();
        assert_approx_eq!(ctx.state().opacity, 0.5);
        assert_eq!(ctx.transform(), Transform::identity());
        // restore without a save is a no-op
        ctx.restore_graphic_state();
        assert_approx_eq!(ctx.state().opacity, 0.5);
    }

    #[test]
    fn test_draw_shape() {
        let mut ctx = Context::new(16, 16);
        let shape = Shape::rect(BBox::new((4.0, 4.0), (12.0, 12.0)));
        ctx.draw_shape(&shape, FillRule::NonZero, LinColor::new(0.0, 0.0, 1.0, 1.0));
        let image = ctx.image();
        assert_eq!(*image.get(8, 8).unwrap(), LinColor::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(*image.get(1, 1).unwrap(), LinColor::default());
    }

    #[test]
    fn test_clip_replaces() {
        let mut ctx = Context::new(16, 16);
        // clip to the left half
        ctx.draw_clip(|clip| {
            let half = Shape::rect(BBox::new((0.0, 0.0), (8.0, 16.0)));
            clip.draw_shape(&half, FillRule::NonZero, LinColor::new(1.0, 1.0, 1.0, 1.0));
        });
        let shape = Shape::rect(BBox::new((0.0, 0.0), (16.0, 16.0)));
        ctx.draw_shape(&shape, FillRule::NonZero, LinColor::new(0.0, 1.0, 0.0, 1.0));
        assert!(ctx.image().get(8, 4).unwrap().alpha() > 0.9);
        assert!(ctx.image().get(8, 12).unwrap().alpha() < 0.1);

        // a second clip replaces the first wholesale (no intersection)
        ctx.draw_clip(|clip| {
            let right = Shape::rect(BBox::new((8.0, 0.0), (16.0, 16.0)));
            clip.draw_shape(&right, FillRule::NonZero, LinColor::new(1.0, 1.0, 1.0, 1.0));
        });
        ctx.draw_shape(&shape, FillRule::NonZero, LinColor::new(0.0, 1.0, 0.0, 1.0));
        assert!(ctx.image().get(8, 12).unwrap().alpha() > 0.9);
    }

    #[test]
    fn test_transparency_layer_vs_direct() {
        let shape0 = Shape::rect(BBox::new((0.0, 0.0), (10.0, 8.0)));
        let shape1 = Shape::rect(BBox::new((6.0, 0.0), (16.0, 8.0)));

        // direct: each half-transparent draw blends separately
        let mut direct = Context::new(16, 8);
        direct.draw_shape(&shape0, FillRule::NonZero, red_half());
        direct.draw_shape(&shape1, FillRule::NonZero, red_half());
        let direct_overlap = *direct.image().get(4, 8).unwrap();
        // a over b: alpha = 0.5 + 0.5 * 0.5
        assert_approx_eq!(direct_overlap.alpha() as f64, 0.75, 1e-5);

        // layered: the two draws flatten inside the layer, the layer is then
        // composited once with the layer opacity
        let mut layered = Context::new(16, 8);
        layered.set_opacity(0.5);
        layered.begin_transparency_layer();
        layered.draw_shape(&shape0, FillRule::NonZero, LinColor::new(1.0, 0.0, 0.0, 1.0));
        layered.draw_shape(&shape1, FillRule::NonZero, LinColor::new(1.0, 0.0, 0.0, 1.0));
        layered.end_transparency_layer();
        let layered_overlap = *layered.image().get(4, 8).unwrap();
        // flattened opaque content scaled by the layer opacity
        assert_approx_eq!(layered_overlap.alpha() as f64, 0.5, 1e-5);

        // flatten-then-blend is not equivalent to per-draw blending
        assert!((direct_overlap.alpha() - layered_overlap.alpha()).abs() > 0.1);
    }

    #[test]
    fn test_layer_discarded_when_empty() {
        let mut ctx = Context::new(8, 8);
        ctx.draw_shape(
            &Shape::rect(BBox::new((0.0, 0.0), (8.0, 8.0))),
            FillRule::NonZero,
            LinColor::new(0.0, 0.0, 1.0, 1.0),
        );
        let before = *ctx.image().get(4, 4).unwrap();
        ctx.begin_transparency_layer();
        ctx.end_transparency_layer();
        assert_eq!(*ctx.image().get(4, 4).unwrap(), before);
    }

    #[test]
    fn test_nested_layers() {
        let mut ctx = Context::new(8, 8);
        ctx.begin_transparency_layer();
        ctx.set_opacity(0.5);
        ctx.begin_transparency_layer();
        ctx.draw_shape(
            &Shape::rect(BBox::new((0.0, 0.0), (8.0, 8.0))),
            FillRule::NonZero,
            LinColor::new(1.0, 1.0, 1.0, 1.0),
        );
        // unwound innermost first
        ctx.end_transparency_layer();
        ctx.end_transparency_layer();
        let out = *ctx.image().get(4, 4).unwrap();
        assert_approx_eq!(out.alpha() as f64, 0.5, 1e-5);
    }

    #[test]
    fn test_state_scoped_to_layer() {
        let mut ctx = Context::new(8, 8);
        ctx.set_opacity(0.25);
        ctx.begin_transparency_layer();
        // layer starts with opacity reset to 1
        assert_approx_eq!(ctx.state().opacity, 1.0);
        ctx.save_graphic_state();
        ctx.set_opacity(0.75);
        ctx.restore_graphic_state();
        assert_approx_eq!(ctx.state().opacity, 1.0);
        ctx.end_transparency_layer();
        // base state untouched by the layer's save/restore
        assert_approx_eq!(ctx.state().opacity, 0.25);
    }

    #[test]
    fn test_depth_buffer_scenario() {
        let mut ctx = Context::new(8, 8);
        ctx.state_mut().depth_compare = DepthCompare::Less;
        ctx.clear_depth();
        let near = [
            Vertex::new((0.0, 0.0), 0.25, 1.0, LinColor::new(1.0, 0.0, 0.0, 1.0)),
            Vertex::new((16.0, 0.0), 0.25, 1.0, LinColor::new(1.0, 0.0, 0.0, 1.0)),
            Vertex::new((0.0, 16.0), 0.25, 1.0, LinColor::new(1.0, 0.0, 0.0, 1.0)),
        ];
        let far = [
            Vertex::new((0.0, 0.0), 0.75, 1.0, LinColor::new(0.0, 0.0, 1.0, 1.0)),
            Vertex::new((16.0, 0.0), 0.75, 1.0, LinColor::new(0.0, 0.0, 1.0, 1.0)),
            Vertex::new((0.0, 16.0), 0.75, 1.0, LinColor::new(0.0, 0.0, 1.0, 1.0)),
        ];
        // draw far after near, the depth test keeps the near triangle
        ctx.draw_triangles(&near, &mut Some);
        ctx.draw_triangles(&far, &mut Some);
        assert_eq!(
            *ctx.image().get(2, 2).unwrap(),
            LinColor::new(1.0, 0.0, 0.0, 1.0)
        );
    }

    #[test]
    fn test_shadow() {
        let mut ctx = Context::new(32, 32);
        ctx.set_shadow(Some(Shadow {
            offset: Point::new(6.0, 6.0),
            blur: 0.0,
            color: LinColor::new(0.0, 0.0, 0.0, 1.0),
        }));
        let shape = Shape::rect(BBox::new((4.0, 4.0), (12.0, 12.0)));
        ctx.draw_shape(&shape, FillRule::NonZero, LinColor::new(1.0, 0.0, 0.0, 1.0));
        // content pixel
        assert!(ctx.image().get(8, 8).unwrap().red() > 0.9);
        // shadow-only pixel: offset beyond the content
        let shadow_pixel = *ctx.image().get(16, 16).unwrap();
        assert!(shadow_pixel.alpha() > 0.9);
        assert!(shadow_pixel.red() < 0.1);
    }

    #[test]
    fn test_zero_sized_context() {
        let mut ctx = Context::new(0, 0);
        ctx.draw_shape(
            &Shape::rect(BBox::new((0.0, 0.0), (4.0, 4.0))),
            FillRule::NonZero,
            LinColor::new(1.0, 1.0, 1.0, 1.0),
        );
        assert_eq!(ctx.image().data().len(), 0);
    }
}
