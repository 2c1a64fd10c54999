//! Color types, compositing and the device color conversion boundary
use crate::{Point, Scalar, Transform};
use std::{
    fmt,
    ops::{Add, Mul},
    str::FromStr,
    sync::Arc,
};

/// Common interface to all color representations
pub trait Color: Copy {
    /// Blend other color on top of this color
    fn blend_over(self, other: Self) -> Self;

    /// Override alpha component of the color
    fn with_alpha(self, alpha: Scalar) -> Self;

    /// Convert color to sRGBA list
    fn to_rgba(self) -> [u8; 4];

    /// Convert color to sRGB list (alpha is discarded)
    fn to_rgb(self) -> [u8; 3] {
        let [r, g, b, _] = self.to_rgba();
        [r, g, b]
    }

    /// Calculate LUMA of the color.
    fn luma(self) -> f32 {
        let [r, g, b] = self.to_rgb();
        0.2126 * (r as f32 / 255.0) + 0.7152 * (g as f32 / 255.0) + 0.0722 * (b as f32 / 255.0)
    }

    /// Pick color that produces the best contrast with self
    fn best_contrast(self, c0: Self, c1: Self) -> Self {
        let luma = self.luma();
        if (luma - c0.luma()).abs() < (luma - c1.luma()).abs() {
            c1
        } else {
            c0
        }
    }

    /// Linear interpolation between self and other colors.
    fn lerp(self, other: Self, t: f32) -> Self;
}

/// ABGR color packed as u32 value (most of the platforms are little-endian)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct RGBA(u32);

impl RGBA {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((a as u32) << 24) | ((b as u32) << 16) | ((g as u32) << 8) | (r as u32))
    }

    pub const fn alpha(self) -> u8 {
        ((self.0 >> 24) & 0xff) as u8
    }

    pub const fn blue(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    pub const fn green(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl Color for RGBA {
    fn to_rgba(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    fn blend_over(self, other: Self) -> Self {
        LinColor::from(self)
            .blend_over(LinColor::from(other))
            .into()
    }

    fn with_alpha(self, alpha: Scalar) -> Self {
        LinColor::from(self).with_alpha(alpha).into()
    }

    fn lerp(self, other: Self, t: f32) -> Self {
        LinColor::from(self).lerp(LinColor::from(other), t).into()
    }
}

impl From<LinColor> for RGBA {
    fn from(lin: LinColor) -> Self {
        let LinColor([r, g, b, a]) = lin;
        if a <= f32::EPSILON {
            return RGBA::default();
        }
        let r = (linear_to_srgb(r / a) * 255.0 + 0.5) as u8;
        let g = (linear_to_srgb(g / a) * 255.0 + 0.5) as u8;
        let b = (linear_to_srgb(b / a) * 255.0 + 0.5) as u8;
        let a = (a * 255.0 + 0.5) as u8;
        RGBA::new(r, g, b, a)
    }
}

impl From<RGBA> for LinColor {
    fn from(color: RGBA) -> Self {
        let a = color.alpha() as f32 / 255.0;
        let r = srgb_to_linear(color.red() as f32 / 255.0) * a;
        let g = srgb_to_linear(color.green() as f32 / 255.0) * a;
        let b = srgb_to_linear(color.blue() as f32 / 255.0) * a;
        LinColor::new(r, g, b, a)
    }
}

impl fmt::Debug for RGBA {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba();
        write!(fmt, "#{:02x}{:02x}{:02x}", r, g, b)?;
        if a != 255 {
            write!(fmt, "{:02x}", a)?;
        }
        Ok(())
    }
}

impl fmt::Display for RGBA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for RGBA {
    type Err = ColorError;

    fn from_str(color: &str) -> Result<Self, Self::Err> {
        if color.starts_with('#') && (color.len() == 7 || color.len() == 9) {
            // #RRGGBB(AA)
            let bytes: &[u8] = color[1..].as_ref();
            let digit = |byte| match byte {
                b'A'..=b'F' => Ok(byte - b'A' + 10),
                b'a'..=b'f' => Ok(byte - b'a' + 10),
                b'0'..=b'9' => Ok(byte - b'0'),
                _ => Err(ColorError::HexExpected),
            };
            let mut hex = bytes
                .chunks(2)
                .map(|pair| Ok(digit(pair[0])? << 4 | digit(pair[1])?));
            Ok(RGBA::new(
                hex.next().unwrap_or(Ok(0))?,
                hex.next().unwrap_or(Ok(0))?,
                hex.next().unwrap_or(Ok(0))?,
                hex.next().unwrap_or(Ok(255))?,
            ))
        } else {
            Err(ColorError::HexExpected)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorError {
    HexExpected,
}

impl fmt::Display for ColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorError::HexExpected => write!(f, "color expected in #RRGGBB(AA) format"),
        }
    }
}

impl std::error::Error for ColorError {}

/// Alpha premultiplied RGBA color in the linear color space (no gamma correction)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct LinColor(pub [f32; 4]);

impl LinColor {
    #[inline]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        LinColor([r, g, b, a])
    }

    #[inline]
    pub fn red(self) -> f32 {
        self.0[0]
    }

    #[inline]
    pub fn green(self) -> f32 {
        self.0[1]
    }

    #[inline]
    pub fn blue(self) -> f32 {
        self.0[2]
    }

    #[inline]
    pub fn alpha(self) -> f32 {
        self.0[3]
    }

    /// Linear color is by default pre-multiplied by alpha, this function
    /// removes pre-multiplication.
    pub fn unmultiply(self) -> Self {
        let Self([r, g, b, a]) = self;
        if a <= f32::EPSILON {
            Self::default()
        } else {
            Self([r / a, g / a, b / a, a])
        }
    }

    /// Distance between unmultiplied representations of the colors
    pub fn distance(self, other: Self) -> f32 {
        let Self([r0, g0, b0, _]) = self.unmultiply();
        let Self([r1, g1, b1, _]) = other.unmultiply();
        let (dr, dg, db) = (r1 - r0, g1 - g0, b1 - b0);
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Convert channels from linear to gamma-corrected sRGB space,
    /// preserving premultiplication.
    pub fn into_srgb(self) -> Self {
        let Self([r, g, b, a]) = self.unmultiply();
        Self([
            linear_to_srgb(r) * a,
            linear_to_srgb(g) * a,
            linear_to_srgb(b) * a,
            a,
        ])
    }

    /// Convert channels from gamma-corrected sRGB space back to linear,
    /// preserving premultiplication.
    pub fn into_linear(self) -> Self {
        let Self([r, g, b, a]) = self.unmultiply();
        Self([
            srgb_to_linear(r) * a,
            srgb_to_linear(g) * a,
            srgb_to_linear(b) * a,
            a,
        ])
    }

    /// Compose the source color onto self with the Porter-Duff operator
    pub fn compose(self, src: Self, op: ComposeOp) -> Self {
        let dst = self;
        let (src_coeff, dst_coeff) = match op {
            ComposeOp::Clear => (0.0, 0.0),
            ComposeOp::Copy => (1.0, 0.0),
            ComposeOp::SourceOver => (1.0, 1.0 - src.alpha()),
            ComposeOp::DestinationOver => (1.0 - dst.alpha(), 1.0),
            ComposeOp::SourceIn => (dst.alpha(), 0.0),
            ComposeOp::DestinationIn => (0.0, src.alpha()),
            ComposeOp::SourceOut => (1.0 - dst.alpha(), 0.0),
            ComposeOp::DestinationOut => (0.0, 1.0 - src.alpha()),
            ComposeOp::SourceAtop => (dst.alpha(), 1.0 - src.alpha()),
            ComposeOp::DestinationAtop => (1.0 - dst.alpha(), src.alpha()),
            ComposeOp::Xor => (1.0 - dst.alpha(), 1.0 - src.alpha()),
            ComposeOp::Plus => (1.0, 1.0),
        };
        src * src_coeff + dst * dst_coeff
    }

    /// Mix the source color with self per-channel before compositing.
    ///
    /// Separable blend formula over unmultiplied channels:
    /// `c = (1 - a_dst) * c_src + a_dst * B(c_dst, c_src)`, the result is
    /// then composed source-over.
    pub fn blend(self, src: Self, mode: BlendMode) -> Self {
        if let BlendMode::Normal = mode {
            return self.compose(src, ComposeOp::SourceOver);
        }
        let dst_a = self.alpha();
        let src_a = src.alpha();
        let Self([dr, dg, db, _]) = self.unmultiply();
        let Self([sr, sg, sb, _]) = src.unmultiply();
        let channel = |cb: f32, cs: f32| -> f32 {
            let blended = (1.0 - dst_a) * cs + dst_a * mode.apply(cb, cs);
            blended * src_a
        };
        let mixed = Self([channel(dr, sr), channel(dg, sg), channel(db, sb), src_a]);
        self.compose(mixed, ComposeOp::SourceOver)
    }
}

impl Color for LinColor {
    fn blend_over(self, other: Self) -> Self {
        self.compose(other, ComposeOp::SourceOver)
    }

    fn with_alpha(self, alpha: Scalar) -> Self {
        self * (alpha as f32)
    }

    fn to_rgba(self) -> [u8; 4] {
        RGBA::from(self).to_rgba()
    }

    fn lerp(self, other: Self, t: f32) -> Self {
        self * (1.0 - t) + other * t
    }
}

impl Add for LinColor {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self::Output {
        let Self([r0, g0, b0, a0]) = self;
        let Self([r1, g1, b1, a1]) = other;
        Self([r0 + r1, g0 + g1, b0 + b1, a0 + a1])
    }
}

impl Mul<f32> for LinColor {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self::Output {
        let Self([r, g, b, a]) = self;
        Self([r * rhs, g * rhs, b * rhs, a * rhs])
    }
}

impl Mul<Scalar> for LinColor {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Scalar) -> Self::Output {
        self * (rhs as f32)
    }
}

impl FromStr for LinColor {
    type Err = ColorError;

    fn from_str(color: &str) -> Result<Self, Self::Err> {
        Ok(RGBA::from_str(color)?.into())
    }
}

/// Convert gamma-corrected sRGB channel to linear
pub fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert linear channel to gamma-corrected sRGB
pub fn linear_to_srgb(value: f32) -> f32 {
    if value <= 0.0031308 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

/// Porter-Duff compositing operator selecting the coverage coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComposeOp {
    Clear,
    Copy,
    SourceOver,
    DestinationOver,
    SourceIn,
    DestinationIn,
    SourceOut,
    DestinationOut,
    SourceAtop,
    DestinationAtop,
    Xor,
    Plus,
}

impl Default for ComposeOp {
    fn default() -> Self {
        Self::SourceOver
    }
}

/// Separable per-channel blend formula applied before compositing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
}

impl Default for BlendMode {
    fn default() -> Self {
        Self::Normal
    }
}

impl BlendMode {
    /// Blend a single unmultiplied channel, `cb` is backdrop, `cs` is source
    pub fn apply(self, cb: f32, cs: f32) -> f32 {
        match self {
            BlendMode::Normal => cs,
            BlendMode::Multiply => cb * cs,
            BlendMode::Screen => cb + cs - cb * cs,
            BlendMode::Overlay => BlendMode::HardLight.apply(cs, cb),
            BlendMode::Darken => cb.min(cs),
            BlendMode::Lighten => cb.max(cs),
            BlendMode::ColorDodge => {
                if cb <= 0.0 {
                    0.0
                } else if cs >= 1.0 {
                    1.0
                } else {
                    (cb / (1.0 - cs)).min(1.0)
                }
            }
            BlendMode::ColorBurn => {
                if cb >= 1.0 {
                    1.0
                } else if cs <= 0.0 {
                    0.0
                } else {
                    1.0 - ((1.0 - cb) / cs).min(1.0)
                }
            }
            BlendMode::HardLight => {
                if cs <= 0.5 {
                    cb * 2.0 * cs
                } else {
                    BlendMode::Screen.apply(cb, 2.0 * cs - 1.0)
                }
            }
            BlendMode::SoftLight => {
                if cs <= 0.5 {
                    cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
                } else {
                    let d = if cb <= 0.25 {
                        ((16.0 * cb - 12.0) * cb + 4.0) * cb
                    } else {
                        cb.sqrt()
                    };
                    cb + (2.0 * cs - 1.0) * (d - cb)
                }
            }
            BlendMode::Difference => (cb - cs).abs(),
            BlendMode::Exclusion => cb + cs - 2.0 * cb * cs,
        }
    }
}

/// ICC rendering intent carried in the graphics state and handed to the
/// color conversion collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderingIntent {
    Perceptual,
    RelativeColorimetric,
    Saturation,
    AbsoluteColorimetric,
}

impl Default for RenderingIntent {
    fn default() -> Self {
        Self::RelativeColorimetric
    }
}

/// Chromatic adaptation algorithm used when converting between white points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChromaticAdaptation {
    XyzScaling,
    VonKries,
    Bradford,
}

impl Default for ChromaticAdaptation {
    fn default() -> Self {
        Self::Bradford
    }
}

/// Device color conversion boundary, implemented by the ICC profile
/// collaborator. The engine only ever calls through this interface to
/// resolve final pixel values, it has no knowledge of profile formats.
pub trait ColorSpace {
    /// Transfer a single device channel to linear light
    fn to_linear(&self, channel: f32) -> f32;

    /// Transfer a single linear channel to the device encoding
    fn from_linear(&self, channel: f32) -> f32;

    /// Convert a linear color triple to CIE XYZ
    fn to_xyz(&self, rgb: [f32; 3]) -> [f32; 3];

    /// Convert CIE XYZ back to a linear color triple
    fn from_xyz(&self, xyz: [f32; 3]) -> [f32; 3];
}

/// The sRGB color space with the D65 white point
#[derive(Debug, Clone, Copy, Default)]
pub struct Srgb;

impl ColorSpace for Srgb {
    fn to_linear(&self, channel: f32) -> f32 {
        srgb_to_linear(channel)
    }

    fn from_linear(&self, channel: f32) -> f32 {
        linear_to_srgb(channel)
    }

    fn to_xyz(&self, [r, g, b]: [f32; 3]) -> [f32; 3] {
        [
            0.4124564 * r + 0.3575761 * g + 0.1804375 * b,
            0.2126729 * r + 0.7151522 * g + 0.0721750 * b,
            0.0193339 * r + 0.1191920 * g + 0.9503041 * b,
        ]
    }

    fn from_xyz(&self, [x, y, z]: [f32; 3]) -> [f32; 3] {
        [
            3.2404542 * x - 1.5371385 * y - 0.4985314 * z,
            -0.9692660 * x + 1.8760108 * y + 0.0415560 * z,
            0.0556434 * x - 0.2040259 * y + 1.0572252 * z,
        ]
    }
}

/// Gradient/paint units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Units {
    UserSpaceOnUse,
    BoundingBox,
}

/// Per-fragment shader invoked by the rasterizer for every covered pixel
pub trait Paint: fmt::Debug {
    /// Color of the paint at the point (in paint coordinates)
    fn at(&self, point: Point) -> LinColor;

    /// Units of the paint coordinate system
    fn units(&self) -> Option<Units> {
        None
    }

    /// Transform applied to paint coordinates
    fn transform(&self) -> Transform {
        Transform::identity()
    }
}

impl Paint for LinColor {
    fn at(&self, _: Point) -> LinColor {
        *self
    }
}

impl Paint for RGBA {
    fn at(&self, _: Point) -> LinColor {
        (*self).into()
    }
}

impl<'a, P: Paint + ?Sized> Paint for &'a P {
    fn at(&self, point: Point) -> LinColor {
        (**self).at(point)
    }

    fn units(&self) -> Option<Units> {
        (**self).units()
    }

    fn transform(&self) -> Transform {
        (**self).transform()
    }
}

impl Paint for Arc<dyn Paint> {
    fn at(&self, point: Point) -> LinColor {
        (**self).at(point)
    }

    fn units(&self) -> Option<Units> {
        (**self).units()
    }

    fn transform(&self) -> Transform {
        (**self).transform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_rgba_round_trip() {
        let color: RGBA = "#5a8734".parse().unwrap();
        assert_eq!(color.red(), 0x5a);
        assert_eq!(color.green(), 0x87);
        assert_eq!(color.blue(), 0x34);
        assert_eq!(color.alpha(), 255);

        let lin: LinColor = color.into();
        let back: RGBA = lin.into();
        assert_eq!(color, back);

        assert_eq!(color.to_string(), "#5a8734");
        let transparent: RGBA = "#5a873480".parse().unwrap();
        assert_eq!(transparent.alpha(), 0x80);
    }

    #[test]
    fn test_compose_over() {
        let dst = LinColor::new(0.0, 0.0, 0.0, 0.0);
        let src = LinColor::new(0.25, 0.5, 0.75, 1.0);
        // over transparent background source wins
        assert_eq!(dst.blend_over(src), src);

        // opaque source fully covers the destination
        let dst = LinColor::new(1.0, 0.0, 0.0, 1.0);
        assert_eq!(dst.blend_over(src), src);

        // half transparent source leaves half of the destination
        let src_half = src * 0.5f32;
        let out = dst.blend_over(src_half);
        assert_approx_eq!(out.red() as f64, 0.625, 1e-6);
        assert_approx_eq!(out.alpha() as f64, 1.0, 1e-6);
    }

    #[test]
    fn test_compose_ops() {
        let dst = LinColor::new(0.8, 0.0, 0.0, 0.8);
        let src = LinColor::new(0.0, 0.4, 0.0, 0.4);
        // source-in keeps the source where the destination has coverage
        let out = dst.compose(src, ComposeOp::SourceIn);
        assert_approx_eq!(out.alpha() as f64, 0.4 * 0.8, 1e-6);
        // clear produces nothing
        assert_eq!(dst.compose(src, ComposeOp::Clear), LinColor::default());
        // xor: both only where the other is absent
        let out = dst.compose(src, ComposeOp::Xor);
        assert_approx_eq!(out.alpha() as f64, 0.8 * 0.6 + 0.4 * 0.2, 1e-6);
    }

    #[test]
    fn test_blend_modes() {
        // multiply of opaque colors multiplies channels
        let dst = LinColor::new(0.5, 0.5, 0.5, 1.0);
        let src = LinColor::new(0.5, 1.0, 0.0, 1.0);
        let out = dst.blend(src, BlendMode::Multiply);
        assert_approx_eq!(out.red() as f64, 0.25, 1e-6);
        assert_approx_eq!(out.green() as f64, 0.5, 1e-6);
        assert_approx_eq!(out.blue() as f64, 0.0, 1e-6);

        // screen is the dual of multiply
        let out = dst.blend(src, BlendMode::Screen);
        assert_approx_eq!(out.red() as f64, 0.75, 1e-6);

        // blending over a transparent backdrop reduces to the source
        let out = LinColor::default().blend(src, BlendMode::Multiply);
        assert_approx_eq!(out.red() as f64, 0.5, 1e-6);
        assert_approx_eq!(out.alpha() as f64, 1.0, 1e-6);
    }

    #[test]
    fn test_srgb_transfer() {
        for value in [0.0f32, 0.001, 0.1, 0.5, 0.9, 1.0] {
            let there = srgb_to_linear(value);
            let back = linear_to_srgb(there);
            assert_approx_eq!(back as f64, value as f64, 1e-5);
        }

        let srgb = Srgb;
        // white maps to the D65 white point
        let [x, y, z] = srgb.to_xyz([1.0, 1.0, 1.0]);
        assert_approx_eq!(x as f64, 0.9505, 1e-3);
        assert_approx_eq!(y as f64, 1.0, 1e-3);
        assert_approx_eq!(z as f64, 1.089, 1e-3);
        // and back
        let [r, g, b] = srgb.from_xyz([x, y, z]);
        assert_approx_eq!(r as f64, 1.0, 1e-4);
        assert_approx_eq!(g as f64, 1.0, 1e-4);
        assert_approx_eq!(b as f64, 1.0, 1e-4);
    }
}
