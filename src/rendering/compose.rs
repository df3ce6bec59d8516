//! Image composition: background plus wrapped text, serialized to a blob
//!
//! The compositor loads a background image, sizes the output raster to the
//! background's natural dimensions, draws the moderated text through the
//! event type's style profile, and encodes the result as PNG or JPEG.

use std::io::Cursor;
use std::path::PathBuf;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, Rgba, RgbaImage};
use rusttype::{point, Font, Scale};

use crate::error::{Error, Result};
use crate::rendering::{font, layout, CompositeBlob};
use crate::{EventType, RuntimeSettings};

/// How an image reference will be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Filesystem path or page-relative reference; never fetched cross-origin
    Local,
    /// Absolute URL on the hosting page's own origin; plain fetch
    SameOrigin,
    /// Absolute URL elsewhere; fetched as a cross-origin resource
    CrossOrigin,
}

/// Classify an image reference against the configured page origin.
///
/// References on the page's own origin must not be requested in cross-origin
/// mode, or the rasterized pixels become unreadable on the host that served
/// them.
pub fn classify_reference(reference: &str, app_origin: Option<&str>) -> ReferenceKind {
    if let Some(origin) = app_origin {
        if !origin.is_empty() && reference.starts_with(origin) {
            return ReferenceKind::SameOrigin;
        }
    }
    if reference.starts_with("http://") || reference.starts_with("https://") {
        ReferenceKind::CrossOrigin
    } else {
        ReferenceKind::Local
    }
}

/// Horizontal line alignment relative to the anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
}

/// Vertical anchoring of the wrapped block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAnchor {
    Top,
    Middle,
}

/// Offset shadow drawn under the text fill
#[derive(Debug, Clone, Copy)]
pub struct Shadow {
    pub color: Rgba<u8>,
    pub dx: f32,
    pub dy: f32,
}

/// Text style profile for one event type.
///
/// Anchor and maximum width are fractions of the canvas dimensions so the
/// same profile scales across background sizes.
#[derive(Debug, Clone)]
pub struct TextStyleProfile {
    pub color: Rgba<u8>,
    pub align: HAlign,
    pub anchor_v: VAnchor,
    pub shadow: Option<Shadow>,
    pub anchor: (f32, f32),
    pub max_width_frac: f32,
    pub font_size_frac: f32,
    pub min_font_px: f32,
    pub rotation_degrees: f32,
}

impl TextStyleProfile {
    /// Style profile keyed by event type
    pub fn for_event(event_type: EventType) -> Self {
        match event_type {
            // Fan-support poster: white centered text with a drop shadow
            EventType::Cheer => Self {
                color: Rgba([255, 255, 255, 255]),
                align: HAlign::Center,
                anchor_v: VAnchor::Middle,
                shadow: Some(Shadow {
                    color: Rgba([0, 0, 0, 230]),
                    dx: 3.0,
                    dy: 3.0,
                }),
                anchor: (0.5, 0.5),
                max_width_frac: 0.8,
                font_size_frac: 0.12,
                min_font_px: 58.0,
                rotation_degrees: 0.0,
            },
            // Acceptance-speech card: dark text, upper left, slightly rotated
            EventType::AwardSpeech => Self {
                color: Rgba([0, 0, 0, 255]),
                align: HAlign::Left,
                anchor_v: VAnchor::Top,
                shadow: None,
                anchor: (0.25, 0.3),
                max_width_frac: 0.6,
                font_size_frac: 0.12,
                min_font_px: 58.0,
                rotation_degrees: -7.0,
            },
        }
    }

    /// Font size for a canvas of the given dimensions: a fraction of the
    /// smaller side, floored so tiny backgrounds stay legible.
    pub fn font_size_for(&self, width: u32, height: u32) -> f32 {
        (width.min(height) as f32 * self.font_size_frac).max(self.min_font_px)
    }
}

/// Output encoding for the composite raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg { quality: u8 },
}

impl OutputFormat {
    /// JPEG tuned for outbound message-size limits
    pub fn message_optimized() -> Self {
        OutputFormat::Jpeg { quality: 85 }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg { .. } => "image/jpeg",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Png
    }
}

/// Per-request overrides layered over the event profile
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub format: OutputFormat,
    /// Explicit font size in pixels, overriding the profile computation
    pub font_size: Option<f32>,
    /// Explicit `#rrggbb` text color, overriding the profile color
    pub text_color: Option<String>,
}

/// Parse a `#rrggbb` color string
pub fn hex_color(s: &str) -> Result<Rgba<u8>> {
    let s = s.trim().trim_start_matches('#');
    if s.len() != 6 {
        return Err(Error::InputError(format!("invalid color: {s}")));
    }
    let b = hex::decode(s).map_err(|_| Error::InputError(format!("invalid color: {s}")))?;
    Ok(Rgba([b[0], b[1], b[2], 255]))
}

/// The image compositor.
///
/// Holds the HTTP client used for remote background references and the font
/// configuration; one instance serves the whole page session.
pub struct Compositor {
    client: reqwest::Client,
    app_origin: Option<String>,
    font_path: Option<PathBuf>,
}

impl Compositor {
    pub fn new(settings: &RuntimeSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            app_origin: settings.app_origin.clone(),
            font_path: settings.font_path.clone(),
        }
    }

    /// Compose `text` over the background identified by `background_ref` and
    /// serialize the result.
    ///
    /// The output raster always matches the background's natural dimensions.
    /// Blank text produces the bare background.
    pub async fn compose(
        &self,
        background_ref: &str,
        text: &str,
        event_type: EventType,
        options: RenderOptions,
    ) -> Result<CompositeBlob> {
        let background = self.load_background(background_ref).await?;
        let mut canvas = background.to_rgba8();

        if !text.trim().is_empty() {
            let mut profile = TextStyleProfile::for_event(event_type);
            if let Some(color) = &options.text_color {
                profile.color = hex_color(color)?;
            }
            let font = font::resolve_font(self.font_path.as_deref())?;
            draw_text(&mut canvas, text, &profile, &font, &options);
        }

        serialize(canvas, options.format)
    }

    async fn load_background(&self, reference: &str) -> Result<DynamicImage> {
        let bytes = match classify_reference(reference, self.app_origin.as_deref()) {
            ReferenceKind::Local => {
                let path = reference.strip_prefix("./").unwrap_or(reference);
                std::fs::read(path).map_err(|e| {
                    Error::ImageLoadError(format!("{}: {}", reference, e))
                })?
            }
            ReferenceKind::SameOrigin | ReferenceKind::CrossOrigin => {
                let response = self
                    .client
                    .get(reference)
                    .send()
                    .await
                    .map_err(|e| Error::ImageLoadError(format!("{}: {}", reference, e)))?;
                if !response.status().is_success() {
                    return Err(Error::ImageLoadError(format!(
                        "{}: HTTP {}",
                        reference,
                        response.status()
                    )));
                }
                response
                    .bytes()
                    .await
                    .map_err(|e| Error::ImageLoadError(format!("{}: {}", reference, e)))?
                    .to_vec()
            }
        };

        image::load_from_memory(&bytes)
            .map_err(|e| Error::ImageLoadError(format!("{}: {}", reference, e)))
    }
}

/// Draw the style-profiled, wrapped text block onto the canvas.
fn draw_text(
    canvas: &mut RgbaImage,
    text: &str,
    profile: &TextStyleProfile,
    font: &Font<'static>,
    options: &RenderOptions,
) {
    let (width, height) = canvas.dimensions();
    let font_size = options
        .font_size
        .unwrap_or_else(|| profile.font_size_for(width, height));
    let scale = Scale::uniform(font_size);
    let line_height = font_size * 1.2;
    let max_width = width as f32 * profile.max_width_frac;
    let anchor_x = width as f32 * profile.anchor.0;
    let anchor_y = height as f32 * profile.anchor.1;

    let lines = layout::wrap(text, |s| text_width(font, scale, s), max_width, line_height);

    let start_y = match profile.anchor_v {
        VAnchor::Middle => layout::middle_anchored_start(anchor_y, lines.total_height, line_height),
        VAnchor::Top => layout::top_anchored_start(anchor_y, line_height),
    };

    if profile.rotation_degrees == 0.0 {
        draw_lines(canvas, &lines, profile, font, scale, anchor_x, start_y);
    } else {
        // Rotation is a coordinate-space transform: render the block to a
        // transparent overlay as if unrotated, then map it back through an
        // inverse rotation about the anchor.
        let mut overlay = RgbaImage::new(width, height);
        draw_lines(&mut overlay, &lines, profile, font, scale, anchor_x, start_y);
        composite_rotated(canvas, &overlay, anchor_x, anchor_y, profile.rotation_degrees);
    }
}

fn draw_lines(
    target: &mut RgbaImage,
    lines: &layout::LineSet,
    profile: &TextStyleProfile,
    font: &Font<'static>,
    scale: Scale,
    anchor_x: f32,
    start_y: f32,
) {
    for (index, line) in lines.lines.iter().enumerate() {
        let line_y = start_y + index as f32 * lines.line_height;
        let left_x = match profile.align {
            HAlign::Left => anchor_x,
            HAlign::Center => anchor_x - text_width(font, scale, line) / 2.0,
        };

        let v_metrics = font.v_metrics(scale);
        let baseline_y = match profile.anchor_v {
            // line_y is the vertical center of the line's em box
            VAnchor::Middle => line_y + (v_metrics.ascent + v_metrics.descent) / 2.0,
            // line_y is the top of the line's em box
            VAnchor::Top => line_y + v_metrics.ascent,
        };

        if let Some(shadow) = profile.shadow {
            draw_line(
                target,
                font,
                scale,
                left_x + shadow.dx,
                baseline_y + shadow.dy,
                shadow.color,
                line,
            );
        }
        draw_line(target, font, scale, left_x, baseline_y, profile.color, line);
    }
}

/// Total advance width of `text` at `scale`, including kerning.
fn text_width(font: &Font<'static>, scale: Scale, text: &str) -> f32 {
    font.layout(text, scale, point(0.0, 0.0))
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .last()
        .unwrap_or(0.0)
}

/// Rasterize one line of glyphs at the given baseline.
fn draw_line(
    img: &mut RgbaImage,
    font: &Font<'static>,
    scale: Scale,
    x: f32,
    baseline_y: f32,
    color: Rgba<u8>,
    text: &str,
) {
    for glyph in font.layout(text, scale, point(x, baseline_y)) {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, coverage| {
                let px = gx as i32 + bb.min.x;
                let py = gy as i32 + bb.min.y;
                if px < 0 || py < 0 {
                    return;
                }
                let (px, py) = (px as u32, py as u32);
                if px >= img.width() || py >= img.height() {
                    return;
                }
                let alpha = (coverage * color.0[3] as f32) as u32;
                if alpha == 0 {
                    return;
                }
                blend_pixel(img, px, py, color, alpha.min(255) as u8);
            });
        }
    }
}

/// Source-over blend of `color` at `alpha` onto the pixel at (x, y).
fn blend_pixel(img: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>, alpha: u8) {
    let dst = img.get_pixel_mut(x, y);
    let sa = alpha as f32 / 255.0;
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let src = color.0[c] as f32;
        let d = dst.0[c] as f32;
        dst.0[c] = ((src * sa + d * da * (1.0 - sa)) / out_a).round() as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}

/// Composite `overlay` onto `canvas`, rotated by `degrees` about (cx, cy).
///
/// Inverse mapping with bilinear sampling: each canvas pixel pulls from the
/// overlay, so the rotated block has no holes.
fn composite_rotated(canvas: &mut RgbaImage, overlay: &RgbaImage, cx: f32, cy: f32, degrees: f32) {
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let (width, height) = canvas.dimensions();

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            // rotate by -theta to find the source position in the overlay
            let sx = cx + dx * cos + dy * sin;
            let sy = cy - dx * sin + dy * cos;
            if let Some((color, alpha)) = sample_bilinear(overlay, sx, sy) {
                if alpha > 0 {
                    blend_pixel(canvas, x, y, color, alpha);
                }
            }
        }
    }
}

fn sample_bilinear(img: &RgbaImage, x: f32, y: f32) -> Option<(Rgba<u8>, u8)> {
    if x < 0.0 || y < 0.0 {
        return None;
    }
    let (w, h) = img.dimensions();
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    if x0 + 1 >= w || y0 + 1 >= h {
        return None;
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let mut acc = [0.0f32; 4];
    for (px, py, weight) in [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ] {
        let p = img.get_pixel(px, py);
        let a = p.0[3] as f32 / 255.0 * weight;
        acc[0] += p.0[0] as f32 * a;
        acc[1] += p.0[1] as f32 * a;
        acc[2] += p.0[2] as f32 * a;
        acc[3] += a;
    }
    if acc[3] <= 0.0 {
        return None;
    }
    let color = Rgba([
        (acc[0] / acc[3]).round() as u8,
        (acc[1] / acc[3]).round() as u8,
        (acc[2] / acc[3]).round() as u8,
        255,
    ]);
    Some((color, (acc[3] * 255.0).round().min(255.0) as u8))
}

/// Encode the canvas at the requested format.
fn serialize(canvas: RgbaImage, format: OutputFormat) -> Result<CompositeBlob> {
    let (width, height) = canvas.dimensions();
    let mut bytes = Vec::new();

    match format {
        OutputFormat::Png => {
            PngEncoder::new(Cursor::new(&mut bytes))
                .write_image(canvas.as_raw(), width, height, ColorType::Rgba8)
                .map_err(|e| Error::SerializationError(e.to_string()))?;
        }
        OutputFormat::Jpeg { quality } => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
            JpegEncoder::new_with_quality(Cursor::new(&mut bytes), quality)
                .write_image(rgb.as_raw(), width, height, ColorType::Rgb8)
                .map_err(|e| Error::SerializationError(e.to_string()))?;
        }
    }

    if bytes.is_empty() {
        return Err(Error::SerializationError(
            "encoder produced an empty blob".to_string(),
        ));
    }
    Ok(CompositeBlob::new(bytes, format.mime_type()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_classification() {
        let origin = Some("https://campaign.example.com");
        assert_eq!(
            classify_reference("https://campaign.example.com/bg.png", origin),
            ReferenceKind::SameOrigin
        );
        assert_eq!(
            classify_reference("https://cdn.other.com/bg.png", origin),
            ReferenceKind::CrossOrigin
        );
        assert_eq!(
            classify_reference("/assets/bg.png", origin),
            ReferenceKind::Local
        );
        assert_eq!(
            classify_reference("./assets/bg.png", None),
            ReferenceKind::Local
        );
        assert_eq!(
            classify_reference("assets/bg.png", None),
            ReferenceKind::Local
        );
    }

    #[test]
    fn font_size_scales_with_canvas_but_floors() {
        let profile = TextStyleProfile::for_event(EventType::Cheer);
        // large canvas: fraction wins
        assert_eq!(profile.font_size_for(1000, 2000), 120.0);
        // tiny canvas: floor wins so text stays legible
        assert_eq!(profile.font_size_for(100, 100), 58.0);
    }

    #[test]
    fn output_format_mime_types() {
        assert_eq!(OutputFormat::Png.mime_type(), "image/png");
        assert_eq!(OutputFormat::message_optimized().mime_type(), "image/jpeg");
        assert_eq!(OutputFormat::default(), OutputFormat::Png);
    }

    #[test]
    fn hex_color_parses_and_rejects() {
        assert_eq!(hex_color("#ffffff").unwrap(), Rgba([255, 255, 255, 255]));
        assert_eq!(hex_color("000000").unwrap(), Rgba([0, 0, 0, 255]));
        assert!(hex_color("#fff").is_err());
        assert!(hex_color("#zzzzzz").is_err());
    }

    #[test]
    fn serialize_png_roundtrip_keeps_dimensions() {
        let canvas = RgbaImage::from_pixel(32, 48, Rgba([10, 20, 30, 255]));
        let blob = serialize(canvas, OutputFormat::Png).unwrap();
        assert_eq!(blob.mime_type(), "image/png");
        let decoded = image::load_from_memory(blob.bytes()).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 48);
    }

    #[test]
    fn serialize_jpeg_drops_alpha_but_keeps_dimensions() {
        let canvas = RgbaImage::from_pixel(20, 10, Rgba([200, 100, 50, 255]));
        let blob = serialize(canvas, OutputFormat::Jpeg { quality: 85 }).unwrap();
        assert_eq!(blob.mime_type(), "image/jpeg");
        let decoded = image::load_from_memory(blob.bytes()).unwrap();
        assert_eq!(decoded.width(), 20);
        assert_eq!(decoded.height(), 10);
    }
}
