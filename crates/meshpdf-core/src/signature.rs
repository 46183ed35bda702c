//! Freehand signature capture
//!
//! Strokes are recorded as polylines in pad coordinates and rasterized onto a
//! transparent canvas when the user accepts the signature.

use crate::coords::{ScreenPoint, ScreenSize};
use crate::error::{MeshPdfError, Result};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PenStyle {
    pub color: [u8; 3],
    pub width: f32,
}

impl Default for PenStyle {
    fn default() -> Self {
        Self {
            color: [0, 0, 100],
            width: 2.5,
        }
    }
}

/// Straight-alpha RGBA8 bitmap of a captured signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EncodedImage", into = "EncodedImage")]
pub struct SignatureImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl SignatureImage {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MeshPdfError::ImageError("image has zero size".into()));
        }
        if rgba.len() != (width as usize) * (height as usize) * 4 {
            return Err(MeshPdfError::ImageError(format!(
                "expected {} bytes for {}x{} RGBA, got {}",
                width as usize * height as usize * 4,
                width,
                height,
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn size(&self) -> ScreenSize {
        ScreenSize::new(self.width as f64, self.height as f64)
    }

    /// Split into packed RGB samples and an alpha plane, as PDF image XObjects want them.
    pub fn split_alpha(&self) -> (Vec<u8>, Vec<u8>) {
        let pixels = self.rgba.len() / 4;
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);
        for px in self.rgba.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }
        (rgb, alpha)
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| MeshPdfError::ImageError(e.to_string()))?;
            writer
                .write_image_data(&self.rgba)
                .map_err(|e| MeshPdfError::ImageError(e.to_string()))?;
        }
        Ok(out)
    }

    pub fn from_png(bytes: &[u8]) -> Result<Self> {
        let mut decoder = png::Decoder::new(std::io::Cursor::new(bytes));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder
            .read_info()
            .map_err(|e| MeshPdfError::ImageError(e.to_string()))?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e| MeshPdfError::ImageError(e.to_string()))?;
        buf.truncate(info.buffer_size());

        let rgba = match info.color_type {
            png::ColorType::Rgba => buf,
            png::ColorType::Rgb => buf
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            png::ColorType::GrayscaleAlpha => buf
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
            png::ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g, 255]).collect(),
            other => {
                return Err(MeshPdfError::ImageError(format!(
                    "unsupported PNG color type {:?}",
                    other
                )))
            }
        };
        Self::from_rgba(info.width, info.height, rgba)
    }
}

#[derive(Serialize, Deserialize)]
struct EncodedImage {
    png_base64: String,
}

impl TryFrom<EncodedImage> for SignatureImage {
    type Error = MeshPdfError;

    fn try_from(value: EncodedImage) -> Result<Self> {
        let bytes = B64
            .decode(value.png_base64.as_bytes())
            .map_err(|e| MeshPdfError::SerializationError(e.to_string()))?;
        SignatureImage::from_png(&bytes)
    }
}

impl From<SignatureImage> for EncodedImage {
    fn from(image: SignatureImage) -> Self {
        // Encoding an in-memory RGBA buffer of validated size cannot fail short of OOM.
        let png = image.to_png().unwrap_or_default();
        EncodedImage {
            png_base64: B64.encode(png),
        }
    }
}

/// Drawing surface for a signature, fed by pointer events.
#[derive(Debug, Clone)]
pub struct SignaturePad {
    width: u32,
    height: u32,
    pen: PenStyle,
    strokes: Vec<Vec<ScreenPoint>>,
    drawing: bool,
}

impl SignaturePad {
    pub fn new(width: u32, height: u32, pen: PenStyle) -> Self {
        Self {
            width,
            height,
            pen,
            strokes: Vec::new(),
            drawing: false,
        }
    }

    pub fn size(&self) -> ScreenSize {
        ScreenSize::new(self.width as f64, self.height as f64)
    }

    pub fn pen(&self) -> PenStyle {
        self.pen
    }

    pub fn strokes(&self) -> &[Vec<ScreenPoint>] {
        &self.strokes
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn has_signature(&self) -> bool {
        !self.strokes.is_empty()
    }

    fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= 0.0
            && point.y >= 0.0
            && point.x < self.width as f64
            && point.y < self.height as f64
    }

    /// Pointer pressed. Starts a stroke only inside the canvas.
    pub fn begin_stroke(&mut self, point: ScreenPoint) -> bool {
        if !self.contains(point) {
            return false;
        }
        self.strokes.push(vec![point]);
        self.drawing = true;
        true
    }

    /// Pointer moved while pressed. Points outside the canvas are dropped.
    pub fn extend_stroke(&mut self, point: ScreenPoint) -> bool {
        if !self.drawing || !self.contains(point) {
            return false;
        }
        match self.strokes.last_mut() {
            Some(stroke) => {
                stroke.push(point);
                true
            }
            None => false,
        }
    }

    pub fn end_stroke(&mut self) {
        self.drawing = false;
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.drawing = false;
        tracing::debug!("Signature cleared");
    }

    /// Rasterize the strokes onto a transparent canvas.
    pub fn finish(&self) -> Result<SignatureImage> {
        if !self.has_signature() {
            return Err(MeshPdfError::EmptySignature);
        }
        self.rasterize()
    }

    fn rasterize(&self) -> Result<SignatureImage> {
        let mut pixmap = Pixmap::new(self.width, self.height)
            .ok_or_else(|| MeshPdfError::ImageError("invalid signature pad size".into()))?;

        let [r, g, b] = self.pen.color;
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, 255);
        paint.anti_alias = true;

        let stroke = Stroke {
            width: self.pen.width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        for points in &self.strokes {
            match points.as_slice() {
                [] => {}
                [dot] => {
                    // A click without movement leaves a dot the size of the pen.
                    if let Some(path) =
                        PathBuilder::from_circle(dot.x as f32, dot.y as f32, self.pen.width / 2.0)
                    {
                        pixmap.fill_path(
                            &path,
                            &paint,
                            FillRule::Winding,
                            Transform::identity(),
                            None,
                        );
                    }
                }
                [first, rest @ ..] => {
                    let mut pb = PathBuilder::new();
                    pb.move_to(first.x as f32, first.y as f32);
                    for p in rest {
                        pb.line_to(p.x as f32, p.y as f32);
                    }
                    if let Some(path) = pb.finish() {
                        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                    }
                }
            }
        }

        let rgba = pixmap
            .pixels()
            .iter()
            .flat_map(|px| {
                let c = px.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();

        SignatureImage::from_rgba(self.width, self.height, rgba)
    }
}
