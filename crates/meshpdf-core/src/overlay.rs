//! Overlay model for the open document
//!
//! Overlays are user-added signature images and text labels. They live in
//! screen coordinates of the page bitmap they were placed on, together with
//! the zoom level that bitmap was rendered at, and are converted to PDF user
//! space only when the document is written.

use crate::coords::{PageBox, PdfRect, ScreenPoint, ScreenSize, ViewTransform};
use crate::error::{MeshPdfError, Result};
use crate::signature::SignatureImage;
use serde::{Deserialize, Serialize};

pub type OverlayId = u64;

/// Rough Helvetica advance width relative to the font size.
const AVERAGE_GLYPH_WIDTH: f64 = 0.55;
pub const LINE_LEADING: f64 = 1.2;
/// Label padding around text, in screen pixels.
const TEXT_PADDING: f64 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum OverlayKind {
    Signature { image: SignatureImage },
    /// `font_size` is in PDF points.
    Text { text: String, font_size: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Overlay {
    pub id: OverlayId,
    /// Zero-based page index.
    pub page: usize,
    /// Top-left corner in page bitmap pixels.
    pub position: ScreenPoint,
    pub size: ScreenSize,
    /// Zoom level `position` and `size` were recorded at.
    pub zoom: f64,
    pub kind: OverlayKind,
}

impl Overlay {
    pub fn is_signature(&self) -> bool {
        matches!(self.kind, OverlayKind::Signature { .. })
    }

    /// Display font size for a text overlay at the zoom it was recorded at.
    fn font_px(&self, font_size: f64, transform: ViewTransform, min_px: f64) -> f64 {
        let recorded = ViewTransform::new(transform.render_scale, self.zoom);
        text_display_px(font_size, recorded, min_px)
    }

    /// Where this overlay lands on the page, in PDF units of the displayed box.
    /// Equal to user space unless the page is rotated.
    pub fn pdf_rect(&self, render_scale: f64, page_box: PageBox) -> PdfRect {
        ViewTransform::new(render_scale, self.zoom).screen_rect_to_pdf(
            self.position,
            self.size,
            page_box,
        )
    }
}

/// Sizes used when placing new overlays.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OverlayDefaults {
    /// Box a new signature is fitted into at zoom 1, in screen pixels.
    pub signature_box: ScreenSize,
    pub font_size: f64,
    pub min_display_font_px: f64,
}

impl Default for OverlayDefaults {
    fn default() -> Self {
        Self {
            signature_box: ScreenSize::new(200.0, 100.0),
            font_size: 14.0,
            min_display_font_px: 8.0,
        }
    }
}

/// Display font size in pixels for a text overlay at the given transform.
pub fn text_display_px(font_size: f64, transform: ViewTransform, min_px: f64) -> f64 {
    transform.to_screen_length(font_size).max(min_px)
}

/// Label size of `text` at `font_px`, from an average Helvetica glyph width.
pub fn estimate_text_size(text: &str, font_px: f64) -> ScreenSize {
    let lines: Vec<&str> = text.split('\n').collect();
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    ScreenSize::new(
        longest as f64 * font_px * AVERAGE_GLYPH_WIDTH + 2.0 * TEXT_PADDING,
        lines.len() as f64 * font_px * LINE_LEADING + 2.0 * TEXT_PADDING,
    )
}

/// Keep a rectangle of `size` inside a page bitmap of `page_size`.
pub fn clamp_to_page(
    position: ScreenPoint,
    size: ScreenSize,
    page_size: ScreenSize,
) -> ScreenPoint {
    ScreenPoint::new(
        position.x.min(page_size.width - size.width).max(0.0),
        position.y.min(page_size.height - size.height).max(0.0),
    )
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlaySet {
    next_id: OverlayId,
    overlays: Vec<Overlay>,
}

impl OverlaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut overlay: Overlay) -> OverlayId {
        let id = self.next_id;
        self.next_id += 1;
        overlay.id = id;
        self.overlays.push(overlay);
        id
    }

    /// Place a signature fitted into the default box at `zoom`, centred on `click`.
    pub fn place_signature(
        &mut self,
        page: usize,
        click: ScreenPoint,
        image: SignatureImage,
        zoom: f64,
        page_size: ScreenSize,
        defaults: &OverlayDefaults,
    ) -> OverlayId {
        let size = image.size().fit_within(defaults.signature_box.scaled(zoom));
        let centred = ScreenPoint::new(click.x - size.width / 2.0, click.y - size.height / 2.0);
        let id = self.add(Overlay {
            id: 0,
            page,
            position: clamp_to_page(centred, size, page_size),
            size,
            zoom,
            kind: OverlayKind::Signature { image },
        });
        tracing::debug!(
            "Added signature {} to page {} at ({:.0}, {:.0})",
            id,
            page,
            click.x,
            click.y
        );
        id
    }

    /// Place a text label with its top-left corner at `at`.
    pub fn place_text(
        &mut self,
        page: usize,
        at: ScreenPoint,
        text: &str,
        transform: ViewTransform,
        page_size: ScreenSize,
        defaults: &OverlayDefaults,
    ) -> Result<OverlayId> {
        if text.is_empty() {
            return Err(MeshPdfError::EmptyText);
        }
        let font_px = text_display_px(defaults.font_size, transform, defaults.min_display_font_px);
        let size = estimate_text_size(text, font_px);
        let id = self.add(Overlay {
            id: 0,
            page,
            position: clamp_to_page(at, size, page_size),
            size,
            zoom: transform.zoom,
            kind: OverlayKind::Text {
                text: text.to_string(),
                font_size: defaults.font_size,
            },
        });
        tracing::debug!("Added text {} to page {} at ({:.0}, {:.0})", id, page, at.x, at.y);
        Ok(id)
    }

    pub fn remove(&mut self, id: OverlayId) -> bool {
        if let Some(pos) = self.overlays.iter().position(|o| o.id == id) {
            let removed = self.overlays.remove(pos);
            tracing::debug!("Deleted overlay {} from page {}", id, removed.page);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id == id)
    }

    fn get_mut(&mut self, id: OverlayId) -> Option<&mut Overlay> {
        self.overlays.iter_mut().find(|o| o.id == id)
    }

    /// Move an overlay, keeping it inside its page bitmap.
    pub fn move_to(
        &mut self,
        id: OverlayId,
        position: ScreenPoint,
        page_size: ScreenSize,
    ) -> bool {
        match self.get_mut(id) {
            Some(overlay) => {
                overlay.position = clamp_to_page(position, overlay.size, page_size);
                true
            }
            None => false,
        }
    }

    /// Resize an overlay within its page bitmap.
    ///
    /// Signatures keep the aspect ratio of their image, fitted into the
    /// requested box. Text labels never shrink below the extent of their glyphs.
    pub fn resize(
        &mut self,
        id: OverlayId,
        size: ScreenSize,
        transform: ViewTransform,
        min_px: f64,
        page_size: ScreenSize,
    ) -> bool {
        let Some(overlay) = self.get_mut(id) else {
            return false;
        };
        let bounds = ScreenSize::new(
            size.width.clamp(1.0, page_size.width.max(1.0)),
            size.height.clamp(1.0, page_size.height.max(1.0)),
        );
        overlay.size = match &overlay.kind {
            OverlayKind::Signature { image } => image.size().fit_within(bounds),
            OverlayKind::Text { text, font_size } => {
                let font_px = overlay.font_px(*font_size, transform, min_px);
                let glyphs = estimate_text_size(text, font_px);
                ScreenSize::new(
                    bounds.width.max(glyphs.width),
                    bounds.height.max(glyphs.height),
                )
            }
        };
        overlay.position = clamp_to_page(overlay.position, overlay.size, page_size);
        true
    }

    /// Replace the text of a text overlay, keeping the label on its page.
    /// Empty text is refused.
    pub fn set_text(
        &mut self,
        id: OverlayId,
        new_text: &str,
        transform: ViewTransform,
        min_px: f64,
        page_size: ScreenSize,
    ) -> Result<bool> {
        if new_text.is_empty() {
            return Err(MeshPdfError::EmptyText);
        }
        let Some(overlay) = self.get_mut(id) else {
            return Ok(false);
        };
        let OverlayKind::Text { font_size, .. } = overlay.kind else {
            return Ok(false);
        };
        let font_px = overlay.font_px(font_size, transform, min_px);
        overlay.kind = OverlayKind::Text {
            text: new_text.to_string(),
            font_size,
        };
        overlay.size = estimate_text_size(new_text, font_px);
        overlay.position = clamp_to_page(overlay.position, overlay.size, page_size);
        Ok(true)
    }

    /// Replace a signature image, fitted into the overlay's current box.
    pub fn replace_signature(&mut self, id: OverlayId, image: SignatureImage) -> bool {
        let Some(overlay) = self.get_mut(id) else {
            return false;
        };
        if !overlay.is_signature() {
            return false;
        }
        overlay.size = image.size().fit_within(overlay.size);
        overlay.kind = OverlayKind::Signature { image };
        true
    }

    /// Move an overlay to the end of the stacking order.
    pub fn bring_to_front(&mut self, id: OverlayId) {
        if let Some(pos) = self.overlays.iter().position(|o| o.id == id) {
            let overlay = self.overlays.remove(pos);
            self.overlays.push(overlay);
        }
    }

    /// Re-express every overlay at `transform.zoom` so it stays over the same page content.
    ///
    /// Text labels are widened back to their glyph extent where the display
    /// font floor `min_px` keeps glyphs larger than the scaled box.
    pub fn rescale(&mut self, transform: ViewTransform, min_px: f64) {
        let new_zoom = transform.zoom;
        for overlay in &mut self.overlays {
            if overlay.zoom != new_zoom && overlay.zoom > 0.0 {
                let ratio = new_zoom / overlay.zoom;
                overlay.position = overlay.position.scaled(ratio);
                overlay.size = overlay.size.scaled(ratio);
            }
            overlay.zoom = new_zoom;

            if let OverlayKind::Text { text, font_size } = &overlay.kind {
                let font_px = text_display_px(*font_size, transform, min_px);
                let glyphs = estimate_text_size(text, font_px);
                overlay.size = ScreenSize::new(
                    overlay.size.width.max(glyphs.width),
                    overlay.size.height.max(glyphs.height),
                );
            }
        }
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn for_page(&self, page: usize) -> Vec<&Overlay> {
        self.overlays.iter().filter(|o| o.page == page).collect()
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn clear(&mut self) {
        self.overlays.clear();
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
