//! Page rasterization
//!
//! Pages are rendered with PDFium when the library can be bound. Without it
//! the viewer still works on blank pages of the right size, so overlays can
//! be placed and saved.

use anyhow::{anyhow, Context};
use meshpdf_core::PageBox;
use pdfium_render::prelude::*;

/// RGBA8 bitmap of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

pub trait PageRasterizer {
    /// Render every page of `pdf` at `scale` pixels per point.
    fn render(
        &self,
        pdf: &[u8],
        page_boxes: &[PageBox],
        scale: f64,
    ) -> anyhow::Result<Vec<RenderedPage>>;

    fn name(&self) -> &'static str;
}

pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Bind to a PDFium library next to the executable, falling back to the system one.
    pub fn bind() -> anyhow::Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| anyhow!("PDFium library not found: {}", e))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render(
        &self,
        pdf: &[u8],
        _page_boxes: &[PageBox],
        scale: f64,
    ) -> anyhow::Result<Vec<RenderedPage>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| anyhow!("{}", e))
            .context("PDFium could not open the document")?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale as f32);
        let mut pages = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| anyhow!("{}", e))
                .with_context(|| format!("Failed to render page {}", index + 1))?;
            pages.push(RenderedPage {
                width: bitmap.width() as usize,
                height: bitmap.height() as usize,
                rgba: bitmap.as_rgba_bytes(),
            });
        }
        Ok(pages)
    }

    fn name(&self) -> &'static str {
        "pdfium"
    }
}

/// White pages sized from the page boxes.
pub struct BlankRasterizer;

impl PageRasterizer for BlankRasterizer {
    fn render(
        &self,
        _pdf: &[u8],
        page_boxes: &[PageBox],
        scale: f64,
    ) -> anyhow::Result<Vec<RenderedPage>> {
        Ok(page_boxes
            .iter()
            .map(|page_box| {
                let shown = page_box.display_box();
                let width = (shown.width * scale).round().max(1.0) as usize;
                let height = (shown.height * scale).round().max(1.0) as usize;
                RenderedPage {
                    width,
                    height,
                    rgba: vec![255; width * height * 4],
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "blank"
    }
}

/// PDFium if available, blank pages otherwise.
pub fn default_rasterizer() -> Box<dyn PageRasterizer> {
    match PdfiumRasterizer::bind() {
        Ok(rasterizer) => Box::new(rasterizer),
        Err(e) => {
            tracing::warn!("{}; pages will be shown blank", e);
            Box::new(BlankRasterizer)
        }
    }
}
