//! Editing session for one open document
//!
//! Owns the source bytes, the overlays placed on top of them, the zoom level,
//! the pending placement mode and the temp files created along the way. The
//! UI drives it with pointer events in page bitmap coordinates.

use crate::apply::{apply_overlays, SaveReport};
use crate::config::EditorConfig;
use crate::coords::{ScreenPoint, ScreenSize, ViewTransform};
use crate::document::{self, DocumentInfo};
use crate::error::{MeshPdfError, Result};
use crate::merge::{combine_files, display_name, MergeOutcome};
use crate::overlay::{Overlay, OverlayId, OverlaySet};
use crate::signature::SignatureImage;
use crate::tempfiles::TempFiles;
use crate::zoom::ZoomLevel;
use std::fs;
use std::path::{Path, PathBuf};

const PRINT_PREFIX: &str = "meshpdf_print_";

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PlacementMode {
    #[default]
    Idle,
    /// The next click on a page drops this signature there.
    Signature(SignatureImage),
    /// The next click on a page asks for text to place there.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    Ignored,
    SignaturePlaced(OverlayId),
    /// The UI should prompt for text and call [`EditorSession::place_text`].
    TextRequested { page: usize, point: ScreenPoint },
}

#[derive(Debug)]
struct OpenDocument {
    name: String,
    path: Option<PathBuf>,
    bytes: Vec<u8>,
    info: DocumentInfo,
}

#[derive(Debug)]
pub struct EditorSession {
    config: EditorConfig,
    document: Option<OpenDocument>,
    overlays: OverlaySet,
    zoom: ZoomLevel,
    mode: PlacementMode,
    temp_files: TempFiles,
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        let zoom = ZoomLevel::new(config.zoom_limits());
        Self {
            config,
            document: None,
            overlays: OverlaySet::new(),
            zoom,
            mode: PlacementMode::Idle,
            temp_files: TempFiles::new(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Open a PDF from disk. On failure the current document stays open.
    pub fn open(&mut self, path: &Path) -> Result<&DocumentInfo> {
        let bytes = fs::read(path)?;
        let info = document::inspect(&bytes)?;
        self.temp_files.cleanup();
        tracing::info!("Opened {} ({} pages)", path.display(), info.page_count);
        Ok(self.install(display_name(path), Some(path.to_path_buf()), bytes, info))
    }

    /// Open a PDF already in memory.
    pub fn open_bytes(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Result<&DocumentInfo> {
        let info = document::inspect(&bytes)?;
        Ok(self.install(name.into(), None, bytes, info))
    }

    /// Merge `paths` in order and open the result. Existing overlays are discarded,
    /// so the caller confirms with the user first when [`Self::has_overlays`] is true.
    pub fn combine(&mut self, paths: &[PathBuf]) -> Result<MergeOutcome> {
        self.temp_files.cleanup();
        let prefix = self.config.files.temp_prefix.clone();
        let (path, outcome) = combine_files(paths, &mut self.temp_files, &prefix)?;
        let info = document::inspect(&outcome.bytes)?;
        let name = format!("Combined ({} files)", outcome.merged.len());
        self.install(name, Some(path), outcome.bytes.clone(), info);
        Ok(outcome)
    }

    fn install(
        &mut self,
        name: String,
        path: Option<PathBuf>,
        bytes: Vec<u8>,
        info: DocumentInfo,
    ) -> &DocumentInfo {
        self.overlays.clear();
        self.zoom.reset();
        self.mode = PlacementMode::Idle;
        &self
            .document
            .insert(OpenDocument {
                name,
                path,
                bytes,
                info,
            })
            .info
    }

    fn require_document(&self) -> Result<&OpenDocument> {
        self.document.as_ref().ok_or(MeshPdfError::NoDocument)
    }

    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    pub fn document_info(&self) -> Option<&DocumentInfo> {
        self.document.as_ref().map(|d| &d.info)
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.name.as_str())
    }

    pub fn document_path(&self) -> Option<&Path> {
        self.document.as_ref().and_then(|d| d.path.as_deref())
    }

    pub fn document_bytes(&self) -> Option<&[u8]> {
        self.document.as_ref().map(|d| d.bytes.as_slice())
    }

    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, |d| d.info.page_count)
    }

    pub fn transform(&self) -> ViewTransform {
        ViewTransform::new(self.config.view.render_scale, self.zoom.value())
    }

    pub fn zoom(&self) -> f64 {
        self.zoom.value()
    }

    pub fn zoom_label(&self) -> String {
        self.zoom.percent_label()
    }

    /// Pixel size of a page bitmap at the current zoom.
    pub fn page_pixel_size(&self, page: usize) -> Result<ScreenSize> {
        let doc = self.require_document()?;
        let page_box = doc
            .info
            .page_boxes
            .get(page)
            .ok_or(MeshPdfError::PageOutOfRange {
                page,
                page_count: doc.info.page_count,
            })?;
        Ok(self.transform().page_pixel_size(*page_box))
    }

    pub fn overlays(&self) -> &OverlaySet {
        &self.overlays
    }

    pub fn has_overlays(&self) -> bool {
        !self.overlays.is_empty()
    }

    pub fn mode(&self) -> &PlacementMode {
        &self.mode
    }

    pub fn enable_signature_mode(&mut self, image: SignatureImage) -> Result<()> {
        self.require_document()?;
        self.mode = PlacementMode::Signature(image);
        Ok(())
    }

    pub fn enable_text_mode(&mut self) -> Result<()> {
        self.require_document()?;
        self.mode = PlacementMode::Text;
        Ok(())
    }

    pub fn cancel_mode(&mut self) {
        self.mode = PlacementMode::Idle;
    }

    /// Handle a click on `page` at `point` (page bitmap pixels).
    pub fn click(&mut self, page: usize, point: ScreenPoint) -> Result<ClickOutcome> {
        if matches!(self.mode, PlacementMode::Idle) {
            return Ok(ClickOutcome::Ignored);
        }
        let page_size = self.page_pixel_size(page)?;

        match std::mem::take(&mut self.mode) {
            PlacementMode::Signature(image) => {
                let defaults = self.config.overlay_defaults();
                let id = self.overlays.place_signature(
                    page,
                    point,
                    image,
                    self.zoom.value(),
                    page_size,
                    &defaults,
                );
                Ok(ClickOutcome::SignaturePlaced(id))
            }
            PlacementMode::Text => {
                // Text mode stays armed until text is actually placed.
                self.mode = PlacementMode::Text;
                Ok(ClickOutcome::TextRequested { page, point })
            }
            PlacementMode::Idle => Ok(ClickOutcome::Ignored),
        }
    }

    /// Place text answered after a [`ClickOutcome::TextRequested`].
    pub fn place_text(&mut self, page: usize, point: ScreenPoint, text: &str) -> Result<OverlayId> {
        let page_size = self.page_pixel_size(page)?;
        let defaults = self.config.overlay_defaults();
        let id = self
            .overlays
            .place_text(page, point, text, self.transform(), page_size, &defaults)?;
        self.mode = PlacementMode::Idle;
        Ok(id)
    }

    pub fn overlay(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.get(id)
    }

    pub fn bring_to_front(&mut self, id: OverlayId) {
        self.overlays.bring_to_front(id);
    }

    pub fn move_overlay(&mut self, id: OverlayId, position: ScreenPoint) -> Result<bool> {
        let Some(page) = self.overlays.get(id).map(|o| o.page) else {
            return Ok(false);
        };
        let page_size = self.page_pixel_size(page)?;
        Ok(self.overlays.move_to(id, position, page_size))
    }

    /// Resize from the corner handle. Signatures keep their aspect ratio.
    pub fn resize_overlay(&mut self, id: OverlayId, size: ScreenSize) -> Result<bool> {
        let Some(page) = self.overlays.get(id).map(|o| o.page) else {
            return Ok(false);
        };
        let page_size = self.page_pixel_size(page)?;
        let transform = self.transform();
        let min_px = self.config.text.min_display_font_px;
        Ok(self.overlays.resize(id, size, transform, min_px, page_size))
    }

    pub fn delete_overlay(&mut self, id: OverlayId) -> bool {
        self.overlays.remove(id)
    }

    pub fn edit_text(&mut self, id: OverlayId, text: &str) -> Result<bool> {
        let Some(page) = self.overlays.get(id).map(|o| o.page) else {
            return Ok(false);
        };
        let page_size = self.page_pixel_size(page)?;
        let transform = self.transform();
        let min_px = self.config.text.min_display_font_px;
        self.overlays.set_text(id, text, transform, min_px, page_size)
    }

    pub fn replace_signature(&mut self, id: OverlayId, image: SignatureImage) -> bool {
        self.overlays.replace_signature(id, image)
    }

    pub fn zoom_in(&mut self) -> Option<f64> {
        let changed = self.zoom.zoom_in();
        self.after_zoom(changed)
    }

    pub fn zoom_out(&mut self) -> Option<f64> {
        let changed = self.zoom.zoom_out();
        self.after_zoom(changed)
    }

    pub fn reset_zoom(&mut self) -> Option<f64> {
        let changed = self.zoom.reset();
        self.after_zoom(changed)
    }

    fn after_zoom(&mut self, changed: Option<f64>) -> Option<f64> {
        if let Some(zoom) = changed {
            let min_px = self.config.text.min_display_font_px;
            self.overlays.rescale(self.transform(), min_px);
            tracing::debug!("Zoom set to {}", self.zoom.percent_label());
        }
        changed
    }

    /// The document with every overlay flattened into it.
    pub fn export_flattened(&self) -> Result<(Vec<u8>, SaveReport)> {
        let doc = self.require_document()?;
        apply_overlays(&doc.bytes, &self.overlays, self.config.view.render_scale)
    }

    /// Write the flattened document to `path`; without overlays this is a plain copy.
    pub fn save_to(&self, path: &Path) -> Result<SaveReport> {
        let (bytes, report) = self.export_flattened()?;
        fs::write(path, bytes)?;
        tracing::info!("Saved {}", path.display());
        Ok(report)
    }

    /// Flattened copy in a temp file, handed to the system print/open command.
    pub fn write_print_copy(&mut self) -> Result<PathBuf> {
        let (bytes, report) = self.export_flattened()?;
        if !report.skipped.is_empty() {
            tracing::warn!("{} overlays left out of the print copy", report.skipped.len());
        }
        self.temp_files.create(PRINT_PREFIX, &bytes)
    }

    pub fn temp_file_count(&self) -> usize {
        self.temp_files.len()
    }

    /// Close the document and remove temp files.
    pub fn close(&mut self) {
        self.document = None;
        self.overlays.clear();
        self.mode = PlacementMode::Idle;
        self.temp_files.cleanup();
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
