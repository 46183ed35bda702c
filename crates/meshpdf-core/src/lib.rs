//! Signature and text overlays for PDF documents
//!
//! This crate holds everything in MeshPDF that does not need a window:
//! - `overlay` / `session`: the overlay model and the editing session driving it
//! - `coords` / `zoom`: mapping between page bitmap pixels and PDF user space
//! - `signature`: freehand signature capture rasterized with tiny-skia
//! - `apply` / `merge`: flattening overlays into pages and combining files, using lopdf

pub mod apply;
pub mod config;
pub mod coords;
pub mod document;
pub mod error;
pub mod merge;
pub mod overlay;
pub mod session;
pub mod signature;
pub mod tempfiles;
pub mod zoom;

pub use apply::{apply_overlays, SaveReport, SkippedOverlay};
pub use config::EditorConfig;
pub use coords::{PageBox, PdfRect, ScreenPoint, ScreenSize, ViewTransform};
pub use document::{inspect, DocumentInfo};
pub use error::{MeshPdfError, Result};
pub use merge::{combine_files, merge_documents, MergeOutcome, NamedPdf, SkippedFile};
pub use overlay::{Overlay, OverlayDefaults, OverlayId, OverlayKind, OverlaySet};
pub use session::{ClickOutcome, EditorSession, PlacementMode};
pub use signature::{PenStyle, SignatureImage, SignaturePad};
pub use tempfiles::TempFiles;
pub use zoom::{ScrollAnchor, ZoomLevel, ZoomLimits};
