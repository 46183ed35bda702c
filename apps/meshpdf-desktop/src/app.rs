//! Main window: toolbar, page view, overlays and modal dialogs.

use crate::dialogs;
use crate::print;
use crate::render::PageRasterizer;
use crate::signature_window::{SignatureTarget, SignatureWindow, SignatureWindowResult};
use eframe::egui;
use meshpdf_core::overlay::text_display_px;
use meshpdf_core::{
    ClickOutcome, EditorConfig, EditorSession, OverlayId, OverlayKind, PlacementMode,
    ScreenPoint, ScreenSize, ScrollAnchor, SignatureImage, ViewTransform,
};
use std::collections::HashMap;
use std::path::PathBuf;

const PAGE_SPACING: f32 = 10.0;
const TEXT_PADDING_PX: f32 = 2.0;
/// Side of the resize handle in the bottom-right corner of an overlay, in UI points.
const GRIP_SIZE: f32 = 10.0;

/// Everything the UI asks for during a frame, applied once drawing is done.
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Open,
    OpenPath(PathBuf),
    Save,
    Print,
    Sign,
    AddText,
    Combine,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    CancelMode,
    PageClicked { page: usize, point: ScreenPoint },
    Drag { id: OverlayId, dx: f64, dy: f64 },
    Resize { id: OverlayId, dw: f64, dh: f64 },
    Raise(OverlayId),
    Delete(OverlayId),
    Edit(OverlayId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MessageKind {
    Info,
    Warning,
    Error,
}

struct Message {
    title: String,
    body: String,
    kind: MessageKind,
}

enum Confirm {
    DiscardAndCombine(Vec<PathBuf>),
    SaveCopy(PathBuf),
    RedrawSignature(OverlayId),
}

enum TextTarget {
    New { page: usize, point: ScreenPoint },
    Edit(OverlayId),
}

struct TextPrompt {
    target: TextTarget,
    text: String,
}

struct PageView {
    texture: egui::TextureHandle,
    /// Bitmap size in pixels.
    size: egui::Vec2,
}

#[derive(Default)]
struct ScrollState {
    offset: egui::Vec2,
    max: egui::Vec2,
    anchor: Option<ScrollAnchor>,
    restore_ready: bool,
}

pub struct MeshPdfApp {
    session: EditorSession,
    rasterizer: Box<dyn PageRasterizer>,
    pages: Vec<PageView>,
    pages_dirty: bool,
    signature_textures: HashMap<OverlayId, egui::TextureHandle>,
    signature_window: Option<SignatureWindow>,
    text_prompt: Option<TextPrompt>,
    confirm: Option<(String, String, Confirm)>,
    messages: Vec<Message>,
    scroll: ScrollState,
    pending: Vec<Action>,
    title: String,
}

impl MeshPdfApp {
    pub fn new(
        config: EditorConfig,
        rasterizer: Box<dyn PageRasterizer>,
        initial: Option<PathBuf>,
    ) -> Self {
        tracing::info!("Using {} page rasterizer", rasterizer.name());
        Self {
            session: EditorSession::new(config),
            rasterizer,
            pages: Vec::new(),
            pages_dirty: false,
            signature_textures: HashMap::new(),
            signature_window: None,
            text_prompt: None,
            confirm: None,
            messages: Vec::new(),
            scroll: ScrollState::default(),
            pending: initial.map(Action::OpenPath).into_iter().collect(),
            title: String::new(),
        }
    }

    fn modal_open(&self) -> bool {
        self.signature_window.is_some()
            || self.text_prompt.is_some()
            || self.confirm.is_some()
            || !self.messages.is_empty()
    }

    fn info(&mut self, title: &str, body: impl Into<String>) {
        self.push_message(title, body, MessageKind::Info);
    }

    fn warn(&mut self, title: &str, body: impl Into<String>) {
        self.push_message(title, body, MessageKind::Warning);
    }

    fn error(&mut self, title: &str, body: impl Into<String>) {
        let body = body.into();
        tracing::error!("{}: {}", title, body);
        self.push_message(title, body, MessageKind::Error);
    }

    fn push_message(&mut self, title: &str, body: impl Into<String>, kind: MessageKind) {
        self.messages.push(Message {
            title: title.to_string(),
            body: body.into(),
            kind,
        });
    }

    fn require_document(&mut self, title: &str) -> bool {
        if self.session.is_open() {
            true
        } else {
            self.warn(title, "Please open a PDF file first.");
            false
        }
    }

    fn document_changed(&mut self) {
        self.pages_dirty = true;
        self.signature_textures.clear();
        self.scroll = ScrollState::default();
    }

    fn zoom_with(&mut self, step: fn(&mut EditorSession) -> Option<f64>) {
        let anchor = ScrollAnchor::capture(
            self.scroll.offset.x as f64,
            self.scroll.max.x as f64,
            self.scroll.offset.y as f64,
            self.scroll.max.y as f64,
        );
        if step(&mut self.session).is_some() {
            self.scroll.anchor = Some(anchor);
            self.scroll.restore_ready = false;
            self.pages_dirty = true;
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Open => {
                if let Some(path) = dialogs::pick_pdf() {
                    self.apply(Action::OpenPath(path));
                }
            }
            Action::OpenPath(path) => match self.session.open(&path) {
                Ok(_) => self.document_changed(),
                Err(e) => self.error("Error", dialogs::format_open_error(e)),
            },
            Action::Save => self.save(),
            Action::Print => self.print(),
            Action::Sign => {
                if self.require_document("No PDF") {
                    self.open_signature_window(SignatureTarget::New);
                }
            }
            Action::AddText => {
                if self.require_document("No PDF") && self.session.enable_text_mode().is_ok() {
                    self.info("Add Text", dialogs::TEXT_HINT);
                }
            }
            Action::Combine => {
                if let Some(paths) = dialogs::pick_pdfs_to_combine() {
                    if self.session.has_overlays() {
                        self.confirm = Some((
                            "Unsaved Changes".into(),
                            dialogs::UNSAVED_CHANGES.into(),
                            Confirm::DiscardAndCombine(paths),
                        ));
                    } else {
                        self.combine(paths);
                    }
                }
            }
            Action::ZoomIn => self.zoom_with(EditorSession::zoom_in),
            Action::ZoomOut => self.zoom_with(EditorSession::zoom_out),
            Action::ZoomReset => self.zoom_with(EditorSession::reset_zoom),
            Action::CancelMode => self.session.cancel_mode(),
            Action::PageClicked { page, point } => match self.session.click(page, point) {
                Ok(ClickOutcome::TextRequested { page, point }) => {
                    self.text_prompt = Some(TextPrompt {
                        target: TextTarget::New { page, point },
                        text: String::new(),
                    });
                }
                Ok(_) => {}
                Err(e) => self.error("Error", e.to_string()),
            },
            Action::Drag { id, dx, dy } => {
                if let Some(overlay) = self.session.overlay(id) {
                    let target =
                        ScreenPoint::new(overlay.position.x + dx, overlay.position.y + dy);
                    if let Err(e) = self.session.move_overlay(id, target) {
                        tracing::warn!("Could not move overlay {}: {}", id, e);
                    }
                }
            }
            Action::Resize { id, dw, dh } => {
                if let Some(overlay) = self.session.overlay(id) {
                    let target =
                        ScreenSize::new(overlay.size.width + dw, overlay.size.height + dh);
                    if let Err(e) = self.session.resize_overlay(id, target) {
                        tracing::warn!("Could not resize overlay {}: {}", id, e);
                    }
                }
            }
            Action::Raise(id) => self.session.bring_to_front(id),
            Action::Delete(id) => {
                if self.session.delete_overlay(id) {
                    self.signature_textures.remove(&id);
                }
            }
            Action::Edit(id) => self.edit_overlay(id),
        }
    }

    fn edit_overlay(&mut self, id: OverlayId) {
        let Some(overlay) = self.session.overlay(id) else {
            return;
        };
        match &overlay.kind {
            OverlayKind::Text { text, .. } => {
                self.text_prompt = Some(TextPrompt {
                    target: TextTarget::Edit(id),
                    text: text.clone(),
                });
            }
            OverlayKind::Signature { .. } => {
                self.confirm = Some((
                    "Edit Signature".into(),
                    "Do you want to redraw your signature?".into(),
                    Confirm::RedrawSignature(id),
                ));
            }
        }
    }

    fn open_signature_window(&mut self, target: SignatureTarget) {
        let config = self.session.config();
        self.signature_window = Some(SignatureWindow::new(
            config.signature.pad_width,
            config.signature.pad_height,
            config.pen(),
            target,
        ));
    }

    fn signature_done(&mut self, target: SignatureTarget, image: SignatureImage) {
        match target {
            SignatureTarget::New => match self.session.enable_signature_mode(image) {
                Ok(()) => self.info("Add Signature", dialogs::SIGNATURE_HINT),
                Err(e) => self.error("Error", e.to_string()),
            },
            SignatureTarget::Replace(id) => {
                if self.session.replace_signature(id, image) {
                    self.signature_textures.remove(&id);
                    tracing::info!("Signature {} updated", id);
                }
            }
        }
    }

    fn save(&mut self) {
        if !self.require_document("No PDF") {
            return;
        }
        let current = self.session.document_name().unwrap_or("document.pdf");
        let suggested = dialogs::suggested_save_name(current);
        let Some(path) = dialogs::pick_save_path(&suggested) else {
            return;
        };
        if !self.session.has_overlays() {
            self.confirm = Some((
                "No Modifications".into(),
                dialogs::NO_MODIFICATIONS.into(),
                Confirm::SaveCopy(path),
            ));
            return;
        }
        match self.session.save_to(&path) {
            Ok(report) => {
                let body = dialogs::format_save_success(&report);
                if report.skipped.is_empty() {
                    self.info("Success", body);
                } else {
                    self.warn("Saved With Problems", body);
                }
            }
            Err(e) => self.error("Error", dialogs::format_save_error(e)),
        }
    }

    fn print(&mut self) {
        if !self.require_document("Print Error") {
            return;
        }
        let result = self
            .session
            .write_print_copy()
            .map_err(anyhow::Error::from)
            .and_then(|path| print::print_pdf(&path));
        if let Err(e) = result {
            self.error("Print Error", dialogs::format_print_error(e));
        }
    }

    fn combine(&mut self, paths: Vec<PathBuf>) {
        let requested = paths.len();
        match self.session.combine(&paths) {
            Ok(outcome) => {
                self.document_changed();
                self.info("Success", dialogs::format_combine_success(requested, &outcome));
            }
            Err(e) => self.error("Error", dialogs::format_combine_error(e)),
        }
    }

    fn ensure_pages_rendered(&mut self, ctx: &egui::Context) {
        if !self.pages_dirty {
            return;
        }
        self.pages_dirty = false;
        self.pages.clear();

        let (Some(bytes), Some(info)) =
            (self.session.document_bytes(), self.session.document_info())
        else {
            return;
        };
        let scale = self.session.transform().pixels_per_point();
        match self.rasterizer.render(bytes, &info.page_boxes, scale) {
            Ok(rendered) => {
                self.pages = rendered
                    .into_iter()
                    .enumerate()
                    .map(|(index, page)| {
                        let image = egui::ColorImage::from_rgba_unmultiplied(
                            [page.width, page.height],
                            &page.rgba,
                        );
                        PageView {
                            texture: ctx.load_texture(
                                format!("page-{}", index),
                                image,
                                egui::TextureOptions::LINEAR,
                            ),
                            size: egui::vec2(page.width as f32, page.height as f32),
                        }
                    })
                    .collect();
                tracing::debug!(
                    "Rendered {} pages at {}",
                    self.pages.len(),
                    self.session.zoom_label()
                );
            }
            Err(e) => self.error("Error", format!("Failed to render PDF: {:#}", e)),
        }
    }

    fn signature_texture(
        &mut self,
        ctx: &egui::Context,
        id: OverlayId,
        image: &SignatureImage,
    ) -> egui::TextureId {
        self.signature_textures
            .entry(id)
            .or_insert_with(|| {
                let color = egui::ColorImage::from_rgba_unmultiplied(
                    [image.width() as usize, image.height() as usize],
                    image.rgba(),
                );
                let name = format!("signature-{}", id);
                ctx.load_texture(name, color, egui::TextureOptions::LINEAR)
            })
            .id()
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if self.modal_open() {
            return;
        }
        let shortcuts = [
            (egui::Key::O, Action::Open),
            (egui::Key::S, Action::Save),
            (egui::Key::P, Action::Print),
            (egui::Key::Plus, Action::ZoomIn),
            (egui::Key::Equals, Action::ZoomIn),
            (egui::Key::Minus, Action::ZoomOut),
            (egui::Key::Num0, Action::ZoomReset),
        ];
        ctx.input(|input| {
            for (key, action) in shortcuts {
                if input.modifiers.command && input.key_pressed(key) {
                    self.pending.push(action);
                }
            }
            let armed = self.session.mode() != &PlacementMode::Idle;
            if armed && input.key_pressed(egui::Key::Escape) {
                self.pending.push(Action::CancelMode);
            }
        });
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        let open = self.session.is_open();
        ui.horizontal(|ui| {
            if ui.button("📂 Open").on_hover_text("Open a PDF file").clicked() {
                self.pending.push(Action::Open);
            }
            if ui
                .add_enabled(open, egui::Button::new("💾 Save"))
                .on_hover_text("Save with signatures and text")
                .clicked()
            {
                self.pending.push(Action::Save);
            }
            if ui
                .add_enabled(open, egui::Button::new("🖨 Print"))
                .on_hover_text("Print the PDF")
                .clicked()
            {
                self.pending.push(Action::Print);
            }
            ui.separator();
            if ui
                .add_enabled(open, egui::Button::new("✍ Sign"))
                .on_hover_text("Draw and place a signature")
                .clicked()
            {
                self.pending.push(Action::Sign);
            }
            if ui
                .add_enabled(open, egui::Button::new("📝 Text"))
                .on_hover_text("Place a text label")
                .clicked()
            {
                self.pending.push(Action::AddText);
            }
            if ui
                .button("📑 Combine")
                .on_hover_text("Combine multiple PDFs into one (files merged in selection order)")
                .clicked()
            {
                self.pending.push(Action::Combine);
            }
            ui.separator();
            let zoom_buttons = [
                ("🔍+", "Zoom in", Action::ZoomIn),
                ("🔍-", "Zoom out", Action::ZoomOut),
                ("🔍↺", "Reset zoom", Action::ZoomReset),
            ];
            for (label, hint, action) in zoom_buttons {
                if ui
                    .add_enabled(open, egui::Button::new(label))
                    .on_hover_text(hint)
                    .clicked()
                {
                    self.pending.push(action);
                }
            }
            ui.label(self.session.zoom_label());

            match self.session.mode() {
                PlacementMode::Signature(_) => {
                    ui.separator();
                    ui.label("Click a page to place the signature (Esc to cancel)");
                }
                PlacementMode::Text => {
                    ui.separator();
                    ui.label("Click a page to add text (Esc to cancel)");
                }
                PlacementMode::Idle => {}
            }
        });
    }

    fn page_view(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let px_to_pt = 1.0 / ctx.pixels_per_point();
        let mut area = egui::ScrollArea::both().auto_shrink([false, false]);
        if self.scroll.restore_ready {
            if let Some(anchor) = self.scroll.anchor.take() {
                let max = self.scroll.max;
                let (x, y) = anchor.restore(max.x as f64, max.y as f64);
                area = area.scroll_offset(egui::vec2(x as f32, y as f32));
            }
            self.scroll.restore_ready = false;
        }

        let output = area.show(ui, |ui| {
            ui.vertical_centered(|ui| {
                for page in 0..self.pages.len() {
                    self.page(ctx, ui, page, px_to_pt);
                    ui.add_space(PAGE_SPACING);
                }
            });
        });

        self.scroll.offset = output.state.offset;
        self.scroll.max = (output.content_size - output.inner_rect.size()).max(egui::Vec2::ZERO);
        if self.scroll.anchor.is_some() && !self.pages_dirty {
            self.scroll.restore_ready = true;
            ctx.request_repaint();
        }
    }

    fn page(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, page: usize, px_to_pt: f32) {
        let (texture_id, size) = {
            let view = &self.pages[page];
            (view.texture.id(), view.size)
        };
        let (rect, response) = ui.allocate_exact_size(size * px_to_pt, egui::Sense::click());
        let painter = ui.painter_at(rect);
        painter.image(
            texture_id,
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        match self.session.mode() {
            PlacementMode::Signature(_) if response.hovered() => {
                ctx.set_cursor_icon(egui::CursorIcon::Crosshair)
            }
            PlacementMode::Text if response.hovered() => {
                ctx.set_cursor_icon(egui::CursorIcon::Text)
            }
            _ => {}
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let local = (pos - rect.min) / px_to_pt;
                self.pending.push(Action::PageClicked {
                    page,
                    point: ScreenPoint::new(local.x as f64, local.y as f64),
                });
            }
        }

        let render_scale = self.session.config().view.render_scale;
        let min_px = self.session.config().text.min_display_font_px;
        let overlays: Vec<_> = self
            .session
            .overlays()
            .for_page(page)
            .into_iter()
            .cloned()
            .collect();

        for overlay in overlays {
            let offset = egui::vec2(overlay.position.x as f32, overlay.position.y as f32);
            let extent = egui::vec2(overlay.size.width as f32, overlay.size.height as f32);
            let orect = egui::Rect::from_min_size(rect.min + offset * px_to_pt, extent * px_to_pt);

            match &overlay.kind {
                OverlayKind::Signature { image } => {
                    let texture = self.signature_texture(ctx, overlay.id, image);
                    let fitted = fit_rect(orect, image.width() as f32, image.height() as f32);
                    painter.image(
                        texture,
                        fitted,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }
                OverlayKind::Text { text, font_size } => {
                    let recorded = ViewTransform::new(render_scale, overlay.zoom);
                    let font_px = text_display_px(*font_size, recorded, min_px);
                    painter.rect(
                        orect,
                        0.0,
                        egui::Color32::from_rgba_unmultiplied(255, 255, 255, 200),
                        egui::Stroke::new(1.0, egui::Color32::from_rgba_unmultiplied(0, 0, 0, 50)),
                    );
                    painter.text(
                        orect.min + egui::vec2(TEXT_PADDING_PX, TEXT_PADDING_PX) * px_to_pt,
                        egui::Align2::LEFT_TOP,
                        text,
                        egui::FontId::proportional(font_px as f32 * px_to_pt),
                        egui::Color32::BLACK,
                    );
                }
            }

            let handle = ui.interact(
                orect,
                egui::Id::new(("overlay", overlay.id)),
                egui::Sense::click_and_drag(),
            );
            if handle.hovered() {
                ctx.set_cursor_icon(egui::CursorIcon::Grab);
            }
            if handle.drag_started() {
                self.pending.push(Action::Raise(overlay.id));
            }
            if handle.dragged() {
                ctx.set_cursor_icon(egui::CursorIcon::Grabbing);
                let delta = handle.drag_delta() / px_to_pt;
                if delta != egui::Vec2::ZERO {
                    self.pending.push(Action::Drag {
                        id: overlay.id,
                        dx: delta.x as f64,
                        dy: delta.y as f64,
                    });
                }
            }
            if handle.double_clicked() {
                self.pending.push(Action::Edit(overlay.id));
            }
            let id = overlay.id;
            handle.context_menu(|ui| {
                if ui.button("🗑 Delete").clicked() {
                    self.pending.push(Action::Delete(id));
                    ui.close_menu();
                }
                if ui.button("✏ Edit").clicked() {
                    self.pending.push(Action::Edit(id));
                    ui.close_menu();
                }
            });

            // Registered after the body so the corner wins over dragging
            let grip = grip_rect(orect, GRIP_SIZE);
            let corner = ui.interact(grip, egui::Id::new(("resize", id)), egui::Sense::drag());
            let stroke = egui::Stroke::new(1.0, egui::Color32::from_gray(90));
            if corner.hovered() || corner.dragged() {
                ctx.set_cursor_icon(egui::CursorIcon::ResizeNwSe);
                painter.rect_filled(grip, 0.0, egui::Color32::from_white_alpha(180));
            }
            painter.line_segment([grip.left_bottom(), grip.right_top()], stroke);
            if corner.drag_started() {
                self.pending.push(Action::Raise(id));
            }
            if corner.dragged() {
                let delta = corner.drag_delta() / px_to_pt;
                if delta != egui::Vec2::ZERO {
                    self.pending.push(Action::Resize {
                        id,
                        dw: delta.x as f64,
                        dh: delta.y as f64,
                    });
                }
            }
        }
    }

    fn show_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(window) = self.signature_window.as_mut() {
            match window.show(ctx) {
                SignatureWindowResult::Open => {}
                SignatureWindowResult::Cancelled => self.signature_window = None,
                SignatureWindowResult::Done(target, image) => {
                    self.signature_window = None;
                    self.signature_done(target, image);
                }
            }
        }

        if let Some(prompt) = self.text_prompt.as_mut() {
            let (title, label) = match prompt.target {
                TextTarget::New { .. } => ("Add Text", "Enter your text:"),
                TextTarget::Edit(_) => ("Edit Text", "Edit your text:"),
            };
            let mut submitted = false;
            let mut cancelled = false;
            egui::Window::new(title)
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(label);
                    let edit = ui.text_edit_singleline(&mut prompt.text);
                    edit.request_focus();
                    if edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        submitted = true;
                    }
                    ui.horizontal(|ui| {
                        if ui.button("OK").clicked() {
                            submitted = true;
                        }
                        if ui.button("Cancel").clicked() {
                            cancelled = true;
                        }
                    });
                });

            if submitted || cancelled {
                if let Some(prompt) = self.text_prompt.take() {
                    if submitted && !prompt.text.is_empty() {
                        self.submit_text(prompt);
                    }
                }
            }
        }

        if let Some((title, body, _)) = &self.confirm {
            let mut answer = None;
            egui::Window::new(title.as_str())
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(body.as_str());
                    ui.horizontal(|ui| {
                        if ui.button("Yes").clicked() {
                            answer = Some(true);
                        }
                        if ui.button("No").clicked() {
                            answer = Some(false);
                        }
                    });
                });
            if let Some(yes) = answer {
                if let Some((_, _, confirm)) = self.confirm.take() {
                    if yes {
                        self.confirmed(confirm);
                    }
                }
            }
        }

        if let Some(message) = self.messages.first() {
            let mut dismissed = false;
            let color = match message.kind {
                MessageKind::Info => ui_text_color(ctx),
                MessageKind::Warning => egui::Color32::from_rgb(200, 120, 0),
                MessageKind::Error => egui::Color32::from_rgb(200, 40, 40),
            };
            egui::Window::new(message.title.as_str())
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.colored_label(color, message.body.as_str());
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            if dismissed {
                self.messages.remove(0);
            }
        }
    }

    fn submit_text(&mut self, prompt: TextPrompt) {
        match prompt.target {
            TextTarget::New { page, point } => {
                if let Err(e) = self.session.place_text(page, point, &prompt.text) {
                    self.error("Error", e.to_string());
                }
            }
            TextTarget::Edit(id) => {
                if let Err(e) = self.session.edit_text(id, &prompt.text) {
                    self.error("Error", e.to_string());
                }
            }
        }
    }

    fn confirmed(&mut self, confirm: Confirm) {
        match confirm {
            Confirm::DiscardAndCombine(paths) => self.combine(paths),
            Confirm::SaveCopy(path) => match self.session.save_to(&path) {
                Ok(_) => self.info("Success", "PDF copy saved successfully!"),
                Err(e) => self.error("Error", dialogs::format_save_error(e)),
            },
            Confirm::RedrawSignature(id) => {
                self.open_signature_window(SignatureTarget::Replace(id))
            }
        }
    }

    fn update_title(&mut self, ctx: &egui::Context) {
        let title = match self.session.document_name() {
            Some(name) => format!("MeshPDF - {}", name),
            None => "MeshPDF".to_string(),
        };
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }
    }
}

fn ui_text_color(ctx: &egui::Context) -> egui::Color32 {
    ctx.style().visuals.text_color()
}

/// Square resize handle of side `side` in the bottom-right corner of `outer`.
fn grip_rect(outer: egui::Rect, side: f32) -> egui::Rect {
    let side = side.min(outer.width()).min(outer.height());
    egui::Rect::from_min_max(outer.max - egui::vec2(side, side), outer.max)
}

/// Largest rect with the given aspect ratio centred in `outer`.
fn fit_rect(outer: egui::Rect, width: f32, height: f32) -> egui::Rect {
    if width <= 0.0 || height <= 0.0 {
        return outer;
    }
    let factor = (outer.width() / width).min(outer.height() / height);
    egui::Rect::from_center_size(outer.center(), egui::vec2(width * factor, height * factor))
}

impl eframe::App for MeshPdfApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        for action in std::mem::take(&mut self.pending) {
            self.apply(action);
        }
        self.ensure_pages_rendered(ctx);
        self.update_title(ctx);
        self.handle_shortcuts(ctx);

        let modal = self.modal_open();
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_enabled_ui(!modal, |ui| self.toolbar(ui));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.pages.is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.label("Open a PDF or combine several to get started.");
                });
                return;
            }
            ui.add_enabled_ui(!modal, |ui| self.page_view(ctx, ui));
        });

        self.show_dialogs(ctx);

        if !self.pending.is_empty() {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BlankRasterizer;
    use lopdf::{dictionary, Document, Object, Stream};

    fn one_page_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn app_with_signature() -> (MeshPdfApp, OverlayId) {
        let mut app = MeshPdfApp::new(EditorConfig::default(), Box::new(BlankRasterizer), None);
        app.session.open_bytes("page.pdf", one_page_pdf()).unwrap();
        let image = SignatureImage::from_rgba(200, 100, vec![0; 200 * 100 * 4]).unwrap();
        app.session.enable_signature_mode(image).unwrap();
        app.apply(Action::PageClicked {
            page: 0,
            point: ScreenPoint::new(300.0, 300.0),
        });
        let id = app.session.overlays().overlays()[0].id;
        (app, id)
    }

    #[test]
    fn test_corner_drag_resizes_signature() {
        let (mut app, id) = app_with_signature();
        assert_eq!(
            app.session.overlay(id).unwrap().size,
            ScreenSize::new(200.0, 100.0)
        );

        app.apply(Action::Resize {
            id,
            dw: 100.0,
            dh: 50.0,
        });
        assert_eq!(
            app.session.overlay(id).unwrap().size,
            ScreenSize::new(300.0, 150.0)
        );

        // Aspect ratio wins over a sideways-only drag
        app.apply(Action::Resize {
            id,
            dw: 100.0,
            dh: 0.0,
        });
        assert_eq!(
            app.session.overlay(id).unwrap().size,
            ScreenSize::new(300.0, 150.0)
        );
    }

    #[test]
    fn test_grip_sits_in_bottom_right_corner() {
        let outer = egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(100.0, 50.0));
        let grip = grip_rect(outer, GRIP_SIZE);
        assert_eq!(grip.max, outer.max);
        assert_eq!(grip.size(), egui::vec2(GRIP_SIZE, GRIP_SIZE));

        let tiny = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(4.0, 6.0));
        assert_eq!(grip_rect(tiny, GRIP_SIZE).size(), egui::vec2(4.0, 4.0));
    }

    #[test]
    fn test_fit_rect_keeps_aspect_and_centre() {
        let outer = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(200.0, 100.0));
        let fitted = fit_rect(outer, 100.0, 100.0);
        assert_eq!(fitted.width(), 100.0);
        assert_eq!(fitted.height(), 100.0);
        assert_eq!(fitted.center(), outer.center());
    }

    #[test]
    fn test_fit_rect_degenerate_image() {
        let outer = egui::Rect::from_min_size(egui::pos2(5.0, 5.0), egui::vec2(10.0, 10.0));
        assert_eq!(fit_rect(outer, 0.0, 3.0), outer);
    }
}
