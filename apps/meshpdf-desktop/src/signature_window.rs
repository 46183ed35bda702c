//! "Sign Here" window wrapping the signature pad.

use eframe::egui;
use meshpdf_core::{OverlayId, PenStyle, ScreenPoint, SignatureImage, SignaturePad};

/// What the finished signature is for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignatureTarget {
    New,
    Replace(OverlayId),
}

pub enum SignatureWindowResult {
    Open,
    Cancelled,
    Done(SignatureTarget, SignatureImage),
}

const CHECKER: f32 = 10.0;

pub struct SignatureWindow {
    pad: SignaturePad,
    target: SignatureTarget,
    warning: Option<String>,
}

impl SignatureWindow {
    pub fn new(width: u32, height: u32, pen: PenStyle, target: SignatureTarget) -> Self {
        Self {
            pad: SignaturePad::new(width, height, pen),
            target,
            warning: None,
        }
    }

    pub fn show(&mut self, ctx: &egui::Context) -> SignatureWindowResult {
        let mut result = SignatureWindowResult::Open;
        let mut open = true;

        egui::Window::new("Sign Here")
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label("Draw your signature below using your mouse or touch screen");
                });
                ui.add_space(8.0);
                self.canvas(ui);

                if let Some(warning) = &self.warning {
                    ui.colored_label(egui::Color32::from_rgb(200, 80, 0), warning);
                }

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Clear").clicked() {
                        self.pad.clear();
                        self.warning = None;
                    }
                    if ui.button("Cancel").clicked() {
                        result = SignatureWindowResult::Cancelled;
                    }
                    let done = egui::Button::new(
                        egui::RichText::new("Done").strong().color(egui::Color32::WHITE),
                    )
                    .fill(egui::Color32::from_rgb(0x4C, 0xAF, 0x50));
                    if ui.add(done).clicked() {
                        match self.pad.finish() {
                            Ok(image) => result = SignatureWindowResult::Done(self.target, image),
                            Err(e) => self.warning = Some(e.to_string()),
                        }
                    }
                });
            });

        if !open {
            result = SignatureWindowResult::Cancelled;
        }
        result
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let size = self.pad.size();
        let (response, painter) = ui.allocate_painter(
            egui::vec2(size.width as f32, size.height as f32),
            egui::Sense::click_and_drag(),
        );
        let rect = response.rect;
        let to_pad = |pos: egui::Pos2| {
            let local = pos - rect.min;
            ScreenPoint::new(local.x as f64, local.y as f64)
        };

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.pad.begin_stroke(to_pad(pos));
            }
        } else if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.pad.extend_stroke(to_pad(pos));
            }
        }
        if response.drag_stopped() {
            self.pad.end_stroke();
            self.warning = None;
        }
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.pad.begin_stroke(to_pad(pos));
                self.pad.end_stroke();
                self.warning = None;
            }
        }

        paint_checkerboard(&painter, rect);
        painter.rect_stroke(
            rect,
            5.0,
            egui::Stroke::new(2.0, egui::Color32::from_gray(0xcc)),
        );

        let pen = self.pad.pen();
        let color = egui::Color32::from_rgb(pen.color[0], pen.color[1], pen.color[2]);
        for stroke in self.pad.strokes() {
            let points: Vec<egui::Pos2> = stroke
                .iter()
                .map(|p| rect.min + egui::vec2(p.x as f32, p.y as f32))
                .collect();
            if let [dot] = points.as_slice() {
                painter.circle_filled(*dot, pen.width / 2.0, color);
            } else {
                painter.add(egui::Shape::line(points, egui::Stroke::new(pen.width, color)));
            }
        }
    }
}

/// Light checkerboard so transparent areas read as transparent.
fn paint_checkerboard(painter: &egui::Painter, rect: egui::Rect) {
    painter.rect_filled(rect, 5.0, egui::Color32::WHITE);
    let cols = (rect.width() / CHECKER).ceil() as usize;
    let rows = (rect.height() / CHECKER).ceil() as usize;
    for row in 0..rows {
        for col in (row % 2..cols).step_by(2) {
            let min = rect.min + egui::vec2(col as f32 * CHECKER, row as f32 * CHECKER);
            let cell = egui::Rect::from_min_size(min, egui::vec2(CHECKER, CHECKER)).intersect(rect);
            painter.rect_filled(cell, 0.0, egui::Color32::from_gray(0xf0));
        }
    }
}
