//! Coordinate transformation between screen and PDF coordinate systems
//!
//! Screen coordinates are pixels in a rendered page bitmap (top-left origin,
//! y down). PDF coordinates are user-space points (bottom-left origin, y up),
//! offset by the origin of the page's visible box.
//!
//! Pages carrying `/Rotate` are displayed turned. Screen conversions then
//! work in the unrotated display box, and [`PageBox::display_matrix`] maps
//! that space back onto the page's own user space.

use serde::{Deserialize, Serialize};

/// US Letter, used when a page carries no usable box.
pub const LETTER: PageBox = PageBox {
    x: 0.0,
    y: 0.0,
    width: 612.0,
    height: 792.0,
    rotation: 0,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }

    /// Largest size with the aspect ratio of `self` that fits inside `bounds`.
    pub fn fit_within(self, bounds: ScreenSize) -> ScreenSize {
        if self.width <= 0.0 || self.height <= 0.0 {
            return bounds;
        }
        let factor = (bounds.width / self.width).min(bounds.height / self.height);
        self.scaled(factor)
    }
}

/// Visible page box in PDF points (lower-left origin plus extent).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise display rotation in degrees: 0, 90, 180 or 270.
    #[serde(default)]
    pub rotation: u16,
}

impl PageBox {
    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// The box as it appears on screen, with the rotation applied.
    ///
    /// Rotated pages get a zero origin; their display space is mapped back
    /// with [`display_matrix`](Self::display_matrix).
    pub fn display_box(&self) -> PageBox {
        match self.rotation {
            90 | 270 => PageBox {
                x: 0.0,
                y: 0.0,
                width: self.height,
                height: self.width,
                rotation: 0,
            },
            180 => PageBox {
                x: 0.0,
                y: 0.0,
                rotation: 0,
                ..*self
            },
            _ => *self,
        }
    }

    /// Matrix taking display-box coordinates to the page's user space,
    /// or `None` when the page is not rotated.
    pub fn display_matrix(&self) -> Option<[f64; 6]> {
        let (bx, by, w, h) = (self.x, self.y, self.width, self.height);
        match self.rotation {
            90 => Some([0.0, 1.0, -1.0, 0.0, bx + w, by]),
            180 => Some([-1.0, 0.0, 0.0, -1.0, bx + w, by + h]),
            270 => Some([0.0, -1.0, 1.0, 0.0, bx, by + h]),
            _ => None,
        }
    }
}

/// Rectangle in PDF user space, anchored at its lower-left corner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PdfRect {
    /// Centre a rectangle of the given aspect ratio inside `self`, as large as fits.
    pub fn fit_aspect(&self, width: f64, height: f64) -> PdfRect {
        if width <= 0.0 || height <= 0.0 {
            return self.clone();
        }
        let factor = (self.width / width).min(self.height / height);
        let w = width * factor;
        let h = height * factor;
        PdfRect {
            x: self.x + (self.width - w) / 2.0,
            y: self.y + (self.height - h) / 2.0,
            width: w,
            height: h,
        }
    }
}

/// Convert screen coordinates inside a rendered page of `container` pixels to PDF coordinates
pub fn screen_to_pdf(
    point: ScreenPoint,
    container: ScreenSize,
    page_box: PageBox,
) -> (f64, f64) {
    let x_pct = point.x / container.width;
    let y_pct = point.y / container.height;

    // Flip Y axis
    let pdf_x = page_box.x + (x_pct * page_box.width);
    let pdf_y = page_box.y + (page_box.height - (y_pct * page_box.height));

    (pdf_x, pdf_y)
}

/// Convert PDF coordinates to screen coordinates inside a rendered page of `container` pixels
pub fn pdf_to_screen(
    pdf_x: f64,
    pdf_y: f64,
    container: ScreenSize,
    page_box: PageBox,
) -> ScreenPoint {
    let x_pct = (pdf_x - page_box.x) / page_box.width;
    let y_pct = 1.0 - ((pdf_y - page_box.y) / page_box.height);

    ScreenPoint::new(x_pct * container.width, y_pct * container.height)
}

/// How a page is currently displayed: rasterization scale times user zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub render_scale: f64,
    pub zoom: f64,
}

impl ViewTransform {
    pub fn new(render_scale: f64, zoom: f64) -> Self {
        Self { render_scale, zoom }
    }

    pub fn pixels_per_point(&self) -> f64 {
        self.render_scale * self.zoom
    }

    pub fn to_pdf_length(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_point()
    }

    pub fn to_screen_length(&self, points: f64) -> f64 {
        points * self.pixels_per_point()
    }

    /// Pixel size of a page bitmap rendered with this transform.
    pub fn page_pixel_size(&self, page_box: PageBox) -> ScreenSize {
        let shown = page_box.display_box();
        ScreenSize::new(
            self.to_screen_length(shown.width),
            self.to_screen_length(shown.height),
        )
    }

    /// Screen point to display-box coordinates.
    pub fn to_pdf_point(&self, point: ScreenPoint, page_box: PageBox) -> (f64, f64) {
        let shown = page_box.display_box();
        screen_to_pdf(point, self.page_pixel_size(shown), shown)
    }

    pub fn to_screen_point(&self, pdf_x: f64, pdf_y: f64, page_box: PageBox) -> ScreenPoint {
        let shown = page_box.display_box();
        pdf_to_screen(pdf_x, pdf_y, self.page_pixel_size(shown), shown)
    }

    /// Convert a top-left anchored screen rectangle to a lower-left anchored rectangle
    /// in display-box coordinates.
    pub fn screen_rect_to_pdf(
        &self,
        position: ScreenPoint,
        size: ScreenSize,
        page_box: PageBox,
    ) -> PdfRect {
        let (x, top) = self.to_pdf_point(position, page_box);
        let width = self.to_pdf_length(size.width);
        let height = self.to_pdf_length(size.height);
        PdfRect {
            x,
            y: top - height,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter_at(scale: f64) -> (ScreenSize, PageBox) {
        (ScreenSize::new(612.0 * scale, 792.0 * scale), LETTER)
    }

    #[test]
    fn test_screen_to_pdf_center() {
        let page_box = LETTER;
        let (pdf_x, pdf_y) =
            screen_to_pdf(ScreenPoint::new(300.0, 396.0), ScreenSize::new(600.0, 792.0), page_box);
        assert!((pdf_x - 306.0).abs() < 0.1);
        assert!((pdf_y - 396.0).abs() < 0.1);
    }

    #[test]
    fn test_corners() {
        let container = ScreenSize::new(600.0, 800.0);

        // Top-left screen (0, 0) should map to top-left PDF (0, 792)
        let (x, y) = screen_to_pdf(ScreenPoint::new(0.0, 0.0), container, LETTER);
        assert!((x - 0.0).abs() < 0.1);
        assert!((y - 792.0).abs() < 0.1);

        // Bottom-right screen should map to bottom-right PDF
        let (x, y) = screen_to_pdf(
            ScreenPoint::new(container.width, container.height),
            container,
            LETTER,
        );
        assert!((x - 612.0).abs() < 0.1);
        assert!((y - 0.0).abs() < 0.1);
    }

    #[test]
    fn test_y_axis_flip() {
        let (container, page_box) = letter_at(1.0);
        let screen = pdf_to_screen(0.0, 100.0, container, page_box);
        assert!((screen.y - 692.0).abs() < 1e-9);
    }

    #[test]
    fn test_view_transform_default_render_scale() {
        let transform = ViewTransform::new(2.0, 1.0);
        assert_eq!(transform.pixels_per_point(), 2.0);
        let size = transform.page_pixel_size(LETTER);
        assert_eq!(size, ScreenSize::new(1224.0, 1584.0));
    }

    #[test]
    fn test_screen_rect_to_pdf_flips_and_scales() {
        // 2x render, 1.5x zoom => 3 pixels per point
        let transform = ViewTransform::new(2.0, 1.5);
        let rect = transform.screen_rect_to_pdf(
            ScreenPoint::new(300.0, 600.0),
            ScreenSize::new(150.0, 60.0),
            LETTER,
        );
        assert!((rect.x - 100.0).abs() < 1e-9);
        assert!((rect.width - 50.0).abs() < 1e-9);
        assert!((rect.height - 20.0).abs() < 1e-9);
        // top edge at 792 - 200 = 592, so lower-left y = 572
        assert!((rect.y - 572.0).abs() < 1e-9);
    }

    #[test]
    fn test_screen_rect_respects_box_origin() {
        let page_box = PageBox {
            x: 20.0,
            y: 30.0,
            width: 500.0,
            height: 700.0,
            rotation: 0,
        };
        let transform = ViewTransform::new(1.0, 1.0);
        let rect = transform.screen_rect_to_pdf(
            ScreenPoint::new(0.0, 0.0),
            ScreenSize::new(10.0, 10.0),
            page_box,
        );
        assert_eq!(rect.x, 20.0);
        assert_eq!(rect.y, 720.0);
    }

    #[test]
    fn test_rotated_page_is_laid_out_landscape() {
        let rotated = PageBox {
            rotation: 90,
            ..LETTER
        };
        let transform = ViewTransform::new(2.0, 1.0);
        assert_eq!(
            transform.page_pixel_size(rotated),
            ScreenSize::new(1584.0, 1224.0)
        );

        // Bottom-right of the landscape view lands in the lower-left corner of the display box
        let rect = transform.screen_rect_to_pdf(
            ScreenPoint::new(1484.0, 1124.0),
            ScreenSize::new(100.0, 100.0),
            rotated,
        );
        assert!((rect.x - 742.0).abs() < 1e-9);
        assert!(rect.y.abs() < 1e-9);
    }

    #[test]
    fn test_display_matrix_maps_display_corners_onto_page() {
        let page = PageBox {
            x: 10.0,
            y: 20.0,
            width: 600.0,
            height: 800.0,
            rotation: 0,
        };
        assert_eq!(page.display_matrix(), None);

        let apply = |m: [f64; 6], x: f64, y: f64| {
            (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
        };
        for rotation in [90u16, 180, 270] {
            let rotated = PageBox { rotation, ..page };
            let shown = rotated.display_box();
            let m = rotated.display_matrix().unwrap();
            let corners = [
                apply(m, 0.0, 0.0),
                apply(m, shown.width, 0.0),
                apply(m, 0.0, shown.height),
                apply(m, shown.width, shown.height),
            ];
            for (x, y) in corners {
                assert!(x == 10.0 || x == 610.0, "{rotation}: x = {x}");
                assert!(y == 20.0 || y == 820.0, "{rotation}: y = {y}");
            }
        }

        // Top-left of a 90 degree page on screen is the page's lower-left corner
        let quarter = PageBox { rotation: 90, ..page };
        let m = quarter.display_matrix().unwrap();
        assert_eq!(apply(m, 0.0, 600.0), (10.0, 20.0));
    }

    #[test]
    fn test_fit_within_preserves_aspect() {
        let image = ScreenSize::new(380.0, 200.0);
        let fitted = image.fit_within(ScreenSize::new(200.0, 100.0));
        assert!((fitted.width - 190.0).abs() < 1e-9);
        assert!((fitted.height - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_aspect_centres_inside_rect() {
        let rect = PdfRect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        };
        let fitted = rect.fit_aspect(200.0, 100.0);
        assert_eq!(fitted.width, 100.0);
        assert_eq!(fitted.height, 50.0);
        assert_eq!(fitted.y, 25.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..2000.0
    }

    fn percentage() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }

    proptest! {
        /// Property: screen->PDF->screen roundtrip returns original coordinates
        #[test]
        fn roundtrip_screen_to_pdf_to_screen(
            container_w in dimension(),
            container_h in dimension(),
            pdf_w in dimension(),
            pdf_h in dimension(),
            x_pct in percentage(),
            y_pct in percentage(),
        ) {
            let page_box = PageBox { x: 0.0, y: 0.0, width: pdf_w, height: pdf_h, rotation: 0 };
            let container = ScreenSize::new(container_w, container_h);
            let point = ScreenPoint::new(x_pct * container_w, y_pct * container_h);

            let (pdf_x, pdf_y) = screen_to_pdf(point, container, page_box);
            let back = pdf_to_screen(pdf_x, pdf_y, container, page_box);

            let tolerance = 0.0001;
            prop_assert!((back.x - point.x).abs() < tolerance);
            prop_assert!((back.y - point.y).abs() < tolerance);
        }

        /// Property: the same relative spot maps to the same PDF point at any zoom
        #[test]
        fn zoom_preserves_pdf_location(
            pdf_w in dimension(),
            pdf_h in dimension(),
            zoom in 0.25f64..4.0,
            x_pct in percentage(),
            y_pct in percentage(),
        ) {
            let page_box = PageBox { x: 0.0, y: 0.0, width: pdf_w, height: pdf_h, rotation: 0 };
            let base = ViewTransform::new(2.0, 1.0);
            let zoomed = ViewTransform::new(2.0, zoom);

            let base_size = base.page_pixel_size(page_box);
            let zoomed_size = zoomed.page_pixel_size(page_box);

            let a = base.to_pdf_point(
                ScreenPoint::new(x_pct * base_size.width, y_pct * base_size.height),
                page_box,
            );
            let b = zoomed.to_pdf_point(
                ScreenPoint::new(x_pct * zoomed_size.width, y_pct * zoomed_size.height),
                page_box,
            );

            let tolerance = 0.0001;
            prop_assert!((a.0 - b.0).abs() < tolerance);
            prop_assert!((a.1 - b.1).abs() < tolerance);
        }

        /// Property: moving down on screen moves down in PDF space
        #[test]
        fn y_axis_movement_direction(
            container_w in dimension(),
            container_h in dimension(),
            pdf_w in dimension(),
            pdf_h in dimension(),
            y1_pct in 0.0f64..0.5,
        ) {
            let page_box = PageBox { x: 0.0, y: 0.0, width: pdf_w, height: pdf_h, rotation: 0 };
            let container = ScreenSize::new(container_w, container_h);

            let upper = ScreenPoint::new(0.0, y1_pct * container_h);
            let lower = ScreenPoint::new(0.0, (y1_pct + 0.1) * container_h);
            let (_, pdf_y1) = screen_to_pdf(upper, container, page_box);
            let (_, pdf_y2) = screen_to_pdf(lower, container, page_box);

            prop_assert!(pdf_y2 < pdf_y1);
        }

        /// Property: non-zero box origin is handled correctly in roundtrips
        #[test]
        fn offset_page_box_roundtrip(
            offset_x in 0.0f64..100.0,
            offset_y in 0.0f64..100.0,
            pdf_w in dimension(),
            pdf_h in dimension(),
            zoom in 0.25f64..4.0,
            x_pct in percentage(),
            y_pct in percentage(),
        ) {
            let page_box = PageBox {
                x: offset_x,
                y: offset_y,
                width: pdf_w,
                height: pdf_h,
                rotation: 0,
            };
            let transform = ViewTransform::new(2.0, zoom);
            let size = transform.page_pixel_size(page_box);
            let point = ScreenPoint::new(x_pct * size.width, y_pct * size.height);

            let (pdf_x, pdf_y) = transform.to_pdf_point(point, page_box);
            let back = transform.to_screen_point(pdf_x, pdf_y, page_box);

            let tolerance = 0.0001;
            prop_assert!((back.x - point.x).abs() < tolerance);
            prop_assert!((back.y - point.y).abs() < tolerance);
        }
    }
}
