//! Zoom level and scroll anchoring
//!
//! Pages are re-rasterized whenever the zoom changes, so the view keeps the
//! scroll position as a fraction of the scroll range and restores it after
//! the new bitmaps are laid out.

use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 4.0;
pub const ZOOM_IN_FACTOR: f64 = 1.25;
pub const ZOOM_OUT_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
    pub zoom_in_factor: f64,
    pub zoom_out_factor: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: MIN_ZOOM,
            max: MAX_ZOOM,
            zoom_in_factor: ZOOM_IN_FACTOR,
            zoom_out_factor: ZOOM_OUT_FACTOR,
        }
    }
}

/// Current user zoom, always within `limits`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLevel {
    value: f64,
    limits: ZoomLimits,
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self::new(ZoomLimits::default())
    }
}

impl ZoomLevel {
    pub fn new(limits: ZoomLimits) -> Self {
        Self { value: 1.0, limits }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Multiply the zoom by `factor`, clamped. Returns the new level if it changed.
    pub fn apply_factor(&mut self, factor: f64) -> Option<f64> {
        self.set(self.value * factor)
    }

    pub fn zoom_in(&mut self) -> Option<f64> {
        self.apply_factor(self.limits.zoom_in_factor)
    }

    pub fn zoom_out(&mut self) -> Option<f64> {
        self.apply_factor(self.limits.zoom_out_factor)
    }

    pub fn reset(&mut self) -> Option<f64> {
        self.set(1.0)
    }

    pub fn set(&mut self, value: f64) -> Option<f64> {
        let clamped = value.clamp(self.limits.min, self.limits.max);
        if clamped == self.value {
            return None;
        }
        self.value = clamped;
        Some(clamped)
    }

    pub fn percent_label(&self) -> String {
        format!("{}%", (self.value * 100.0) as i64)
    }
}

/// Scroll position expressed as a fraction of each axis' scroll range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollAnchor {
    pub horizontal: f64,
    pub vertical: f64,
}

impl ScrollAnchor {
    pub fn capture(h_value: f64, h_max: f64, v_value: f64, v_max: f64) -> Self {
        let relative = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };
        Self {
            horizontal: relative(h_value, h_max),
            vertical: relative(v_value, v_max),
        }
    }

    /// Absolute offsets for the new scroll ranges.
    pub fn restore(&self, h_max: f64, v_max: f64) -> (f64, f64) {
        (
            (self.horizontal * h_max).trunc(),
            (self.vertical * v_max).trunc(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_zoom_is_one() {
        let zoom = ZoomLevel::default();
        assert_eq!(zoom.value(), 1.0);
        assert_eq!(zoom.percent_label(), "100%");
    }

    #[test]
    fn test_zoom_in_and_out_steps() {
        let mut zoom = ZoomLevel::default();
        assert_eq!(zoom.zoom_in(), Some(1.25));
        assert_eq!(zoom.percent_label(), "125%");
        assert_eq!(zoom.zoom_out(), Some(1.0));
    }

    #[test]
    fn test_zoom_clamped_at_max() {
        let mut zoom = ZoomLevel::default();
        for _ in 0..20 {
            zoom.zoom_in();
        }
        assert_eq!(zoom.value(), MAX_ZOOM);
        assert_eq!(zoom.zoom_in(), None);
    }

    #[test]
    fn test_zoom_clamped_at_min() {
        let mut zoom = ZoomLevel::default();
        for _ in 0..20 {
            zoom.zoom_out();
        }
        assert_eq!(zoom.value(), MIN_ZOOM);
        assert_eq!(zoom.percent_label(), "25%");
        assert_eq!(zoom.zoom_out(), None);
    }

    #[test]
    fn test_reset_is_noop_at_one() {
        let mut zoom = ZoomLevel::default();
        assert_eq!(zoom.reset(), None);
        zoom.zoom_in();
        assert_eq!(zoom.reset(), Some(1.0));
    }

    #[test]
    fn test_scroll_anchor_restores_relative_position() {
        let anchor = ScrollAnchor::capture(50.0, 200.0, 300.0, 600.0);
        assert_eq!(anchor.horizontal, 0.25);
        assert_eq!(anchor.vertical, 0.5);
        assert_eq!(anchor.restore(400.0, 1000.0), (100.0, 500.0));
    }

    #[test]
    fn test_scroll_anchor_zero_range() {
        let anchor = ScrollAnchor::capture(10.0, 0.0, 0.0, 0.0);
        assert_eq!(anchor, ScrollAnchor::default());
    }
}
