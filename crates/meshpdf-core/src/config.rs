//! Editor configuration
//!
//! Optional TOML file tuning the viewer, signature pad, and text defaults.
//! Every field has a default, so an absent file or an empty section is fine.

use crate::coords::ScreenSize;
use crate::overlay::OverlayDefaults;
use crate::signature::PenStyle;
use crate::zoom::{ZoomLimits, MAX_ZOOM, MIN_ZOOM, ZOOM_IN_FACTOR, ZOOM_OUT_FACTOR};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TEMP_PREFIX: &str = "meshpdf_merged_";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub view: ViewConfig,
    pub signature: SignatureConfig,
    pub text: TextConfig,
    pub files: FilesConfig,
}

/// Page rendering and zoom
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    /// Rasterization scale on top of the user zoom (2.0 renders at 144 dpi)
    pub render_scale: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_in_factor: f64,
    pub zoom_out_factor: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            zoom_in_factor: ZOOM_IN_FACTOR,
            zoom_out_factor: ZOOM_OUT_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignatureConfig {
    pub pad_width: u32,
    pub pad_height: u32,
    /// Box a new signature is fitted into at 100% zoom, in pixels
    pub box_width: f64,
    pub box_height: f64,
    pub pen_width: f32,
    pub pen_color: [u8; 3],
}

impl Default for SignatureConfig {
    fn default() -> Self {
        let pen = PenStyle::default();
        Self {
            pad_width: 380,
            pad_height: 200,
            box_width: 200.0,
            box_height: 100.0,
            pen_width: pen.width,
            pen_color: pen.color,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextConfig {
    /// Font size of new text overlays, in points
    pub default_font_size: f64,
    pub min_display_font_px: f64,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            default_font_size: 14.0,
            min_display_font_px: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilesConfig {
    pub temp_prefix: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
        }
    }
}

impl EditorConfig {
    /// `<config dir>/meshpdf/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("meshpdf").join("config.toml"))
    }

    /// Load from `explicit` if given (it must exist), else from the default
    /// location if a file is there, else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let view = &self.view;
        if view.render_scale <= 0.0 {
            bail!("view.render_scale must be positive, got {}", view.render_scale);
        }
        if view.min_zoom <= 0.0 || view.min_zoom > view.max_zoom {
            bail!(
                "view zoom bounds are invalid: min {} max {}",
                view.min_zoom,
                view.max_zoom
            );
        }
        if !(view.min_zoom..=view.max_zoom).contains(&1.0) {
            bail!("view zoom bounds must include 100%");
        }
        let out_ok = view.zoom_out_factor > 0.0 && view.zoom_out_factor < 1.0;
        if view.zoom_in_factor <= 1.0 || !out_ok {
            bail!("zoom_in_factor must be above 1 and zoom_out_factor between 0 and 1");
        }

        let sig = &self.signature;
        if sig.pad_width == 0 || sig.pad_height == 0 {
            bail!("signature pad size must be non-zero");
        }
        if sig.box_width <= 0.0 || sig.box_height <= 0.0 || sig.pen_width <= 0.0 {
            bail!("signature box and pen width must be positive");
        }

        if self.text.default_font_size <= 0.0 || self.text.min_display_font_px < 0.0 {
            bail!("text sizes must be positive");
        }
        if self.files.temp_prefix.is_empty() {
            bail!("files.temp_prefix must not be empty");
        }
        Ok(())
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits {
            min: self.view.min_zoom,
            max: self.view.max_zoom,
            zoom_in_factor: self.view.zoom_in_factor,
            zoom_out_factor: self.view.zoom_out_factor,
        }
    }

    pub fn overlay_defaults(&self) -> OverlayDefaults {
        OverlayDefaults {
            signature_box: ScreenSize::new(self.signature.box_width, self.signature.box_height),
            font_size: self.text.default_font_size,
            min_display_font_px: self.text.min_display_font_px,
        }
    }

    pub fn pen(&self) -> PenStyle {
        PenStyle {
            color: self.signature.pen_color,
            width: self.signature.pen_width,
        }
    }
}
