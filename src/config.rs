//! Style and frame configuration.
//!
//! Settings are read from `~/.config/qr-studio/config.toml` when present and
//! fall back to the built-in defaults otherwise. Command-line flags are applied
//! on top through [`ConfigModel`].
//!
//! # Example TOML
//! ```toml
//! data = "https://example.com"
//! width = 800
//! height = 800
//!
//! [dots]
//! color = "#15803d"
//! kind = "classy-rounded"
//!
//! [frame]
//! enabled = true
//! style = "dashed"
//! thickness = 12
//! corner_radius = 40
//! ```

use crate::color::Color;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("frame thickness must be at least 1 pixel")]
    ZeroThickness,

    #[error("output size must be non-zero, got {width}x{height}")]
    EmptyCanvas { width: u32, height: u32 },

    #[error("logo size ratio must be in (0, 1], got {0}")]
    LogoRatio(f32),
}

#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DotKind {
    Square,
    Dots,
    #[default]
    Rounded,
    Classy,
    ClassyRounded,
    ExtraRounded,
}

#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CornerSquareKind {
    Square,
    Dot,
    #[default]
    ExtraRounded,
}

#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CornerDotKind {
    Square,
    #[default]
    Dot,
}

#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FrameStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    Double,
}

const BRAND_GREEN: Color = Color::rgb(0x15, 0x80, 0x3d);

/// Decorative border composited around the QR bitmap at export time.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct FrameSpec {
    pub enabled: bool,
    pub style: FrameStyle,
    pub color: Color,
    /// Stroke width, and the padding inserted on every side of the bitmap.
    pub thickness: u32,
    pub corner_radius: u32,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            style: FrameStyle::Solid,
            color: BRAND_GREEN,
            thickness: 10,
            corner_radius: 0,
        }
    }
}

impl FrameSpec {
    /// Corner radius actually used on a canvas of the given size: never more
    /// than half of the shorter side.
    pub fn effective_radius(&self, canvas_width: u32, canvas_height: u32) -> f64 {
        let half_short = f64::from(canvas_width.min(canvas_height)) / 2.0;
        f64::from(self.corner_radius).min(half_short)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DotsOptions {
    pub color: Color,
    pub kind: DotKind,
}

impl Default for DotsOptions {
    fn default() -> Self {
        Self {
            color: BRAND_GREEN,
            kind: DotKind::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BackgroundOptions {
    pub color: Color,
}

impl Default for BackgroundOptions {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LogoOptions {
    /// Pixels of cleared modules kept around the logo.
    pub margin: u32,
    /// Logo edge as a fraction of the drawable QR area.
    pub size_ratio: f32,
}

impl Default for LogoOptions {
    fn default() -> Self {
        Self {
            margin: 10,
            size_ratio: 0.4,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CornerSquareOptions {
    pub kind: CornerSquareKind,
    pub color: Color,
}

impl Default for CornerSquareOptions {
    fn default() -> Self {
        Self {
            kind: CornerSquareKind::default(),
            color: BRAND_GREEN,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CornerDotOptions {
    pub kind: CornerDotKind,
    pub color: Color,
}

impl Default for CornerDotOptions {
    fn default() -> Self {
        Self {
            kind: CornerDotKind::default(),
            color: BRAND_GREEN,
        }
    }
}

/// Everything the generator needs to produce one image.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StudioConfig {
    pub data: String,
    pub width: u32,
    pub height: u32,
    /// Outer margin of the QR code inside the bitmap, in pixels.
    pub margin: u32,
    pub logo: Option<PathBuf>,
    pub dots: DotsOptions,
    pub background: BackgroundOptions,
    pub logo_options: LogoOptions,
    pub corner_square: CornerSquareOptions,
    pub corner_dot: CornerDotOptions,
    pub frame: FrameSpec,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            data: "https://example.com".to_string(),
            width: 500,
            height: 500,
            margin: 0,
            logo: None,
            dots: DotsOptions::default(),
            background: BackgroundOptions::default(),
            logo_options: LogoOptions::default(),
            corner_square: CornerSquareOptions::default(),
            corner_dot: CornerDotOptions::default(),
            frame: FrameSpec::default(),
        }
    }
}

impl StudioConfig {
    /// Default config file location, if a config directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qr-studio").join("config.toml"))
    }

    /// Loads a config file. An explicit path must exist; without one the
    /// default location is tried and silently skipped when absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    log::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Rejects values that would make rendering impossible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame.thickness == 0 {
            return Err(ConfigError::ZeroThickness);
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyCanvas {
                width: self.width,
                height: self.height,
            });
        }
        let ratio = self.logo_options.size_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::LogoRatio(ratio));
        }
        Ok(())
    }

    /// Clamps values to the ranges the controls offer, warning on each change.
    pub fn clamp_to_ranges(&mut self) {
        if !(1..=50).contains(&self.frame.thickness) {
            log::warn!(
                "Frame thickness {} out of range, clamping to 1-50",
                self.frame.thickness
            );
            self.frame.thickness = self.frame.thickness.clamp(1, 50);
        }

        if self.frame.corner_radius > 100 {
            log::warn!(
                "Frame corner radius {} out of range, clamping to 0-100",
                self.frame.corner_radius
            );
            self.frame.corner_radius = 100;
        }

        for (name, value) in [("width", &mut self.width), ("height", &mut self.height)] {
            if !(500..=2000).contains(value) {
                log::warn!("Output {} {} out of range, clamping to 500-2000", name, value);
                *value = (*value).clamp(500, 2000);
            }
        }

        if self.margin > 50 {
            log::warn!("Margin {} out of range, clamping to 0-50", self.margin);
            self.margin = 50;
        }

        let ratio = self.logo_options.size_ratio;
        if !(0.2..=1.0).contains(&ratio) {
            log::warn!("Logo size {:.2} out of range, clamping to 0.2-1.0", ratio);
            self.logo_options.size_ratio = if ratio.is_nan() {
                LogoOptions::default().size_ratio
            } else {
                ratio.clamp(0.2, 1.0)
            };
        }
    }
}

/// The live configuration edited by user controls.
///
/// The rendering core only ever sees [`ConfigModel::snapshot`] copies.
#[derive(Debug, Clone, Default)]
pub struct ConfigModel {
    current: StudioConfig,
}

impl ConfigModel {
    pub fn new(config: StudioConfig) -> Self {
        Self { current: config }
    }

    pub fn current(&self) -> &StudioConfig {
        &self.current
    }

    pub fn snapshot(&self) -> Arc<StudioConfig> {
        Arc::new(self.current.clone())
    }

    pub fn set_data(&mut self, data: impl Into<String>) {
        self.current.data = data.into();
    }

    /// Recolors the data dots together with both corner layers.
    pub fn set_color(&mut self, color: Color) {
        self.current.dots.color = color;
        self.current.corner_square.color = color;
        self.current.corner_dot.color = color;
    }

    pub fn set_dot_kind(&mut self, kind: DotKind) {
        self.current.dots.kind = kind;
    }

    pub fn set_corner_square_kind(&mut self, kind: CornerSquareKind) {
        self.current.corner_square = CornerSquareOptions {
            kind,
            color: self.current.dots.color,
        };
    }

    pub fn set_corner_dot_kind(&mut self, kind: CornerDotKind) {
        self.current.corner_dot = CornerDotOptions {
            kind,
            color: self.current.dots.color,
        };
    }

    pub fn set_background(&mut self, color: Color) {
        self.current.background.color = color;
    }

    pub fn set_logo(&mut self, path: impl Into<PathBuf>) {
        self.current.logo = Some(path.into());
    }

    pub fn remove_logo(&mut self) {
        self.current.logo = None;
    }

    pub fn set_logo_size(&mut self, ratio: f32) {
        self.current.logo_options.size_ratio = ratio;
    }

    /// The output is always square.
    pub fn set_resolution(&mut self, size: u32) {
        self.current.width = size;
        self.current.height = size;
    }

    pub fn set_margin(&mut self, margin: u32) {
        self.current.margin = margin;
    }

    pub fn toggle_frame(&mut self) {
        self.current.frame.enabled = !self.current.frame.enabled;
    }

    pub fn set_frame_enabled(&mut self, enabled: bool) {
        self.current.frame.enabled = enabled;
    }

    pub fn set_frame_style(&mut self, style: FrameStyle) {
        self.current.frame.style = style;
    }

    pub fn set_frame_color(&mut self, color: Color) {
        self.current.frame.color = color;
    }

    pub fn set_frame_thickness(&mut self, thickness: u32) {
        self.current.frame.thickness = thickness;
    }

    pub fn set_frame_corner_radius(&mut self, radius: u32) {
        self.current.frame.corner_radius = radius;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_studio_preset() {
        let config = StudioConfig::default();
        assert_eq!(config.width, 500);
        assert_eq!(config.dots.kind, DotKind::Rounded);
        assert_eq!(config.corner_square.kind, CornerSquareKind::ExtraRounded);
        assert_eq!(config.corner_dot.kind, CornerDotKind::Dot);
        assert!(!config.frame.enabled);
        assert_eq!(config.frame.thickness, 10);
        assert_eq!(config.frame.color.to_string(), "#15803d");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = StudioConfig::from_toml(
            r##"
            data = "hello"

            [frame]
            enabled = true
            style = "dotted"
            color = "#ff0000"
            "##,
        )
        .unwrap();

        assert_eq!(config.data, "hello");
        assert_eq!(config.width, 500);
        assert!(config.frame.enabled);
        assert_eq!(config.frame.style, FrameStyle::Dotted);
        assert_eq!(config.frame.color, Color::rgb(255, 0, 0));
        assert_eq!(config.frame.thickness, 10);
    }

    #[test]
    fn bad_color_in_toml_is_a_parse_error() {
        let err = StudioConfig::from_toml("[dots]\ncolor = \"nope\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid color"));
    }

    #[test]
    fn validate_rejects_zero_thickness() {
        let mut config = StudioConfig::default();
        config.frame.thickness = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroThickness)));
    }

    #[test]
    fn clamp_pulls_values_into_control_ranges() {
        let mut config = StudioConfig::default();
        config.frame.thickness = 400;
        config.frame.corner_radius = 1000;
        config.width = 20;
        config.logo_options.size_ratio = 0.01;
        config.clamp_to_ranges();

        assert_eq!(config.frame.thickness, 50);
        assert_eq!(config.frame.corner_radius, 100);
        assert_eq!(config.width, 500);
        assert_eq!(config.logo_options.size_ratio, 0.2);
    }

    #[test]
    fn effective_radius_is_capped_at_half_the_short_side() {
        let frame = FrameSpec {
            corner_radius: 260,
            ..FrameSpec::default()
        };
        assert_eq!(frame.effective_radius(520, 520), 260.0);

        let frame = FrameSpec {
            corner_radius: 400,
            ..FrameSpec::default()
        };
        assert_eq!(frame.effective_radius(520, 300), 150.0);
        assert_eq!(FrameSpec::default().effective_radius(520, 520), 0.0);
    }

    #[test]
    fn color_change_recolors_corner_layers() {
        let mut model = ConfigModel::default();
        model.set_color(Color::rgb(1, 2, 3));
        let config = model.current();
        assert_eq!(config.corner_square.color, Color::rgb(1, 2, 3));
        assert_eq!(config.corner_dot.color, Color::rgb(1, 2, 3));
    }

    #[test]
    fn corner_kind_change_adopts_dot_color() {
        let mut model = ConfigModel::default();
        model.set_frame_color(Color::BLACK);
        model.current.dots.color = Color::rgb(9, 9, 9);
        model.set_corner_square_kind(CornerSquareKind::Dot);
        assert_eq!(model.current().corner_square.kind, CornerSquareKind::Dot);
        assert_eq!(model.current().corner_square.color, Color::rgb(9, 9, 9));
    }

    #[test]
    fn snapshots_are_isolated_from_later_edits() {
        let mut model = ConfigModel::default();
        let before = model.snapshot();
        model.toggle_frame();
        model.set_data("changed");
        model.set_resolution(800);

        assert!(!before.frame.enabled);
        assert_eq!(before.data, "https://example.com");
        assert!(model.current().frame.enabled);
        assert_eq!(model.current().height, 800);
    }

    #[test]
    fn logo_can_be_set_and_removed() {
        let mut model = ConfigModel::default();
        model.set_logo("logo.png");
        assert_eq!(model.current().logo.as_deref(), Some(Path::new("logo.png")));
        model.remove_logo();
        assert!(model.current().logo.is_none());
    }
}
