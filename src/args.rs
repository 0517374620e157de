use clap::{Args, Parser, Subcommand, ValueEnum};
use qr_studio::color::Color;
use qr_studio::config::{ConfigModel, CornerDotKind, CornerSquareKind, DotKind, FrameStyle};
use qr_studio::geometry::PathStrategy;
use qrcode::EcLevel;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug)]
#[clap(rename_all = "UPPER")]
pub enum EcArg {
    L,
    M,
    Q,
    H,
}

impl From<EcArg> for EcLevel {
    fn from(v: EcArg) -> Self {
        match v {
            EcArg::L => EcLevel::L,
            EcArg::M => EcLevel::M,
            EcArg::Q => EcLevel::Q,
            EcArg::H => EcLevel::H,
        }
    }
}

#[derive(Parser)]
#[command(name = "qr-studio")]
#[command(about = "Generate styled QR codes with decorative frames, and scan them back")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render a QR code and save it as PNG
    Generate(GenerateArgs),
    /// Decode QR codes from image files
    Scan(ScanArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Config file (default: ~/.config/qr-studio/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Text to encode in the QR code
    #[arg(short, long)]
    pub text: Option<String>,

    /// Output image path (default: qr-pro-studio.png, or qr-pro-frame.png when framed)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Dot and corner color
    #[arg(long)]
    pub color: Option<Color>,

    #[arg(long, value_enum)]
    pub dots: Option<DotKind>,

    #[arg(long, value_enum)]
    pub corner_square: Option<CornerSquareKind>,

    #[arg(long, value_enum)]
    pub corner_dot: Option<CornerDotKind>,

    /// Background color
    #[arg(long)]
    pub background: Option<Color>,

    /// Image placed in the center of the code
    #[arg(long)]
    pub logo: Option<PathBuf>,

    /// Logo size as a fraction of the code (0.2 - 1.0)
    #[arg(long)]
    pub logo_size: Option<f32>,

    /// Output width and height in pixels (500 - 2000)
    #[arg(short, long)]
    pub size: Option<u32>,

    /// Margin around the code in pixels (0 - 50)
    #[arg(short, long)]
    pub margin: Option<u32>,

    /// Draw a border around the code
    #[arg(short, long)]
    pub frame: bool,

    #[arg(long, value_enum)]
    pub frame_style: Option<FrameStyle>,

    #[arg(long)]
    pub frame_color: Option<Color>,

    /// Border thickness in pixels (1 - 50)
    #[arg(long)]
    pub frame_thickness: Option<u32>,

    /// Border corner radius in pixels (0 - 100)
    #[arg(long)]
    pub frame_radius: Option<u32>,

    /// How rounded frame outlines are built
    #[arg(long, value_enum, default_value = "native")]
    pub path_strategy: PathStrategy,

    /// QR code error correction level (L, M, Q, H)
    #[arg(short = 'e', long, default_value = "Q")]
    pub error_correction: EcArg,

    /// Print a terminal preview of the code
    #[arg(short, long)]
    pub preview: bool,
}

impl GenerateArgs {
    /// Applies every flag that was given on top of the loaded configuration.
    pub fn apply(&self, model: &mut ConfigModel) {
        if let Some(text) = &self.text {
            model.set_data(text.clone());
        }
        if let Some(color) = self.color {
            model.set_color(color);
        }
        if let Some(kind) = self.dots {
            model.set_dot_kind(kind);
        }
        if let Some(kind) = self.corner_square {
            model.set_corner_square_kind(kind);
        }
        if let Some(kind) = self.corner_dot {
            model.set_corner_dot_kind(kind);
        }
        if let Some(color) = self.background {
            model.set_background(color);
        }
        if let Some(logo) = &self.logo {
            model.set_logo(logo.clone());
        }
        if let Some(ratio) = self.logo_size {
            model.set_logo_size(ratio);
        }
        if let Some(size) = self.size {
            model.set_resolution(size);
        }
        if let Some(margin) = self.margin {
            model.set_margin(margin);
        }
        if self.frame {
            model.set_frame_enabled(true);
        }
        if let Some(style) = self.frame_style {
            model.set_frame_style(style);
        }
        if let Some(color) = self.frame_color {
            model.set_frame_color(color);
        }
        if let Some(thickness) = self.frame_thickness {
            model.set_frame_thickness(thickness);
        }
        if let Some(radius) = self.frame_radius {
            model.set_frame_corner_radius(radius);
        }
    }
}

#[derive(Args)]
pub struct ScanArgs {
    /// Image files or directories of images, scanned in name order
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Decode attempts per second
    #[arg(long, default_value = "10")]
    pub fps: u32,

    /// Treat the images as camera frames and only decode the centered scan box
    #[arg(long)]
    pub camera_frames: bool,

    /// Do not open decoded links automatically
    #[arg(long)]
    pub no_auto_open: bool,

    /// Copy the decoded text to the clipboard
    #[arg(long)]
    pub copy: bool,

    /// Open a decoded link right away
    #[arg(long)]
    pub open: bool,

    /// Keep scanning after the first code
    #[arg(long)]
    pub continuous: bool,
}
