//! Styled QR code generation with decorative frames, and QR scanning.

pub mod canvas;
pub mod color;
pub mod compositor;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod geometry;
pub mod qr;
pub mod render;
pub mod scan;
pub mod stroke;

pub use color::Color;
pub use compositor::{Compositor, QrBitmap};
pub use config::{ConfigModel, FrameSpec, FrameStyle, StudioConfig};
pub use engine::{QrEngine, RasterFormat, StyledEngine};
pub use error::{EngineError, ExportError, ScanError};
pub use export::export;
pub use geometry::PathStrategy;
