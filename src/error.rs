use thiserror::Error;

/// Failures of the generate-and-download pipeline. None of them leaves a
/// partial file behind.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("QR bitmap unavailable: {0}")]
    BitmapUnavailable(String),

    #[error("drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("export failed: {0}")]
    ExportFailed(String),
}

/// Failures of the styling engine while (re)rendering its bitmap.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot encode content: {0}")]
    Encode(#[source] qrcode::types::QrError),

    #[error("cannot load logo {}: {source}", path.display())]
    Logo {
        path: std::path::PathBuf,
        source: image::ImageError,
    },

    #[error("a {width}x{height} bitmap is too small for a {modules}-module symbol")]
    TooSmall {
        width: u32,
        height: u32,
        modules: usize,
    },

    #[error("render task failed: {0}")]
    Task(String),
}

/// Scanner failures. Decode misses are expected on most frames.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no QR code in frame: {0}")]
    Decode(String),

    #[error("scanner lifecycle error: {0}")]
    Lifecycle(String),

    #[error("camera unavailable: {0}. Grant camera permission and try again")]
    CameraUnavailable(String),

    #[error("scan mode {0:?} is not allowed by the scanner options")]
    ModeNotAllowed(crate::scan::ScanMode),
}

impl ScanError {
    /// Misses are steady-state noise and never reach the user.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ScanError::Decode(_))
    }
}
