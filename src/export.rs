//! Encoding and writing the downloadable image.

use crate::compositor::{Compositor, QrBitmap};
use crate::config::{FrameSpec, StudioConfig};
use crate::engine::{QrEngine, RasterFormat};
use crate::error::ExportError;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

pub const PLAIN_FILENAME: &str = "qr-pro-studio.png";
pub const FRAMED_FILENAME: &str = "qr-pro-frame.png";

pub fn default_filename(frame: &FrameSpec) -> &'static str {
    if frame.enabled {
        FRAMED_FILENAME
    } else {
        PLAIN_FILENAME
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(|e| ExportError::ExportFailed(format!("PNG encoding failed: {}", e)))?;
    Ok(bytes)
}

/// Writes `bytes` to `path` through a temporary sibling so a failed write
/// never leaves a truncated image under the final name.
pub fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let result = fs::write(&partial, bytes).and_then(|()| fs::rename(&partial, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&partial);
        return Err(ExportError::ExportFailed(format!(
            "cannot write {}: {}",
            path.display(),
            e
        )));
    }

    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// [`write_artifact`] on the blocking pool.
pub async fn persist(path: PathBuf, bytes: Vec<u8>) -> Result<(), ExportError> {
    tokio::task::spawn_blocking(move || write_artifact(&path, &bytes))
        .await
        .map_err(|e| ExportError::ExportFailed(format!("write task failed: {}", e)))?
}

/// Produces the downloadable image for `snapshot` and writes it to `output`,
/// or to the default file name when none is given.
///
/// The engine must already have rendered `snapshot`.
pub async fn export<E: QrEngine + ?Sized>(
    engine: &E,
    snapshot: &StudioConfig,
    compositor: &Compositor,
    output: Option<&Path>,
) -> Result<PathBuf, ExportError> {
    let frame = &snapshot.frame;
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(default_filename(frame)));

    if !frame.enabled {
        engine.download_direct(&path, RasterFormat::Png).await?;
        return Ok(path);
    }

    let raw = engine.raw_bitmap(RasterFormat::Png).await?;
    let bitmap = QrBitmap::load(raw).await?;
    let composite = compositor.compose(&bitmap, frame)?.into_owned();
    let target = path.clone();
    tokio::task::spawn_blocking(move || {
        let bytes = encode_png(&composite)?;
        write_artifact(&target, &bytes)
    })
    .await
    .map_err(|e| ExportError::ExportFailed(format!("write task failed: {}", e)))??;
    Ok(path)
}
