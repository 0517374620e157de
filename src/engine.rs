//! The QR styling engine: turns a configuration into a rendered bitmap.

use crate::config::StudioConfig;
use crate::error::{EngineError, ExportError};
use crate::export::{encode_png, persist};
use crate::qr::QrMatrix;
use crate::render::render_styled;
use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use qrcode::EcLevel;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

/// Raster formats the engine can hand out. Downloads are always PNG.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RasterFormat {
    #[default]
    Png,
}

impl RasterFormat {
    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            RasterFormat::Png => ImageFormat::Png,
        }
    }
}

/// A live encoder instance holding the bitmap for its latest configuration.
#[async_trait]
pub trait QrEngine: Send + Sync {
    /// Applies a new configuration and re-renders.
    async fn update(&mut self, config: Arc<StudioConfig>) -> Result<(), EngineError>;

    /// Writes a live preview of the current symbol.
    fn render_into(&self, out: &mut dyn Write) -> io::Result<()>;

    /// The current bitmap as encoded bytes.
    async fn raw_bitmap(&self, format: RasterFormat) -> Result<Vec<u8>, ExportError>;

    /// Saves the current bitmap as-is.
    async fn download_direct(&self, path: &Path, format: RasterFormat) -> Result<(), ExportError>;
}

/// Renders with the `qrcode` matrix and the styling in [`crate::render`].
pub struct StyledEngine {
    ec_level: EcLevel,
    config: Arc<StudioConfig>,
    matrix: Option<QrMatrix>,
    bitmap: Option<Arc<RgbaImage>>,
}

impl StyledEngine {
    pub async fn create(config: Arc<StudioConfig>, ec_level: EcLevel) -> Result<Self, EngineError> {
        let mut engine = Self {
            ec_level,
            config: Arc::clone(&config),
            matrix: None,
            bitmap: None,
        };
        engine.update(config).await?;
        Ok(engine)
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn bitmap(&self) -> Option<&RgbaImage> {
        self.bitmap.as_deref()
    }

    fn render(
        config: &StudioConfig,
        ec_level: EcLevel,
    ) -> Result<(QrMatrix, RgbaImage), EngineError> {
        let matrix = QrMatrix::encode(&config.data, ec_level).map_err(EngineError::Encode)?;

        let logo = match &config.logo {
            Some(path) => Some(
                image::open(path)
                    .map_err(|source| EngineError::Logo {
                        path: path.clone(),
                        source,
                    })?
                    .to_rgba8(),
            ),
            None => None,
        };

        let bitmap = render_styled(&matrix, config, logo.as_ref()).ok_or(EngineError::TooSmall {
            width: config.width,
            height: config.height,
            modules: matrix.width(),
        })?;
        Ok((matrix, bitmap))
    }
}

#[async_trait]
impl QrEngine for StyledEngine {
    async fn update(&mut self, config: Arc<StudioConfig>) -> Result<(), EngineError> {
        // The previous bitmap never outlives a configuration change.
        self.bitmap = None;
        self.matrix = None;
        self.config = Arc::clone(&config);

        let ec_level = self.ec_level;
        let (matrix, bitmap) =
            tokio::task::spawn_blocking(move || Self::render(&config, ec_level))
                .await
                .map_err(|e| EngineError::Task(e.to_string()))??;

        log::debug!(
            "Rendered {} modules into {}x{} bitmap",
            matrix.width(),
            bitmap.width(),
            bitmap.height()
        );
        self.matrix = Some(matrix);
        self.bitmap = Some(Arc::new(bitmap));
        Ok(())
    }

    fn render_into(&self, out: &mut dyn Write) -> io::Result<()> {
        match &self.matrix {
            Some(matrix) => out.write_all(matrix.to_unicode(2).as_bytes()),
            None => writeln!(out, "(nothing rendered)"),
        }
    }

    async fn raw_bitmap(&self, format: RasterFormat) -> Result<Vec<u8>, ExportError> {
        let bitmap = self.bitmap.clone().ok_or_else(|| {
            ExportError::BitmapUnavailable("the encoder has not produced a bitmap".to_string())
        })?;
        tokio::task::spawn_blocking(move || match format {
            RasterFormat::Png => encode_png(&bitmap)
                .map_err(|e| ExportError::BitmapUnavailable(e.to_string())),
        })
        .await
        .map_err(|e| ExportError::BitmapUnavailable(format!("encode task failed: {}", e)))?
    }

    async fn download_direct(&self, path: &Path, format: RasterFormat) -> Result<(), ExportError> {
        let bytes = self.raw_bitmap(format).await?;
        persist(path.to_path_buf(), bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigModel;
    use crate::compositor::QrBitmap;

    #[tokio::test]
    async fn create_renders_default_config() {
        let engine = StyledEngine::create(Arc::new(StudioConfig::default()), EcLevel::Q)
            .await
            .unwrap();
        assert_eq!(engine.bitmap().unwrap().dimensions(), (500, 500));

        let raw = engine.raw_bitmap(RasterFormat::Png).await.unwrap();
        let bitmap = QrBitmap::decode(&raw).unwrap();
        assert_eq!(bitmap.image(), engine.bitmap().unwrap());
    }

    #[tokio::test]
    async fn update_replaces_bitmap() {
        let mut model = ConfigModel::default();
        let mut engine = StyledEngine::create(model.snapshot(), EcLevel::Q)
            .await
            .unwrap();

        model.set_resolution(600);
        engine.update(model.snapshot()).await.unwrap();
        assert_eq!(engine.bitmap().unwrap().dimensions(), (600, 600));
        assert_eq!(engine.config().width, 600);
    }

    #[tokio::test]
    async fn failed_update_leaves_no_stale_bitmap() {
        let mut model = ConfigModel::default();
        let mut engine = StyledEngine::create(model.snapshot(), EcLevel::H)
            .await
            .unwrap();

        model.set_data("x".repeat(5000));
        let err = engine.update(model.snapshot()).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Encode(qrcode::types::QrError::DataTooLong)
        ));
        assert!(matches!(
            engine.raw_bitmap(RasterFormat::Png).await,
            Err(ExportError::BitmapUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn missing_logo_is_reported() {
        let mut model = ConfigModel::default();
        model.set_logo("/definitely/not/here.png");
        let err = StyledEngine::create(model.snapshot(), EcLevel::Q)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Logo { .. }));
    }

    #[tokio::test]
    async fn download_direct_saves_the_encoded_bitmap() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StyledEngine::create(Arc::new(StudioConfig::default()), EcLevel::Q)
            .await
            .unwrap();

        let path = dir.path().join("direct.png");
        engine.download_direct(&path, RasterFormat::Png).await.unwrap();
        let saved = QrBitmap::decode(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved.image(), engine.bitmap().unwrap());
    }

    #[tokio::test]
    async fn preview_prints_blocks() {
        let engine = StyledEngine::create(Arc::new(StudioConfig::default()), EcLevel::Q)
            .await
            .unwrap();
        let mut out = Vec::new();
        engine.render_into(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains('█'));
    }

    #[test]
    fn png_is_the_only_format() {
        assert_eq!(RasterFormat::default().extension(), "png");
        assert_eq!(RasterFormat::Png.image_format(), ImageFormat::Png);
    }
}
