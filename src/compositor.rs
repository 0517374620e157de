//! Frame compositing.
//!
//! Takes the bitmap rendered by the QR engine and, when a frame is enabled,
//! places it on a larger white surface and strokes the border over its edge:
//!
//! 1. allocate `(w + 2t) x (h + 2t)` and fill it opaque white,
//! 2. draw the bitmap at `(t, t)`,
//! 3. stroke the (rounded) rectangle whose centerline runs `t / 2` in from the
//!    canvas edge. Along straight edges the stroke fills the margin band and
//!    ends at the bitmap edge; rounded corners cut into the bitmap corners.
//!
//! The three steps always run in that order on a surface owned by the call.

use crate::canvas::CompositeCanvas;
use crate::color::Color;
use crate::config::{FrameSpec, FrameStyle};
use crate::error::ExportError;
use crate::geometry::{NativeRoundRect, PathStrategy, Rect, RoundedRectBuilder};
use crate::stroke::{DashPattern, StrokeStyle};
use image::{ImageFormat, RgbaImage};
use std::borrow::Cow;

/// A decoded, immutable QR image ready to be drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct QrBitmap {
    image: RgbaImage,
}

impl QrBitmap {
    pub fn from_image(image: RgbaImage) -> Result<Self, ExportError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ExportError::BitmapUnavailable(
                "encoder produced an empty image".to_string(),
            ));
        }
        Ok(Self { image })
    }

    /// Decodes raw PNG bytes from the engine.
    pub fn decode(bytes: &[u8]) -> Result<Self, ExportError> {
        if bytes.is_empty() {
            return Err(ExportError::BitmapUnavailable(
                "encoder returned no data".to_string(),
            ));
        }
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| ExportError::BitmapUnavailable(format!("cannot decode bitmap: {}", e)))?
            .to_rgba8();
        Self::from_image(image)
    }

    /// Decodes off the async runtime. Drawing can only start once this
    /// resolves, since no other path yields a `QrBitmap` from raw bytes.
    pub async fn load(bytes: Vec<u8>) -> Result<Self, ExportError> {
        tokio::task::spawn_blocking(move || Self::decode(&bytes))
            .await
            .map_err(|e| ExportError::BitmapUnavailable(format!("decode task failed: {}", e)))?
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

pub struct Compositor {
    outline: Box<dyn RoundedRectBuilder>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            outline: Box::new(NativeRoundRect),
        }
    }
}

impl Compositor {
    pub fn new(strategy: PathStrategy) -> Self {
        Self {
            outline: strategy.builder(),
        }
    }

    /// Composites the frame around `bitmap`. A disabled frame hands the
    /// bitmap back untouched without allocating a canvas.
    pub fn compose<'a>(
        &self,
        bitmap: &'a QrBitmap,
        frame: &FrameSpec,
    ) -> Result<Cow<'a, RgbaImage>, ExportError> {
        if !frame.enabled {
            return Ok(Cow::Borrowed(bitmap.image()));
        }

        let border = frame.thickness;
        if border == 0 {
            return Err(ExportError::SurfaceUnavailable(
                "frame thickness must be at least 1".to_string(),
            ));
        }
        let padded = |side: u32| {
            border
                .checked_mul(2)
                .and_then(|b| side.checked_add(b))
                .ok_or_else(|| {
                    ExportError::SurfaceUnavailable(format!(
                        "frame of {}px does not fit around a {}px bitmap",
                        border, side
                    ))
                })
        };
        let canvas_w = padded(bitmap.width())?;
        let canvas_h = padded(bitmap.height())?;

        let mut canvas = CompositeCanvas::new(canvas_w, canvas_h)?;
        log::debug!(
            "Compositing {}x{} bitmap into {}x{} frame ({:?}, {}px)",
            bitmap.width(),
            bitmap.height(),
            canvas_w,
            canvas_h,
            frame.style,
            border
        );

        canvas.fill(Color::WHITE);
        canvas.draw_image(bitmap.image(), border, border)?;

        let t = f64::from(border);
        let outline = Rect::new(
            t / 2.0,
            t / 2.0,
            f64::from(canvas_w) - t,
            f64::from(canvas_h) - t,
        );
        let radius = frame.effective_radius(canvas_w, canvas_h);
        let path = self.outline.rounded_rect(outline, radius);

        if frame.style == FrameStyle::Double {
            log::debug!("Double frame style is drawn as a single solid stroke");
        }
        let style = StrokeStyle {
            width: t,
            dash: DashPattern::for_style(frame.style, t),
        };
        canvas.stroke(&path, &style, frame.color)?;

        Ok(Cow::Owned(canvas.into_image()?))
    }
}
