use crate::color::Color;
use crate::error::ExportError;
use crate::geometry::Path;
use crate::stroke::StrokeStyle;
use image::RgbaImage;
use rayon::prelude::*;
use tiny_skia::{ColorU8, Paint, Pixmap, PixmapPaint, Transform};

/// Largest surface we are willing to allocate, in pixels.
pub const MAX_CANVAS_PIXELS: u64 = 1 << 26;

/// A drawing surface created for one export and dropped after encoding.
pub struct CompositeCanvas {
    pixmap: Pixmap,
}

impl CompositeCanvas {
    /// Allocates a fully transparent surface.
    pub fn new(width: u32, height: u32) -> Result<Self, ExportError> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels == 0 || pixels > MAX_CANVAS_PIXELS {
            return Err(surface_error(width, height));
        }
        let pixmap = Pixmap::new(width, height).ok_or_else(|| surface_error(width, height))?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Replaces every pixel with `color`.
    pub fn fill(&mut self, color: Color) {
        self.pixmap.fill(color.to_skia());
    }

    /// Draws `image` with its top-left corner at `(x, y)`, source-over.
    pub fn draw_image(&mut self, image: &RgbaImage, x: u32, y: u32) -> Result<(), ExportError> {
        let source = pixmap_from_image(image)?;
        let (x, y) = match (i32::try_from(x), i32::try_from(y)) {
            (Ok(x), Ok(y)) => (x, y),
            _ => {
                return Err(ExportError::SurfaceUnavailable(format!(
                    "image offset ({}, {}) is out of range",
                    x, y
                )))
            }
        };
        self.pixmap.draw_pixmap(
            x,
            y,
            source.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(())
    }

    /// Strokes `path` in `color`, anti-aliased.
    pub fn stroke(
        &mut self,
        path: &Path,
        style: &StrokeStyle,
        color: Color,
    ) -> Result<(), ExportError> {
        let outline = path.outline().ok_or_else(|| {
            ExportError::SurfaceUnavailable("frame outline has no extent".to_string())
        })?;

        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        paint.anti_alias = true;

        self.pixmap.stroke_path(
            outline,
            &paint,
            &style.to_stroke(),
            Transform::identity(),
            None,
        );
        Ok(())
    }

    pub fn into_image(self) -> Result<RgbaImage, ExportError> {
        let (w, h) = (self.width(), self.height());
        let data: Vec<u8> = self
            .pixmap
            .pixels()
            .par_iter()
            .flat_map_iter(|px| {
                let c = px.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        RgbaImage::from_raw(w, h, data).ok_or_else(|| surface_error(w, h))
    }
}

fn surface_error(width: u32, height: u32) -> ExportError {
    ExportError::SurfaceUnavailable(format!("cannot allocate a {}x{} canvas", width, height))
}

/// Copies an RGBA image into a premultiplied pixmap.
fn pixmap_from_image(image: &RgbaImage) -> Result<Pixmap, ExportError> {
    let mut pixmap = Pixmap::new(image.width(), image.height())
        .ok_or_else(|| surface_error(image.width(), image.height()))?;
    pixmap
        .pixels_mut()
        .par_iter_mut()
        .zip(image.as_raw().par_chunks_exact(4))
        .for_each(|(dst, px)| {
            *dst = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        });
    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PathBuilder, Point};
    use crate::stroke::DashPattern;
    use image::Rgba;

    #[test]
    fn refuses_empty_and_huge_surfaces() {
        assert!(matches!(
            CompositeCanvas::new(0, 10),
            Err(ExportError::SurfaceUnavailable(_))
        ));
        assert!(matches!(
            CompositeCanvas::new(u32::MAX, u32::MAX),
            Err(ExportError::SurfaceUnavailable(_))
        ));
    }

    #[test]
    fn fill_is_opaque() {
        let mut canvas = CompositeCanvas::new(4, 3).unwrap();
        canvas.fill(Color::WHITE);
        let image = canvas.into_image().unwrap();
        assert!(image.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn drawn_image_lands_at_offset() {
        let mut canvas = CompositeCanvas::new(6, 6).unwrap();
        canvas.fill(Color::WHITE);
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        image.put_pixel(1, 1, Rgba([0, 0, 0, 0]));
        canvas.draw_image(&image, 3, 1).unwrap();
        let out = canvas.into_image().unwrap();

        assert_eq!(*out.get_pixel(3, 1), Rgba([10, 20, 30, 255]));
        assert_eq!(*out.get_pixel(4, 2), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(2, 1), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn stroke_paints_the_line_width() {
        let mut canvas = CompositeCanvas::new(20, 20).unwrap();
        canvas.fill(Color::WHITE);
        let mut builder = PathBuilder::new();
        builder.move_to(Point::new(0.0, 10.0));
        builder.line_to(Point::new(20.0, 10.0));
        let style = StrokeStyle {
            width: 4.0,
            dash: DashPattern::solid(),
        };
        canvas.stroke(&builder.finish(), &style, Color::BLACK).unwrap();
        let out = canvas.into_image().unwrap();

        assert_eq!(*out.get_pixel(10, 8), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(10, 11), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(10, 6), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(10, 13), Rgba([255, 255, 255, 255]));
    }
}
