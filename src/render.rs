//! Styled rasterization of a QR matrix.

use crate::color::Color;
use crate::config::{CornerDotKind, CornerSquareKind, DotKind, StudioConfig};
use crate::qr::QrMatrix;
use image::{imageops, ImageBuffer, RgbaImage};
use ndarray::Array2;
use rayon::prelude::*;

/// Samples per pixel along each axis.
const SUPERSAMPLE: u32 = 3;

/// Where the symbol lands inside the output bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    /// Edge length of one module in pixels.
    pub dot: u32,
    pub offset_x: u32,
    pub offset_y: u32,
    /// Edge length of the whole symbol in pixels.
    pub size: u32,
}

impl Layout {
    /// Largest whole-pixel module size that fits inside the margins, centered.
    pub fn fit(config: &StudioConfig, modules: usize) -> Option<Self> {
        let margins = config.margin.checked_mul(2)?;
        let inner_w = config.width.checked_sub(margins)?;
        let inner_h = config.height.checked_sub(margins)?;
        let dot = inner_w.min(inner_h) / u32::try_from(modules).ok()?;
        if dot == 0 {
            return None;
        }
        let size = dot * modules as u32;
        Some(Self {
            dot,
            offset_x: (config.width - size) / 2,
            offset_y: (config.height - size) / 2,
            size,
        })
    }
}

/// Placement of the logo and the modules it hides.
struct LogoPlacement {
    image: RgbaImage,
    x: u32,
    y: u32,
    /// Cleared modules, indexed `[[row, column]]`.
    hidden: Array2<bool>,
}

fn place_logo(
    logo: &RgbaImage,
    config: &StudioConfig,
    matrix: &QrMatrix,
    layout: &Layout,
) -> LogoPlacement {
    let n = matrix.width();
    let box_side = ((layout.size as f32) * config.logo_options.size_ratio).floor().max(1.0);

    // Fit inside the box, keeping the logo's aspect ratio.
    let scale = (box_side / logo.width() as f32).min(box_side / logo.height() as f32);
    let w = ((logo.width() as f32 * scale).round() as u32).max(1);
    let h = ((logo.height() as f32 * scale).round() as u32).max(1);
    let image = imageops::resize(logo, w, h, imageops::FilterType::Lanczos3);

    let x = layout.offset_x + (layout.size - w.min(layout.size)) / 2;
    let y = layout.offset_y + (layout.size - h.min(layout.size)) / 2;

    // Any module touching the logo grown by the margin is cleared.
    let m = config.logo_options.margin as i64;
    let (left, top) = (x as i64 - m, y as i64 - m);
    let (right, bottom) = ((x + w) as i64 + m, (y + h) as i64 + m);
    let dot = layout.dot as i64;

    let mut hidden = Array2::from_elem((n, n), false);
    for my in 0..n {
        for mx in 0..n {
            if matrix.finder_at(mx, my).is_some() {
                continue;
            }
            let px = layout.offset_x as i64 + mx as i64 * dot;
            let py = layout.offset_y as i64 + my as i64 * dot;
            let overlaps = px < right && px + dot > left && py < bottom && py + dot > top;
            hidden[[my, mx]] = overlaps;
        }
    }

    LogoPlacement {
        image,
        x,
        y,
        hidden,
    }
}

/// Whether the point `(u, v)` in a module's unit square lies in the dot,
/// given which orthogonal neighbors are dark.
fn dot_contains(kind: DotKind, u: f64, v: f64, neighbors: Neighbors) -> bool {
    if kind == DotKind::Square {
        return true;
    }
    if kind == DotKind::Dots {
        return (u - 0.5).powi(2) + (v - 0.5).powi(2) <= 0.25;
    }

    // Corners: top-left, top-right, bottom-right, bottom-left.
    let free = [
        !neighbors.top && !neighbors.left,
        !neighbors.top && !neighbors.right,
        !neighbors.bottom && !neighbors.right,
        !neighbors.bottom && !neighbors.left,
    ];
    let radius = |corner: usize| -> f64 {
        if !free[corner] {
            return 0.0;
        }
        let diagonal = corner == 0 || corner == 2;
        match kind {
            DotKind::Rounded => 0.35,
            DotKind::ExtraRounded => 0.5,
            DotKind::Classy if diagonal => 0.5,
            DotKind::ClassyRounded if diagonal => 0.5,
            DotKind::ClassyRounded => 0.2,
            _ => 0.0,
        }
    };

    let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
    corners.iter().enumerate().all(|(i, &(cx, cy))| {
        let r = radius(i);
        if r <= 0.0 || (u - cx).abs() >= r || (v - cy).abs() >= r {
            return true;
        }
        let center_x = if cx == 0.0 { r } else { 1.0 - r };
        let center_y = if cy == 0.0 { r } else { 1.0 - r };
        (u - center_x).powi(2) + (v - center_y).powi(2) <= r * r
    })
}

#[derive(Clone, Copy, Debug, Default)]
struct Neighbors {
    top: bool,
    right: bool,
    bottom: bool,
    left: bool,
}

/// Signed distance to a rounded box centered on the origin.
fn rounded_box(px: f64, py: f64, half: f64, radius: f64) -> f64 {
    let qx = px.abs() - half + radius;
    let qy = py.abs() - half + radius;
    let outside = qx.max(0.0).hypot(qy.max(0.0));
    outside + qx.max(qy).min(0.0) - radius
}

/// Finder layer at local coordinates `(lx, ly)` within the 7x7 box.
fn finder_color(config: &StudioConfig, lx: f64, ly: f64) -> Option<Color> {
    let (dx, dy) = (lx - 3.5, ly - 3.5);

    let in_eye = match config.corner_dot.kind {
        CornerDotKind::Square => dx.abs().max(dy.abs()) <= 1.5,
        CornerDotKind::Dot => dx.hypot(dy) <= 1.5,
    };
    if in_eye {
        return Some(config.corner_dot.color);
    }

    let in_ring = match config.corner_square.kind {
        CornerSquareKind::Square => {
            let d = dx.abs().max(dy.abs());
            (2.5..=3.5).contains(&d)
        }
        CornerSquareKind::Dot => {
            let d = dx.hypot(dy);
            (2.5..=3.5).contains(&d)
        }
        CornerSquareKind::ExtraRounded => {
            rounded_box(dx, dy, 3.5, 2.5) <= 0.0 && rounded_box(dx, dy, 2.5, 1.5) > 0.0
        }
    };
    in_ring.then_some(config.corner_square.color)
}

/// Renders `matrix` into a `width x height` bitmap styled by `config`.
pub fn render_styled(
    matrix: &QrMatrix,
    config: &StudioConfig,
    logo: Option<&RgbaImage>,
) -> Option<RgbaImage> {
    let n = matrix.width();
    let layout = Layout::fit(config, n)?;
    let placement = logo.map(|logo| place_logo(logo, config, matrix, &layout));
    let hidden = |mx: usize, my: usize| {
        placement
            .as_ref()
            .is_some_and(|p| p.hidden[[my, mx]])
    };

    let dot = f64::from(layout.dot);
    let background = config.background.color;

    let sample = |sx: f64, sy: f64| -> Color {
        let mxf = (sx - f64::from(layout.offset_x)) / dot;
        let myf = (sy - f64::from(layout.offset_y)) / dot;
        if mxf < 0.0 || myf < 0.0 || mxf >= n as f64 || myf >= n as f64 {
            return background;
        }
        let (mx, my) = (mxf as usize, myf as usize);

        if let Some((finder, _)) = matrix.finder_at(mx, my) {
            let lx = mxf - finder.x as f64;
            let ly = myf - finder.y as f64;
            return finder_color(config, lx, ly).unwrap_or(background);
        }

        if !matrix.is_dark(mx as i64, my as i64) || hidden(mx, my) {
            return background;
        }

        let dark = |x: i64, y: i64| {
            matrix.is_dark(x, y)
                && !(x >= 0
                    && y >= 0
                    && (x as usize) < n
                    && (y as usize) < n
                    && (matrix.finder_at(x as usize, y as usize).is_some()
                        || hidden(x as usize, y as usize)))
        };
        let (x, y) = (mx as i64, my as i64);
        let neighbors = Neighbors {
            top: dark(x, y - 1),
            right: dark(x + 1, y),
            bottom: dark(x, y + 1),
            left: dark(x - 1, y),
        };

        let u = mxf - mx as f64;
        let v = myf - my as f64;
        if dot_contains(config.dots.kind, u, v, neighbors) {
            config.dots.color
        } else {
            background
        }
    };

    let (w, h) = (config.width, config.height);
    let (cols, rows) = (w as usize, h as usize);
    let total = cols.checked_mul(rows)?;
    let step = 1.0 / f64::from(SUPERSAMPLE);
    let samples = f64::from(SUPERSAMPLE * SUPERSAMPLE);

    let pixels: Vec<u8> = (0..total)
        .into_par_iter()
        .flat_map_iter(|i| {
            let x = (i % cols) as f64;
            let y = (i / cols) as f64;
            let mut acc = [0.0f64; 4];
            for j in 0..SUPERSAMPLE {
                for k in 0..SUPERSAMPLE {
                    let c = sample(
                        x + (f64::from(k) + 0.5) * step,
                        y + (f64::from(j) + 0.5) * step,
                    );
                    acc[0] += f64::from(c.r);
                    acc[1] += f64::from(c.g);
                    acc[2] += f64::from(c.b);
                    acc[3] += f64::from(c.a);
                }
            }
            acc.map(|v| (v / samples).round() as u8)
        })
        .collect();

    let mut image: RgbaImage = ImageBuffer::from_raw(w, h, pixels)?;
    if let Some(p) = placement {
        imageops::overlay(&mut image, &p.image, i64::from(p.x), i64::from(p.y));
    }
    Some(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use qrcode::EcLevel;

    fn matrix() -> QrMatrix {
        QrMatrix::encode("https://example.com", EcLevel::Q).unwrap()
    }

    #[test]
    fn layout_centers_whole_modules() {
        let config = StudioConfig::default();
        let n = matrix().width() as u32;
        let layout = Layout::fit(&config, n as usize).unwrap();
        let dot = 500 / n;
        assert_eq!(layout.dot, dot);
        assert_eq!(layout.size, dot * n);
        assert_eq!(layout.offset_x, (500 - dot * n) / 2);
        assert_eq!(layout.offset_y, layout.offset_x);

        let odd = Layout::fit(&config, 29).unwrap();
        assert_eq!((odd.dot, odd.size, odd.offset_x), (17, 493, 3));
    }

    #[test]
    fn layout_respects_margin() {
        let config = StudioConfig {
            margin: 50,
            ..StudioConfig::default()
        };
        let layout = Layout::fit(&config, 25).unwrap();
        assert_eq!(layout.dot, 16);
        assert_eq!(layout.offset_x, 50);
    }

    #[test]
    fn too_small_canvas_does_not_fit() {
        let config = StudioConfig {
            width: 20,
            height: 20,
            ..StudioConfig::default()
        };
        assert!(Layout::fit(&config, 25).is_none());
    }

    #[test]
    fn renders_requested_size_with_finder_color() {
        let mut config = StudioConfig {
            margin: 40,
            ..StudioConfig::default()
        };
        config.dots.kind = DotKind::Square;
        config.corner_square.kind = CornerSquareKind::Square;
        config.corner_dot.kind = CornerDotKind::Square;
        let m = matrix();
        let image = render_styled(&m, &config, None).unwrap();
        assert_eq!(image.dimensions(), (500, 500));

        let layout = Layout::fit(&config, m.width()).unwrap();
        assert!(layout.offset_x > 0 && layout.offset_y > 0);
        let green = Rgba([0x15, 0x80, 0x3d, 255]);
        // Middle of the top-left finder ring's first module.
        let c = layout.offset_x + layout.dot / 2;
        assert_eq!(*image.get_pixel(c, c), green);
        // Inside the light gap between ring and eye.
        let gap = layout.offset_x + layout.dot + layout.dot / 2;
        assert_eq!(*image.get_pixel(gap, gap), Rgba([255, 255, 255, 255]));
        // Outside the symbol.
        assert_eq!(*image.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn dots_shape_rounds_modules() {
        let isolated = Neighbors::default();
        assert!(dot_contains(DotKind::Dots, 0.5, 0.5, isolated));
        assert!(!dot_contains(DotKind::Dots, 0.05, 0.05, isolated));
        assert!(dot_contains(DotKind::Square, 0.05, 0.05, isolated));
        assert!(!dot_contains(DotKind::ExtraRounded, 0.05, 0.05, isolated));
    }

    #[test]
    fn connected_corners_stay_square() {
        let joined = Neighbors {
            top: true,
            left: true,
            ..Neighbors::default()
        };
        assert!(dot_contains(DotKind::Rounded, 0.02, 0.02, joined));
        assert!(!dot_contains(DotKind::Rounded, 0.98, 0.98, joined));
    }

    #[test]
    fn classy_rounds_only_diagonal_corners() {
        let isolated = Neighbors::default();
        assert!(!dot_contains(DotKind::Classy, 0.02, 0.02, isolated));
        assert!(dot_contains(DotKind::Classy, 0.98, 0.02, isolated));
        assert!(!dot_contains(DotKind::Classy, 0.98, 0.98, isolated));
        assert!(dot_contains(DotKind::Classy, 0.02, 0.98, isolated));
    }

    #[test]
    fn logo_is_drawn_in_the_center() {
        let config = StudioConfig::default();
        let logo = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let image = render_styled(&matrix(), &config, Some(&logo)).unwrap();
        assert_eq!(*image.get_pixel(250, 250), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn rendering_is_deterministic() {
        let config = StudioConfig::default();
        let m = matrix();
        assert_eq!(
            render_styled(&m, &config, None),
            render_styled(&m, &config, None)
        );
    }
}
