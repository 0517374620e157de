use qrcode::types::QrError;
use qrcode::{EcLevel, QrCode};

/// Which part of a finder pattern a module belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinderPart {
    /// The 7x7 outer square ring.
    Ring,
    /// The 3x3 center eye.
    Eye,
}

/// A finder pattern: its top-left module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Finder {
    pub x: usize,
    pub y: usize,
}

pub const FINDER_SIZE: usize = 7;

/// Dark/light module grid of an encoded symbol.
#[derive(Clone, Debug)]
pub struct QrMatrix {
    width: usize,
    modules: Vec<bool>,
}

impl QrMatrix {
    pub fn encode(text: &str, ec_level: EcLevel) -> Result<Self, QrError> {
        let code = QrCode::with_error_correction_level(text, ec_level)?;

        let width = code.width();
        let modules = code
            .to_colors()
            .into_iter()
            .map(|c| matches!(c, qrcode::Color::Dark))
            .collect();

        Ok(Self { width, modules })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Out-of-range coordinates read as light.
    pub fn is_dark(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.width {
            return false;
        }
        self.modules[y as usize * self.width + x as usize]
    }

    pub fn finders(&self) -> [Finder; 3] {
        let far = self.width - FINDER_SIZE;
        [
            Finder { x: 0, y: 0 },
            Finder { x: far, y: 0 },
            Finder { x: 0, y: far },
        ]
    }

    /// Finder pattern membership of a module, if any.
    pub fn finder_at(&self, x: usize, y: usize) -> Option<(Finder, FinderPart)> {
        self.finders().into_iter().find_map(|finder| {
            let (fx, fy) = (x.checked_sub(finder.x)?, y.checked_sub(finder.y)?);
            if fx >= FINDER_SIZE || fy >= FINDER_SIZE {
                return None;
            }
            let part = if (2..=4).contains(&fx) && (2..=4).contains(&fy) {
                FinderPart::Eye
            } else {
                FinderPart::Ring
            };
            Some((finder, part))
        })
    }

    /// Unicode half-block preview, two module rows per text line, with a
    /// quiet zone of `border` modules.
    pub fn to_unicode(&self, border: usize) -> String {
        let size = self.width as i64;
        let b = border as i64;
        let mut out = String::new();
        let mut y = -b;
        while y < size + b {
            for x in -b..size + b {
                let top = self.is_dark(x, y);
                let bottom = self.is_dark(x, y + 1);
                out.push(match (top, bottom) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                });
            }
            out.push('\n');
            y += 2;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finder_corners_are_dark() {
        let qr = QrMatrix::encode("https://example.com", EcLevel::Q).unwrap();
        let w = qr.width() as i64;
        assert!(qr.is_dark(0, 0));
        assert!(qr.is_dark(w - 1, 0));
        assert!(qr.is_dark(0, w - 1));
        assert!(!qr.is_dark(-1, 0));
        assert!(!qr.is_dark(w, w));
    }

    #[test]
    fn finder_parts_are_classified() {
        let qr = QrMatrix::encode("hello", EcLevel::L).unwrap();
        let far = qr.width() - FINDER_SIZE;

        assert_eq!(qr.finder_at(0, 0).map(|(_, p)| p), Some(FinderPart::Ring));
        assert_eq!(qr.finder_at(3, 3).map(|(_, p)| p), Some(FinderPart::Eye));
        assert_eq!(
            qr.finder_at(far + 3, 4),
            Some((Finder { x: far, y: 0 }, FinderPart::Eye))
        );
        assert_eq!(qr.finder_at(7, 7), None);
        assert_eq!(qr.finder_at(far + 3, far + 3), None);
    }

    #[test]
    fn unicode_preview_has_one_line_per_two_rows() {
        let qr = QrMatrix::encode("hello", EcLevel::L).unwrap();
        let preview = qr.to_unicode(2);
        let lines = preview.lines().count();
        assert_eq!(lines, (qr.width() + 4 + 1) / 2);
        assert!(preview.contains('█'));
    }

    #[test]
    fn oversized_input_fails() {
        let huge = "x".repeat(8000);
        assert!(matches!(
            QrMatrix::encode(&huge, EcLevel::H),
            Err(QrError::DataTooLong)
        ));
    }
}
