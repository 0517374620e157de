//! Stroke parameters for frame outlines.

use crate::config::FrameStyle;
use crate::geometry::EPSILON;
use tiny_skia::{LineCap, LineJoin, Stroke, StrokeDash};

/// Miter joins longer than this multiple of the stroke width become bevels.
const MITER_LIMIT: f32 = 10.0;

/// Alternating on/off lengths, measured along the path from its start.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DashPattern {
    intervals: Vec<f64>,
}

impl DashPattern {
    pub fn solid() -> Self {
        Self::default()
    }

    /// An odd number of intervals is repeated once so on/off always pair up.
    pub fn new(intervals: &[f64]) -> Self {
        if intervals.iter().any(|v| !v.is_finite() || *v < 0.0)
            || intervals.iter().sum::<f64>() <= EPSILON
        {
            return Self::solid();
        }
        let mut intervals = intervals.to_vec();
        if intervals.len() % 2 == 1 {
            intervals.extend_from_within(..);
        }
        Self { intervals }
    }

    /// The dash pattern a frame style draws with.
    pub fn for_style(style: FrameStyle, thickness: f64) -> Self {
        match style {
            FrameStyle::Dashed => Self::new(&[thickness * 2.0, thickness]),
            FrameStyle::Dotted => Self::new(&[thickness, thickness]),
            FrameStyle::Solid | FrameStyle::Double => Self::solid(),
        }
    }

    pub fn is_solid(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[f64] {
        &self.intervals
    }

    fn to_dash(&self) -> Option<StrokeDash> {
        if self.is_solid() {
            return None;
        }
        StrokeDash::new(self.intervals.iter().map(|v| *v as f32).collect(), 0.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrokeStyle {
    pub width: f64,
    pub dash: DashPattern,
}

impl StrokeStyle {
    /// Butt caps and miter joins, dashed from the start of the path.
    pub fn to_stroke(&self) -> Stroke {
        Stroke {
            width: self.width as f32,
            miter_limit: MITER_LIMIT,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            dash: self.dash.to_dash(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_styles_map_to_dash_lengths() {
        assert_eq!(
            DashPattern::for_style(FrameStyle::Dashed, 10.0).intervals(),
            &[20.0, 10.0]
        );
        assert_eq!(
            DashPattern::for_style(FrameStyle::Dotted, 4.0).intervals(),
            &[4.0, 4.0]
        );
        assert!(DashPattern::for_style(FrameStyle::Solid, 10.0).is_solid());
        assert!(DashPattern::for_style(FrameStyle::Double, 10.0).is_solid());
    }

    #[test]
    fn odd_patterns_are_doubled() {
        assert_eq!(
            DashPattern::new(&[5.0, 2.0, 1.0]).intervals(),
            &[5.0, 2.0, 1.0, 5.0, 2.0, 1.0]
        );
    }

    #[test]
    fn degenerate_patterns_are_solid() {
        assert!(DashPattern::new(&[]).is_solid());
        assert!(DashPattern::new(&[0.0, 0.0]).is_solid());
        assert!(DashPattern::new(&[3.0, -1.0]).is_solid());
        assert!(DashPattern::new(&[f64::NAN, 2.0]).is_solid());
    }

    #[test]
    fn stroke_carries_width_and_dash() {
        let solid = StrokeStyle {
            width: 10.0,
            dash: DashPattern::solid(),
        }
        .to_stroke();
        assert_eq!(solid.width, 10.0);
        assert_eq!(solid.line_cap, LineCap::Butt);
        assert_eq!(solid.line_join, LineJoin::Miter);
        assert!(solid.dash.is_none());

        let dashed = StrokeStyle {
            width: 6.0,
            dash: DashPattern::for_style(FrameStyle::Dashed, 6.0),
        }
        .to_stroke();
        assert!(dashed.dash.is_some());
    }
}
