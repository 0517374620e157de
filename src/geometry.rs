//! Path geometry for frame outlines.
//!
//! Paths are sequences of straight and circular segments in canvas
//! coordinates (y grows downward, so a positive arc sweep runs clockwise on
//! screen). Rounded rectangles can be produced two ways, through the
//! [`PathBuilder::round_rect`] primitive or by chaining tangent arcs the way a
//! surface without that primitive would; both yield the same outline.
//!
//! Every builder call is mirrored into a [`tiny_skia::PathBuilder`], with arcs
//! emitted as cubic Béziers of at most a quarter turn each, so the finished
//! [`Path`] can be stroked directly on a pixmap.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Lengths below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn scale(self, k: f64) -> Point {
        Point::new(self.x * k, self.y * k)
    }

    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f64 {
        self.sub(other).length()
    }

    pub fn normalize(self) -> Point {
        let len = self.length();
        if len < EPSILON {
            Point::new(0.0, 0.0)
        } else {
            self.scale(1.0 / len)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Largest radius whose corner arcs do not overlap.
    pub fn clamp_radius(&self, radius: f64) -> f64 {
        let half_short = self.width.abs().min(self.height.abs()) / 2.0;
        radius.max(0.0).min(half_short)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Segment {
    Line {
        from: Point,
        to: Point,
    },
    /// Circular arc; angles in radians, `sweep` signed.
    Arc {
        center: Point,
        radius: f64,
        start: f64,
        sweep: f64,
    },
}

impl Segment {
    pub fn start(&self) -> Point {
        match *self {
            Segment::Line { from, .. } => from,
            Segment::Arc {
                center,
                radius,
                start,
                ..
            } => point_on_circle(center, radius, start),
        }
    }

    pub fn end(&self) -> Point {
        match *self {
            Segment::Line { to, .. } => to,
            Segment::Arc {
                center,
                radius,
                start,
                sweep,
            } => point_on_circle(center, radius, start + sweep),
        }
    }

    pub fn length(&self) -> f64 {
        match *self {
            Segment::Line { from, to } => from.distance(to),
            Segment::Arc { radius, sweep, .. } => radius * sweep.abs(),
        }
    }

    pub fn start_tangent(&self) -> Point {
        match *self {
            Segment::Line { from, to } => to.sub(from).normalize(),
            Segment::Arc { start, sweep, .. } => arc_tangent(start, sweep),
        }
    }
}

fn point_on_circle(center: Point, radius: f64, angle: f64) -> Point {
    Point::new(
        center.x + radius * angle.cos(),
        center.y + radius * angle.sin(),
    )
}

fn arc_tangent(angle: f64, sweep: f64) -> Point {
    let t = Point::new(-angle.sin(), angle.cos());
    if sweep >= 0.0 {
        t
    } else {
        t.scale(-1.0)
    }
}

/// A single subpath.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub segments: Vec<Segment>,
    pub closed: bool,
    outline: Option<tiny_skia::Path>,
}

impl Path {
    /// The drawable outline; `None` when the path has no extent.
    pub fn outline(&self) -> Option<&tiny_skia::Path> {
        self.outline.as_ref()
    }

    pub fn length(&self) -> f64 {
        self.segments.iter().map(Segment::length).sum()
    }

    pub fn start(&self) -> Option<Point> {
        self.segments.first().map(Segment::start)
    }

    pub fn end(&self) -> Option<Point> {
        self.segments.last().map(Segment::end)
    }

    /// Total arc length swept by the arc segments.
    pub fn arc_length(&self) -> f64 {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Arc { .. }))
            .map(Segment::length)
            .sum()
    }
}

/// Incremental path construction with canvas-style operations.
pub struct PathBuilder {
    segments: Vec<Segment>,
    current: Option<Point>,
    subpath_start: Option<Point>,
    closed: bool,
    outline: tiny_skia::PathBuilder,
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self {
            segments: Vec::new(),
            current: None,
            subpath_start: None,
            closed: false,
            outline: tiny_skia::PathBuilder::new(),
        }
    }
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, p: Point) {
        self.current = Some(p);
        self.subpath_start = Some(p);
        self.outline.move_to(p.x as f32, p.y as f32);
    }

    pub fn line_to(&mut self, p: Point) {
        match self.current {
            None => self.move_to(p),
            Some(from) => {
                if from.distance(p) > EPSILON {
                    self.segments.push(Segment::Line { from, to: p });
                    self.outline.line_to(p.x as f32, p.y as f32);
                }
                self.current = Some(p);
            }
        }
    }

    /// Arc of the given center, radius and angles, joined to the current
    /// point by a straight line.
    pub fn arc(&mut self, center: Point, radius: f64, start: f64, sweep: f64) {
        let arc = Segment::Arc {
            center,
            radius,
            start,
            sweep,
        };
        self.line_to(arc.start());
        if arc.length() > EPSILON {
            self.segments.push(arc);
            emit_arc(&mut self.outline, center, radius, start, sweep);
        }
        self.current = Some(arc.end());
    }

    /// Tangent arc through the corner at `p1` toward `p2`, as canvas
    /// `arcTo` draws it: a line to the first tangent point, then the arc.
    pub fn arc_to(&mut self, p1: Point, p2: Point, radius: f64) {
        let p0 = match self.current {
            Some(p) => p,
            None => {
                self.move_to(p1);
                p1
            }
        };

        let v1 = p0.sub(p1).normalize();
        let v2 = p2.sub(p1).normalize();
        let collinear = v1.cross(v2).abs() < EPSILON;
        if radius <= EPSILON || p0.distance(p1) < EPSILON || p1.distance(p2) < EPSILON || collinear
        {
            self.line_to(p1);
            return;
        }

        let half_angle = v1.dot(v2).clamp(-1.0, 1.0).acos() / 2.0;
        let tangent_dist = radius / half_angle.tan();
        let t1 = p1.add(v1.scale(tangent_dist));
        let t2 = p1.add(v2.scale(tangent_dist));
        let center = p1.add(v1.add(v2).normalize().scale(radius / half_angle.sin()));

        let a1 = t1.sub(center);
        let a2 = t2.sub(center);
        let start = a1.y.atan2(a1.x);
        let end = a2.y.atan2(a2.x);
        let sweep = normalize_angle(end - start);

        self.arc(center, radius, start, sweep);
        self.current = Some(t2);
    }

    /// Native rounded-rectangle primitive. Starts at `(x + r, y)` and runs
    /// clockwise; the radius is clamped so the corners never overlap.
    pub fn round_rect(&mut self, rect: Rect, radius: f64) {
        let r = rect.clamp_radius(radius);
        let Rect {
            x,
            y,
            width: w,
            height: h,
        } = rect;

        self.move_to(Point::new(x + r, y));
        self.line_to(Point::new(x + w - r, y));
        self.arc(Point::new(x + w - r, y + r), r, -FRAC_PI_2, FRAC_PI_2);
        self.line_to(Point::new(x + w, y + h - r));
        self.arc(Point::new(x + w - r, y + h - r), r, 0.0, FRAC_PI_2);
        self.line_to(Point::new(x + r, y + h));
        self.arc(Point::new(x + r, y + h - r), r, FRAC_PI_2, FRAC_PI_2);
        self.line_to(Point::new(x, y + r));
        self.arc(Point::new(x + r, y + r), r, PI, FRAC_PI_2);
        self.close();
    }

    pub fn close(&mut self) {
        if let Some(start) = self.subpath_start {
            self.line_to(start);
            self.current = Some(start);
        }
        self.outline.close();
        self.closed = true;
    }

    pub fn finish(self) -> Path {
        Path {
            segments: self.segments,
            closed: self.closed,
            outline: self.outline.finish(),
        }
    }
}

/// Appends a circular arc as cubic Béziers, one per quarter turn or less.
fn emit_arc(
    outline: &mut tiny_skia::PathBuilder,
    center: Point,
    radius: f64,
    start: f64,
    sweep: f64,
) {
    // A sweep of exactly a quarter turn must stay a single piece whichever
    // way it was computed.
    let pieces = (sweep.abs() / FRAC_PI_2 - 1e-9).ceil().max(1.0) as usize;
    let step = sweep / pieces as f64;
    let k = 4.0 / 3.0 * (step / 4.0).tan() * radius;

    let mut a = start;
    for _ in 0..pieces {
        let b = a + step;
        let p0 = point_on_circle(center, radius, a);
        let p3 = point_on_circle(center, radius, b);
        let c1 = p0.add(Point::new(-a.sin(), a.cos()).scale(k));
        let c2 = p3.sub(Point::new(-b.sin(), b.cos()).scale(k));
        outline.cubic_to(
            c1.x as f32,
            c1.y as f32,
            c2.x as f32,
            c2.y as f32,
            p3.x as f32,
            p3.y as f32,
        );
        a = b;
    }
}

/// Maps an angle into `(-PI, PI]`.
fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

/// Builds the closed outline of a rounded rectangle.
pub trait RoundedRectBuilder: Send + Sync {
    fn rounded_rect(&self, rect: Rect, radius: f64) -> Path;
}

/// Delegates to the [`PathBuilder::round_rect`] primitive.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeRoundRect;

impl RoundedRectBuilder for NativeRoundRect {
    fn rounded_rect(&self, rect: Rect, radius: f64) -> Path {
        let mut builder = PathBuilder::new();
        builder.round_rect(rect, radius);
        builder.finish()
    }
}

/// Chains four tangent arcs, for surfaces without a rounded-rect primitive.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArcToRoundRect;

impl RoundedRectBuilder for ArcToRoundRect {
    fn rounded_rect(&self, rect: Rect, radius: f64) -> Path {
        let r = rect.clamp_radius(radius);
        let Rect {
            x,
            y,
            width: w,
            height: h,
        } = rect;

        let mut builder = PathBuilder::new();
        builder.move_to(Point::new(x + r, y));
        builder.arc_to(Point::new(x + w, y), Point::new(x + w, y + h), r);
        builder.arc_to(Point::new(x + w, y + h), Point::new(x, y + h), r);
        builder.arc_to(Point::new(x, y + h), Point::new(x, y), r);
        builder.arc_to(Point::new(x, y), Point::new(x + w, y), r);
        builder.close();
        builder.finish()
    }
}

/// Which rounded-rectangle construction a target uses.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PathStrategy {
    #[default]
    Native,
    ArcTo,
}

impl PathStrategy {
    pub fn builder(self) -> Box<dyn RoundedRectBuilder> {
        match self {
            PathStrategy::Native => Box::new(NativeRoundRect),
            PathStrategy::ArcTo => Box::new(ArcToRoundRect),
        }
    }
}
