//! Preview-space geometry shared by the loader, selection and renderer.

/// A point in preview-surface coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The bounded on-screen surface the preview is drawn into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreviewSurface {
    pub width: u32,
    pub height: u32,
}

impl PreviewSurface {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width_f32(self) -> f32 {
        self.width as f32
    }

    pub fn height_f32(self) -> f32 {
        self.height as f32
    }

    /// Pulls a point onto the surface.
    pub fn clamp_point(self, point: Point) -> Point {
        Point::new(
            clamp(point.x, 0.0, self.width_f32()),
            clamp(point.y, 0.0, self.height_f32()),
        )
    }

    /// A selection spanning the whole surface.
    pub fn full_rect(self) -> SelectionRect {
        SelectionRect::new(0.0, 0.0, self.width_f32(), self.height_f32())
    }
}

/// A crop region in preview-surface coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SelectionRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SelectionRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// True when `point` lies strictly inside the rectangle.
    pub fn contains(&self, point: Point) -> bool {
        point.x > self.x && point.x < self.right() && point.y > self.y && point.y < self.bottom()
    }

    /// Whether the rectangle coincides with the whole surface, within `epsilon`
    /// on every edge.
    pub fn covers(&self, surface: PreviewSurface, epsilon: f32) -> bool {
        self.x <= epsilon
            && self.y <= epsilon
            && (surface.width_f32() - self.width).abs() <= epsilon
            && (surface.height_f32() - self.height).abs() <= epsilon
    }

    /// Whether the rectangle lies entirely on the surface.
    pub fn is_within(&self, surface: PreviewSurface, tolerance: f32) -> bool {
        self.x >= -tolerance
            && self.y >= -tolerance
            && self.right() <= surface.width_f32() + tolerance
            && self.bottom() <= surface.height_f32() + tolerance
    }
}

/// `min(max(value, lo), hi)`. Unlike `f32::clamp` this never panics when
/// `lo > hi`; `hi` wins.
pub(crate) fn clamp(value: f32, lo: f32, hi: f32) -> f32 {
    value.max(lo).min(hi)
}
