//! Pointer-driven selection state machine.
//!
//! A [`SelectionState`] is a plain value: every transition takes it by value
//! and returns the next one. One pointer owns a gesture from down to up;
//! events from any other pointer are dropped until it is released.

use crate::config::{CropperConfig, normalize_ratio};
use crate::geometry::{Point, PreviewSurface, SelectionRect, clamp};

/// Identity of the pointer (mouse, pen, touch contact) that produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PointerId(pub u64);

impl PointerId {
    pub const PRIMARY: PointerId = PointerId(0);
}

/// What the active gesture is doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionMode {
    /// Drawing a new rectangle from an anchor point.
    Draw,
    /// Translating the existing rectangle.
    Move,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Gesture {
    Draw { pointer: PointerId, anchor: Point },
    Move { pointer: PointerId, offset: Point },
}

impl Gesture {
    fn pointer(&self) -> PointerId {
        match *self {
            Gesture::Draw { pointer, .. } | Gesture::Move { pointer, .. } => pointer,
        }
    }
}

/// Thresholds the state machine reads from [`CropperConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionLimits {
    pub min_selection: f32,
    pub default_coverage: f32,
    pub full_cover_epsilon: f32,
}

impl From<&CropperConfig> for SelectionLimits {
    fn from(config: &CropperConfig) -> Self {
        Self {
            min_selection: config.min_selection,
            default_coverage: config.default_coverage,
            full_cover_epsilon: config.full_cover_epsilon,
        }
    }
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self::from(&CropperConfig::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionState {
    surface: PreviewSurface,
    aspect_ratio: Option<f32>,
    limits: SelectionLimits,
    selection: SelectionRect,
    gesture: Option<Gesture>,
}

impl SelectionState {
    /// A fresh state showing the default selection.
    pub fn new(surface: PreviewSurface, aspect_ratio: Option<f32>, limits: SelectionLimits) -> Self {
        let aspect_ratio = normalize_ratio(aspect_ratio);
        Self {
            surface,
            aspect_ratio,
            limits,
            selection: default_rect(surface, aspect_ratio, limits.default_coverage),
            gesture: None,
        }
    }

    pub fn surface(&self) -> PreviewSurface {
        self.surface
    }

    pub fn aspect_ratio(&self) -> Option<f32> {
        self.aspect_ratio
    }

    pub fn selection(&self) -> SelectionRect {
        self.selection
    }

    pub fn mode(&self) -> Option<InteractionMode> {
        self.gesture.map(|gesture| match gesture {
            Gesture::Draw { .. } => InteractionMode::Draw,
            Gesture::Move { .. } => InteractionMode::Move,
        })
    }

    pub fn active_pointer(&self) -> Option<PointerId> {
        self.gesture.map(|gesture| gesture.pointer())
    }

    /// True when the selection spans the whole surface and so cannot be moved.
    pub fn is_full_cover(&self) -> bool {
        self.selection
            .covers(self.surface, self.limits.full_cover_epsilon)
    }

    fn owned_by_other(&self, pointer: PointerId) -> bool {
        self.gesture.is_some_and(|gesture| gesture.pointer() != pointer)
    }

    #[must_use]
    pub fn pointer_down(self, pointer: PointerId, point: Point) -> Self {
        if self.owned_by_other(pointer) {
            log::debug!("ignoring pointer {pointer:?} down while another gesture is active");
            return self;
        }

        let point = self.surface.clamp_point(point);

        if self.selection.contains(point) && !self.is_full_cover() {
            let offset = Point::new(point.x - self.selection.x, point.y - self.selection.y);
            log::debug!("move gesture started at {point:?}");
            return Self {
                gesture: Some(Gesture::Move { pointer, offset }),
                ..self
            };
        }

        log::debug!("draw gesture started at {point:?}");
        Self {
            selection: self.build_rect(point, point),
            gesture: Some(Gesture::Draw {
                pointer,
                anchor: point,
            }),
            ..self
        }
    }

    #[must_use]
    pub fn pointer_move(self, pointer: PointerId, point: Point) -> Self {
        let Some(gesture) = self.gesture else {
            return self;
        };
        if gesture.pointer() != pointer {
            return self;
        }

        let point = self.surface.clamp_point(point);
        let selection = match gesture {
            Gesture::Move { offset, .. } => self.translated(point, offset),
            Gesture::Draw { anchor, .. } => self.build_rect(anchor, point),
        };

        Self { selection, ..self }
    }

    /// Ends the gesture. A selection smaller than the minimum on either axis
    /// was most likely a tap and is replaced by the default.
    #[must_use]
    pub fn pointer_up(self, pointer: PointerId) -> Self {
        match self.gesture {
            Some(gesture) if gesture.pointer() == pointer => {}
            _ => return self,
        }

        let released = Self {
            gesture: None,
            ..self
        };

        let min = self.limits.min_selection;
        if released.selection.width < min || released.selection.height < min {
            log::debug!(
                "selection {:?} below {min}px, restoring default",
                released.selection
            );
            return released.reset();
        }

        released
    }

    /// Pointer cancellation is handled exactly like a release.
    #[must_use]
    pub fn pointer_cancel(self, pointer: PointerId) -> Self {
        self.pointer_up(pointer)
    }

    /// Restores the centered default selection.
    #[must_use]
    pub fn reset(self) -> Self {
        Self {
            selection: default_rect(self.surface, self.aspect_ratio, self.limits.default_coverage),
            ..self
        }
    }

    /// Selects the whole surface, ignoring any aspect lock.
    #[must_use]
    pub fn fit_to_image(self) -> Self {
        Self {
            selection: self.surface.full_rect(),
            ..self
        }
    }

    /// Changes the aspect lock and resets the selection to match it.
    #[must_use]
    pub fn with_aspect_ratio(self, aspect_ratio: Option<f32>) -> Self {
        Self {
            aspect_ratio: normalize_ratio(aspect_ratio),
            ..self
        }
        .reset()
    }

    fn translated(&self, pointer: Point, offset: Point) -> SelectionRect {
        let current = self.selection;
        SelectionRect {
            x: clamp(pointer.x - offset.x, 0.0, self.surface.width_f32() - current.width),
            y: clamp(pointer.y - offset.y, 0.0, self.surface.height_f32() - current.height),
            ..current
        }
    }

    /// Rectangle spanning `anchor` towards `end`, locked and clamped.
    ///
    /// Near an edge the rectangle keeps its size and slides back onto the
    /// surface rather than shrinking into the remaining room.
    fn build_rect(&self, anchor: Point, end: Point) -> SelectionRect {
        let surface_width = self.surface.width_f32();
        let surface_height = self.surface.height_f32();
        let forward_x = end.x >= anchor.x;
        let forward_y = end.y >= anchor.y;

        let mut width = (end.x - anchor.x).abs();
        let mut height = (end.y - anchor.y).abs();

        match self.aspect_ratio {
            Some(ratio) => {
                if width <= 0.0 && height <= 0.0 {
                    width = 1.0;
                    height = 1.0 / ratio;
                } else if height <= 0.0 {
                    height = width / ratio;
                } else if width <= 0.0 {
                    width = height * ratio;
                } else if width / height > ratio {
                    width = height * ratio;
                } else {
                    height = width / ratio;
                }

                // Grow to the 1px floor without breaking the lock.
                let grow = (1.0 / width).max(1.0 / height).max(1.0);
                width *= grow;
                height *= grow;

                // Shrink only to fit the surface; the origin clamp below
                // slides the rectangle back on when it overhangs an edge.
                let fit = (surface_width / width).min(surface_height / height).min(1.0);
                width *= fit;
                height *= fit;
            }
            None => {
                width = clamp(width, 1.0, surface_width);
                height = clamp(height, 1.0, surface_height);
            }
        }

        let raw_x = if forward_x { anchor.x } else { anchor.x - width };
        let raw_y = if forward_y { anchor.y } else { anchor.y - height };

        SelectionRect {
            x: clamp(raw_x, 0.0, surface_width - width),
            y: clamp(raw_y, 0.0, surface_height - height),
            width,
            height,
        }
    }
}

/// Centered default: `coverage` of each axis, or the largest rectangle with
/// the locked ratio that fits inside that area.
pub fn default_rect(
    surface: PreviewSurface,
    aspect_ratio: Option<f32>,
    coverage: f32,
) -> SelectionRect {
    let width = surface.width_f32();
    let height = surface.height_f32();
    let max_width = width * coverage;
    let max_height = height * coverage;

    let (crop_width, crop_height) = match normalize_ratio(aspect_ratio) {
        None => (max_width, max_height),
        Some(ratio) => {
            let mut crop_width = max_width;
            let mut crop_height = crop_width / ratio;
            if crop_height > max_height {
                crop_height = max_height;
                crop_width = crop_height * ratio;
            }
            (crop_width, crop_height)
        }
    };

    SelectionRect::new(
        (width - crop_width) / 2.0,
        (height - crop_height) / 2.0,
        crop_width,
        crop_height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: PointerId = PointerId::PRIMARY;

    fn state(width: u32, height: u32, ratio: Option<f32>) -> SelectionState {
        SelectionState::new(PreviewSurface::new(width, height), ratio, SelectionLimits::default())
    }

    /// A state whose full-cover selection makes every pointer-down draw.
    fn blank(width: u32, height: u32, ratio: Option<f32>) -> SelectionState {
        state(width, height, ratio).fit_to_image()
    }

    fn assert_rect(actual: SelectionRect, expected: (f32, f32, f32, f32)) {
        let (x, y, w, h) = expected;
        let close = |a: f32, b: f32| (a - b).abs() < 1e-3;
        assert!(
            close(actual.x, x) && close(actual.y, y) && close(actual.width, w) && close(actual.height, h),
            "expected ({x}, {y}, {w}, {h}), got {actual:?}"
        );
    }

    #[test]
    fn default_covers_88_percent() {
        assert_rect(state(600, 400, None).selection(), (36.0, 24.0, 528.0, 352.0));
    }

    #[test]
    fn default_is_aspect_fitted() {
        let s = state(600, 400, Some(1.0));
        assert_rect(s.selection(), (124.0, 24.0, 352.0, 352.0));

        let wide = state(600, 400, Some(4.0));
        assert_rect(wide.selection(), (36.0, 134.0, 528.0, 132.0));
    }

    #[test]
    fn free_form_drag_spans_anchor_to_pointer() {
        let s = blank(600, 400, None)
            .pointer_down(P, Point::new(500.0, 50.0))
            .pointer_move(P, Point::new(350.0, 250.0));
        assert_eq!(s.mode(), Some(InteractionMode::Draw));
        assert_rect(s.selection(), (350.0, 50.0, 150.0, 200.0));
    }

    #[test]
    fn aspect_locked_drag_takes_the_limiting_side() {
        let s = state(600, 400, Some(1.0))
            .pointer_down(P, Point::new(0.0, 0.0))
            .pointer_move(P, Point::new(500.0, 100.0));
        assert_rect(s.selection(), (0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn aspect_locked_drag_up_and_left() {
        let s = blank(600, 400, Some(2.0))
            .pointer_down(P, Point::new(300.0, 300.0))
            .pointer_move(P, Point::new(100.0, 250.0));
        // dx = 200, dy = 50: 200 / 50 > 2, so width = 100.
        assert_rect(s.selection(), (200.0, 250.0, 100.0, 50.0));
    }

    #[test]
    fn horizontal_only_drag_slides_back_onto_surface() {
        let s = state(600, 400, Some(1.0))
            .pointer_down(P, Point::new(10.0, 350.0))
            .pointer_move(P, Point::new(210.0, 350.0));
        // Height is derived as 200 but only 50px remain below the anchor.
        assert_rect(s.selection(), (10.0, 200.0, 200.0, 200.0));
    }

    #[test]
    fn edge_anchor_slides_instead_of_collapsing() {
        for anchor_x in [599.0, 599.5, 600.0] {
            let s = blank(600, 400, Some(1.0))
                .pointer_down(P, Point::new(anchor_x, 200.0))
                .pointer_move(P, Point::new(anchor_x, 300.0));
            assert_rect(s.selection(), (500.0, 200.0, 100.0, 100.0));

            let released = s.pointer_up(P);
            assert_rect(released.selection(), (500.0, 200.0, 100.0, 100.0));
        }
    }

    #[test]
    fn oversized_locked_drag_fits_the_surface() {
        let s = blank(600, 400, Some(2.0))
            .pointer_down(P, Point::new(0.0, 0.0))
            .pointer_move(P, Point::new(600.0, 400.0));
        // 600 / 400 > 2 is false, so height = 300 and width = 600.
        assert_rect(s.selection(), (0.0, 0.0, 600.0, 300.0));

        let tall = blank(600, 400, Some(0.5))
            .pointer_down(P, Point::new(300.0, 0.0))
            .pointer_move(P, Point::new(300.0, 1000.0));
        // Pointer clamps to y = 400; width 0 derives 200, which still fits.
        assert_rect(tall.selection(), (300.0, 0.0, 200.0, 400.0));
    }

    #[test]
    fn drawing_is_seeded_with_a_tiny_rect() {
        let s = state(600, 400, None).pointer_down(P, Point::new(590.0, 10.0));
        assert_rect(s.selection(), (590.0, 10.0, 1.0, 1.0));

        let locked = state(600, 400, Some(0.5)).pointer_down(P, Point::new(10.0, 10.0));
        assert_rect(locked.selection(), (10.0, 10.0, 1.0, 2.0));
    }

    #[test]
    fn pointer_outside_surface_is_clamped() {
        let s = state(600, 400, None)
            .pointer_down(P, Point::new(-50.0, -50.0))
            .pointer_move(P, Point::new(900.0, 900.0));
        assert_rect(s.selection(), (0.0, 0.0, 600.0, 400.0));
    }

    #[test]
    fn move_translates_and_clamps() {
        let s = state(600, 400, None);
        let start = s.selection();
        let moving = s.pointer_down(P, Point::new(100.0, 100.0));
        assert_eq!(moving.mode(), Some(InteractionMode::Move));

        let moved = moving.pointer_move(P, Point::new(110.0, 90.0));
        assert_rect(moved.selection(), (start.x + 10.0, start.y - 10.0, start.width, start.height));

        let pinned = moved.pointer_move(P, Point::new(1000.0, 1000.0));
        assert_rect(pinned.selection(), (72.0, 48.0, 528.0, 352.0));
    }

    #[test]
    fn tiny_selection_resets_on_release() {
        let s = blank(600, 400, None)
            .pointer_down(P, Point::new(50.0, 50.0))
            .pointer_move(P, Point::new(55.0, 55.0));
        assert_rect(s.selection(), (50.0, 50.0, 5.0, 5.0));

        let released = s.pointer_up(P);
        assert_eq!(released.mode(), None);
        assert_eq!(released.selection(), state(600, 400, None).selection());
    }

    #[test]
    fn deliberate_selection_survives_release() {
        let s = blank(600, 400, None)
            .pointer_down(P, Point::new(50.0, 50.0))
            .pointer_move(P, Point::new(150.0, 120.0))
            .pointer_up(P);
        assert_rect(s.selection(), (50.0, 50.0, 100.0, 70.0));
        assert_eq!(s.active_pointer(), None);
    }

    #[test]
    fn full_cover_selection_starts_a_new_draw() {
        let s = state(600, 400, None).fit_to_image();
        assert!(s.is_full_cover());
        let down = s.pointer_down(P, Point::new(300.0, 200.0));
        assert_eq!(down.mode(), Some(InteractionMode::Draw));
    }

    #[test]
    fn fit_to_image_ignores_aspect_lock() {
        let s = state(600, 400, Some(1.0)).fit_to_image();
        assert_rect(s.selection(), (0.0, 0.0, 600.0, 400.0));
    }

    #[test]
    fn reset_is_idempotent() {
        let s = state(600, 400, Some(1.5))
            .pointer_down(P, Point::new(10.0, 10.0))
            .pointer_move(P, Point::new(200.0, 300.0))
            .pointer_up(P);
        let once = s.reset();
        let twice = once.reset();
        assert_eq!(once.selection(), twice.selection());
    }

    #[test]
    fn second_pointer_is_ignored_during_gesture() {
        let other = PointerId(7);
        let s = state(600, 400, None)
            .pointer_down(P, Point::new(10.0, 10.0))
            .pointer_move(P, Point::new(100.0, 100.0));
        let before = s.selection();

        let s = s
            .pointer_down(other, Point::new(500.0, 300.0))
            .pointer_move(other, Point::new(550.0, 350.0))
            .pointer_up(other);
        assert_eq!(s.selection(), before);
        assert_eq!(s.active_pointer(), Some(P));

        let s = s.pointer_up(P);
        assert_eq!(s.active_pointer(), None);
    }

    #[test]
    fn cancel_from_active_pointer_ends_gesture() {
        let drawing = blank(600, 400, None)
            .pointer_down(P, Point::new(50.0, 50.0))
            .pointer_move(P, Point::new(60.0, 58.0));

        let ignored = drawing.pointer_cancel(PointerId(3));
        assert_eq!(ignored, drawing);
        assert_eq!(ignored.active_pointer(), Some(P));

        let cancelled = drawing.pointer_cancel(P);
        assert_eq!(cancelled.mode(), None);
        assert_eq!(cancelled.selection(), state(600, 400, None).selection());
    }

    #[test]
    fn cancel_keeps_a_deliberate_selection() {
        let s = blank(600, 400, None)
            .pointer_down(P, Point::new(50.0, 50.0))
            .pointer_move(P, Point::new(150.0, 120.0))
            .pointer_cancel(P);
        assert_eq!(s.active_pointer(), None);
        assert_rect(s.selection(), (50.0, 50.0, 100.0, 70.0));
    }

    #[test]
    fn move_without_gesture_is_ignored() {
        let s = state(600, 400, None);
        assert_eq!(s.pointer_move(P, Point::new(1.0, 1.0)), s);
        assert_eq!(s.pointer_up(P), s);
    }

    #[test]
    fn changing_ratio_resets_selection() {
        let s = state(600, 400, None).with_aspect_ratio(Some(1.0));
        assert_eq!(s.aspect_ratio(), Some(1.0));
        assert_rect(s.selection(), (124.0, 24.0, 352.0, 352.0));
        assert_eq!(s.with_aspect_ratio(Some(-1.0)).aspect_ratio(), None);
    }
}
