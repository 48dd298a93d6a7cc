//! Selection geometry: pointer-drag tracking and rectangle normalization.
//!
//! Pure logic, no DOM or channel dependencies. The overlay state machine
//! drives a [`DragTracker`] from pointer events and renders whatever
//! rectangle it reports.

use serde::{Deserialize, Serialize};

/// Selections at or below this edge length (CSS px) are discarded.
pub const MIN_SELECTION_PX: f64 = 5.0;

/// A point in page-viewport coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A normalized selection rectangle: top-left corner plus non-negative
/// width/height, regardless of drag direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SelectionRect {
    /// Normalize two drag corners into a rectangle.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    /// Whether the rectangle is large enough to materialize.
    pub fn meets_minimum(&self) -> bool {
        self.width > MIN_SELECTION_PX && self.height > MIN_SELECTION_PX
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// Page viewport dimensions plus the device pixel ratio of the display the
/// page is rendered on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            device_pixel_ratio: 1.0,
        }
    }
}

/// Outcome of releasing a pointer drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    /// A selection meeting the minimum size was materialized.
    Finalized(SelectionRect),
    /// No rectangle ever cleared the minimum size; the selection is
    /// discarded silently.
    TooSmall,
    /// The pointer was released without an active drag.
    NotDragging,
}

/// Tracks one pointer drag and the selection it produces.
///
/// The current selection is the last rectangle that cleared the minimum
/// size. Dragging back below the threshold keeps the previous valid
/// rectangle on screen, which is what release finalizes.
#[derive(Debug, Default)]
pub struct DragTracker {
    dragging: bool,
    start: Point,
    current: Point,
    selection: Option<SelectionRect>,
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a drag at `point`. Returns `true` if a previous selection was
    /// cleared so the caller can drop its visuals. Events originating on the
    /// submit control are ignored entirely.
    pub fn begin_drag(&mut self, point: Point, on_submit_control: bool) -> bool {
        if on_submit_control {
            return false;
        }
        self.dragging = true;
        self.start = point;
        self.current = point;
        self.selection.take().is_some()
    }

    /// Advance the drag to `point`. Returns the rectangle to display once it
    /// clears the minimum size, `None` otherwise. No-op unless a drag is
    /// active and the pointer is off the submit control.
    pub fn update_drag(&mut self, point: Point, on_submit_control: bool) -> Option<SelectionRect> {
        if !self.dragging || on_submit_control {
            return None;
        }
        self.current = point;
        let rect = SelectionRect::from_corners(self.start, self.current);
        if rect.meets_minimum() {
            self.selection = Some(rect);
            Some(rect)
        } else {
            None
        }
    }

    /// Release the drag. Finalizes the current selection if one
    /// materialized, otherwise discards.
    pub fn end_drag(&mut self, point: Point) -> DragOutcome {
        if !self.dragging {
            return DragOutcome::NotDragging;
        }
        self.dragging = false;
        self.current = point;
        match self.selection {
            Some(rect) if rect.meets_minimum() => DragOutcome::Finalized(rect),
            _ => {
                self.selection = None;
                DragOutcome::TooSmall
            }
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn selection(&self) -> Option<SelectionRect> {
        self.selection
    }
}
