//! View-model for the in-page selection overlay.
//!
//! The scene describes exactly what should exist in the page: a
//! full-viewport dimming layer with an inverse clip polygon carving a
//! transparent hole over the selection, a border around the selection, and
//! a submit button placed beside it. The embedding layer renders the scene;
//! the state machine in [`super`] owns every mutation.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, SelectionRect, Viewport};

/// Submit button footprint (CSS px) used for placement and hit testing.
pub const SUBMIT_BUTTON_WIDTH: f64 = 80.0;
pub const SUBMIT_BUTTON_HEIGHT: f64 = 40.0;
/// Gap between the selection edge and the button.
pub const SUBMIT_BUTTON_GAP: f64 = 8.0;

/// Full-viewport dimming layer. `clip` is the inverse clip polygon: when
/// present, everything inside the selection hole shows the original page
/// while the rest stays dimmed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimLayer {
    pub clip: Option<Vec<Point>>,
}

/// The submit affordance, positioned adjacent to the finalized selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubmitButton {
    pub x: f64,
    pub y: f64,
}

impl SubmitButton {
    /// Place the button to the right of the selection, near its bottom
    /// edge, flipping to the opposite side on either axis when it would
    /// overflow the viewport.
    pub fn place(rect: &SelectionRect, viewport: &Viewport) -> Self {
        let mut x = rect.right() + SUBMIT_BUTTON_GAP;
        let mut y = rect.bottom() - SUBMIT_BUTTON_HEIGHT;

        if rect.right() + SUBMIT_BUTTON_GAP + SUBMIT_BUTTON_WIDTH > viewport.width {
            x = rect.x - SUBMIT_BUTTON_WIDTH - SUBMIT_BUTTON_GAP;
        }
        if rect.bottom() + 10.0 > viewport.height {
            y = rect.y - SUBMIT_BUTTON_HEIGHT;
        }

        Self { x, y }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x
            && p.x <= self.x + SUBMIT_BUTTON_WIDTH
            && p.y >= self.y
            && p.y <= self.y + SUBMIT_BUTTON_HEIGHT
    }
}

/// Everything the overlay currently keeps in the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayScene {
    pub dim: Option<DimLayer>,
    pub selection: Option<SelectionRect>,
    pub submit: Option<SubmitButton>,
}

impl OverlayScene {
    /// Insert the dimming layer covering the whole viewport, with no hole.
    pub fn dim_viewport(&mut self) {
        self.dim = Some(DimLayer::default());
    }

    /// Show the selection: border at the rectangle's edges and the dim
    /// layer re-clipped so the interior is transparent.
    pub fn show_selection(&mut self, rect: SelectionRect, viewport: &Viewport) {
        self.selection = Some(rect);
        if let Some(dim) = self.dim.as_mut() {
            dim.clip = Some(inverse_clip(&rect, viewport));
        }
    }

    pub fn show_submit(&mut self, button: SubmitButton) {
        self.submit = Some(button);
    }

    /// Removals are tolerant of already-absent elements.
    pub fn remove_submit(&mut self) {
        self.submit.take();
    }

    pub fn remove_selection(&mut self) {
        self.selection.take();
        if let Some(dim) = self.dim.as_mut() {
            dim.clip = None;
        }
    }

    /// Tear down every element. Safe to call on an already-empty scene.
    pub fn clear(&mut self) {
        self.dim.take();
        self.selection.take();
        self.submit.take();
    }

    pub fn is_empty(&self) -> bool {
        self.dim.is_none() && self.selection.is_none() && self.submit.is_none()
    }
}

/// The 10-vertex polygon that covers the whole viewport except the
/// selection hole, traced down the left side, into the hole, and back out.
fn inverse_clip(rect: &SelectionRect, viewport: &Viewport) -> Vec<Point> {
    let (w, h) = (viewport.width, viewport.height);
    vec![
        Point::new(0.0, 0.0),
        Point::new(0.0, h),
        Point::new(rect.x, h),
        Point::new(rect.x, rect.y),
        Point::new(rect.right(), rect.y),
        Point::new(rect.right(), rect.bottom()),
        Point::new(rect.x, rect.bottom()),
        Point::new(rect.x, h),
        Point::new(w, h),
        Point::new(w, 0.0),
    ]
}
