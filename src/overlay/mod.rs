//! Region-selection overlay state machine.
//!
//! A controller is constructed fresh each time selection mode starts and
//! is torn down exactly once, whether the flow ends in submission,
//! cancellation, or navigation. Pointer events drive a [`DragTracker`];
//! the resulting scene mutations are recorded in an [`OverlayScene`] that
//! the embedding layer renders.
//!
//! Phases: `Selecting` -> `Finalized` -> `Idle`. Submission and
//! cancellation both complete to `Idle` within the call that triggers
//! them, and a submitted controller can never produce a second capture
//! request.

mod scene;

pub use scene::{
    DimLayer, OverlayScene, SubmitButton, SUBMIT_BUTTON_GAP, SUBMIT_BUTTON_HEIGHT,
    SUBMIT_BUTTON_WIDTH,
};

use crate::capture::CaptureRequest;
use crate::geometry::{DragOutcome, DragTracker, Point, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    /// Overlay is up and waiting for (or tracking) a drag.
    Selecting,
    /// A valid rectangle exists and the submit button is showing.
    Finalized,
    /// Torn down. Every input is a no-op.
    Idle,
}

pub struct OverlayController {
    viewport: Viewport,
    phase: OverlayPhase,
    drag: DragTracker,
    scene: OverlayScene,
    listeners_attached: bool,
    submitted: bool,
}

impl OverlayController {
    /// Enter selection mode: dim the page and start listening for input.
    pub fn begin_selection(viewport: Viewport) -> Self {
        let mut scene = OverlayScene::default();
        scene.dim_viewport();
        Self {
            viewport,
            phase: OverlayPhase::Selecting,
            drag: DragTracker::new(),
            scene,
            listeners_attached: true,
            submitted: false,
        }
    }

    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    pub fn scene(&self) -> &OverlayScene {
        &self.scene
    }

    pub fn listeners_attached(&self) -> bool {
        self.listeners_attached
    }

    fn on_submit_control(&self, p: Point) -> bool {
        self.scene.submit.is_some_and(|b| b.contains(p))
    }

    pub fn pointer_down(&mut self, p: Point) {
        if self.phase == OverlayPhase::Idle || self.on_submit_control(p) {
            return;
        }
        if self.drag.begin_drag(p, false) {
            // A previous selection existed; its border and button go away
            // before the new drag draws anything.
            self.scene.remove_submit();
            self.scene.remove_selection();
        }
        self.phase = OverlayPhase::Selecting;
    }

    pub fn pointer_move(&mut self, p: Point) {
        if self.phase == OverlayPhase::Idle || self.on_submit_control(p) {
            return;
        }
        if let Some(rect) = self.drag.update_drag(p, false) {
            self.scene.show_selection(rect, &self.viewport);
        }
    }

    /// Release the pointer. Over the submit control with a finalized
    /// selection this is the submission path and yields the capture
    /// request; otherwise it ends the drag.
    pub fn pointer_up(&mut self, p: Point) -> Option<CaptureRequest> {
        if self.phase == OverlayPhase::Idle {
            return None;
        }
        if self.on_submit_control(p) {
            if self.phase == OverlayPhase::Finalized {
                return self.submit();
            }
            return None;
        }
        match self.drag.end_drag(p) {
            DragOutcome::Finalized(rect) => {
                self.scene
                    .show_submit(SubmitButton::place(&rect, &self.viewport));
                self.phase = OverlayPhase::Finalized;
            }
            DragOutcome::TooSmall => {
                self.scene.remove_submit();
                self.scene.remove_selection();
                self.phase = OverlayPhase::Selecting;
            }
            DragOutcome::NotDragging => {}
        }
        None
    }

    /// Produce the capture request for the finalized rectangle. The button
    /// and border leave the scene first so the upcoming capture photographs
    /// neither. At most one request per controller lifetime.
    fn submit(&mut self) -> Option<CaptureRequest> {
        if self.submitted || self.phase != OverlayPhase::Finalized {
            return None;
        }
        let rect = self.drag.selection()?;
        self.scene.remove_submit();
        self.scene.remove_selection();
        self.submitted = true;
        let request = CaptureRequest {
            rect,
            device_pixel_ratio: self.viewport.device_pixel_ratio,
        };
        self.teardown();
        Some(request)
    }

    /// Abort the flow (Escape, right-click, navigation). Idempotent.
    pub fn cancel(&mut self) {
        self.teardown();
    }

    /// The single teardown routine every exit path funnels through.
    pub fn teardown(&mut self) {
        self.scene.clear();
        self.drag = DragTracker::new();
        self.listeners_attached = false;
        self.phase = OverlayPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport {
            width: 1280.0,
            height: 800.0,
            device_pixel_ratio: 2.0,
        }
    }

    fn finalized_controller() -> OverlayController {
        let mut c = OverlayController::begin_selection(viewport());
        c.pointer_down(Point::new(50.0, 50.0));
        c.pointer_move(Point::new(250.0, 150.0));
        assert!(c.pointer_up(Point::new(250.0, 150.0)).is_none());
        assert_eq!(c.phase(), OverlayPhase::Finalized);
        c
    }

    #[test]
    fn begin_selection_dims_and_listens() {
        let c = OverlayController::begin_selection(viewport());
        assert_eq!(c.phase(), OverlayPhase::Selecting);
        assert!(c.listeners_attached());
        assert!(c.scene().dim.is_some());
        assert!(c.scene().dim.as_ref().unwrap().clip.is_none());
        assert!(c.scene().selection.is_none());
    }

    #[test]
    fn drag_shows_selection_and_carves_clip() {
        let mut c = OverlayController::begin_selection(viewport());
        c.pointer_down(Point::new(50.0, 50.0));
        c.pointer_move(Point::new(250.0, 150.0));
        let sel = c.scene().selection.expect("selection visible");
        assert_eq!((sel.x, sel.y, sel.width, sel.height), (50.0, 50.0, 200.0, 100.0));
        assert!(c.scene().dim.as_ref().unwrap().clip.is_some());
    }

    #[test]
    fn release_finalizes_and_places_button() {
        let c = finalized_controller();
        let button = c.scene().submit.expect("submit button visible");
        assert_eq!(button.x, 250.0 + SUBMIT_BUTTON_GAP);
        assert_eq!(button.y, 150.0 - SUBMIT_BUTTON_HEIGHT);
    }

    #[test]
    fn tiny_drag_finalizes_nothing() {
        let mut c = OverlayController::begin_selection(viewport());
        c.pointer_down(Point::new(50.0, 50.0));
        c.pointer_move(Point::new(54.0, 54.0));
        assert!(c.pointer_up(Point::new(54.0, 54.0)).is_none());
        assert_eq!(c.phase(), OverlayPhase::Selecting);
        assert!(c.scene().submit.is_none());
    }

    #[test]
    fn submit_clears_chrome_and_yields_one_request() {
        let mut c = finalized_controller();
        let button = c.scene().submit.unwrap();
        let on_button = Point::new(button.x + 1.0, button.y + 1.0);

        let request = c.pointer_up(on_button).expect("capture request");
        assert_eq!(request.rect.width, 200.0);
        assert_eq!(request.rect.height, 100.0);
        assert_eq!(request.device_pixel_ratio, 2.0);

        // Everything is gone and the controller is inert.
        assert!(c.scene().is_empty());
        assert_eq!(c.phase(), OverlayPhase::Idle);
        assert!(!c.listeners_attached());
        assert!(c.pointer_up(on_button).is_none());
    }

    #[test]
    fn new_drag_replaces_finalized_selection() {
        let mut c = finalized_controller();
        c.pointer_down(Point::new(300.0, 300.0));
        assert!(c.scene().submit.is_none());
        assert!(c.scene().selection.is_none());
        assert_eq!(c.phase(), OverlayPhase::Selecting);

        c.pointer_move(Point::new(400.0, 380.0));
        assert!(c.pointer_up(Point::new(400.0, 380.0)).is_none());
        let sel = c.scene().selection.expect("second selection");
        assert_eq!((sel.x, sel.y), (300.0, 300.0));
    }

    #[test]
    fn cancel_tears_down_idempotently() {
        let mut c = finalized_controller();
        c.cancel();
        assert!(c.scene().is_empty());
        assert_eq!(c.phase(), OverlayPhase::Idle);
        assert!(!c.listeners_attached());

        c.cancel();
        assert!(c.scene().is_empty());
    }

    #[test]
    fn inputs_after_teardown_are_noops() {
        let mut c = finalized_controller();
        c.teardown();
        c.pointer_down(Point::new(10.0, 10.0));
        c.pointer_move(Point::new(100.0, 100.0));
        assert!(c.pointer_up(Point::new(100.0, 100.0)).is_none());
        assert!(c.scene().is_empty());
    }

    #[test]
    fn pointer_down_over_button_does_not_start_a_drag() {
        let mut c = finalized_controller();
        let button = c.scene().submit.unwrap();
        let on_button = Point::new(button.x + 5.0, button.y + 5.0);
        c.pointer_down(on_button);
        // The finalized selection survives the press.
        assert!(c.scene().submit.is_some());
        assert!(c.scene().selection.is_some());
        assert_eq!(c.phase(), OverlayPhase::Finalized);
    }
}
