//! In-page context task.
//!
//! Hosts the selection overlay and the crop step of the capture relay. A
//! fresh [`OverlayController`] is created every time selection mode starts
//! and is gone by the time a capture request leaves this context, so the
//! raster never photographs overlay chrome.

use tokio::sync::mpsc;

use crate::capture::crop::crop_to_data_url;
use crate::geometry::{Point, Viewport};
use crate::overlay::OverlayController;
use crate::runtime::{Broadcast, ContextId, Envelope, ExtensionBus, Message, Reply};

/// Page events fed into the content context by the embedder.
#[derive(Debug, Clone)]
pub enum ContentInput {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    /// Escape key. Cancels an active selection.
    Escape,
    /// Right-click. Also cancels, so the native menu is usable again.
    ContextMenu,
    /// The page navigated away; all overlay state is void.
    Navigated,
    /// Viewport geometry for subsequent selections.
    ViewportChanged(Viewport),
}

pub struct ContentTask {
    bus: ExtensionBus,
    inbox: mpsc::Receiver<Envelope>,
    inputs: mpsc::Receiver<ContentInput>,
    viewport: Viewport,
    overlay: Option<OverlayController>,
}

impl ContentTask {
    pub fn new(bus: ExtensionBus, inputs: mpsc::Receiver<ContentInput>) -> Self {
        let inbox = bus.register(ContextId::Content);
        Self {
            bus,
            inbox,
            inputs,
            viewport: Viewport::default(),
            overlay: None,
        }
    }

    pub async fn run(mut self) {
        log::info!("content context running");
        loop {
            tokio::select! {
                input = self.inputs.recv() => match input {
                    Some(input) => self.handle_input(input).await,
                    None => break,
                },
                envelope = self.inbox.recv() => match envelope {
                    Some(envelope) => self.handle_envelope(envelope).await,
                    None => break,
                },
            }
        }
        log::info!("content context stopped");
    }

    async fn handle_input(&mut self, input: ContentInput) {
        match input {
            ContentInput::PointerDown(point) => {
                if let Some(overlay) = self.overlay.as_mut() {
                    overlay.pointer_down(point);
                }
            }
            ContentInput::PointerMove(point) => {
                if let Some(overlay) = self.overlay.as_mut() {
                    overlay.pointer_move(point);
                }
            }
            ContentInput::PointerUp(point) => {
                let request = match self.overlay.as_mut() {
                    Some(overlay) => overlay.pointer_up(point),
                    None => None,
                };
                if let Some(request) = request {
                    // The controller tore itself down on submit.
                    self.overlay = None;
                    log::info!(
                        "selection submitted: {}x{} at ({}, {})",
                        request.rect.width,
                        request.rect.height,
                        request.rect.x,
                        request.rect.y
                    );
                    if let Err(err) = self
                        .bus
                        .send(ContextId::Background, Message::CaptureRegion { request })
                        .await
                    {
                        log::warn!("capture request undeliverable: {}", err);
                        self.bus.broadcast(Broadcast::CaptureFailed {
                            error: err.to_string(),
                        });
                    }
                }
            }
            ContentInput::Escape | ContentInput::ContextMenu => self.cancel_overlay(),
            ContentInput::Navigated => {
                log::debug!("page navigated, discarding overlay state");
                self.cancel_overlay();
            }
            ContentInput::ViewportChanged(viewport) => {
                self.viewport = viewport;
            }
        }
    }

    fn cancel_overlay(&mut self) {
        if let Some(mut overlay) = self.overlay.take() {
            overlay.cancel();
        }
    }

    async fn handle_envelope(&mut self, mut envelope: Envelope) {
        match envelope.message {
            Message::BeginSelection => {
                // Re-entrant starts funnel through teardown first.
                self.cancel_overlay();
                self.overlay = Some(OverlayController::begin_selection(self.viewport));
                log::info!("selection mode entered");
                envelope.respond(Ok(Reply::Ack));
            }
            Message::FullRaster { raster, request } => match crop_to_data_url(&raster, &request) {
                Ok(image) => {
                    log::info!("cropped capture ready ({}x{})", image.width, image.height);
                    self.bus.broadcast(Broadcast::CroppedImageReady { image });
                }
                Err(err) => {
                    log::warn!("crop failed: {}", err);
                    self.bus.broadcast(Broadcast::CaptureFailed {
                        error: err.to_string(),
                    });
                }
            },
            other => log::debug!("content context ignoring {:?}", other),
        }
    }
}
