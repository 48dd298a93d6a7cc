//! Typed message passing between the three execution contexts.
//!
//! Contexts never share memory; everything crosses an [`ExtensionBus`].
//! Directed messages go to one context's inbox, optionally carrying a
//! one-shot reply channel. Broadcasts fan out to every subscriber.
//! Delivery failures are values, not panics: a missing or closed inbox
//! surfaces as [`Error::MessagingFailure`] to the sender.

pub mod storage;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::capture::{CaptureRequest, CroppedImage, RasterImage};
use crate::error::{Error, Result};

const INBOX_CAPACITY: usize = 32;
const BROADCAST_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextId {
    Background,
    Content,
    Panel,
}

impl ContextId {
    fn name(&self) -> &'static str {
        match self {
            ContextId::Background => "background",
            ContextId::Content => "content",
            ContextId::Panel => "panel",
        }
    }
}

/// Directed messages. Each variant documents its hop in the capture relay
/// or its request/response service.
#[derive(Debug)]
pub enum Message {
    /// Panel asks the privileged context to start region selection on the
    /// active tab. Answered with `Reply::Ack` once selection mode is up.
    StartCapture,
    /// Privileged context tells the page to enter selection mode.
    BeginSelection,
    /// The page finalized a selection. Exactly one per selection.
    CaptureRegion { request: CaptureRequest },
    /// Full-tab raster answering a `CaptureRegion`, echoing the request so
    /// the crop needs no other state.
    FullRaster {
        raster: RasterImage,
        request: CaptureRequest,
    },
    /// Panel asks whether the on-device model is usable.
    CheckAiStatus,
}

#[derive(Debug)]
pub enum Reply {
    Ack,
    AiStatus { available: bool },
}

/// Events every context may care about.
#[derive(Debug, Clone)]
pub enum Broadcast {
    /// A capture finished end to end; the image is ready for the panel.
    CroppedImageReady { image: CroppedImage },
    /// A late relay hop failed after the initial request was acknowledged.
    CaptureFailed { error: String },
}

/// An inbox item: the message plus an optional reply channel.
#[derive(Debug)]
pub struct Envelope {
    pub message: Message,
    pub reply: Option<oneshot::Sender<Result<Reply>>>,
}

impl Envelope {
    /// Answer a request envelope. Quietly drops the value if the requester
    /// stopped waiting.
    pub fn respond(&mut self, response: Result<Reply>) {
        if let Some(tx) = self.reply.take() {
            let _ = tx.send(response);
        }
    }
}

struct BusInner {
    inboxes: Mutex<HashMap<ContextId, mpsc::Sender<Envelope>>>,
    broadcasts: broadcast::Sender<Broadcast>,
}

#[derive(Clone)]
pub struct ExtensionBus {
    inner: Arc<BusInner>,
}

impl Default for ExtensionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionBus {
    pub fn new() -> Self {
        let (broadcasts, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(BusInner {
                inboxes: Mutex::new(HashMap::new()),
                broadcasts,
            }),
        }
    }

    /// Claim the inbox for `context`. Registering again replaces the
    /// previous inbox, closing it.
    pub fn register(&self, context: ContextId) -> mpsc::Receiver<Envelope> {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        self.inner.inboxes.lock().insert(context, tx);
        rx
    }

    fn sender_for(&self, to: ContextId) -> Result<mpsc::Sender<Envelope>> {
        self.inner.inboxes.lock().get(&to).cloned().ok_or_else(|| {
            Error::MessagingFailure(format!("no {} context is listening", to.name()))
        })
    }

    /// Fire-and-forget delivery.
    pub async fn send(&self, to: ContextId, message: Message) -> Result<()> {
        let tx = self.sender_for(to)?;
        tx.send(Envelope {
            message,
            reply: None,
        })
        .await
        .map_err(|_| Error::MessagingFailure(format!("{} context is gone", to.name())))
    }

    /// Deliver and wait for the reply.
    pub async fn request(&self, to: ContextId, message: Message) -> Result<Reply> {
        let tx = self.sender_for(to)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(Envelope {
            message,
            reply: Some(reply_tx),
        })
        .await
        .map_err(|_| Error::MessagingFailure(format!("{} context is gone", to.name())))?;
        reply_rx.await.map_err(|_| {
            Error::MessagingFailure(format!("{} context dropped the request", to.name()))
        })?
    }

    /// Fan out to every subscriber. A bus with no subscribers swallows the
    /// event.
    pub fn broadcast(&self, event: Broadcast) {
        if let Err(err) = self.inner.broadcasts.send(event) {
            log::debug!("broadcast with no subscribers: {:?}", err.0);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.inner.broadcasts.subscribe()
    }
}
