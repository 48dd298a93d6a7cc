//! Panel context task.
//!
//! The panel owns the two AI controllers and the view routing: which tab
//! is active, which viewer gets a handed-off selection, the pending image
//! attachment, and the debounce that keeps repeat capture broadcasts from
//! re-attaching the same screenshot. UI concerns stay here; the
//! controllers never learn about tabs or attachments.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use crate::ai::chat::{ChatController, ChatEvent};
use crate::ai::summary::{SummaryController, SummaryEvent};
use crate::config::EngineConfig;
use crate::host::{LanguageModelHost, SummarizerHost, SummaryLength, SummaryType};
use crate::runtime::storage::{HandoffKey, HandoffStore};
use crate::runtime::{Broadcast, ContextId, Envelope, ExtensionBus, Message, Reply};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelTab {
    AskAi,
    Summary,
    Quiz,
    Translator,
    Settings,
}

/// Which viewer a hand-off slot feeds.
fn handoff_target(key: HandoffKey) -> PanelTab {
    match key {
        HandoffKey::SelectedText => PanelTab::Summary,
        HandoffKey::QuizText => PanelTab::Quiz,
        HandoffKey::TranslateText => PanelTab::Translator,
        HandoffKey::AskaiText => PanelTab::AskAi,
    }
}

/// UI intents fed into the panel context by the embedder.
#[derive(Debug, Clone)]
pub enum PanelInput {
    SendChat { text: String },
    AttachImage { data_url: String },
    RemoveImage,
    /// Kick off the capture relay for a region screenshot.
    RequestScreenshot,
    GenerateSummary { text: String },
    SetSummaryOptions {
        summary_type: SummaryType,
        length: SummaryLength,
    },
    SetActiveTab(PanelTab),
    /// Settings surface asking whether on-device AI works here.
    CheckAiStatus,
}

/// Everything the panel UI renders from.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    Chat(ChatEvent),
    Summary(SummaryEvent),
    TabSwitched { tab: PanelTab },
    /// Handed-off text delivered as the pending input of a viewer.
    HandoffDelivered { tab: PanelTab, text: String },
    ImageAttached { data_url: String },
    ImageCleared,
    /// A capture attempt failed somewhere along the relay.
    CaptureFailed { error: String },
    AiStatus { available: bool },
}

pub struct PanelTask {
    bus: ExtensionBus,
    inbox: mpsc::Receiver<Envelope>,
    inputs: mpsc::Receiver<PanelInput>,
    events: mpsc::UnboundedSender<PanelEvent>,
    store: HandoffStore,
    chat: ChatController,
    chat_events: mpsc::UnboundedReceiver<ChatEvent>,
    summary: SummaryController,
    summary_events: mpsc::UnboundedReceiver<SummaryEvent>,
    active_tab: PanelTab,
    attached_image: Option<String>,
    last_capture_at: Option<Instant>,
    debounce: Duration,
}

impl PanelTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: ExtensionBus,
        inputs: mpsc::Receiver<PanelInput>,
        events: mpsc::UnboundedSender<PanelEvent>,
        store: HandoffStore,
        config: EngineConfig,
        model: Arc<dyn LanguageModelHost>,
        summarizer: Arc<dyn SummarizerHost>,
    ) -> Self {
        let inbox = bus.register(ContextId::Panel);
        let (chat_tx, chat_events) = mpsc::unbounded_channel();
        let (summary_tx, summary_events) = mpsc::unbounded_channel();
        let debounce = Duration::from_millis(config.image_debounce_ms);
        Self {
            bus,
            inbox,
            inputs,
            events,
            store,
            chat: ChatController::new(model, config.clone(), chat_tx),
            chat_events,
            summary: SummaryController::new(summarizer, config, summary_tx),
            summary_events,
            active_tab: PanelTab::AskAi,
            attached_image: None,
            last_capture_at: None,
            debounce,
        }
    }

    pub async fn run(mut self) {
        log::info!("panel context running");
        let mut broadcasts = self.bus.subscribe();
        let mut changes = self.store.watch();

        self.deliver_mount_handoffs();
        self.chat.initialize().await;
        self.summary.initialize().await;

        loop {
            tokio::select! {
                input = self.inputs.recv() => match input {
                    Some(input) => self.handle_input(input).await,
                    None => break,
                },
                envelope = self.inbox.recv() => match envelope {
                    Some(mut envelope) => envelope.respond(Ok(Reply::Ack)),
                    None => break,
                },
                event = self.chat_events.recv() => {
                    if let Some(event) = event {
                        self.forward_chat(event);
                    }
                }
                event = self.summary_events.recv() => {
                    if let Some(event) = event {
                        self.emit(PanelEvent::Summary(event));
                    }
                }
                broadcast = broadcasts.recv() => match broadcast {
                    Ok(broadcast) => self.handle_broadcast(broadcast),
                    Err(RecvError::Lagged(missed)) => {
                        log::warn!("panel missed {} broadcasts", missed);
                    }
                    Err(RecvError::Closed) => break,
                },
                change = changes.recv() => match change {
                    Ok(key) => self.handle_storage_change(key),
                    Err(RecvError::Lagged(missed)) => {
                        log::warn!("panel missed {} hand-off notifications", missed);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        log::info!("panel context stopped");
    }

    fn emit(&self, event: PanelEvent) {
        let _ = self.events.send(event);
    }

    /// Values already parked before the panel existed are delivered to
    /// their viewers without stealing the active tab.
    fn deliver_mount_handoffs(&mut self) {
        for key in [
            HandoffKey::SelectedText,
            HandoffKey::QuizText,
            HandoffKey::TranslateText,
            HandoffKey::AskaiText,
        ] {
            if let Some(entry) = self.store.take(key) {
                log::debug!("delivering mounted hand-off from {}", key.as_str());
                self.emit(PanelEvent::HandoffDelivered {
                    tab: handoff_target(key),
                    text: entry.text,
                });
            }
        }
    }

    /// A store while the panel is up also pulls its viewer into focus.
    fn handle_storage_change(&mut self, key: HandoffKey) {
        if let Some(entry) = self.store.take(key) {
            let tab = handoff_target(key);
            if self.active_tab != tab {
                self.active_tab = tab;
                self.emit(PanelEvent::TabSwitched { tab });
            }
            self.emit(PanelEvent::HandoffDelivered {
                tab,
                text: entry.text,
            });
        }
    }

    fn handle_broadcast(&mut self, broadcast: Broadcast) {
        match broadcast {
            Broadcast::CroppedImageReady { image } => {
                if let Some(at) = self.last_capture_at {
                    if at.elapsed() < self.debounce {
                        log::debug!("capture broadcast inside debounce window, ignored");
                        return;
                    }
                }
                self.last_capture_at = Some(Instant::now());
                self.attached_image = Some(image.data_url.clone());
                self.emit(PanelEvent::ImageAttached {
                    data_url: image.data_url,
                });
            }
            Broadcast::CaptureFailed { error } => {
                self.emit(PanelEvent::CaptureFailed { error });
            }
        }
    }

    fn forward_chat(&mut self, event: ChatEvent) {
        // The attachment is spent once the stream settles; an append
        // failure keeps it for retry.
        if matches!(event, ChatEvent::StreamClosed { .. }) && self.attached_image.take().is_some()
        {
            self.emit(PanelEvent::ImageCleared);
        }
        self.emit(PanelEvent::Chat(event));
    }

    async fn handle_input(&mut self, input: PanelInput) {
        match input {
            PanelInput::SendChat { text } => {
                let image = self.attached_image.clone();
                self.chat.send(&text, image).await;
            }
            PanelInput::AttachImage { data_url } => {
                self.attached_image = Some(data_url.clone());
                self.emit(PanelEvent::ImageAttached { data_url });
            }
            PanelInput::RemoveImage => {
                if self.attached_image.take().is_some() {
                    self.emit(PanelEvent::ImageCleared);
                }
            }
            PanelInput::RequestScreenshot => {
                match self.bus.request(ContextId::Background, Message::StartCapture).await {
                    Ok(_) => log::debug!("selection mode requested"),
                    Err(err) => {
                        log::warn!("screenshot request failed: {}", err);
                        self.emit(PanelEvent::CaptureFailed {
                            error: err.to_string(),
                        });
                    }
                }
            }
            PanelInput::GenerateSummary { text } => {
                self.summary.generate(&text).await;
            }
            PanelInput::SetSummaryOptions {
                summary_type,
                length,
            } => {
                self.summary.set_options(summary_type, length);
            }
            PanelInput::SetActiveTab(tab) => {
                self.active_tab = tab;
                self.emit(PanelEvent::TabSwitched { tab });
            }
            PanelInput::CheckAiStatus => {
                let available = match self
                    .bus
                    .request(ContextId::Background, Message::CheckAiStatus)
                    .await
                {
                    Ok(Reply::AiStatus { available }) => available,
                    Ok(_) => false,
                    Err(err) => {
                        log::warn!("status check failed: {}", err);
                        false
                    }
                };
                self.emit(PanelEvent::AiStatus { available });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_handoff_slot_has_a_viewer() {
        assert_eq!(handoff_target(HandoffKey::SelectedText), PanelTab::Summary);
        assert_eq!(handoff_target(HandoffKey::QuizText), PanelTab::Quiz);
        assert_eq!(handoff_target(HandoffKey::TranslateText), PanelTab::Translator);
        assert_eq!(handoff_target(HandoffKey::AskaiText), PanelTab::AskAi);
    }

    #[test]
    fn tabs_serialize_for_the_ui_layer() {
        assert_eq!(serde_json::to_value(PanelTab::AskAi).unwrap(), "askai");
        assert_eq!(serde_json::to_value(PanelTab::Translator).unwrap(), "translator");
    }
}
