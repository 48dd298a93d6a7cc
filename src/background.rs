//! Privileged context task.
//!
//! Owns everything only the privileged side can do: context-menu
//! registration data, opening the panel on a menu click, parking the
//! clicked selection in the hand-off store, answering capability probes,
//! and the privileged hops of the capture relay (resolving the active tab
//! and rasterizing it).

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::capture::CaptureRequest;
use crate::error::{Error, Result};
use crate::host::{LanguageModelHost, PanelHost, ProbeOptions, TabHost, WindowId};
use crate::runtime::storage::{HandoffKey, HandoffStore};
use crate::runtime::{Broadcast, ContextId, Envelope, ExtensionBus, Message, Reply};

/// Pages eligible for the selection context menus.
pub const DOCUMENT_URL_PATTERNS: [&str; 2] = ["http://*/*", "https://*/*"];

static PATTERN_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    DOCUMENT_URL_PATTERNS
        .iter()
        .map(|pattern| {
            let escaped = regex::escape(pattern).replace(r"\*", ".*");
            Regex::new(&format!("^{}$", escaped)).unwrap()
        })
        .collect()
});

/// Whether the context menus apply to `url`.
pub fn url_matches_menu_patterns(url: &str) -> bool {
    PATTERN_REGEXES.iter().any(|re| re.is_match(url))
}

/// The four selection actions offered in the page context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuAction {
    AskAi,
    Quiz,
    Summarize,
    Translate,
}

impl MenuAction {
    pub const ALL: [MenuAction; 4] = [
        MenuAction::AskAi,
        MenuAction::Quiz,
        MenuAction::Summarize,
        MenuAction::Translate,
    ];

    pub fn menu_id(&self) -> &'static str {
        match self {
            MenuAction::AskAi => "studylens-askai",
            MenuAction::Quiz => "studylens-quiz",
            MenuAction::Summarize => "studylens-summarize",
            MenuAction::Translate => "studylens-translate",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MenuAction::AskAi => "Ask AI",
            MenuAction::Quiz => "Generate Quiz",
            MenuAction::Summarize => "Generate Summary",
            MenuAction::Translate => "Translate Selection",
        }
    }

    /// Which hand-off slot the clicked selection lands in.
    pub fn handoff_key(&self) -> HandoffKey {
        match self {
            MenuAction::AskAi => HandoffKey::AskaiText,
            MenuAction::Quiz => HandoffKey::QuizText,
            MenuAction::Summarize => HandoffKey::SelectedText,
            MenuAction::Translate => HandoffKey::TranslateText,
        }
    }
}

/// Everything an embedder needs to install one context menu entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuRegistration {
    pub id: String,
    pub title: String,
    pub document_url_patterns: Vec<String>,
}

pub fn menu_registrations() -> Vec<MenuRegistration> {
    MenuAction::ALL
        .iter()
        .map(|action| MenuRegistration {
            id: action.menu_id().to_string(),
            title: action.title().to_string(),
            document_url_patterns: DOCUMENT_URL_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        })
        .collect()
}

/// Host events fed into the privileged context by the embedder.
#[derive(Debug, Clone)]
pub enum BackgroundInput {
    MenuClicked {
        action: MenuAction,
        selection_text: String,
        page_url: Option<String>,
        window_id: WindowId,
    },
}

pub struct BackgroundTask {
    bus: ExtensionBus,
    inbox: mpsc::Receiver<Envelope>,
    inputs: mpsc::Receiver<BackgroundInput>,
    store: HandoffStore,
    tabs: Arc<dyn TabHost>,
    panel: Arc<dyn PanelHost>,
    model: Arc<dyn LanguageModelHost>,
}

impl BackgroundTask {
    pub fn new(
        bus: ExtensionBus,
        inputs: mpsc::Receiver<BackgroundInput>,
        store: HandoffStore,
        tabs: Arc<dyn TabHost>,
        panel: Arc<dyn PanelHost>,
        model: Arc<dyn LanguageModelHost>,
    ) -> Self {
        let inbox = bus.register(ContextId::Background);
        Self {
            bus,
            inbox,
            inputs,
            store,
            tabs,
            panel,
            model,
        }
    }

    pub async fn run(mut self) {
        log::info!("background context running");
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
        log::info!("background context stopped");
    }

    async fn handle_input(&mut self, input: BackgroundInput) {
        match input {
            BackgroundInput::MenuClicked {
                action,
                selection_text,
                page_url,
                window_id,
            } => {
                if selection_text.trim().is_empty() {
                    log::debug!("menu click without selection text, ignoring");
                    return;
                }
                if let Some(url) = &page_url {
                    if !url_matches_menu_patterns(url) {
                        log::debug!("menu click on ineligible page {}, ignoring", url);
                        return;
                    }
                }
                // Panel first: the hand-off only matters once a panel
                // exists to consume it.
                if let Err(err) = self.panel.open_panel(window_id).await {
                    log::error!("failed to open panel: {}", err);
                    return;
                }
                log::info!("{} menu clicked, handing text to the panel", action.menu_id());
                self.store.store(action.handoff_key(), selection_text);
            }
        }
    }

    async fn handle_envelope(&mut self, mut envelope: Envelope) {
        match &envelope.message {
            Message::StartCapture => {
                let response = self.start_capture().await;
                if let Err(err) = &response {
                    log::warn!("start capture refused: {}", err);
                }
                envelope.respond(response);
            }
            Message::CaptureRegion { request } => {
                let request = *request;
                if !request.rect.meets_minimum() {
                    log::debug!("{}", Error::CaptureTooSmall(request.rect));
                    return;
                }
                if let Err(err) = self.relay_raster(request).await {
                    log::warn!("capture relay failed: {}", err);
                    self.bus.broadcast(Broadcast::CaptureFailed {
                        error: err.to_string(),
                    });
                }
            }
            Message::CheckAiStatus => {
                let available = match self.model.availability(&ProbeOptions::default()).await {
                    Ok(availability) => availability.is_usable(),
                    Err(err) => {
                        log::debug!("status probe failed: {}", err);
                        false
                    }
                };
                envelope.respond(Ok(Reply::AiStatus { available }));
            }
            other => log::debug!("background context ignoring {:?}", other),
        }
    }

    /// Relay hop 1: confirm there is a tab to capture, then put the page
    /// into selection mode. Acks only after the page confirms, so a dead
    /// content context surfaces here as a messaging failure.
    async fn start_capture(&self) -> Result<Reply> {
        let tab = self
            .tabs
            .active_tab()
            .await?
            .ok_or_else(|| Error::MessagingFailure("No active tab found".to_string()))?;
        log::info!("capture starting on tab {} (window {})", tab.id, tab.window_id);
        self.bus
            .request(ContextId::Content, Message::BeginSelection)
            .await?;
        Ok(Reply::Ack)
    }

    /// Relay hop 3: rasterize the visible tab once and hand the raster
    /// back to the page for cropping.
    async fn relay_raster(&self, request: CaptureRequest) -> Result<()> {
        let tab = self
            .tabs
            .active_tab()
            .await?
            .ok_or_else(|| Error::MessagingFailure("No active tab found".to_string()))?;
        let raster = self.tabs.capture_visible_tab(tab.window_id).await?;
        self.bus
            .send(ContextId::Content, Message::FullRaster { raster, request })
            .await
    }
}
