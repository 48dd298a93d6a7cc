//! Engine assembly.
//!
//! Builds the message bus and hand-off store, spawns the three context
//! tasks on them, and hands the embedder the channel endpoints it
//! drives the engine through.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::background::{BackgroundInput, BackgroundTask};
use crate::config::EngineConfig;
use crate::content::{ContentInput, ContentTask};
use crate::host::{LanguageModelHost, PanelHost, SummarizerHost, TabHost};
use crate::panel::{PanelEvent, PanelInput, PanelTask};
use crate::runtime::storage::HandoffStore;
use crate::runtime::{Broadcast, ExtensionBus};

const INPUT_CAPACITY: usize = 32;

/// The browser surfaces an embedder must supply.
#[derive(Clone)]
pub struct Hosts {
    pub model: Arc<dyn LanguageModelHost>,
    pub summarizer: Arc<dyn SummarizerHost>,
    pub tabs: Arc<dyn TabHost>,
    pub panel: Arc<dyn PanelHost>,
}

/// A running engine: three context tasks sharing one bus and store.
pub struct Engine {
    background: mpsc::Sender<BackgroundInput>,
    content: mpsc::Sender<ContentInput>,
    panel: mpsc::Sender<PanelInput>,
    panel_events: mpsc::UnboundedReceiver<PanelEvent>,
    bus: ExtensionBus,
    store: HandoffStore,
    tasks: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Wire everything up and start the context tasks. Must be called
    /// from within a tokio runtime.
    pub fn spawn(hosts: Hosts, config: EngineConfig) -> Self {
        let bus = ExtensionBus::new();
        let store = HandoffStore::new();

        let (background_tx, background_rx) = mpsc::channel(INPUT_CAPACITY);
        let (content_tx, content_rx) = mpsc::channel(INPUT_CAPACITY);
        let (panel_tx, panel_rx) = mpsc::channel(INPUT_CAPACITY);
        let (panel_events_tx, panel_events) = mpsc::unbounded_channel();

        let background = BackgroundTask::new(
            bus.clone(),
            background_rx,
            store.clone(),
            hosts.tabs,
            hosts.panel,
            hosts.model.clone(),
        );
        let content = ContentTask::new(bus.clone(), content_rx);
        let panel = PanelTask::new(
            bus.clone(),
            panel_rx,
            panel_events_tx,
            store.clone(),
            config,
            hosts.model,
            hosts.summarizer,
        );

        let tasks = vec![
            tokio::spawn(background.run()),
            tokio::spawn(content.run()),
            tokio::spawn(panel.run()),
        ];

        Self {
            background: background_tx,
            content: content_tx,
            panel: panel_tx,
            panel_events,
            bus,
            store,
            tasks,
        }
    }

    /// Sender the embedder's browser glue feeds menu clicks into.
    pub fn background_inputs(&self) -> mpsc::Sender<BackgroundInput> {
        self.background.clone()
    }

    /// Sender the embedder's page glue feeds pointer events into.
    pub fn content_inputs(&self) -> mpsc::Sender<ContentInput> {
        self.content.clone()
    }

    /// Sender the panel UI feeds its intents into.
    pub fn panel_inputs(&self) -> mpsc::Sender<PanelInput> {
        self.panel.clone()
    }

    /// Next event the panel UI should render. `None` once the panel
    /// task has stopped.
    pub async fn next_panel_event(&mut self) -> Option<PanelEvent> {
        self.panel_events.recv().await
    }

    /// Listen in on the capture broadcasts directly.
    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.bus.subscribe()
    }

    /// Handle on the hand-off store shared by the tasks.
    pub fn handoffs(&self) -> HandoffStore {
        self.store.clone()
    }

    /// Close the input channels and wait for the context tasks to
    /// drain and stop.
    pub async fn shutdown(self) {
        let Self {
            background,
            content,
            panel,
            panel_events,
            tasks,
            ..
        } = self;
        drop(background);
        drop(content);
        drop(panel);
        drop(panel_events);
        for task in tasks {
            let _ = task.await;
        }
        log::info!("engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::capture::RasterImage;
    use crate::error::{Error, Result};
    use crate::host::{
        ActiveTab, Availability, ModelSession, ProbeOptions, ProgressFn, SessionConfig,
        SummarizerOptions, SummarizerSession, WindowId,
    };

    struct OfflineModel;

    #[async_trait]
    impl LanguageModelHost for OfflineModel {
        async fn availability(&self, _options: &ProbeOptions) -> Result<Availability> {
            Ok(Availability::Unavailable)
        }

        async fn create_session(
            &self,
            _config: SessionConfig,
            _progress: Option<ProgressFn>,
        ) -> Result<Box<dyn ModelSession>> {
            Err(Error::SessionCreationFailed("offline".into()))
        }
    }

    struct OfflineSummarizer;

    #[async_trait]
    impl SummarizerHost for OfflineSummarizer {
        async fn availability(&self) -> Result<Availability> {
            Ok(Availability::Unavailable)
        }

        async fn create_summarizer(
            &self,
            _options: SummarizerOptions,
            _progress: Option<ProgressFn>,
        ) -> Result<Box<dyn SummarizerSession>> {
            Err(Error::SessionCreationFailed("offline".into()))
        }
    }

    struct NoTabs;

    #[async_trait]
    impl TabHost for NoTabs {
        async fn active_tab(&self) -> Result<Option<ActiveTab>> {
            Ok(None)
        }

        async fn capture_visible_tab(&self, _window_id: WindowId) -> Result<RasterImage> {
            Err(Error::MessagingFailure("no capture surface".into()))
        }
    }

    struct NoPanel;

    #[async_trait]
    impl PanelHost for NoPanel {
        async fn open_panel(&self, _window_id: WindowId) -> Result<()> {
            Ok(())
        }
    }

    fn offline_hosts() -> Hosts {
        Hosts {
            model: Arc::new(OfflineModel),
            summarizer: Arc::new(OfflineSummarizer),
            tabs: Arc::new(NoTabs),
            panel: Arc::new(NoPanel),
        }
    }

    #[tokio::test]
    async fn engine_routes_panel_inputs_to_events() {
        let mut engine = Engine::spawn(offline_hosts(), EngineConfig::default());

        engine
            .panel_inputs()
            .send(PanelInput::SetActiveTab(crate::panel::PanelTab::Settings))
            .await
            .unwrap();

        loop {
            match engine.next_panel_event().await {
                Some(PanelEvent::TabSwitched { tab }) => {
                    assert_eq!(tab, crate::panel::PanelTab::Settings);
                    break;
                }
                Some(_) => continue,
                None => panic!("panel task stopped before emitting"),
            }
        }

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_stops_all_contexts() {
        let engine = Engine::spawn(offline_hosts(), EngineConfig::default());
        engine.shutdown().await;
    }
}
