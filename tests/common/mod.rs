//! Shared fixtures for the integration tests: scriptable host surfaces,
//! a synthetic page raster, and panel-event helpers.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use futures::stream;
use futures_util::StreamExt;
use parking_lot::Mutex;

use studylens::ai::Message;
use studylens::capture::RasterImage;
use studylens::engine::{Engine, Hosts};
use studylens::error::{Error, Result};
use studylens::host::{
    ActiveTab, Availability, InputKind, LanguageModelHost, ModelSession, PanelHost, ProbeOptions,
    ProgressFn, SessionConfig, SummarizerHost, SummarizerOptions, SummarizerSession, TabHost,
    TextStream, WindowId,
};
use studylens::panel::PanelEvent;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ─── Language model ─────────────────────────────────────────────────────

pub struct ScriptedModel {
    pub availability: Option<Availability>,
    pub fail_multimodal_create: bool,
    pub chunks: Vec<String>,
    pub progress_points: Vec<f64>,
    pub creates: Mutex<Vec<SessionConfig>>,
    pub appends: Arc<Mutex<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn ready(chunks: &[&str]) -> Self {
        Self {
            availability: Some(Availability::Available),
            fail_multimodal_create: false,
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            progress_points: Vec::new(),
            creates: Mutex::new(Vec::new()),
            appends: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn downloadable(progress: &[f64], chunks: &[&str]) -> Self {
        Self {
            availability: Some(Availability::Downloadable),
            progress_points: progress.to_vec(),
            ..Self::ready(chunks)
        }
    }

    /// A model whose multimodal session creation is rejected; the
    /// text-only retry succeeds.
    pub fn text_only(chunks: &[&str]) -> Self {
        Self {
            fail_multimodal_create: true,
            ..Self::ready(chunks)
        }
    }

    pub fn session_configs(&self) -> Vec<SessionConfig> {
        self.creates.lock().clone()
    }

    pub fn appended(&self) -> Vec<Message> {
        self.appends.lock().clone()
    }
}

struct ScriptedSession {
    chunks: Vec<String>,
    appends: Arc<Mutex<Vec<Message>>>,
}

#[async_trait]
impl ModelSession for ScriptedSession {
    async fn append(&self, message: Message) -> Result<()> {
        self.appends.lock().push(message);
        Ok(())
    }

    fn prompt_streaming(&self, _message: Message) -> TextStream {
        stream::iter(self.chunks.clone().into_iter().map(Ok)).boxed()
    }
}

#[async_trait]
impl LanguageModelHost for ScriptedModel {
    async fn availability(&self, _options: &ProbeOptions) -> Result<Availability> {
        self.availability
            .ok_or_else(|| Error::CapabilityUnavailable("no prompt surface".into()))
    }

    async fn create_session(
        &self,
        config: SessionConfig,
        progress: Option<ProgressFn>,
    ) -> Result<Box<dyn ModelSession>> {
        let multimodal = config.expected_inputs.contains(&InputKind::Image);
        self.creates.lock().push(config);
        if self.fail_multimodal_create && multimodal {
            return Err(Error::SessionCreationFailed(
                "image input not supported".into(),
            ));
        }
        if let Some(report) = progress {
            for point in &self.progress_points {
                report(*point);
            }
        }
        Ok(Box::new(ScriptedSession {
            chunks: self.chunks.clone(),
            appends: self.appends.clone(),
        }))
    }
}

// ─── Summarizer ─────────────────────────────────────────────────────────

pub struct ScriptedSummarizer {
    pub availability: Option<Availability>,
    pub chunks: Vec<String>,
    pub options_seen: Mutex<Vec<SummarizerOptions>>,
}

impl ScriptedSummarizer {
    pub fn ready(chunks: &[&str]) -> Self {
        Self {
            availability: Some(Availability::Available),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            options_seen: Mutex::new(Vec::new()),
        }
    }
}

struct ScriptedSummary {
    chunks: Vec<String>,
}

impl SummarizerSession for ScriptedSummary {
    fn summarize_streaming(&self, _text: String) -> TextStream {
        stream::iter(self.chunks.clone().into_iter().map(Ok)).boxed()
    }
}

#[async_trait]
impl SummarizerHost for ScriptedSummarizer {
    async fn availability(&self) -> Result<Availability> {
        self.availability
            .ok_or_else(|| Error::CapabilityUnavailable("no summarizer surface".into()))
    }

    async fn create_summarizer(
        &self,
        options: SummarizerOptions,
        _progress: Option<ProgressFn>,
    ) -> Result<Box<dyn SummarizerSession>> {
        self.options_seen.lock().push(options);
        Ok(Box::new(ScriptedSummary {
            chunks: self.chunks.clone(),
        }))
    }
}

// ─── Tabs and panel ─────────────────────────────────────────────────────

/// A browser with one focused tab whose visible raster encodes each
/// pixel's coordinates, so crop tests can verify the region by content.
pub struct PageTabs {
    pub tab: Option<ActiveTab>,
    pub raster_size: (u32, u32),
    pub captures: AtomicU32,
}

impl PageTabs {
    pub fn focused() -> Self {
        Self {
            tab: Some(ActiveTab {
                id: 1,
                window_id: 1,
                url: Some("https://example.com/article".into()),
            }),
            raster_size: (400, 300),
            captures: AtomicU32::new(0),
        }
    }

    pub fn none() -> Self {
        Self {
            tab: None,
            raster_size: (400, 300),
            captures: AtomicU32::new(0),
        }
    }

    pub fn capture_count(&self) -> u32 {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TabHost for PageTabs {
    async fn active_tab(&self) -> Result<Option<ActiveTab>> {
        Ok(self.tab.clone())
    }

    async fn capture_visible_tab(&self, _window_id: WindowId) -> Result<RasterImage> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let (width, height) = self.raster_size;
        Ok(encoded_raster(width, height))
    }
}

pub struct PanelRecorder {
    pub opens: Mutex<Vec<WindowId>>,
}

impl PanelRecorder {
    pub fn new() -> Self {
        Self {
            opens: Mutex::new(Vec::new()),
        }
    }
}

impl Default for PanelRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PanelHost for PanelRecorder {
    async fn open_panel(&self, window_id: WindowId) -> Result<()> {
        self.opens.lock().push(window_id);
        Ok(())
    }
}

// ─── Assembly ───────────────────────────────────────────────────────────

/// All four host surfaces, kept as concrete types so tests can inspect
/// what the engine did to them.
pub struct Browser {
    pub model: Arc<ScriptedModel>,
    pub summarizer: Arc<ScriptedSummarizer>,
    pub tabs: Arc<PageTabs>,
    pub panel: Arc<PanelRecorder>,
}

impl Browser {
    pub fn new(model: ScriptedModel) -> Self {
        Self {
            model: Arc::new(model),
            summarizer: Arc::new(ScriptedSummarizer::ready(&["- summary"])),
            tabs: Arc::new(PageTabs::focused()),
            panel: Arc::new(PanelRecorder::new()),
        }
    }

    pub fn with_tabs(mut self, tabs: PageTabs) -> Self {
        self.tabs = Arc::new(tabs);
        self
    }

    pub fn with_summarizer(mut self, summarizer: ScriptedSummarizer) -> Self {
        self.summarizer = Arc::new(summarizer);
        self
    }

    pub fn hosts(&self) -> Hosts {
        Hosts {
            model: self.model.clone(),
            summarizer: self.summarizer.clone(),
            tabs: self.tabs.clone(),
            panel: self.panel.clone(),
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

/// PNG raster whose pixel at (x, y) is `[x % 256, y % 256, 0, 255]`.
pub fn encoded_raster(width: u32, height: u32) -> RasterImage {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
    });
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .expect("encode test raster");
    RasterImage {
        png: png.into(),
        width,
        height,
    }
}

pub fn decode_data_url(data_url: &str) -> image::DynamicImage {
    let encoded = data_url
        .strip_prefix("data:image/png;base64,")
        .expect("png data url");
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .expect("valid base64");
    image::load_from_memory(&bytes).expect("decodable png")
}

/// Collect panel events until one matches, returning the whole prefix
/// including the match. Panics after five seconds without one.
pub async fn collect_until<F>(engine: &mut Engine, mut matches: F) -> Vec<PanelEvent>
where
    F: FnMut(&PanelEvent) -> bool,
{
    let mut seen = Vec::new();
    let outcome = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match engine.next_panel_event().await {
                Some(event) => {
                    let done = matches(&event);
                    seen.push(event);
                    if done {
                        break;
                    }
                }
                None => panic!("panel task stopped early"),
            }
        }
    })
    .await;
    if outcome.is_err() {
        panic!("timed out waiting for panel event; saw {:?}", seen);
    }
    seen
}
