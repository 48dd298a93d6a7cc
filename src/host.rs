//! Host capability traits.
//!
//! The engine never talks to a model, a summarizer, or the tab system
//! directly; the embedder supplies these surfaces. Session creation takes an
//! optional progress callback so callers can observe model download, the
//! same monitor pattern the underlying prompt surface exposes.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::ai::Message;
use crate::capture::RasterImage;
use crate::error::Result;

/// Stream of response fragments. Each item is either a text chunk or the
/// error that ended the stream.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Download progress callback, fed the loaded fraction in `0.0..=1.0`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Capability probe answer, mirroring the prompt surface's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Unavailable,
    Downloadable,
    Downloading,
    Available,
}

impl Availability {
    /// Whether a session can be created at all (possibly after a download).
    pub fn is_usable(&self) -> bool {
        !matches!(self, Availability::Unavailable)
    }

    pub fn needs_download(&self) -> bool {
        matches!(self, Availability::Downloadable | Availability::Downloading)
    }
}

/// Input modality declared to the probe and at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Image,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeOptions {
    pub expected_inputs: Vec<InputKind>,
}

impl ProbeOptions {
    pub fn with_image() -> Self {
        Self {
            expected_inputs: vec![InputKind::Image],
        }
    }
}

/// Everything a model session is created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub system_prompt: Option<String>,
    pub temperature: f64,
    pub top_k: u32,
    pub expected_inputs: Vec<InputKind>,
    pub output_language: String,
}

/// Summary shapes offered by the summarizer surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryType {
    KeyPoints,
    Tldr,
    Teaser,
    Headline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryLength {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryFormat {
    Markdown,
    PlainText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizerOptions {
    #[serde(rename = "type")]
    pub summary_type: SummaryType,
    pub format: SummaryFormat,
    pub length: SummaryLength,
    pub shared_context: String,
}

/// A live model session. Prompting is streaming-only; errors surface as the
/// terminal item of the stream.
#[async_trait]
pub trait ModelSession: Send + Sync {
    /// Add a turn to the session context without generating a response.
    /// Used to attach an image before the textual prompt.
    async fn append(&self, message: Message) -> Result<()>;

    /// Stream the response to `message`.
    fn prompt_streaming(&self, message: Message) -> TextStream;
}

#[async_trait]
pub trait LanguageModelHost: Send + Sync {
    /// Probe the capability. A host without the surface at all returns
    /// `Err(CapabilityUnavailable)`, distinct from `Ok(Unavailable)`.
    async fn availability(&self, options: &ProbeOptions) -> Result<Availability>;

    async fn create_session(
        &self,
        config: SessionConfig,
        progress: Option<ProgressFn>,
    ) -> Result<Box<dyn ModelSession>>;
}

pub trait SummarizerSession: Send + Sync {
    fn summarize_streaming(&self, text: String) -> TextStream;
}

#[async_trait]
pub trait SummarizerHost: Send + Sync {
    async fn availability(&self) -> Result<Availability>;

    async fn create_summarizer(
        &self,
        options: SummarizerOptions,
        progress: Option<ProgressFn>,
    ) -> Result<Box<dyn SummarizerSession>>;
}

pub type TabId = u32;
pub type WindowId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTab {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: Option<String>,
}

/// Tab system surface used by the privileged context.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// The focused tab of the last-focused window, if any.
    async fn active_tab(&self) -> Result<Option<ActiveTab>>;

    /// Rasterize the visible area of the given window's active tab.
    async fn capture_visible_tab(&self, window_id: WindowId) -> Result<RasterImage>;
}

/// Panel shell surface used to open the side panel on a menu click.
#[async_trait]
pub trait PanelHost: Send + Sync {
    async fn open_panel(&self, window_id: WindowId) -> Result<()>;
}
