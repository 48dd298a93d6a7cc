//! Chat session orchestrator.
//!
//! Owns the model lifecycle (probe, optional download, session creation
//! with a text-only fallback) and the send pipeline: append-then-prompt
//! for image turns, streaming reconciliation, and frame-gated partial
//! renders. One send runs at a time; the busy flag drops overlapping
//! requests instead of queueing them.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::ai::streaming::{ChunkAccumulator, RenderGate};
use crate::ai::{Message, MessagePart, ModelStatus, Role, ANALYZE_IMAGE_PROMPT};
use crate::config::EngineConfig;
use crate::error::Error;
use crate::host::{
    InputKind, LanguageModelHost, ModelSession, ProbeOptions, ProgressFn, SessionConfig,
    TextStream,
};

/// Everything the panel observes about the chat flow.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    StatusChanged {
        status: ModelStatus,
        detail: Option<String>,
    },
    DownloadProgress {
        percent: u8,
    },
    /// A user turn entered the transcript.
    MessageAppended {
        message: Message,
    },
    /// Coalesced partial render of the in-progress assistant response.
    StreamUpdate {
        displayed: String,
    },
    /// Terminal batch for one send: the appended assistant message (if
    /// any) and the failure to show (if any), delivered together so the
    /// partial render swaps for the final message without flashing empty.
    StreamClosed {
        appended: Option<Message>,
        error: Option<String>,
    },
    /// The image turn could not be attached. The send was abandoned, the
    /// session stays alive, and the attachment is kept for retry.
    ImageAppendFailed {
        error: String,
    },
    BusyChanged {
        busy: bool,
    },
}

pub struct ChatController {
    host: Arc<dyn LanguageModelHost>,
    config: EngineConfig,
    events: mpsc::UnboundedSender<ChatEvent>,
    status: ModelStatus,
    session: Option<Box<dyn ModelSession>>,
    multimodal_supported: bool,
    busy: bool,
    transcript: Vec<Message>,
}

impl ChatController {
    pub fn new(
        host: Arc<dyn LanguageModelHost>,
        config: EngineConfig,
        events: mpsc::UnboundedSender<ChatEvent>,
    ) -> Self {
        Self {
            host,
            config,
            events,
            status: ModelStatus::Checking,
            session: None,
            multimodal_supported: false,
            busy: false,
            transcript: Vec::new(),
        }
    }

    pub fn status(&self) -> ModelStatus {
        self.status
    }

    pub fn multimodal_supported(&self) -> bool {
        self.multimodal_supported
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.events.send(event);
    }

    fn set_status(&mut self, status: ModelStatus, detail: Option<String>) {
        self.status = status;
        self.emit(ChatEvent::StatusChanged { status, detail });
    }

    fn session_config(&self, multimodal: bool) -> SessionConfig {
        SessionConfig {
            system_prompt: Some(self.config.system_prompt.clone()),
            temperature: self.config.temperature,
            top_k: self.config.top_k,
            expected_inputs: if multimodal {
                vec![InputKind::Image]
            } else {
                Vec::new()
            },
            output_language: self.config.output_language.clone(),
        }
    }

    /// Progress callback plus the high-water mark it maintains. Percentages
    /// only ever move forward within one acquisition.
    fn progress_reporter(&self) -> (ProgressFn, Arc<AtomicU8>) {
        let seen = Arc::new(AtomicU8::new(0));
        let events = self.events.clone();
        let mark = seen.clone();
        let reporter: ProgressFn = Arc::new(move |fraction: f64| {
            let percent = (fraction * 100.0).round().clamp(0.0, 100.0) as u8;
            let previous = mark.fetch_max(percent, Ordering::SeqCst);
            if percent > previous {
                let _ = events.send(ChatEvent::DownloadProgress { percent });
            }
        });
        (reporter, seen)
    }

    /// Probe the capability and bring up a session. Tries multimodal
    /// first; one text-only retry before giving up.
    pub async fn initialize(&mut self) -> ModelStatus {
        self.set_status(ModelStatus::Checking, None);

        let probe = match self.host.availability(&ProbeOptions::with_image()).await {
            Ok(availability) => availability,
            Err(err) => {
                log::warn!("language model probe failed: {}", err);
                self.set_status(ModelStatus::Unavailable, Some(err.to_string()));
                return self.status;
            }
        };
        if !probe.is_usable() {
            self.set_status(
                ModelStatus::Unavailable,
                Some("On-device AI is not available in this browser.".to_string()),
            );
            return self.status;
        }
        if probe.needs_download() {
            log::info!("model requires download before first use");
            self.set_status(ModelStatus::Downloading, None);
        }

        let (reporter, reported) = self.progress_reporter();
        match self
            .host
            .create_session(self.session_config(true), Some(reporter.clone()))
            .await
        {
            Ok(session) => {
                self.session = Some(session);
                self.multimodal_supported = true;
            }
            Err(first) => {
                log::warn!(
                    "multimodal session creation failed ({}), retrying text-only",
                    first
                );
                match self
                    .host
                    .create_session(self.session_config(false), Some(reporter))
                    .await
                {
                    Ok(session) => {
                        self.session = Some(session);
                        self.multimodal_supported = false;
                    }
                    Err(second) => {
                        log::error!("text-only session creation failed: {}", second);
                        self.set_status(ModelStatus::Unavailable, Some(second.to_string()));
                        return self.status;
                    }
                }
            }
        }

        if probe.needs_download() && reported.load(Ordering::SeqCst) < 100 {
            self.emit(ChatEvent::DownloadProgress { percent: 100 });
        }
        self.set_status(ModelStatus::Ready, None);
        self.status
    }

    /// Send one user turn. No-op while busy, without a session, or with
    /// nothing to send.
    pub async fn send(&mut self, text: &str, image: Option<String>) {
        if self.busy {
            log::debug!("send dropped: a response is still streaming");
            return;
        }
        if self.session.is_none() {
            log::debug!("send dropped: no session");
            return;
        }
        let trimmed = text.trim();
        if trimmed.is_empty() && image.is_none() {
            return;
        }
        let prompt_text = if trimmed.is_empty() {
            ANALYZE_IMAGE_PROMPT.to_string()
        } else {
            trimmed.to_string()
        };

        self.busy = true;
        self.emit(ChatEvent::BusyChanged { busy: true });

        let user_message = match &image {
            Some(data_url) => Message::parts(
                Role::User,
                vec![
                    MessagePart::Text(prompt_text.clone()),
                    MessagePart::Image(data_url.clone()),
                ],
            ),
            None => Message::text(Role::User, prompt_text.clone()),
        };
        self.transcript.push(user_message.clone());
        self.emit(ChatEvent::MessageAppended {
            message: user_message,
        });

        if let Some(data_url) = image {
            if !self.multimodal_supported {
                self.abort_send_keeping_image("This model cannot accept images.".to_string());
                return;
            }
            let turn = Message::parts(Role::User, vec![MessagePart::Image(data_url)]);
            let appended = match self.session.as_ref() {
                Some(session) => session.append(turn).await,
                None => return,
            };
            if let Err(err) = appended {
                log::warn!("image append failed: {}", err);
                self.abort_send_keeping_image(err.to_string());
                return;
            }
        }

        let stream = match self.session.as_ref() {
            Some(session) => session.prompt_streaming(Message::text(Role::User, prompt_text)),
            None => return,
        };
        self.run_stream(stream).await;
    }

    fn abort_send_keeping_image(&mut self, error: String) {
        self.busy = false;
        self.emit(ChatEvent::ImageAppendFailed { error });
        self.emit(ChatEvent::BusyChanged { busy: false });
    }

    /// Fold the response stream, emitting at most one partial render per
    /// frame interval and a single terminal batch.
    async fn run_stream(&mut self, mut stream: TextStream) {
        let mut accumulator = ChunkAccumulator::new();
        let mut gate = RenderGate::new();
        let mut frames = interval(Duration::from_millis(self.config.frame_interval_ms.max(1)));
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut stream_error: Option<Error> = None;
        loop {
            tokio::select! {
                chunk = stream.next() => match chunk {
                    Some(Ok(text)) => {
                        let displayed = accumulator.push(&text).to_string();
                        gate.offer(displayed);
                    }
                    Some(Err(err)) => {
                        stream_error = Some(err);
                        break;
                    }
                    None => break,
                },
                _ = frames.tick() => {
                    if let Some(displayed) = gate.take() {
                        self.emit(ChatEvent::StreamUpdate { displayed });
                    }
                }
            }
        }

        let closed = match stream_error {
            Some(err) => {
                log::warn!("response stream failed: {}", err);
                ChatEvent::StreamClosed {
                    appended: None,
                    error: Some(err.to_string()),
                }
            }
            None => match accumulator.finish() {
                Ok(final_text) => {
                    let message = Message::text(Role::Assistant, final_text);
                    self.transcript.push(message.clone());
                    ChatEvent::StreamClosed {
                        appended: Some(message),
                        error: None,
                    }
                }
                Err(err) => {
                    log::info!("stream closed with no usable content");
                    ChatEvent::StreamClosed {
                        appended: None,
                        error: Some(err.to_string()),
                    }
                }
            },
        };
        self.emit(closed);
        self.busy = false;
        self.emit(ChatEvent::BusyChanged { busy: false });
    }
}
