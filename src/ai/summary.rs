//! Summarizer flow.
//!
//! Unlike chat, there is no long-lived session: a summarizer is created
//! per generation so option changes (summary type, length) always apply to
//! the next run. Streaming goes through the same reconciliation and frame
//! gating as chat.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::ai::streaming::{ChunkAccumulator, RenderGate};
use crate::ai::ModelStatus;
use crate::config::EngineConfig;
use crate::error::Error;
use crate::host::{ProgressFn, SummarizerHost, SummarizerOptions, SummaryLength, SummaryType};

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryEvent {
    StatusChanged {
        status: ModelStatus,
        detail: Option<String>,
    },
    DownloadProgress {
        percent: u8,
    },
    /// Coalesced partial render of the summary so far.
    Update {
        displayed: String,
    },
    /// Terminal batch: final summary or the failure to show, never both.
    Completed {
        summary: Option<String>,
        error: Option<String>,
    },
    /// The request never started (nothing to summarize).
    InputRejected {
        reason: String,
    },
    BusyChanged {
        busy: bool,
    },
}

pub struct SummaryController {
    host: Arc<dyn SummarizerHost>,
    config: EngineConfig,
    events: mpsc::UnboundedSender<SummaryEvent>,
    status: ModelStatus,
    busy: bool,
}

impl SummaryController {
    pub fn new(
        host: Arc<dyn SummarizerHost>,
        config: EngineConfig,
        events: mpsc::UnboundedSender<SummaryEvent>,
    ) -> Self {
        Self {
            host,
            config,
            events,
            status: ModelStatus::Checking,
            busy: false,
        }
    }

    pub fn status(&self) -> ModelStatus {
        self.status
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Options apply from the next generation onward.
    pub fn set_options(&mut self, summary_type: SummaryType, length: SummaryLength) {
        self.config.summary_type = summary_type;
        self.config.summary_length = length;
    }

    fn emit(&self, event: SummaryEvent) {
        let _ = self.events.send(event);
    }

    fn set_status(&mut self, status: ModelStatus, detail: Option<String>) {
        self.status = status;
        self.emit(SummaryEvent::StatusChanged { status, detail });
    }

    fn options(&self) -> SummarizerOptions {
        SummarizerOptions {
            summary_type: self.config.summary_type,
            format: self.config.summary_format,
            length: self.config.summary_length,
            shared_context: self.config.summary_shared_context.clone(),
        }
    }

    fn progress_reporter(&self) -> ProgressFn {
        let seen = Arc::new(AtomicU8::new(0));
        let events = self.events.clone();
        Arc::new(move |fraction: f64| {
            let percent = (fraction * 100.0).round().clamp(0.0, 100.0) as u8;
            let previous = seen.fetch_max(percent, Ordering::SeqCst);
            if percent > previous {
                let _ = events.send(SummaryEvent::DownloadProgress { percent });
            }
        })
    }

    /// Probe the summarizer surface.
    pub async fn initialize(&mut self) -> ModelStatus {
        self.set_status(ModelStatus::Checking, None);
        match self.host.availability().await {
            Ok(availability) if availability.is_usable() => {
                self.set_status(ModelStatus::Ready, None);
            }
            Ok(_) => {
                self.set_status(
                    ModelStatus::Unavailable,
                    Some("Summarization is not available in this browser.".to_string()),
                );
            }
            Err(err) => {
                log::warn!("summarizer probe failed: {}", err);
                self.set_status(ModelStatus::Unavailable, Some(err.to_string()));
            }
        }
        self.status
    }

    /// Summarize `text`, streaming partial renders. One generation at a
    /// time.
    pub async fn generate(&mut self, text: &str) {
        if self.busy {
            log::debug!("summary dropped: a generation is already running");
            return;
        }
        if self.status != ModelStatus::Ready {
            log::debug!("summary dropped: summarizer not ready");
            return;
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.emit(SummaryEvent::InputRejected {
                reason: "Select or enter some text to summarize first.".to_string(),
            });
            return;
        }

        self.busy = true;
        self.emit(SummaryEvent::BusyChanged { busy: true });

        let summarizer = match self
            .host
            .create_summarizer(self.options(), Some(self.progress_reporter()))
            .await
        {
            Ok(summarizer) => summarizer,
            Err(err) => {
                log::warn!("summarizer creation failed: {}", err);
                self.emit(SummaryEvent::Completed {
                    summary: None,
                    error: Some(err.to_string()),
                });
                self.busy = false;
                self.emit(SummaryEvent::BusyChanged { busy: false });
                return;
            }
        };

        let mut stream = summarizer.summarize_streaming(trimmed.to_string());
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
                        self.emit(SummaryEvent::Update { displayed });
                    }
                }
            }
        }

        let completed = match stream_error {
            Some(err) => {
                log::warn!("summary stream failed: {}", err);
                SummaryEvent::Completed {
                    summary: None,
                    error: Some(err.to_string()),
                }
            }
            None => match accumulator.finish() {
                Ok(summary) => SummaryEvent::Completed {
                    summary: Some(summary),
                    error: None,
                },
                Err(err) => {
                    log::info!("summary closed with no usable content");
                    SummaryEvent::Completed {
                        summary: None,
                        error: Some(err.to_string()),
                    }
                }
            },
        };
        self.emit(completed);
        self.busy = false;
        self.emit(SummaryEvent::BusyChanged { busy: false });
    }
}
