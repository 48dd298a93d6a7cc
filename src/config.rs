use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ai::TUTOR_SYSTEM_PROMPT;
use crate::host::{SummaryFormat, SummaryLength, SummaryType};

/// Tunables for the engine. Everything has a sensible default; embedders
/// persist the struct as JSON next to their other state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub system_prompt: String,
    pub top_k: u32,
    pub temperature: f64,
    pub output_language: String,
    /// Streaming UI updates are coalesced to one per this interval.
    pub frame_interval_ms: u64,
    /// Window during which repeat capture broadcasts are ignored.
    pub image_debounce_ms: u64,
    pub summary_type: SummaryType,
    pub summary_length: SummaryLength,
    pub summary_format: SummaryFormat,
    pub summary_shared_context: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            system_prompt: TUTOR_SYSTEM_PROMPT.to_string(),
            top_k: 1,
            temperature: 0.2,
            output_language: "en".to_string(),
            frame_interval_ms: 16,
            image_debounce_ms: 1000,
            summary_type: SummaryType::KeyPoints,
            summary_length: SummaryLength::Medium,
            summary_format: SummaryFormat::Markdown,
            summary_shared_context: "Educational content a student is studying.".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn load(data_dir: &Path) -> Self {
        let config_path = data_dir.join("config.json");
        let mut config = if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
                Err(_) => Self::default(),
            }
        } else {
            let c = Self::default();
            c.save(data_dir);
            c
        };

        // Override with environment variable if set
        if let Ok(prompt) = std::env::var("STUDYLENS_SYSTEM_PROMPT") {
            if !prompt.is_empty() {
                config.system_prompt = prompt;
            }
        }

        config
    }

    pub fn save(&self, data_dir: &Path) {
        let config_path = data_dir.join("config.json");
        if let Ok(content) = serde_json::to_string_pretty(self) {
            std::fs::write(config_path, content).ok();
        }
    }
}
