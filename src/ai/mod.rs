//! Shared AI types: chat transcript shapes and model lifecycle states.

pub mod chat;
pub mod streaming;
pub mod summary;

use serde::{Deserialize, Serialize};

/// System prompt for the chat tutor.
pub const TUTOR_SYSTEM_PROMPT: &str =
    "You are a helpful and patient AI teacher. Answer questions clearly and concisely. \
     When analyzing images, describe what you see and answer any questions about the content.";

/// Prompt substituted when an image is sent with no accompanying text.
pub const ANALYZE_IMAGE_PROMPT: &str = "Analyze this image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One piece of a multimodal turn. Images travel as PNG data URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MessagePart {
    Text(String),
    Image(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<MessagePart>),
}

/// A transcript entry. The transcript is append-only; only the in-progress
/// assistant render is ever replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn parts(role: Role, parts: Vec<MessagePart>) -> Self {
        Self {
            role,
            content: MessageContent::Parts(parts),
        }
    }

    /// The textual portion, for logs and rendering previews.
    pub fn text_content(&self) -> String {
        match &self.content {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    MessagePart::Text(t) => Some(t.as_str()),
                    MessagePart::Image(_) => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    pub fn has_image(&self) -> bool {
        match &self.content {
            MessageContent::Text(_) => false,
            MessageContent::Parts(parts) => {
                parts.iter().any(|p| matches!(p, MessagePart::Image(_)))
            }
        }
    }
}

/// Lifecycle of the on-device model as the panel experiences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Checking,
    Downloading,
    Ready,
    Unavailable,
}
