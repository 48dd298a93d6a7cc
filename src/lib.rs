//! StudyLens engine.
//!
//! Everything a browser embedding needs to offer "select anything on
//! the page, ask the on-device AI about it": the region-selection
//! overlay, the capture relay that turns a selection into a cropped
//! screenshot, the streaming chat and summary controllers, and the
//! three extension contexts (background, content, panel) that tie them
//! together over an in-process message bus.
//!
//! The engine talks to the actual browser through the host traits in
//! [`host`]; an embedder implements those, calls [`Engine::spawn`],
//! and drives the contexts through their input channels.

pub mod ai;
pub mod background;
pub mod capture;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod host;
pub mod overlay;
pub mod panel;
pub mod runtime;

pub use config::EngineConfig;
pub use engine::{Engine, Hosts};
pub use error::{Error, Result};
