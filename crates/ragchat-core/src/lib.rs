pub mod client;
pub mod config;
pub mod error;
pub mod markdown;
pub mod state;
pub mod transcript;
pub mod typing;
pub mod viewport;
pub mod widget;

// Re-export main types for convenience
pub use client::{ChatBackend, ChatClient};
pub use config::Config;
pub use error::ChatError;
pub use markdown::{HtmlRenderer, MarkdownRenderer};
pub use state::{Message, MessageId, Sender};
pub use transcript::{Entry, NodeView, Transcript};
pub use typing::{Reveal, RevealState, Typewriter};
pub use viewport::Viewport;
pub use widget::{ChatWidget, WidgetEvent, WidgetOptions, ERROR_MESSAGE};
